// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use flota_app::{
    Document, DueState, HistoryFormInput, LookupId, PlanId, Urgency, VehicleId, VehicleStatus,
    attention_list, evaluate_all, evaluate_scope,
};
use time::macros::date;

#[test]
fn seed_fleet_needs_attention_in_urgency_order() {
    let document = Document::initial();
    let today = date!(2026 - 03 - 01);

    let attention = attention_list(&document, None, today);
    let ids = attention
        .iter()
        .map(|evaluation| evaluation.plan.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["2", "1"]);
    assert_eq!(attention[0].state, DueState::Pending);
    assert_eq!(attention[1].state, DueState::Overdue { overdue_days: 15 });
    assert_eq!(attention[1].due_date, Some(date!(2026 - 02 - 14)));
    assert_eq!(attention[0].urgency(), Urgency::Never);
}

#[test]
fn retired_vehicles_drop_out_of_every_view() {
    let document = Document::initial();
    let today = date!(2026 - 03 - 01);
    assert_eq!(evaluate_all(&document, today).len(), 2);

    let mut retired = document.clone();
    retired.vehicles[0].status = VehicleStatus::Retired;
    assert!(evaluate_all(&retired, today).is_empty());
    assert!(attention_list(&retired, None, today).is_empty());
}

#[test]
fn scope_filters_by_vehicle_system() {
    let document = Document::initial();
    let today = date!(2026 - 03 - 01);
    assert_eq!(
        evaluate_scope(&document, Some(&LookupId::from("1")), today).len(),
        2
    );
    assert!(evaluate_scope(&document, Some(&LookupId::from("2")), today).is_empty());
}

#[test]
fn recording_history_moves_plan_back_into_time() -> Result<()> {
    let document = Document::initial();
    let (document, _) = document.record_history(&HistoryFormInput {
        plan_id: PlanId::from("1"),
        date: date!(2026 - 02 - 27),
        operator_id: Some(LookupId::from("2")),
        observations: "  engrasado  ".to_owned(),
        km: Some(120_500),
    })?;

    let today = date!(2026 - 03 - 01);
    let evaluation = evaluate_all(&document, today)
        .into_iter()
        .find(|evaluation| evaluation.plan.id.as_str() == "1")
        .expect("plan 1 is evaluable");
    assert_eq!(evaluation.last_performed, Some(date!(2026 - 02 - 27)));
    assert_eq!(evaluation.state, DueState::Current);
    assert_eq!(document.history[1].observations, "engrasado");
    assert!(document.vehicle(&VehicleId::from("0001")).is_some());
    Ok(())
}

#[test]
fn cloud_json_round_trips_through_document() -> Result<()> {
    let raw = serde_json::json!({
        "vehicles": [{"id": "0009", "licensePlate": 1234, "systemId": 3, "status": "Baja"}],
        "maintenancePlans": [{"id": 1, "vehicleId": "0009", "periodDays": "30 días"}],
        "history": [{"id": "1", "planId": "1", "date": "2026-01-02T10:00:00.000Z"}],
        "reportSettings": {"dayOfWeek": "Tuesday", "hour": "08:15", "enabled": "true"},
        "users": [{"username": "admin", "password": "x", "role": "admin"}]
    });
    let document: Document = serde_json::from_value(raw)?;
    assert_eq!(document.vehicles[0].license_plate, "1234");
    assert_eq!(document.vehicles[0].status, VehicleStatus::Retired);
    assert_eq!(document.maintenance_plans[0].period_days, 30);
    assert_eq!(document.history[0].date, date!(2026 - 01 - 02));
    assert!(document.report_settings.enabled);

    let encoded = serde_json::to_value(&document)?;
    assert_eq!(encoded["vehicles"][0]["systemId"], "3");
    assert_eq!(encoded["history"][0]["date"], "2026-01-02");
    assert_eq!(encoded["maintenancePlans"][0]["status"], "Activo");
    Ok(())
}

#[test]
fn zero_period_plan_without_history_stays_out_of_attention() {
    let mut document = Document::initial();
    document.maintenance_plans[1].period_days = 0;
    let today = date!(2026 - 03 - 01);

    let evaluation = evaluate_all(&document, today)
        .into_iter()
        .find(|evaluation| evaluation.plan.id.as_str() == "2")
        .expect("plan 2 is evaluable");
    assert_eq!(evaluation.last_performed, None);
    assert_eq!(evaluation.state, DueState::Current);
    assert_eq!(evaluation.due_date, None);

    let attention = attention_list(&document, None, today)
        .iter()
        .map(|evaluation| evaluation.plan.id.as_str().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(attention, vec!["1"]);
}
