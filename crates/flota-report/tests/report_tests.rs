// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use flota_app::{Document, DueState, LookupId, PlanId, VehicleStatus};
use flota_report::{
    GroupBy, build_dashboard, digest_items, group_rows, html_digest, report_rows, text_digest,
};
use flota_testkit::{FleetFaker, fixture_today};
use std::collections::BTreeSet;

fn retired_plan_ids(document: &Document) -> BTreeSet<PlanId> {
    document
        .maintenance_plans
        .iter()
        .filter(|plan| {
            document
                .vehicle(&plan.vehicle_id)
                .is_some_and(|vehicle| vehicle.status == VehicleStatus::Retired)
        })
        .map(|plan| plan.id.clone())
        .collect()
}

#[test]
fn retired_vehicles_are_excluded_everywhere() -> Result<()> {
    let today = fixture_today();
    let document = FleetFaker::new(11).fleet(60, today)?;
    let retired = retired_plan_ids(&document);
    assert!(!retired.is_empty(), "fixture should include retired vehicles");

    let dashboard = build_dashboard(&document, today);
    for row in dashboard.overdue.iter().chain(&dashboard.due_soon) {
        assert!(!retired.contains(&row.plan_id));
    }
    for row in report_rows(&document, today, "") {
        assert!(!retired.contains(&row.plan_id));
    }
    let items = digest_items(&document, None, today);
    assert!(items.iter().all(|item| !retired.contains(&item.plan_id)));

    let html = html_digest(&document, None, today);
    for plan in &retired {
        assert!(!html.contains(&format!("data-plan=\"{plan}\"")));
    }
    Ok(())
}

#[test]
fn kpi_buckets_partition_report_rows() -> Result<()> {
    let today = fixture_today();
    let document = FleetFaker::new(5).fleet(40, today)?;
    let dashboard = build_dashboard(&document, today);
    let rows = report_rows(&document, today, "");
    let kpis = dashboard.kpis;
    assert_eq!(kpis.current + kpis.due_soon + kpis.overdue, rows.len());
    assert_eq!(kpis.overdue, dashboard.overdue.len());
    assert_eq!(kpis.due_soon, dashboard.due_soon.len());
    Ok(())
}

#[test]
fn text_and_html_digests_list_same_plans_in_same_order() -> Result<()> {
    let today = fixture_today();
    let document = FleetFaker::new(21).fleet(50, today)?;
    let mut scopes = vec![None];
    scopes.extend(document.systems.iter().map(|entry| Some(entry.id.clone())));

    for scope in &scopes {
        let items = digest_items(&document, scope.as_ref(), today);
        let text = text_digest(&document, scope.as_ref(), today);
        let html = html_digest(&document, scope.as_ref(), today);

        if items.is_empty() {
            assert!(text.starts_with("No hay mantenimientos"));
            assert!(!html.contains("<table"));
            continue;
        }

        let text_lines = text.lines().skip(2).collect::<Vec<_>>();
        assert_eq!(text_lines.len(), items.len());
        for (line, item) in text_lines.iter().zip(&items) {
            let overdue = match item.state {
                DueState::Overdue { overdue_days } => format!(", {overdue_days} días vencido"),
                _ => String::new(),
            };
            let expected = format!(
                "- Vehículo {} ({}) [{}]: {} ({}{overdue})",
                item.vehicle_id,
                item.license_plate,
                item.system,
                item.plan,
                item.state.label()
            );
            assert_eq!(*line, expected, "plan {} in scope {scope:?}", item.plan_id);
        }

        let html_order = html
            .split("data-plan=\"")
            .skip(1)
            .filter_map(|chunk| chunk.split('"').next())
            .collect::<Vec<_>>();
        let item_order = items
            .iter()
            .map(|item| item.plan_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(html_order, item_order, "scope {scope:?}");
    }
    Ok(())
}

#[test]
fn digest_urgency_is_non_increasing() -> Result<()> {
    let today = fixture_today();
    let document = FleetFaker::new(8).fleet(50, today)?;
    let items = digest_items(&document, None, today);
    for pair in items.windows(2) {
        assert!(pair[0].state.urgency() >= pair[1].state.urgency());
    }
    Ok(())
}

#[test]
fn grouped_rows_cover_the_ungrouped_set() -> Result<()> {
    let today = fixture_today();
    let document = FleetFaker::new(13).fleet(45, today)?;
    let rows = report_rows(&document, today, "");
    let expected = rows
        .iter()
        .map(|row| row.plan_id.clone())
        .collect::<BTreeSet<_>>();

    for group_by in GroupBy::ALL {
        let groups = group_rows(&rows, group_by);
        let grouped = groups
            .iter()
            .flat_map(|group| group.rows.iter().map(|row| row.plan_id.clone()))
            .collect::<Vec<_>>();
        assert_eq!(grouped.len(), rows.len(), "{}", group_by.as_str());
        assert_eq!(grouped.into_iter().collect::<BTreeSet<_>>(), expected);
        for group in &groups {
            for pair in group.rows.windows(2) {
                assert!(pair[0].urgency() >= pair[1].urgency());
            }
        }
    }
    Ok(())
}

#[test]
fn scoped_digest_only_lists_that_system() -> Result<()> {
    let today = fixture_today();
    let document = FleetFaker::new(17).fleet(40, today)?;
    let system = LookupId::from("5");
    for item in digest_items(&document, Some(&system), today) {
        let vehicle = document
            .vehicle(&item.vehicle_id)
            .expect("digest vehicle exists");
        assert_eq!(vehicle.system_id.as_ref(), Some(&system));
    }
    Ok(())
}
