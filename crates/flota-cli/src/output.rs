// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use flota_app::dates::{format_display, weekday_name};
use flota_app::{
    Document, LookupEntry, LookupId, LookupTable, PlanId, ReportSettings, VehicleId,
};
use flota_db::PullOutcome;
use flota_report::{Dashboard, DetailRow, ReportRow, RowGroup, filter_details};
use std::fmt::Write as _;
use time::OffsetDateTime;

use crate::records::Entity;
use crate::runtime::{Delivery, Recipient};

pub fn dashboard_text(dashboard: &Dashboard, filter: &str) -> String {
    let kpis = dashboard.kpis;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Vehículos: {} ({} activos)",
        kpis.total_vehicles, kpis.active_vehicles
    );
    let _ = writeln!(
        out,
        "Al día: {}  Próximos 7 días: {}  Vencidos: {}",
        kpis.current, kpis.due_soon, kpis.overdue
    );

    write_details(&mut out, "Vencidos", &filter_details(&dashboard.overdue, filter), "de retraso");
    write_details(
        &mut out,
        "Próximos 7 días",
        &filter_details(&dashboard.due_soon, filter),
        "restantes",
    );

    out.push_str("\nRealizados por semana:\n");
    for bucket in &dashboard.trend {
        let _ = writeln!(out, "  {:<8} {}", bucket.label, bucket.completed);
    }

    out.push_str("\nTipos (últimos 30 días):\n");
    if dashboard.distribution.is_empty() {
        out.push_str("  sin registros\n");
    }
    for slice in &dashboard.distribution {
        let _ = writeln!(out, "  {:<24} {}", slice.label, slice.count);
    }
    out
}

fn write_details(out: &mut String, title: &str, rows: &[&DetailRow], days_suffix: &str) {
    let _ = writeln!(out, "\n{title} ({}):", rows.len());
    if rows.is_empty() {
        out.push_str("  ninguno\n");
        return;
    }
    for row in rows {
        let days = row
            .days
            .map(|days| format!(" ({days} días {days_suffix})"))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {} {:<8} {:<14} {:<20} {}{days}",
            row.vehicle_id, row.license_plate, row.brand, row.maintenance_type, row.due_label
        );
    }
}

pub fn rows_table(rows: &[ReportRow]) -> String {
    let mut out = String::new();
    for row in rows {
        write_row(&mut out, row);
    }
    if rows.is_empty() {
        out.push_str("sin resultados\n");
    }
    out
}

pub fn grouped_table(groups: &[RowGroup]) -> String {
    let mut out = String::new();
    for group in groups {
        let _ = writeln!(out, "{}", group.heading());
        for row in &group.rows {
            out.push_str("  ");
            write_row(&mut out, row);
        }
    }
    if groups.is_empty() {
        out.push_str("sin resultados\n");
    }
    out
}

fn write_row(out: &mut String, row: &ReportRow) {
    let last = row
        .last_performed
        .map(format_display)
        .unwrap_or_else(|| "-".to_owned());
    let _ = writeln!(
        out,
        "{} {:<8} {:<16} {:<24} {:<10} {:>4} {}",
        row.vehicle_id,
        row.license_plate,
        row.system,
        row.plan,
        last,
        row.overdue_days,
        row.status()
    );
}

pub fn lookup_table(entries: &[LookupEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(out, "{:>4}  {}", entry.id, entry.value);
    }
    out
}

/// One line per record. Plans filter by `scope` as a vehicle id, history by plan id.
/// Passwords are never printed.
pub fn records_table(document: &Document, entity: Entity, scope: Option<&str>) -> String {
    let mut out = String::new();
    match entity {
        Entity::Vehicle => {
            for vehicle in &document.vehicles {
                let _ = writeln!(
                    out,
                    "{} {:<8} {:<14} {:<16} {:<8} {}",
                    vehicle.id,
                    vehicle.license_plate,
                    lookup_label(document, LookupTable::Brands, vehicle.brand_id.as_ref()),
                    lookup_label(document, LookupTable::Systems, vehicle.system_id.as_ref()),
                    vehicle.status.as_str(),
                    vehicle.grease_type
                );
            }
        }
        Entity::Plan => {
            let vehicle = scope.map(VehicleId::padded);
            for plan in document
                .maintenance_plans
                .iter()
                .filter(|plan| vehicle.as_ref().is_none_or(|id| &plan.vehicle_id == id))
            {
                let _ = writeln!(
                    out,
                    "{:>4} {} {:<24} {:>4} días {:>6} km {}",
                    plan.id,
                    plan.vehicle_id,
                    lookup_label(
                        document,
                        LookupTable::MaintenanceTypes,
                        plan.maintenance_type_id.as_ref()
                    ),
                    plan.period_days,
                    plan.period_km,
                    plan.status
                );
            }
        }
        Entity::History => {
            let plan = scope.map(PlanId::from);
            for entry in document
                .history
                .iter()
                .filter(|entry| plan.as_ref().is_none_or(|id| &entry.plan_id == id))
            {
                let km = entry.km.map(|km| format!("{km} km")).unwrap_or_default();
                let _ = writeln!(
                    out,
                    "{:>4} plan {:<4} {} {:<18} {:<10} {}",
                    entry.id,
                    entry.plan_id,
                    format_display(entry.date),
                    lookup_label(document, LookupTable::Operators, entry.operator_id.as_ref()),
                    km,
                    entry.observations
                );
            }
        }
        Entity::Coordinator => {
            for coordinator in &document.coordinators {
                let system = match coordinator.system_id.as_ref() {
                    Some(id) => lookup_label(document, LookupTable::Systems, Some(id)),
                    None => "todos los sistemas",
                };
                let _ = writeln!(
                    out,
                    "{} {} <{}> {} ({system})",
                    coordinator.id, coordinator.name, coordinator.email, coordinator.role
                );
            }
        }
        Entity::User => {
            for user in &document.users {
                let _ = writeln!(out, "{:<16} {}", user.username, user.role);
            }
        }
    }
    if out.is_empty() {
        out.push_str("sin resultados\n");
    }
    out
}

fn lookup_label<'a>(document: &'a Document, table: LookupTable, id: Option<&LookupId>) -> &'a str {
    document.lookup_value(table, id).unwrap_or("-")
}

pub fn settings_text(settings: &ReportSettings, last_sync_millis: Option<i64>) -> String {
    let last_sent = settings
        .last_sent
        .map(format_display)
        .unwrap_or_else(|| "nunca".to_owned());
    let last_sync = last_sync_millis
        .and_then(|millis| {
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
        })
        .map(|at| format!("{} {:02}:{:02} UTC", format_display(at.date()), at.hour(), at.minute()))
        .unwrap_or_else(|| "nunca".to_owned());
    format!(
        "enabled: {}\nday: {}\nhour: {}\nlast sent: {last_sent}\nsync url: {}\nlast sync: {last_sync}\n",
        settings.enabled,
        weekday_name(settings.day_of_week),
        settings.hour,
        settings.sync_url().unwrap_or("(not linked)"),
    )
}

pub fn pull_outcome_text(outcome: &PullOutcome) -> String {
    match outcome {
        PullOutcome::Merged { document, changed } => format!(
            "pulled {} vehicles, {} plans ({})",
            document.vehicles.len(),
            document.maintenance_plans.len(),
            if *changed { "updated" } else { "no changes" }
        ),
        PullOutcome::Failed { error, .. } => format!("pull failed: {error}"),
    }
}

pub fn recipient_line(recipient: &Recipient) -> String {
    let reason = match &recipient.delivery {
        Delivery::Failed(reason) => format!(" ({reason})"),
        Delivery::Sending | Delivery::Sent => String::new(),
    };
    format!(
        "{} <{}>: {}{reason}",
        recipient.name,
        recipient.email,
        recipient.delivery.label()
    )
}
