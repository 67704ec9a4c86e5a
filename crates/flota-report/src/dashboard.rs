// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Dashboard aggregates: KPI counts, the overdue and due-soon detail lists, the weekly
//! completion trend, and the recent maintenance-type mix.

use flota_app::dates::{add_months, format_display, format_short_label, previous_monday};
use flota_app::text::contains_ignore_case;
use flota_app::{
    Document, DueState, LookupTable, PlanEvaluation, PlanId, VehicleId, evaluate_all,
};
use time::{Date, Duration};

pub const TYPE_PALETTE: [&str; 6] = [
    "#0088FE", "#00C49F", "#FFBB28", "#FF8042", "#8884d8", "#82ca9d",
];

const DEFAULT_TYPE_LABEL: &str = "General";
const OTHER_TYPE_LABEL: &str = "Otros";
const NEVER_PERFORMED: &str = "Nunca realizado";
const TREND_MONTHS: i32 = 6;
const DISTRIBUTION_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Kpis {
    pub total_vehicles: usize,
    /// Vehicles whose status is Activo or Alta.
    pub active_vehicles: usize,
    pub current: usize,
    pub due_soon: usize,
    /// Overdue plus never-performed plans.
    pub overdue: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub plan_id: PlanId,
    pub vehicle_id: VehicleId,
    pub license_plate: String,
    pub brand: String,
    pub maintenance_type: String,
    pub due_label: String,
    /// Days late (overdue list) or days left (due-soon list); `None` when never performed.
    pub days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendBucket {
    pub start: Date,
    pub label: String,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSlice {
    pub label: String,
    pub count: usize,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub kpis: Kpis,
    pub overdue: Vec<DetailRow>,
    pub due_soon: Vec<DetailRow>,
    pub trend: Vec<TrendBucket>,
    pub distribution: Vec<TypeSlice>,
}

pub fn build_dashboard(document: &Document, today: Date) -> Dashboard {
    let evaluations = evaluate_all(document, today);
    let mut kpis = Kpis {
        total_vehicles: document.vehicles.len(),
        active_vehicles: document
            .vehicles
            .iter()
            .filter(|vehicle| vehicle.status.is_in_service())
            .count(),
        ..Kpis::default()
    };

    let mut overdue = Vec::new();
    let mut due_soon = Vec::new();
    for evaluation in &evaluations {
        match evaluation.state {
            DueState::Current => kpis.current += 1,
            DueState::DueSoon { remaining_days } => {
                kpis.due_soon += 1;
                due_soon.push(detail_row(document, evaluation, Some(remaining_days)));
            }
            DueState::Overdue { overdue_days } => {
                kpis.overdue += 1;
                overdue.push(detail_row(document, evaluation, Some(overdue_days)));
            }
            DueState::Pending => {
                kpis.overdue += 1;
                overdue.push(detail_row(document, evaluation, None));
            }
        }
    }

    Dashboard {
        kpis,
        overdue,
        due_soon,
        trend: weekly_trend(document, today),
        distribution: type_distribution(document, today),
    }
}

fn detail_row(document: &Document, evaluation: &PlanEvaluation<'_>, days: Option<i64>) -> DetailRow {
    let vehicle = evaluation.vehicle;
    DetailRow {
        plan_id: evaluation.plan.id.clone(),
        vehicle_id: vehicle.id.clone(),
        license_plate: vehicle.license_plate.clone(),
        brand: document
            .lookup_value(LookupTable::Brands, vehicle.brand_id.as_ref())
            .unwrap_or_default()
            .to_owned(),
        maintenance_type: document
            .plan_label(evaluation.plan)
            .unwrap_or(DEFAULT_TYPE_LABEL)
            .to_owned(),
        due_label: evaluation
            .due_date
            .map_or_else(|| NEVER_PERFORMED.to_owned(), format_display),
        days,
    }
}

/// Rows whose vehicle id, plate, or maintenance type contains `query`.
pub fn filter_details<'a>(rows: &'a [DetailRow], query: &str) -> Vec<&'a DetailRow> {
    rows.iter()
        .filter(|row| {
            contains_ignore_case(row.vehicle_id.as_str(), query)
                || contains_ignore_case(&row.license_plate, query)
                || contains_ignore_case(&row.maintenance_type, query)
        })
        .collect()
}

/// Completed maintenance per Monday-aligned week, from six months back through `today`.
pub fn weekly_trend(document: &Document, today: Date) -> Vec<TrendBucket> {
    let mut start = previous_monday(add_months(today, -TREND_MONTHS));
    let mut buckets = Vec::new();
    while start <= today {
        let Some(end) = start.checked_add(Duration::days(7)) else {
            break;
        };
        let completed = document
            .history
            .iter()
            .filter(|entry| entry.date >= start && entry.date < end)
            .count();
        buckets.push(TrendBucket {
            start,
            label: format_short_label(start),
            completed,
        });
        start = end;
    }
    buckets
}

/// History from the last 30 days grouped by maintenance type, in first-seen order.
pub fn type_distribution(document: &Document, today: Date) -> Vec<TypeSlice> {
    let cutoff = today
        .checked_sub(Duration::days(DISTRIBUTION_DAYS))
        .unwrap_or(today);
    let mut counts: Vec<(String, usize)> = Vec::new();
    for entry in document.history.iter().filter(|entry| entry.date >= cutoff) {
        let label = document
            .plan(&entry.plan_id)
            .and_then(|plan| document.plan_label(plan))
            .unwrap_or(OTHER_TYPE_LABEL);
        match counts.iter_mut().find(|(existing, _)| existing == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label.to_owned(), 1)),
        }
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(index, (label, count))| TypeSlice {
            label,
            count,
            color: TYPE_PALETTE[index % TYPE_PALETTE.len()],
        })
        .collect()
}
