// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use flota_app::dates::{format_display, format_iso};
use flota_app::text::contains_ignore_case;
use flota_app::{Document, DueState, PlanId, Urgency, VehicleId, evaluate_all, sort_by_urgency};
use time::Date;

const UNRESOLVED: &str = "N/A";
const UNGROUPED_KEY: &str = "Sin Categoría";
const CSV_HEADER: [&str; 7] = [
    "Vehículo",
    "Matrícula",
    "Sistema",
    "Plan Mantenimiento",
    "Últ. Realización",
    "Días Vencidos",
    "Estado",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub plan_id: PlanId,
    pub vehicle_id: VehicleId,
    pub license_plate: String,
    pub system: String,
    pub plan: String,
    pub last_performed: Option<Date>,
    /// Zero unless the plan is overdue.
    pub overdue_days: i64,
    pub state: DueState,
}

impl ReportRow {
    pub const fn status(&self) -> &'static str {
        self.state.label()
    }

    pub const fn urgency(&self) -> Urgency {
        self.state.urgency()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    System,
    LicensePlate,
    Plan,
}

impl GroupBy {
    pub const ALL: [Self; 3] = [Self::System, Self::LicensePlate, Self::Plan];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::LicensePlate => "plate",
            Self::Plan => "plan",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|group_by| group_by.as_str() == value.trim())
    }

    const fn heading(self) -> &'static str {
        match self {
            Self::System => "Sistema",
            Self::LicensePlate => "Vehículo",
            Self::Plan => "Plan",
        }
    }

    fn key(self, row: &ReportRow) -> &str {
        match self {
            Self::System => &row.system,
            Self::LicensePlate => &row.license_plate,
            Self::Plan => &row.plan,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGroup {
    pub group_by: GroupBy,
    pub key: String,
    pub rows: Vec<ReportRow>,
}

impl RowGroup {
    /// `Sistema: GANCHO (3)`
    pub fn heading(&self) -> String {
        format!(
            "{}: {} ({})",
            self.group_by.heading(),
            self.key,
            self.rows.len()
        )
    }
}

/// One row per evaluable plan matching `query`, most urgent first.
pub fn report_rows(document: &Document, today: Date, query: &str) -> Vec<ReportRow> {
    let mut evaluations = evaluate_all(document, today);
    sort_by_urgency(&mut evaluations);
    evaluations
        .into_iter()
        .map(|evaluation| ReportRow {
            plan_id: evaluation.plan.id.clone(),
            vehicle_id: evaluation.vehicle.id.clone(),
            license_plate: evaluation.vehicle.license_plate.clone(),
            system: document
                .system_label(evaluation.vehicle)
                .unwrap_or(UNRESOLVED)
                .to_owned(),
            plan: document
                .plan_label(evaluation.plan)
                .unwrap_or(UNRESOLVED)
                .to_owned(),
            last_performed: evaluation.last_performed,
            overdue_days: evaluation.state.overdue_days(),
            state: evaluation.state,
        })
        .filter(|row| row_matches(row, query))
        .collect()
}

fn row_matches(row: &ReportRow, query: &str) -> bool {
    contains_ignore_case(row.vehicle_id.as_str(), query)
        || contains_ignore_case(&row.license_plate, query)
        || contains_ignore_case(&row.system, query)
        || contains_ignore_case(&row.plan, query)
}

/// Groups ordered by key ignoring case; rows keep their incoming order inside a group.
pub fn group_rows(rows: &[ReportRow], group_by: GroupBy) -> Vec<RowGroup> {
    let mut groups: Vec<RowGroup> = Vec::new();
    for row in rows {
        let key = match group_by.key(row).trim() {
            "" => UNGROUPED_KEY,
            key => key,
        };
        match groups.iter_mut().find(|group| group.key == key) {
            Some(group) => group.rows.push(row.clone()),
            None => groups.push(RowGroup {
                group_by,
                key: key.to_owned(),
                rows: vec![row.clone()],
            }),
        }
    }
    groups.sort_by_key(|group| group.key.to_lowercase());
    groups
}

/// Semicolon-separated export with a UTF-8 BOM so spreadsheet tools pick the encoding.
pub fn report_csv(rows: &[ReportRow], group_by: Option<GroupBy>) -> String {
    let ordered = match group_by {
        Some(group_by) => group_rows(rows, group_by)
            .into_iter()
            .flat_map(|group| group.rows)
            .collect(),
        None => rows.to_vec(),
    };

    let mut lines = vec![CSV_HEADER.join(";")];
    lines.extend(ordered.iter().map(|row| {
        [
            csv_field(row.vehicle_id.as_str()),
            csv_field(&row.license_plate),
            csv_field(&row.system),
            csv_field(&row.plan),
            row.last_performed
                .map_or_else(|| UNRESOLVED.to_owned(), format_display),
            row.overdue_days.to_string(),
            row.status().to_owned(),
        ]
        .join(";")
    }));
    format!("\u{feff}{}", lines.join("\n"))
}

pub fn report_file_name(today: Date) -> String {
    format!("Informe_Estado_Flota_{}.csv", format_iso(today))
}

fn csv_field(value: &str) -> String {
    if value.contains([';', '"', '\n']) {
        return format!("\"{}\"", value.replace('"', "\"\""));
    }
    value.to_owned()
}

#[cfg(test)]
mod tests {
    use super::{GroupBy, group_rows, report_csv, report_file_name, report_rows};
    use flota_app::Document;
    use time::macros::date;

    #[test]
    fn rows_sort_pending_first_then_by_overdue_days() {
        let rows = report_rows(&Document::initial(), date!(2026 - 03 - 01), "");
        let statuses = rows.iter().map(|row| row.status()).collect::<Vec<_>>();
        assert_eq!(statuses, vec!["Pendiente", "Vencido"]);
        assert_eq!(rows[0].overdue_days, 0);
        assert_eq!(rows[1].overdue_days, 15);
        assert_eq!(rows[1].system, "CADENAS");
        assert_eq!(rows[1].last_performed, Some(date!(2026 - 01 - 15)));
    }

    #[test]
    fn due_soon_reports_in_time() {
        let rows = report_rows(&Document::initial(), date!(2026 - 02 - 10), "engrase");
        let row = rows
            .iter()
            .find(|row| row.plan_id.as_str() == "1")
            .expect("plan 1 row");
        assert_eq!(row.status(), "En Plazo");
        assert_eq!(row.overdue_days, 0);
    }

    #[test]
    fn query_matches_system_and_plan_labels() {
        let document = Document::initial();
        let today = date!(2026 - 03 - 01);
        assert_eq!(report_rows(&document, today, "cadenas").len(), 2);
        assert_eq!(report_rows(&document, today, "5ª").len(), 1);
        assert!(report_rows(&document, today, "grua").is_empty());
    }

    #[test]
    fn group_keys_sort_ignoring_case_and_fill_blank() {
        let mut rows = report_rows(&Document::initial(), date!(2026 - 03 - 01), "");
        rows[0].license_plate = String::new();
        rows[1].license_plate = "abc".to_owned();
        let groups = group_rows(&rows, GroupBy::LicensePlate);
        let keys = groups.iter().map(|group| group.key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["abc", "Sin Categoría"]);
        assert_eq!(groups[1].heading(), "Vehículo: Sin Categoría (1)");
    }

    #[test]
    fn csv_has_bom_header_and_display_dates() {
        let rows = report_rows(&Document::initial(), date!(2026 - 03 - 01), "");
        let csv = report_csv(&rows, Some(GroupBy::Plan));
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("\u{feff}Vehículo;Matrícula;Sistema;Plan Mantenimiento;Últ. Realización;Días Vencidos;Estado")
        );
        assert_eq!(lines.next(), Some("0001;1234ABC;CADENAS;Engrase;15/01/2026;15;Vencido"));
        assert_eq!(lines.next(), Some("0001;1234ABC;CADENAS;Engrase 5ª Rueda;N/A;0;Pendiente"));
        assert_eq!(
            report_file_name(date!(2026 - 03 - 01)),
            "Informe_Estado_Flota_2026-03-01.csv"
        );
    }
}
