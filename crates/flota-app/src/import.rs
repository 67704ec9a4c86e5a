// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Bulk import from semicolon-delimited spreadsheet exports.

use anyhow::{Result, bail};
use std::collections::HashMap;

use crate::dates;
use crate::ids::*;
use crate::model::*;
use crate::text::fold_key;
use crate::wire::leading_count;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Vehicles,
    Plans,
    History,
}

impl ImportKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vehicles => "vehicles",
            Self::Plans => "plans",
            Self::History => "history",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "vehicles" => Some(Self::Vehicles),
            "plans" => Some(Self::Plans),
            "history" => Some(Self::History),
            _ => None,
        }
    }

    /// Folded header names, in the order the export writes them.
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Vehicles => &[
                "id",
                "matricula",
                "marca",
                "modelo",
                "tipo vehiculo",
                "sistema",
                "estado",
                "engrase",
                "notas",
            ],
            Self::Plans => &["id vehiculo", "tipo mantenimiento", "dias", "km", "aceite"],
            Self::History => &[
                "fecha",
                "id vehiculo",
                "tipo mantenimiento",
                "operario",
                "observaciones",
            ],
        }
    }

    const fn required(self) -> &'static [&'static str] {
        match self {
            Self::Vehicles => &["id"],
            Self::Plans => &["id vehiculo", "tipo mantenimiento"],
            Self::History => &["id vehiculo", "tipo mantenimiento", "fecha"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub kind: ImportKind,
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl ImportReport {
    fn new(kind: ImportKind) -> Self {
        Self {
            kind,
            imported: 0,
            skipped: 0,
            errors: Vec::new(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} import finished: {} added, {} skipped, {} errors",
            self.kind.as_str(),
            self.imported,
            self.skipped,
            self.errors.len()
        )
    }
}

/// Excel on Windows exports Latin-1; anything that is not valid UTF-8 is read that way.
pub fn decode_csv_bytes(bytes: &[u8]) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => bytes.iter().map(|&byte| char::from(byte)).collect(),
    };
    text.strip_prefix('\u{feff}')
        .map(str::to_owned)
        .unwrap_or(text)
}

struct Row {
    line: usize,
    cells: HashMap<String, String>,
}

impl Row {
    fn get(&self, column: &str) -> &str {
        self.cells.get(column).map_or("", String::as_str)
    }
}

fn parse_rows(kind: ImportKind, text: &str) -> Result<Vec<Row>> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header)) = lines.next() else {
        bail!(
            "{} CSV is empty -- export it with a header row: {}",
            kind.as_str(),
            kind.columns().join(";")
        );
    };
    let headers = header
        .trim_start_matches('\u{feff}')
        .split(';')
        .map(|cell| fold_key(unquote(cell)))
        .collect::<Vec<_>>();

    let missing = kind
        .required()
        .iter()
        .filter(|column| !headers.iter().any(|header| header == *column))
        .copied()
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!(
            "{} CSV is missing column(s) {}; expected header: {}",
            kind.as_str(),
            missing.join(", "),
            kind.columns().join(";")
        );
    }

    Ok(lines
        .map(|(index, line)| {
            let values = line.split(';').map(unquote);
            let cells = headers
                .iter()
                .cloned()
                .zip(values.map(str::to_owned))
                .collect();
            Row {
                line: index + 1,
                cells,
            }
        })
        .collect())
}

fn unquote(cell: &str) -> &str {
    let trimmed = cell.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map_or(trimmed, str::trim)
}

/// Apply one CSV export to a copy of `document`. Row problems are collected in the
/// report; only an unreadable header fails the whole import.
pub fn import_csv(
    document: &Document,
    kind: ImportKind,
    text: &str,
) -> Result<(Document, ImportReport)> {
    let rows = parse_rows(kind, text)?;
    let mut next = document.clone();
    let mut report = ImportReport::new(kind);
    for row in &rows {
        let outcome = match kind {
            ImportKind::Vehicles => import_vehicle(&mut next, row),
            ImportKind::Plans => import_plan(&mut next, row),
            ImportKind::History => import_history(&mut next, row),
        };
        match outcome {
            Ok(true) => report.imported += 1,
            Ok(false) => report.skipped += 1,
            Err(message) => report.errors.push(format!("line {}: {message}", row.line)),
        }
    }
    Ok((next, report))
}

type RowOutcome = std::result::Result<bool, String>;

fn import_vehicle(document: &mut Document, row: &Row) -> RowOutcome {
    let raw_id = row.get("id");
    if raw_id.is_empty() {
        return Err("vehicle id is empty".to_owned());
    }
    let id = VehicleId::padded(raw_id);
    if document.vehicle(&id).is_some() {
        return Ok(false);
    }

    let vehicle = Vehicle {
        id,
        license_plate: row.get("matricula").to_owned(),
        brand_id: document.lookup_id_by_value(LookupTable::Brands, row.get("marca")),
        model_id: document.lookup_id_by_value(LookupTable::Models, row.get("modelo")),
        vehicle_type_id: document
            .lookup_id_by_value(LookupTable::VehicleTypes, row.get("tipo vehiculo")),
        system_id: document.lookup_id_by_value(LookupTable::Systems, row.get("sistema")),
        status: VehicleStatus::parse(row.get("estado")).unwrap_or_default(),
        grease_type: GreaseType::parse(row.get("engrase")).unwrap_or_default(),
        notes: row.get("notas").to_owned(),
    };
    document.vehicles.push(vehicle);
    Ok(true)
}

fn resolve_maintenance_type(document: &Document, row: &Row) -> std::result::Result<LookupId, String> {
    let name = row.get("tipo mantenimiento");
    if name.is_empty() {
        return Err("maintenance type is empty".to_owned());
    }
    document
        .lookup_id_by_value(LookupTable::MaintenanceTypes, name)
        .ok_or_else(|| format!("unknown maintenance type {name:?}"))
}

fn row_vehicle_id(row: &Row) -> std::result::Result<VehicleId, String> {
    let raw = row.get("id vehiculo");
    if raw.is_empty() {
        return Err("vehicle id is empty".to_owned());
    }
    Ok(VehicleId::padded(raw))
}

fn import_plan(document: &mut Document, row: &Row) -> RowOutcome {
    let vehicle_id = row_vehicle_id(row)?;
    let maintenance_type_id = resolve_maintenance_type(document, row)?;
    if document.vehicle(&vehicle_id).is_none() {
        return Err(format!("vehicle {vehicle_id} does not exist"));
    }

    let id = PlanId::new(next_numeric_id(
        document.maintenance_plans.iter().map(|plan| plan.id.numeric()),
    ));
    let plan = MaintenancePlan {
        id,
        vehicle_id,
        maintenance_type_id: Some(maintenance_type_id),
        period_days: leading_count(row.get("dias")),
        period_km: leading_count(row.get("km")),
        oil_type_id: document.lookup_id_by_value(LookupTable::OilTypes, row.get("aceite")),
        status: PlanStatus::Active,
    };
    document.maintenance_plans.push(plan);
    Ok(true)
}

fn import_history(document: &mut Document, row: &Row) -> RowOutcome {
    let vehicle_id = row_vehicle_id(row)?;
    let maintenance_type_id = resolve_maintenance_type(document, row)?;
    let plan_id = document
        .maintenance_plans
        .iter()
        .find(|plan| {
            plan.vehicle_id == vehicle_id
                && plan.maintenance_type_id.as_ref() == Some(&maintenance_type_id)
        })
        .map(|plan| plan.id.clone())
        .ok_or_else(|| {
            format!(
                "no {:?} plan for vehicle {vehicle_id}",
                row.get("tipo mantenimiento")
            )
        })?;

    let raw_date = row.get("fecha");
    let date = dates::parse_strict(raw_date)
        .ok_or_else(|| format!("unreadable date {raw_date:?}; use DD/MM/YYYY or YYYY-MM-DD"))?;

    let id = HistoryId::new(next_numeric_id(
        document.history.iter().map(|entry| entry.id.numeric()),
    ));
    document.history.push(HistoryEntry {
        id,
        plan_id,
        date,
        operator_id: document.lookup_id_by_value(LookupTable::Operators, row.get("operario")),
        observations: row.get("observaciones").to_owned(),
        km: None,
    });
    Ok(true)
}
