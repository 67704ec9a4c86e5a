// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Weekday;
use time::macros::date;

use crate::ids::*;
use crate::model::*;

const BRANDS: [&str; 4] = ["Volvo", "Scania", "Mercedes-Benz", "MAN"];
const MODELS: [&str; 4] = ["FH16", "R500", "Actros", "TGX"];
const SYSTEMS: [&str; 8] = [
    "CADENAS",
    "CADENAS Y MINI",
    "CAMION GRUA",
    "FRONTAL",
    "GANCHO",
    "PULPO",
    "REMOLQUE",
    "TRACTORA",
];
const MAINTENANCE_TYPES: [&str; 4] = ["Engrase", "Engrase 5ª Rueda", "Soplado", "Cambio de Aceite"];
const OIL_TYPES: [&str; 3] = ["15W40 Sintético", "10W40 Semisintético", "Valvulina 80W90"];
const OPERATORS: [&str; 3] = ["Juan Pérez", "García Martínez", "Luis Fernández"];

pub(crate) fn bootstrap_admin() -> User {
    User {
        username: "admin".to_owned(),
        password: "password123".to_owned(),
        role: Role::Admin,
    }
}

/// Factory values for a lookup table, numbered from 1.
pub fn default_lookup_values(table: LookupTable) -> Vec<LookupEntry> {
    let values: &[&str] = match table {
        LookupTable::Brands => &BRANDS,
        LookupTable::Models => &MODELS,
        LookupTable::VehicleTypes => &[],
        LookupTable::Systems => &SYSTEMS,
        LookupTable::MaintenanceTypes => &MAINTENANCE_TYPES,
        LookupTable::OilTypes => &OIL_TYPES,
        LookupTable::Operators => &OPERATORS,
    };
    values
        .iter()
        .enumerate()
        .map(|(index, value)| LookupEntry::new((index + 1).to_string(), *value))
        .collect()
}

fn lookup(id: &str) -> Option<LookupId> {
    Some(LookupId::from(id))
}

impl Document {
    /// Demo fleet written on first start.
    pub fn initial() -> Self {
        let mut document = Self::blank();
        for table in LookupTable::ALL {
            *document.lookup_mut(table) = default_lookup_values(table);
        }

        document.vehicles = vec![
            Vehicle {
                id: VehicleId::from("0001"),
                license_plate: "1234ABC".to_owned(),
                brand_id: lookup("1"),
                model_id: lookup("1"),
                vehicle_type_id: None,
                system_id: lookup("1"),
                status: VehicleStatus::Active,
                grease_type: GreaseType::Manual,
                notes: "Vehículo de prueba".to_owned(),
            },
            Vehicle {
                id: VehicleId::from("0002"),
                license_plate: "5678DEF".to_owned(),
                brand_id: lookup("2"),
                model_id: lookup("2"),
                vehicle_type_id: None,
                system_id: lookup("2"),
                status: VehicleStatus::Active,
                grease_type: GreaseType::Automatic,
                notes: String::new(),
            },
        ];

        document.maintenance_plans = vec![
            MaintenancePlan {
                id: PlanId::from("1"),
                vehicle_id: VehicleId::from("0001"),
                maintenance_type_id: lookup("1"),
                period_days: 30,
                period_km: 5000,
                oil_type_id: lookup("1"),
                status: PlanStatus::Active,
            },
            MaintenancePlan {
                id: PlanId::from("2"),
                vehicle_id: VehicleId::from("0001"),
                maintenance_type_id: lookup("2"),
                period_days: 15,
                period_km: 2000,
                oil_type_id: lookup("2"),
                status: PlanStatus::Active,
            },
        ];

        document.history = vec![HistoryEntry {
            id: HistoryId::from("1"),
            plan_id: PlanId::from("1"),
            date: date!(2026 - 01 - 15),
            operator_id: lookup("1"),
            observations: "Todo correcto".to_owned(),
            km: None,
        }];

        document.coordinators = vec![
            Coordinator {
                id: CoordinatorId::from("1"),
                name: "Coordinador Ejemplo".to_owned(),
                role: "Gestor de Flota".to_owned(),
                email: "coordinador@ejemplo.com".to_owned(),
                system_id: lookup("1"),
            },
            Coordinator {
                id: CoordinatorId::from("2"),
                name: "Resp. Tráfico".to_owned(),
                role: "Jefe de Tráfico".to_owned(),
                email: "trafico@ejemplo.com".to_owned(),
                system_id: None,
            },
        ];

        document.report_settings = ReportSettings {
            day_of_week: Weekday::Monday,
            hour: "09:00".to_owned(),
            last_sent: None,
            enabled: true,
            google_script_url: String::new(),
        };
        document
    }
}
