// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use flota_app::{
    Document, GreaseType, HistoryFormInput, LookupId, LookupTable, PlanFormInput,
    VehicleFormInput, VehicleStatus,
};
use std::path::PathBuf;
use time::macros::date;
use time::{Date, Duration};

const PLATE_LETTERS: [char; 20] = [
    'B', 'C', 'D', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'R', 'S', 'T', 'V', 'W', 'X',
    'Y', 'Z',
];

const OBSERVATIONS: [&str; 8] = [
    "Todo correcto",
    "Sin incidencias",
    "Engrase completo",
    "Revisar latiguillo",
    "Filtro sustituido",
    "Nivel de aceite repuesto",
    "Pendiente de pieza",
    "Soplado de radiador",
];

const PERIODS: [u32; 6] = [0, 7, 15, 30, 60, 90];

const STATUSES: [VehicleStatus; 6] = [
    VehicleStatus::Active,
    VehicleStatus::Active,
    VehicleStatus::Active,
    VehicleStatus::Active,
    VehicleStatus::Registered,
    VehicleStatus::Retired,
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator for fleet documents. The same seed always yields the same fleet.
#[derive(Debug, Clone)]
pub struct FleetFaker {
    rng: DeterministicRng,
}

impl FleetFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    /// Spanish-style plate: four digits and three consonants.
    pub fn license_plate(&mut self) -> String {
        let digits = self.rng.int_n(10_000);
        let letters = (0..3)
            .map(|_| PLATE_LETTERS[self.rng.int_n(PLATE_LETTERS.len())])
            .collect::<String>();
        format!("{digits:04}{letters}")
    }

    pub fn observation(&mut self) -> String {
        OBSERVATIONS[self.rng.int_n(OBSERVATIONS.len())].to_owned()
    }

    /// A day between `max_days_back` days before `today` and `today`.
    pub fn date_before(&mut self, today: Date, max_days_back: usize) -> Date {
        let back = self.rng.int_n(max_days_back + 1) as i64;
        today.checked_sub(Duration::days(back)).unwrap_or(today)
    }

    /// Factory lookups plus `vehicles` generated vehicles, each with one to three plans
    /// and up to three history entries per plan dated before `today`. Plans are created
    /// active even on retired vehicles.
    pub fn fleet(&mut self, vehicles: usize, today: Date) -> Result<Document> {
        let mut document = Document::blank();
        for table in LookupTable::ALL {
            document = document.reset_lookup_defaults(table);
        }

        for index in 0..vehicles {
            let form = VehicleFormInput {
                id: (index + 1).to_string(),
                license_plate: self.license_plate(),
                brand_id: self.pick_lookup(&document, LookupTable::Brands),
                model_id: self.pick_lookup(&document, LookupTable::Models),
                vehicle_type_id: None,
                system_id: self.pick_lookup(&document, LookupTable::Systems),
                status: STATUSES[self.rng.int_n(STATUSES.len())],
                grease_type: if self.rng.bool() {
                    GreaseType::Automatic
                } else {
                    GreaseType::Manual
                },
                notes: String::new(),
            };
            let (next, vehicle_id) = document
                .create_vehicle(&form)
                .with_context(|| format!("create fixture vehicle {}", index + 1))?;
            document = next;

            for _ in 0..=self.rng.int_n(3) {
                let plan = PlanFormInput {
                    vehicle_id: vehicle_id.clone(),
                    maintenance_type_id: self.pick_lookup(&document, LookupTable::MaintenanceTypes),
                    period_days: PERIODS[self.rng.int_n(PERIODS.len())],
                    period_km: (self.rng.int_n(10) as u32) * 1_000,
                    oil_type_id: self.pick_lookup(&document, LookupTable::OilTypes),
                };
                let (next, plan_id) = document
                    .create_plan(&plan)
                    .with_context(|| format!("create fixture plan for vehicle {vehicle_id}"))?;
                document = next;

                for _ in 0..self.rng.int_n(4) {
                    let entry = HistoryFormInput {
                        plan_id: plan_id.clone(),
                        date: self.date_before(today, 150),
                        operator_id: self.pick_lookup(&document, LookupTable::Operators),
                        observations: self.observation(),
                        km: Some(self.rng.int_n(400_000) as u32),
                    };
                    let (next, _) = document
                        .record_history(&entry)
                        .with_context(|| format!("record fixture history for plan {plan_id}"))?;
                    document = next;
                }
            }
        }
        Ok(document)
    }

    fn pick_lookup(&mut self, document: &Document, table: LookupTable) -> Option<LookupId> {
        let entries = document.lookup(table);
        if entries.is_empty() {
            return None;
        }
        Some(entries[self.rng.int_n(entries.len())].id.clone())
    }
}

/// Reference date shared by fixture-driven tests.
pub fn fixture_today() -> Date {
    date!(2026 - 03 - 02)
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("flota.db");
    Ok((dir, db_path))
}

#[cfg(test)]
mod tests {
    use super::{FleetFaker, fixture_today};
    use anyhow::Result;
    use flota_app::VehicleStatus;

    #[test]
    fn new_deterministic_seed() -> Result<()> {
        let left = FleetFaker::new(42).fleet(12, fixture_today())?;
        let right = FleetFaker::new(42).fleet(12, fixture_today())?;
        assert_eq!(left, right);
        Ok(())
    }

    #[test]
    fn license_plate_shape() {
        let mut faker = FleetFaker::new(7);
        for _ in 0..20 {
            let plate = faker.license_plate();
            assert_eq!(plate.len(), 7, "{plate}");
            assert!(plate[..4].chars().all(|c| c.is_ascii_digit()));
            assert!(plate[4..].chars().all(|c| c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn fleet_has_padded_ids_and_resolvable_plans() -> Result<()> {
        let today = fixture_today();
        let document = FleetFaker::new(3).fleet(30, today)?;
        assert_eq!(document.vehicles.len(), 30);
        assert_eq!(document.vehicles[0].id.as_str(), "0001");
        assert_eq!(document.vehicles[29].id.as_str(), "0030");
        for plan in &document.maintenance_plans {
            assert!(document.vehicle(&plan.vehicle_id).is_some());
            assert!(document.plan_label(plan).is_some());
        }
        assert!(document.history.iter().all(|entry| entry.date <= today));
        Ok(())
    }

    #[test]
    fn fleets_include_retired_vehicles() -> Result<()> {
        let document = FleetFaker::new(11).fleet(60, fixture_today())?;
        assert!(
            document
                .vehicles
                .iter()
                .any(|vehicle| vehicle.status == VehicleStatus::Retired)
        );
        Ok(())
    }
}
