// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::{Date, Weekday};

use crate::dates::{self, serde_date, serde_opt_date, serde_weekday};
use crate::ids::*;
use crate::text::fold_key;
use crate::wire;

macro_rules! wire_enum {
    ($name:ident, $default:ident, { $($variant:ident => $text:literal $(| $alias:literal)*),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            /// Case- and accent-insensitive.
            pub fn parse(value: &str) -> Option<Self> {
                let folded = fold_key(value);
                $(
                    if folded == fold_key($text) $(|| folded == $alias)* {
                        return Some(Self::$variant);
                    }
                )+
                None
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_owned()
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                if value.trim().is_empty() {
                    return Ok(Self::default());
                }
                Self::parse(&value).ok_or_else(|| {
                    let expected = Self::ALL
                        .iter()
                        .map(|variant| variant.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!(
                        "unknown {} {:?}; expected one of: {}",
                        stringify!($name),
                        value,
                        expected
                    )
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VehicleStatus {
    Active,
    Retired,
    Registered,
}

wire_enum!(VehicleStatus, Active, {
    Active => "Activo" | "active",
    Retired => "Baja" | "retired",
    Registered => "Alta" | "registered",
});

impl VehicleStatus {
    /// Retired vehicles drop out of every due computation.
    pub const fn is_retired(self) -> bool {
        matches!(self, Self::Retired)
    }

    /// Counted as "active" on the dashboard.
    pub const fn is_in_service(self) -> bool {
        matches!(self, Self::Active | Self::Registered)
    }

    /// Plans follow their vehicle: only an `Activo` vehicle keeps its plans active.
    pub const fn plan_status(self) -> PlanStatus {
        match self {
            Self::Active => PlanStatus::Active,
            Self::Retired | Self::Registered => PlanStatus::Inactive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GreaseType {
    Manual,
    Automatic,
}

wire_enum!(GreaseType, Manual, {
    Manual => "Manual",
    Automatic => "Automático" | "automatic",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PlanStatus {
    Active,
    Inactive,
}

wire_enum!(PlanStatus, Active, {
    Active => "Activo" | "active",
    Inactive => "Inactivo" | "inactive",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Admin,
    User,
}

wire_enum!(Role, User, {
    Admin => "admin" | "administrador",
    User => "user" | "usuario",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupTable {
    Brands,
    Models,
    VehicleTypes,
    Systems,
    MaintenanceTypes,
    OilTypes,
    Operators,
}

impl LookupTable {
    pub const ALL: [Self; 7] = [
        Self::Brands,
        Self::Models,
        Self::VehicleTypes,
        Self::Systems,
        Self::MaintenanceTypes,
        Self::OilTypes,
        Self::Operators,
    ];

    /// Top-level document key.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Brands => "brands",
            Self::Models => "models",
            Self::VehicleTypes => "vehicleTypes",
            Self::Systems => "systems",
            Self::MaintenanceTypes => "maintenanceTypes",
            Self::OilTypes => "oilTypes",
            Self::Operators => "operators",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Brands => "brand",
            Self::Models => "model",
            Self::VehicleTypes => "vehicle type",
            Self::Systems => "system",
            Self::MaintenanceTypes => "maintenance type",
            Self::OilTypes => "oil type",
            Self::Operators => "operator",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let folded = fold_key(value).replace(['-', '_', ' '], "");
        Self::ALL
            .into_iter()
            .find(|table| table.key().to_lowercase() == folded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: VehicleId,
    #[serde(default, deserialize_with = "wire::string")]
    pub license_plate: String,
    #[serde(default, with = "wire::fk")]
    pub brand_id: Option<LookupId>,
    #[serde(default, with = "wire::fk")]
    pub model_id: Option<LookupId>,
    #[serde(default, with = "wire::fk")]
    pub vehicle_type_id: Option<LookupId>,
    #[serde(default, with = "wire::fk")]
    pub system_id: Option<LookupId>,
    #[serde(default)]
    pub status: VehicleStatus,
    #[serde(default)]
    pub grease_type: GreaseType,
    #[serde(default, deserialize_with = "wire::string")]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupEntry {
    pub id: LookupId,
    #[serde(default, deserialize_with = "wire::string")]
    pub value: String,
}

impl LookupEntry {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: LookupId::new(id),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenancePlan {
    pub id: PlanId,
    #[serde(default)]
    pub vehicle_id: VehicleId,
    #[serde(default, with = "wire::fk")]
    pub maintenance_type_id: Option<LookupId>,
    #[serde(default, deserialize_with = "wire::count")]
    pub period_days: u32,
    #[serde(default, deserialize_with = "wire::count")]
    pub period_km: u32,
    #[serde(default, with = "wire::fk")]
    pub oil_type_id: Option<LookupId>,
    #[serde(default)]
    pub status: PlanStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: HistoryId,
    #[serde(default)]
    pub plan_id: PlanId,
    #[serde(default = "epoch", with = "serde_date")]
    pub date: Date,
    #[serde(default, with = "wire::fk")]
    pub operator_id: Option<LookupId>,
    #[serde(default, deserialize_with = "wire::string")]
    pub observations: String,
    #[serde(
        default,
        with = "wire::opt_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub km: Option<u32>,
}

fn epoch() -> Date {
    dates::EPOCH
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinator {
    pub id: CoordinatorId,
    #[serde(default, deserialize_with = "wire::string")]
    pub name: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub role: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub email: String,
    /// `None` means the coordinator receives the all-systems report.
    #[serde(default, with = "wire::fk")]
    pub system_id: Option<LookupId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportSettings {
    #[serde(with = "serde_weekday")]
    pub day_of_week: Weekday,
    #[serde(deserialize_with = "wire::string")]
    pub hour: String,
    #[serde(with = "serde_opt_date")]
    pub last_sent: Option<Date>,
    #[serde(deserialize_with = "wire::flag")]
    pub enabled: bool,
    #[serde(deserialize_with = "wire::string")]
    pub google_script_url: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            day_of_week: Weekday::Monday,
            hour: "09:00".to_owned(),
            last_sent: None,
            enabled: false,
            google_script_url: String::new(),
        }
    }
}

impl ReportSettings {
    pub fn sync_url(&self) -> Option<&str> {
        let trimmed = self.google_script_url.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "wire::string")]
    pub username: String,
    #[serde(default, deserialize_with = "wire::string")]
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// The whole persisted state. Missing top-level keys decode from the blank template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    pub vehicles: Vec<Vehicle>,
    pub brands: Vec<LookupEntry>,
    pub models: Vec<LookupEntry>,
    pub vehicle_types: Vec<LookupEntry>,
    pub systems: Vec<LookupEntry>,
    pub maintenance_types: Vec<LookupEntry>,
    pub oil_types: Vec<LookupEntry>,
    pub operators: Vec<LookupEntry>,
    pub maintenance_plans: Vec<MaintenancePlan>,
    pub history: Vec<HistoryEntry>,
    pub coordinators: Vec<Coordinator>,
    pub report_settings: ReportSettings,
    pub users: Vec<User>,
}

impl Default for Document {
    fn default() -> Self {
        Self::blank()
    }
}

impl Document {
    pub const TOP_LEVEL_KEYS: [&'static str; 13] = [
        "vehicles",
        "brands",
        "models",
        "vehicleTypes",
        "systems",
        "maintenanceTypes",
        "oilTypes",
        "operators",
        "maintenancePlans",
        "history",
        "coordinators",
        "reportSettings",
        "users",
    ];

    /// Empty tables, default schedule, and the bootstrap admin account.
    pub fn blank() -> Self {
        Self {
            vehicles: Vec::new(),
            brands: Vec::new(),
            models: Vec::new(),
            vehicle_types: Vec::new(),
            systems: Vec::new(),
            maintenance_types: Vec::new(),
            oil_types: Vec::new(),
            operators: Vec::new(),
            maintenance_plans: Vec::new(),
            history: Vec::new(),
            coordinators: Vec::new(),
            report_settings: ReportSettings::default(),
            users: vec![crate::seed::bootstrap_admin()],
        }
    }

    pub fn lookup(&self, table: LookupTable) -> &[LookupEntry] {
        match table {
            LookupTable::Brands => &self.brands,
            LookupTable::Models => &self.models,
            LookupTable::VehicleTypes => &self.vehicle_types,
            LookupTable::Systems => &self.systems,
            LookupTable::MaintenanceTypes => &self.maintenance_types,
            LookupTable::OilTypes => &self.oil_types,
            LookupTable::Operators => &self.operators,
        }
    }

    pub(crate) fn lookup_mut(&mut self, table: LookupTable) -> &mut Vec<LookupEntry> {
        match table {
            LookupTable::Brands => &mut self.brands,
            LookupTable::Models => &mut self.models,
            LookupTable::VehicleTypes => &mut self.vehicle_types,
            LookupTable::Systems => &mut self.systems,
            LookupTable::MaintenanceTypes => &mut self.maintenance_types,
            LookupTable::OilTypes => &mut self.oil_types,
            LookupTable::Operators => &mut self.operators,
        }
    }

    pub fn lookup_value(&self, table: LookupTable, id: Option<&LookupId>) -> Option<&str> {
        let id = id?;
        self.lookup(table)
            .iter()
            .find(|entry| &entry.id == id)
            .map(|entry| entry.value.as_str())
    }

    /// Resolve a display value back to its id, ignoring case.
    pub fn lookup_id_by_value(&self, table: LookupTable, value: &str) -> Option<LookupId> {
        let wanted = value.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.lookup(table)
            .iter()
            .find(|entry| entry.value.trim().to_lowercase() == wanted)
            .map(|entry| entry.id.clone())
    }

    pub fn vehicle(&self, id: &VehicleId) -> Option<&Vehicle> {
        self.vehicles.iter().find(|vehicle| &vehicle.id == id)
    }

    pub fn plan(&self, id: &PlanId) -> Option<&MaintenancePlan> {
        self.maintenance_plans.iter().find(|plan| &plan.id == id)
    }

    pub fn plans_for_vehicle<'a>(
        &'a self,
        vehicle_id: &'a VehicleId,
    ) -> impl Iterator<Item = &'a MaintenancePlan> + 'a {
        self.maintenance_plans
            .iter()
            .filter(move |plan| &plan.vehicle_id == vehicle_id)
    }

    pub fn history_for_plan<'a>(
        &'a self,
        plan_id: &'a PlanId,
    ) -> impl Iterator<Item = &'a HistoryEntry> + 'a {
        self.history
            .iter()
            .filter(move |entry| &entry.plan_id == plan_id)
    }

    pub fn user(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|user| user.username == username)
    }

    pub fn coordinator(&self, id: &CoordinatorId) -> Option<&Coordinator> {
        self.coordinators
            .iter()
            .find(|coordinator| &coordinator.id == id)
    }

    /// Label shown for a plan: its maintenance type, when it resolves.
    pub fn plan_label(&self, plan: &MaintenancePlan) -> Option<&str> {
        self.lookup_value(
            LookupTable::MaintenanceTypes,
            plan.maintenance_type_id.as_ref(),
        )
    }

    pub fn system_label(&self, vehicle: &Vehicle) -> Option<&str> {
        self.lookup_value(LookupTable::Systems, vehicle.system_id.as_ref())
    }
}
