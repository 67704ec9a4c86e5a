// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Document edits. Each operation validates first and returns a new document, so a
//! rejected edit leaves the caller's copy untouched.

use time::Date;

use crate::forms::{
    CoordinatorFormInput, HistoryFormInput, PlanFormInput, ReportSettingsInput, UserFormInput,
    VehicleFormInput,
};
use crate::ids::*;
use crate::model::*;
use crate::seed::default_lookup_values;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependents {
    Vehicles,
    Plans,
    History,
    Coordinators,
}

impl Dependents {
    const fn noun(self, count: usize) -> &'static str {
        match (self, count == 1) {
            (Self::Vehicles, true) => "vehicle",
            (Self::Vehicles, false) => "vehicles",
            (Self::Plans, true) => "maintenance plan",
            (Self::Plans, false) => "maintenance plans",
            (Self::History, true) => "history entry",
            (Self::History, false) => "history entries",
            (Self::Coordinators, true) => "coordinator",
            (Self::Coordinators, false) => "coordinators",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    Validation(String),
    InUse {
        entity: &'static str,
        name: String,
        dependents: Dependents,
        count: usize,
    },
    NotFound {
        entity: &'static str,
        id: String,
    },
    Forbidden(String),
}

impl std::fmt::Display for EditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) | Self::Forbidden(message) => f.write_str(message),
            Self::InUse {
                entity,
                name,
                dependents,
                count,
            } => write!(
                f,
                "cannot delete {entity} {name:?}: still used by {count} {} -- reassign or delete them first",
                dependents.noun(*count)
            ),
            Self::NotFound { entity, id } => write!(f, "{entity} {id:?} not found"),
        }
    }
}

impl std::error::Error for EditError {}

pub type EditResult<T> = std::result::Result<T, EditError>;

fn not_found(entity: &'static str, id: &str) -> EditError {
    EditError::NotFound {
        entity,
        id: id.to_owned(),
    }
}

fn in_use(entity: &'static str, name: &str, dependents: Dependents, count: usize) -> EditError {
    EditError::InUse {
        entity,
        name: name.to_owned(),
        dependents,
        count,
    }
}

pub fn require_admin(actor: &User, action: &str) -> EditResult<()> {
    if actor.is_admin() {
        return Ok(());
    }
    Err(EditError::Forbidden(format!(
        "only administrators can {action} -- sign in as an admin and retry"
    )))
}

impl Document {
    pub fn add_lookup(&self, table: LookupTable, value: &str) -> EditResult<(Self, LookupId)> {
        let value = value.trim();
        self.check_lookup_value(table, value, None)?;

        let id = LookupId::new(next_numeric_id(
            self.lookup(table).iter().map(|entry| entry.id.numeric()),
        ));
        let mut next = self.clone();
        next.lookup_mut(table).push(LookupEntry {
            id: id.clone(),
            value: value.to_owned(),
        });
        Ok((next, id))
    }

    pub fn rename_lookup(&self, table: LookupTable, id: &LookupId, value: &str) -> EditResult<Self> {
        let value = value.trim();
        let index = self
            .lookup(table)
            .iter()
            .position(|entry| &entry.id == id)
            .ok_or_else(|| not_found(table.label(), id.as_str()))?;
        self.check_lookup_value(table, value, Some(id))?;

        let mut next = self.clone();
        next.lookup_mut(table)[index].value = value.to_owned();
        Ok(next)
    }

    /// Rejected while any vehicle, plan, history entry, or coordinator points at the row.
    pub fn delete_lookup(&self, table: LookupTable, id: &LookupId) -> EditResult<Self> {
        let entry = self
            .lookup(table)
            .iter()
            .find(|entry| &entry.id == id)
            .ok_or_else(|| not_found(table.label(), id.as_str()))?;

        for (dependents, count) in self.lookup_references(table, id) {
            if count > 0 {
                return Err(in_use(table.label(), &entry.value, dependents, count));
            }
        }

        let mut next = self.clone();
        next.lookup_mut(table).retain(|entry| &entry.id != id);
        Ok(next)
    }

    /// Replace one table with its factory values.
    pub fn reset_lookup_defaults(&self, table: LookupTable) -> Self {
        let mut next = self.clone();
        *next.lookup_mut(table) = default_lookup_values(table);
        next
    }

    fn lookup_references(&self, table: LookupTable, id: &LookupId) -> Vec<(Dependents, usize)> {
        let matches = |candidate: &Option<LookupId>| candidate.as_ref() == Some(id);
        match table {
            LookupTable::Brands => vec![(
                Dependents::Vehicles,
                self.count_vehicles(id, |vehicle| &vehicle.brand_id),
            )],
            LookupTable::Models => vec![(
                Dependents::Vehicles,
                self.count_vehicles(id, |vehicle| &vehicle.model_id),
            )],
            LookupTable::VehicleTypes => vec![(
                Dependents::Vehicles,
                self.count_vehicles(id, |vehicle| &vehicle.vehicle_type_id),
            )],
            LookupTable::Systems => vec![
                (
                    Dependents::Vehicles,
                    self.count_vehicles(id, |vehicle| &vehicle.system_id),
                ),
                (
                    Dependents::Coordinators,
                    self.coordinators
                        .iter()
                        .filter(|coordinator| matches(&coordinator.system_id))
                        .count(),
                ),
            ],
            LookupTable::MaintenanceTypes => vec![(
                Dependents::Plans,
                self.maintenance_plans
                    .iter()
                    .filter(|plan| matches(&plan.maintenance_type_id))
                    .count(),
            )],
            LookupTable::OilTypes => vec![(
                Dependents::Plans,
                self.maintenance_plans
                    .iter()
                    .filter(|plan| matches(&plan.oil_type_id))
                    .count(),
            )],
            LookupTable::Operators => vec![(
                Dependents::History,
                self.history
                    .iter()
                    .filter(|entry| matches(&entry.operator_id))
                    .count(),
            )],
        }
    }

    fn count_vehicles<F>(&self, id: &LookupId, field: F) -> usize
    where
        F: Fn(&Vehicle) -> &Option<LookupId>,
    {
        self.vehicles
            .iter()
            .filter(|vehicle| field(*vehicle).as_ref() == Some(id))
            .count()
    }

    fn check_lookup_value(
        &self,
        table: LookupTable,
        value: &str,
        except: Option<&LookupId>,
    ) -> EditResult<()> {
        if value.is_empty() {
            return Err(EditError::Validation(format!(
                "{} value is required -- enter a value and retry",
                table.label()
            )));
        }
        let wanted = value.to_lowercase();
        let duplicate = self.lookup(table).iter().any(|entry| {
            Some(&entry.id) != except && entry.value.trim().to_lowercase() == wanted
        });
        if duplicate {
            return Err(EditError::Validation(format!(
                "{} {value:?} already exists -- use the existing entry",
                table.label()
            )));
        }
        Ok(())
    }

    fn check_reference(&self, table: LookupTable, id: Option<&LookupId>) -> EditResult<()> {
        let Some(id) = id else {
            return Ok(());
        };
        if self.lookup(table).iter().any(|entry| &entry.id == id) {
            return Ok(());
        }
        Err(EditError::Validation(format!(
            "{} {:?} does not exist -- choose an existing {}",
            table.label(),
            id.as_str(),
            table.label()
        )))
    }

    fn check_vehicle_references(&self, input: &VehicleFormInput) -> EditResult<()> {
        self.check_reference(LookupTable::Brands, input.brand_id.as_ref())?;
        self.check_reference(LookupTable::Models, input.model_id.as_ref())?;
        self.check_reference(LookupTable::VehicleTypes, input.vehicle_type_id.as_ref())?;
        self.check_reference(LookupTable::Systems, input.system_id.as_ref())
    }

    pub fn create_vehicle(&self, input: &VehicleFormInput) -> EditResult<(Self, VehicleId)> {
        input.validate()?;
        let id = VehicleId::padded(&input.id);
        if self.vehicle(&id).is_some() {
            return Err(EditError::Validation(format!(
                "vehicle {id} already exists -- choose another fleet number"
            )));
        }
        self.check_vehicle_references(input)?;

        let mut next = self.clone();
        next.vehicles.push(vehicle_from_input(id.clone(), input));
        Ok((next, id))
    }

    /// The id never changes. A status change cascades to the vehicle's plans.
    pub fn update_vehicle(&self, id: &VehicleId, input: &VehicleFormInput) -> EditResult<Self> {
        input.validate()?;
        let index = self
            .vehicles
            .iter()
            .position(|vehicle| &vehicle.id == id)
            .ok_or_else(|| not_found("vehicle", id.as_str()))?;
        self.check_vehicle_references(input)?;

        let previous_status = self.vehicles[index].status;
        let mut next = self.clone();
        next.vehicles[index] = vehicle_from_input(id.clone(), input);
        if previous_status != input.status {
            next = next.cascade_plan_status(id, input.status);
        }
        Ok(next)
    }

    /// Align every plan of a vehicle with the vehicle's status: active vehicles get
    /// active plans, any other status deactivates them.
    pub fn cascade_plan_status(&self, vehicle_id: &VehicleId, status: VehicleStatus) -> Self {
        let plan_status = status.plan_status();
        let mut next = self.clone();
        for plan in next
            .maintenance_plans
            .iter_mut()
            .filter(|plan| &plan.vehicle_id == vehicle_id)
        {
            plan.status = plan_status;
        }
        next
    }

    pub fn delete_vehicle(&self, id: &VehicleId) -> EditResult<Self> {
        if self.vehicle(id).is_none() {
            return Err(not_found("vehicle", id.as_str()));
        }
        let plans = self.plans_for_vehicle(id).count();
        if plans > 0 {
            return Err(in_use("vehicle", id.as_str(), Dependents::Plans, plans));
        }
        let mut next = self.clone();
        next.vehicles.retain(|vehicle| &vehicle.id != id);
        Ok(next)
    }

    fn check_plan_references(&self, input: &PlanFormInput) -> EditResult<()> {
        if self.vehicle(&input.vehicle_id).is_none() {
            return Err(EditError::Validation(format!(
                "vehicle {} does not exist -- choose an existing vehicle",
                input.vehicle_id
            )));
        }
        self.check_reference(
            LookupTable::MaintenanceTypes,
            input.maintenance_type_id.as_ref(),
        )?;
        self.check_reference(LookupTable::OilTypes, input.oil_type_id.as_ref())
    }

    /// New plans start active.
    pub fn create_plan(&self, input: &PlanFormInput) -> EditResult<(Self, PlanId)> {
        input.validate()?;
        self.check_plan_references(input)?;

        let id = PlanId::new(next_numeric_id(
            self.maintenance_plans.iter().map(|plan| plan.id.numeric()),
        ));
        let mut next = self.clone();
        next.maintenance_plans.push(MaintenancePlan {
            id: id.clone(),
            vehicle_id: input.vehicle_id.clone(),
            maintenance_type_id: input.maintenance_type_id.clone(),
            period_days: input.period_days,
            period_km: input.period_km,
            oil_type_id: input.oil_type_id.clone(),
            status: PlanStatus::Active,
        });
        Ok((next, id))
    }

    pub fn update_plan(&self, id: &PlanId, input: &PlanFormInput) -> EditResult<Self> {
        input.validate()?;
        let index = self.plan_index(id)?;
        self.check_plan_references(input)?;

        let mut next = self.clone();
        let plan = &mut next.maintenance_plans[index];
        plan.vehicle_id = input.vehicle_id.clone();
        plan.maintenance_type_id = input.maintenance_type_id.clone();
        plan.period_days = input.period_days;
        plan.period_km = input.period_km;
        plan.oil_type_id = input.oil_type_id.clone();
        Ok(next)
    }

    /// Pause or resume one plan.
    pub fn set_plan_status(&self, id: &PlanId, status: PlanStatus) -> EditResult<Self> {
        let index = self.plan_index(id)?;
        let mut next = self.clone();
        next.maintenance_plans[index].status = status;
        Ok(next)
    }

    pub fn delete_plan(&self, id: &PlanId) -> EditResult<Self> {
        self.plan_index(id)?;
        let entries = self.history_for_plan(id).count();
        if entries > 0 {
            return Err(in_use("plan", id.as_str(), Dependents::History, entries));
        }
        let mut next = self.clone();
        next.maintenance_plans.retain(|plan| &plan.id != id);
        Ok(next)
    }

    pub fn clear_plans_and_history(&self) -> Self {
        let mut next = self.clone();
        next.maintenance_plans.clear();
        next.history.clear();
        next
    }

    fn plan_index(&self, id: &PlanId) -> EditResult<usize> {
        self.maintenance_plans
            .iter()
            .position(|plan| &plan.id == id)
            .ok_or_else(|| not_found("plan", id.as_str()))
    }

    pub fn record_history(&self, input: &HistoryFormInput) -> EditResult<(Self, HistoryId)> {
        input.validate()?;
        if self.plan(&input.plan_id).is_none() {
            return Err(EditError::Validation(format!(
                "plan {} does not exist -- choose an existing plan",
                input.plan_id
            )));
        }
        self.check_reference(LookupTable::Operators, input.operator_id.as_ref())?;

        let id = HistoryId::new(next_numeric_id(
            self.history.iter().map(|entry| entry.id.numeric()),
        ));
        let mut next = self.clone();
        next.history.push(HistoryEntry {
            id: id.clone(),
            plan_id: input.plan_id.clone(),
            date: input.date,
            operator_id: input.operator_id.clone(),
            observations: input.observations.trim().to_owned(),
            km: input.km,
        });
        Ok((next, id))
    }

    /// Edits date, operator, observations, and km; the entry stays on its plan.
    pub fn update_history(&self, id: &HistoryId, input: &HistoryFormInput) -> EditResult<Self> {
        input.validate()?;
        let index = self
            .history
            .iter()
            .position(|entry| &entry.id == id)
            .ok_or_else(|| not_found("history entry", id.as_str()))?;
        self.check_reference(LookupTable::Operators, input.operator_id.as_ref())?;

        let mut next = self.clone();
        let entry = &mut next.history[index];
        entry.date = input.date;
        entry.operator_id = input.operator_id.clone();
        entry.observations = input.observations.trim().to_owned();
        entry.km = input.km;
        Ok(next)
    }

    pub fn delete_history(&self, id: &HistoryId) -> EditResult<Self> {
        if !self.history.iter().any(|entry| &entry.id == id) {
            return Err(not_found("history entry", id.as_str()));
        }
        let mut next = self.clone();
        next.history.retain(|entry| &entry.id != id);
        Ok(next)
    }

    /// Coordinator ids are minted by the caller, normally from the current time in millis.
    pub fn add_coordinator(
        &self,
        id: CoordinatorId,
        input: &CoordinatorFormInput,
    ) -> EditResult<Self> {
        input.validate()?;
        if self.coordinator(&id).is_some() {
            return Err(EditError::Validation(format!(
                "coordinator {id} already exists -- retry to mint a new id"
            )));
        }
        self.check_reference(LookupTable::Systems, input.system_id.as_ref())?;

        let mut next = self.clone();
        next.coordinators.push(coordinator_from_input(id, input));
        Ok(next)
    }

    pub fn update_coordinator(
        &self,
        id: &CoordinatorId,
        input: &CoordinatorFormInput,
    ) -> EditResult<Self> {
        input.validate()?;
        let index = self
            .coordinators
            .iter()
            .position(|coordinator| &coordinator.id == id)
            .ok_or_else(|| not_found("coordinator", id.as_str()))?;
        self.check_reference(LookupTable::Systems, input.system_id.as_ref())?;

        let mut next = self.clone();
        next.coordinators[index] = coordinator_from_input(id.clone(), input);
        Ok(next)
    }

    pub fn delete_coordinator(&self, id: &CoordinatorId) -> EditResult<Self> {
        if self.coordinator(id).is_none() {
            return Err(not_found("coordinator", id.as_str()));
        }
        let mut next = self.clone();
        next.coordinators.retain(|coordinator| &coordinator.id != id);
        Ok(next)
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|user| user.username == username && user.password == password)
    }

    pub fn add_user(&self, input: &UserFormInput) -> EditResult<Self> {
        input.validate()?;
        let username = input.username.trim();
        if self.user(username).is_some() {
            return Err(EditError::Validation(format!(
                "user {username:?} already exists -- choose another username"
            )));
        }
        let mut next = self.clone();
        next.users.push(User {
            username: username.to_owned(),
            password: input.password.clone(),
            role: input.role,
        });
        Ok(next)
    }

    /// May rename, but never onto another existing username.
    pub fn update_user(&self, username: &str, input: &UserFormInput) -> EditResult<Self> {
        input.validate()?;
        let index = self
            .users
            .iter()
            .position(|user| user.username == username)
            .ok_or_else(|| not_found("user", username))?;
        let renamed = input.username.trim();
        if renamed != username && self.user(renamed).is_some() {
            return Err(EditError::Validation(format!(
                "user {renamed:?} already exists -- choose another username"
            )));
        }

        let mut next = self.clone();
        next.users[index] = User {
            username: renamed.to_owned(),
            password: input.password.clone(),
            role: input.role,
        };
        Ok(next)
    }

    pub fn delete_user(&self, username: &str) -> EditResult<Self> {
        if self.user(username).is_none() {
            return Err(not_found("user", username));
        }
        if self.users.len() <= 1 {
            return Err(EditError::Forbidden(
                "cannot delete the last user -- add another user first".to_owned(),
            ));
        }
        let mut next = self.clone();
        next.users.retain(|user| user.username != username);
        Ok(next)
    }

    /// Admin only. `lastSent` is preserved.
    pub fn update_report_settings(
        &self,
        actor: &User,
        input: &ReportSettingsInput,
    ) -> EditResult<Self> {
        require_admin(actor, "change report settings")?;
        input.validate()?;

        let mut next = self.clone();
        let settings = &mut next.report_settings;
        settings.day_of_week = input.day_of_week;
        settings.hour = input.hour.trim().to_owned();
        settings.enabled = input.enabled;
        settings.google_script_url = input.google_script_url.trim().to_owned();
        Ok(next)
    }

    /// Stores a sync URL without touching anything else.
    pub fn with_sync_url(&self, url: &str) -> Self {
        let mut next = self.clone();
        next.report_settings.google_script_url = url.trim().to_owned();
        next
    }

    pub fn mark_report_sent(&self, today: Date) -> Self {
        let mut next = self.clone();
        next.report_settings.last_sent = Some(today);
        next
    }
}

fn vehicle_from_input(id: VehicleId, input: &VehicleFormInput) -> Vehicle {
    Vehicle {
        id,
        license_plate: input.license_plate.trim().to_owned(),
        brand_id: input.brand_id.clone(),
        model_id: input.model_id.clone(),
        vehicle_type_id: input.vehicle_type_id.clone(),
        system_id: input.system_id.clone(),
        status: input.status,
        grease_type: input.grease_type,
        notes: input.notes.trim().to_owned(),
    }
}

fn coordinator_from_input(id: CoordinatorId, input: &CoordinatorFormInput) -> Coordinator {
    Coordinator {
        id,
        name: input.name.trim().to_owned(),
        role: input.role.trim().to_owned(),
        email: input.email.trim().to_owned(),
        system_id: input.system_id.clone(),
    }
}
