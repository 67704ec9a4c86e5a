// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! `vehicle`, `plan`, `history`, `coordinator` and `user` subcommands. Flags are collected
//! as raw strings and turned into form inputs against the loaded document, so `edit` only
//! changes the fields that were passed.

use anyhow::{Context, Result, anyhow, bail};
use flota_app::dates::parse_strict;
use flota_app::{
    CoordinatorFormInput, CoordinatorId, Document, GreaseType, HistoryFormInput, HistoryId,
    LookupId, PlanFormInput, PlanId, PlanStatus, Role, UserFormInput, VehicleFormInput, VehicleId,
    VehicleStatus,
};
use std::collections::BTreeMap;
use time::Date;

use crate::CommandArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Vehicle,
    Plan,
    History,
    Coordinator,
    User,
}

impl Entity {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "vehicle" => Some(Self::Vehicle),
            "plan" => Some(Self::Plan),
            "history" => Some(Self::History),
            "coordinator" => Some(Self::Coordinator),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Vehicle => "vehicle",
            Self::Plan => "plan",
            Self::History => "history",
            Self::Coordinator => "coordinator",
            Self::User => "user",
        }
    }

    const fn plural(self) -> &'static str {
        match self {
            Self::Vehicle => "vehicles",
            Self::Plan => "maintenance plans",
            Self::History => "history entries",
            Self::Coordinator => "coordinators",
            Self::User => "users",
        }
    }

    const fn actions(self) -> &'static str {
        match self {
            Self::Plan => "list, add, edit, pause, resume, delete, or clear",
            _ => "list, add, edit, or delete",
        }
    }

    /// Flags accepted by `add`. `edit` takes the same set minus the ones that pin identity.
    const fn flags(self, adding: bool) -> &'static [&'static str] {
        match (self, adding) {
            (Self::Vehicle, true) => &[
                "--id", "--plate", "--brand", "--model", "--type", "--system", "--status",
                "--grease", "--notes",
            ],
            (Self::Vehicle, false) => &[
                "--plate", "--brand", "--model", "--type", "--system", "--status", "--grease",
                "--notes",
            ],
            (Self::Plan, _) => &["--vehicle", "--type", "--days", "--km", "--oil"],
            (Self::History, true) => &["--plan", "--date", "--operator", "--km", "--notes"],
            (Self::History, false) => &["--date", "--operator", "--km", "--notes"],
            (Self::Coordinator, _) => &["--name", "--role", "--email", "--system"],
            (Self::User, _) => &["--name", "--password", "--role"],
        }
    }

    /// `list` filter flag, if the entity has one.
    const fn scope_flag(self) -> Option<&'static str> {
        match self {
            Self::Plan => Some("--vehicle"),
            Self::History => Some("--plan"),
            _ => None,
        }
    }
}

/// Raw flag values keyed by flag name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(BTreeMap<&'static str, String>);

impl Fields {
    fn take(entity: Entity, args: &mut CommandArgs, adding: bool) -> Result<Self> {
        let mut fields = Self::default();
        for &flag in entity.flags(adding) {
            if let Some(value) = args.flag_value(flag)? {
                fields.0.insert(flag, value);
            }
        }
        Ok(fields)
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&'static str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(flag, value)| (*flag, (*value).to_owned()))
                .collect(),
        )
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn get(&self, flag: &str) -> Option<&str> {
        self.0.get(flag).map(String::as_str)
    }

    fn text(&self, flag: &str, current: &str) -> String {
        self.get(flag).unwrap_or(current).to_owned()
    }

    /// An empty value or `-` clears the reference.
    fn reference(&self, flag: &str, current: Option<&LookupId>) -> Option<LookupId> {
        match self.get(flag).map(str::trim) {
            None => current.cloned(),
            Some("" | "-") => None,
            Some(raw) => Some(LookupId::from(raw)),
        }
    }

    fn number(&self, flag: &str, current: u32) -> Result<u32> {
        match self.get(flag) {
            None => Ok(current),
            Some(raw) => parse_number(flag, raw),
        }
    }

    fn optional_number(&self, flag: &str, current: Option<u32>) -> Result<Option<u32>> {
        match self.get(flag).map(str::trim) {
            None => Ok(current),
            Some("" | "-") => Ok(None),
            Some(raw) => parse_number(flag, raw).map(Some),
        }
    }

    fn choice<T: Copy>(
        &self,
        flag: &str,
        current: T,
        parse: fn(&str) -> Option<T>,
        expected: &str,
    ) -> Result<T> {
        match self.get(flag) {
            None => Ok(current),
            Some(raw) => {
                parse(raw).ok_or_else(|| anyhow!("{flag} {raw:?} is not one of {expected}"))
            }
        }
    }

    fn date(&self, flag: &str, current: Date) -> Result<Date> {
        match self.get(flag) {
            None => Ok(current),
            Some(raw) => parse_strict(raw).ok_or_else(|| {
                anyhow!("{flag} {raw:?} is not a date -- use YYYY-MM-DD or DD/MM/YYYY")
            }),
        }
    }
}

fn parse_number(flag: &str, raw: &str) -> Result<u32> {
    raw.trim()
        .parse()
        .with_context(|| format!("{flag} expects a whole number, got {raw:?}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordAction {
    List {
        entity: Entity,
        scope: Option<String>,
    },
    Add {
        entity: Entity,
        fields: Fields,
    },
    Edit {
        entity: Entity,
        id: String,
        fields: Fields,
    },
    Delete {
        entity: Entity,
        id: String,
    },
    SetPlanStatus {
        id: String,
        status: PlanStatus,
    },
    ClearPlans,
}

impl RecordAction {
    pub fn entity(&self) -> Entity {
        match self {
            Self::List { entity, .. }
            | Self::Add { entity, .. }
            | Self::Edit { entity, .. }
            | Self::Delete { entity, .. } => *entity,
            Self::SetPlanStatus { .. } | Self::ClearPlans => Entity::Plan,
        }
    }

    /// Phrase used in the admin check, e.g. "edit vehicles".
    pub fn permission(&self) -> String {
        match self {
            Self::ClearPlans => "clear maintenance plans and history".to_owned(),
            _ => format!("edit {}", self.entity().plural()),
        }
    }
}

pub fn parse_record(entity: Entity, args: &mut CommandArgs) -> Result<RecordAction> {
    let name = entity.name();
    let action = args.positional("ACTION")?;
    Ok(match (action.as_str(), entity) {
        ("list", _) => RecordAction::List {
            entity,
            scope: match entity.scope_flag() {
                Some(flag) => args.flag_value(flag)?,
                None => None,
            },
        },
        ("add", _) => RecordAction::Add {
            entity,
            fields: Fields::take(entity, args, true)?,
        },
        ("edit", _) => {
            let fields = Fields::take(entity, args, false)?;
            let id = args.positional("ID")?;
            if fields.is_empty() {
                bail!(
                    "{name} edit: nothing to change -- pass one of {}",
                    entity.flags(false).join(", ")
                );
            }
            RecordAction::Edit { entity, id, fields }
        }
        ("delete", _) => RecordAction::Delete {
            entity,
            id: args.positional("ID")?,
        },
        ("pause", Entity::Plan) => RecordAction::SetPlanStatus {
            id: args.positional("ID")?,
            status: PlanStatus::Inactive,
        },
        ("resume", Entity::Plan) => RecordAction::SetPlanStatus {
            id: args.positional("ID")?,
            status: PlanStatus::Active,
        },
        ("clear", Entity::Plan) => RecordAction::ClearPlans,
        (other, _) => bail!("{name}: unknown action {other:?}; use {}", entity.actions()),
    })
}

/// Inputs that depend on the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditClock {
    pub today: Date,
    pub now_millis: i128,
}

/// Apply one mutating action. Returns the new document and a one-line summary.
pub fn apply_record(
    document: &Document,
    action: &RecordAction,
    clock: EditClock,
) -> Result<(Document, String)> {
    match action {
        RecordAction::List { .. } => Ok((document.clone(), String::new())),
        RecordAction::Add { entity, fields } => add(document, *entity, fields, clock),
        RecordAction::Edit { entity, id, fields } => edit(document, *entity, id, fields),
        RecordAction::Delete { entity, id } => delete(document, *entity, id),
        RecordAction::SetPlanStatus { id, status } => {
            let next = document.set_plan_status(&PlanId::from(id.as_str()), *status)?;
            let verb = match status {
                PlanStatus::Active => "resumed",
                PlanStatus::Inactive => "paused",
            };
            Ok((next, format!("{verb} plan {id}")))
        }
        RecordAction::ClearPlans => {
            let message = format!(
                "cleared {} maintenance plans and {} history entries",
                document.maintenance_plans.len(),
                document.history.len()
            );
            Ok((document.clear_plans_and_history(), message))
        }
    }
}

fn add(
    document: &Document,
    entity: Entity,
    fields: &Fields,
    clock: EditClock,
) -> Result<(Document, String)> {
    let (next, id) = match entity {
        Entity::Vehicle => {
            let (next, id) = document.create_vehicle(&vehicle_input(fields, None)?)?;
            (next, id.to_string())
        }
        Entity::Plan => {
            let (next, id) = document.create_plan(&plan_input(fields, None)?)?;
            (next, id.to_string())
        }
        Entity::History => {
            let input = history_input(fields, None, clock.today)?;
            let (next, id) = document.record_history(&input)?;
            (next, id.to_string())
        }
        Entity::Coordinator => {
            let id = CoordinatorId::new(clock.now_millis.to_string());
            let next = document.add_coordinator(id.clone(), &coordinator_input(fields, None))?;
            (next, id.to_string())
        }
        Entity::User => {
            let input = user_input(fields, None)?;
            let next = document.add_user(&input)?;
            (next, input.username.trim().to_owned())
        }
    };
    Ok((next, format!("added {} {id}", entity.name())))
}

fn edit(
    document: &Document,
    entity: Entity,
    id: &str,
    fields: &Fields,
) -> Result<(Document, String)> {
    let missing = || anyhow!("{} {id:?} not found", entity.name());
    let mut summary = format!("updated {} {id}", entity.name());
    let next = match entity {
        Entity::Vehicle => {
            let vehicle_id = VehicleId::padded(id);
            let current = document.vehicle(&vehicle_id).ok_or_else(missing)?;
            let input = vehicle_input(fields, Some(current))?;
            if input.status != current.status {
                summary.push_str(&format!(
                    "; its plans are now {}",
                    input.status.plan_status()
                ));
            }
            document.update_vehicle(&vehicle_id, &input)?
        }
        Entity::Plan => {
            let plan_id = PlanId::from(id);
            let current = document.plan(&plan_id).ok_or_else(missing)?;
            document.update_plan(&plan_id, &plan_input(fields, Some(current))?)?
        }
        Entity::History => {
            let history_id = HistoryId::from(id);
            let current = document
                .history
                .iter()
                .find(|entry| entry.id == history_id)
                .ok_or_else(missing)?;
            let input = history_input(fields, Some(current), current.date)?;
            document.update_history(&history_id, &input)?
        }
        Entity::Coordinator => {
            let coordinator_id = CoordinatorId::from(id);
            let current = document.coordinator(&coordinator_id).ok_or_else(missing)?;
            document.update_coordinator(&coordinator_id, &coordinator_input(fields, Some(current)))?
        }
        Entity::User => {
            let current = document.user(id).ok_or_else(missing)?;
            document.update_user(id, &user_input(fields, Some(current))?)?
        }
    };
    Ok((next, summary))
}

fn delete(document: &Document, entity: Entity, id: &str) -> Result<(Document, String)> {
    let next = match entity {
        Entity::Vehicle => document.delete_vehicle(&VehicleId::padded(id))?,
        Entity::Plan => document.delete_plan(&PlanId::from(id))?,
        Entity::History => document.delete_history(&HistoryId::from(id))?,
        Entity::Coordinator => document.delete_coordinator(&CoordinatorId::from(id))?,
        Entity::User => document.delete_user(id)?,
    };
    Ok((next, format!("deleted {} {id}", entity.name())))
}

fn vehicle_input(
    fields: &Fields,
    current: Option<&flota_app::Vehicle>,
) -> Result<VehicleFormInput> {
    Ok(VehicleFormInput {
        id: current.map_or_else(|| fields.text("--id", ""), |vehicle| vehicle.id.to_string()),
        license_plate: fields.text("--plate", current.map_or("", |v| v.license_plate.as_str())),
        brand_id: fields.reference("--brand", current.and_then(|v| v.brand_id.as_ref())),
        model_id: fields.reference("--model", current.and_then(|v| v.model_id.as_ref())),
        vehicle_type_id: fields
            .reference("--type", current.and_then(|v| v.vehicle_type_id.as_ref())),
        system_id: fields.reference("--system", current.and_then(|v| v.system_id.as_ref())),
        status: fields.choice(
            "--status",
            current.map_or(VehicleStatus::default(), |v| v.status),
            VehicleStatus::parse,
            "Activo, Baja, Alta",
        )?,
        grease_type: fields.choice(
            "--grease",
            current.map_or(GreaseType::default(), |v| v.grease_type),
            GreaseType::parse,
            "Manual, Automático",
        )?,
        notes: fields.text("--notes", current.map_or("", |v| v.notes.as_str())),
    })
}

fn plan_input(
    fields: &Fields,
    current: Option<&flota_app::MaintenancePlan>,
) -> Result<PlanFormInput> {
    let vehicle_id = match (fields.get("--vehicle"), current) {
        (Some(raw), _) => VehicleId::padded(raw),
        (None, Some(plan)) => plan.vehicle_id.clone(),
        (None, None) => VehicleId::default(),
    };
    Ok(PlanFormInput {
        vehicle_id,
        maintenance_type_id: fields
            .reference("--type", current.and_then(|p| p.maintenance_type_id.as_ref())),
        period_days: fields.number("--days", current.map_or(0, |p| p.period_days))?,
        period_km: fields.number("--km", current.map_or(0, |p| p.period_km))?,
        oil_type_id: fields.reference("--oil", current.and_then(|p| p.oil_type_id.as_ref())),
    })
}

/// New entries default to `today`; edits keep the stored plan.
fn history_input(
    fields: &Fields,
    current: Option<&flota_app::HistoryEntry>,
    today: Date,
) -> Result<HistoryFormInput> {
    let plan_id = match current {
        Some(entry) => entry.plan_id.clone(),
        None => PlanId::from(fields.get("--plan").unwrap_or_default().trim()),
    };
    Ok(HistoryFormInput {
        plan_id,
        date: fields.date("--date", today)?,
        operator_id: fields.reference("--operator", current.and_then(|e| e.operator_id.as_ref())),
        observations: fields.text("--notes", current.map_or("", |e| e.observations.as_str())),
        km: fields.optional_number("--km", current.and_then(|e| e.km))?,
    })
}

fn coordinator_input(
    fields: &Fields,
    current: Option<&flota_app::Coordinator>,
) -> CoordinatorFormInput {
    CoordinatorFormInput {
        name: fields.text("--name", current.map_or("", |c| c.name.as_str())),
        role: fields.text("--role", current.map_or("", |c| c.role.as_str())),
        email: fields.text("--email", current.map_or("", |c| c.email.as_str())),
        system_id: fields.reference("--system", current.and_then(|c| c.system_id.as_ref())),
    }
}

fn user_input(fields: &Fields, current: Option<&flota_app::User>) -> Result<UserFormInput> {
    Ok(UserFormInput {
        username: fields.text("--name", current.map_or("", |u| u.username.as_str())),
        password: fields.text("--password", current.map_or("", |u| u.password.as_str())),
        role: fields.choice(
            "--role",
            current.map_or(Role::default(), |u| u.role),
            Role::parse,
            "admin, user",
        )?,
    })
}

#[cfg(test)]
mod tests {
    use super::{EditClock, Entity, Fields, RecordAction, apply_record};
    use anyhow::Result;
    use flota_app::{
        CoordinatorId, Document, HistoryId, LookupId, PlanId, PlanStatus, VehicleId, VehicleStatus,
        evaluate_all,
    };
    use time::macros::date;

    const CLOCK: EditClock = EditClock {
        today: date!(2026 - 03 - 01),
        now_millis: 1_772_323_200_000,
    };

    fn edit(entity: Entity, id: &str, pairs: &[(&'static str, &str)]) -> RecordAction {
        RecordAction::Edit {
            entity,
            id: id.to_owned(),
            fields: Fields::from_pairs(pairs),
        }
    }

    fn add(entity: Entity, pairs: &[(&'static str, &str)]) -> RecordAction {
        RecordAction::Add {
            entity,
            fields: Fields::from_pairs(pairs),
        }
    }

    #[test]
    fn retiring_a_vehicle_from_the_command_line_pauses_its_plans() -> Result<()> {
        let document = Document::initial();
        let (next, summary) = apply_record(
            &document,
            &edit(Entity::Vehicle, "1", &[("--status", "baja")]),
            CLOCK,
        )?;
        assert_eq!(summary, "updated vehicle 1; its plans are now Inactivo");

        let vehicle = next.vehicle(&VehicleId::from("0001")).expect("vehicle 0001");
        assert_eq!(vehicle.status, VehicleStatus::Retired);
        assert_eq!(vehicle.license_plate, document.vehicles[0].license_plate);
        assert!(
            next.plans_for_vehicle(&VehicleId::from("0001"))
                .all(|plan| plan.status == PlanStatus::Inactive)
        );
        assert!(evaluate_all(&next, CLOCK.today).is_empty());
        Ok(())
    }

    #[test]
    fn editing_only_the_notes_keeps_every_other_field() -> Result<()> {
        let document = Document::initial();
        let (next, summary) = apply_record(
            &document,
            &edit(Entity::Vehicle, "0002", &[("--notes", "neumáticos nuevos")]),
            CLOCK,
        )?;
        assert_eq!(summary, "updated vehicle 0002");
        let mut expected = document.vehicles[1].clone();
        expected.notes = "neumáticos nuevos".to_owned();
        assert_eq!(next.vehicles[1], expected);
        Ok(())
    }

    #[test]
    fn new_coordinator_takes_the_clock_millis_as_id() -> Result<()> {
        let document = Document::initial();
        let (next, summary) = apply_record(
            &document,
            &add(
                Entity::Coordinator,
                &[("--name", "Marta"), ("--email", "marta@flota.es"), ("--system", "2")],
            ),
            CLOCK,
        )?;
        assert_eq!(summary, "added coordinator 1772323200000");
        let coordinator = next
            .coordinator(&CoordinatorId::from("1772323200000"))
            .expect("coordinator was added");
        assert_eq!(coordinator.system_id, Some(LookupId::from("2")));

        let missing_email = add(Entity::Coordinator, &[("--name", "Marta")]);
        let error = apply_record(&document, &missing_email, CLOCK).expect_err("email is required");
        assert!(error.to_string().contains("email is required"));
        Ok(())
    }

    #[test]
    fn history_defaults_to_today_and_edits_stay_on_their_plan() -> Result<()> {
        let document = Document::initial();
        let (next, summary) = apply_record(
            &document,
            &add(Entity::History, &[("--plan", "2"), ("--km", "120500")]),
            CLOCK,
        )?;
        assert_eq!(summary, "added history 2");
        let entry = next
            .history
            .iter()
            .find(|entry| entry.id == HistoryId::from("2"))
            .expect("entry 2");
        assert_eq!(entry.date, CLOCK.today);
        assert_eq!(entry.km, Some(120_500));

        let (next, _) = apply_record(
            &next,
            &edit(Entity::History, "2", &[("--date", "27/02/2026"), ("--km", "-")]),
            CLOCK,
        )?;
        let entry = &next.history[1];
        assert_eq!(entry.plan_id, PlanId::from("2"));
        assert_eq!(entry.date, date!(2026 - 02 - 27));
        assert_eq!(entry.km, None);

        let bad_date = edit(Entity::History, "2", &[("--date", "ayer")]);
        assert!(apply_record(&next, &bad_date, CLOCK).is_err());
        Ok(())
    }

    #[test]
    fn plan_edits_pauses_and_clears() -> Result<()> {
        let document = Document::initial();
        let (next, _) = apply_record(
            &document,
            &edit(Entity::Plan, "2", &[("--days", "45")]),
            CLOCK,
        )?;
        let plan = next.plan(&PlanId::from("2")).expect("plan 2");
        assert_eq!(plan.period_days, 45);
        assert_eq!(plan.period_km, document.maintenance_plans[1].period_km);

        let bad_days = edit(Entity::Plan, "2", &[("--days", "muchos")]);
        let error = apply_record(&document, &bad_days, CLOCK).expect_err("days must be numeric");
        assert!(error.to_string().contains("--days expects a whole number"));

        let pause = RecordAction::SetPlanStatus {
            id: "2".to_owned(),
            status: PlanStatus::Inactive,
        };
        let (paused, summary) = apply_record(&next, &pause, CLOCK)?;
        assert_eq!(summary, "paused plan 2");
        assert_eq!(paused.maintenance_plans[1].status, PlanStatus::Inactive);

        let (cleared, summary) = apply_record(&paused, &RecordAction::ClearPlans, CLOCK)?;
        assert_eq!(summary, "cleared 2 maintenance plans and 1 history entries");
        assert!(cleared.maintenance_plans.is_empty() && cleared.history.is_empty());
        Ok(())
    }

    #[test]
    fn user_rename_cannot_take_an_existing_username() -> Result<()> {
        let (document, _) = apply_record(
            &Document::initial(),
            &add(Entity::User, &[("--name", "taller"), ("--password", "llave")]),
            CLOCK,
        )?;
        let taken = edit(Entity::User, "taller", &[("--name", "admin")]);
        let error = apply_record(&document, &taken, CLOCK).expect_err("admin exists");
        assert!(error.to_string().contains("already exists"));

        let (renamed, _) = apply_record(
            &document,
            &edit(Entity::User, "taller", &[("--name", "mecanico"), ("--role", "admin")]),
            CLOCK,
        )?;
        let user = renamed
            .authenticate("mecanico", "llave")
            .expect("password carried over");
        assert!(user.is_admin());
        Ok(())
    }

    #[test]
    fn deletes_report_what_blocks_them() -> Result<()> {
        let document = Document::initial();
        let blocked = RecordAction::Delete {
            entity: Entity::Vehicle,
            id: "1".to_owned(),
        };
        let error = apply_record(&document, &blocked, CLOCK).expect_err("vehicle has plans");
        assert!(error.to_string().contains("2 maintenance plans"));

        let (next, summary) = apply_record(
            &document,
            &RecordAction::Delete {
                entity: Entity::Coordinator,
                id: "2".to_owned(),
            },
            CLOCK,
        )?;
        assert_eq!(summary, "deleted coordinator 2");
        assert_eq!(next.coordinators.len(), 1);
        Ok(())
    }
}
