// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::{Date, Weekday};

use crate::edit::{EditError, EditResult};
use crate::ids::{LookupId, PlanId, VehicleId};
use crate::model::{GreaseType, Role, VehicleStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleFormInput {
    pub id: String,
    pub license_plate: String,
    pub brand_id: Option<LookupId>,
    pub model_id: Option<LookupId>,
    pub vehicle_type_id: Option<LookupId>,
    pub system_id: Option<LookupId>,
    pub status: VehicleStatus,
    pub grease_type: GreaseType,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanFormInput {
    pub vehicle_id: VehicleId,
    pub maintenance_type_id: Option<LookupId>,
    pub period_days: u32,
    pub period_km: u32,
    pub oil_type_id: Option<LookupId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryFormInput {
    pub plan_id: PlanId,
    pub date: Date,
    pub operator_id: Option<LookupId>,
    pub observations: String,
    pub km: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorFormInput {
    pub name: String,
    pub role: String,
    pub email: String,
    pub system_id: Option<LookupId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFormInput {
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettingsInput {
    pub day_of_week: Weekday,
    pub hour: String,
    pub enabled: bool,
    pub google_script_url: String,
}

impl VehicleFormInput {
    pub fn validate(&self) -> EditResult<()> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(invalid("vehicle id is required -- enter a fleet number and retry"));
        }
        if id.len() > 4 || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid(format!(
                "vehicle id {id:?} must be up to 4 digits -- use a fleet number like 0007"
            )));
        }
        if self.license_plate.trim().is_empty() {
            return Err(invalid(
                "license plate is required -- enter a plate and retry",
            ));
        }
        Ok(())
    }
}

impl PlanFormInput {
    pub fn validate(&self) -> EditResult<()> {
        if self.vehicle_id.is_empty() {
            return Err(invalid("plan vehicle is required -- choose a vehicle and retry"));
        }
        if self.maintenance_type_id.is_none() {
            return Err(invalid(
                "maintenance type is required -- choose a type and retry",
            ));
        }
        Ok(())
    }
}

impl HistoryFormInput {
    pub fn validate(&self) -> EditResult<()> {
        if self.plan_id.is_empty() {
            return Err(invalid("history plan is required -- choose a plan and retry"));
        }
        Ok(())
    }
}

impl CoordinatorFormInput {
    pub fn validate(&self) -> EditResult<()> {
        if self.name.trim().is_empty() {
            return Err(invalid("coordinator name is required -- enter a name and retry"));
        }
        let email = self.email.trim();
        if email.is_empty() {
            return Err(invalid(
                "coordinator email is required -- enter an address and retry",
            ));
        }
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(invalid(format!(
                "coordinator email {email:?} is not an address -- use name@domain"
            )));
        }
        Ok(())
    }
}

impl UserFormInput {
    pub fn validate(&self) -> EditResult<()> {
        if self.username.trim().is_empty() {
            return Err(invalid("username is required -- enter a username and retry"));
        }
        if self.password.is_empty() {
            return Err(invalid("password is required -- enter a password and retry"));
        }
        Ok(())
    }
}

impl ReportSettingsInput {
    pub fn validate(&self) -> EditResult<()> {
        if parse_hour(&self.hour).is_none() {
            return Err(invalid(format!(
                "report hour {:?} must be HH:MM in 24-hour time, for example 09:00",
                self.hour
            )));
        }
        let url = self.google_script_url.trim();
        if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(invalid(format!(
                "sync URL {url:?} must start with https:// -- paste the deployed script URL"
            )));
        }
        Ok(())
    }
}

/// `HH:MM` on a 24-hour clock.
pub fn parse_hour(raw: &str) -> Option<(u8, u8)> {
    let (hour, minute) = raw.trim().split_once(':')?;
    if hour.len() != 2 || minute.len() != 2 {
        return None;
    }
    let hour = hour.parse::<u8>().ok()?;
    let minute = minute.parse::<u8>().ok()?;
    (hour < 24 && minute < 60).then_some((hour, minute))
}

fn invalid(message: impl Into<String>) -> EditError {
    EditError::Validation(message.into())
}

#[cfg(test)]
mod tests {
    use super::{CoordinatorFormInput, ReportSettingsInput, VehicleFormInput, parse_hour};
    use crate::model::{GreaseType, VehicleStatus};
    use time::Weekday;

    fn vehicle(id: &str, plate: &str) -> VehicleFormInput {
        VehicleFormInput {
            id: id.to_owned(),
            license_plate: plate.to_owned(),
            brand_id: None,
            model_id: None,
            vehicle_type_id: None,
            system_id: None,
            status: VehicleStatus::Active,
            grease_type: GreaseType::Manual,
            notes: String::new(),
        }
    }

    #[test]
    fn vehicle_form_requires_numeric_id_and_plate() {
        assert!(vehicle("7", "1234ABC").validate().is_ok());
        assert!(vehicle("", "1234ABC").validate().is_err());
        assert!(vehicle("12345", "1234ABC").validate().is_err());
        assert!(vehicle("A1", "1234ABC").validate().is_err());
        let error = vehicle("7", "  ").validate().expect_err("plate is required");
        assert!(error.to_string().contains("license plate is required"));
    }

    #[test]
    fn coordinator_form_checks_email_shape() {
        let mut form = CoordinatorFormInput {
            name: "Ana".to_owned(),
            role: String::new(),
            email: "ana@example.com".to_owned(),
            system_id: None,
        };
        assert!(form.validate().is_ok());
        form.email = "ana".to_owned();
        assert!(form.validate().is_err());
    }

    #[test]
    fn hour_parser_accepts_24_hour_clock() {
        assert_eq!(parse_hour("09:00"), Some((9, 0)));
        assert_eq!(parse_hour("23:59"), Some((23, 59)));
        assert_eq!(parse_hour("24:00"), None);
        assert_eq!(parse_hour("9:00"), None);
        assert_eq!(parse_hour("nine"), None);
    }

    #[test]
    fn settings_reject_non_http_urls() {
        let input = ReportSettingsInput {
            day_of_week: Weekday::Monday,
            hour: "09:00".to_owned(),
            enabled: true,
            google_script_url: "ftp://example.com".to_owned(),
        };
        assert!(input.validate().is_err());
    }
}
