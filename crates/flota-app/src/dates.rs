// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Calendar date handling. Dates are parsed once, when a document or CSV row is decoded;
//! everything downstream works on `time::Date`.

use time::macros::{date, format_description};
use time::{Date, Month, OffsetDateTime, Weekday};

pub const EPOCH: Date = date!(1970 - 01 - 01);

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// Accepts `YYYY-MM-DD` (optionally followed by a time part) and `D/M/YYYY`.
pub fn parse_strict(raw: &str) -> Option<Date> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.contains('/') {
        return parse_day_month_year(trimmed);
    }

    let date_part = trimmed
        .split(['T', ' '])
        .next()
        .unwrap_or(trimmed);
    Date::parse(date_part, &format_description!("[year]-[month]-[day]")).ok()
}

/// Empty and unreadable values collapse to the epoch, so a plan with a period and a bad
/// date always reads as overdue.
pub fn parse_date(raw: &str) -> Date {
    parse_strict(raw).unwrap_or(EPOCH)
}

fn parse_day_month_year(raw: &str) -> Option<Date> {
    let mut parts = raw.split('/').map(str::trim);
    let day = parts.next()?.parse::<u8>().ok()?;
    let month = parts.next()?.parse::<u8>().ok()?;
    let year = parts.next()?.parse::<i32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

pub fn format_iso(value: Date) -> String {
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "1970-01-01".to_owned())
}

/// `DD/MM/YYYY`, the format used in every human-facing view.
pub fn format_display(value: Date) -> String {
    value
        .format(&format_description!("[day]/[month]/[year]"))
        .unwrap_or_else(|_| "01/01/1970".to_owned())
}

/// `D Mon` with Spanish month abbreviations, used as weekly trend labels.
pub fn format_short_label(value: Date) -> String {
    let month_index = usize::from(u8::from(value.month())) - 1;
    format!("{} {}", value.day(), MONTH_ABBREVIATIONS[month_index])
}

pub fn today_local() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// Shift by whole calendar months, clamping the day to the end of the target month.
pub fn add_months(value: Date, months: i32) -> Date {
    let base_month = i32::from(u8::from(value.month()));
    let total_month = base_month - 1 + months;
    let year = value.year() + total_month.div_euclid(12);
    let month_number = (total_month.rem_euclid(12) + 1) as u8;
    let Ok(month) = Month::try_from(month_number) else {
        return value;
    };
    let day = value.day().min(time::util::days_in_year_month(year, month));
    Date::from_calendar_date(year, month, day).unwrap_or(value)
}

/// The Monday on or before `value`.
pub fn previous_monday(value: Date) -> Date {
    let offset = value.weekday().number_days_from_monday();
    value
        .checked_sub(time::Duration::days(i64::from(offset)))
        .unwrap_or(value)
}

pub const fn weekday_name(value: Weekday) -> &'static str {
    match value {
        Weekday::Monday => "Monday",
        Weekday::Tuesday => "Tuesday",
        Weekday::Wednesday => "Wednesday",
        Weekday::Thursday => "Thursday",
        Weekday::Friday => "Friday",
        Weekday::Saturday => "Saturday",
        Weekday::Sunday => "Sunday",
    }
}

pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    match raw.trim().to_lowercase().as_str() {
        "monday" | "lunes" => Some(Weekday::Monday),
        "tuesday" | "martes" => Some(Weekday::Tuesday),
        "wednesday" | "miércoles" | "miercoles" => Some(Weekday::Wednesday),
        "thursday" | "jueves" => Some(Weekday::Thursday),
        "friday" | "viernes" => Some(Weekday::Friday),
        "saturday" | "sábado" | "sabado" => Some(Weekday::Saturday),
        "sunday" | "domingo" => Some(Weekday::Sunday),
        _ => None,
    }
}

pub(crate) mod serde_date {
    use serde::{Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S>(value: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_iso(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        crate::wire::string(deserializer).map(|raw| super::parse_date(&raw))
    }
}

pub(crate) mod serde_opt_date {
    use serde::{Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S>(value: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_str(&super::format_iso(*value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
    where
        D: Deserializer<'de>,
    {
        crate::wire::string(deserializer).map(|raw| super::parse_strict(&raw))
    }
}

pub(crate) mod serde_weekday {
    use serde::de::Error as _;
    use serde::{Deserializer, Serializer};
    use time::Weekday;

    pub fn serialize<S>(value: &Weekday, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(super::weekday_name(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Weekday, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = crate::wire::string(deserializer)?;
        super::parse_weekday(&raw)
            .ok_or_else(|| D::Error::custom(format!("unknown weekday {raw:?}")))
    }
}
