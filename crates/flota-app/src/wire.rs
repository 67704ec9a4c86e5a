// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Serde adapters for documents that have passed through a spreadsheet.
//! Ids and counts may arrive as numbers or strings, and empty cells as `""` or `null`.

use serde::Deserializer;
use serde::de::{self, Visitor};
use std::fmt;

struct LenientString;

impl<'de> Visitor<'de> for LenientString {
    type Value = String;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a string, a number, or null")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
        Ok(value.to_owned())
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<String, E> {
        Ok(value)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<String, E> {
        Ok(value.to_string())
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<String, E> {
        Ok(value.to_string())
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<String, E> {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
            return Ok(format!("{}", value as i64));
        }
        Ok(value.to_string())
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<String, E> {
        Ok(value.to_string())
    }

    fn visit_unit<E: de::Error>(self) -> Result<String, E> {
        Ok(String::new())
    }

    fn visit_none<E: de::Error>(self) -> Result<String, E> {
        Ok(String::new())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<String, D::Error> {
        deserializer.deserialize_any(LenientString)
    }
}

pub(crate) fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(LenientString)
}

/// Reads a leading run of digits the way spreadsheet exports expect: `"30 días"` is 30,
/// anything without leading digits is 0.
pub fn leading_count(raw: &str) -> u32 {
    let digits = raw
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u32::MAX)
}

struct LenientCount;

impl<'de> Visitor<'de> for LenientCount {
    type Value = Option<u32>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a non-negative count")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Option<u32>, E> {
        Ok(Some(u32::try_from(value).unwrap_or(u32::MAX)))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Option<u32>, E> {
        if value < 0 {
            return Ok(Some(0));
        }
        Ok(Some(u32::try_from(value).unwrap_or(u32::MAX)))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Option<u32>, E> {
        if !value.is_finite() || value <= 0.0 {
            return Ok(Some(0));
        }
        Ok(Some(value.trunc().min(f64::from(u32::MAX)) as u32))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Option<u32>, E> {
        if value.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(leading_count(value)))
    }

    fn visit_bool<E: de::Error>(self, _value: bool) -> Result<Option<u32>, E> {
        Ok(Some(0))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Option<u32>, E> {
        Ok(None)
    }

    fn visit_none<E: de::Error>(self) -> Result<Option<u32>, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Option<u32>, D::Error> {
        deserializer.deserialize_any(LenientCount)
    }
}

pub(crate) fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer
        .deserialize_any(LenientCount)
        .map(Option::unwrap_or_default)
}

pub(crate) mod opt_count {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_u32(*value),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(super::LenientCount)
    }
}

pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = deserializer.deserialize_any(LenientString)?;
    Ok(matches!(
        raw.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "si" | "sí"
    ))
}

/// Optional foreign keys travel as `""` when unset.
pub(crate) mod fk {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<str>,
    {
        serializer.serialize_str(value.as_ref().map_or("", AsRef::as_ref))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: From<String>,
    {
        let raw = super::string(deserializer)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        Ok(Some(T::from(trimmed.to_owned())))
    }
}
