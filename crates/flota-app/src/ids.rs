// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Deserializer, Serialize};

use crate::wire;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }

            /// Non-numeric ids read as zero so they never win a max-id scan.
            pub fn numeric(&self) -> u64 {
                self.0.trim().parse().unwrap_or(0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                wire::string(deserializer).map(|raw| Self(raw.trim().to_owned()))
            }
        }
    };
}

entity_id!(VehicleId);
entity_id!(LookupId);
entity_id!(PlanId);
entity_id!(HistoryId);
entity_id!(CoordinatorId);

impl VehicleId {
    /// Fleet numbers are always four digits, left-padded with zeros.
    pub fn padded(raw: &str) -> Self {
        Self(format!("{:0>4}", raw.trim()))
    }
}

/// Next sequential id for a collection: one past the largest numeric id, or 1 when empty.
pub fn next_numeric_id<I>(ids: I) -> String
where
    I: IntoIterator<Item = u64>,
{
    ids.into_iter()
        .max()
        .map_or(1, |max| max.saturating_add(1))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::{LookupId, VehicleId, next_numeric_id};

    #[test]
    fn padded_vehicle_ids_have_four_digits() {
        assert_eq!(VehicleId::padded("7").as_str(), "0007");
        assert_eq!(VehicleId::padded(" 42 ").as_str(), "0042");
        assert_eq!(VehicleId::padded("1234").as_str(), "1234");
    }

    #[test]
    fn next_id_is_one_past_max() {
        assert_eq!(next_numeric_id(Vec::new()), "1");
        assert_eq!(next_numeric_id(vec![3, 9, 2]), "10");
    }

    #[test]
    fn non_numeric_ids_read_as_zero() {
        assert_eq!(LookupId::from("abc").numeric(), 0);
        assert_eq!(LookupId::from("12").numeric(), 12);
    }

    #[test]
    fn ids_accept_numbers_on_the_wire() {
        let id: LookupId = serde_json::from_str("17").expect("numeric id should decode");
        assert_eq!(id.as_str(), "17");
        let id: LookupId = serde_json::from_str("\" 5 \"").expect("string id should decode");
        assert_eq!(id.as_str(), "5");
    }
}
