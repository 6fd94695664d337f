//! Normalized `YYYY-MM` month keys.
//!
//! Skip requests and EMI payments are keyed by calendar month. Keys are
//! validated at the boundary and ordered chronologically, so per-month maps
//! stay one-entry-per-month by construction.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{LedgerError, LedgerResult};

/// Zero-padded `YYYY-MM` month key, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Build a key from calendar components, rejecting out-of-range months
    pub fn new(year: i32, month: u32) -> LedgerResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(LedgerError::Validation(format!(
                "month out of range in month key: {}",
                month
            )));
        }
        if !(1000..=9999).contains(&year) {
            return Err(LedgerError::Validation(format!(
                "year out of range in month key: {}",
                year
            )));
        }
        Ok(MonthKey { year, month })
    }

    /// The month containing the given instant
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        MonthKey {
            year: at.year(),
            month: at.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Signed number of months from `start` to `self`
    pub fn months_since(&self, start: MonthKey) -> i64 {
        (self.year as i64 * 12 + self.month as i64 - 1)
            - (start.year as i64 * 12 + start.month as i64 - 1)
    }

    /// The key `n` months after this one
    pub fn plus_months(&self, n: i64) -> MonthKey {
        let total = self.year as i64 * 12 + (self.month as i64 - 1) + n;
        MonthKey {
            year: (total.div_euclid(12)) as i32,
            month: (total.rem_euclid(12) + 1) as u32,
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid =
            || LedgerError::Validation(format!("month key must be zero-padded YYYY-MM, got '{}'", s));

        let (year_part, month_part) = s.split_once('-').ok_or_else(invalid)?;
        if year_part.len() != 4 || month_part.len() != 2 {
            return Err(invalid());
        }
        if !year_part.bytes().all(|b| b.is_ascii_digit())
            || !month_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let year: i32 = year_part.parse().map_err(|_| invalid())?;
        let month: u32 = month_part.parse().map_err(|_| invalid())?;
        MonthKey::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MonthKeyVisitor;

        impl<'de> de::Visitor<'de> for MonthKeyVisitor {
            type Value = MonthKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a zero-padded YYYY-MM month key")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(|e: LedgerError| E::custom(e.to_string()))
            }
        }

        deserializer.deserialize_str(MonthKeyVisitor)
    }
}
