use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A date of year, year-month or year-month-day precision.
///
/// Equality is structural: `1995` and `1995-01` are different values. Ordering
/// compares year, then month, then day, with an absent field sorting before any
/// present one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartialDate {
    pub year: i32,
    pub month: Option<u8>,
    pub day: Option<u8>,
}

impl PartialDate {
    pub fn year(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
        }
    }

    pub fn year_month(year: i32, month: u8) -> Self {
        Self {
            year,
            month: Some(month),
            day: None,
        }
    }

    pub fn ymd(year: i32, month: u8, day: u8) -> Self {
        Self {
            year,
            month: Some(month),
            day: Some(day),
        }
    }

    /// Parses `YYYY`, `YYYY-MM` or `YYYY-MM-DD`, the forms `Display` writes.
    pub fn parse(text: &str) -> Result<Self, DateFormatError> {
        let parts: Vec<&str> = text.split('-').collect();
        let parsed = match parts.as_slice() {
            [year] => digits(year, 4).map(Self::year),
            [year, month] => match (digits(year, 4), digits(month, 2)) {
                (Some(y), Some(m)) => Some(Self::year_month(y, m)),
                _ => None,
            },
            [year, month, day] => match (digits(year, 4), digits(month, 2), digits(day, 2)) {
                (Some(y), Some(m), Some(d)) => Some(Self::ymd(y, m, d)),
                _ => None,
            },
            _ => None,
        };
        parsed.ok_or_else(|| DateFormatError(text.to_string()))
    }
}

fn digits<T: FromStr>(part: &str, width: usize) -> Option<T> {
    if part.len() != width || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

impl fmt::Display for PartialDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(month) = self.month {
            write!(f, "-{:02}", month)?;
            if let Some(day) = self.day {
                write!(f, "-{:02}", day)?;
            }
        }
        Ok(())
    }
}

impl FromStr for PartialDate {
    type Err = DateFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PartialDate {
    type Error = DateFormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PartialDate> for String {
    fn from(value: PartialDate) -> Self {
        value.to_string()
    }
}

/// The text is not `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateFormatError(pub String);

impl fmt::Display for DateFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid partial date: {:?}", self.0)
    }
}

impl std::error::Error for DateFormatError {}
