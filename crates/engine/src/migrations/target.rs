//! Rollback targets and date parsing

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use std::fmt;
use tidemark_core::ConfigError;

use super::definitions::Version;
use crate::error::MigrationResult;

/// What a rollback should revert down to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackTarget {
    /// Only the most recently applied migration
    Latest,
    /// Everything (the `0` / `all` sentinel)
    All,
    /// Everything strictly newer than this applied version
    Version(Version),
    /// Everything strictly newer than the applied migration with this name
    Name(String),
    /// Everything whose order key is strictly after this instant
    Date(DateTime<Utc>),
}

impl RollbackTarget {
    /// Interpret a raw `--target` argument
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => RollbackTarget::Latest,
            Some("all") | Some("0") => RollbackTarget::All,
            Some(value) => match value.parse::<Version>() {
                Ok(version) => RollbackTarget::Version(version),
                Err(_) => RollbackTarget::Name(value.to_string()),
            },
        }
    }
}

impl fmt::Display for RollbackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackTarget::Latest => write!(f, "latest"),
            RollbackTarget::All => write!(f, "all"),
            RollbackTarget::Version(version) => write!(f, "{}", version),
            RollbackTarget::Name(name) => write!(f, "{}", name),
            RollbackTarget::Date(date) => write!(f, "{}", date.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Parse a `YYYY[MM[DD[HH[II[SS]]]]]` date, padding the missing parts
pub fn parse_target_date(raw: &str) -> MigrationResult<DateTime<Utc>> {
    let invalid = || ConfigError::invalid_value("date", raw, "YYYY[MM[DD[HH[II[SS]]]]]");

    if !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid().into());
    }

    let suffix = match raw.len() {
        14 => "",
        12 => "00",
        10 => "0000",
        8 => "000000",
        6 => "01000000",
        4 => "0101000000",
        _ => return Err(invalid().into()),
    };

    let padded = format!("{}{}", raw, suffix);
    let naive = NaiveDateTime::parse_from_str(&padded, "%Y%m%d%H%M%S").map_err(|_| invalid())?;
    Ok(naive.and_utc())
}

/// Express an instant in version form for comparison with descriptor versions
pub fn version_from_datetime(date: &DateTime<Utc>) -> Version {
    i64::from(date.year()) * 10_000_000_000
        + i64::from(date.month()) * 100_000_000
        + i64::from(date.day()) * 1_000_000
        + i64::from(date.hour()) * 10_000
        + i64::from(date.minute()) * 100
        + i64::from(date.second())
}
