//! Validated PostgreSQL database identifiers.
//!
//! Restore targets end up inside a `CREATE DATABASE` statement, which
//! cannot take bind parameters. [`DatabaseName`] only admits ASCII
//! letters, digits and underscores, at most [`DatabaseName::MAX_LEN`]
//! bytes, and is always interpolated in quoted form.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::TimeMachineError;

/// Timestamp layout shared by snapshot filenames and generated restore
/// targets.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A database name that is safe to interpolate into DDL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatabaseName(String);

impl DatabaseName {
    /// PostgreSQL truncates identifiers beyond `NAMEDATALEN - 1` bytes.
    pub const MAX_LEN: usize = 63;

    /// Validates a caller-supplied name.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::InvalidRequest`] if the name is empty,
    /// too long, or contains anything but `[A-Za-z0-9_]`.
    pub fn parse(name: &str) -> Result<Self, TimeMachineError> {
        if name.is_empty() {
            return Err(TimeMachineError::InvalidRequest(
                "database name must not be empty".to_string(),
            ));
        }
        if name.len() > Self::MAX_LEN {
            return Err(TimeMachineError::InvalidRequest(format!(
                "database name exceeds {} bytes",
                Self::MAX_LEN
            )));
        }
        if let Some(bad) = name.chars().find(|c| !is_allowed(*c)) {
            return Err(TimeMachineError::InvalidRequest(format!(
                "database name contains invalid character {bad:?}"
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// Generates `{source}_restored_{yyyyMMdd_HHmmss}` for a restore that
    /// did not name its target.
    ///
    /// Characters outside the allow-list are replaced with `_` and the
    /// source part is shortened so the result fits [`Self::MAX_LEN`].
    #[must_use]
    pub fn restored_from(source: &str, at: DateTime<Utc>) -> Self {
        let suffix = format!("_restored_{}", at.format(TIMESTAMP_FORMAT));
        let budget = Self::MAX_LEN.saturating_sub(suffix.len());
        let mut base: String = source
            .chars()
            .map(|c| if is_allowed(c) { c } else { '_' })
            .take(budget)
            .collect();
        if base.is_empty() {
            base.push_str("database");
        }
        Self(format!("{base}{suffix}"))
    }

    /// Returns the bare name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the name as a double-quoted SQL identifier.
    #[must_use]
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        let Ok(name) = DatabaseName::parse("orders_copy_2") else {
            panic!("valid name");
        };
        assert_eq!(name.as_str(), "orders_copy_2");
        assert_eq!(name.quoted(), "\"orders_copy_2\"");
    }

    #[test]
    fn rejects_injection_attempts() {
        for bad in [
            "x; DROP DATABASE orders",
            "x\"",
            "orders--",
            "ord ers",
            "ordérs",
            "",
        ] {
            assert!(DatabaseName::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn rejects_overlong_names() {
        let long = "a".repeat(DatabaseName::MAX_LEN + 1);
        assert!(DatabaseName::parse(&long).is_err());
        let max = "a".repeat(DatabaseName::MAX_LEN);
        assert!(DatabaseName::parse(&max).is_ok());
    }

    #[test]
    fn restored_name_uses_source_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 10, 14, 9, 5, 7).single();
        let Some(at) = at else {
            panic!("valid timestamp");
        };
        let name = DatabaseName::restored_from("orders", at);
        assert_eq!(name.as_str(), "orders_restored_20261014_090507");
    }

    #[test]
    fn restored_name_is_always_valid() {
        let at = Utc::now();
        for source in ["my-db", "x; DROP", "", &"z".repeat(200)] {
            let name = DatabaseName::restored_from(source, at);
            assert!(
                DatabaseName::parse(name.as_str()).is_ok(),
                "{name} from {source:?} should validate"
            );
        }
    }
}
