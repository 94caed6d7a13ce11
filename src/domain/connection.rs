//! PostgreSQL connection descriptor supplied with every request.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Name of the maintenance database used for administrative statements.
pub const MAINTENANCE_DATABASE: &str = "postgres";

/// TLS negotiation mode, mirroring libpq's `sslmode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    /// Plain TCP only. Used when the caller does not specify a mode.
    #[default]
    #[serde(alias = "")]
    Disable,
    /// Try plain first, then TLS.
    Allow,
    /// Try TLS first, then plain.
    Prefer,
    /// TLS required, certificate not verified.
    Require,
    /// TLS required, CA verified.
    VerifyCa,
    /// TLS required, CA and host name verified.
    VerifyFull,
}

impl SslMode {
    /// Returns the libpq spelling of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disable => "disable",
            Self::Allow => "allow",
            Self::Prefer => "prefer",
            Self::Require => "require",
            Self::VerifyCa => "verify-ca",
            Self::VerifyFull => "verify-full",
        }
    }
}

/// Everything needed to reach one PostgreSQL database.
///
/// Not persisted anywhere. The `id` is opaque and only keys the
/// connection cache; an empty id is valid for one-off operations.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct ConnectionDescriptor {
    /// Opaque identity used as the connection cache key.
    #[serde(default)]
    pub id: String,
    /// Human-readable label.
    #[serde(default)]
    pub name: String,
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database to connect to and to dump.
    pub database: String,
    /// Login role.
    pub username: String,
    /// Login password. Accepted on input, never echoed back.
    #[serde(skip_serializing, default)]
    pub password: String,
    /// TLS mode; `disable` when absent.
    #[serde(default)]
    pub ssl_mode: SslMode,
    /// When the descriptor was saved, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the descriptor was last saved, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConnectionDescriptor {
    /// Returns a copy of this descriptor pointed at another database on the
    /// same server, keyed separately in the cache.
    #[must_use]
    pub fn with_database(&self, database: &str) -> Self {
        Self {
            id: format!("{}@{database}", self.id),
            database: database.to_string(),
            ..self.clone()
        }
    }

    /// Returns a copy pointed at the maintenance database.
    #[must_use]
    pub fn admin(&self) -> Self {
        self.with_database(MAINTENANCE_DATABASE)
    }

    /// Short `user@host:port/database` form, safe for logs.
    #[must_use]
    pub fn target(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ssl_mode", &self.ssl_mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn descriptor() -> ConnectionDescriptor {
        ConnectionDescriptor {
            id: "conn-1".to_string(),
            name: "orders".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            database: "orders".to_string(),
            username: "u".to_string(),
            password: "p".to_string(),
            ssl_mode: SslMode::default(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn missing_or_empty_ssl_mode_deserializes_as_disable() {
        let json = r#"{"host":"h","port":5432,"database":"d","username":"u","password":"p"}"#;
        let Ok(parsed) = serde_json::from_str::<ConnectionDescriptor>(json) else {
            panic!("valid descriptor");
        };
        assert_eq!(parsed.ssl_mode, SslMode::Disable);

        let json = r#"{"host":"h","port":5432,"database":"d","username":"u","password":"p","ssl_mode":""}"#;
        let Ok(parsed) = serde_json::from_str::<ConnectionDescriptor>(json) else {
            panic!("valid descriptor");
        };
        assert_eq!(parsed.ssl_mode, SslMode::Disable);
    }

    #[test]
    fn verify_modes_use_libpq_spelling() {
        let Ok(mode) = serde_json::from_str::<SslMode>("\"verify-full\"") else {
            panic!("valid mode");
        };
        assert_eq!(mode, SslMode::VerifyFull);
        assert_eq!(mode.as_str(), "verify-full");
    }

    #[test]
    fn password_is_hidden_from_debug_and_json() {
        let d = descriptor();
        let debug = format!("{d:?}");
        assert!(!debug.contains("password: \"p\""));
        assert!(debug.contains("<redacted>"));

        let Ok(json) = serde_json::to_value(&d) else {
            panic!("serialization failed");
        };
        assert!(json.get("password").is_none());
    }

    #[test]
    fn admin_copy_targets_maintenance_database() {
        let admin = descriptor().admin();
        assert_eq!(admin.database, MAINTENANCE_DATABASE);
        assert_eq!(admin.id, "conn-1@postgres");
        assert_eq!(admin.host, "localhost");
    }
}
