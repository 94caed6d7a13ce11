//! Health and system information payloads.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

/// Payload of `GET /api/v1/system/health`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthDto {
    /// `healthy`, or `degraded` when a client tool is missing.
    pub status: String,
    /// RFC 3339 time of the check.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Per-dependency status.
    pub services: ServicesDto,
}

/// Dependencies reported by the health check.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServicesDto {
    /// `pg_dump` and `psql`.
    pub postgresql_tools: ToolHealthDto,
}

/// Health of the PostgreSQL client tools.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ToolHealthDto {
    /// `healthy` or `error`.
    pub status: String,
    /// Why the tools are unusable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// `--version` output per tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<BTreeMap<String, String>>,
}

/// Payload of `GET /api/v1/system/info`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SystemInfoDto {
    /// Application name and version.
    pub application: ApplicationDto,
    /// Client tool availability.
    pub postgresql_tools: ToolInfoDto,
}

/// Application identity.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApplicationDto {
    /// Display name.
    pub name: String,
    /// Crate version.
    pub version: String,
}

/// Client tool availability and locations.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ToolInfoDto {
    /// Whether both tools were found.
    pub available: bool,
    /// Why they are unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// `--version` output per tool, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<BTreeMap<String, String>>,
    /// Resolved path per tool.
    pub paths: BTreeMap<String, String>,
}
