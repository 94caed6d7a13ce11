//! PostgreSQL connection cache and database provisioning.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{Connection, Executor, PgPool};
use tokio::sync::Mutex;

use super::models::DatabaseInfo;
use crate::domain::{ConnectionDescriptor, DatabaseName, SslMode};
use crate::error::TimeMachineError;

/// Creates databases on behalf of restore jobs.
#[async_trait]
pub trait DatabaseProvisioner: Send + Sync + fmt::Debug {
    /// Issues `CREATE DATABASE` for `name` through a connection to `admin`.
    ///
    /// The connection is not taken from or added to any cache.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::Provisioning`] wrapping the connect or
    /// statement failure.
    async fn create_database(
        &self,
        admin: &ConnectionDescriptor,
        name: &DatabaseName,
    ) -> Result<(), TimeMachineError>;
}

/// Live `PgPool` handles keyed by connection id.
///
/// The map is shared by every running job, so each access takes the
/// mutex. Network I/O (connecting, pinging, closing) happens outside the
/// guard. Nothing here retries.
#[derive(Debug)]
pub struct ConnectionCache {
    connections: Mutex<HashMap<String, PgPool>>,
    max_connections: u32,
    connect_timeout: Duration,
}

impl ConnectionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(max_connections: u32, connect_timeout: Duration) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            max_connections: max_connections.max(1),
            connect_timeout,
        }
    }

    /// Opens a throwaway pool, pings it, and closes it.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::Connect`] on any transport or
    /// authentication failure.
    pub async fn test(&self, descriptor: &ConnectionDescriptor) -> Result<(), TimeMachineError> {
        let pool = self.open(descriptor).await?;
        pool.close().await;
        Ok(())
    }

    /// Opens and pings a pool, then caches it under `descriptor.id`.
    ///
    /// An existing entry with the same id is replaced but not closed; jobs
    /// still holding it keep a working handle until they drop it.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::Connect`] on any transport or
    /// authentication failure.
    pub async fn establish(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<PgPool, TimeMachineError> {
        let pool = self.open(descriptor).await?;
        self.store(&descriptor.id, pool.clone()).await;
        tracing::debug!(
            connection_id = %descriptor.id,
            target = %descriptor.target(),
            ssl_mode = descriptor.ssl_mode.as_str(),
            "connection established"
        );
        Ok(pool)
    }

    /// Returns the cached pool for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::NotFound`] if nothing is cached.
    pub async fn get(&self, id: &str) -> Result<PgPool, TimeMachineError> {
        let map = self.connections.lock().await;
        map.get(id).cloned().ok_or_else(|| TimeMachineError::NotFound {
            kind: "connection",
            id: id.to_string(),
        })
    }

    /// Closes and evicts the pool for `id`. Unknown ids are ignored.
    pub async fn close(&self, id: &str) {
        let removed = self.connections.lock().await.remove(id);
        if let Some(pool) = removed {
            pool.close().await;
            tracing::debug!(connection_id = %id, "connection closed");
        }
    }

    /// Closes and evicts every cached pool.
    pub async fn close_all(&self) {
        let drained: Vec<(String, PgPool)> = self.connections.lock().await.drain().collect();
        for (id, pool) in drained {
            pool.close().await;
            tracing::debug!(connection_id = %id, "connection closed");
        }
    }

    /// Number of cached pools.
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Returns `true` if no pools are cached.
    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.connections.lock().await.is_empty()
    }

    /// Validates a descriptor by connecting, assigning an id if it has none.
    ///
    /// Nothing is stored; the returned descriptor is the caller's to keep.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::Connect`] if the connection test fails.
    pub async fn save(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<ConnectionDescriptor, TimeMachineError> {
        let mut saved = descriptor.clone();
        if saved.id.is_empty() {
            saved.id = uuid::Uuid::new_v4().to_string();
        }
        let now = Utc::now();
        saved.created_at = Some(now);
        saved.updated_at = Some(now);

        self.test(&saved).await?;
        tracing::info!(connection_id = %saved.id, name = %saved.name, "saved database connection");
        Ok(saved)
    }

    /// Reports size, table count and schemas of the described database.
    ///
    /// Individual query failures degrade to `"Unknown"`, `0` and an empty
    /// list respectively. A descriptor without an id gets a one-off pool
    /// that is closed afterwards; otherwise the pool is cached.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::Connect`] if the connection cannot be
    /// established.
    pub async fn database_info(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<DatabaseInfo, TimeMachineError> {
        if descriptor.id.is_empty() {
            let pool = self.open(descriptor).await?;
            let info = collect_info(&pool, descriptor).await;
            pool.close().await;
            return Ok(info);
        }
        let pool = self.establish(descriptor).await?;
        Ok(collect_info(&pool, descriptor).await)
    }

    async fn store(&self, id: &str, pool: PgPool) {
        let previous = self.connections.lock().await.insert(id.to_string(), pool);
        if previous.is_some() {
            tracing::debug!(connection_id = %id, "replaced cached connection");
        }
    }

    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<PgPool, TimeMachineError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.connect_timeout)
            .connect_with(connect_options(descriptor))
            .await
            .map_err(TimeMachineError::Connect)?;

        let pinged = async {
            let mut conn = pool.acquire().await?;
            conn.ping().await
        }
        .await;
        if let Err(e) = pinged {
            pool.close().await;
            return Err(TimeMachineError::Connect(e));
        }
        Ok(pool)
    }
}

async fn collect_info(pool: &PgPool, descriptor: &ConnectionDescriptor) -> DatabaseInfo {
    let size = sqlx::query_scalar::<_, String>("SELECT pg_size_pretty(pg_database_size($1))")
        .bind(&descriptor.database)
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to get database size");
            "Unknown".to_string()
        });

    let tables = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM information_schema.tables \
         WHERE table_schema NOT IN ('information_schema', 'pg_catalog')",
    )
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to get table count");
        0
    });

    let schemas = sqlx::query_scalar::<_, String>(
        "SELECT schema_name FROM information_schema.schemata \
         WHERE schema_name NOT IN ('information_schema', 'pg_catalog', 'pg_toast') \
         AND schema_name NOT LIKE 'pg_temp_%' AND schema_name NOT LIKE 'pg_toast_temp_%' \
         ORDER BY schema_name",
    )
    .fetch_all(pool)
    .await
    .unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to get schemas");
        Vec::new()
    });

    DatabaseInfo {
        name: descriptor.database.clone(),
        size,
        tables,
        schemas,
    }
}

#[async_trait]
impl DatabaseProvisioner for ConnectionCache {
    async fn create_database(
        &self,
        admin: &ConnectionDescriptor,
        name: &DatabaseName,
    ) -> Result<(), TimeMachineError> {
        let provisioning = |source: TimeMachineError| TimeMachineError::Provisioning {
            database: name.to_string(),
            source: Box::new(source),
        };

        // One-off pool: concurrent restores share the admin descriptor's id.
        let pool = self.open(admin).await.map_err(provisioning)?;
        let statement = format!("CREATE DATABASE {}", name.quoted());
        let created = pool.execute(statement.as_str()).await;
        pool.close().await;
        created.map_err(|e| provisioning(TimeMachineError::Query(e.to_string())))?;

        tracing::info!(database = %name, "created target database");
        Ok(())
    }
}

/// Translates a descriptor into `sqlx` connect options.
#[must_use]
pub fn connect_options(descriptor: &ConnectionDescriptor) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&descriptor.host)
        .port(descriptor.port)
        .username(&descriptor.username)
        .password(&descriptor.password)
        .database(&descriptor.database)
        .ssl_mode(pg_ssl_mode(descriptor.ssl_mode))
}

const fn pg_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Allow => PgSslMode::Allow,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    }
}
