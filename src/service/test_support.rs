//! Fakes for driving jobs without PostgreSQL or its client tools.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::tools::{Tool, ToolInvocation, ToolOutput, ToolRunner};
use crate::domain::{ConnectionDescriptor, DatabaseName, SslMode};
use crate::error::TimeMachineError;
use crate::persistence::DatabaseProvisioner;

pub(crate) fn connection() -> ConnectionDescriptor {
    ConnectionDescriptor {
        id: "conn-1".to_string(),
        name: "orders".to_string(),
        host: "localhost".to_string(),
        port: 5432,
        database: "orders".to_string(),
        username: "u".to_string(),
        password: "p".to_string(),
        ssl_mode: SslMode::Disable,
        created_at: None,
        updated_at: None,
    }
}

/// Records invocations; `pg_dump` runs write `dump_bytes` to `--file`.
#[derive(Debug, Default)]
pub(crate) struct FakeRunner {
    pub calls: Mutex<Vec<ToolInvocation>>,
    pub gate: Option<Arc<Notify>>,
    pub fail_with: Option<String>,
    pub dump_bytes: usize,
}

impl FakeRunner {
    pub(crate) fn writing(dump_bytes: usize) -> Self {
        Self {
            dump_bytes,
            ..Self::default()
        }
    }

    pub(crate) fn failing(output: &str) -> Self {
        Self {
            fail_with: Some(output.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ToolRunner for FakeRunner {
    async fn run(&self, invocation: &ToolInvocation) -> io::Result<ToolOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(output) = &self.fail_with {
            return Ok(ToolOutput {
                success: false,
                status: "exit status: 1".to_string(),
                output: output.clone(),
            });
        }
        if invocation.tool == Tool::PgDump
            && let Some(file) = invocation.arg_value("file")
        {
            tokio::fs::write(PathBuf::from(file), vec![b'-'; self.dump_bytes]).await?;
        }
        Ok(ToolOutput {
            success: true,
            status: "exit status: 0".to_string(),
            output: String::new(),
        })
    }
}

/// Records `(admin database, target)` pairs; optionally refuses.
#[derive(Debug, Default)]
pub(crate) struct FakeProvisioner {
    pub created: Mutex<Vec<(String, String)>>,
    pub refuse: bool,
}

impl FakeProvisioner {
    pub(crate) fn created(&self) -> Vec<(String, String)> {
        self.created.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DatabaseProvisioner for FakeProvisioner {
    async fn create_database(
        &self,
        admin: &ConnectionDescriptor,
        name: &DatabaseName,
    ) -> Result<(), TimeMachineError> {
        if let Ok(mut created) = self.created.lock() {
            created.push((admin.database.clone(), name.to_string()));
        }
        if self.refuse {
            return Err(TimeMachineError::Provisioning {
                database: name.to_string(),
                source: Box::new(TimeMachineError::Query(
                    "database already exists".to_string(),
                )),
            });
        }
        Ok(())
    }
}
