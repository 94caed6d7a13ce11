//! External PostgreSQL client tools: discovery, arguments, execution.
//!
//! Dumps run through `pg_dump` and restores through `psql`. The password
//! is passed as `PGPASSWORD` in the child's environment, never on the
//! command line. Execution goes through the [`ToolRunner`] trait so jobs
//! can be driven without the real binaries.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::{ConnectionDescriptor, DatabaseName};
use crate::error::TimeMachineError;

/// Environment variable libpq reads the password from.
pub const PASSWORD_ENV: &str = "PGPASSWORD";

/// The two client tools the service drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Logical dump.
    PgDump,
    /// Restore of a plain-SQL dump.
    Psql,
}

impl Tool {
    /// Binary name without platform suffix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PgDump => "pg_dump",
            Self::Psql => "psql",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully prepared tool execution.
#[derive(Clone)]
pub struct ToolInvocation {
    /// Which tool this is.
    pub tool: Tool,
    /// Binary to execute.
    pub program: PathBuf,
    /// Command-line arguments.
    pub args: Vec<String>,
    /// Extra environment variables for the child.
    pub env: Vec<(String, String)>,
}

impl ToolInvocation {
    /// Value of a `--name=value` argument, if present.
    #[must_use]
    pub fn arg_value(&self, name: &str) -> Option<&str> {
        let prefix = format!("--{name}=");
        self.args.iter().find_map(|a| a.strip_prefix(prefix.as_str()))
    }
}

impl fmt::Debug for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("ToolInvocation")
            .field("tool", &self.tool)
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &env)
            .finish()
    }
}

/// What a finished tool run produced.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// `true` on exit code zero.
    pub success: bool,
    /// Exit status as text.
    pub status: String,
    /// Combined stdout and stderr.
    pub output: String,
}

/// Executes tool invocations.
#[async_trait]
pub trait ToolRunner: Send + Sync + fmt::Debug {
    /// Runs the invocation to completion, capturing its output.
    ///
    /// # Errors
    ///
    /// Returns the [`io::Error`] if the process could not be spawned.
    async fn run(&self, invocation: &ToolInvocation) -> io::Result<ToolOutput>;
}

/// [`ToolRunner`] backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> io::Result<ToolOutput> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .output()
            .await?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(ToolOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            output: combined,
        })
    }
}

/// Runs an invocation and classifies any failure.
///
/// # Errors
///
/// Returns [`TimeMachineError::ToolInvocation`] when the tool cannot be
/// spawned or exits non-zero.
pub async fn invoke(
    runner: &dyn ToolRunner,
    invocation: &ToolInvocation,
) -> Result<ToolOutput, TimeMachineError> {
    let output = runner
        .run(invocation)
        .await
        .map_err(|e| TimeMachineError::ToolInvocation {
            tool: invocation.tool.to_string(),
            status: e.to_string(),
            output: String::new(),
        })?;
    if !output.success {
        return Err(TimeMachineError::ToolInvocation {
            tool: invocation.tool.to_string(),
            status: output.status,
            output: output.output,
        });
    }
    Ok(output)
}

fn connection_args(connection: &ConnectionDescriptor) -> Vec<String> {
    vec![
        format!("--host={}", connection.host),
        format!("--port={}", connection.port),
        format!("--username={}", connection.username),
    ]
}

fn password_env(connection: &ConnectionDescriptor) -> Vec<(String, String)> {
    vec![(PASSWORD_ENV.to_string(), connection.password.clone())]
}

/// Resolved tool locations.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    /// `pg_dump` binary, or the bare name when not found.
    pub pg_dump: PathBuf,
    /// `psql` binary, or the bare name when not found.
    pub psql: PathBuf,
    /// Whether `pg_dump` was found.
    pub pg_dump_found: bool,
    /// Whether `psql` was found.
    pub psql_found: bool,
}

impl ToolPaths {
    /// Locates both tools, preferring explicit paths over `PATH` lookup.
    #[must_use]
    pub fn discover(pg_dump: Option<PathBuf>, psql: Option<PathBuf>) -> Self {
        let (pg_dump, pg_dump_found) = locate(Tool::PgDump, pg_dump);
        let (psql, psql_found) = locate(Tool::Psql, psql);
        Self {
            pg_dump,
            psql,
            pg_dump_found,
            psql_found,
        }
    }

    /// Paths used as-is, assumed present.
    #[must_use]
    pub fn fixed(pg_dump: impl Into<PathBuf>, psql: impl Into<PathBuf>) -> Self {
        Self {
            pg_dump: pg_dump.into(),
            psql: psql.into(),
            pg_dump_found: true,
            psql_found: true,
        }
    }

    /// Path of one tool.
    #[must_use]
    pub fn path(&self, tool: Tool) -> &Path {
        match tool {
            Tool::PgDump => &self.pg_dump,
            Tool::Psql => &self.psql,
        }
    }

    /// Fails if either tool was not found.
    ///
    /// # Errors
    ///
    /// Returns [`TimeMachineError::NotFound`] naming the first missing
    /// tool.
    pub fn validate(&self) -> Result<(), TimeMachineError> {
        for (tool, found) in [(Tool::PgDump, self.pg_dump_found), (Tool::Psql, self.psql_found)] {
            if !found {
                return Err(TimeMachineError::NotFound {
                    kind: "tool",
                    id: tool.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Builds a `pg_dump` invocation writing a self-contained dump of
    /// `connection.database` to `file`.
    #[must_use]
    pub fn dump(&self, connection: &ConnectionDescriptor, file: &Path) -> ToolInvocation {
        let mut args = connection_args(connection);
        args.extend([
            format!("--dbname={}", connection.database),
            "--verbose".to_string(),
            "--clean".to_string(),
            "--if-exists".to_string(),
            "--create".to_string(),
            "--no-password".to_string(),
            format!("--file={}", file.display()),
        ]);
        ToolInvocation {
            tool: Tool::PgDump,
            program: self.pg_dump.clone(),
            args,
            env: password_env(connection),
        }
    }

    /// Builds a `psql` invocation replaying `file` into `target`.
    #[must_use]
    pub fn restore(
        &self,
        connection: &ConnectionDescriptor,
        target: &DatabaseName,
        file: &Path,
    ) -> ToolInvocation {
        let mut args = connection_args(connection);
        args.extend([
            format!("--dbname={target}"),
            "--verbose".to_string(),
            "--no-password".to_string(),
            format!("--file={}", file.display()),
        ]);
        ToolInvocation {
            tool: Tool::Psql,
            program: self.psql.clone(),
            args,
            env: password_env(connection),
        }
    }

    /// `--version` output of each tool, or `Error: …` per tool.
    pub async fn versions(&self, runner: &dyn ToolRunner) -> BTreeMap<String, String> {
        let mut versions = BTreeMap::new();
        for tool in [Tool::PgDump, Tool::Psql] {
            let invocation = ToolInvocation {
                tool,
                program: self.path(tool).to_path_buf(),
                args: vec!["--version".to_string()],
                env: Vec::new(),
            };
            let line = match invoke(runner, &invocation).await {
                Ok(out) => out.output.trim().to_string(),
                Err(e) => format!("Error: {e}"),
            };
            versions.insert(tool.to_string(), line);
        }
        versions
    }
}

fn locate(tool: Tool, explicit: Option<PathBuf>) -> (PathBuf, bool) {
    if let Some(path) = explicit {
        let found = path.is_file();
        if !found {
            tracing::warn!(tool = %tool, path = %path.display(), "configured tool path does not exist");
        }
        return (path, found);
    }
    match find_on_path(tool.name()) {
        Some(path) => (path, true),
        None => {
            tracing::warn!(tool = %tool, "tool not found in PATH; falling back to bare name");
            (PathBuf::from(tool.name()), false)
        }
    }
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let file_name = format!("{name}{}", std::env::consts::EXE_SUFFIX);
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
}
