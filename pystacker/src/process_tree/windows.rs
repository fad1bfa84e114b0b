//! Process tree queries on Windows via a `Win32_Process` CIM query.
//!
//! One PowerShell invocation per parent returns id, name and command line of
//! every direct child, so there is no separate metadata fetch. Pids may be
//! recycled between the query and the capture; nothing here compensates.

use std::time::Duration;

use serde::Deserialize;

use super::{ChildProcess, ProcessMeta, ProcessTreeQuery};
use crate::domain::{Pid, QueryError};
use crate::subprocess::{command, run_bounded, Finished};

const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default)]
pub struct WmiQuery;

/// Row emitted by `Select-Object ProcessId, Name, CommandLine | ConvertTo-Json`.
#[derive(Debug, Deserialize)]
struct WmiProcess {
    #[serde(rename = "ProcessId")]
    process_id: i32,
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "CommandLine", default)]
    command_line: Option<String>,
}

/// `ConvertTo-Json` emits a bare object for one row and an array for several.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<WmiProcess>),
    One(WmiProcess),
}

impl WmiQuery {
    async fn powershell(script: String) -> Result<String, QueryError> {
        let display = format!("powershell -Command {script}");
        let args = ["-NoProfile".to_string(), "-Command".to_string(), script];
        let finished = run_bounded(command("powershell", &args), QUERY_TIMEOUT)
            .await
            .map_err(|error| QueryError::CommandFailed { command: display.clone(), error })?;

        match finished {
            Finished::TimedOut => {
                Err(QueryError::TimedOut { command: display, timeout: QUERY_TIMEOUT })
            }
            Finished::Exited(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Finished::Exited(output) => Err(QueryError::NonZeroExit {
                command: display,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }
}

impl ProcessTreeQuery for WmiQuery {
    async fn children(&self, parent: Pid) -> Result<Vec<ChildProcess>, QueryError> {
        let script = format!(
            "Get-CimInstance Win32_Process -Filter 'ParentProcessId = {}' | \
             Select-Object ProcessId, Name, CommandLine | ConvertTo-Json",
            parent.0
        );
        let stdout = Self::powershell(script).await?;
        parse_children(&stdout)
    }

    async fn process_name(&self, pid: Pid) -> Result<String, QueryError> {
        let script = format!(
            "Get-CimInstance Win32_Process -Filter 'ProcessId = {}' | \
             Select-Object -ExpandProperty Name",
            pid.0
        );
        let stdout = Self::powershell(script).await?;
        let name = stdout.trim();
        if name.is_empty() {
            return Err(QueryError::ProcessNotFound(pid));
        }
        Ok(name.to_string())
    }
}

fn parse_children(stdout: &str) -> Result<Vec<ChildProcess>, QueryError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let rows = match serde_json::from_str::<OneOrMany>(trimmed) {
        Ok(OneOrMany::Many(rows)) => rows,
        Ok(OneOrMany::One(row)) => vec![row],
        Err(e) => {
            return Err(QueryError::Unparsable {
                command: "Get-CimInstance Win32_Process".to_string(),
                detail: e.to_string(),
            })
        }
    };

    Ok(rows
        .into_iter()
        .map(|row| ChildProcess {
            pid: Pid(row.process_id),
            meta: Some(ProcessMeta {
                name: row.name.unwrap_or_default(),
                command_line: row.command_line,
            }),
        })
        .collect())
}
