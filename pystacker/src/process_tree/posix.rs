//! Process tree queries on Linux/macOS via `pgrep` and `ps`.

use std::time::Duration;

use log::debug;

use super::{ChildProcess, ProcessMeta, ProcessTreeQuery};
use crate::domain::{Pid, QueryError};
use crate::subprocess::{command, run_bounded, Finished};

const PGREP_TIMEOUT: Duration = Duration::from_secs(5);
const PS_TIMEOUT: Duration = Duration::from_secs(2);

/// `pgrep -P` for children, one `ps` call per child for its name and arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixQuery;

impl PosixQuery {
    async fn run(program: &str, args: &[String], timeout: Duration) -> Result<String, QueryError> {
        let display = format!("{program} {}", args.join(" "));
        let finished = run_bounded(command(program, args), timeout)
            .await
            .map_err(|error| QueryError::CommandFailed { command: display.clone(), error })?;

        let output = match finished {
            Finished::Exited(output) => output,
            Finished::TimedOut => return Err(QueryError::TimedOut { command: display, timeout }),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        // pgrep exits 1 when nothing matched
        if output.status.success() || (output.status.code() == Some(1) && stdout.trim().is_empty())
        {
            Ok(stdout)
        } else {
            Err(QueryError::NonZeroExit {
                command: display,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    async fn metadata(pid: Pid) -> Result<ProcessMeta, QueryError> {
        let args = vec!["-p".to_string(), pid.0.to_string(), "-o".into(), "comm=,args=".into()];
        let stdout = Self::run("ps", &args, PS_TIMEOUT).await?;
        parse_ps_line(&stdout).ok_or_else(|| QueryError::Unparsable {
            command: format!("ps -p {}", pid.0),
            detail: format!("no row for pid {}", pid.0),
        })
    }
}

impl ProcessTreeQuery for PosixQuery {
    async fn children(&self, parent: Pid) -> Result<Vec<ChildProcess>, QueryError> {
        let args = vec!["-P".to_string(), parent.0.to_string()];
        let stdout = Self::run("pgrep", &args, PGREP_TIMEOUT).await?;

        let mut children = Vec::new();
        for pid in parse_pgrep_output(&stdout) {
            let meta = match Self::metadata(pid).await {
                Ok(meta) => Some(meta),
                Err(e) => {
                    debug!("No metadata for {pid}: {e}");
                    None
                }
            };
            children.push(ChildProcess { pid, meta });
        }
        Ok(children)
    }

    async fn process_name(&self, pid: Pid) -> Result<String, QueryError> {
        // /proc is cheaper where it exists
        if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid.0)) {
            if let Some(comm) = extract_comm(&stat) {
                return Ok(comm);
            }
        }

        let args = vec!["-p".to_string(), pid.0.to_string(), "-o".into(), "comm=".into()];
        let stdout = Self::run("ps", &args, PS_TIMEOUT).await?;
        let name = basename(stdout.trim());
        if name.is_empty() {
            return Err(QueryError::ProcessNotFound(pid));
        }
        Ok(name.to_string())
    }
}

/// One pid per line; blank or non-numeric lines are ignored.
fn parse_pgrep_output(stdout: &str) -> Vec<Pid> {
    stdout.lines().filter_map(|line| line.trim().parse::<i32>().ok()).map(Pid).collect()
}

/// Parse a `ps -o comm=,args=` row: first token is the command, the rest its arguments.
///
/// macOS reports `comm` as a full path, so only the basename is kept.
fn parse_ps_line(stdout: &str) -> Option<ProcessMeta> {
    let line = stdout.lines().map(str::trim).find(|line| !line.is_empty())?;
    let mut tokens = line.split_whitespace();
    let name = basename(tokens.next()?).to_string();
    let args: Vec<&str> = tokens.collect();
    let command_line = (!args.is_empty()).then(|| args.join(" "));
    Some(ProcessMeta { name, command_line })
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Extract command name from `/proc/<pid>/stat`.
/// Format: "pid (comm) state ..."
fn extract_comm(stat_line: &str) -> Option<String> {
    let open = stat_line.find('(')?;
    let close = stat_line.rfind(')')?;
    if open >= close {
        return None;
    }
    Some(stat_line[open + 1..close].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_comm() {
        let stat = "1234 (python3) S 1 1234 1234 0 -1 4194304";
        assert_eq!(extract_comm(stat).as_deref(), Some("python3"));
    }

    #[test]
    fn test_extract_comm_with_parens() {
        // Command names can contain parentheses
        let stat = "1234 (app (v2)) S 1 1234";
        assert_eq!(extract_comm(stat).as_deref(), Some("app (v2)"));
    }

    #[test]
    fn test_parse_pgrep_output() {
        assert_eq!(parse_pgrep_output("1001\n1002\n\n"), vec![Pid(1001), Pid(1002)]);
        assert!(parse_pgrep_output("").is_empty());
    }

    #[test]
    fn test_parse_ps_line() {
        let meta = parse_ps_line("python3         python3 sample.py --threads 4\n").unwrap();
        assert_eq!(meta.name, "python3");
        assert_eq!(meta.command_line.as_deref(), Some("python3 sample.py --threads 4"));
    }

    #[test]
    fn test_parse_ps_line_macos_path() {
        let meta = parse_ps_line("/usr/local/bin/python3 /usr/local/bin/python3 app.py").unwrap();
        assert_eq!(meta.name, "python3");
    }

    #[test]
    fn test_parse_ps_line_empty() {
        assert!(parse_ps_line("\n").is_none());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_process_name_self() {
        #[allow(clippy::cast_possible_wrap)]
        let pid = Pid(std::process::id() as i32);
        let name = PosixQuery.process_name(pid).await.unwrap();
        assert!(!name.is_empty());
    }
}
