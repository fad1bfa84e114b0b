//! Bounded child-process invocation shared by the tree queries and the sampler.
//!
//! Every helper process is spawned with stdin closed, its output captured in
//! full, no console window on Windows, and `kill_on_drop` so a timed-out child
//! does not outlive its caller.

use std::ffi::OsStr;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;

/// How a bounded invocation ended.
#[derive(Debug)]
pub enum Finished {
    Exited(Output),
    TimedOut,
}

/// Build a command configured for bounded, non-interactive use.
pub fn command<I, S>(program: impl AsRef<OsStr>, args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    hide_console_window(&mut cmd);
    cmd
}

/// Run `cmd` to completion or until `timeout` elapses.
///
/// Spawn failures are returned as `Err`. On timeout the child is killed when
/// its future is dropped.
pub async fn run_bounded(mut cmd: Command, timeout: Duration) -> std::io::Result<Finished> {
    let child = cmd.spawn()?;
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => Ok(Finished::Exited(output?)),
        Err(_) => Ok(Finished::TimedOut),
    }
}

#[cfg(windows)]
fn hide_console_window(cmd: &mut Command) {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_cmd: &mut Command) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_output() {
        let cmd = command("sh", ["-c", "echo out; echo err >&2; exit 3"]);
        let Finished::Exited(output) = run_bounded(cmd, Duration::from_secs(5)).await.unwrap()
        else {
            panic!("expected exit");
        };
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stdout), "out\n");
        assert_eq!(String::from_utf8_lossy(&output.stderr), "err\n");
    }

    #[tokio::test]
    async fn test_timeout() {
        let cmd = command("sleep", ["5"]);
        let started = std::time::Instant::now();
        let finished = run_bounded(cmd, Duration::from_millis(100)).await.unwrap();
        assert!(matches!(finished, Finished::TimedOut));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let cmd = command("/nonexistent/pystacker-no-such-binary", Vec::<&str>::new());
        assert!(run_bounded(cmd, Duration::from_secs(1)).await.is_err());
    }
}
