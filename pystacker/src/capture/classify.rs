//! Outcome classification for sampler runs.
//!
//! Rules are checked in order:
//!
//! 1. Spawn failed → `LaunchError`; bound exceeded → `TimedOut`
//! 2. Non-zero exit → `NotATarget` / `PermissionDenied` by signature, else `SamplerError`
//! 3. Clean exit, empty stdout → `EmptyOutput`
//! 4. Clean exit, structured mode, unparsable stdout → `MalformedOutput`
//! 5. Otherwise → `Success`

use std::time::Duration;

use super::CaptureOutcome;
use crate::config::CaptureConfig;
use crate::domain::CaptureFailureKind;
use crate::snapshot::parse_dump;
use crate::subprocess::Finished;

/// Printed by the sampler when the target has no recognizable interpreter.
pub const NOT_A_TARGET_SIGNATURE: &str = "Failed to find python version";

/// Matched case-insensitively.
const PERMISSION_SIGNATURE: &str = "permission denied";
/// Windows wording.
const ACCESS_DENIED_SIGNATURE: &str = "Access is denied";

/// Classify the raw result of a bounded sampler run.
pub fn classify(
    result: std::io::Result<Finished>,
    config: CaptureConfig,
    timeout: Duration,
) -> CaptureOutcome {
    match result {
        Err(e) => CaptureOutcome::failure(CaptureFailureKind::LaunchError, e.to_string()),
        Ok(Finished::TimedOut) => {
            CaptureOutcome::failure(CaptureFailureKind::TimedOut, format!("{timeout:?}"))
        }
        Ok(Finished::Exited(output)) => classify_output(
            output.status.success(),
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
            config,
        ),
    }
}

/// Classify a finished run from its exit status and captured streams.
pub fn classify_output(
    success: bool,
    stdout: &str,
    stderr: &str,
    config: CaptureConfig,
) -> CaptureOutcome {
    if !success {
        let detail = failure_detail(stdout, stderr);
        let combined = format!("{stderr}\n{stdout}");
        let kind = if combined.contains(NOT_A_TARGET_SIGNATURE) {
            CaptureFailureKind::NotATarget
        } else if combined.to_lowercase().contains(PERMISSION_SIGNATURE)
            || combined.contains(ACCESS_DENIED_SIGNATURE)
        {
            CaptureFailureKind::PermissionDenied
        } else {
            CaptureFailureKind::SamplerError
        };
        return CaptureOutcome::failure(kind, detail);
    }

    if stdout.trim().is_empty() {
        return CaptureOutcome::failure(CaptureFailureKind::EmptyOutput, "");
    }

    if config.structured() {
        return match parse_dump(stdout) {
            Ok(threads) => {
                CaptureOutcome::Success { raw_text: stdout.to_string(), threads: Some(threads) }
            }
            Err(_) => CaptureOutcome::failure(CaptureFailureKind::MalformedOutput, stdout),
        };
    }

    CaptureOutcome::Success { raw_text: stdout.to_string(), threads: None }
}

/// stderr if it says anything, else stdout, else a placeholder.
fn failure_detail(stdout: &str, stderr: &str) -> String {
    [stderr, stdout]
        .into_iter()
        .map(str::trim_end)
        .find(|text| !text.trim().is_empty())
        .unwrap_or("Unknown error")
        .to_string()
}
