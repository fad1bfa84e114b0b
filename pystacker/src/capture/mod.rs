//! # Snapshot Capture
//!
//! Runs the external sampler against one process and turns whatever happens
//! into a [`CaptureOutcome`]. Nothing here retries, stores or displays; the
//! outcome is returned by value and the caller decides where it goes.
//!
//! ## Invocation
//!
//! ```text
//! py-spy dump --pid <pid> [--json] [--subprocesses] [--locals]
//! ```
//!
//! The engine owns the time bound ([`CAPTURE_TIMEOUT`]) rather than trusting
//! the sampler to give up on its own. There is no early cancellation: once
//! launched the sampler runs until it exits or the bound kills it.
//!
//! ## Classification
//!
//! See [`classify`] for the ordered rules.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info};
use pystacker_common::ThreadRecord;

use crate::config::CaptureConfig;
use crate::domain::{CaptureFailure, CaptureFailureKind, Pid};
use crate::subprocess::{command, run_bounded};

pub mod classify;

pub use classify::{classify, classify_output};

/// Hard bound on a single sampler run.
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(15);

/// Result of one capture. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// Sampler exited cleanly with output. `threads` is set in structured mode.
    Success { raw_text: String, threads: Option<Vec<ThreadRecord>> },
    Failure(CaptureFailure),
}

impl CaptureOutcome {
    pub(crate) fn failure(kind: CaptureFailureKind, detail: impl Into<String>) -> Self {
        Self::Failure(CaptureFailure::new(kind, detail))
    }

    #[must_use]
    pub fn failure_kind(&self) -> Option<CaptureFailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure(failure) => Some(failure.kind),
        }
    }
}

/// Sampler arguments for one capture.
#[must_use]
pub fn sampler_args(target: Pid, config: CaptureConfig) -> Vec<String> {
    let mut args = vec!["dump".to_string(), "--pid".to_string(), target.0.to_string()];
    if config.structured() {
        args.push("--json".into());
    }
    if config.include_subprocesses {
        args.push("--subprocesses".into());
    }
    if config.include_locals {
        args.push("--locals".into());
    }
    args
}

/// Invokes the sampler with a bounded timeout.
#[derive(Debug, Clone)]
pub struct CaptureEngine {
    sampler: PathBuf,
    timeout: Duration,
}

impl CaptureEngine {
    pub fn new(sampler: impl Into<PathBuf>) -> Self {
        Self { sampler: sampler.into(), timeout: CAPTURE_TIMEOUT }
    }

    /// Override the time bound (tests use short bounds).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sampler(&self) -> &Path {
        &self.sampler
    }

    /// Capture `target` once.
    pub async fn capture(&self, target: Pid, config: CaptureConfig) -> CaptureOutcome {
        let args = sampler_args(target, config);
        info!("Capturing {target}: {} {}", self.sampler.display(), args.join(" "));

        let started = Instant::now();
        let result = run_bounded(command(&self.sampler, &args), self.timeout).await;
        let outcome = classify(result, config, self.timeout);

        match &outcome {
            CaptureOutcome::Success { raw_text, threads } => debug!(
                "Capture of {target} finished in {:?}: {} bytes, {} threads",
                started.elapsed(),
                raw_text.len(),
                threads.as_ref().map_or(0, Vec::len)
            ),
            CaptureOutcome::Failure(failure) => {
                debug!("Capture of {target} failed after {:?}: {failure}", started.elapsed());
            }
        }
        outcome
    }
}
