//! CLI argument definitions

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{OutputFormat, Settings};
use crate::domain::Pid;

#[derive(Parser, Debug)]
#[command(
    name = "pystacker",
    version,
    about = "Capture and browse thread/stack snapshots of running Python processes",
    after_help = "\
EXAMPLES:
    pystacker capture                       Find Python under the current shell
    pystacker capture 1234                  Find Python under process 1234
    pystacker refresh 1001                  Capture process 1001 directly
    pystacker --headless capture 1234       Print the snapshot as JSON
    pystacker restore                       Reopen the views from last session"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (default: <config dir>/pystacker/config.yaml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the py-spy binary
    #[arg(long, global = true, value_name = "PATH")]
    pub sampler: Option<PathBuf>,

    /// Where open views are remembered (default: <data dir>/pystacker)
    #[arg(long, global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Print results instead of opening the TUI
    #[arg(long, global = true)]
    pub headless: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Sampler output format (overrides outputFormat)
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Include child processes of the target (overrides includeSubprocesses)
    #[arg(long, global = true)]
    pub subprocesses: bool,

    /// Capture local variables (overrides showLocalVariables)
    #[arg(long, global = true)]
    pub locals: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Find Python processes under ROOT and capture them
    Capture {
        /// Process to search under (default: the invoking shell)
        #[arg(value_name = "ROOT")]
        root: Option<i32>,

        /// Capture ROOT itself without asking when no Python process is found
        #[arg(short, long)]
        yes: bool,
    },
    /// Capture a known process directly
    Refresh {
        #[arg(value_name = "PID")]
        pid: Option<i32>,

        /// Label for the view (default: pid:<PID>)
        #[arg(long)]
        name: Option<String>,
    },
    /// Reopen the views that were open when pystacker last exited
    Restore,
}

impl Args {
    /// Settings from the file, with CLI flags applied on top.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(format) = self.format {
            settings.output_format = format;
        }
        settings.include_subprocesses |= self.subprocesses;
        settings.show_local_variables |= self.locals;
        if let Some(ref sampler) = self.sampler {
            settings.sampler_path = Some(sampler.clone());
        }
        Ok(settings)
    }
}

/// Root to resolve from: the given pid or this process's parent (the shell).
#[must_use]
pub fn capture_root(root: Option<i32>) -> Pid {
    Pid(root.unwrap_or_else(parent_pid))
}

#[cfg(unix)]
fn parent_pid() -> i32 {
    i32::try_from(std::os::unix::process::parent_id()).unwrap_or(1)
}

#[cfg(not(unix))]
fn parent_pid() -> i32 {
    i32::try_from(std::process::id()).unwrap_or_default()
}
