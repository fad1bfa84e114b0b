//! # pystacker - Main Entry Point
//!
//! Supports two operational modes:
//! - **TUI** (default): captures open as tabs; `r` re-captures, views are
//!   remembered for `pystacker restore`
//! - **Headless** (`--headless`): snapshots are printed as JSON, errors go to
//!   stderr, nothing is remembered

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use pystacker::app::{App, CaptureReport};
use pystacker::capture::CaptureEngine;
use pystacker::cli::{capture_root, Args, Command};
use pystacker::config::default_state_dir;
use pystacker::domain::{CaptureFailureKind, Pid};
use pystacker::host::{HeadlessHost, ViewHost};
use pystacker::preflight::{check_process_exists, locate_sampler, warn_if_unprivileged};
use pystacker::process_tree::{platform_query, ProcessTreeQuery, Resolver};
use pystacker::selection::{default_prompter, Selection};
use pystacker::store::{
    FileSessionStorage, MemorySessionStorage, SessionStorage, SnapshotStore,
};
use pystacker::tui::{self, TuiHost};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = err.to_string().to_lowercase();
    if msg.contains("permission denied") {
        EXIT_NOPERM
    } else if msg.contains("missing required argument") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

/// Session mirror: the state file for the TUI and `restore`, memory otherwise.
fn session_storage(args: &Args) -> Box<dyn SessionStorage> {
    let persistent = !args.headless || args.command == Command::Restore;
    if !persistent {
        return Box::<MemorySessionStorage>::default();
    }
    match args.state_dir.clone().or_else(default_state_dir) {
        Some(dir) => {
            let storage = FileSessionStorage::in_dir(dir);
            info!("Session file: {}", storage.path().display());
            Box::new(storage)
        }
        None => {
            warn!("No data directory available; views will not be remembered");
            Box::<MemorySessionStorage>::default()
        }
    }
}

/// Map capture results to the process outcome in headless mode.
fn check_reports(reports: &[CaptureReport]) -> Result<()> {
    let failed: Vec<&CaptureReport> = reports.iter().filter(|r| !r.succeeded()).collect();
    if failed.is_empty() {
        return Ok(());
    }
    if failed.iter().any(|r| r.failure == Some(CaptureFailureKind::PermissionDenied)) {
        bail!("Permission denied while attaching to {}", failed[0].target.label());
    }
    bail!("{} of {} capture(s) failed", failed.len(), reports.len())
}

#[tokio::main(flavor = "current_thread")]
async fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    let settings = args.settings()?;
    let sampler = locate_sampler(settings.sampler_path.as_deref())?;
    let config = settings.capture_config();

    if let Command::Capture { root, .. } = args.command {
        check_process_exists(capture_root(root))?;
    }
    warn_if_unprivileged(quiet);

    let engine = CaptureEngine::new(&sampler);
    let resolver = Resolver::new(platform_query());
    let store = SnapshotStore::new(session_storage(&args));

    if args.headless {
        let mut app = App::new(HeadlessHost::stdio(), store, engine, resolver, config);
        return run_headless(&mut app, &args).await;
    }

    let (command_tx, command_rx) = crossbeam_channel::unbounded();
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut app = App::new(TuiHost::new(command_tx), store, engine, resolver, config);

    // Prompts need the plain terminal, so disambiguate before the TUI starts.
    let targets = match args.command {
        Command::Capture { root, yes } => {
            let mut prompter = default_prompter(yes);
            match app.select(capture_root(root), prompter.as_mut()).await? {
                Selection::Targets(targets) => targets,
                Selection::Cancelled => {
                    if !quiet {
                        println!("cancelled");
                    }
                    return Ok(());
                }
            }
        }
        _ => Vec::new(),
    };

    if !quiet {
        println!("pystacker v{}", env!("CARGO_PKG_VERSION"));
        println!("sampler: {}", sampler.display());
    }

    // Launch TUI in separate thread
    let tui_handle = std::thread::spawn(move || tui::run(command_rx, event_tx));

    match args.command {
        Command::Capture { .. } => {
            app.capture_targets(targets).await;
        }
        Command::Refresh { pid, name } => {
            app.refresh(pid.map(Pid), name).await;
        }
        Command::Restore => {
            app.restore();
        }
    }

    app.run(&mut event_rx).await;
    // Closes the command channel, which stops the TUI if it is still up.
    drop(app);

    match tui_handle.join() {
        Ok(result) => result.context("Terminal UI failed")?,
        Err(_) => bail!("Terminal UI thread panicked"),
    }
    Ok(())
}

async fn run_headless<H: ViewHost, Q: ProcessTreeQuery>(
    app: &mut App<H, Q>,
    args: &Args,
) -> Result<()> {
    match &args.command {
        Command::Capture { root, yes } => {
            let mut prompter = default_prompter(*yes);
            let reports = app.capture_from_root(capture_root(*root), prompter.as_mut()).await?;
            check_reports(&reports)
        }
        Command::Refresh { pid, name } => {
            let Some(pid) = *pid else {
                bail!("Missing required argument: PID");
            };
            match app.refresh(Some(Pid(pid)), name.clone()).await {
                Some(report) => check_reports(&[report]),
                None => Ok(()),
            }
        }
        Command::Restore => {
            let restored = app.restore();
            if restored == 0 && !args.quiet {
                eprintln!("no views to restore");
            }
            // Nothing else drives the loop here; deliver the second send too.
            app.drain_resends().await;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pystacker::config::CaptureConfig;
    use pystacker::domain::ProcessInfo;
    use pystacker::process_tree::PlatformQuery;
    use pystacker_common::PersistedView;

    fn headless_app<'a>(
        out: &'a mut Vec<u8>,
        err: &'a mut Vec<u8>,
        store: SnapshotStore,
    ) -> App<HeadlessHost<&'a mut Vec<u8>, &'a mut Vec<u8>>, PlatformQuery> {
        App::new(
            HeadlessHost::new(out, err),
            store,
            CaptureEngine::new("/nonexistent/py-spy"),
            Resolver::new(platform_query()),
            CaptureConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_headless_refresh_without_pid_is_one_usage_error() {
        let args = Args::try_parse_from(["pystacker", "--headless", "refresh"]).unwrap();
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let error = {
            let mut app = headless_app(&mut out, &mut err, SnapshotStore::in_memory());
            run_headless(&mut app, &args).await.unwrap_err()
        };

        assert_eq!(exit_code_for(&error), EXIT_USAGE);
        assert!(out.is_empty());
        assert!(err.is_empty());
    }

    #[tokio::test]
    async fn test_headless_restore_sends_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileSessionStorage::in_dir(dir.path());
        let entry = PersistedView {
            threads: vec![],
            process_info: ProcessInfo::new(Pid(1001), "python3"),
            captured_at: None,
        };
        storage.save(&pystacker::store::session_key(Pid(1001)), &entry).unwrap();

        let args = Args::try_parse_from(["pystacker", "--headless", "-q", "restore"]).unwrap();
        let (mut out, mut err) = (Vec::new(), Vec::new());
        {
            let store = SnapshotStore::new(Box::new(FileSessionStorage::in_dir(dir.path())));
            let mut app = headless_app(&mut out, &mut err, store);
            run_headless(&mut app, &args).await.unwrap();
        }

        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.matches("\"command\": \"init\"").count(), 2);
        assert!(err.is_empty());
    }
}
