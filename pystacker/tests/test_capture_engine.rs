#![cfg(unix)]

mod common;

use std::time::{Duration, Instant};

use common::{fake_sampler, recorded_args, DUMP_FIXTURE, ONE_THREAD};
use pystacker::capture::{CaptureEngine, CaptureOutcome};
use pystacker::config::{CaptureConfig, OutputFormat};
use pystacker::domain::{CaptureFailure, CaptureFailureKind, Pid};

#[tokio::test]
async fn test_not_a_target_signature() {
    let dir = tempfile::tempdir().unwrap();
    let sampler = fake_sampler(
        dir.path(),
        "echo 'Error: Failed to find python version from target process' >&2\nexit 1",
    );

    let outcome = CaptureEngine::new(sampler).capture(Pid(1001), CaptureConfig::default()).await;
    assert_eq!(outcome.failure_kind(), Some(CaptureFailureKind::NotATarget));
}

#[tokio::test]
async fn test_permission_denied_keeps_message() {
    let dir = tempfile::tempdir().unwrap();
    let sampler =
        fake_sampler(dir.path(), "echo 'Error: permission denied (os error 13)' >&2\nexit 1");

    let outcome = CaptureEngine::new(sampler).capture(Pid(1001), CaptureConfig::default()).await;
    assert_eq!(
        outcome,
        CaptureOutcome::Failure(CaptureFailure::new(
            CaptureFailureKind::PermissionDenied,
            "Error: permission denied (os error 13)"
        ))
    );
}

#[tokio::test]
async fn test_structured_success_passes_flags() {
    let dir = tempfile::tempdir().unwrap();
    let sampler = fake_sampler(dir.path(), &format!("echo '{ONE_THREAD}'"));

    let outcome = CaptureEngine::new(sampler).capture(Pid(1001), CaptureConfig::default()).await;
    assert_eq!(recorded_args(dir.path()).as_deref(), Some("dump --pid 1001 --json"));

    let CaptureOutcome::Success { threads: Some(threads), .. } = outcome else {
        panic!("expected structured success, got {outcome:?}");
    };
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].display_name(), "MainThread");
    assert!(threads[0].frames.is_empty());
}

#[tokio::test]
async fn test_fixture_dump_with_locals() {
    let dir = tempfile::tempdir().unwrap();
    let sampler = fake_sampler(dir.path(), &format!("cat '{DUMP_FIXTURE}'"));
    let config = CaptureConfig {
        output: OutputFormat::Json,
        include_subprocesses: true,
        include_locals: true,
    };

    let outcome = CaptureEngine::new(sampler).capture(Pid(1001), config).await;
    assert_eq!(
        recorded_args(dir.path()).as_deref(),
        Some("dump --pid 1001 --json --subprocesses --locals")
    );

    let CaptureOutcome::Success { threads: Some(threads), .. } = outcome else {
        panic!("expected structured success, got {outcome:?}");
    };
    assert_eq!(threads.len(), 2);
    let worker = &threads[1];
    assert!(worker.active && worker.owns_gil);
    assert_eq!(worker.frames[0].name.as_deref(), Some("spin"));
    assert_eq!(worker.frames[2].locals().len(), 2);
    assert!(!worker.frames[2].locals()[1].arg);
    assert!(threads[0].frames[0].locals().is_empty());
}

#[tokio::test]
async fn test_text_mode_is_not_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let sampler = fake_sampler(dir.path(), "echo 'Thread 0x7F (active): \"MainThread\"'");
    let config = CaptureConfig { output: OutputFormat::Text, ..CaptureConfig::default() };

    let outcome = CaptureEngine::new(sampler).capture(Pid(7), config).await;
    assert_eq!(recorded_args(dir.path()).as_deref(), Some("dump --pid 7"));
    assert_eq!(
        outcome,
        CaptureOutcome::Success {
            raw_text: "Thread 0x7F (active): \"MainThread\"\n".to_string(),
            threads: None
        }
    );
}

#[tokio::test]
async fn test_empty_and_malformed_output() {
    let dir = tempfile::tempdir().unwrap();
    let empty = fake_sampler(dir.path(), "exit 0");
    let outcome = CaptureEngine::new(empty).capture(Pid(1), CaptureConfig::default()).await;
    assert_eq!(outcome.failure_kind(), Some(CaptureFailureKind::EmptyOutput));

    let dir = tempfile::tempdir().unwrap();
    let garbage = fake_sampler(dir.path(), "echo 'not json'");
    let outcome = CaptureEngine::new(garbage).capture(Pid(1), CaptureConfig::default()).await;
    assert_eq!(outcome.failure_kind(), Some(CaptureFailureKind::MalformedOutput));
}

#[tokio::test]
async fn test_hung_sampler_is_cut_off() {
    let dir = tempfile::tempdir().unwrap();
    let sampler = fake_sampler(dir.path(), &format!("sleep 20\necho '{ONE_THREAD}'"));
    let engine = CaptureEngine::new(sampler).with_timeout(Duration::from_millis(300));

    let started = Instant::now();
    let outcome = engine.capture(Pid(2000), CaptureConfig::default()).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(outcome.failure_kind(), Some(CaptureFailureKind::TimedOut));
}
