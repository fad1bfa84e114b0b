//! # pystacker - Thread/Stack Snapshots of Running Python Processes
//!
//! pystacker finds the Python interpreter behind a terminal, runs
//! [py-spy](https://github.com/benfred/py-spy) against it once, and shows the
//! resulting thread and frame dump in a view that can be re-captured, closed,
//! and revived after a restart.
//!
//! ## Architecture Overview
//!
//! ```text
//!   root pid (a shell)
//!        │
//!        ▼
//! ┌──────────────┐  candidates  ┌──────────────┐  targets  ┌──────────────┐
//! │ process_tree │─────────────▶│  selection   │──────────▶│   capture    │
//! │  (Resolver)  │              │  (prompts)   │           │ (py-spy run) │
//! └──────────────┘              └──────────────┘           └──────┬───────┘
//!                                                                 │ outcome
//!                                                                 ▼
//! ┌──────────────┐   init/error  ┌──────────────┐  put/bind  ┌──────────────┐
//! │  host / tui  │◀──────────────│  lifecycle   │───────────▶│    store     │
//! │   (views)    │──────────────▶│ (controller) │            │ (+ session)  │
//! └──────────────┘ ready/refresh └──────────────┘            └──────────────┘
//! ```
//!
//! [`app::App`] owns all of it and runs the single-threaded event loop.
//!
//! ## Module Structure
//!
//! ### Core
//!
//! - [`process_tree`]: walk a process tree for Python interpreters
//!   - `posix`: `pgrep`/`ps` based child enumeration
//!   - `windows`: `Win32_Process` CIM query
//! - [`capture`]: run the sampler with a hard timeout and classify the result
//! - [`snapshot`]: immutable capture of a target's threads
//! - [`store`]: latest snapshot and bound view per target, mirrored to the
//!   session file
//! - [`lifecycle`]: create, reuse, revive and dispose views
//! - [`app`]: top-level controller and event loop
//!
//! ### Host and Interface
//!
//! - [`host`]: the `ViewHost` capability and the headless host
//! - [`tui`]: terminal host, one tab per view
//! - [`selection`]: disambiguation prompts
//! - [`cli`], [`config`], [`preflight`]: arguments, settings, environment checks
//! - [`domain`]: core types and errors
//!
//! ## Typical Usage
//!
//! ```bash
//! # Capture the Python process running under the current shell
//! pystacker capture
//!
//! # Capture a specific process and print JSON
//! pystacker --headless refresh 1001
//!
//! # Reopen the views from last session
//! pystacker restore
//! ```

pub mod app;
pub mod capture;
pub mod cli;
pub mod config;
pub mod domain;
pub mod host;
pub mod lifecycle;
pub mod preflight;
pub mod process_tree;
pub mod selection;
pub mod snapshot;
pub mod store;
pub mod subprocess;
pub mod tui;
