//! # Process Tree Resolution
//!
//! Finds the Python interpreter(s) running somewhere below a root process,
//! typically the shell of the terminal the user pointed at.
//!
//! ## Platform Queries
//!
//! The OS-specific part is a single capability, [`ProcessTreeQuery`]: list the
//! direct children of a pid, with name and command line when available.
//!
//! - `posix`: `pgrep -P <pid>` for children, then `ps` per child for metadata
//! - `windows`: one `Win32_Process` CIM query filtered by parent pid
//!
//! [`PlatformQuery`] picks the implementation for the build target once.
//!
//! ## Traversal
//!
//! [`Resolver::resolve`] walks the tree with an explicit worklist and a visited
//! set. Every child is expanded whether or not it is a candidate, because the
//! interpreter is often the grandchild of a wrapper. A pid that was already
//! visited is skipped, so recycled pids or a malformed tree that points back
//! at an ancestor cannot make the walk loop.
//!
//! Query failures never escape: tree introspection is a convenience, and the
//! caller falls back to sampling the root itself.

use std::collections::{HashSet, VecDeque};
use std::future::Future;

use log::{debug, warn};

use crate::domain::types::looks_like_interpreter;
use crate::domain::{Pid, ProcessCandidate, ProcessInfo, QueryError};

pub mod posix;
pub mod windows;

#[cfg(not(windows))]
pub type PlatformQuery = posix::PosixQuery;
#[cfg(windows)]
pub type PlatformQuery = windows::WmiQuery;

/// Query implementation for the platform this binary was built for.
#[must_use]
pub fn platform_query() -> PlatformQuery {
    PlatformQuery::default()
}

/// Name and command line of a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessMeta {
    pub name: String,
    pub command_line: Option<String>,
}

/// A direct child as reported by the OS.
///
/// `meta` is `None` when the child's details could not be fetched; the child
/// is still walked into but never reported as a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildProcess {
    pub pid: Pid,
    pub meta: Option<ProcessMeta>,
}

/// OS capability: enumerate processes by parent.
pub trait ProcessTreeQuery {
    /// Direct children of `parent`.
    fn children(
        &self,
        parent: Pid,
    ) -> impl Future<Output = Result<Vec<ChildProcess>, QueryError>> + Send;

    /// Executable name of `pid`.
    fn process_name(&self, pid: Pid) -> impl Future<Output = Result<String, QueryError>> + Send;
}

/// Walks a process tree looking for Python interpreters.
pub struct Resolver<Q> {
    query: Q,
}

impl<Q: ProcessTreeQuery> Resolver<Q> {
    pub fn new(query: Q) -> Self {
        Self { query }
    }

    /// All interpreter processes below `root`, in breadth-first order.
    ///
    /// Returns an empty list if the tree cannot be queried at all.
    pub async fn resolve(&self, root: Pid) -> Vec<ProcessCandidate> {
        let mut visited: HashSet<Pid> = HashSet::from([root]);
        let mut pending: VecDeque<Pid> = VecDeque::from([root]);
        let mut candidates = Vec::new();

        while let Some(parent) = pending.pop_front() {
            let children = match self.query.children(parent).await {
                Ok(children) => children,
                Err(e) if parent == root => {
                    warn!("Failed to query process tree under {root}: {e}");
                    continue;
                }
                Err(e) => {
                    debug!("Skipping subtree of {parent}: {e}");
                    continue;
                }
            };

            for child in children {
                if !visited.insert(child.pid) {
                    debug!("Already visited {}, not descending again", child.pid);
                    continue;
                }

                if let Some(meta) = child.meta {
                    if looks_like_interpreter(&meta.name) {
                        debug!("Candidate {} ({})", child.pid, meta.name);
                        candidates.push(ProcessCandidate {
                            pid: child.pid,
                            name: meta.name,
                            command_line: meta.command_line,
                        });
                    }
                }

                pending.push_back(child.pid);
            }
        }

        candidates
    }

    /// Describe the root itself, for the fallback prompt and view title.
    pub async fn root_info(&self, root: Pid) -> ProcessInfo {
        match self.query.process_name(root).await {
            Ok(name) => ProcessInfo::new(root, name),
            Err(e) => {
                debug!("Could not name root {root}: {e}");
                ProcessInfo::new(root, "terminal")
            }
        }
    }
}
