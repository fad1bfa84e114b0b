//! Command-line interface

mod args;

pub use args::{capture_root, Args, Command};
