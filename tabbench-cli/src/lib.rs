//! Support library for the `bench` binary.
//!
//! Re-exports the CLI and logging modules so doctests and integration tests
//! can exercise dataset preparation without forking a subprocess.

pub mod cli;
pub mod logging;
