//! Command-line interface for preparing benchmark datasets.
//!
//! `bench [--device host|cuda] [--device-id N] [--memory-limit BYTES]
//! <generator> [options]` selects a device, resolves the generator keyword
//! through the [`Registry`] (defaulting to `blobs`) and hands the remaining
//! arguments to that generator. Generator options accept both the legacy
//! single-dash spelling (`-nrows 100`) and the double-dash one.

mod commands;
mod generators;
mod registry;

pub use commands::{
    Cli, CliError, DeviceKind, RunSummary, normalize_legacy_args, render_summary, run_cli,
};
pub use generators::{BlobsArgs, LoadArgs, blobs, load};
pub use registry::{DEFAULT_GENERATOR, GeneratorFn, Registry};

#[cfg(test)]
mod test_helpers;
