//! Core pipeline orchestration for manualkit.
//!
//! This crate ties together fragment assembly, markup conversion, and
//! chunking into the end-to-end `build` workflow, and writes the run's
//! artifacts with a checksummed manifest.

pub mod output;
pub mod pipeline;

pub use pipeline::{
    BuildConfig, BuildResult, ProgressReporter, SilentProgress, build, chunk_file,
};
