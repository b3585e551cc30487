//! Shared types, error model, and configuration for manualkit.
//!
//! This crate is the foundation depended on by all other manualkit crates.
//! It provides:
//! - [`ManualKitError`]: the unified error type
//! - Interchange records ([`CrossRefRecord`], [`Chunk`], [`RunManifest`])
//! - Configuration ([`AppConfig`], [`ChunkingConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChunkPolicy, ChunkingConfig, OutputConfig, RenderConfig, SourceConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ManualKitError, Result};
pub use types::{
    ArtifactMeta, CURRENT_SCHEMA_VERSION, Chunk, CrossRefRecord, RunId, RunManifest,
};
