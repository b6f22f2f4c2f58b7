//! Shared types, error model, and configuration for drivedocs.
//!
//! This crate is the foundation depended on by all other drivedocs crates.
//! It provides:
//! - [`DriveDocsError`]: the unified error type
//! - Domain types ([`FileDescriptor`], [`Record`], [`FileType`], [`RunId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, DriveConfig, KeywordsConfig, config_dir, config_file_path,
    expand_home, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{DriveDocsError, Result};
pub use types::{
    DOCX_MIME, FileDescriptor, FileType, GOOGLE_DOC_MIME, ModifiedDate, PLAIN_TEXT_MIME,
    Record, RunId, UNTITLED,
};
