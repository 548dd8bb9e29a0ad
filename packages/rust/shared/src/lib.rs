//! Shared types, error model, and configuration for Scriptwright.
//!
//! This crate is the foundation depended on by all other Scriptwright crates.
//! It provides:
//! - [`ScriptwrightError`] — the unified error type
//! - Domain types ([`SearchItem`], [`Answer`], [`EvidenceDocument`], [`GenerationResult`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, GeminiConfig, OtherSourcesConfig, RendererConfig, StackOverflowConfig, config_dir,
    config_file_path, env_credential, init_config, load_config, load_config_from,
};
pub use error::{Result, ScriptwrightError};
pub use types::{
    Answer, EvidenceDocument, GenerationResult, PDF_MIME_TYPE, SearchItem, SearchResponse,
    StoredFile,
};
