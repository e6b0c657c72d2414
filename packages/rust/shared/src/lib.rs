//! Shared types, error model, and configuration for docmap.
//!
//! This crate is the foundation depended on by all other docmap crates.
//! It provides:
//! - [`DocMapError`] — the unified error type
//! - Domain types ([`FileDescriptor`], [`ExistenceStatus`], [`Document`],
//!   [`ParentRef`], [`DocumentId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{CreationFailure, DocMapError, Result};
pub use types::{
    ContextId, Document, DocumentId, ExistenceStatus, FileDescriptor, ObjectRef, ParentRef,
};
