//! # plugsync-core
//!
//! Core library for plugsync providing:
//! - Runtime configuration (network, API endpoint, paths, display)
//! - Tracked plugin definitions (plugins.yaml)
//! - Hierarchical config loading with embedded defaults and env overrides

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::HierarchicalConfigLoader;
pub use error::{Error, Result};
pub use utils::get_home_dir;
