//! Type definitions for plugsync configuration

pub mod plugin_config;
pub mod runtime_config;

pub use plugin_config::*;
pub use runtime_config::*;
