//! Common test infrastructure for plugsync-update tests
//!
//! # Usage
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `constants`: Repository coordinates, revision hashes, plugin headers
//! - `builders`: Fluent builder for plugin zip archives
//! - `fakes`: In-memory host and write-counting option store
//! - `mock_server`: Wiremock setup helpers for commit and archive endpoints
//! - `assertions`: Filesystem assertions and tree snapshots
//! - `updater_helpers`: Per-test environment wiring a full updater

// Allow unused code in test infrastructure; not every test file uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod assertions;
pub mod builders;
pub mod constants;
pub mod fakes;
pub mod mock_server;
pub mod updater_helpers;

pub use assertions::*;
pub use builders::*;
pub use constants::*;
pub use fakes::*;
pub use mock_server::*;
pub use updater_helpers::*;
