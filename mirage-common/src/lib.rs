//! # Mirage Common Library
//!
//! Shared code for the mirage retrieval crates:
//! - Error and result types
//! - Configuration loading (TOML bootstrap, root folder resolution)
//! - Logging bootstrap
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use error::{Error, Result};
