//! Common error types for mirage

use thiserror::Error;

/// Common result type for mirage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across mirage crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML document could not be parsed
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML document could not be serialized
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
