//! Error types for vehicle construction, tuning tables and configuration.

use std::path::PathBuf;

/// Fatal construction errors. A vehicle that fails with one of these is never
/// handed out half-built.
#[derive(Debug, thiserror::Error)]
pub enum VehicleError {
    #[error("unknown vehicle brand: {0}")]
    UnknownBrand(String),

    #[error("vehicle is missing required part: {0}")]
    MissingPart(&'static str),

    #[error("expected 4 wheels, found {found}")]
    WheelCount { found: usize },

    #[error("wheel index {0} is used by more than one wheel")]
    DuplicateWheelIndex(u32),

    #[error("tag {tag} has an invalid value: {value}")]
    InvalidTag { tag: &'static str, value: String },
}

/// Errors while loading a tuning table from disk.
#[derive(Debug, thiserror::Error)]
pub enum TuningError {
    #[error("failed to read tuning file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tuning table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("tuning table has no brands")]
    Empty,
}

/// Invalid environment configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },

    #[error("invalid server address format")]
    InvalidAddress,
}
