//! Error types for YatraNav

use thiserror::Error;

/// YatraNav error type
#[derive(Error, Debug)]
pub enum NavError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Target index {index} out of range (catalog has {len} targets)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Transform lookup failed: {0}")]
    Transform(String),

    #[error("Goal dispatch failed: {0}")]
    Dispatch(String),

    #[error("Velocity publish failed: {0}")]
    Publish(String),

    #[error("Target {index} unreachable after {attempts} attempts")]
    UnreachableTarget { index: usize, attempts: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for NavError {
    fn from(e: toml::de::Error) -> Self {
        NavError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NavError>;
