use thiserror::Error;

use super::load::UseError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Use(#[from] UseError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("module '{name}' is already registered")]
    AlreadyRegistered { name: String },
    #[error("anonymous module could not be identified")]
    AnonymousUnidentified,
}

/// Errors raised by resource fetchers.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("module source not found: {0}")]
    NotFound(String),
    #[error("invalid module source '{name}': {reason}")]
    Invalid { name: String, reason: String },
    #[error("register failed: {0}")]
    Register(#[from] RegisterError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("fetch error: {0}")]
    Other(String),
}
