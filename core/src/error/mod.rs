#[allow(clippy::module_inception)]
pub mod error;
pub mod load;

pub use error::{CliError, FetchError, RegisterError};
pub use load::{FailureRecord, FailureStatus, LoadError, UseError};
