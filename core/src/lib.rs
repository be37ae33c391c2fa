pub mod config;
pub mod error;
pub mod loader;

pub use config::{load_default, LoaderConfig, LoggingConfig};
pub use error::{FailureRecord, FailureStatus, LoadError, RegisterError, UseError};
pub use loader::{Loader, LoaderBuilder, ModuleDef, UseOptions};
