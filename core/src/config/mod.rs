mod load;
mod types;

pub use load::{config_path, load_default, load_from};
pub use types::{LoaderConfig, LoggingConfig};
