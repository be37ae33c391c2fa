pub mod env;

pub use env::EnvStrategy;
