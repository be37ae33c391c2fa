pub mod fetcher;
pub mod identifier;
pub mod resolver;
pub mod strategy;

pub use fetcher::*;
pub use identifier::*;
pub use resolver::*;
pub use strategy::*;
