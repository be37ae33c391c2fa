pub mod factory;
pub mod fetcher;
pub mod resolver;
pub mod strategy;
