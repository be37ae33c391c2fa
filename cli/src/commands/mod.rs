pub mod cli;
pub mod use_modules;
