pub mod module;
pub mod options;

pub use module::*;
pub use options::*;
