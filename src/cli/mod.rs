//! CLI command handling

pub mod hook;
pub mod output;
pub mod send;

pub use hook::*;
pub use output::*;
pub use send::*;
