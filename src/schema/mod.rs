//! Schema module - Configuration types for the game and its training runs.

mod config;
mod evolution;

pub use config::*;
pub use evolution::*;
