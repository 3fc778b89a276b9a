//! Configuration for the warden relay and limit subsystems.

pub mod loader;
pub mod types;

pub use loader::{load_config, ConfigLoader};
pub use types::*;
