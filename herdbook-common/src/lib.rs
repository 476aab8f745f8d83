//! # Herdbook Common Library
//!
//! Shared code for the herdbook workspace:
//! - Error type and result alias
//! - Bootstrap configuration (TOML) and config-file resolution
//! - Diagnostics event bus (HerdEvent enum)
//! - Time helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventBus, HerdEvent};
