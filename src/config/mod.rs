//! Configuration loading and management for the attendance engine.
//!
//! This module loads the staffing ratio policy, calendar bounds, and default
//! end mark settings from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use childcare_attendance::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap();
//! println!("Warning threshold: {}", config.config().warning_threshold());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    AgeBand, CalendarConfig, DEFAULT_MAX_RANGE_DAYS, EndMarksConfig, EngineConfig, StaffingConfig,
};
