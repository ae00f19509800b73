//! Utility module for the timeline player
//!
//! This module provides common utilities used throughout the crate:
//! - Error handling with custom error types
//! - Configuration management
//! - Observable values for state change notification

pub mod config;
pub mod error;
pub mod observer;

// Re-export commonly used items
pub use config::Config;
pub use error::{PlayerError, Result};
pub use observer::{Observable, Subscription};

/// Load the library configuration
///
/// Loads configuration from:
/// 1. Default values
/// 2. System configuration file
/// 3. User configuration file
/// 4. Environment variables
pub fn load_config() -> Result<Config> {
    Config::load()
}
