//! Configuration system for the error-overlay failure inspector.
//!
//! This crate provides configuration loading, saving, and default values
//! for the overlay. It includes:
//!
//! - Artifact fetch settings (timeouts, size limits, allowed schemes)
//! - Initial display mode and ambient capture toggles
//! - Code excerpt window sizing
//! - Typed errors for config I/O and validation

pub mod config;
pub mod defaults;
pub mod error;

pub use config::{ExcerptConfig, FetchConfig, LogLevel, OverlayConfig};
pub use error::ConfigError;
