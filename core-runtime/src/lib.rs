//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the podcast playback core:
//! - Logging and tracing setup
//! - Configuration of injected host capabilities
//! - Event bus for playback and history events
//!
//! Every other core crate depends on this one for its logging conventions
//! and event types.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
