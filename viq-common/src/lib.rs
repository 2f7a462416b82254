//! # VaultIQ Common Library
//!
//! Shared code for the VaultIQ services:
//! - Error type used across crates
//! - Configuration loading and root folder resolution
//! - Broadcast event bus
//! - SSE stream helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
