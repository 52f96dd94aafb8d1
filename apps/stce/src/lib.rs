//! # STCE Library
//!
//! This library exposes the STCE server modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod config;

// Re-export stce_core for convenience
pub use stce_core;
