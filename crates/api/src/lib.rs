//! # StudySync App
//!
//! Application layer - commands and main entry point.
//!
//! This crate contains:
//! - Commands (frontend → backend bridge)
//! - Application context (dependency injection)
//! - Logging setup
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Wires the ports of `core` to the adapters of `infra`
//! - One context per running tab of a profile

pub mod commands;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::*;
