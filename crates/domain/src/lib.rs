//! # StudySync Domain
//!
//! Business domain types and models for StudySync.
//!
//! This crate contains:
//! - Replicated timer state and its transition outcomes
//! - Cloud bundle, bucket and pending-write types
//! - Cross-process replication message protocol
//! - Domain error types and Result definitions
//! - Configuration structures
//!
//! ## Architecture
//! - No dependencies on other StudySync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
