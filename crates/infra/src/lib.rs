//! # StudySync Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - Local stores (in-memory origin, JSON file)
//! - The broadcast channel transport and transport selection
//! - Remote document stores (in-memory, HTTP)
//! - Bundle HTTP client with retry and error classification
//! - Configuration loading and the connectivity signal
//!
//! ## Architecture
//! - Implements traits defined in `studysync-core`
//! - Depends on `studysync-domain` and `studysync-core`
//! - Contains all "impure" code (file and network I/O)

pub mod config;
pub mod errors;
pub mod http;
pub mod network;
pub mod remote;
pub mod store;
pub mod transport;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{BundleClient, RetryPolicy};
pub use network::NetworkStatus;
pub use remote::{HttpDocumentStore, HttpDocumentStoreConfig, InMemoryDocumentStore};
pub use store::{FileStore, MemoryOrigin, MemoryStore};
pub use transport::{select_transport, BroadcastChannelTransport, ChannelHub};
