//! Remote document store implementations

pub mod http;
pub mod memory;

pub use http::{HttpDocumentStore, HttpDocumentStoreConfig};
pub use memory::InMemoryDocumentStore;
