//! Local store implementations: in-memory origin and JSON file

pub mod file;
pub mod memory;

pub use file::{cleanup_temp_file, FileStore};
pub use memory::{MemoryOrigin, MemoryStore};
