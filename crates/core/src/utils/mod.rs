//! Small helpers shared by the core services

pub mod stream;

pub use stream::broadcast_stream;
