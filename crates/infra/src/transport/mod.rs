//! Replication transports and transport selection

pub mod channel;

pub use channel::{select_transport, BroadcastChannelTransport, ChannelHub};
