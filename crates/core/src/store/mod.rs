//! Persistent local store port and key layout

pub mod keys;
pub mod ports;

pub use keys::StoreKeys;
pub use ports::{ChangeKind, ChangeScope, LocalStore, StoreChange};
