//! Study timer: state machine, service and cross-process replication

pub mod machine;
pub mod ports;
pub mod replication;
pub mod service;
pub mod storage_transport;

pub use ports::{ReplicationTransport, TransportKind};
pub use replication::ReplicationBus;
pub use service::TimerService;
pub use storage_transport::StorageEventTransport;
