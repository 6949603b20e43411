//! Domain types and models
//!
//! - [`timer`]: the replicated study-timer record and transition outcomes
//! - [`bundle`]: cloud buckets, the remote bundle and pending writes
//! - [`replication`]: process identity and the cross-process message protocol

pub mod bundle;
pub mod replication;
pub mod timer;

pub use bundle::{Bucket, BucketMap, CloudBundle, PendingWrite};
pub use replication::{ChannelMessage, InstanceId};
pub use timer::{
    running_interval_ms, CompletedSession, StopOutcome, TimerDisplay, TimerPhase, TimerState,
    TransitionError,
};
