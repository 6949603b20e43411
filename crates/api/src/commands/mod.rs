//! Commands - frontend to backend bridge

mod buckets;
mod error;
mod sync;
mod timer;

pub use buckets::*;
pub use error::*;
pub use sync::*;
pub use timer::*;
