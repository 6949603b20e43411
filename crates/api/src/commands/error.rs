//! Error returned by every command

use serde::Serialize;
use studysync_domain::{StudySyncError, SyncError, TransitionError};
use thiserror::Error;

/// Command failure, serialized as `{ "kind": .., "message": .. }` for the
/// frontend
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid timer transition: {0}")]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Store(#[from] StudySyncError),

    #[error("no user is signed in")]
    NotSignedIn,
}

impl CommandError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transition(err) => err.reason(),
            Self::Sync(_) => "sync",
            Self::Store(_) => "store",
            Self::NotSignedIn => "not-signed-in",
        }
    }
}

impl Serialize for CommandError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("CommandError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

pub type CommandResult<T> = Result<T, CommandError>;
