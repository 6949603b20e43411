//! Store key layout: `<prefix>.timerState`, `<prefix>.bucket.<bucket>` and
//! `<prefix>.pendingWrites`

use studysync_domain::constants::{
    DEFAULT_STORE_PREFIX, PENDING_WRITES_KEY_SUFFIX, TIMER_STATE_KEY_SUFFIX,
};
use studysync_domain::Bucket;

/// Key names under one configurable prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    prefix: String,
}

impl StoreKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn timer_state(&self) -> String {
        format!("{}.{TIMER_STATE_KEY_SUFFIX}", self.prefix)
    }

    pub fn pending_writes(&self) -> String {
        format!("{}.{PENDING_WRITES_KEY_SUFFIX}", self.prefix)
    }

    pub fn bucket(&self, bucket: Bucket) -> String {
        bucket.store_key(&self.prefix)
    }

    /// The bucket stored under `key`, if it is a bucket key of this prefix
    pub fn bucket_for(&self, key: &str) -> Option<Bucket> {
        Bucket::from_store_key(&self.prefix, key)
    }
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_PREFIX)
    }
}
