//! Cloud bundle types
//!
//! A user's data is split into a fixed set of buckets, each stored under its
//! own local key and mirrored verbatim into one remote document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::BUCKET_KEY_SEGMENT;

/// One independently keyed slice of local data synchronized with the cloud
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    Subjects,
    Marks,
    TimerSessions,
    DailyGoal,
    Profile,
    Todos,
    Achievements,
    Notes,
    Resources,
}

crate::impl_domain_status_conversions!(Bucket {
    Subjects => "subjects",
    Marks => "marks",
    TimerSessions => "timer-sessions",
    DailyGoal => "daily-goal",
    Profile => "profile",
    Todos => "todos",
    Achievements => "achievements",
    Notes => "notes",
    Resources => "resources",
});

impl Bucket {
    /// Every synchronized bucket, in wire order
    pub const ALL: [Self; 9] = [
        Self::Subjects,
        Self::Marks,
        Self::TimerSessions,
        Self::DailyGoal,
        Self::Profile,
        Self::Todos,
        Self::Achievements,
        Self::Notes,
        Self::Resources,
    ];

    /// Local store key for this bucket, e.g. `studysync.bucket.daily-goal`
    pub fn store_key(&self, prefix: &str) -> String {
        format!("{prefix}.{BUCKET_KEY_SEGMENT}.{self}")
    }

    /// Inverse of [`Bucket::store_key`]
    pub fn from_store_key(prefix: &str, key: &str) -> Option<Self> {
        key.strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('.'))
            .and_then(|rest| rest.strip_prefix(BUCKET_KEY_SEGMENT))
            .and_then(|rest| rest.strip_prefix('.'))
            .and_then(|name| name.parse().ok())
    }
}

/// Bucket name → verbatim JSON payload
pub type BucketMap = BTreeMap<Bucket, Value>;

/// The remote per-user document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudBundle {
    #[serde(default)]
    pub buckets: BucketMap,
    /// Assigned by the server when the write lands
    #[serde(default)]
    pub last_synced: Option<i64>,
    /// Client wall clock when the bundle was built, used for staleness
    #[serde(default)]
    pub client_updated_at: i64,
    /// Writer process id, used for echo suppression
    #[serde(default)]
    pub session_id: String,
}

impl CloudBundle {
    pub fn new(buckets: BucketMap, client_updated_at: i64, session_id: impl Into<String>) -> Self {
        Self { buckets, last_synced: None, client_updated_at, session_id: session_id.into() }
    }

    /// Merge-upsert: buckets present in `update` replace ours, the rest are
    /// kept; metadata is taken from `update`.
    pub fn merge_from(&mut self, update: &Self) {
        for (bucket, value) in &update.buckets {
            self.buckets.insert(*bucket, value.clone());
        }
        self.client_updated_at = update.client_updated_at;
        self.session_id.clone_from(&update.session_id);
        if update.last_synced.is_some() {
            self.last_synced = update.last_synced;
        }
    }
}

/// PendingWrite - a push that could not reach the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingWrite {
    /// Client wall clock when the write was attempted
    pub at: i64,
    pub data: BucketMap,
}

impl PendingWrite {
    pub fn new(at: i64, data: BucketMap) -> Self {
        Self { at, data }
    }

    /// Fold queued writes into one composite update.
    ///
    /// Entries are applied oldest first (stable for equal timestamps), so a
    /// later entry's value for a bucket replaces an earlier one.
    pub fn fold(entries: &[Self]) -> BucketMap {
        let mut ordered: Vec<&Self> = entries.iter().collect();
        ordered.sort_by_key(|entry| entry.at);

        let mut composite = BucketMap::new();
        for entry in ordered {
            for (bucket, value) in &entry.data {
                composite.insert(*bucket, value.clone());
            }
        }
        composite
    }
}
