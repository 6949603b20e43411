//! Read and edit synchronized data buckets

use std::time::Instant;

use serde_json::Value;
use studysync_domain::{Bucket, StudySyncError};

use super::error::{CommandError, CommandResult};
use super::timer::finish;
use crate::AppContext;

/// Current value of `bucket`, `None` if it was never written
pub fn read_bucket(ctx: &AppContext, bucket: Bucket) -> CommandResult<Option<Value>> {
    let raw = ctx.store.get(&ctx.keys.bucket(bucket))?;
    raw.map(|raw| serde_json::from_str(&raw).map_err(StudySyncError::from))
        .transpose()
        .map_err(CommandError::from)
}

/// Replace the value of `bucket`.
///
/// The write is a user edit: a signed-in engine pushes it after the local
/// debounce.
pub fn write_bucket(ctx: &AppContext, bucket: Bucket, value: &Value) -> CommandResult<()> {
    let start = Instant::now();
    let result = serde_json::to_string(value)
        .map_err(StudySyncError::from)
        .and_then(|raw| ctx.store.set(&ctx.keys.bucket(bucket), &raw))
        .map_err(CommandError::from);
    finish("buckets::write_bucket", start, result)
}
