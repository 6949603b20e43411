//! Cloud sync commands

use std::sync::Arc;
use std::time::Instant;

use studysync_core::{CloudSyncEngine, PushOutcome, SyncStatus};
use tracing::info;

use super::error::{CommandError, CommandResult};
use super::timer::finish;
use crate::AppContext;

async fn signed_in(ctx: &AppContext) -> CommandResult<Arc<CloudSyncEngine>> {
    ctx.sync_engine().await.ok_or(CommandError::NotSignedIn)
}

/// Start cloud sync for `user_id`
pub async fn sign_in(ctx: &AppContext, user_id: &str) -> CommandResult<()> {
    let start = Instant::now();
    info!(command = "sync::sign_in", user_id, "Signing in");
    let result = ctx.sign_in(user_id).await.map_err(CommandError::from);
    finish("sync::sign_in", start, result)
}

pub async fn sign_out(ctx: &AppContext) -> CommandResult<()> {
    let start = Instant::now();
    let result = ctx.sign_out().await.map_err(CommandError::from);
    finish("sync::sign_out", start, result)
}

/// Pull the user's document, then push local buckets
pub async fn sync_now(ctx: &AppContext) -> CommandResult<PushOutcome> {
    let start = Instant::now();
    let result = match signed_in(ctx).await {
        Ok(engine) => engine.full_sync().await.map_err(CommandError::from),
        Err(err) => Err(err),
    };
    finish("sync::sync_now", start, result)
}

/// Upload queued offline writes as one folded write
pub async fn flush_pending_writes(ctx: &AppContext) -> CommandResult<usize> {
    let start = Instant::now();
    let result = match signed_in(ctx).await {
        Ok(engine) => engine.flush_pending_queue().await.map_err(CommandError::from),
        Err(err) => Err(err),
    };
    finish("sync::flush_pending_writes", start, result)
}

/// Status of the signed-in user's engine, `None` while signed out
pub async fn sync_status(ctx: &AppContext) -> Option<SyncStatus> {
    ctx.sync_engine().await.map(|engine| engine.status())
}

/// Report host connectivity. Going online flushes the pending queue and
/// resubscribes if the realtime subscription was lost.
pub fn set_online(ctx: &AppContext, online: bool) {
    ctx.network.set_online(online);
}
