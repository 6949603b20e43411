//! StudySync - headless sync process
//!
//! Runs one tab's worth of timer replication and, when `STUDYSYNC_USER` is
//! set, cloud sync for that user until interrupted.

use anyhow::Context as _;
use studysync_common::time::format_clock;
use studysync_lib::utils::logging::init_tracing;
use studysync_lib::AppContext;
use tracing::{debug, info, warn};

/// Environment variable naming the user to sign in at startup
const USER_ENV: &str = "STUDYSYNC_USER";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so it can feed the config overrides
    let dotenv = dotenvy::dotenv();

    let config = studysync_infra::config::load().context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialize logging")?;

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(err) => debug!(error = %err, "No .env loaded"),
    }

    let ctx = AppContext::new_with_config(config).await.context("failed to start StudySync")?;
    info!(instance = %ctx.instance_id, transport = %ctx.transport_kind().await, "StudySync started");

    if let Some(user) = std::env::var(USER_ENV).ok().filter(|user| !user.is_empty()) {
        if let Err(err) = ctx.sign_in(&user).await {
            warn!(user_id = %user, error = %err, "Sign-in failed; continuing with local data");
        }
    }

    let mut display = ctx.timer.display();
    loop {
        tokio::select! {
            changed = display.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *display.borrow_and_update();
                debug!(phase = %current.phase, elapsed = %format_clock(current.elapsed_ms), "Timer");
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    warn!(error = %err, "Failed to listen for shutdown signal");
                }
                break;
            }
        }
    }

    info!("Shutting down");
    ctx.shutdown().await;
    Ok(())
}
