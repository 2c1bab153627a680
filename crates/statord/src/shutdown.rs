//! Teardown after the HTTP server stops.

use std::io;

use stator_core::Context;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::error;

/// Cancel the roster and wait for it to deregister, then report how serving
/// ended. Runs the same way whether the server drained or failed.
pub async fn drain(
    ctx: &Context,
    served: io::Result<()>,
    shutdown: &watch::Sender<bool>,
    roster: Option<JoinHandle<()>>,
) -> anyhow::Result<()> {
    if let Err(e) = &served {
        error!(ctx = %ctx, error = %e, "server failed");
    }
    shutdown.send_replace(true);

    if let Some(handle) = roster {
        if let Err(e) = handle.await {
            error!(ctx = %ctx, error = %e, "roster task failed");
        }
    }

    Ok(served?)
}
