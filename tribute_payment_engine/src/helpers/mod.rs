use std::{error::Error, future::Future};

use log::warn;

/// Runs a fallible side effect on a background task, logging failures instead of propagating
/// them. Used for notifications and partner bonus calls, which must never delay or roll back a
/// financial mutation.
pub fn spawn_detached<F, E>(context: &'static str, fut: F)
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Error + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            warn!("🔄️ Detached task '{context}' failed: {e}");
        }
    });
}
