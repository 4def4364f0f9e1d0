use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::Result;

/// Returns a token that is cancelled once SIGINT or SIGTERM is received.
///
/// Must be called from within a tokio runtime.
pub fn listen() -> Result<CancellationToken> {
    let token = CancellationToken::new();
    let trigger = token.clone();

    #[cfg(unix)]
    let terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .map_err(|source| crate::error::Error::Runtime {
            context: "failed to install SIGTERM handler",
            source,
        })?;

    tokio::spawn(async move {
        #[cfg(unix)]
        let received = wait_for_signal(terminate).await;
        #[cfg(not(unix))]
        let received = wait_for_signal().await;
        info!(signal = received, "received shutdown signal");
        trigger.cancel();
    });

    Ok(token)
}

#[cfg(unix)]
async fn wait_for_signal(mut terminate: tokio::signal::unix::Signal) -> &'static str {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                warn!(error = %err, "failed to listen for Ctrl+C; waiting for SIGTERM only");
                terminate.recv().await;
                return "SIGTERM";
            }
            "SIGINT"
        }
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    "CTRL_C"
}
