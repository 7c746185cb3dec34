use std::time::Duration;

use tokio_util::sync::CancellationToken;

use sluice_api_server::AppState;

use crate::cmd::{close_backend, open_backend};
use crate::config::{ServeArgs, ServerConfig};
use crate::error::ServerError;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("sluice-server starting");

    // --- Load config ---
    let mut config = ServerConfig::load(&args.common)?;
    if let Some(port) = args.port {
        config.api.port = port;
    }
    tracing::info!(
        config = args.common.config.as_deref().unwrap_or("<defaults>"),
        backend = ?config.backend,
        index = %config.ingest.index,
        batch_size = config.ingest.batch_size,
        "loaded config"
    );

    // --- Backend ---
    let backend = open_backend(&config).await?;
    let state = AppState::new(backend, config.ingest.clone(), config.api.upload_dir.clone())?;

    // --- API server ---
    let token = CancellationToken::new();
    let api_config = config.api.clone();
    let api_token = token.clone();
    let mut api_handle = tokio::spawn(async move {
        sluice_api_server::run(&api_config, state, api_token).await
    });

    // --- Wait for Ctrl+C or an early server exit ---
    let early = tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            None
        }
        res = &mut api_handle => Some(res),
    };

    let outcome = match early {
        Some(joined) => {
            tracing::error!("api server stopped unexpectedly");
            joined
        }
        None => {
            tracing::info!("shutting down...");
            token.cancel();
            match tokio::time::timeout(DRAIN_TIMEOUT, &mut api_handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!(timeout = ?DRAIN_TIMEOUT, "in-flight requests did not drain; aborting");
                    api_handle.abort();
                    Ok(Ok(()))
                }
            }
        }
    };

    close_backend(&config);

    match outcome {
        Ok(result) => result?,
        Err(e) => tracing::error!(error = %e, "api task failed"),
    }

    tracing::info!("shutdown complete");
    Ok(())
}
