// # tunneld - Tunnel Provisioning Service
//
// Thin integration layer: reads configuration from the environment, sets up
// logging and the runtime, and serves the router from the `tunneld` library.
// All provisioning logic lives in `tunnel-core`.
//
// ## Configuration
//
// ### Control plane
// - `CF_API_TOKEN`: API token (required)
// - `CF_ACCOUNT_ID`: Account owning the tunnels (required)
// - `CF_ZONE_ID`: Zone holding the device records (required)
// - `TUNNELD_API_BASE`: API base URL (default: Cloudflare v4)
//
// ### Provisioning
// - `BASE_HOST`: Base domain for device hostnames (default: nomadconnect.app)
// - `TUNNELD_LOCAL_SERVICE`: Ingress service (default: http://127.0.0.1:8081)
// - `TUNNELD_TUNNEL_DOMAIN`: CNAME target suffix (default: cfargotunnel.com)
// - `TUNNELD_MAC_POLICY`: strip or strict (default: strip)
//
// ### Cache
// - `TUNNELD_CACHE_TYPE`: none, memory or file (default: none)
// - `TUNNELD_CACHE_PATH`: Cache file path (for file cache)
//
// ### Server
// - `TUNNELD_LISTEN_ADDR`: Bind address (default: 0.0.0.0:8787)
// - `TUNNELD_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// Missing required values do not stop the service: `/health` reports them
// and `/provision` answers 500 until they are set.
//
// ## Example
//
// ```bash
// export CF_API_TOKEN=...
// export CF_ACCOUNT_ID=...
// export CF_ZONE_ID=...
// export TUNNELD_CACHE_TYPE=file
// export TUNNELD_CACHE_PATH=/var/lib/tunneld/cache.json
//
// tunneld
// ```

use anyhow::Result;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use tunneld::settings::Settings;
use tunneld::{AppState, app};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum TunneldExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<TunneldExitCode> for ExitCode {
    fn from(code: TunneldExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return TunneldExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return TunneldExitCode::ConfigError.into();
    }

    info!("Starting tunneld");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return TunneldExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let state = match AppState::from_config(&settings.provision).await {
            Ok(state) => state,
            Err(e) => {
                error!("Startup error: {}", e);
                return TunneldExitCode::ConfigError;
            }
        };

        let listener = match tokio::net::TcpListener::bind(settings.listen_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind {}: {}", settings.listen_addr, e);
                return TunneldExitCode::ConfigError;
            }
        };

        match serve(listener, state).await {
            Ok(()) => TunneldExitCode::CleanShutdown,
            Err(e) => {
                error!("Server error: {}", e);
                TunneldExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Serve until a shutdown signal arrives
async fn serve(listener: tokio::net::TcpListener, state: AppState) -> Result<()> {
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            match wait_for_shutdown().await {
                Ok(signal) => info!("Received shutdown signal: {}", signal),
                Err(e) => error!("Shutdown signal error: {}", e),
            }
        })
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
