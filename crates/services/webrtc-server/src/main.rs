//! FramePipe server binary entry point
//!
//! Starts the signaling and media-transform server: browsers POST an SDP
//! offer to `/offer`, get an answer back, and receive their own video
//! re-streamed with the selected per-frame transform applied.
//!
//! # Usage
//!
//! ```bash
//! # Default bind (0.0.0.0:8080) and Google STUN
//! cargo run -p framepipe-server
//!
//! # Custom bind and STUN servers
//! cargo run -p framepipe-server -- \
//!   --bind 127.0.0.1:9090 \
//!   --stun-servers stun:stun.l.google.com:19302
//! ```

mod http;

use clap::Parser;
use framepipe_webrtc::{Negotiator, SessionRegistry, WebRtcConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// FramePipe signaling and media-transform server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// HTTP bind address for the signaling endpoints
    #[arg(long, default_value = "0.0.0.0:8080", env = "FRAMEPIPE_BIND")]
    bind: String,

    /// STUN servers (comma-separated)
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "stun:stun.l.google.com:19302",
        env = "FRAMEPIPE_STUN_SERVERS"
    )]
    stun_servers: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("framepipe-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> anyhow::Result<()> {
    init_tracing();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        bind = %args.bind,
        stun_servers = ?args.stun_servers,
        "FramePipe server starting"
    );

    let config = WebRtcConfig {
        stun_servers: args.stun_servers,
    };
    config.validate()?;

    let registry = Arc::new(SessionRegistry::new());
    let negotiator = Arc::new(Negotiator::new(Arc::clone(&registry), config));
    let app = http::app(http::AppState {
        registry: Arc::clone(&registry),
        negotiator,
    });

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    info!(bind = %args.bind, "signaling server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Shutdown barrier: the process must not exit while any session still
    // holds transport resources.
    registry.close_all().await;
    info!("all sessions closed, shutting down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .expect("default env filter is valid");

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
