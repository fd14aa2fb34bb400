use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use clap::Parser;

// Error tracing
use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use server::AppState;
use server::handlers::http::{Router, build_api_router};
use shared::config::load_config;

#[derive(Parser, Debug)]
#[command(name = "server", about = "Cookie session server with XSRF protection")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the port from the configuration file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let state = AppState::new(config).context("Failed to initialise session manager")?;

    let bind = state.config.server.addr();
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", bind))?;

    let router: Arc<Router<Incoming>> = Arc::new(build_api_router());

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let router = Arc::clone(&router);
        let state = state.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let router = Arc::clone(&router);
                let state = state.clone();
                async move { router.handle(req, state).await }
            });

            if let Err(err) = http1::Builder::new()
                .timer(TokioTimer::new())
                .serve_connection(io, service)
                .await
            {
                debug!("Error serving connection from {}: {:?}", peer, err);
            }
        });
    }
}
