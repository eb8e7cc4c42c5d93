//! Demo host for the Datadog error-reporting middleware.
//!
//! Serves a small streaming application wrapped in the interceptor:
//! - `/`           streams a few chunks
//! - `/fail`       fails after the first chunk
//! - `/fail-early` fails before producing anything

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use clap::Parser;
use futures_util::stream::{self, StreamExt};
use tokio::net::TcpListener;

use ddmiddleware::app::{self, AppBody, AppError, RequestContext, StartResponse};
use ddmiddleware::config::{self, MiddlewareConfig};
use ddmiddleware::http::{shutdown_signal, HttpServer};
use ddmiddleware::observability::{logging, metrics};
use ddmiddleware::Interceptor;

#[derive(Parser)]
#[command(name = "ddmiddleware")]
#[command(about = "Serve a demo application behind the Datadog error-reporting middleware", long_about = None)]
struct Cli {
    /// TOML configuration file. Without one, defaults plus DD_API_KEY / DD_APP_KEY are used.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config: MiddlewareConfig = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::loader::from_env()?,
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("ddmiddleware v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        datadog = ?config.datadog,
        request_timeout_secs = config.listener.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let interceptor = Interceptor::new(app::from_fn(demo_app), &config.datadog)?
        .with_reporting(&config.reporting);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(interceptor, config);
    server.run(listener, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[derive(Debug, thiserror::Error)]
#[error("demo failure requested at {0}")]
struct DemoFailure(String);

async fn demo_app(ctx: RequestContext, start: Arc<dyn StartResponse>) -> Result<AppBody, AppError> {
    let path = ctx.get("PATH_INFO").unwrap_or("/").to_string();
    if path == "/fail-early" {
        return Err(DemoFailure(path).into());
    }

    start.start(
        "200 OK",
        &[("Content-Type".to_string(), "text/plain".to_string())],
    )?;

    let fail_midway = path == "/fail";
    let chunks = stream::iter(0..3u32).then(move |i| {
        let path = path.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if fail_midway && i == 1 {
                return Err(AppError::from(DemoFailure(path)));
            }
            Ok(Bytes::from(format!("chunk {i}\n")))
        }
    });

    Ok(AppBody::new(chunks).with_close(|| tracing::debug!("Demo body released")))
}
