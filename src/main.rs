//! lightway binary.
//!
//! ```text
//! lightway [--config FILE] serve           run the demo API
//! lightway [--config FILE] routes          print the demo route table
//! lightway [--config FILE] fetch URL       one call through HttpClient
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::Method;
use tokio::net::TcpListener;

use lightway::app::build_router;
use lightway::client::{CallContext, HttpClient};
use lightway::config::{load_config, AppConfig};
use lightway::http::HttpServer;
use lightway::lifecycle::{wait_for_signal, Shutdown};
use lightway::observability::{logging, metrics, Logger};
use lightway::resilience::RetryPolicy;

#[derive(Parser)]
#[command(name = "lightway")]
#[command(about = "Backend HTTP building blocks: router, resilient client, auth", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the demo API
    Serve,
    /// Print the registered routes
    Routes,
    /// Send one JSON request and print the response body
    Fetch {
        url: String,

        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// JSON body; `null` when omitted
        #[arg(short, long)]
        data: Option<String>,

        /// Header as `Name: value`, repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Give up after this many seconds, retries included
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    let logger = logging::build(&config.observability);
    logger.install_global()?;

    match cli.command {
        Commands::Serve => serve(config, logger).await?,
        Commands::Routes => build_router(&config, logger)?.print_routes(),
        Commands::Fetch {
            url,
            method,
            data,
            headers,
            timeout,
        } => fetch(&config, logger, FetchArgs { url, method, data, headers, timeout }).await?,
    }
    Ok(())
}

async fn serve(config: AppConfig, logger: Logger) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        bind_address = %config.server.bind_address,
        request_timeout_secs = config.server.request_timeout_secs,
        "lightway v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let router = build_router(&config, logger.clone())?;
    router.print_routes();

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let shutdown = Shutdown::new();
    let stopped = shutdown.signal();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    HttpServer::new(config.server.clone(), router.into_axum())
        .with_logger(logger)
        .run(listener, stopped)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

struct FetchArgs {
    url: String,
    method: String,
    data: Option<String>,
    headers: Vec<String>,
    timeout: Option<u64>,
}

async fn fetch(
    config: &AppConfig,
    logger: Logger,
    args: FetchArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = HttpClient::with_config(&config.http_client)?.with_logger(logger);
    if config.retry.enabled {
        client = client.with_retry(RetryPolicy::from_config(&config.retry));
    }

    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())?;
    let body: serde_json::Value = match &args.data {
        Some(raw) => serde_json::from_str(raw)?,
        None => serde_json::Value::Null,
    };
    let headers: Vec<(String, String)> = args
        .headers
        .iter()
        .filter_map(|h| h.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();

    let ctx = match args.timeout {
        Some(secs) => CallContext::background().with_timeout(Duration::from_secs(secs)),
        None => CallContext::background(),
    };

    match client
        .request_bytes(&ctx, method, &args.url, &body, headers)
        .await
    {
        Ok(bytes) => {
            println!("{}", String::from_utf8_lossy(&bytes));
            Ok(())
        }
        Err(err) => {
            if let Some(body) = err.body() {
                eprintln!("{}", String::from_utf8_lossy(body));
            }
            Err(err.into())
        }
    }
}
