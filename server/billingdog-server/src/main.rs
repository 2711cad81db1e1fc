use anyhow::{Context, Result};
use billingdog_server::{create_app, AppConfig, BillingDogServer};
use clap::Parser;
use colored::Colorize;
use logger_redacted::{LogFormat, LoggerConfig};
use std::io::IsTerminal;
use std::net::SocketAddr;
use tracing::{info, warn};

const DEFAULT_DIRECTIVES: &str =
    "billingdog_server=info,billing_service=info,rates_service=info,tower_http=info,sqlx=warn";

/// BillingDog HTTP Server
#[derive(Parser, Debug)]
#[command(name = "billingdog-server")]
#[command(about = "Healthcare billing API: bills, insurance claims, invoices and reference rates")]
struct Args {
    /// Server bind address (overrides config)
    #[arg(long, env = "BILLINGDOG_HOST")]
    host: Option<String>,

    /// Server port (overrides config)
    #[arg(short, long, env = "BILLINGDOG_PORT")]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short, long, default_value = "billingdog.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let production = std::env::var("BILLINGDOG_ENV").is_ok_and(|env| env == "production");

    init_tracing(args.verbose, production)?;

    let mut config = AppConfig::load(Some(args.config.as_str()))
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if !production {
        print_startup_banner();
    }
    info!("{}", "Starting BillingDog server".bright_cyan());
    info!("Version: {}", env!("CARGO_PKG_VERSION").bright_white());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid bind address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let server = BillingDogServer::new(config).await?;
    let app = create_app(server);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("{}", format!("BillingDog running on http://{}", addr).bright_green());
    info!("{}", format!("Health check available at: http://{}/health", addr).bright_blue());
    info!(
        "{}",
        format!("OpenAPI document at: http://{}/api-docs/openapi.json", addr).bright_blue()
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

fn init_tracing(verbose: bool, production: bool) -> Result<()> {
    let directives = if verbose {
        DEFAULT_DIRECTIVES.replace("=info", "=debug")
    } else {
        DEFAULT_DIRECTIVES.to_string()
    };

    let use_colors = std::env::var("NO_COLOR").is_err() && std::io::stdout().is_terminal();

    let config = LoggerConfig::default()
        .with_format(if production { LogFormat::Json } else { LogFormat::Pretty })
        .with_default_directives(directives)
        .with_ansi(use_colors);

    logger_redacted::init(&config).context("Failed to initialise logging")
}

fn print_startup_banner() {
    println!("{}", "╔══════════════════════════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║                       🐕 BILLINGDOG                          ║".bright_cyan());
    println!("{}", "║            Healthcare Billing & Insurance Claims             ║".bright_cyan());
    println!("{}", "╚══════════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
