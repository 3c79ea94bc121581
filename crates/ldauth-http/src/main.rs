//! ldauth - HTTP-triggered LDAP authentication bridge
//!
//! An auth_http backend for front-end proxies: credentials and directory
//! parameters arrive in request headers, are verified against an LDAP
//! directory, and the verdict goes back in response headers.

use clap::Parser;
use ldauth_core::LdauthConfig;
use ldauth_http::AuthServer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ldauth")]
#[command(version = ldauth_core::VERSION)]
#[command(about = "HTTP-triggered LDAP authentication bridge", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Bind address
    #[arg(long, env = "LDAUTH_BIND_ADDRESS")]
    bind: Option<String>,

    /// Port to listen on for HTTP auth requests
    #[arg(short, long, env = "LDAUTH_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LDAUTH_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &cli.config {
        LdauthConfig::from_file(config_path)?
    } else {
        LdauthConfig::from_env()
    };

    // Override with CLI args
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    AuthServer::new(config).run().await?;
    Ok(())
}
