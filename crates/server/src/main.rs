use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use toolgate_server::{api, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(about = "Token-gated tool invocation gateway", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "toolgate.toml", env = "TOOLGATE_CONFIG")]
    config: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "TOOLGATE_PORT")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1", env = "TOOLGATE_HOST")]
    host: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the gateway (default)
    Serve,
    /// Print a fresh random signing secret for `auth.jwt_secret`
    Keygen,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(Command::Keygen) = args.command {
        println!("{}", toolgate_core::generate_secret());
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toolgate=info,toolgate_server=info,toolgate_mcp=info,tower_http=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting Toolgate");

    // Load configuration
    let config = ServerConfig::load(&args.config)?;
    tracing::debug!(?config, "Loaded configuration");

    // Start API server
    let addr = format!("{}:{}", args.host, args.port);
    tracing::info!("Starting API server on {}", addr);

    api::serve(&addr, config).await?;

    Ok(())
}
