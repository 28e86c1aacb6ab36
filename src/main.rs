use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use threshold_recovery_node::api::ApiServer;
use threshold_recovery_node::audit::AuditLog;
use threshold_recovery_node::config;
use threshold_recovery_node::service::RecoveryService;
use threshold_recovery_node::storage::json_store::JsonStore;

// Define command line arguments
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the recovery node
    Run,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Run) | None => {}
    }

    let config = match config::ensure_default_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    // Initialize tracing for logs; RUST_LOG overrides the configured level
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Loaded configuration from {:?}", cli.config);

    let (hmac_secret, master_key) = match (config.hmac_secret_bytes(), config.master_key_bytes()) {
        (Ok(secret), Ok(key)) => (secret, key),
        (Err(e), _) | (_, Err(e)) => {
            error!("Invalid security configuration: {}", e);
            process::exit(1);
        }
    };

    let store = match JsonStore::new(&config.storage.data_dir, hmac_secret) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to open wallet registry: {}", e);
            process::exit(1);
        }
    };

    let audit = Arc::new(AuditLog::new(config.audit_log_path()));
    let service = Arc::new(RecoveryService::new(store, audit, &master_key));

    let bind_address = format!("{}:{}", config.api.bind_address, config.api.port);
    let server = ApiServer::new(service, bind_address);

    info!("Recovery node running. Press Ctrl+C to stop.");
    if let Err(e) = server.start().await {
        error!("Server error: {}", e);
        process::exit(1);
    }
}
