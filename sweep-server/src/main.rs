use anyhow::Result;
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sweep_cache::{BackendKind, CacheConfig, RedisConfig};
use sweep_server::{ApiServer, ApiServerConfig};

#[derive(Parser)]
#[command(name = "sweep-server")]
#[command(about = "Wallet Sweep API with a shared Redis cache", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start API server
    Serve {
        /// Host to bind to
        #[arg(long, env = "HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, env = "PORT", default_value = "8080")]
        port: u16,

        /// Cache backend: redis or memory
        #[arg(long, env = "CACHE_BACKEND", default_value = "redis")]
        cache_backend: BackendKind,

        /// Redis connection URL
        #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
        redis_url: String,

        /// Timeout for the initial Redis connection, in milliseconds
        #[arg(long, env = "REDIS_CONNECT_TIMEOUT_MS", default_value = "5000")]
        redis_connect_timeout_ms: u64,

        /// How long to skip Redis after a failed connect, in milliseconds
        #[arg(long, env = "REDIS_RECONNECT_COOLDOWN_MS", default_value = "5000")]
        redis_reconnect_cooldown_ms: u64,

        /// Thirdweb client id for wallet balances
        #[arg(long, env = "THIRDWEB_CLIENT_ID")]
        thirdweb_client_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "sweep_server=info,sweep_cache=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            cache_backend,
            redis_url,
            redis_connect_timeout_ms,
            redis_reconnect_cooldown_ms,
            thirdweb_client_id,
        } => {
            let config = ApiServerConfig {
                host,
                port,
                cache_backend,
                redis: RedisConfig {
                    url: redis_url,
                    connection_timeout: Duration::from_millis(redis_connect_timeout_ms),
                    reconnect_cooldown: Duration::from_millis(redis_reconnect_cooldown_ms),
                },
                cache: CacheConfig::from_env()?,
                thirdweb_client_id,
                ..Default::default()
            };

            info!("Cache configuration: {:?}", config.cache);
            ApiServer::new(config).start().await?;
        }
    }

    Ok(())
}
