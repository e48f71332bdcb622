use passgate::core::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("passgate=info,tower_http=info")),
        )
        .init();

    // Load application config from environment variables
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("FATAL ERROR: {}", err);
            std::process::exit(1);
        }
    };

    // Log config status (without revealing secrets)
    tracing::info!("Config loaded: {:?}", config);

    if let Err(err) = passgate::app::serve(config).await {
        tracing::error!("FATAL ERROR: {}", err);
        std::process::exit(1);
    }
}
