use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use watchbot_core::client::{GeminiClient, TextGenerator};
use watchbot_core::config::{get_default_config_file, WatchbotConfig};
use watchbot_server::coordinator::Coordinator;
use watchbot_server::http_server::{self, AppState};
use watchbot_server::preview_client::{FirecrawlClient, PreviewFetcher};
use watchbot_server::search_client::{SearchApiProvider, WebSearchClient};

#[derive(Parser, Debug)]
#[command(
    name = "watchbot-daemon",
    about = "Grounded Apple Watch chat assistant over HTTP",
    version
)]
struct Args {
    /// Path to config file (defaults to ~/.config/watchbot/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP server address
    #[arg(long, env = "WATCHBOT_HTTP_ADDR")]
    http_addr: Option<String>,

    /// Gemini model to use
    #[arg(short = 'o', long)]
    model: Option<String>,

    /// Number of organic search results offered to the model
    #[arg(long)]
    search_results: Option<usize>,

    /// System prompt override
    #[arg(short, long)]
    system_prompt: Option<String>,

    /// Development only: skip TLS certificate verification on outbound calls
    #[arg(long)]
    insecure_skip_tls_verify: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "WATCHBOT_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn load_config(args: &Args) -> Result<WatchbotConfig> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => get_default_config_file("watchbot").context("Failed to locate config file")?,
    };

    let file_config = WatchbotConfig::load_from_file(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    if path.exists() {
        info!("Loaded configuration from {}", path.display());
    }

    let mut cli_config = WatchbotConfig::default();
    cli_config.server.http_addr = args.http_addr.clone();
    cli_config.gemini.model_name = args.model.clone();
    cli_config.search.results_count = args.search_results;
    if args.insecure_skip_tls_verify {
        cli_config.server.insecure_skip_tls_verify = Some(true);
    }

    Ok(file_config
        .merge(&WatchbotConfig::from_env())
        .merge(&cli_config))
}

fn build_coordinator(config: &WatchbotConfig) -> Result<Coordinator> {
    let gemini_http = config
        .server
        .http_client(config.gemini.timeout())
        .context("Failed to build generation HTTP client")?;
    let generator: Option<Arc<dyn TextGenerator>> =
        match GeminiClient::new(&config.gemini, gemini_http) {
            Ok(client) => {
                info!(model = client.model_name(), "Initialized Gemini client");
                Some(Arc::new(client) as Arc<dyn TextGenerator>)
            }
            Err(e) => {
                error!(error = %e, "Gemini client unavailable; chat requests will fail");
                None
            }
        };

    let search_http = config
        .server
        .http_client(config.search.timeout())
        .context("Failed to build search HTTP client")?;
    let search = match SearchApiProvider::new(&config.search, search_http) {
        Ok(provider) => WebSearchClient::new(Arc::new(provider), config.search.results_count()),
        Err(e) => {
            warn!(error = %e, "Web search disabled");
            WebSearchClient::disabled()
        }
    };

    let preview_http = config
        .server
        .http_client(config.preview.timeout())
        .context("Failed to build preview HTTP client")?;
    let previews = match FirecrawlClient::new(&config.preview, preview_http) {
        Ok(client) => PreviewFetcher::new(Arc::new(client)),
        Err(e) => {
            warn!(error = %e, "Citation preview images disabled");
            PreviewFetcher::disabled()
        }
    };

    Ok(Coordinator::new(generator, search, previews))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .init();

    info!("Starting watchbot daemon");

    let config = load_config(&args)?;
    let missing = config.missing_credentials();
    if !missing.is_empty() {
        warn!("Missing environment variables: {}", missing.join(", "));
    }

    let mut coordinator = build_coordinator(&config)?;
    if let Some(system_prompt) = args.system_prompt {
        coordinator = coordinator.with_system_prompt(system_prompt);
    }

    let addr: SocketAddr = config
        .server
        .http_addr()
        .parse()
        .with_context(|| format!("Invalid HTTP address {}", config.server.http_addr()))?;

    http_server::run_server(AppState::new(coordinator), addr).await?;

    info!("watchbot daemon shutting down");
    Ok(())
}
