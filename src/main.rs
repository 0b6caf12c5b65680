//! WordPress Fingerprint server - fingerprint WordPress sites over HTTP

use clap::Parser;
use std::net::SocketAddr;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wordpress_fingerprint::{
    AppState, Config, Error, RetryConfig, ScanConfig, Scanner, Summarizer, SummaryConfig,
    config::{DEFAULT_CORE_BASELINE, DEFAULT_LLM_MODEL, DEFAULT_LLM_URL, DEFAULT_REGISTRY_URL},
    router,
};

/// WordPress fingerprinting service - detects versions, plugins, and themes
#[derive(Parser, Debug)]
#[command(name = "wordpress-fingerprint")]
#[command(version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "WPF_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Allow scanning private/internal IP addresses (localhost, 192.168.x.x, etc.)
    #[arg(long, env = "WPF_ALLOW_PRIVATE")]
    allow_private: bool,

    /// Plugin/theme registry base URL
    #[arg(long, env = "WPF_REGISTRY_URL", default_value = DEFAULT_REGISTRY_URL)]
    registry_url: String,

    /// WordPress version considered current
    #[arg(long, env = "WPF_CORE_BASELINE", default_value = DEFAULT_CORE_BASELINE)]
    core_baseline: String,

    /// Maximum in-flight probe requests per phase
    #[arg(long, env = "WPF_PROBE_CONCURRENCY", default_value_t = 8)]
    probe_concurrency: usize,

    /// API key for the language-model summary
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Chat completions endpoint
    #[arg(long, env = "WPF_LLM_URL", default_value = DEFAULT_LLM_URL)]
    llm_url: String,

    /// Completion model
    #[arg(long, env = "WPF_LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    llm_model: String,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            bind: args.bind,
            scan: ScanConfig {
                allow_private: args.allow_private,
                registry_url: args.registry_url,
                core_baseline: args.core_baseline,
                probe_concurrency: args.probe_concurrency,
                ..ScanConfig::default()
            },
            summary: SummaryConfig {
                api_url: args.llm_url,
                api_key: args.api_key,
                model: args.llm_model,
                retry: RetryConfig::default(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from(Args::parse());

    match serve(config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config) -> wordpress_fingerprint::Result<()> {
    if config.summary.api_key.is_none() {
        info!("no language-model API key configured; /api/analyze will fail");
    }

    let scanner = Scanner::new(config.scan)?;
    let summarizer = Summarizer::new(config.summary)?;
    let app = router(AppState::new(scanner, summarizer));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(Error::Server)?;
    info!(addr = %config.bind, "listening");

    axum::serve(listener, app).await.map_err(Error::Server)
}
