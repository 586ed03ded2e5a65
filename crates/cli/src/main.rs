use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wagate")]
#[command(about = "HTTP gateway for a browser-automated messaging session", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the gateway: connect to the session sidecar and serve the HTTP API.
    Gateway {
        /// Config file path (default: WAGATE_CONFIG_PATH or ~/.wagate/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from PORT env, config, or 4000)
        #[arg(long, short)]
        port: Option<u16>,

        /// Webhook receiving inbound messages (default from WEBHOOK_URL env or config)
        #[arg(long, value_name = "URL")]
        webhook_url: Option<String>,

        /// WebSocket URL of the session sidecar (default from SIDECAR_URL env or config)
        #[arg(long, value_name = "URL")]
        sidecar_url: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("wagate {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Gateway {
            config,
            port,
            webhook_url,
            sidecar_url,
        }) => {
            if let Err(e) = run_gateway(config, port, webhook_url, sidecar_url).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_gateway(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
    webhook_url: Option<String>,
    sidecar_url: Option<String>,
) -> anyhow::Result<()> {
    let (config, path) = lib::config::load_config(config_path)?;
    log::debug!("using config {}", path.display());
    let mut config = lib::config::apply_env_overrides(config);
    if let Some(p) = port {
        config.gateway.port = p;
    }
    if let Some(url) = webhook_url.filter(|s| !s.trim().is_empty()) {
        config.webhook.url = Some(url.trim().to_string());
    }
    if let Some(url) = sidecar_url.filter(|s| !s.trim().is_empty()) {
        config.session.sidecar_url = url.trim().to_string();
    }
    log::info!("starting gateway on {}:{}", config.gateway.bind, config.gateway.port);
    lib::gateway::run_gateway(config).await
}
