use clap::Parser;
use postplan_core::{PlanPipeline, PostplanConfig};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "postplan.toml")]
    config: String,

    /// Print which upstream services are configured, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match PostplanConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging: RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    let pipeline = match PlanPipeline::from_config(&config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("   Set GEMINI_API_KEY or [generation].api_key in {}", args.config);
            std::process::exit(1);
        }
    };

    if args.check {
        println!("✅ Gemini model: {}", config.generation.model);
        if pipeline.sink_enabled() {
            println!("✅ Google Sheets auto-save: on");
        } else {
            println!("⚠️  Google Sheets auto-save: off");
        }
        return Ok(());
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    postplan_server::http::start_http_server(&config.http_addr(), pipeline, tx.subscribe())
        .await?;

    Ok(())
}
