use ai_forex_trader::{
    api,
    config::{BotConfig, SessionParams},
    oracle::GeminiClient,
    status::StatusFile,
    trading_core::TradingSession,
    AppState, Supervisor,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the trading loop headless until Ctrl-C
    Run(CommonArgs),
    /// Serve the dashboard API; the loop is started and stopped over HTTP
    Serve {
        #[command(flatten)]
        common: CommonArgs,

        /// Port to run the web server on
        #[arg(short, long, env = "PORT", default_value = "3000")]
        port: u16,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Bot configuration file
    #[arg(short, long, env = "BOT_CONFIG", default_value = "bot-config.json")]
    config: PathBuf,

    /// Status snapshot file
    #[arg(short, long, env = "BOT_STATUS", default_value = "bot-status.json")]
    status: PathBuf,

    /// Seconds between cycles
    #[arg(short, long, default_value = "10")]
    interval_secs: u64,
}

impl CommonArgs {
    fn session_params(&self) -> SessionParams {
        SessionParams::default().with_interval(Duration::from_secs(self.interval_secs.max(1)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ai_forex_trader=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run_headless(args).await,
        Command::Serve { common, port } => serve(common, port).await,
    }
}

async fn run_headless(args: CommonArgs) -> Result<()> {
    let params = args.session_params();
    let config = BotConfig::load(&args.config)?;
    let client = GeminiClient::from_config(&config, params.advisory_timeout)
        .context("Cannot start trading bot")?;

    info!("Config: {}", args.config.display());
    info!("Status: {}", args.status.display());
    info!("Cycle interval: {:?}", params.cycle_interval);

    let status = StatusFile::new(&args.status);
    let session = TradingSession::new(&config, params, Arc::new(client), status.clone());

    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(session.run(stop_rx));

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, stopping after the current cycle...");
    let _ = stop_tx.send(true);

    if let Err(e) = handle.await {
        error!("Trading task failed: {}", e);
    }
    if let Err(e) = status.mark_stopped() {
        warn!("Failed to save status: {:#}", e);
    }

    Ok(())
}

async fn serve(args: CommonArgs, port: u16) -> Result<()> {
    let params = args.session_params();
    let initial_balance = params.initial_balance;
    let status = StatusFile::new(&args.status);

    let supervisor = Supervisor::with_gemini(params, &args.config, status);
    supervisor.reset_stale_status();
    let state = Arc::new(AppState::new(supervisor, initial_balance));
    let app = api::router(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down...");
        })
        .await?;

    state.supervisor.lock().await.stop().await?;
    Ok(())
}
