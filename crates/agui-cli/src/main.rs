use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use agui_cli::{
    cli::Cli,
    config::{CliConfig, LoggingConfig},
    render,
};
use agui_session::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CliConfig::from_file(path),
        None => CliConfig::load(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    cli.apply_overrides(&mut config);

    init_logging(&config.logging);

    let user_id = config.user_id();
    tracing::info!(%user_id, endpoint = %config.client.endpoint, "Starting AG-UI session");

    let session = Arc::new(Session::from_config(config.client_config())?);

    // Ctrl-C aborts the run; whatever was reduced so far is still printed
    let interrupt = session.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, aborting run");
            interrupt.abort();
        }
    });

    let print_events = cli.events;
    session
        .send_user_message_with(cli.prompt(), |event| {
            if print_events {
                println!("{}", render::event_line(event));
            }
        })
        .await;

    let snapshot = session.snapshot();
    tracing::info!(
        events = snapshot.events.len(),
        messages = snapshot.messages.len(),
        "Run finished"
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        if print_events {
            println!();
        }
        print!("{}", render::render_snapshot(&snapshot));
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Logs go to stderr so stdout stays clean for the transcript
    match config.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
