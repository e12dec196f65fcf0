use clap::Parser;
use std::path::PathBuf;

use crate::config::CliConfig;

#[derive(Debug, Parser)]
#[command(
    name = "agui",
    about = "Send a prompt to an AG-UI agent endpoint and follow the run",
    version
)]
pub struct Cli {
    #[arg(help = "Prompt sent as the user message", required = true)]
    pub prompt: Vec<String>,

    #[arg(
        long,
        env = "AGUI_ENDPOINT",
        help = "Run endpoint, overrides [client] endpoint"
    )]
    pub endpoint: Option<String>,

    #[arg(long, help = "Whole-run timeout in seconds")]
    pub timeout_secs: Option<u64>,

    #[arg(long, help = "Load configuration from this file instead of config/")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Print every event as it is reduced")]
    pub events: bool,

    #[arg(long, help = "Print the final session snapshot as JSON")]
    pub json: bool,
}

impl Cli {
    pub fn prompt(&self) -> String {
        self.prompt.join(" ")
    }

    /// Command-line flags win over file and environment configuration.
    pub fn apply_overrides(&self, config: &mut CliConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.client.endpoint = endpoint.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.client.timeout_secs = Some(secs);
        }
    }
}
