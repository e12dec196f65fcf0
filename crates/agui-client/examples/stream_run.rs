use agui_client::{ClientConfig, RunClient, RunOptions, DEFAULT_ENDPOINT};
use agui_types::{EventKind, Role, WireMessage};
use anyhow::Result;
use std::io::Write;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== AG-UI Streaming Run ===\n");

    let endpoint = std::env::var("AGUI_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Explain quantum computing in 3 sentences.".to_string());

    println!("Endpoint: {}", endpoint);
    println!("Prompt: {}\n", prompt);

    let client = RunClient::new(ClientConfig::new(endpoint))?;
    let messages = vec![WireMessage::new(
        uuid::Uuid::new_v4().to_string(),
        Role::User,
        prompt,
    )];

    let mut stream = client.start(messages, RunOptions::with_state(serde_json::json!({})));

    while let Some(event) = stream.next().await {
        match &event.kind {
            EventKind::TextMessageContent { delta, .. } => {
                print!("{}", delta);
                std::io::stdout().flush()?;
            }
            EventKind::TextMessageEnd { .. } => println!(),
            EventKind::RunError { message, code } => {
                println!(
                    "\n❌ Run error [{}]: {}",
                    code.as_deref().unwrap_or("UNKNOWN"),
                    message.as_deref().unwrap_or_default()
                );
            }
            _ => println!("{} {}", event.category().marker(), event.type_name()),
        }
    }

    println!("\n✅ Run complete");
    Ok(())
}
