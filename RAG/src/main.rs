// Command-line front end: a read-eval-print loop over the agent.

use anyhow::Result;
use rag_agent::{AgentConfig, AgentOrchestrator};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            eprintln!("Failed to start agent: {}", e);
            std::process::exit(1);
        }
    };

    let agent = AgentOrchestrator::from_config(config)?;

    println!("Hello! Ask me anything about the team (type 'quit' to exit).");

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        stdout.write_all(b"You: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let input = line.trim();
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            break;
        }
        if input.is_empty() {
            continue;
        }

        let response = agent.handle(input).await;
        println!("Agent: {}", response.text);
    }

    println!("Goodbye!");
    Ok(())
}
