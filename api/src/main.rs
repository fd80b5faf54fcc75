mod auth;
mod query_payload;
mod query_response;
mod routes;

use std::sync::Arc;

use anyhow::Result;
use rag_agent::{AgentConfig, AgentOrchestrator};
use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment variables and logging
    dotenv::dotenv().ok();
    env_logger::init();

    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to initialize agent: {}", e);
            std::process::exit(1);
        }
    };
    let agent = AgentOrchestrator::from_config(config)?;

    let api_token: Option<Arc<str>> = std::env::var("API_BEARER_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
        .map(Arc::from);
    if api_token.is_none() {
        log::warn!("API_BEARER_TOKEN not set, /query is unauthenticated");
    }

    let app = routes::router(AppState {
        agent: Arc::new(agent),
        api_token,
    });

    let addr = std::env::var("API_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
