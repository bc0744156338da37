use store_server::{Server, ServerState, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (dotenv, work directory, logging)
    let config = setup_environment()?;

    tracing::info!("Store server starting...");

    // 2. Initialize application state
    let state = ServerState::initialize(&config)?;

    // 3. Run the HTTP server until shutdown
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}
