use math_solver_api::{Config, SolverError, SolverServer};

#[tokio::main]
async fn main() -> Result<(), SolverError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .json()
        .init();

    tracing::info!("Starting math solver API server");

    let config = Config::from_env()?;
    let server = SolverServer::new(config).await?;
    server.run().await?;

    Ok(())
}
