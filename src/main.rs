use tokio::net::TcpListener;
use tracing::info;
use lyriclens::{
    config::Config,
    api::routes::create_router,
    logging::init_logging,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;
    init_logging();
    config.warn_missing_keys();
    let server_addr = config.server_addr;
    info!("Starting server on {}", server_addr);

    let app_state = AppState::from_config(config).await?;
    let app = create_router(app_state);

    let listener = TcpListener::bind(server_addr).await?;

    info!("Listening on {}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
