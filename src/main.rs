//! Drone Delivery back office: HTTP API over the order, monitoring and reporting services.

use anyhow::Result;
use std::sync::Arc;

use drone_delivery::backoffice::BackOffice;
use drone_delivery::transport::{NatsTransport, Transport};
use drone_delivery::{api, logging, Config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();
    let config = Config::from_env()?;

    let transport: Arc<dyn Transport> = Arc::new(NatsTransport::new(&config.nats_url));
    let office = BackOffice::start(transport.clone(), &config).await?;
    let app = api::router(Arc::new(office));

    tracing::info!("🚀 Drone delivery back office listening on 0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port)).await?;
    axum::serve(listener, app).with_graceful_shutdown(async { tokio::signal::ctrl_c().await.ok(); }).await?;

    transport.close().await?;
    Ok(())
}
