//! Drone-resident engine. Activates, serves one delivery, deactivates, and
//! activates again until interrupted.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use drone_delivery::drone::{DroneEngine, EngineState, SimulatedSensors};
use drone_delivery::transport::{NatsTransport, Transport};
use drone_delivery::{logging, Config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_tracing();
    let config = Config::from_env()?;
    tracing::info!(drone_id = %config.drone.drone_id, nats_url = %config.nats_url, "🚁 Drone system starting");

    loop {
        let transport: Arc<dyn Transport> = Arc::new(NatsTransport::new(&config.nats_url));
        let drone = DroneEngine::spawn(config.drone.clone(), transport, Box::new(SimulatedSensors::new()));
        let mut state = drone.subscribe_state();

        tokio::select! {
            _ = state.wait_for(|s| *s == EngineState::Deactivated) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                drone.shutdown();
                drone.join().await;
                return Ok(());
            }
        }
        drone.join().await;
        // a drone that never got past activation is usually a broker outage
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
