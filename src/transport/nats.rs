//! NATS adapter. Subjects are the protocol topics verbatim.

use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::{MessageHandler, Transport, TransportError};

pub struct NatsTransport {
    url: String,
    client: RwLock<Option<Client>>,
    subscriptions: parking_lot::Mutex<HashMap<String, JoinHandle<()>>>,
}

impl NatsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), client: RwLock::new(None), subscriptions: parking_lot::Mutex::new(HashMap::new()) }
    }

    async fn client(&self) -> Result<Client, TransportError> {
        self.client.read().await.clone().ok_or(TransportError::NotConnected)
    }

    fn abort_all(&self) {
        for (_, task) in self.subscriptions.lock().drain() {
            task.abort();
        }
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let mut client = self.client.write().await;
        if client.is_some() { return Ok(()); }
        // the client reconnects and resubscribes on its own; missed messages are not replayed
        let connected = ConnectOptions::new()
            .event_callback(|event| async move { tracing::info!(event = ?event, "NATS connection event") })
            .connect(self.url.as_str())
            .await
            .map_err(|e| TransportError::Broker(e.to_string()))?;
        tracing::info!(url = %self.url, "Connected to NATS");
        *client = Some(connected);
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let client = self.client().await?;
        tracing::trace!(topic = %topic, payload_size = payload.len(), "Publishing message");
        client.publish(topic.to_string(), payload.into()).await.map_err(|e| TransportError::Broker(e.to_string()))
    }

    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), TransportError> {
        let client = self.client().await?;
        let mut subscriber = client.subscribe(topic.to_string()).await.map_err(|e| TransportError::Broker(e.to_string()))?;
        let task = tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                handler(message.payload.to_vec());
            }
        });
        if let Some(previous) = self.subscriptions.lock().insert(topic.to_string(), task) {
            previous.abort();
        }
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
        // dropping the subscriber with the aborted task unsubscribes at the broker
        if let Some(task) = self.subscriptions.lock().remove(topic) {
            task.abort();
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.abort_all();
        if let Some(client) = self.client.write().await.take() {
            client.flush().await.map_err(|e| TransportError::Broker(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for NatsTransport {
    fn drop(&mut self) {
        self.abort_all();
    }
}
