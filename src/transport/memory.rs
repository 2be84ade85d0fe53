//! In-process broker: several [`MemoryTransport`]s attached to one
//! [`MemoryBroker`] see each other's messages, in publish order per topic.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{MessageHandler, Transport, TransportError};

type Subscribers = HashMap<String, Vec<(u64, mpsc::UnboundedSender<Vec<u8>>)>>;

#[derive(Default)]
struct BrokerInner {
    subscribers: RwLock<Subscribers>,
    history: Mutex<Vec<(String, Vec<u8>)>>,
    next_client: AtomicU64,
}

#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

impl MemoryBroker {
    pub fn new() -> Self { Self::default() }

    /// A new, not yet connected, client of this broker.
    pub fn transport(&self) -> MemoryTransport {
        MemoryTransport {
            broker: self.clone(),
            client_id: self.inner.next_client.fetch_add(1, Ordering::Relaxed),
            connected: AtomicBool::new(false),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Every payload published on `topic` so far.
    pub fn published(&self, topic: &str) -> Vec<Vec<u8>> {
        self.inner.history.lock().iter().filter(|(t, _)| t == topic).map(|(_, p)| p.clone()).collect()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner.subscribers.read().get(topic).map_or(0, Vec::len)
    }

    fn deliver(&self, topic: &str, payload: Vec<u8>) {
        self.inner.history.lock().push((topic.to_string(), payload.clone()));
        let mut subscribers = self.inner.subscribers.write();
        if let Some(list) = subscribers.get_mut(topic) {
            list.retain(|(_, tx)| tx.send(payload.clone()).is_ok());
        }
    }

    fn attach(&self, topic: &str, client_id: u64, tx: mpsc::UnboundedSender<Vec<u8>>) {
        let mut subscribers = self.inner.subscribers.write();
        let list = subscribers.entry(topic.to_string()).or_default();
        list.retain(|(id, _)| *id != client_id);
        list.push((client_id, tx));
    }

    fn detach(&self, topic: &str, client_id: u64) {
        let mut subscribers = self.inner.subscribers.write();
        if let Some(list) = subscribers.get_mut(topic) {
            list.retain(|(id, _)| *id != client_id);
            if list.is_empty() { subscribers.remove(topic); }
        }
    }
}

pub struct MemoryTransport {
    broker: MemoryBroker,
    client_id: u64,
    connected: AtomicBool,
    subscriptions: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl MemoryTransport {
    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) { Ok(()) } else { Err(TransportError::NotConnected) }
    }

    fn drop_subscriptions(&self) {
        for (topic, task) in self.subscriptions.lock().drain() {
            self.broker.detach(&topic, self.client_id);
            task.abort();
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        self.ensure_connected()?;
        self.broker.deliver(topic, payload);
        Ok(())
    }

    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), TransportError> {
        self.ensure_connected()?;
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let task = tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                handler(payload);
            }
        });
        self.broker.attach(topic, self.client_id, tx);
        if let Some(previous) = self.subscriptions.lock().insert(topic.to_string(), task) {
            previous.abort();
        }
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
        if let Some(task) = self.subscriptions.lock().remove(topic) {
            self.broker.detach(topic, self.client_id);
            task.abort();
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.drop_subscriptions();
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.drop_subscriptions();
    }
}
