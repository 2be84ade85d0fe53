//! Keyed single-worker executor
//!
//! Jobs submitted under the same key run one at a time, in submission order,
//! on a worker task dedicated to that key. Different keys run concurrently.
//! Used to serialise everything that touches one order (transitions and
//! their writes, monitoring callbacks) without a global lock.

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

type Job = BoxFuture<'static, ()>;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("job on `{0}` did not complete")]
    Cancelled(String),
}

pub struct KeyedExecutor<K> {
    name: &'static str,
    workers: Arc<Mutex<HashMap<K, mpsc::UnboundedSender<Job>>>>,
}

impl<K> Clone for KeyedExecutor<K> {
    fn clone(&self) -> Self { Self { name: self.name, workers: self.workers.clone() } }
}

impl<K> KeyedExecutor<K>
where
    K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self { name, workers: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Queues `job` behind every job already submitted for `key`.
    /// Must be called from within a tokio runtime.
    pub fn submit<F>(&self, key: K, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut job: Job = job.boxed();
        let mut workers = self.workers.lock();
        if let Some(tx) = workers.get(&key) {
            match tx.send(job) {
                Ok(()) => return,
                Err(mpsc::error::SendError(returned)) => job = returned,
            }
        }
        let tx = self.spawn_worker(key.clone());
        // a freshly spawned worker holds its receiver, so this send cannot fail
        let _ = tx.send(job);
        workers.insert(key, tx);
    }

    /// Runs `job` in `key`'s queue and waits for its output.
    pub async fn run<F, T>(&self, key: K, job: F) -> Result<T, ExecutorError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let label = key.to_string();
        self.submit(key, async move {
            let _ = tx.send(job.await);
        });
        rx.await.map_err(|_| ExecutorError::Cancelled(label))
    }

    /// Stops accepting work for `key`. Jobs already queued still run.
    pub fn retire(&self, key: &K) -> bool {
        self.workers.lock().remove(key).is_some()
    }

    pub fn active_keys(&self) -> usize {
        self.workers.lock().len()
    }

    fn spawn_worker(&self, key: K) -> mpsc::UnboundedSender<Job> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let name = self.name;
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if AssertUnwindSafe(job).catch_unwind().await.is_err() {
                    tracing::error!(executor = name, key = %key, "Job panicked, worker continues with the next one");
                }
            }
            tracing::trace!(executor = name, key = %key, "Worker retired");
        });
        tx
    }
}

impl<K> fmt::Debug for KeyedExecutor<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedExecutor").field("name", &self.name).field("keys", &self.workers.lock().len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_jobs_for_one_key_run_in_order() {
        let exec = KeyedExecutor::<u64>::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));
        for n in 0..10u64 {
            let seen = seen.clone();
            exec.submit(1, async move {
                // later jobs sleep less; order must still hold
                tokio::time::sleep(Duration::from_millis(10 - n)).await;
                seen.lock().push(n);
            });
        }
        exec.run(1, async {}).await.unwrap();
        assert_eq!(*seen.lock(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_keys_run_independently() {
        let exec = KeyedExecutor::<u64>::new("test");
        let (tx, rx) = oneshot::channel::<()>();
        exec.submit(1, async move { let _ = rx.await; });
        // key 2 is not stuck behind the blocked job on key 1
        assert_eq!(exec.run(2, async { 7 }).await.unwrap(), 7);
        assert_eq!(exec.active_keys(), 2);
        tx.send(()).unwrap();
        exec.run(1, async {}).await.unwrap();
    }

    #[tokio::test]
    async fn test_panicking_job_reports_cancelled_and_worker_survives() {
        let exec = KeyedExecutor::<u64>::new("test");
        let res: Result<(), _> = exec.run(3, async { panic!("boom") }).await;
        assert!(matches!(res, Err(ExecutorError::Cancelled(k)) if k == "3"));
        assert_eq!(exec.run(3, async { "ok" }).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_retire_then_resubmit() {
        let exec = KeyedExecutor::<u64>::new("test");
        exec.run(4, async {}).await.unwrap();
        assert!(exec.retire(&4));
        assert!(!exec.retire(&4));
        assert_eq!(exec.active_keys(), 0);
        assert_eq!(exec.run(4, async { 1 }).await.unwrap(), 1);
    }
}
