use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::error::AppError;

/// Published when a key's time-to-live elapses. Carries the entry's final
/// value: by the time a subscriber sees the event the key itself is gone, so
/// there is nothing left to GET.
#[derive(Debug, Clone)]
pub struct ExpiredKey {
    pub key: String,
    pub value: String,
}

/// Boundary to a TTL-capable key/value store: SET-with-TTL, GET, DEL, TTL,
/// plus a subscription channel for key-expiration events.
#[async_trait]
pub trait TtlStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError>;
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn del(&self, key: &str) -> Result<(), AppError>;
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, AppError>;
    fn subscribe(&self) -> broadcast::Receiver<ExpiredKey>;
}

struct Entry {
    value: String,
    deadline: Instant,
    generation: u64,
}

/// In-process implementation. Every SET arms a timer task tagged with the
/// entry's generation; overwriting a key bumps the generation, so a
/// superseded timer wakes up to a stale entry and removes nothing. Explicit
/// deletion publishes no event — only true expiry does.
pub struct InMemoryTtlStore {
    entries: Arc<DashMap<String, Entry>>,
    expired_tx: broadcast::Sender<ExpiredKey>,
    generation: AtomicU64,
}

impl InMemoryTtlStore {
    pub fn new(event_buffer_size: usize) -> Self {
        let (expired_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            entries: Arc::new(DashMap::new()),
            expired_tx,
            generation: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl TtlStore for InMemoryTtlStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError> {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + ttl;

        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                deadline,
                generation,
            },
        );

        let entries = Arc::clone(&self.entries);
        let expired_tx = self.expired_tx.clone();
        let key = key.to_string();

        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;

            if let Some((key, entry)) = entries.remove_if(&key, |_, e| e.generation == generation)
            {
                let _ = expired_tx.send(ExpiredKey {
                    key,
                    value: entry.value,
                });
            }
        });

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .entries
            .get(key)
            .filter(|entry| entry.deadline > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn del(&self, key: &str) -> Result<(), AppError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, AppError> {
        Ok(self
            .entries
            .get(key)
            .map(|entry| entry.deadline.saturating_duration_since(Instant::now()))
            .filter(|remaining| !remaining.is_zero()))
    }

    fn subscribe(&self) -> broadcast::Receiver<ExpiredKey> {
        self.expired_tx.subscribe()
    }
}
