use crate::models::SyncResponse;
use redis::AsyncCommands;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::warn;

const KEY_PREFIX: &str = "pricesync:idem:";
const PENDING: &str = "pending";

/// Outcome of claiming an `Idempotency-Key` before running a sync.
#[derive(Debug)]
pub enum Reservation {
    /// The caller owns the key and must `complete` or `release` it.
    Acquired,
    Replay(SyncResponse),
    /// Another request holds the key and has not finished yet.
    InFlight,
}

enum Slot {
    Pending,
    Done(SyncResponse),
}

pub struct Entry {
    slot: Slot,
    stored_at: Instant,
}

/// Replays the first response stored under an `Idempotency-Key`. Redis is used
/// when `REDIS_URL` is configured; otherwise keys live in process memory.
/// Either way a key expires `ttl` after it was claimed.
#[derive(Clone)]
pub enum IdempotencyStore {
    Redis {
        client: redis::Client,
        ttl_secs: u64,
    },
    Memory {
        entries: Arc<Mutex<HashMap<String, Entry>>>,
        ttl: Duration,
    },
}

impl IdempotencyStore {
    pub fn in_memory(ttl_secs: u64) -> Self {
        Self::Memory {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    pub fn from_url(url: Option<&str>, ttl_secs: u64) -> Self {
        match url.map(redis::Client::open) {
            Some(Ok(client)) => Self::Redis { client, ttl_secs },
            Some(Err(err)) => {
                warn!(
                    target = "pricesync.idempotency",
                    error = %err,
                    "invalid REDIS_URL; keeping idempotency keys in memory"
                );
                Self::in_memory(ttl_secs)
            }
            None => Self::in_memory(ttl_secs),
        }
    }

    /// Claims `key` atomically: exactly one concurrent caller gets `Acquired`.
    pub async fn reserve(&self, key: &str) -> Reservation {
        match self {
            Self::Redis { client, ttl_secs } => redis_reserve(client, key, *ttl_secs).await,
            Self::Memory { entries, ttl } => {
                let mut guard = entries.lock().await;
                let now = Instant::now();
                guard.retain(|_, entry| now.duration_since(entry.stored_at) < *ttl);
                match guard.get(key) {
                    Some(Entry {
                        slot: Slot::Done(response),
                        ..
                    }) => Reservation::Replay(response.clone()),
                    Some(Entry {
                        slot: Slot::Pending,
                        ..
                    }) => Reservation::InFlight,
                    None => {
                        guard.insert(
                            key.to_string(),
                            Entry {
                                slot: Slot::Pending,
                                stored_at: now,
                            },
                        );
                        Reservation::Acquired
                    }
                }
            }
        }
    }

    /// Stores the response for a key obtained through `reserve`. The first
    /// stored response wins.
    pub async fn complete(&self, key: &str, value: &SyncResponse) {
        match self {
            Self::Redis { client, ttl_secs } => redis_set(client, key, value, *ttl_secs).await,
            Self::Memory { entries, .. } => {
                let mut guard = entries.lock().await;
                if let Some(entry) = guard.get_mut(key)
                    && matches!(entry.slot, Slot::Pending)
                {
                    entry.slot = Slot::Done(value.clone());
                }
            }
        }
    }

    /// Drops a reservation whose sync failed so the key can be retried.
    pub async fn release(&self, key: &str) {
        match self {
            Self::Redis { client, .. } => redis_del(client, key).await,
            Self::Memory { entries, .. } => {
                let mut guard = entries.lock().await;
                if matches!(guard.get(key), Some(Entry { slot: Slot::Pending, .. })) {
                    guard.remove(key);
                }
            }
        }
    }
}

async fn redis_reserve(client: &redis::Client, key: &str, ttl_secs: u64) -> Reservation {
    let mut conn = match client.get_multiplexed_async_connection().await {
        Ok(c) => c,
        Err(err) => {
            warn!(
                target = "pricesync.idempotency",
                error = %err,
                "redis unavailable; running sync without idempotency"
            );
            return Reservation::Acquired;
        }
    };
    let redis_key = format!("{KEY_PREFIX}{key}");
    let claimed: Option<String> = redis::cmd("SET")
        .arg(&redis_key)
        .arg(PENDING)
        .arg("NX")
        .arg("EX")
        .arg(ttl_secs)
        .query_async(&mut conn)
        .await
        .unwrap_or(None);
    if claimed.is_some() {
        return Reservation::Acquired;
    }
    let stored: Option<String> = conn.get(&redis_key).await.ok().flatten();
    match stored.as_deref() {
        None => Reservation::Acquired,
        Some(PENDING) => Reservation::InFlight,
        Some(raw) => serde_json::from_str(raw)
            .map(Reservation::Replay)
            .unwrap_or(Reservation::InFlight),
    }
}

async fn redis_set(client: &redis::Client, key: &str, value: &SyncResponse, ttl_secs: u64) {
    if let Ok(mut conn) = client.get_multiplexed_async_connection().await
        && let Ok(json) = serde_json::to_string(value)
    {
        let _: Result<(), _> = conn
            .set_ex(format!("{KEY_PREFIX}{key}"), json, ttl_secs)
            .await;
    }
}

async fn redis_del(client: &redis::Client, key: &str) {
    if let Ok(mut conn) = client.get_multiplexed_async_connection().await {
        let _: Result<(), _> = conn.del(format!("{KEY_PREFIX}{key}")).await;
    }
}
