//! Per-ship packet buffer.
//!
//! Append-only lists keyed by ship name. The ingestion loop is the only
//! writer for a given key; payloads are stored exactly as received.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Buffer backend errors
#[derive(Debug, Error)]
pub enum BufferError {
    /// Command or connection failure reported by Redis
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Append-only store of received payloads.
#[async_trait]
pub trait PacketBuffer: Send + Sync {
    /// Append `payload` to the list stored under `key`.
    async fn append(&self, key: &str, payload: &[u8]) -> Result<(), BufferError>;

    /// Number of payloads stored under `key`.
    async fn len(&self, key: &str) -> Result<usize, BufferError>;

    /// `(key, count)` for every key, sorted by key.
    async fn summary(&self) -> Result<Vec<(String, usize)>, BufferError>;

    /// Round trip to the backend.
    async fn ping(&self) -> Result<(), BufferError>;
}

/// Redis-backed buffer: one list per ship, appended with `RPUSH`.
#[derive(Clone)]
pub struct RedisBuffer {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisBuffer {
    /// Open a multiplexed connection to `url` (e.g. `redis://redis:6379/1`).
    pub async fn connect(url: &str) -> Result<Self, BufferError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        tracing::info!("Connected to packet buffer");
        Ok(Self { conn })
    }
}

#[async_trait]
impl PacketBuffer for RedisBuffer {
    async fn append(&self, key: &str, payload: &[u8]) -> Result<(), BufferError> {
        let mut conn = self.conn.clone();
        redis::cmd("RPUSH")
            .arg(key)
            .arg(payload)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn len(&self, key: &str) -> Result<usize, BufferError> {
        let mut conn = self.conn.clone();
        Ok(redis::cmd("LLEN")
            .arg(key)
            .query_async::<_, usize>(&mut conn)
            .await?)
    }

    async fn summary(&self) -> Result<Vec<(String, usize)>, BufferError> {
        let mut conn = self.conn.clone();
        let mut keys: Vec<String> = redis::cmd("KEYS")
            .arg("*")
            .query_async(&mut conn)
            .await?;
        keys.sort();

        let mut counts = Vec::with_capacity(keys.len());
        for key in keys {
            let count = self.len(&key).await?;
            counts.push((key, count));
        }
        Ok(counts)
    }

    async fn ping(&self) -> Result<(), BufferError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}

/// In-process buffer for tests and local runs without Redis.
#[derive(Debug, Default)]
pub struct MemoryBuffer {
    lists: RwLock<HashMap<String, Vec<Bytes>>>,
}

impl MemoryBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything stored under `key`, in append order.
    pub async fn entries(&self, key: &str) -> Vec<Bytes> {
        self.lists
            .read()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl PacketBuffer for MemoryBuffer {
    async fn append(&self, key: &str, payload: &[u8]) -> Result<(), BufferError> {
        self.lists
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .push(Bytes::copy_from_slice(payload));
        Ok(())
    }

    async fn len(&self, key: &str) -> Result<usize, BufferError> {
        Ok(self.lists.read().await.get(key).map_or(0, Vec::len))
    }

    async fn summary(&self) -> Result<Vec<(String, usize)>, BufferError> {
        let mut counts: Vec<(String, usize)> = self
            .lists
            .read()
            .await
            .iter()
            .map(|(key, values)| (key.clone(), values.len()))
            .collect();
        counts.sort();
        Ok(counts)
    }

    async fn ping(&self) -> Result<(), BufferError> {
        Ok(())
    }
}
