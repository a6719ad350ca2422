//! Optional persistence tier consulted ahead of the network.

use bytes::Bytes;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;

use crate::error::TileError;

/// Asynchronous key/value persistence for fetched tile bodies.
///
/// Implementations back the secondary cache tier; the storage policy itself
/// (eviction, expiry, location) belongs to the implementation.
pub trait TileStore: Send + Sync + 'static {
    /// Gets a stored body.
    fn get(&self, key: &str) -> impl Future<Output = Option<Bytes>> + Send;

    /// Stores a body.
    fn set(&self, key: &str, value: Bytes) -> impl Future<Output = Result<(), TileError>> + Send;
}

impl<T: TileStore> TileStore for Arc<T> {
    fn get(&self, key: &str) -> impl Future<Output = Option<Bytes>> + Send {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Bytes) -> impl Future<Output = Result<(), TileError>> + Send {
        (**self).set(key, value)
    }
}

/// Store that never holds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpStore;

impl TileStore for NoOpStore {
    async fn get(&self, _key: &str) -> Option<Bytes> {
        None
    }

    async fn set(&self, _key: &str, _value: Bytes) -> Result<(), TileError> {
        Ok(())
    }
}

/// In-process store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Bytes>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TileStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<Bytes> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), TileError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}
