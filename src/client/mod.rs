//! Store clients: the seam between a binding and the store it talks to.
//!
//! A binding never speaks a wire protocol itself. It holds a [`StoreClient`], which owns
//! connection handling, timeouts and protocol framing, and calls it with the caller's
//! [`Context`].

pub mod memory;
pub mod redis;

use crate::context::Context;
use crate::settings::Settings;
use async_trait::async_trait;
use bytes::Bytes;

pub use self::memory::{MemoryClient, MemoryServer};
pub use self::redis::RedisClient;

/// An error returned by a store client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The redis client reported an error.
    #[error(transparent)]
    Redis(#[from] ::redis::RedisError),
    /// The store could not be reached.
    #[error("cannot connect to {host}: {reason}")]
    Connect {
        /// The address that was dialed.
        host: String,
        /// Why the connection failed.
        reason: String,
    },
    /// The operation did not complete before its deadline.
    #[error("operation timed out")]
    TimedOut,
    /// The context the operation ran under was cancelled.
    #[error("operation cancelled")]
    Cancelled,
    /// The client has been closed.
    #[error("client is closed")]
    Closed,
}

/// A connected client for a key-value store.
///
/// Implementations must be safe to share between tasks: bindings call them concurrently through a
/// shared reference. Any pooling or multiplexing is the client's concern.
#[async_trait]
pub trait StoreClient: Send + Sync + Sized {
    /// The kind of store, used in diagnostics (for example, `redis`).
    const NAME: &'static str;

    /// Connect to the store described by `settings`.
    async fn connect(settings: &Settings) -> Result<Self, StoreError>;

    /// Perform a round trip to confirm the store is reachable.
    async fn ping(&self, ctx: &Context) -> Result<(), StoreError>;

    /// Fetch the value stored at `key`.
    ///
    /// A key with no value yields empty bytes rather than an error; callers that need to tell the
    /// two apart must not store empty values.
    async fn get(&self, ctx: &Context, key: &str) -> Result<Bytes, StoreError>;

    /// Store `value` at `key`, replacing any existing value.
    async fn set(&self, ctx: &Context, key: &str, value: Bytes) -> Result<(), StoreError>;

    /// Remove `key`. Removing a key that does not exist is not an error.
    async fn delete(&self, ctx: &Context, key: &str) -> Result<(), StoreError>;

    /// Release the connection. Every later call fails with [`StoreError::Closed`].
    async fn close(&mut self) -> Result<(), StoreError>;
}
