//! An in-process store.
//!
//! Servers are registered under a host string in a process-wide table, and clients connect to
//! them by that string exactly as they would to a network address. This gives tests, benchmarks
//! and embedders a store with the same lifecycle as a remote one, including one that can go away.

use super::{StoreClient, StoreError};
use crate::context::Context;
use crate::settings::Settings;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError, RwLock};

/// Map of a host string to the server listening on it.
static SERVERS: LazyLock<Mutex<HashMap<String, Arc<Shared>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// State shared between a server and its clients.
#[derive(Debug, Default)]
struct Shared {
    /// The stored values.
    data: RwLock<HashMap<String, Bytes>>,
    /// Set when the server stops. Clients keep their handle but can no longer use it.
    stopped: AtomicBool,
    /// Number of commands handled, including pings.
    commands: AtomicU64,
}

impl Shared {
    /// Account for a command, failing if the server has stopped.
    fn serve(&self, host: &str) -> Result<(), StoreError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(refused(host));
        }
        let _previous = self.commands.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// The error returned when nothing is listening on `host`.
fn refused(host: &str) -> StoreError {
    StoreError::Connect {
        host: host.to_owned(),
        reason: "connection refused".to_owned(),
    }
}

/// An in-process store listening on a host string.
///
/// The server stops when [`MemoryServer::stop`] is called or when it is dropped.
#[must_use]
#[derive(Debug)]
pub struct MemoryServer {
    /// The host string clients connect to.
    host: String,
    /// State shared with connected clients.
    shared: Arc<Shared>,
}

impl MemoryServer {
    /// Start an empty server on `host`, replacing any server already listening there.
    pub fn start(host: impl Into<String>) -> Self {
        let host = host.into();
        let shared = Arc::new(Shared::default());
        let previous = SERVERS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(host.clone(), Arc::clone(&shared));
        if let Some(previous) = previous {
            previous.stopped.store(true, Ordering::Release);
        }
        Self { host, shared }
    }

    /// The host string clients connect to.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Number of commands this server has handled.
    #[inline]
    #[must_use]
    pub fn commands(&self) -> u64 {
        self.shared.commands.load(Ordering::Relaxed)
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no keys are stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop the server. Connected clients fail every subsequent call, and new connections to the
    /// host are refused until another server is started on it.
    pub fn stop(&self) {
        self.shared.stopped.store(true, Ordering::Release);
        let mut servers = SERVERS.lock().unwrap_or_else(PoisonError::into_inner);
        // Only unregister if the host has not since been taken over by another server.
        if servers
            .get(&self.host)
            .is_some_and(|current| Arc::ptr_eq(current, &self.shared))
        {
            let _server = servers.remove(&self.host);
        }
    }
}

impl Drop for MemoryServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A client connected to a [`MemoryServer`].
#[derive(Debug)]
pub struct MemoryClient {
    /// The host the client is connected to.
    host: String,
    /// The server's state. `None` once the client is closed.
    shared: Option<Arc<Shared>>,
}

impl MemoryClient {
    /// The server's state, if the client is open and the server is running.
    fn server(&self) -> Result<&Shared, StoreError> {
        let shared = self.shared.as_deref().ok_or(StoreError::Closed)?;
        shared.serve(&self.host)?;
        Ok(shared)
    }
}

#[async_trait]
impl StoreClient for MemoryClient {
    const NAME: &'static str = "memory";

    async fn connect(settings: &Settings) -> Result<Self, StoreError> {
        let shared = SERVERS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&settings.host)
            .cloned()
            .ok_or_else(|| refused(&settings.host))?;

        Ok(Self {
            host: settings.host.clone(),
            shared: Some(shared),
        })
    }

    async fn ping(&self, ctx: &Context) -> Result<(), StoreError> {
        ctx.run(async { self.server().map(|_| ()) }).await?
    }

    async fn get(&self, ctx: &Context, key: &str) -> Result<Bytes, StoreError> {
        ctx.run(async {
            let data = self
                .server()?
                .data
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            let value = data.get(key).cloned().unwrap_or_default();
            Ok(value)
        })
        .await?
    }

    async fn set(&self, ctx: &Context, key: &str, value: Bytes) -> Result<(), StoreError> {
        ctx.run(async {
            let _previous = self
                .server()?
                .data
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key.to_owned(), value);
            Ok(())
        })
        .await?
    }

    async fn delete(&self, ctx: &Context, key: &str) -> Result<(), StoreError> {
        ctx.run(async {
            let _previous = self
                .server()?
                .data
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(key);
            Ok(())
        })
        .await?
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.shared.take().map(|_| ()).ok_or(StoreError::Closed)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    async fn connect(host: &str) -> Result<MemoryClient, StoreError> {
        MemoryClient::connect(&Settings::for_host(host)).await
    }

    #[tokio::test]
    async fn test_set_get_delete() -> Result<(), Box<dyn std::error::Error>> {
        let server = MemoryServer::start("memory-test-set-get-delete");
        let client = connect(server.host()).await?;
        let ctx = Context::background();

        client.set(&ctx, "key", Bytes::from_static(b"value")).await?;
        assert_eq!(client.get(&ctx, "key").await?, "value");
        assert_eq!(server.len(), 1);

        client.delete(&ctx, "key").await?;
        assert_eq!(client.get(&ctx, "key").await?, "");
        assert!(server.is_empty());

        // Deleting again is not an error.
        client.delete(&ctx, "key").await?;
        assert_eq!(server.commands(), 5);

        Ok(())
    }

    #[tokio::test]
    async fn test_connect_unregistered_host() {
        let result = connect("memory-test-nobody-home").await;
        assert!(matches!(result, Err(StoreError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_stopped_server() -> Result<(), Box<dyn std::error::Error>> {
        let server = MemoryServer::start("memory-test-stopped");
        let client = connect(server.host()).await?;
        let ctx = Context::background();
        client.ping(&ctx).await?;

        server.stop();
        assert!(matches!(
            client.ping(&ctx).await,
            Err(StoreError::Connect { .. })
        ));
        assert!(matches!(
            connect(server.host()).await,
            Err(StoreError::Connect { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_close() -> Result<(), Box<dyn std::error::Error>> {
        let server = MemoryServer::start("memory-test-close");
        let mut client = connect(server.host()).await?;
        let ctx = Context::background();

        client.close().await?;
        assert!(matches!(
            client.get(&ctx, "key").await,
            Err(StoreError::Closed)
        ));
        assert!(matches!(client.close().await, Err(StoreError::Closed)));

        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_context() -> Result<(), Box<dyn std::error::Error>> {
        let server = MemoryServer::start("memory-test-cancelled");
        let client = connect(server.host()).await?;
        let ctx = Context::background();
        ctx.cancel();

        assert!(matches!(
            client.set(&ctx, "key", Bytes::new()).await,
            Err(StoreError::Cancelled)
        ));
        assert!(server.is_empty());
        assert_eq!(server.commands(), 0);

        Ok(())
    }

    #[test]
    fn test_restart_takes_over_host() {
        let first = MemoryServer::start("memory-test-restart");
        let second = MemoryServer::start("memory-test-restart");
        drop(first);

        let registered = SERVERS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get("memory-test-restart")
            .is_some_and(|shared| Arc::ptr_eq(shared, &second.shared));
        assert!(registered);
    }
}
