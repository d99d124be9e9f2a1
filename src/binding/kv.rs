//! A binding exposing create, get and delete on a key-value store.

use super::{InvokeRequest, InvokeResponse, Metadata, OperationKind, OutputBinding};
use crate::client::{MemoryClient, RedisClient, StoreClient, StoreError};
use crate::context::Context;
use crate::error::Error;
use crate::settings::Settings;
use crate::tracing_shim::{debug_span, info, warn, Instrument as _};
use async_trait::async_trait;

/// A key-value binding backed by a redis server.
pub type RedisBinding = KvBinding<RedisClient>;

/// A key-value binding backed by an in-process [`MemoryServer`](crate::client::MemoryServer).
pub type MemoryBinding = KvBinding<MemoryClient>;

/// An output binding that maps host operations onto a key-value store.
///
/// | Operation | Store call                  | Response            |
/// |-----------|-----------------------------|---------------------|
/// | `create`  | set the key to the payload  | none                |
/// | `get`     | fetch the key               | the stored bytes    |
/// | `delete`  | remove the key              | none                |
///
/// Every request must carry a non-empty `key` metadata entry. Store errors are returned as-is.
/// Getting a key that does not exist returns an empty payload, not an error: that is how the store
/// client reports it, and the binding does not reinterpret it.
#[derive(Debug)]
pub struct KvBinding<Client> {
    /// The connected store client.
    client: Client,
    /// The settings the client was connected with.
    settings: Settings,
    /// Cancelled when the binding closes.
    lifecycle: Context,
}

impl<Client> KvBinding<Client>
where
    Client: StoreClient,
{
    /// The settings the binding was initialized with.
    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The underlying store client.
    #[inline]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Describe a failed liveness check.
    fn connection_error(&self, source: StoreError) -> Error {
        Error::Connection {
            store: Client::NAME,
            host: self.settings.host.clone(),
            source,
        }
    }

    /// Perform a validated request.
    async fn dispatch(
        &self,
        ctx: &Context,
        key: &str,
        request: &InvokeRequest,
    ) -> Result<Option<InvokeResponse>, Error> {
        match &request.operation {
            OperationKind::Delete => {
                self.client.delete(ctx, key).await?;
                Ok(None)
            }
            OperationKind::Get => {
                let data = self.client.get(ctx, key).await?;
                Ok(Some(InvokeResponse::new(data)))
            }
            OperationKind::Create => {
                self.client.set(ctx, key, request.data.clone()).await?;
                Ok(None)
            }
            other => Err(Error::UnsupportedOperation(other.clone())),
        }
    }
}

#[async_trait]
impl<Client> OutputBinding for KvBinding<Client>
where
    Client: StoreClient,
{
    async fn init(metadata: Metadata) -> Result<Self, Error> {
        let settings = Settings::from_properties(&metadata.properties)?;

        let client = match Client::connect(&settings).await {
            Ok(client) => client,
            Err(source) => {
                let err = Error::Connection {
                    store: Client::NAME,
                    host: settings.host,
                    source,
                };
                warn!(name = %metadata.name, %err, "binding failed to connect");
                return Err(err);
            }
        };

        let binding = Self {
            client,
            settings,
            lifecycle: Context::background(),
        };
        binding.ping().await?;

        info!(
            name = %metadata.name,
            store = Client::NAME,
            host = %binding.settings.host,
            "binding initialized"
        );
        Ok(binding)
    }

    fn operations(&self) -> Vec<OperationKind> {
        vec![
            OperationKind::Create,
            OperationKind::Delete,
            OperationKind::Get,
        ]
    }

    async fn invoke(
        &self,
        ctx: &Context,
        request: InvokeRequest,
    ) -> Result<Option<InvokeResponse>, Error> {
        let Some(key) = request.key() else {
            return Err(Error::MissingKey {
                store: Client::NAME,
            });
        };

        let span = debug_span!("invoke", operation = %request.operation, key);
        self.dispatch(ctx, key, &request).instrument(span).await
    }

    async fn ping(&self) -> Result<(), Error> {
        match self.client.ping(&self.lifecycle).await {
            Ok(()) => Ok(()),
            Err(source) => {
                let err = self.connection_error(source);
                warn!(%err, "liveness check failed");
                Err(err)
            }
        }
    }

    async fn close(&mut self) -> Result<(), Error> {
        self.lifecycle.cancel();
        self.client.close().await?;
        info!(store = Client::NAME, host = %self.settings.host, "binding closed");
        Ok(())
    }
}

impl<Client> Drop for KvBinding<Client> {
    fn drop(&mut self) {
        self.lifecycle.cancel();
    }
}
