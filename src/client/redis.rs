//! A store client backed by a redis server.

use super::{StoreClient, StoreError};
use crate::context::Context;
use crate::settings::Settings;
use crate::tracing_shim::debug;
use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands as _, RedisResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use url::Url;

/// A client for a single redis node.
///
/// Commands are pipelined over one multiplexed connection, which is cloned for every call. This
/// makes the client cheap to share between concurrent callers.
pub struct RedisClient {
    /// The shared connection. `None` once the client is closed.
    connection: Option<MultiplexedConnection>,
    /// The address the client is connected to.
    host: String,
    /// Upper bound on read commands, if any.
    read_timeout: Option<Duration>,
    /// Upper bound on write commands, if any.
    write_timeout: Option<Duration>,
}

impl fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisClient")
            .field("host", &self.host)
            .field("closed", &self.connection.is_none())
            .finish_non_exhaustive()
    }
}

impl RedisClient {
    /// The address the client is connected to.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// A handle to the shared connection.
    fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        self.connection.clone().ok_or(StoreError::Closed)
    }
}

/// Run a redis command under `ctx`, giving up after `timeout` if one is set.
async fn bounded<T>(
    ctx: &Context,
    timeout: Option<Duration>,
    command: impl Future<Output = RedisResult<T>>,
) -> Result<T, StoreError> {
    let reply = match timeout {
        Some(timeout) => ctx.with_timeout(timeout).run(command).await?,
        None => ctx.run(command).await?,
    };
    Ok(reply?)
}

/// Build a connection URL from settings.
///
/// Credentials are percent-encoded by [`Url`], so they may contain any character.
fn connection_url(settings: &Settings) -> Result<Url, StoreError> {
    let invalid = |reason: &str| StoreError::Connect {
        host: settings.host.clone(),
        reason: reason.to_owned(),
    };

    let scheme = if settings.enable_tls { "rediss" } else { "redis" };
    let mut url = Url::parse(&format!("{scheme}://{}/{}", settings.host, settings.db))
        .map_err(|err| invalid(&err.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("no host in address"));
    }

    if let Some(username) = &settings.username {
        url.set_username(username)
            .map_err(|()| invalid("username cannot be set on this address"))?;
    }
    if let Some(password) = &settings.password {
        url.set_password(Some(password))
            .map_err(|()| invalid("password cannot be set on this address"))?;
    }

    Ok(url)
}

#[async_trait]
impl StoreClient for RedisClient {
    const NAME: &'static str = "redis";

    async fn connect(settings: &Settings) -> Result<Self, StoreError> {
        let url = connection_url(settings)?;
        let client = ::redis::Client::open(url.as_str())?;

        debug!(host = %settings.host, db = settings.db, "connecting to redis");
        let dial = client.get_multiplexed_async_connection();
        let connection = match settings.dial_timeout {
            Some(limit) => tokio::time::timeout(limit, dial)
                .await
                .map_err(|_| StoreError::Connect {
                    host: settings.host.clone(),
                    reason: format!("no connection within {limit:?}"),
                })??,
            None => dial.await?,
        };

        Ok(Self {
            connection: Some(connection),
            host: settings.host.clone(),
            read_timeout: settings.read_timeout,
            write_timeout: settings.write_timeout,
        })
    }

    async fn ping(&self, ctx: &Context) -> Result<(), StoreError> {
        let mut connection = self.connection()?;
        let command = ::redis::cmd("PING");
        let _pong: String =
            bounded(ctx, self.read_timeout, command.query_async(&mut connection)).await?;
        Ok(())
    }

    async fn get(&self, ctx: &Context, key: &str) -> Result<Bytes, StoreError> {
        let mut connection = self.connection()?;
        let value: Option<Vec<u8>> =
            bounded(ctx, self.read_timeout, connection.get(key)).await?;
        // A missing key is a nil reply, which is passed through as an empty value.
        Ok(value.map(Bytes::from).unwrap_or_default())
    }

    async fn set(&self, ctx: &Context, key: &str, value: Bytes) -> Result<(), StoreError> {
        let mut connection = self.connection()?;
        let () = bounded(ctx, self.write_timeout, connection.set(key, &value[..])).await?;
        Ok(())
    }

    async fn delete(&self, ctx: &Context, key: &str) -> Result<(), StoreError> {
        let mut connection = self.connection()?;
        let _removed: i64 = bounded(ctx, self.write_timeout, connection.del(key)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        // The multiplexed connection shuts down once the last handle is dropped.
        match self.connection.take() {
            Some(connection) => {
                drop(connection);
                Ok(())
            }
            None => Err(StoreError::Closed),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_url_plain() -> Result<(), Box<dyn std::error::Error>> {
        let url = connection_url(&Settings::for_host("localhost:6379"))?;
        assert_eq!(url.as_str(), "redis://localhost:6379/0");
        Ok(())
    }

    #[test]
    fn test_url_tls_and_db() -> Result<(), Box<dyn std::error::Error>> {
        let mut settings = Settings::for_host("cache.internal:6380");
        settings.enable_tls = true;
        settings.db = 4;
        let url = connection_url(&settings)?;
        assert_eq!(url.scheme(), "rediss");
        assert_eq!(url.path(), "/4");
        Ok(())
    }

    #[test]
    fn test_url_encodes_credentials() -> Result<(), Box<dyn std::error::Error>> {
        let mut settings = Settings::for_host("localhost:6379");
        settings.username = Some("app".to_owned());
        settings.password = Some("p@ss/word".to_owned());
        let url = connection_url(&settings)?;
        assert_eq!(url.username(), "app");
        assert_eq!(url.password(), Some("p%40ss%2Fword"));
        Ok(())
    }

    #[test]
    fn test_url_password_only() -> Result<(), Box<dyn std::error::Error>> {
        let mut settings = Settings::for_host("localhost:6379");
        settings.password = Some("secret".to_owned());
        let url = connection_url(&settings)?;
        assert_eq!(url.as_str(), "redis://:secret@localhost:6379/0");
        Ok(())
    }

    #[test]
    fn test_url_rejects_missing_host() {
        let result = connection_url(&Settings::for_host(":6379"));
        assert!(matches!(result, Err(StoreError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Nothing listens on port 1; the dial fails without needing a server.
        let mut settings = Settings::for_host("127.0.0.1:1");
        settings.dial_timeout = Some(Duration::from_secs(2));
        let result = RedisClient::connect(&settings).await;
        assert!(matches!(
            result,
            Err(StoreError::Redis(_) | StoreError::Connect { .. })
        ));
    }

    #[tokio::test]
    async fn test_bounded_with_default_timeout() -> Result<(), Box<dyn std::error::Error>> {
        let settings = Settings::from_properties(
            &[("redisHost", "localhost:6379"), ("readTimeout", "0")]
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        )?;
        let reply = bounded(&Context::background(), settings.read_timeout, async {
            RedisResult::Ok(7)
        })
        .await?;
        assert_eq!(reply, 7);
        Ok(())
    }

    #[tokio::test]
    async fn test_bounded_without_timeout() -> Result<(), Box<dyn std::error::Error>> {
        let reply = bounded(&Context::background(), None, async { RedisResult::Ok(7) }).await?;
        assert_eq!(reply, 7);

        let ctx = Context::background();
        ctx.cancel();
        let result = bounded(&ctx, None, async { RedisResult::Ok(7) }).await;
        assert!(matches!(result, Err(StoreError::Cancelled)));
        Ok(())
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result = bounded(
            &Context::background(),
            Some(Duration::from_millis(10)),
            std::future::pending::<RedisResult<()>>(),
        )
        .await;
        assert!(matches!(result, Err(StoreError::TimedOut)));
    }
}
