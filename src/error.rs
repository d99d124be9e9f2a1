use crate::binding::OperationKind;
use crate::client::StoreError;
use crate::settings::SettingsError;

/// An error surfaced by a binding to its host.
///
/// The host only sees the message; the variants exist so that callers within Rust can tell input
/// errors apart from store failures.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The liveness check against the store failed, either while initializing or on demand.
    #[error("{store} binding: error connecting to {store} at {host}: {source}")]
    Connection {
        /// The kind of store, such as `redis`.
        store: &'static str,
        /// The configured address of the store.
        host: String,
        /// Why the store could not be reached.
        #[source]
        source: StoreError,
    },
    /// The request metadata has no usable `key` entry.
    #[error("{store} binding: missing key in request metadata")]
    MissingKey {
        /// The kind of store, such as `redis`.
        store: &'static str,
    },
    /// The operation is not one of the operations the binding declares.
    #[error("invalid operation type: {0}")]
    UnsupportedOperation(OperationKind),
    /// The binding properties could not be turned into connection settings.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// The store client failed. This is passed through without reinterpretation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn connection_message_names_store_and_host() {
        let err = Error::Connection {
            store: "redis",
            host: "localhost:6379".to_owned(),
            source: StoreError::TimedOut,
        };
        assert_eq!(
            err.to_string(),
            "redis binding: error connecting to redis at localhost:6379: operation timed out"
        );
    }

    #[test]
    fn store_errors_are_transparent() {
        let err = Error::from(StoreError::Closed);
        assert_eq!(err.to_string(), StoreError::Closed.to_string());
    }

    #[test]
    fn unsupported_operation_names_the_kind() {
        let err = Error::UnsupportedOperation(OperationKind::List);
        assert_eq!(err.to_string(), "invalid operation type: list");
    }
}
