//! The contract between a host runtime and its output bindings.
//!
//! Every binding is initialized from [`Metadata`], declares the operations it handles, and is
//! invoked with an [`InvokeRequest`]. The host does not know which store sits behind a binding.

pub mod kv;

use crate::context::Context;
use crate::error::Error;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// The request metadata entry naming the key an operation applies to.
pub const KEY: &str = "key";

/// An operation a host may ask a binding to perform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Store data.
    Create,
    /// Fetch data.
    Get,
    /// Remove data.
    Delete,
    /// Enumerate data.
    List,
    /// Any operation the host defines beyond the common ones.
    Other(String),
}

impl OperationKind {
    /// The name of the operation as the host spells it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "create",
            Self::Get => "get",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "create" => Self::Create,
            "get" => Self::Get,
            "delete" => Self::Delete,
            "list" => Self::List,
            other => Self::Other(other.to_owned()),
        })
    }
}

impl From<&str> for OperationKind {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

/// Configuration handed to a binding when it is initialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// The name the host knows the binding by.
    pub name: String,
    /// Binding-specific properties. Their meaning is defined by the binding's store client.
    pub properties: HashMap<String, String>,
}

impl Metadata {
    /// Metadata with the given properties and no name.
    pub fn new<K, V>(properties: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: String::new(),
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Set the name the host knows the binding by.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A request from the host to a binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    /// What to do.
    pub operation: OperationKind,
    /// Per-request parameters, such as the key to operate on.
    pub metadata: HashMap<String, String>,
    /// The payload. Only meaningful for operations that store data.
    pub data: Bytes,
}

impl InvokeRequest {
    /// A request for `operation` with no metadata and an empty payload.
    #[must_use]
    pub fn new(operation: OperationKind) -> Self {
        Self {
            operation,
            metadata: HashMap::new(),
            data: Bytes::new(),
        }
    }

    /// Set a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _previous = self.metadata.insert(name.into(), value.into());
        self
    }

    /// Set the key the operation applies to.
    #[must_use]
    pub fn with_key(self, key: impl Into<String>) -> Self {
        self.with_metadata(KEY, key)
    }

    /// Set the payload.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// The key the operation applies to, if one was given and it is not empty.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.metadata
            .get(KEY)
            .map(String::as_str)
            .filter(|key| !key.is_empty())
    }
}

/// A binding's reply to an [`InvokeRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeResponse {
    /// The payload.
    pub data: Bytes,
    /// Per-response metadata.
    pub metadata: HashMap<String, String>,
}

impl InvokeResponse {
    /// A response carrying `data` and no metadata.
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            metadata: HashMap::new(),
        }
    }
}

/// A binding that the host invokes to act on an external system.
///
/// Bindings are shared between concurrent invocations, so [`invoke`](Self::invoke) takes `&self`.
/// [`close`](Self::close) takes `&mut self`, which guarantees no invocation is in flight while the
/// binding shuts down.
#[async_trait]
pub trait OutputBinding: Send + Sync + Sized {
    /// Create the binding from its configuration and confirm the external system is reachable.
    async fn init(metadata: Metadata) -> Result<Self, Error>;

    /// The operations this binding handles. The host uses this for routing and validation.
    fn operations(&self) -> Vec<OperationKind>;

    /// Perform `request`. `ctx` bounds the work and is passed through to the external system.
    ///
    /// Returns `Ok(None)` for operations that produce no payload.
    async fn invoke(
        &self,
        ctx: &Context,
        request: InvokeRequest,
    ) -> Result<Option<InvokeResponse>, Error>;

    /// Check that the external system is still reachable.
    async fn ping(&self) -> Result<(), Error>;

    /// Shut the binding down. The binding must not be used afterward.
    async fn close(&mut self) -> Result<(), Error>;
}
