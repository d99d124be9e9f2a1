//! An output binding that exposes a remote key-value store through a uniform plugin contract.
//!
//! A host runtime talks to every binding through [`OutputBinding`]: it initializes the binding
//! from a property map, asks which operations are supported, invokes operations with a
//! [`Context`] that carries cancellation, and eventually closes the binding. [`KvBinding`]
//! implements that contract for any [`StoreClient`]; [`RedisBinding`] is the variant backed by a
//! redis server.
//!
//! ```no_run
//! use kvbind::{Context, InvokeRequest, Metadata, OperationKind, OutputBinding, RedisBinding};
//!
//! # async fn demo() -> Result<(), kvbind::Error> {
//! let mut binding = RedisBinding::init(Metadata::new([("redisHost", "localhost:6379")])).await?;
//! let ctx = Context::background();
//!
//! let request = InvokeRequest::new(OperationKind::Create)
//!     .with_key("x")
//!     .with_data("42");
//! binding.invoke(&ctx, request).await?;
//!
//! let response = binding
//!     .invoke(&ctx, InvokeRequest::new(OperationKind::Get).with_key("x"))
//!     .await?;
//! assert_eq!(response.map(|r| r.data), Some("42".into()));
//!
//! binding.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod client;
pub mod context;
mod error;
pub mod settings;
mod tracing_shim;

pub use crate::binding::kv::{KvBinding, MemoryBinding, RedisBinding};
pub use crate::binding::{InvokeRequest, InvokeResponse, Metadata, OperationKind, OutputBinding};
pub use crate::client::{StoreClient, StoreError};
pub use crate::context::Context;
pub use crate::error::Error;
pub use crate::settings::{Settings, SettingsError};
