#![allow(dead_code)] // not every test binary uses every helper

use anyhow::Result;
use bytes::Bytes;
use kvbind::{Context, InvokeRequest, Metadata, OperationKind, OutputBinding};

/// The redis server used by tests that need a live store.
pub(crate) fn redis_host() -> String {
    std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost:6379".to_owned())
}

pub(crate) fn metadata(host: &str) -> Metadata {
    Metadata::new([("redisHost", host)]).with_name("test")
}

pub(crate) async fn create<B: OutputBinding>(binding: &B, key: &str, value: &str) -> Result<()> {
    let response = binding
        .invoke(
            &Context::background(),
            InvokeRequest::new(OperationKind::Create)
                .with_key(key)
                .with_data(value.to_owned()),
        )
        .await?;
    assert!(response.is_none());
    Ok(())
}

pub(crate) async fn get<B: OutputBinding>(binding: &B, key: &str) -> Result<Bytes> {
    let response = binding
        .invoke(
            &Context::background(),
            InvokeRequest::new(OperationKind::Get).with_key(key),
        )
        .await?;
    Ok(response.map(|response| response.data).unwrap_or_default())
}

pub(crate) async fn delete<B: OutputBinding>(binding: &B, key: &str) -> Result<()> {
    let response = binding
        .invoke(
            &Context::background(),
            InvokeRequest::new(OperationKind::Delete).with_key(key),
        )
        .await?;
    assert!(response.is_none());
    Ok(())
}
