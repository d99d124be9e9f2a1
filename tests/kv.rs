mod helpers;

use crate::helpers::{create, delete, get, metadata};
use anyhow::Result;
use bytes::Bytes;
use kvbind::client::MemoryServer;
use kvbind::{
    Context, Error, InvokeRequest, MemoryBinding, OperationKind, OutputBinding, StoreError,
};
use std::sync::Arc;

#[tokio::test]
async fn test_scenario() -> Result<()> {
    let server = MemoryServer::start("localhost:6379");
    let mut binding = MemoryBinding::init(metadata(server.host())).await?;
    binding.ping().await?;

    create(&binding, "x", "42").await?;
    assert_eq!(get(&binding, "x").await?, "42");
    delete(&binding, "x").await?;
    assert!(server.is_empty());

    binding.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_create_replaces() -> Result<()> {
    let server = MemoryServer::start("kv-it-create-replaces");
    let binding = MemoryBinding::init(metadata(server.host())).await?;

    create(&binding, "key", "first").await?;
    create(&binding, "key", "second").await?;
    assert_eq!(get(&binding, "key").await?, "second");
    assert_eq!(server.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_get_after_delete_is_empty() -> Result<()> {
    let server = MemoryServer::start("kv-it-get-after-delete");
    let binding = MemoryBinding::init(metadata(server.host())).await?;

    create(&binding, "key", "value").await?;
    delete(&binding, "key").await?;
    assert_eq!(get(&binding, "key").await?, Bytes::new());

    // A key that was never set looks the same.
    assert_eq!(get(&binding, "never-set").await?, Bytes::new());

    Ok(())
}

#[tokio::test]
async fn test_binary_payload() -> Result<()> {
    let server = MemoryServer::start("kv-it-binary");
    let binding = MemoryBinding::init(metadata(server.host())).await?;
    let payload = Bytes::from_static(&[0, 159, 146, 150, 255]);

    binding
        .invoke(
            &Context::background(),
            InvokeRequest::new(OperationKind::Create)
                .with_key("blob")
                .with_data(payload.clone()),
        )
        .await?;
    assert_eq!(get(&binding, "blob").await?, payload);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates() -> Result<()> {
    let server = MemoryServer::start("kv-it-concurrent");
    let binding = Arc::new(MemoryBinding::init(metadata(server.host())).await?);

    let tasks = (0..64)
        .map(|i| {
            let binding = Arc::clone(&binding);
            tokio::spawn(async move {
                create(&*binding, &format!("key_{i}"), &format!("value_{i}")).await
            })
        })
        .collect::<Vec<_>>();
    for task in futures::future::join_all(tasks).await {
        task??;
    }

    assert_eq!(server.len(), 64);
    for i in 0..64 {
        assert_eq!(get(&*binding, &format!("key_{i}")).await?, format!("value_{i}"));
    }

    Ok(())
}

#[tokio::test]
async fn test_store_going_away() -> Result<()> {
    let server = MemoryServer::start("kv-it-going-away");
    let binding = MemoryBinding::init(metadata(server.host())).await?;
    server.stop();

    assert!(matches!(
        binding.ping().await,
        Err(Error::Connection { .. })
    ));
    // Invocations surface the store's own error rather than a connection error.
    let result = get(&binding, "key").await;
    let err = result.err().and_then(|err| err.downcast::<Error>().ok());
    assert!(matches!(
        err,
        Some(Error::Store(StoreError::Connect { .. }))
    ));

    Ok(())
}

#[tokio::test]
async fn test_deadline() -> Result<()> {
    let server = MemoryServer::start("kv-it-deadline");
    let binding = MemoryBinding::init(metadata(server.host())).await?;
    let ctx = Context::background().with_timeout(std::time::Duration::ZERO);
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let result = binding
        .invoke(&ctx, InvokeRequest::new(OperationKind::Get).with_key("key"))
        .await;
    assert!(matches!(result, Err(Error::Store(StoreError::TimedOut))));

    Ok(())
}
