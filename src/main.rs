//! A command-line host for the redis binding.
//!
//! Each invocation initializes the binding, performs one operation, and closes the binding. For
//! usage, run `cargo run --features binary -- --help`.

mod cli;

use crate::cli::{Args, Command};
use clap::Parser as _;
use kvbind::{Context, InvokeRequest, Metadata, OperationKind, OutputBinding, RedisBinding};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::fs;
use tokio::io::{self, AsyncReadExt as _, AsyncWriteExt as _};
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(args))
}

/// Initialize the binding, perform the requested operation, and close the binding.
///
/// # stdout
///
/// For `get`, the value is written to stdout unmodified. Nothing is written for other operations.
async fn run(
    Args {
        host,
        properties,
        timeout,
        command,
    }: Args,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut metadata = Metadata::new([("redisHost", host)]).with_name("kvbind");
    metadata.properties.extend(properties);

    let ctx = match timeout {
        Some(timeout) => Context::background().with_timeout(timeout),
        None => Context::background(),
    };

    let mut binding = RedisBinding::init(metadata).await?;
    let result = match command {
        Command::Ping => binding.ping().await.map(|()| None),
        Command::Get { key } => {
            let request = InvokeRequest::new(OperationKind::Get).with_key(key);
            binding.invoke(&ctx, request).await
        }
        Command::Create { key, file, value } => {
            let data = match (file, value) {
                (Some(file), _) => read_file_or_stdin(file).await?,
                (None, value) => value.unwrap_or_default().into_bytes(),
            };
            let request = InvokeRequest::new(OperationKind::Create)
                .with_key(key)
                .with_data(data);
            binding.invoke(&ctx, request).await
        }
        Command::Delete { key } => {
            let request = InvokeRequest::new(OperationKind::Delete).with_key(key);
            binding.invoke(&ctx, request).await
        }
    };
    let closed = binding.close().await;

    if let Some(response) = result? {
        let mut stdout = io::stdout();
        stdout.write_all(&response.data).await?;
        stdout.flush().await?;
    }
    closed?;

    Ok(ExitCode::SUCCESS)
}

/// Given a path, read from stdin if the path is "-". Otherwise, read the file at that path.
async fn read_file_or_stdin(file_path: PathBuf) -> io::Result<Vec<u8>> {
    if file_path == PathBuf::from("-") {
        let mut bytes = Vec::new();
        let _num_bytes = io::stdin().read_to_end(&mut bytes).await?;
        Ok(bytes)
    } else {
        Ok(fs::read(file_path).await?)
    }
}
