use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use std::future::Future;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use crate::common::errors::{Error, Result};

/// Message reported by the service for a failed SDK call, or the full error
/// chain when the service sent none.
pub fn service_message<E>(err: &E) -> String
where
    E: ProvideErrorMetadata + std::error::Error,
{
    match err.message() {
        Some(message) => message.to_owned(),
        None => DisplayErrorContext(err).to_string(),
    }
}

/// Installs the fmt subscriber shared by the binaries. Progress goes to
/// stdout, warnings and errors to stderr.
pub fn init_tracing() {
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);

    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_ansi(false)
        .with_target(false)
        .with_writer(writer)
        .init();
}

/// Shared SDK configuration with credentials from the default chain.
pub async fn load_aws_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_owned()))
        .load()
        .await
}

/// Runs `work` until it finishes or `interrupt` resolves first, in which case
/// `work` is dropped and the run ends with [`Error::Interrupted`].
pub async fn interruptible<T, F, I>(work: F, interrupt: I) -> Result<T>
where
    F: Future<Output = Result<T>>,
    I: Future,
{
    tokio::select! {
        result = work => result,
        _ = interrupt => Err(Error::Interrupted),
    }
}
