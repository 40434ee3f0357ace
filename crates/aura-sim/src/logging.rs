//! Log output setup.
//!
//! The binary prints its report on stdout, so logs always go elsewhere.

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// Filter directive used on top of `RUST_LOG`.
pub const DEFAULT_DIRECTIVE: &str = "aura=info";

/// Formatting layer writing to `writer`, as JSON lines or plain text.
pub fn log_layer<S, W>(json: bool, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if json {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer().with_writer(writer).boxed()
    }
}

/// Installs the global subscriber, logging to stderr.
pub fn init(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(DEFAULT_DIRECTIVE.parse()?);
    tracing_subscriber::registry()
        .with(log_layer(json, std::io::stderr))
        .with(filter)
        .try_init()?;
    Ok(())
}
