//! Message formatting and logging setup shared by the library and the CLI.

use std::fmt::Display;
use tracing_subscriber::EnvFilter;

/// Prefix used for every user-facing error context line.
pub fn error_message(msg: impl Display) -> String {
    format!("oc-aggregate: {}", msg)
}

pub fn warn(msg: impl Display) {
    tracing::warn!("{}", msg);
}

/// Install the global fmt subscriber.
///
/// An explicit `level` wins; otherwise `RUST_LOG` is honoured, defaulting to `info`.
pub fn init_logging(level: Option<&str>) -> anyhow::Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(error_message(format!("init logging: {}", e))))?;
    Ok(())
}

#[cfg(test)]
pub fn init_for_tests() {
    use std::sync::Once;

    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = EnvFilter::from_default_env()
            .add_directive("oc_aggregate=debug".parse().expect("static directive"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}
