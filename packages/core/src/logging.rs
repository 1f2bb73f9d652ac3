use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Directives used when `RUST_LOG` is unset. sqlx logs every statement at
/// info, which drowns out the lifecycle events.
pub const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn";

/// `RUST_LOG` if present and valid, otherwise [`DEFAULT_DIRECTIVES`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Initialize structured logging for the application.
///
/// Must be called once at startup, before the pool or engine are built.
pub fn init_logging() {
    fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .compact()
        .init();

    info!("Logging initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_parse() {
        let filter = EnvFilter::new(DEFAULT_DIRECTIVES);
        assert!(filter.to_string().contains("sqlx=warn"));
    }
}
