//! Tracing initialization.
//!
//! Two output modes, both written to stderr so the regression report and
//! chart on stdout stay clean:
//! - **JSON mode** (`json = true`): one structured record per event
//! - **Compact mode** (`json = false`): human-readable lines
//!
//! Both modes respect `RUST_LOG` (e.g. `RUST_LOG=ofi_analysis=debug`) and
//! default to `info`.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Returns `false` if a global subscriber was already set, in which case the
/// existing one is kept.
pub fn init_tracing(json: bool) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);

        registry.with(json_layer).try_init().is_ok()
    } else {
        let compact_layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false);

        registry.with(compact_layer).try_init().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        init_tracing(false);
        assert!(!init_tracing(true));
    }
}
