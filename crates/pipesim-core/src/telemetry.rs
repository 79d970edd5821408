//! Log setup for `pipesim`.
//!
//! The CLI prints notices and dashboard dumps on stdout, and `--output json`
//! makes stdout machine-readable. Log lines therefore go to stderr, so
//! `pipesim deploy production --output json | jq` sees only the state.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber writing to stderr. `RUST_LOG` overrides
/// `level`; `json` switches to one JSON object per line. Only the first call
/// in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    // Exactly one of the two layers is `Some`.
    let text_layer =
        (!json).then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));
    let json_layer = json.then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .try_init();
}
