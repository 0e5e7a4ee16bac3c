//! Subscriber setup for the CLI. `DYNQ_LOG` takes precedence over
//! `--log-level`; events go to stderr so stdout stays clean for results.

use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_VAR: &str = "DYNQ_LOG";

pub const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

pub fn init(level: &str) {
    static INITIALISED: OnceLock<()> = OnceLock::new();

    INITIALISED.get_or_init(|| {
        let use_ansi = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
        let filter = EnvFilter::try_from_env(ENV_VAR).unwrap_or_else(|_| EnvFilter::new(level));
        let subscriber = fmt::fmt()
            .with_env_filter(filter)
            .with_ansi(use_ansi)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .compact()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
