// ABOUTME: Library half of the Foundry CLI
// ABOUTME: Input file loading, terminal rendering and logging setup shared by the binary

pub mod input;
pub mod render;

use tracing_subscriber::EnvFilter;

/// Compact logging to stderr; `RUST_LOG` overrides the default level
pub fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
