use std::env;
use std::path::PathBuf;

// Storage
pub const FOUNDRY_DATABASE_PATH: &str = "FOUNDRY_DATABASE_PATH";

// Compiler
pub const FOUNDRY_UPDATE_TIMEOUT_SECS: &str = "FOUNDRY_UPDATE_TIMEOUT_SECS";
pub const FOUNDRY_CODEGEN_ENABLED: &str = "FOUNDRY_CODEGEN_ENABLED";
pub const FOUNDRY_PERMITTED_CONNECTIONS: &str = "FOUNDRY_PERMITTED_CONNECTIONS";

// AI provider
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ANTHROPIC_MODEL: &str = "ANTHROPIC_MODEL";

// System Environment Variables
pub const HOME: &str = "HOME";

/// Get the path to the Foundry directory (~/.foundry)
pub fn foundry_dir() -> PathBuf {
    // First try HOME environment variable (useful for tests)
    if let Ok(home) = env::var(HOME) {
        PathBuf::from(home).join(".foundry")
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".foundry")
    }
}

/// Get the default database path (~/.foundry/foundry.db)
pub fn database_file() -> PathBuf {
    foundry_dir().join("foundry.db")
}
