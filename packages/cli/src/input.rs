// ABOUTME: Loading compile and update requests from JSON files
// ABOUTME: Command line flags override the owner and agent recorded in the file

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use foundry_compiler::{CompileInput, UpdateInput};

/// Owner recorded when neither the file nor the command line names one
pub const DEFAULT_OWNER: &str = "local";

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Input file {} is not a valid request", path.display()))
}

fn resolve_owner(from_file: String, flag: Option<&str>) -> String {
    match flag {
        Some(owner) => owner.to_string(),
        None if from_file.trim().is_empty() => DEFAULT_OWNER.to_string(),
        None => from_file,
    }
}

pub fn load_compile_input(path: &Path, owner: Option<&str>) -> Result<CompileInput> {
    let mut input: CompileInput = read_json(path)?;
    input.owner_id = resolve_owner(input.owner_id, owner);
    Ok(input)
}

pub fn load_update_input(path: &Path, agent_id: &str, owner: Option<&str>) -> Result<UpdateInput> {
    let mut input: UpdateInput = read_json(path)?;
    input.agent_id = agent_id.to_string();
    input.owner_id = resolve_owner(input.owner_id, owner);
    Ok(input)
}
