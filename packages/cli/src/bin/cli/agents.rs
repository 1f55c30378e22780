use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use colored::*;
use foundry_ai::AIService;
use foundry_cli::{input, render};
use foundry_compiler::{
    AnthropicCodeGenerator, AnthropicSynthesizer, CompileOutcome, Compiler, CompilerConfig,
    ProgressReporter,
};
use foundry_storage::{AgentStore, SqliteStore, StorageConfig};

use super::progress::StageProgress;

async fn open_store() -> Result<Arc<SqliteStore>> {
    Ok(Arc::new(SqliteStore::new(StorageConfig::from_env()).await?))
}

async fn build_compiler(progress: ProgressReporter) -> Result<Compiler> {
    let config = CompilerConfig::from_env()?;
    let ai_service = AIService::new();

    Ok(Compiler::new(open_store().await?, config)
        .with_synthesizer(Arc::new(AnthropicSynthesizer::new(ai_service.clone())))
        .with_code_generator(Arc::new(AnthropicCodeGenerator::new(ai_service)))
        .with_progress(progress))
}

fn print_outcome(outcome: &CompileOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    let mut lines = outcome.summary.lines();
    if let Some(headline) = lines.next() {
        println!("{} {}", "✓".green().bold(), headline.bold());
    }
    for line in lines {
        if line.trim_start().starts_with("warning:") {
            println!("{}", line.yellow());
        } else {
            println!("{}", line);
        }
    }
    println!();
    println!("{}", format!("Run 'foundry show {}' for details", outcome.agent_id).dimmed());
    Ok(())
}

pub async fn compile(path: &Path, owner: Option<&str>, json: bool) -> Result<()> {
    let request = input::load_compile_input(path, owner)?;

    let (reporter, progress) = StageProgress::start(!json);
    let result = async {
        let compiler = build_compiler(reporter).await?;
        Ok::<_, anyhow::Error>(compiler.compile(request).await?)
    }
    .await;
    progress.finish(result.is_ok()).await;

    print_outcome(&result?, json)
}

pub async fn update(agent_id: &str, path: &Path, owner: Option<&str>, json: bool) -> Result<()> {
    let request = input::load_update_input(path, agent_id, owner)?;

    let (reporter, progress) = StageProgress::start(!json);
    let result = async {
        let compiler = build_compiler(reporter).await?;
        Ok::<_, anyhow::Error>(compiler.update(request).await?)
    }
    .await;
    progress.finish(result.is_ok()).await;

    print_outcome(&result?, json)
}

pub async fn show(agent_id: &str, json: bool) -> Result<()> {
    let store = open_store().await?;
    let graph = store
        .load_graph(agent_id)
        .await?
        .ok_or_else(|| anyhow!("Agent with ID '{}' not found", agent_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&graph)?);
        return Ok(());
    }

    let agent = &graph.agent;
    println!("{}", format!("Agent - {}", agent.name).blue().bold());
    println!();
    println!("{:<14} {}", "ID:".bold(), agent.id);
    println!("{:<14} {}", "Owner:".bold(), agent.owner_id);
    if !agent.description.is_empty() {
        println!("{:<14} {}", "Description:".bold(), agent.description);
    }
    println!(
        "{:<14} {}",
        "Root model:".bold(),
        agent.root_model.as_deref().unwrap_or("—")
    );
    for connection in &agent.connections {
        println!(
            "{:<14} {} {}",
            "Connection:".bold(),
            connection.title,
            format!("({})", connection.field_name).dimmed()
        );
    }

    println!();
    println!("{}", "Models".cyan().bold());
    println!("{}", render::models_table(&graph));

    if !graph.actions.is_empty() {
        println!("{}", "Actions".cyan().bold());
        println!("{}", render::actions_table(&graph));
    }
    if !graph.schedules.is_empty() {
        println!("{}", "Schedules".cyan().bold());
        println!("{}", render::schedules_table(&graph));
    }
    Ok(())
}

pub async fn list(owner: &str, json: bool) -> Result<()> {
    let store = open_store().await?;
    let agents = store.list_agents(owner).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&agents)?);
        return Ok(());
    }

    if agents.is_empty() {
        println!("{}", format!("No agents found for owner '{}'", owner).yellow());
        println!("{}", "Use 'foundry compile --input <file>' to create one".dimmed());
        return Ok(());
    }

    println!("{}", render::agents_table(&agents));
    println!("Total: {} agents", agents.len().to_string().cyan());
    Ok(())
}
