// ABOUTME: Terminal rendering of agents and their persisted graphs
// ABOUTME: comfy-table tables for listings plus plain-text detail blocks

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use foundry_core::{truncate, AgentRecord, HydratedGraph, PersistedAction, PersistedModel, ScheduleMode};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn format_date(date: &chrono::DateTime<chrono::Utc>) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

fn or_dash(text: &str) -> String {
    if text.trim().is_empty() {
        "—".to_string()
    } else {
        text.to_string()
    }
}

pub fn agents_table(agents: &[AgentRecord]) -> Table {
    let mut table = new_table(vec!["ID", "Name", "Root model", "Connections", "Created"]);
    for agent in agents {
        let connections: Vec<&str> = agent.connections.iter().map(|c| c.provider.as_str()).collect();
        table.add_row(vec![
            agent.id.clone(),
            truncate(&agent.name, 30),
            agent.root_model.clone().unwrap_or_else(|| "—".to_string()),
            or_dash(&connections.join(", ")),
            format_date(&agent.created_at),
        ]);
    }
    table
}

fn model_summary(model: &PersistedModel) -> String {
    let derived = model.model.fields.iter().filter(|f| f.derived).count();
    if derived == 0 {
        model.model.fields.len().to_string()
    } else {
        format!("{} ({} derived)", model.model.fields.len(), derived)
    }
}

pub fn models_table(graph: &HydratedGraph) -> Table {
    let mut table = new_table(vec!["ID", "Model", "Fields", "Display", "Forms"]);
    for model in &graph.models {
        let display = model
            .model
            .display_fields
            .as_ref()
            .map(|names| names.join(", "))
            .unwrap_or_default();
        table.add_row(vec![
            model.id.clone(),
            model.model.name.clone(),
            model_summary(model),
            or_dash(&display),
            model.model.forms.len().to_string(),
        ]);
    }
    table
}

/// One line per step: position, kind, name, and whether it can run yet
pub fn step_lines(action: &PersistedAction) -> Vec<String> {
    action
        .steps
        .iter()
        .map(|s| {
            let status = if s.execution_ready { "" } else { " (code pending)" };
            format!("{}. [{}] {}{}", s.position + 1, s.step.kind().as_str(), s.step.name, status)
        })
        .collect()
}

pub fn actions_table(graph: &HydratedGraph) -> Table {
    let mut table = new_table(vec!["ID", "Action", "Target", "Steps"]);
    for action in &graph.actions {
        let label = if action.emoji.is_empty() {
            action.name.clone()
        } else {
            format!("{} {}", action.emoji, action.name)
        };
        table.add_row(vec![
            action.id.clone(),
            label,
            action.target_model.clone(),
            step_lines(action).join("\n"),
        ]);
    }
    table
}

pub fn schedules_table(graph: &HydratedGraph) -> Table {
    let mut table = new_table(vec!["ID", "Schedule", "Runs", "Steps"]);
    for schedule in &graph.schedules {
        let runs = match (schedule.mode, schedule.interval_hours) {
            (ScheduleMode::Recurring, Some(hours)) => format!("every {}h", hours),
            _ => "once".to_string(),
        };
        let steps: Vec<String> = schedule
            .steps
            .iter()
            .map(|s| format!("{}: {} on {}", s.step.order, s.step.action_name, s.step.model_name))
            .collect();
        table.add_row(vec![
            schedule.id.clone(),
            schedule.name.clone(),
            runs,
            steps.join("\n"),
        ]);
    }
    table
}
