// ABOUTME: Local shape validation for agent specification entities
// ABOUTME: Collects every violation before any external I/O is attempted

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::graph::AgentGraph;
use crate::types::{Action, Field, FieldType, FormKind, Model, Schedule, ScheduleMode, Step, StepConfig};

/// Longest code point sequence still accepted as one marker glyph (ZWJ and flag sequences)
const MAX_MARKER_CODE_POINTS: usize = 8;

/// One local shape problem, addressed by a dotted entity path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaViolation {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Every shape violation found in one entity or graph
#[derive(Debug, Clone, Error)]
#[error("{} schema violation(s): {}", .violations.len(), join_violations(.violations))]
pub struct SchemaError {
    pub violations: Vec<SchemaViolation>,
}

impl SchemaError {
    /// Run a collecting validator and turn any findings into an error
    pub fn check(validate: impl FnOnce(&mut Vec<SchemaViolation>)) -> Result<(), SchemaError> {
        let mut violations = Vec::new();
        validate(&mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaError { violations })
        }
    }
}

fn require_name(value: &str, path: &str, what: &str, violations: &mut Vec<SchemaViolation>) {
    if value.trim().is_empty() {
        violations.push(SchemaViolation::new(path, format!("{} is required", what)));
    }
}

fn report_duplicates<'a>(
    names: impl Iterator<Item = &'a str>,
    path: &str,
    what: &str,
    violations: &mut Vec<SchemaViolation>,
) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for name in names {
        if !seen.insert(name) && reported.insert(name) {
            violations.push(SchemaViolation::new(
                path,
                format!("duplicate {} name '{}'", what, name),
            ));
        }
    }
}

pub fn validate_agent_name(name: &str, violations: &mut Vec<SchemaViolation>) {
    require_name(name, "agent", "agent name", violations);
}

/// Validate one field; `path` addresses it in messages
pub fn validate_field(field: &Field, path: &str, violations: &mut Vec<SchemaViolation>) {
    require_name(&field.name, path, "field name", violations);

    match field.field_type {
        FieldType::Enum => match &field.enum_values {
            Some(values) if !values.is_empty() => {
                if values.iter().any(|v| v.trim().is_empty()) {
                    violations.push(SchemaViolation::new(path, "enum values cannot be empty"));
                }
            }
            _ => violations.push(SchemaViolation::new(
                path,
                "enum field must carry at least one value",
            )),
        },
        FieldType::Reference => match &field.reference {
            Some(reference) if !reference.model.trim().is_empty() => {}
            _ => violations.push(SchemaViolation::new(
                path,
                "reference field must name a target model",
            )),
        },
        _ => {}
    }

    if field.reference.is_some() && field.field_type != FieldType::Reference {
        violations.push(SchemaViolation::new(
            path,
            format!(
                "only reference fields may carry a reference target (type is {})",
                field.field_type.as_str()
            ),
        ));
    }
}

pub fn validate_model(model: &Model, violations: &mut Vec<SchemaViolation>) {
    let path = format!("model '{}'", model.name);
    require_name(&model.name, &path, "model name", violations);

    report_duplicates(model.fields.iter().map(|f| f.name.as_str()), &path, "field", violations);
    for field in &model.fields {
        validate_field(field, &format!("{}.{}", path, field.name), violations);
    }

    if let Some(display_fields) = &model.display_fields {
        for name in display_fields {
            if !model.has_field(name) {
                violations.push(SchemaViolation::new(
                    &path,
                    format!(
                        "display field '{}' is not a field of the model (fields: {})",
                        name,
                        model.field_names().join(", ")
                    ),
                ));
            }
        }
    }

    for form in &model.forms {
        let form_path = format!("{}.forms.{}", path, form.name);
        require_name(&form.name, &form_path, "form name", violations);
        for name in &form.fields {
            match model.field(name) {
                None => violations.push(SchemaViolation::new(
                    &form_path,
                    format!("form field '{}' is not a field of the model", name),
                )),
                Some(field) if field.derived && form.kind == FormKind::New => {
                    violations.push(SchemaViolation::new(
                        &form_path,
                        format!("new form cannot collect derived field '{}'", name),
                    ))
                }
                Some(_) => {}
            }
        }
    }
}

pub fn validate_step(step: &Step, path: &str, violations: &mut Vec<SchemaViolation>) {
    require_name(&step.name, path, "step name", violations);

    let missing = match &step.config {
        StepConfig::Reasoning { prompt, .. } | StepConfig::ImageGeneration { prompt, .. } => {
            prompt.trim().is_empty().then_some("prompt")
        }
        StepConfig::WebSearch { query, .. } => query.trim().is_empty().then_some("query"),
        StepConfig::CustomCode { .. } => None,
    };
    if let Some(what) = missing {
        violations.push(SchemaViolation::new(
            path,
            format!("{} step requires a {}", step.kind().as_str(), what),
        ));
    }
}

pub fn validate_action(action: &Action, violations: &mut Vec<SchemaViolation>) {
    let path = format!("action '{}'", action.name);
    require_name(&action.name, &path, "action name", violations);
    require_name(&action.title, &path, "action title", violations);
    require_name(&action.target_model, &path, "target model", violations);

    if !action.emoji.is_empty()
        && (action.emoji.chars().any(char::is_whitespace)
            || action.emoji.chars().count() > MAX_MARKER_CODE_POINTS)
    {
        violations.push(SchemaViolation::new(
            &path,
            format!("marker '{}' must be a single glyph", action.emoji),
        ));
    }

    report_duplicates(action.steps.iter().map(|s| s.name.as_str()), &path, "step", violations);
    for (idx, step) in action.steps.iter().enumerate() {
        validate_step(step, &format!("{}.steps[{}]", path, idx), violations);
    }
}

pub fn validate_schedule(schedule: &Schedule, violations: &mut Vec<SchemaViolation>) {
    let path = format!("schedule '{}'", schedule.name);
    require_name(&schedule.name, &path, "schedule name", violations);

    match (schedule.mode, schedule.interval_hours) {
        (ScheduleMode::Recurring, None) => violations.push(SchemaViolation::new(
            &path,
            "recurring schedule requires an interval",
        )),
        (ScheduleMode::Recurring, Some(0)) => violations.push(SchemaViolation::new(
            &path,
            "recurring interval must be at least one hour",
        )),
        (ScheduleMode::Once, Some(_)) => violations.push(SchemaViolation::new(
            &path,
            "one-time schedule cannot carry an interval",
        )),
        _ => {}
    }

    if schedule.steps.is_empty() {
        violations.push(SchemaViolation::new(&path, "schedule requires at least one step"));
    }

    let mut orders = HashSet::new();
    for (idx, step) in schedule.steps.iter().enumerate() {
        let step_path = format!("{}.steps[{}]", path, idx);
        require_name(&step.model_name, &step_path, "model name", violations);
        require_name(&step.action_name, &step_path, "action name", violations);
        if !orders.insert(step.order) {
            violations.push(SchemaViolation::new(
                &step_path,
                format!("duplicate execution order {}", step.order),
            ));
        }
    }
}

/// Validate every entity of a graph plus graph-wide name uniqueness
pub fn validate_graph(graph: &AgentGraph, violations: &mut Vec<SchemaViolation>) {
    report_duplicates(graph.models.iter().map(|m| m.name.as_str()), "graph", "model", violations);
    report_duplicates(graph.actions.iter().map(|a| a.name.as_str()), "graph", "action", violations);
    report_duplicates(
        graph.schedules.iter().map(|s| s.name.as_str()),
        "graph",
        "schedule",
        violations,
    );

    if let Some(root) = &graph.root_model {
        require_name(root, "graph", "root model name", violations);
    }

    for model in &graph.models {
        validate_model(model, violations);
    }
    for action in &graph.actions {
        validate_action(action, violations);
    }
    for schedule in &graph.schedules {
        validate_schedule(schedule, violations);
    }
}

/// Shape-check a whole graph
pub fn check_graph(graph: &AgentGraph) -> Result<(), SchemaError> {
    SchemaError::check(|violations| validate_graph(graph, violations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cardinality, ScheduleStep, ScheduleStatus};

    fn valid_graph() -> AgentGraph {
        AgentGraph {
            root_model: Some("Idea".to_string()),
            models: vec![Model::new(
                "Idea",
                vec![
                    Field::text("title", "Title").required(),
                    Field::enumeration("status", "Status", vec!["draft".into(), "done".into()])
                        .unwrap(),
                ],
            )
            .with_display_fields(&["title"])],
            actions: vec![Action {
                name: "expand".to_string(),
                title: "Expand".to_string(),
                emoji: "✨".to_string(),
                description: "Expand the idea".to_string(),
                target_model: "Idea".to_string(),
                steps: vec![Step {
                    name: "think".to_string(),
                    description: "Think about it".to_string(),
                    input_fields: vec!["title".to_string()],
                    output_fields: vec!["summary".to_string()],
                    config: StepConfig::Reasoning {
                        prompt: "Summarize {{title}}".to_string(),
                        model: None,
                    },
                }],
            }],
            schedules: vec![Schedule::recurring("Daily", 24, vec![ScheduleStep::new("Idea", "expand", 0)])
                .unwrap()],
        }
    }

    #[test]
    fn test_valid_graph_passes() {
        assert!(check_graph(&valid_graph()).is_ok());
    }

    #[test]
    fn test_enum_without_values_rejected() {
        let result = Field::enumeration("status", "Status", vec![]);
        let err = result.unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert!(err.violations[0].message.contains("at least one value"));
    }

    #[test]
    fn test_recurring_schedule_requires_interval() {
        let mut graph = valid_graph();
        graph.schedules[0].interval_hours = None;
        let err = check_graph(&graph).unwrap_err();
        assert!(err.to_string().contains("recurring schedule requires an interval"));
    }

    #[test]
    fn test_once_schedule_rejects_interval() {
        let err = Schedule {
            name: "Now".to_string(),
            description: None,
            mode: ScheduleMode::Once,
            interval_hours: Some(2),
            status: ScheduleStatus::Active,
            steps: vec![ScheduleStep::new("Idea", "expand", 0)],
        };
        let result = SchemaError::check(|v| validate_schedule(&err, v));
        assert!(result.is_err());
    }

    #[test]
    fn test_display_field_must_exist() {
        let mut graph = valid_graph();
        graph.models[0].display_fields = Some(vec!["name".to_string()]);
        let err = check_graph(&graph).unwrap_err();
        assert!(err.violations[0].message.contains("display field 'name'"));
        assert!(err.violations[0].message.contains("title, status"));
    }

    #[test]
    fn test_reference_field_requires_target() {
        let mut field = Field::reference("idea", "Idea", "Idea", Cardinality::One);
        field.reference = None;
        let result = SchemaError::check(|v| validate_field(&field, "model.idea", v));
        assert!(result.is_err());
    }

    #[test]
    fn test_all_violations_collected() {
        let mut graph = valid_graph();
        graph.models.push(graph.models[0].clone());
        graph.actions[0].emoji = "two words".to_string();
        graph.schedules[0].steps.push(ScheduleStep::new("Idea", "expand", 0));

        let err = check_graph(&graph).unwrap_err();
        let messages: Vec<String> = err.violations.iter().map(|v| v.message.clone()).collect();
        assert!(messages.iter().any(|m| m.contains("duplicate model name 'Idea'")));
        assert!(messages.iter().any(|m| m.contains("single glyph")));
        assert!(messages.iter().any(|m| m.contains("duplicate execution order 0")));
    }

    #[test]
    fn test_new_form_cannot_collect_derived_fields() {
        let mut graph = valid_graph();
        let mut summary = Field::text("summary", "Summary");
        summary.derived = true;
        graph.models[0].fields.push(summary);
        graph.models[0].forms.push(crate::types::Form {
            name: "create".to_string(),
            title: "New idea".to_string(),
            kind: FormKind::New,
            fields: vec!["title".to_string(), "summary".to_string()],
        });

        let err = check_graph(&graph).unwrap_err();
        assert!(err.to_string().contains("new form cannot collect derived field 'summary'"));
    }
}
