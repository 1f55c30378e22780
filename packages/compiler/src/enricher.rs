// ABOUTME: Graph enrichment run before persistence
// ABOUTME: Display-field derivation, derived-field folding, credential detection, then referential validation

use std::collections::BTreeMap;

use foundry_core::{humanize, AgentGraph, Connection, Field, Model, StepKind, WORKSPACE_MODEL};
use tracing::{debug, warn};

use crate::credentials::{self, ConnectionRule, CONNECTION_CATALOG};
use crate::display;
use crate::error::{CompileError, CompileWarning, Result};
use crate::validator;

/// Delta graph after enrichment, ready for the persistence pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedGraph {
    pub graph: AgentGraph,
    /// Fields to append to models that are already persisted, by model name
    pub field_additions: BTreeMap<String, Vec<Field>>,
    /// Connections required by this graph's custom code steps, catalog order
    pub connections: Vec<Connection>,
    pub warnings: Vec<CompileWarning>,
}

impl EnrichedGraph {
    pub fn derived_field_count(&self) -> usize {
        let appended = self
            .field_additions
            .values()
            .flatten()
            .filter(|f| f.derived)
            .count();
        self.graph.derived_field_count() + appended
    }
}

/// Workspace model carrying the given credential fields
pub fn workspace_model(credential_fields: Vec<Field>) -> Model {
    let mut fields = vec![Field::text("name", "Name").required()];
    fields.extend(credential_fields);
    Model::new(WORKSPACE_MODEL, fields).with_display_fields(&["name"])
}

/// Text field synthesized for a step output the target model lacks
pub fn derived_field(field_name: &str, action: &str, step: &str) -> Field {
    let mut field = Field::text(field_name, humanize(field_name)).with_description(format!(
        "Generated by step '{}' of action '{}'",
        step, action
    ));
    field.derived = true;
    field
}

/// Enrich `delta` and validate it against `existing ∪ delta`.
///
/// `permitted` restricts which detected connections get credential fields;
/// `None` accepts every catalog entry. Performs no I/O.
pub fn enrich(
    existing: &AgentGraph,
    mut delta: AgentGraph,
    permitted: Option<&[String]>,
) -> Result<EnrichedGraph> {
    for model in &mut delta.models {
        if display::apply_display_fields(model) {
            debug!(
                "Derived display field {:?} for model {}",
                model.display_fields, model.name
            );
        }
    }

    let mut field_additions = BTreeMap::new();
    fold_derived_fields(existing, &mut delta, &mut field_additions);

    // Models authored without fields only get them from folding
    for model in &mut delta.models {
        if display::apply_display_fields(model) {
            debug!(
                "Derived display field {:?} for folded model {}",
                model.display_fields, model.name
            );
        }
    }

    let (rules, warnings) = required_connections(&delta, permitted);
    add_credential_fields(existing, &mut delta, &mut field_additions, &rules);

    let issues = validator::validate_references(existing, &delta, &field_additions);
    if !issues.is_empty() {
        return Err(CompileError::ReferentialIntegrity(issues));
    }

    Ok(EnrichedGraph {
        graph: delta,
        field_additions,
        connections: rules.iter().map(|r| r.connection()).collect(),
        warnings,
    })
}

fn fold_derived_fields(
    existing: &AgentGraph,
    delta: &mut AgentGraph,
    additions: &mut BTreeMap<String, Vec<Field>>,
) {
    let outputs: Vec<(String, Field)> = delta
        .actions
        .iter()
        .flat_map(|action| {
            action.steps.iter().flat_map(move |step| {
                step.output_fields
                    .iter()
                    .filter(|name| !name.trim().is_empty())
                    .map(move |name| {
                        (
                            action.target_model.clone(),
                            derived_field(name, &action.name, &step.name),
                        )
                    })
            })
        })
        .collect();

    for (target, field) in outputs {
        if let Some(model) = delta.model_mut(&target) {
            if !model.has_field(&field.name) {
                model.fields.push(field);
            }
        } else if let Some(model) = existing.model(&target) {
            let pending = additions.get(&target).map(Vec::as_slice).unwrap_or_default();
            if !model.has_field(&field.name) && !pending.iter().any(|f| f.name == field.name) {
                additions.entry(target).or_default().push(field);
            }
        }
        // Unknown targets are reported by referential validation
    }
}

fn required_connections(
    delta: &AgentGraph,
    permitted: Option<&[String]>,
) -> (Vec<&'static ConnectionRule>, Vec<CompileWarning>) {
    let mut detected: Vec<&'static ConnectionRule> = Vec::new();
    for step in delta
        .actions
        .iter()
        .flat_map(|a| a.steps.iter())
        .filter(|s| s.kind() == StepKind::CustomCode)
    {
        for rule in credentials::detect_connections(&step.description) {
            if !detected.iter().any(|r| r.provider == rule.provider) {
                detected.push(rule);
            }
        }
    }
    detected.sort_by_key(|rule| {
        CONNECTION_CATALOG
            .iter()
            .position(|r| r.provider == rule.provider)
    });

    let mut warnings = Vec::new();
    let rules = match permitted {
        None => detected,
        Some(permitted) => detected
            .into_iter()
            .filter(|rule| {
                let allowed = credentials::is_permitted(rule.provider, permitted);
                if !allowed {
                    warn!("Dropping connection '{}': not in the permitted set", rule.provider);
                    warnings.push(CompileWarning::ConnectionNotPermitted {
                        provider: rule.provider.to_string(),
                    });
                }
                allowed
            })
            .collect(),
    };

    (rules, warnings)
}

fn add_credential_fields(
    existing: &AgentGraph,
    delta: &mut AgentGraph,
    additions: &mut BTreeMap<String, Vec<Field>>,
    rules: &[&'static ConnectionRule],
) {
    if rules.is_empty() {
        return;
    }
    let fields: Vec<Field> = rules.iter().map(|r| r.credential_field()).collect();

    if let Some(workspace) = delta.model_mut(WORKSPACE_MODEL) {
        for field in fields {
            if !workspace.has_field(&field.name) {
                workspace.fields.push(field);
            }
        }
    } else if let Some(workspace) = existing.model(WORKSPACE_MODEL) {
        for field in fields {
            let pending = additions.get(WORKSPACE_MODEL).map(Vec::as_slice).unwrap_or_default();
            if !workspace.has_field(&field.name) && !pending.iter().any(|f| f.name == field.name) {
                additions.entry(WORKSPACE_MODEL.to_string()).or_default().push(field);
            }
        }
    } else {
        delta.models.push(workspace_model(fields));
    }
}
