// ABOUTME: Referential validation over the merged (existing + new) agent graph
// ABOUTME: Collects every unresolved or colliding name together with its valid alternatives

use std::collections::{BTreeMap, HashMap};

use foundry_core::{AgentGraph, Field, Model};

use crate::error::ReferenceIssue;

/// Model lookup across the delta, the stored graph and pending field additions
struct MergedView<'a> {
    existing: &'a AgentGraph,
    delta: &'a AgentGraph,
    additions: &'a BTreeMap<String, Vec<Field>>,
    model_names: Vec<String>,
    action_names: Vec<String>,
    action_targets: HashMap<&'a str, &'a str>,
}

impl<'a> MergedView<'a> {
    fn new(
        existing: &'a AgentGraph,
        delta: &'a AgentGraph,
        additions: &'a BTreeMap<String, Vec<Field>>,
    ) -> Self {
        let model_names = sorted_union(existing.model_names(), delta.model_names());
        let action_names = sorted_union(existing.action_names(), delta.action_names());
        let action_targets = existing
            .actions
            .iter()
            .chain(delta.actions.iter())
            .map(|a| (a.name.as_str(), a.target_model.as_str()))
            .collect();

        Self {
            existing,
            delta,
            additions,
            model_names,
            action_names,
            action_targets,
        }
    }

    fn has_model(&self, name: &str) -> bool {
        self.model_names.iter().any(|n| n == name)
    }

    fn model(&self, name: &str) -> Option<&'a Model> {
        self.delta.model(name).or_else(|| self.existing.model(name))
    }

    /// Sorted field names of a model, including fields appended during this run
    fn field_names(&self, model_name: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .model(model_name)
            .map(Model::field_names)
            .unwrap_or_default();
        if let Some(extra) = self.additions.get(model_name) {
            names.extend(extra.iter().map(|f| f.name.clone()));
        }
        names.sort();
        names.dedup();
        names
    }
}

fn sorted_union(mut left: Vec<String>, right: Vec<String>) -> Vec<String> {
    left.extend(right);
    left.sort();
    left.dedup();
    left
}

/// Check every cross-entity name in `delta` against `existing ∪ delta`.
/// `existing` is empty for a fresh compile.
pub fn validate_references(
    existing: &AgentGraph,
    delta: &AgentGraph,
    additions: &BTreeMap<String, Vec<Field>>,
) -> Vec<ReferenceIssue> {
    let view = MergedView::new(existing, delta, additions);
    let mut issues = Vec::new();

    check_collisions(existing, delta, &mut issues);

    if let Some(root) = &delta.root_model {
        if !view.has_model(root) {
            issues.push(ReferenceIssue::unresolved(
                "root model",
                "model",
                root,
                view.model_names.clone(),
            ));
        }
    }

    for model in &delta.models {
        check_model(&view, model, &mut issues);
    }

    for action in &delta.actions {
        if !view.has_model(&action.target_model) {
            issues.push(ReferenceIssue::unresolved(
                format!("action '{}'", action.name),
                "model",
                &action.target_model,
                view.model_names.clone(),
            ));
        }
    }

    for schedule in &delta.schedules {
        for (idx, step) in schedule.steps.iter().enumerate() {
            let path = format!("schedule '{}'.steps[{}]", schedule.name, idx);

            let model_resolved = view.has_model(&step.model_name);
            if !model_resolved {
                issues.push(ReferenceIssue::unresolved(
                    &path,
                    "model",
                    &step.model_name,
                    view.model_names.clone(),
                ));
            }

            match view.action_targets.get(step.action_name.as_str()) {
                None => issues.push(ReferenceIssue::unresolved(
                    &path,
                    "action",
                    &step.action_name,
                    view.action_names.clone(),
                )),
                Some(target) if model_resolved && *target != step.model_name => {
                    issues.push(ReferenceIssue::conflict(
                        &path,
                        format!(
                            "action '{}' targets model '{}', not '{}'",
                            step.action_name, target, step.model_name
                        ),
                    ))
                }
                Some(_) => {}
            }
        }
    }

    issues
}

fn check_collisions(existing: &AgentGraph, delta: &AgentGraph, issues: &mut Vec<ReferenceIssue>) {
    for model in delta.models.iter().filter(|m| existing.model(&m.name).is_some()) {
        issues.push(ReferenceIssue::conflict(
            format!("model '{}'", model.name),
            "a model with this name already exists",
        ));
    }
    for action in delta.actions.iter().filter(|a| existing.action(&a.name).is_some()) {
        issues.push(ReferenceIssue::conflict(
            format!("action '{}'", action.name),
            "an action with this name already exists",
        ));
    }
    for schedule in delta.schedules.iter().filter(|s| existing.schedule(&s.name).is_some()) {
        issues.push(ReferenceIssue::conflict(
            format!("schedule '{}'", schedule.name),
            "a schedule with this name already exists",
        ));
    }
}

fn check_model(view: &MergedView<'_>, model: &Model, issues: &mut Vec<ReferenceIssue>) {
    for field in &model.fields {
        let Some(reference) = &field.reference else {
            continue;
        };
        let path = format!("model '{}'.{}", model.name, field.name);

        if !view.has_model(&reference.model) {
            issues.push(ReferenceIssue::unresolved(
                path,
                "model",
                &reference.model,
                view.model_names.clone(),
            ));
            continue;
        }

        // `id` is implicit on every model
        if reference.field != "id" {
            let target_fields = view.field_names(&reference.model);
            if !target_fields.contains(&reference.field) {
                let mut candidates = vec!["id".to_string()];
                candidates.extend(target_fields);
                issues.push(ReferenceIssue::unresolved(path, "field", &reference.field, candidates));
            }
        }
    }

    if let Some(display_fields) = &model.display_fields {
        for name in display_fields.iter().filter(|n| !model.has_field(n)) {
            let mut candidates = model.field_names();
            candidates.sort();
            issues.push(ReferenceIssue::unresolved(
                format!("model '{}'.displayFields", model.name),
                "field",
                name,
                candidates,
            ));
        }
    }
}
