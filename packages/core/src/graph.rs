// ABOUTME: In-memory agent graph addressed by entity names
// ABOUTME: Lookup helpers shared by the synthesizer, enricher, validator and pipeline

use serde::{Deserialize, Serialize};

use crate::types::{Action, Model, Schedule};

/// Name of the model that always carries the agent's credential fields
pub const WORKSPACE_MODEL: &str = "Workspace";

/// Models, actions and schedules of one agent, cross-referenced by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentGraph {
    /// Entry-point model end users see first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_model: Option<String>,
    #[serde(default)]
    pub models: Vec<Model>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
}

impl AgentGraph {
    pub fn is_empty(&self) -> bool {
        self.models.is_empty() && self.actions.is_empty() && self.schedules.is_empty()
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn model_mut(&mut self, name: &str) -> Option<&mut Model> {
        self.models.iter_mut().find(|m| m.name == name)
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn schedule(&self, name: &str) -> Option<&Schedule> {
        self.schedules.iter().find(|s| s.name == name)
    }

    /// Sorted model names
    pub fn model_names(&self) -> Vec<String> {
        sorted(self.models.iter().map(|m| m.name.clone()))
    }

    /// Sorted action names
    pub fn action_names(&self) -> Vec<String> {
        sorted(self.actions.iter().map(|a| a.name.clone()))
    }

    pub fn step_count(&self) -> usize {
        self.actions.iter().map(|a| a.steps.len()).sum()
    }

    pub fn schedule_step_count(&self) -> usize {
        self.schedules.iter().map(|s| s.steps.len()).sum()
    }

    pub fn derived_field_count(&self) -> usize {
        self.models
            .iter()
            .flat_map(|m| m.fields.iter())
            .filter(|f| f.derived)
            .count()
    }
}

fn sorted(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut names: Vec<String> = names.collect();
    names.sort();
    names.dedup();
    names
}
