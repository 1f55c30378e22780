// ABOUTME: Persisted entity records carrying store-generated identifiers
// ABOUTME: The hydrated graph returned after every pipeline stage has completed

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::AgentGraph;
use crate::types::{Action, Connection, Model, Schedule, ScheduleMode, ScheduleStatus, ScheduleStep, Step};

/// Root aggregate as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub root_model: Option<String>,
    pub connections: Vec<Connection>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedModel {
    pub id: String,
    #[serde(flatten)]
    pub model: Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedStep {
    pub id: String,
    pub position: u32,
    /// False for custom code steps whose code is still to be generated
    pub execution_ready: bool,
    #[serde(flatten)]
    pub step: Step,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedAction {
    pub id: String,
    pub model_id: String,
    pub name: String,
    pub title: String,
    pub emoji: String,
    pub description: String,
    pub target_model: String,
    pub steps: Vec<PersistedStep>,
}

impl PersistedAction {
    pub fn new(id: String, model_id: String, action: &Action, steps: Vec<PersistedStep>) -> Self {
        Self {
            id,
            model_id,
            name: action.name.clone(),
            title: action.title.clone(),
            emoji: action.emoji.clone(),
            description: action.description.clone(),
            target_model: action.target_model.clone(),
            steps,
        }
    }

    pub fn to_action(&self) -> Action {
        Action {
            name: self.name.clone(),
            title: self.title.clone(),
            emoji: self.emoji.clone(),
            description: self.description.clone(),
            target_model: self.target_model.clone(),
            steps: self.steps.iter().map(|s| s.step.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedScheduleStep {
    pub id: String,
    pub model_id: String,
    pub action_id: String,
    #[serde(flatten)]
    pub step: ScheduleStep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSchedule {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub mode: ScheduleMode,
    pub interval_hours: Option<u32>,
    pub status: ScheduleStatus,
    pub steps: Vec<PersistedScheduleStep>,
}

impl PersistedSchedule {
    pub fn new(id: String, schedule: &Schedule, steps: Vec<PersistedScheduleStep>) -> Self {
        Self {
            id,
            name: schedule.name.clone(),
            description: schedule.description.clone(),
            mode: schedule.mode,
            interval_hours: schedule.interval_hours,
            status: schedule.status,
            steps,
        }
    }

    pub fn to_schedule(&self) -> Schedule {
        Schedule {
            name: self.name.clone(),
            description: self.description.clone(),
            mode: self.mode,
            interval_hours: self.interval_hours,
            status: self.status,
            steps: self.steps.iter().map(|s| s.step.clone()).collect(),
        }
    }
}

/// Agent graph with every generated identifier populated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedGraph {
    pub agent: AgentRecord,
    pub models: Vec<PersistedModel>,
    pub actions: Vec<PersistedAction>,
    pub schedules: Vec<PersistedSchedule>,
}

impl HydratedGraph {
    /// Name-addressed view, as consumed by the validator
    pub fn to_graph(&self) -> AgentGraph {
        AgentGraph {
            root_model: self.agent.root_model.clone(),
            models: self.models.iter().map(|m| m.model.clone()).collect(),
            actions: self.actions.iter().map(PersistedAction::to_action).collect(),
            schedules: self.schedules.iter().map(PersistedSchedule::to_schedule).collect(),
        }
    }

    /// Model name -> id
    pub fn model_ids(&self) -> HashMap<String, String> {
        self.models
            .iter()
            .map(|m| (m.model.name.clone(), m.id.clone()))
            .collect()
    }

    /// Action name -> id
    pub fn action_ids(&self) -> HashMap<String, String> {
        self.actions
            .iter()
            .map(|a| (a.name.clone(), a.id.clone()))
            .collect()
    }

    pub fn model(&self, name: &str) -> Option<&PersistedModel> {
        self.models.iter().find(|m| m.model.name == name)
    }

    pub fn action(&self, name: &str) -> Option<&PersistedAction> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn schedule(&self, name: &str) -> Option<&PersistedSchedule> {
        self.schedules.iter().find(|s| s.name == name)
    }
}
