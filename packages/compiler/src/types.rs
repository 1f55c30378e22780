// ABOUTME: Input and outcome types of the compile and update operations
// ABOUTME: Wire shapes accepted by the CLI and returned to callers

use foundry_core::{Action, AgentGraph, HydratedGraph, Model, Schedule};
use serde::{Deserialize, Serialize};

use crate::error::CompileWarning;

/// One (feature, user-provided data, desired operations) triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureInput {
    pub description: String,
    #[serde(default)]
    pub user_provides: String,
    #[serde(default)]
    pub ai_should: String,
}

/// How the agent is authored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AgentSource {
    /// Fully specified entity graph
    Graph { graph: AgentGraph },
    /// Feature list expanded by the synthesis collaborator
    Features {
        #[serde(default)]
        feature_inputs: Vec<FeatureInput>,
        /// Closed set of permitted connection names
        #[serde(default)]
        connections: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(flatten)]
    pub source: AgentSource,
}

/// Additive changes to a persisted agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInput {
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub models_to_add: Vec<Model>,
    #[serde(default)]
    pub actions_to_add: Vec<Action>,
    #[serde(default)]
    pub schedules_to_add: Vec<Schedule>,
}

impl UpdateInput {
    /// The additions as a delta graph
    pub fn delta(&self) -> AgentGraph {
        AgentGraph {
            root_model: None,
            models: self.models_to_add.clone(),
            actions: self.actions_to_add.clone(),
            schedules: self.schedules_to_add.clone(),
        }
    }
}

/// Entities persisted by one compile or update call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileCounts {
    pub models: usize,
    pub actions: usize,
    pub steps: usize,
    pub schedules: usize,
    pub schedule_steps: usize,
    pub derived_fields: usize,
    pub connections: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutcome {
    pub agent_id: String,
    pub counts: CompileCounts,
    /// Short human-readable report
    pub summary: String,
    pub warnings: Vec<CompileWarning>,
    pub graph: HydratedGraph,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_features_input_parses() {
        let input: CompileInput = serde_json::from_value(json!({
            "name": "Tip Bot",
            "mode": "features",
            "featureInputs": [{
                "description": "Post a daily tip image to X",
                "userProvides": "topic",
                "aiShould": "generate an image and post to X"
            }],
            "connections": ["x"]
        }))
        .unwrap();

        match input.source {
            AgentSource::Features {
                feature_inputs,
                connections,
            } => {
                assert_eq!(feature_inputs[0].user_provides, "topic");
                assert_eq!(connections, vec!["x"]);
            }
            other => panic!("unexpected source: {:?}", other),
        }
        assert!(input.owner_id.is_empty());
    }

    #[test]
    fn test_graph_input_parses() {
        let input: CompileInput = serde_json::from_value(json!({
            "name": "Notes",
            "ownerId": "user-1",
            "mode": "graph",
            "graph": { "models": [{ "name": "Note", "fields": [] }] }
        }))
        .unwrap();

        assert_eq!(input.owner_id, "user-1");
        assert!(matches!(input.source, AgentSource::Graph { ref graph } if graph.models.len() == 1));
    }

    #[test]
    fn test_update_input_defaults() {
        let input: UpdateInput = serde_json::from_value(json!({
            "actionsToAdd": [{ "name": "go", "title": "Go", "targetModel": "Note" }]
        }))
        .unwrap();
        assert!(input.agent_id.is_empty());
        assert_eq!(input.delta().actions.len(), 1);
        assert!(input.delta().models.is_empty());
    }
}
