// ABOUTME: Specification synthesizer expanding feature lists into entity graphs
// ABOUTME: One collaborator call per compile, schema-checked before any other use of the output

use foundry_core::{check_graph, AgentGraph, FieldType, WORKSPACE_MODEL};
use tracing::{error, info, warn};

use crate::collaborators::{SynthesisCollaborator, SynthesisRequest};
use crate::credentials;
use crate::enricher::workspace_model;
use crate::error::{CompileError, Result};
use crate::prompts::SYNTHESIS_SYSTEM_CONTRACT;
use crate::types::FeatureInput;

pub struct Synthesizer<'a> {
    collaborator: &'a dyn SynthesisCollaborator,
}

impl<'a> Synthesizer<'a> {
    pub fn new(collaborator: &'a dyn SynthesisCollaborator) -> Self {
        Self { collaborator }
    }

    /// Expand a description plus feature triples into a complete graph.
    /// Any malformed collaborator output fails the whole synthesis.
    pub async fn synthesize(
        &self,
        name: &str,
        description: &str,
        feature_inputs: &[FeatureInput],
        permitted_connections: &[String],
    ) -> Result<AgentGraph> {
        info!(
            "Synthesizing agent '{}' from {} feature(s)",
            name,
            feature_inputs.len()
        );

        let request = SynthesisRequest {
            system_contract: SYNTHESIS_SYSTEM_CONTRACT.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            feature_inputs: feature_inputs.to_vec(),
            permitted_connections: permitted_connections.to_vec(),
        };

        let output = self.collaborator.synthesize(&request).await.map_err(|e| {
            error!("Synthesis collaborator failed: {}", e);
            CompileError::SynthesisFailure(format!("collaborator call failed: {}", e))
        })?;

        let mut graph: AgentGraph = serde_json::from_value(output).map_err(|e| {
            CompileError::SynthesisFailure(format!("output does not match the entity schema: {}", e))
        })?;

        check_graph(&graph).map_err(|e| {
            CompileError::SynthesisFailure(format!("output violates the entity schema: {}", e))
        })?;

        if graph.models.iter().all(|m| m.name == WORKSPACE_MODEL) {
            return Err(CompileError::SynthesisFailure(
                "output defines no models besides the Workspace".to_string(),
            ));
        }

        prepare_workspace(&mut graph);
        if graph.root_model.is_none() {
            graph.root_model = default_root_model(&graph);
        }

        info!(
            "Synthesized {} models, {} actions, {} schedules",
            graph.models.len(),
            graph.actions.len(),
            graph.schedules.len()
        );
        Ok(graph)
    }
}

/// First model that is not the Workspace
pub fn default_root_model(graph: &AgentGraph) -> Option<String> {
    graph
        .models
        .iter()
        .find(|m| m.name != WORKSPACE_MODEL)
        .map(|m| m.name.clone())
}

/// Ensure a Workspace model exists and strip credential fields the collaborator wrote itself.
/// Credential fields are re-added during enrichment, one per permitted connection in use.
fn prepare_workspace(graph: &mut AgentGraph) {
    let Some(workspace) = graph.model_mut(WORKSPACE_MODEL) else {
        graph.models.push(workspace_model(vec![]));
        return;
    };

    let before = workspace.fields.len();
    workspace.fields.retain(|f| {
        f.field_type != FieldType::Oauth && credentials::rule_for_field(&f.name).is_none()
    });
    if workspace.fields.len() != before {
        warn!(
            "Removed {} credential field(s) from synthesized Workspace",
            before - workspace.fields.len()
        );
    }

    if !workspace.has_field("name") {
        workspace.fields.insert(0, foundry_core::Field::text("name", "Name").required());
    }

    let field_names = workspace.field_names();
    if let Some(display_fields) = workspace.display_fields.as_mut() {
        display_fields.retain(|n| field_names.contains(n));
        if display_fields.is_empty() {
            workspace.display_fields = Some(vec!["name".to_string()]);
        }
    }
    for form in &mut workspace.forms {
        form.fields.retain(|n| field_names.contains(n));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use async_trait::async_trait;
    use serde_json::json;

    struct CannedCollaborator {
        output: serde_json::Value,
    }

    #[async_trait]
    impl SynthesisCollaborator for CannedCollaborator {
        async fn synthesize(
            &self,
            request: &SynthesisRequest,
        ) -> std::result::Result<serde_json::Value, CollaboratorError> {
            assert!(request.system_contract.contains("INITIAL model"));
            Ok(self.output.clone())
        }
    }

    async fn run(output: serde_json::Value) -> Result<AgentGraph> {
        let collaborator = CannedCollaborator { output };
        Synthesizer::new(&collaborator)
            .synthesize("Bot", "A bot", &[], &["x".to_string()])
            .await
    }

    #[tokio::test]
    async fn test_workspace_created_and_root_defaulted() {
        let graph = run(json!({
            "models": [{ "name": "Idea", "fields": [{ "name": "topic", "title": "Topic", "type": "text" }] }]
        }))
        .await
        .unwrap();

        assert_eq!(graph.root_model.as_deref(), Some("Idea"));
        let workspace = graph.model(WORKSPACE_MODEL).unwrap();
        assert_eq!(workspace.field_names(), vec!["name"]);
    }

    #[tokio::test]
    async fn test_collaborator_workspace_is_field_merged() {
        let graph = run(json!({
            "rootModel": "Idea",
            "models": [
                {
                    "name": "Workspace",
                    "fields": [
                        { "name": "brandVoice", "title": "Brand voice", "type": "text" },
                        { "name": "gmailAuth", "title": "Gmail", "type": "oauth" }
                    ],
                    "displayFields": ["gmailAuth"]
                },
                { "name": "Idea", "fields": [] }
            ]
        }))
        .await
        .unwrap();

        let workspace = graph.model(WORKSPACE_MODEL).unwrap();
        assert_eq!(workspace.field_names(), vec!["name", "brandVoice"]);
        assert_eq!(workspace.display_fields, Some(vec!["name".to_string()]));
    }

    #[tokio::test]
    async fn test_unparsable_output_is_synthesis_failure() {
        let result = run(json!({ "models": "lots" })).await;
        assert!(matches!(result, Err(CompileError::SynthesisFailure(_))));
    }

    #[tokio::test]
    async fn test_schema_invalid_output_is_synthesis_failure() {
        let result = run(json!({
            "models": [{ "name": "Idea", "fields": [{ "name": "mood", "title": "Mood", "type": "enum" }] }]
        }))
        .await;

        match result {
            Err(CompileError::SynthesisFailure(message)) => {
                assert!(message.contains("at least one value"))
            }
            other => panic!("expected synthesis failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_output_is_rejected() {
        let result = run(json!({ "models": [] })).await;
        assert!(matches!(result, Err(CompileError::SynthesisFailure(_))));
    }
}
