// ABOUTME: Interfaces of the external generative collaborators
// ABOUTME: Graph synthesis and custom step code generation, injected into the compiler

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::types::FeatureInput;

/// One structured-generation request for a whole agent graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    /// Hard domain rules the collaborator must satisfy
    pub system_contract: String,
    pub name: String,
    pub description: String,
    pub feature_inputs: Vec<FeatureInput>,
    pub permitted_connections: Vec<String>,
}

/// Expands a short feature description into an entity graph.
/// The returned JSON is checked against the entity schema before use.
#[async_trait]
pub trait SynthesisCollaborator: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<serde_json::Value, CollaboratorError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeGenerationRequest {
    pub step_name: String,
    pub description: String,
    pub input_fields: Vec<String>,
    pub output_fields: Vec<String>,
    /// Target model of the step's action
    pub model_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCode {
    pub code: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub env_vars: Vec<String>,
}

/// Produces code for a custom code step. Failures are non-fatal to the pipeline.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(&self, request: &CodeGenerationRequest) -> Result<GeneratedCode, CollaboratorError>;
}
