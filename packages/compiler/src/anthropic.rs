// ABOUTME: Anthropic-backed implementations of the compiler collaborators
// ABOUTME: Graph synthesis and custom step code generation through foundry-ai

use async_trait::async_trait;
use foundry_ai::AIService;
use tracing::{debug, info};

use crate::collaborators::{
    CodeGenerationRequest, CodeGenerator, GeneratedCode, SynthesisCollaborator, SynthesisRequest,
};
use crate::error::CollaboratorError;
use crate::prompts;

pub struct AnthropicSynthesizer {
    ai_service: AIService,
}

impl AnthropicSynthesizer {
    pub fn new(ai_service: AIService) -> Self {
        Self { ai_service }
    }
}

#[async_trait]
impl SynthesisCollaborator for AnthropicSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<serde_json::Value, CollaboratorError> {
        if !self.ai_service.has_api_key() {
            return Err(CollaboratorError::Unavailable(
                "ANTHROPIC_API_KEY is not configured".to_string(),
            ));
        }

        let response = self
            .ai_service
            .generate_structured::<serde_json::Value>(
                prompts::synthesis_prompt(request),
                Some(request.system_contract.clone()),
            )
            .await?;

        info!(
            "Synthesis used {} tokens ({})",
            response.usage.total_tokens(),
            self.ai_service.model()
        );
        Ok(response.data)
    }
}

pub struct AnthropicCodeGenerator {
    ai_service: AIService,
}

impl AnthropicCodeGenerator {
    pub fn new(ai_service: AIService) -> Self {
        Self { ai_service }
    }
}

#[async_trait]
impl CodeGenerator for AnthropicCodeGenerator {
    async fn generate(&self, request: &CodeGenerationRequest) -> Result<GeneratedCode, CollaboratorError> {
        if !self.ai_service.has_api_key() {
            return Err(CollaboratorError::Unavailable(
                "ANTHROPIC_API_KEY is not configured".to_string(),
            ));
        }

        let response = self
            .ai_service
            .generate_structured::<GeneratedCode>(
                prompts::code_generation_prompt(request),
                Some(prompts::CODE_GENERATION_SYSTEM_PROMPT.to_string()),
            )
            .await?;

        if response.data.code.trim().is_empty() {
            return Err(CollaboratorError::Rejected(format!(
                "no code returned for step '{}'",
                request.step_name
            )));
        }

        debug!(
            "Generated {} bytes of code for step '{}'",
            response.data.code.len(),
            request.step_name
        );
        Ok(response.data)
    }
}
