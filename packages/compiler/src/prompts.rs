// ABOUTME: Prompts for the Anthropic-backed collaborators
// ABOUTME: System contract for graph synthesis and the custom step code generation prompt

use crate::collaborators::{CodeGenerationRequest, SynthesisRequest};

/// Hard domain rules every synthesized agent graph must satisfy
pub const SYNTHESIS_SYSTEM_CONTRACT: &str = r#"You design automation agents as typed entity graphs: models, actions and schedules.

Hard constraints. Output that breaks any of them is rejected:
1. Exactly one INITIAL model acts as the factory users fill in first. Set "rootModel" to its name.
   Every other model that the agent generates records into is a CHILD model with a single-valued
   reference field back to the initial model: {"type": "reference", "reference": {"model": "<Initial>", "cardinality": "one"}}.
2. "displayFields" may only name fields that exist on the same model. Never invent names.
3. Every form is typed. A "new" form creates a record and must not list derived or automatic fields.
   An "edit" form updates a narrow subset of fields and is never used to create records.
4. Only use external services listed in the permitted connections. Anything else becomes a generic
   custom_code step that calls a webhook.
5. A workflow that publishes AI-generated images to a platform needs TWO steps: an image_generation
   step (no credentials) followed by a custom_code step whose description names the platform
   (for example "Post the image to X").
6. Field types: text, number, boolean, date, reference, enum, image_url, oauth. Enum fields list
   at least one value in "enumValues".
7. Step kinds: reasoning {prompt}, web_search {query}, custom_code {}, image_generation {prompt}.
   Every step lists "inputFields" and "outputFields" as field names of the action's target model.
8. Schedules: "mode" is "once" or "recurring"; recurring schedules carry "intervalHours" >= 1.
   Every schedule step names an existing model and an action that targets that model.
9. Credentials live on a "Workspace" model. You may omit it; it is completed for you.

Respond with ONE JSON object and nothing else:
{
  "rootModel": "string",
  "models": [{"name": "string", "fields": [{"name": "string", "title": "string", "type": "text", "required": false}], "displayFields": ["string"], "forms": [{"name": "string", "title": "string", "kind": "new", "fields": ["string"]}]}],
  "actions": [{"name": "camelCase", "title": "string", "emoji": "single emoji", "description": "string", "targetModel": "string", "steps": [{"name": "string", "description": "string", "kind": "reasoning", "prompt": "string", "inputFields": [], "outputFields": []}]}],
  "schedules": [{"name": "string", "mode": "recurring", "intervalHours": 24, "steps": [{"modelName": "string", "query": {}, "actionName": "string", "order": 0}]}]
}"#;

/// User prompt for one synthesis call
pub fn synthesis_prompt(request: &SynthesisRequest) -> String {
    let features = if request.feature_inputs.is_empty() {
        "(none listed, derive them from the description)".to_string()
    } else {
        request
            .feature_inputs
            .iter()
            .enumerate()
            .map(|(i, f)| {
                format!(
                    "{}. {}\n   User provides: {}\n   AI should: {}",
                    i + 1,
                    f.description,
                    f.user_provides,
                    f.ai_should
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let connections = if request.permitted_connections.is_empty() {
        "none".to_string()
    } else {
        request.permitted_connections.join(", ")
    };

    format!(
        r#"Design the agent "{}".

Description:
{}

Features:
{}

Permitted connections: {}

Return the complete entity graph as JSON."#,
        request.name, request.description, features, connections
    )
}

pub const CODE_GENERATION_SYSTEM_PROMPT: &str = r#"You write small, self-contained TypeScript functions for agent workflow steps.

The function receives an object with the listed input fields and the available credentials,
and returns an object with exactly the listed output fields.
Use fetch for HTTP calls. Read secrets from environment variables, never hard-code them.

Respond with ONE JSON object and nothing else:
{"code": "string", "dependencies": ["npm package names"], "envVars": ["ENV_VAR_NAMES"]}"#;

pub fn code_generation_prompt(request: &CodeGenerationRequest) -> String {
    format!(
        r#"Write the code for step "{}" on model "{}".

What it does:
{}

Input fields: {}
Output fields: {}"#,
        request.step_name,
        request.model_name,
        request.description,
        list_or_none(&request.input_fields),
        list_or_none(&request.output_fields)
    )
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureInput;

    #[test]
    fn test_synthesis_prompt_lists_features_and_connections() {
        let request = SynthesisRequest {
            system_contract: SYNTHESIS_SYSTEM_CONTRACT.to_string(),
            name: "Tip Bot".to_string(),
            description: "Daily tips".to_string(),
            feature_inputs: vec![FeatureInput {
                description: "Post a daily tip image to X".to_string(),
                user_provides: "topic".to_string(),
                ai_should: "generate an image and post to X".to_string(),
            }],
            permitted_connections: vec!["x".to_string()],
        };

        let prompt = synthesis_prompt(&request);
        assert!(prompt.contains("\"Tip Bot\""));
        assert!(prompt.contains("1. Post a daily tip image to X"));
        assert!(prompt.contains("User provides: topic"));
        assert!(prompt.contains("Permitted connections: x"));
    }

    #[test]
    fn test_code_generation_prompt() {
        let prompt = code_generation_prompt(&CodeGenerationRequest {
            step_name: "publish".to_string(),
            description: "Post the image to X".to_string(),
            input_fields: vec!["tipImage".to_string()],
            output_fields: vec![],
            model_name: "TipIdea".to_string(),
        });
        assert!(prompt.contains("step \"publish\" on model \"TipIdea\""));
        assert!(prompt.contains("Input fields: tipImage"));
        assert!(prompt.contains("Output fields: none"));
    }
}
