// ABOUTME: Shared fixtures for compiler integration tests
// ABOUTME: Fake collaborators, a call-recording store and the Tip Bot graph

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use foundry_compiler::{
    CodeGenerationRequest, CodeGenerator, CollaboratorError, CompileInput, Compiler,
    CompilerConfig, GeneratedCode, SynthesisCollaborator, SynthesisRequest,
};
use foundry_core::{
    Action, AgentGraph, AgentRecord, Field, HydratedGraph, Model, Schedule, ScheduleStep, Step,
};
use foundry_storage::{
    AgentStore, AgentUpdate, NewAgent, SqliteStore, StorageError, StorageResult,
};
use serde_json::json;

pub const OWNER: &str = "user-1";

// ============================================================================
// Fake collaborators
// ============================================================================

/// Returns a canned JSON document and remembers every request
pub struct FakeSynthesizer {
    output: serde_json::Value,
    pub requests: Mutex<Vec<SynthesisRequest>>,
}

impl FakeSynthesizer {
    pub fn new(output: serde_json::Value) -> Self {
        Self {
            output,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SynthesisCollaborator for FakeSynthesizer {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<serde_json::Value, CollaboratorError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.output.clone())
    }
}

pub struct FakeCodeGenerator {
    fail: bool,
    pub calls: AtomicUsize,
}

impl FakeCodeGenerator {
    pub fn working() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeGenerator for FakeCodeGenerator {
    async fn generate(&self, request: &CodeGenerationRequest) -> Result<GeneratedCode, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CollaboratorError::Unavailable("deploy service down".to_string()));
        }
        Ok(GeneratedCode {
            code: format!("export default async function {}() {{ return {{}}; }}", request.step_name),
            dependencies: vec![],
            env_vars: vec!["X_API_TOKEN".to_string()],
        })
    }
}

// ============================================================================
// Recording store
// ============================================================================

/// SQLite store that logs every write call, can slow model writes down
/// and can refuse action writes
pub struct RecordingStore {
    inner: SqliteStore,
    events: Mutex<Vec<String>>,
    model_delay: Mutex<Option<Duration>>,
    fail_actions: AtomicBool,
}

impl RecordingStore {
    pub async fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteStore::in_memory().await.unwrap(),
            events: Mutex::new(Vec::new()),
            model_delay: Mutex::new(None),
            fail_actions: AtomicBool::new(false),
        })
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn slow_down_models(&self, delay: Duration) {
        *self.model_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_action_writes(&self) {
        self.fail_actions.store(true, Ordering::SeqCst);
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    async fn maybe_delay(&self) {
        let delay = *self.model_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl AgentStore for RecordingStore {
    async fn create_agent(&self, input: &NewAgent) -> StorageResult<AgentRecord> {
        self.record(format!("agent:{}", input.name));
        self.inner.create_agent(input).await
    }

    async fn get_agent(&self, agent_id: &str) -> StorageResult<Option<AgentRecord>> {
        self.inner.get_agent(agent_id).await
    }

    async fn list_agents(&self, owner_id: &str) -> StorageResult<Vec<AgentRecord>> {
        self.inner.list_agents(owner_id).await
    }

    async fn update_agent(&self, agent_id: &str, update: &AgentUpdate) -> StorageResult<AgentRecord> {
        self.record("update_agent".to_string());
        self.inner.update_agent(agent_id, update).await
    }

    async fn create_model(&self, agent_id: &str, model: &Model) -> StorageResult<String> {
        self.maybe_delay().await;
        self.record(format!("model:{}", model.name));
        self.inner.create_model(agent_id, model).await
    }

    async fn append_model_fields(&self, model_id: &str, fields: &[Field]) -> StorageResult<()> {
        self.maybe_delay().await;
        self.record(format!("append:{}", model_id));
        self.inner.append_model_fields(model_id, fields).await
    }

    async fn create_action(&self, agent_id: &str, model_id: &str, action: &Action) -> StorageResult<String> {
        self.record(format!("action:{}", action.name));
        if self.fail_actions.load(Ordering::SeqCst) {
            return Err(StorageError::Database("disk full".to_string()));
        }
        self.inner.create_action(agent_id, model_id, action).await
    }

    async fn create_step(
        &self,
        action_id: &str,
        position: u32,
        step: &Step,
        execution_ready: bool,
    ) -> StorageResult<String> {
        self.record(format!("step:{}:{}", action_id, position));
        self.inner
            .create_step(action_id, position, step, execution_ready)
            .await
    }

    async fn create_schedule(&self, agent_id: &str, schedule: &Schedule) -> StorageResult<String> {
        self.record(format!("schedule:{}", schedule.name));
        self.inner.create_schedule(agent_id, schedule).await
    }

    async fn create_schedule_step(
        &self,
        schedule_id: &str,
        model_id: &str,
        action_id: &str,
        step: &ScheduleStep,
    ) -> StorageResult<String> {
        self.record(format!("schedule_step:{}:{}", schedule_id, step.order));
        self.inner
            .create_schedule_step(schedule_id, model_id, action_id, step)
            .await
    }

    async fn load_graph(&self, agent_id: &str) -> StorageResult<Option<HydratedGraph>> {
        self.inner.load_graph(agent_id).await
    }
}

pub fn compiler_for(store: &Arc<RecordingStore>) -> Compiler {
    Compiler::new(store.clone(), CompilerConfig::default())
}

// ============================================================================
// Fixtures
// ============================================================================

/// What a well-behaved collaborator returns for the Tip Bot request
pub fn tip_bot_graph_json() -> serde_json::Value {
    json!({
        "rootModel": "TipIdea",
        "models": [
            {
                "name": "TipIdea",
                "fields": [
                    { "name": "topic", "title": "Topic", "type": "text", "required": true },
                    { "name": "tone", "title": "Tone", "type": "enum", "enumValues": ["fun", "serious"] }
                ],
                "forms": [
                    { "name": "newIdea", "title": "New tip idea", "kind": "new", "fields": ["topic", "tone"] }
                ]
            },
            {
                "name": "TipPost",
                "fields": [
                    { "name": "caption", "title": "Caption", "type": "text" },
                    { "name": "image", "title": "Image", "type": "image_url" },
                    {
                        "name": "idea",
                        "title": "Idea",
                        "type": "reference",
                        "reference": { "model": "TipIdea", "cardinality": "one" }
                    }
                ],
                "displayFields": ["caption"]
            }
        ],
        "actions": [
            {
                "name": "postToX",
                "title": "Post to X",
                "emoji": "🐦",
                "description": "Generate a tip image and post it",
                "targetModel": "TipIdea",
                "steps": [
                    {
                        "name": "makeImage",
                        "description": "Generate a tip image about the topic",
                        "kind": "image_generation",
                        "prompt": "A friendly illustration about {{topic}}",
                        "inputFields": ["topic"],
                        "outputFields": ["tipImage"]
                    },
                    {
                        "name": "publish",
                        "description": "Post the generated image to X",
                        "kind": "custom_code",
                        "inputFields": ["tipImage"],
                        "outputFields": ["postUrl"]
                    }
                ]
            }
        ],
        "schedules": [
            {
                "name": "Daily tip",
                "mode": "recurring",
                "intervalHours": 24,
                "steps": [
                    { "modelName": "TipIdea", "query": { "tone": "fun" }, "actionName": "postToX", "order": 0 }
                ]
            }
        ]
    })
}

pub fn tip_bot_graph() -> AgentGraph {
    serde_json::from_value(tip_bot_graph_json()).unwrap()
}

pub fn features_input() -> CompileInput {
    serde_json::from_value(json!({
        "name": "Tip Bot",
        "description": "Posts a daily tip",
        "ownerId": OWNER,
        "mode": "features",
        "featureInputs": [{
            "description": "Post a daily tip image to X",
            "userProvides": "topic",
            "aiShould": "generate an image and post to X"
        }],
        "connections": ["x"]
    }))
    .unwrap()
}

pub fn graph_input(graph: AgentGraph) -> CompileInput {
    CompileInput {
        name: "Tip Bot".to_string(),
        description: "Posts a daily tip".to_string(),
        owner_id: OWNER.to_string(),
        source: foundry_compiler::AgentSource::Graph { graph },
    }
}

/// Index of the first event starting with `prefix`
pub fn first_index(events: &[String], prefix: &str) -> Option<usize> {
    events.iter().position(|e| e.starts_with(prefix))
}

/// Index of the last event starting with `prefix`
pub fn last_index(events: &[String], prefix: &str) -> Option<usize> {
    events.iter().rposition(|e| e.starts_with(prefix))
}
