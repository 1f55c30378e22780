// ABOUTME: Integration tests for the SQLite agent store
// ABOUTME: Exercises create calls per entity, field appends and full graph read-back

use foundry_core::{
    Action, Connection, Field, FieldType, Model, Schedule, ScheduleStep, Step, StepConfig,
};
use foundry_storage::{AgentStore, AgentUpdate, NewAgent, SqliteStore, StorageConfig, StorageError};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// Test Setup
// ============================================================================

async fn setup_store() -> SqliteStore {
    SqliteStore::in_memory().await.unwrap()
}

fn new_agent(owner: &str) -> NewAgent {
    NewAgent {
        name: "Tip Bot".to_string(),
        description: "Posts daily tips".to_string(),
        owner_id: owner.to_string(),
        root_model: None,
        connections: vec![],
    }
}

fn idea_model() -> Model {
    Model::new(
        "TipIdea",
        vec![Field::text("topic", "Topic").required(), Field::text("tone", "Tone")],
    )
    .with_display_fields(&["topic"])
}

fn post_action() -> Action {
    Action {
        name: "postToX".to_string(),
        title: "Post to X".to_string(),
        emoji: "🐦".to_string(),
        description: "Generate an image and post it".to_string(),
        target_model: "TipIdea".to_string(),
        steps: vec![
            Step {
                name: "makeImage".to_string(),
                description: "Generate a tip image".to_string(),
                input_fields: vec!["topic".to_string()],
                output_fields: vec!["tipImage".to_string()],
                config: StepConfig::ImageGeneration {
                    prompt: "An illustration about {{topic}}".to_string(),
                    aspect_ratio: None,
                },
            },
            Step {
                name: "publish".to_string(),
                description: "Post the image to X".to_string(),
                input_fields: vec!["tipImage".to_string()],
                output_fields: vec!["postUrl".to_string()],
                config: StepConfig::empty_custom_code(),
            },
        ],
    }
}

// ============================================================================
// Agents
// ============================================================================

#[tokio::test]
async fn test_create_and_get_agent() {
    let store = setup_store().await;

    let created = store.create_agent(&new_agent("user-1")).await.unwrap();
    assert_eq!(created.id.len(), 8);

    let fetched = store.get_agent(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.name, "Tip Bot");
    assert_eq!(fetched.owner_id, "user-1");
    assert!(fetched.connections.is_empty());

    assert!(store.get_agent("missing1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_agent_requires_name() {
    let store = setup_store().await;
    let mut input = new_agent("user-1");
    input.name = "  ".to_string();

    let result = store.create_agent(&input).await;
    assert!(matches!(result, Err(StorageError::InvalidInput(_))));
}

#[tokio::test]
async fn test_list_agents_filters_by_owner() {
    let store = setup_store().await;
    store.create_agent(&new_agent("alice")).await.unwrap();
    store.create_agent(&new_agent("alice")).await.unwrap();
    store.create_agent(&new_agent("bob")).await.unwrap();

    assert_eq!(store.list_agents("alice").await.unwrap().len(), 2);
    assert_eq!(store.list_agents("bob").await.unwrap().len(), 1);
    assert!(store.list_agents("carol").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_agent_sets_root_model_and_connections() {
    let store = setup_store().await;
    let agent = store.create_agent(&new_agent("user-1")).await.unwrap();

    let connection = Connection {
        provider: "x".to_string(),
        title: "X (Twitter)".to_string(),
        scopes: vec!["tweet.write".to_string()],
        field_name: "xAuth".to_string(),
    };
    let updated = store
        .update_agent(
            &agent.id,
            &AgentUpdate {
                root_model: Some("TipIdea".to_string()),
                connections: Some(vec![connection.clone()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.root_model.as_deref(), Some("TipIdea"));
    assert_eq!(updated.description, "Posts daily tips");

    let fetched = store.get_agent(&agent.id).await.unwrap().unwrap();
    assert_eq!(fetched.connections, vec![connection]);
}

#[tokio::test]
async fn test_update_missing_agent_is_not_found() {
    let store = setup_store().await;
    let result = store.update_agent("missing1", &AgentUpdate::default()).await;
    assert!(matches!(result, Err(StorageError::NotFound { entity: "Agent", .. })));
}

// ============================================================================
// Entities
// ============================================================================

#[tokio::test]
async fn test_append_model_fields_skips_existing_names() {
    let store = setup_store().await;
    let agent = store.create_agent(&new_agent("user-1")).await.unwrap();
    let model_id = store.create_model(&agent.id, &idea_model()).await.unwrap();

    let mut derived = Field::text("tipImage", "Tip Image");
    derived.derived = true;
    store
        .append_model_fields(&model_id, &[Field::text("topic", "Topic"), derived.clone()])
        .await
        .unwrap();
    // Second append is a no-op
    store.append_model_fields(&model_id, &[derived]).await.unwrap();

    let graph = store.load_graph(&agent.id).await.unwrap().unwrap();
    let names = graph.models[0].model.field_names();
    assert_eq!(names, vec!["topic", "tone", "tipImage"]);
    assert!(graph.models[0].model.field("tipImage").unwrap().derived);
}

#[tokio::test]
async fn test_append_to_missing_model_is_not_found() {
    let store = setup_store().await;
    let result = store.append_model_fields("missing1", &[]).await;
    assert!(matches!(result, Err(StorageError::NotFound { entity: "Model", .. })));
}

#[tokio::test]
async fn test_action_requires_existing_model() {
    let store = setup_store().await;
    let agent = store.create_agent(&new_agent("user-1")).await.unwrap();

    // Foreign keys are enforced
    let result = store.create_action(&agent.id, "nomodel1", &post_action()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_load_graph_round_trip() {
    let store = setup_store().await;
    let agent = store.create_agent(&new_agent("user-1")).await.unwrap();

    let idea_id = store.create_model(&agent.id, &idea_model()).await.unwrap();
    let workspace = Model::new(
        "Workspace",
        vec![
            Field::text("name", "Name"),
            Field::new("xAuth", "X (Twitter)", FieldType::Oauth),
        ],
    )
    .with_display_fields(&["name"]);
    store.create_model(&agent.id, &workspace).await.unwrap();

    let action = post_action();
    let action_id = store.create_action(&agent.id, &idea_id, &action).await.unwrap();
    for (position, step) in action.steps.iter().enumerate() {
        store
            .create_step(&action_id, position as u32, step, step.is_execution_ready())
            .await
            .unwrap();
    }

    let mut schedule_step = ScheduleStep::new("TipIdea", "postToX", 0);
    schedule_step.query = json!({ "tone": "fun" });
    let schedule = Schedule::recurring("Daily tip", 24, vec![schedule_step.clone()]).unwrap();
    let schedule_id = store.create_schedule(&agent.id, &schedule).await.unwrap();
    store
        .create_schedule_step(&schedule_id, &idea_id, &action_id, &schedule_step)
        .await
        .unwrap();

    let hydrated = store.load_graph(&agent.id).await.unwrap().unwrap();

    assert_eq!(hydrated.models.len(), 2);
    assert_eq!(hydrated.model("TipIdea").unwrap().id, idea_id);
    assert_eq!(hydrated.model("TipIdea").unwrap().model, idea_model());

    let loaded_action = hydrated.action("postToX").unwrap();
    assert_eq!(loaded_action.id, action_id);
    assert_eq!(loaded_action.target_model, "TipIdea");
    assert_eq!(loaded_action.to_action(), action);
    let readiness: Vec<bool> = loaded_action.steps.iter().map(|s| s.execution_ready).collect();
    assert_eq!(readiness, vec![true, false]);

    let loaded_schedule = hydrated.schedule("Daily tip").unwrap();
    assert_eq!(loaded_schedule.to_schedule(), schedule);
    assert_eq!(loaded_schedule.steps[0].model_id, idea_id);
    assert_eq!(loaded_schedule.steps[0].action_id, action_id);

    assert_eq!(hydrated.to_graph().model_names(), vec!["TipIdea", "Workspace"]);
}

#[tokio::test]
async fn test_load_graph_for_missing_agent() {
    let store = setup_store().await;
    assert!(store.load_graph("missing1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_file_backed_store_persists_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let config = StorageConfig {
        path: temp_dir.path().join("nested").join("foundry.db"),
        ..Default::default()
    };

    let agent_id = {
        let store = SqliteStore::new(config.clone()).await.unwrap();
        let agent = store.create_agent(&new_agent("user-1")).await.unwrap();
        store.create_model(&agent.id, &idea_model()).await.unwrap();
        store.pool().close().await;
        agent.id
    };

    let reopened = SqliteStore::new(config).await.unwrap();
    let graph = reopened.load_graph(&agent_id).await.unwrap().unwrap();
    assert_eq!(graph.agent.name, "Tip Bot");
    assert_eq!(graph.models.len(), 1);
}
