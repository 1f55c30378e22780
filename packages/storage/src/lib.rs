// ABOUTME: Durable store for compiled agents
// ABOUTME: Storage trait with one create call per entity, plus the SQLite implementation

use std::path::PathBuf;

use async_trait::async_trait;
use foundry_core::{
    constants, Action, AgentRecord, Connection, Field, HydratedGraph, Model, Schedule,
    ScheduleStep, Step,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod sqlite;

pub use sqlite::SqliteStore;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub enable_wal: bool,
    pub max_connections: u32,
    pub busy_timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: constants::database_file(),
            enable_wal: true,
            max_connections: 10,
            busy_timeout_seconds: 30,
        }
    }
}

impl StorageConfig {
    /// Default configuration with the database path overridable via `FOUNDRY_DATABASE_PATH`
    pub fn from_env() -> Self {
        match std::env::var(constants::FOUNDRY_DATABASE_PATH) {
            Ok(path) if !path.trim().is_empty() => Self {
                path: PathBuf::from(path),
                ..Self::default()
            },
            _ => Self::default(),
        }
    }
}

/// Input for creating an agent row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub root_model: Option<String>,
    pub connections: Vec<Connection>,
}

/// Partial agent update; `None` leaves the column untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentUpdate {
    pub description: Option<String>,
    pub root_model: Option<String>,
    pub connections: Option<Vec<Connection>>,
}

/// CRUD capability the compiler persists through. Every create returns a generated identifier.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn create_agent(&self, input: &NewAgent) -> StorageResult<AgentRecord>;
    async fn get_agent(&self, agent_id: &str) -> StorageResult<Option<AgentRecord>>;
    async fn list_agents(&self, owner_id: &str) -> StorageResult<Vec<AgentRecord>>;
    async fn update_agent(&self, agent_id: &str, update: &AgentUpdate) -> StorageResult<AgentRecord>;

    async fn create_model(&self, agent_id: &str, model: &Model) -> StorageResult<String>;
    /// Append fields that are not already on the model; existing fields are never removed
    async fn append_model_fields(&self, model_id: &str, fields: &[Field]) -> StorageResult<()>;

    /// Persist an action header; its steps are created separately, in order
    async fn create_action(
        &self,
        agent_id: &str,
        model_id: &str,
        action: &Action,
    ) -> StorageResult<String>;
    async fn create_step(
        &self,
        action_id: &str,
        position: u32,
        step: &Step,
        execution_ready: bool,
    ) -> StorageResult<String>;

    /// Persist a schedule header; its steps are created separately, in order
    async fn create_schedule(&self, agent_id: &str, schedule: &Schedule) -> StorageResult<String>;
    async fn create_schedule_step(
        &self,
        schedule_id: &str,
        model_id: &str,
        action_id: &str,
        step: &ScheduleStep,
    ) -> StorageResult<String>;

    /// Read the full graph of an agent back
    async fn load_graph(&self, agent_id: &str) -> StorageResult<Option<HydratedGraph>>;
}
