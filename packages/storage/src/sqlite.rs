use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use foundry_core::{
    generate_id, Action, AgentRecord, Connection, Field, Form, HydratedGraph, Model,
    PersistedAction, PersistedModel, PersistedSchedule, PersistedScheduleStep, PersistedStep,
    Schedule, ScheduleMode, ScheduleStatus, ScheduleStep, Step, StepConfig,
};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use tracing::{debug, info};

use crate::{AgentStore, AgentUpdate, NewAgent, StorageConfig, StorageError, StorageResult};

/// SQLite implementation of AgentStore
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database described by `config` and run migrations
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!("Opening SQLite store at: {:?}", config.path);

        let journal_mode = if config.enable_wal {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        };

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(journal_mode)
            .busy_timeout(Duration::from_secs(config.busy_timeout_seconds));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.busy_timeout_seconds))
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Single-connection in-memory database, used by tests and dry runs
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // One connection that never expires, otherwise the database vanishes with it
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and bring its schema up to date
    pub async fn from_pool(pool: SqlitePool) -> StorageResult<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_agent(row: &SqliteRow) -> StorageResult<AgentRecord> {
        let connections_json: String = row.try_get("connections")?;
        let connections: Vec<Connection> = serde_json::from_str(&connections_json)?;

        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(AgentRecord {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            owner_id: row.try_get("owner_id")?,
            root_model: row.try_get("root_model")?,
            connections,
            created_at: parse_timestamp(&created_at, "created_at")?,
            updated_at: parse_timestamp(&updated_at, "updated_at")?,
        })
    }

    fn row_to_model(row: &SqliteRow) -> StorageResult<PersistedModel> {
        let fields_json: String = row.try_get("fields")?;
        let display_fields_json: Option<String> = row.try_get("display_fields")?;
        let forms_json: String = row.try_get("forms")?;

        let display_fields = match display_fields_json {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };
        let forms: Vec<Form> = serde_json::from_str(&forms_json)?;

        Ok(PersistedModel {
            id: row.try_get("id")?,
            model: Model {
                name: row.try_get("name")?,
                fields: serde_json::from_str(&fields_json)?,
                display_fields,
                forms,
            },
        })
    }

    fn row_to_step(row: &SqliteRow) -> StorageResult<PersistedStep> {
        let config_json: String = row.try_get("config")?;
        let input_json: String = row.try_get("input_fields")?;
        let output_json: String = row.try_get("output_fields")?;
        let config: StepConfig = serde_json::from_str(&config_json)?;

        Ok(PersistedStep {
            id: row.try_get("id")?,
            position: to_u32(row.try_get("position")?, "position")?,
            execution_ready: row.try_get::<i32, _>("execution_ready")? != 0,
            step: Step {
                name: row.try_get("name")?,
                description: row.try_get("description")?,
                input_fields: serde_json::from_str(&input_json)?,
                output_fields: serde_json::from_str(&output_json)?,
                config,
            },
        })
    }

    fn row_to_schedule_step(row: &SqliteRow) -> StorageResult<PersistedScheduleStep> {
        let query_json: String = row.try_get("query")?;

        Ok(PersistedScheduleStep {
            id: row.try_get("id")?,
            model_id: row.try_get("model_id")?,
            action_id: row.try_get("action_id")?,
            step: ScheduleStep {
                model_name: row.try_get("model_name")?,
                query: serde_json::from_str(&query_json)?,
                action_name: row.try_get("action_name")?,
                order: to_u32(row.try_get("execution_order")?, "execution_order")?,
            },
        })
    }

    async fn load_actions(&self, agent_id: &str) -> StorageResult<Vec<PersistedAction>> {
        let rows = sqlx::query(
            "SELECT a.id, a.model_id, a.name, a.title, a.emoji, a.description, m.name AS model_name
             FROM agent_actions a
             JOIN agent_models m ON m.id = a.model_id
             WHERE a.agent_id = ?
             ORDER BY a.created_at ASC, a.rowid ASC",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        let mut actions = Vec::with_capacity(rows.len());
        for row in rows {
            let action_id: String = row.try_get("id")?;
            let steps = sqlx::query(
                "SELECT id, position, name, description, config, input_fields, output_fields, execution_ready
                 FROM action_steps
                 WHERE action_id = ?
                 ORDER BY position ASC",
            )
            .bind(&action_id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(Self::row_to_step)
            .collect::<StorageResult<Vec<_>>>()?;

            actions.push(PersistedAction {
                id: action_id,
                model_id: row.try_get("model_id")?,
                name: row.try_get("name")?,
                title: row.try_get("title")?,
                emoji: row.try_get("emoji")?,
                description: row.try_get("description")?,
                target_model: row.try_get("model_name")?,
                steps,
            });
        }

        Ok(actions)
    }

    async fn load_schedules(&self, agent_id: &str) -> StorageResult<Vec<PersistedSchedule>> {
        let rows = sqlx::query(
            "SELECT id, name, description, mode, interval_hours, status
             FROM agent_schedules
             WHERE agent_id = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        let mut schedules = Vec::with_capacity(rows.len());
        for row in rows {
            let schedule_id: String = row.try_get("id")?;
            let steps = sqlx::query(
                "SELECT s.id, s.model_id, s.action_id, s.query, s.execution_order,
                        m.name AS model_name, a.name AS action_name
                 FROM schedule_steps s
                 JOIN agent_models m ON m.id = s.model_id
                 JOIN agent_actions a ON a.id = s.action_id
                 WHERE s.schedule_id = ?
                 ORDER BY s.execution_order ASC",
            )
            .bind(&schedule_id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(Self::row_to_schedule_step)
            .collect::<StorageResult<Vec<_>>>()?;

            let mode: String = row.try_get("mode")?;
            let status: String = row.try_get("status")?;
            let interval_hours: Option<i64> = row.try_get("interval_hours")?;

            schedules.push(PersistedSchedule {
                id: schedule_id,
                name: row.try_get("name")?,
                description: row.try_get("description")?,
                mode: parse_mode(&mode)?,
                interval_hours: interval_hours
                    .map(|hours| to_u32(hours, "interval_hours"))
                    .transpose()?,
                status: parse_status(&status)?,
                steps,
            });
        }

        Ok(schedules)
    }
}

fn parse_timestamp(value: &str, column: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| StorageError::Database(format!("Invalid {} timestamp", column)))
}

fn to_u32(value: i64, column: &str) -> StorageResult<u32> {
    u32::try_from(value)
        .map_err(|_| StorageError::Database(format!("Out of range {} value: {}", column, value)))
}

fn mode_to_string(mode: ScheduleMode) -> &'static str {
    match mode {
        ScheduleMode::Once => "once",
        ScheduleMode::Recurring => "recurring",
    }
}

fn parse_mode(value: &str) -> StorageResult<ScheduleMode> {
    match value {
        "once" => Ok(ScheduleMode::Once),
        "recurring" => Ok(ScheduleMode::Recurring),
        other => Err(StorageError::Database(format!("Unknown schedule mode: {}", other))),
    }
}

fn status_to_string(status: ScheduleStatus) -> &'static str {
    match status {
        ScheduleStatus::Active => "active",
        ScheduleStatus::Paused => "paused",
    }
}

fn parse_status(value: &str) -> StorageResult<ScheduleStatus> {
    match value {
        "active" => Ok(ScheduleStatus::Active),
        "paused" => Ok(ScheduleStatus::Paused),
        other => Err(StorageError::Database(format!("Unknown schedule status: {}", other))),
    }
}

const AGENT_COLUMNS: &str =
    "id, name, description, owner_id, root_model, connections, created_at, updated_at";

#[async_trait]
impl AgentStore for SqliteStore {
    async fn create_agent(&self, input: &NewAgent) -> StorageResult<AgentRecord> {
        if input.name.trim().is_empty() {
            return Err(StorageError::InvalidInput("Agent name is required".to_string()));
        }

        let id = generate_id();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO agents (id, name, description, owner_id, root_model, connections, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.owner_id)
        .bind(&input.root_model)
        .bind(serde_json::to_string(&input.connections)?)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!("Created agent {} ({})", input.name, id);

        Ok(AgentRecord {
            id,
            name: input.name.clone(),
            description: input.description.clone(),
            owner_id: input.owner_id.clone(),
            root_model: input.root_model.clone(),
            connections: input.connections.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_agent(&self, agent_id: &str) -> StorageResult<Option<AgentRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM agents WHERE id = ?", AGENT_COLUMNS))
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_agent).transpose()
    }

    async fn list_agents(&self, owner_id: &str) -> StorageResult<Vec<AgentRecord>> {
        sqlx::query(&format!(
            "SELECT {} FROM agents WHERE owner_id = ? ORDER BY created_at DESC",
            AGENT_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(Self::row_to_agent)
        .collect()
    }

    async fn update_agent(&self, agent_id: &str, update: &AgentUpdate) -> StorageResult<AgentRecord> {
        let mut agent = self
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "Agent",
                id: agent_id.to_string(),
            })?;

        if let Some(description) = &update.description {
            agent.description = description.clone();
        }
        if let Some(root_model) = &update.root_model {
            agent.root_model = Some(root_model.clone());
        }
        if let Some(connections) = &update.connections {
            agent.connections = connections.clone();
        }
        agent.updated_at = Utc::now();

        sqlx::query(
            "UPDATE agents SET description = ?, root_model = ?, connections = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&agent.description)
        .bind(&agent.root_model)
        .bind(serde_json::to_string(&agent.connections)?)
        .bind(agent.updated_at.to_rfc3339())
        .bind(agent_id)
        .execute(&self.pool)
        .await?;

        Ok(agent)
    }

    async fn create_model(&self, agent_id: &str, model: &Model) -> StorageResult<String> {
        let id = generate_id();
        let display_fields = model
            .display_fields
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT INTO agent_models (id, agent_id, name, fields, display_fields, forms, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(agent_id)
        .bind(&model.name)
        .bind(serde_json::to_string(&model.fields)?)
        .bind(display_fields)
        .bind(serde_json::to_string(&model.forms)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!("Created model {} ({}) with {} fields", model.name, id, model.fields.len());
        Ok(id)
    }

    async fn append_model_fields(&self, model_id: &str, fields: &[Field]) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT fields FROM agent_models WHERE id = ?")
            .bind(model_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "Model",
                id: model_id.to_string(),
            })?;

        let fields_json: String = row.try_get("fields")?;
        let mut existing: Vec<Field> = serde_json::from_str(&fields_json)?;
        let mut appended = 0;
        for field in fields {
            if !existing.iter().any(|f| f.name == field.name) {
                existing.push(field.clone());
                appended += 1;
            }
        }

        if appended > 0 {
            sqlx::query("UPDATE agent_models SET fields = ? WHERE id = ?")
                .bind(serde_json::to_string(&existing)?)
                .bind(model_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!("Appended {} fields to model {}", appended, model_id);
        Ok(())
    }

    async fn create_action(
        &self,
        agent_id: &str,
        model_id: &str,
        action: &Action,
    ) -> StorageResult<String> {
        let id = generate_id();

        sqlx::query(
            "INSERT INTO agent_actions (id, agent_id, model_id, name, title, emoji, description, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(agent_id)
        .bind(model_id)
        .bind(&action.name)
        .bind(&action.title)
        .bind(&action.emoji)
        .bind(&action.description)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!("Created action {} ({}) on model {}", action.name, id, model_id);
        Ok(id)
    }

    async fn create_step(
        &self,
        action_id: &str,
        position: u32,
        step: &Step,
        execution_ready: bool,
    ) -> StorageResult<String> {
        let id = generate_id();

        sqlx::query(
            "INSERT INTO action_steps (id, action_id, position, name, description, kind, config, input_fields, output_fields, execution_ready, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(action_id)
        .bind(i64::from(position))
        .bind(&step.name)
        .bind(&step.description)
        .bind(step.kind().as_str())
        .bind(serde_json::to_string(&step.config)?)
        .bind(serde_json::to_string(&step.input_fields)?)
        .bind(serde_json::to_string(&step.output_fields)?)
        .bind(i32::from(execution_ready))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn create_schedule(&self, agent_id: &str, schedule: &Schedule) -> StorageResult<String> {
        let id = generate_id();

        sqlx::query(
            "INSERT INTO agent_schedules (id, agent_id, name, description, mode, interval_hours, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(agent_id)
        .bind(&schedule.name)
        .bind(&schedule.description)
        .bind(mode_to_string(schedule.mode))
        .bind(schedule.interval_hours.map(i64::from))
        .bind(status_to_string(schedule.status))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!("Created schedule {} ({})", schedule.name, id);
        Ok(id)
    }

    async fn create_schedule_step(
        &self,
        schedule_id: &str,
        model_id: &str,
        action_id: &str,
        step: &ScheduleStep,
    ) -> StorageResult<String> {
        let id = generate_id();

        sqlx::query(
            "INSERT INTO schedule_steps (id, schedule_id, model_id, action_id, query, execution_order, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(schedule_id)
        .bind(model_id)
        .bind(action_id)
        .bind(serde_json::to_string(&step.query)?)
        .bind(i64::from(step.order))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn load_graph(&self, agent_id: &str) -> StorageResult<Option<HydratedGraph>> {
        let Some(agent) = self.get_agent(agent_id).await? else {
            return Ok(None);
        };

        let models = sqlx::query(
            "SELECT id, name, fields, display_fields, forms
             FROM agent_models
             WHERE agent_id = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(Self::row_to_model)
        .collect::<StorageResult<Vec<_>>>()?;

        let actions = self.load_actions(agent_id).await?;
        let schedules = self.load_schedules(agent_id).await?;

        Ok(Some(HydratedGraph {
            agent,
            models,
            actions,
            schedules,
        }))
    }
}
