// ABOUTME: Entity schema and shared utilities for Foundry
// ABOUTME: Foundational package providing the agent graph types used across all Foundry packages

pub mod constants;
pub mod graph;
pub mod persisted;
pub mod types;
pub mod utils;
pub mod validation;

pub use graph::{AgentGraph, WORKSPACE_MODEL};
pub use persisted::{
    AgentRecord, HydratedGraph, PersistedAction, PersistedModel, PersistedSchedule,
    PersistedScheduleStep, PersistedStep,
};
pub use types::{
    Action, Cardinality, Connection, Field, FieldReference, FieldType, Form, FormKind, Model,
    Schedule, ScheduleMode, ScheduleStatus, ScheduleStep, Step, StepConfig, StepKind,
};
pub use utils::{generate_id, humanize, truncate};
pub use validation::{check_graph, SchemaError, SchemaViolation};
