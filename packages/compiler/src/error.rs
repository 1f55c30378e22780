// ABOUTME: Error and warning types for the agent compiler
// ABOUTME: Fatal compile errors, non-fatal warnings and collaborator failures

use std::fmt;
use std::time::Duration;

use foundry_ai::AIServiceError;
use foundry_core::SchemaError;
use foundry_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

/// One name that failed to resolve (or collided) within the applicable graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceIssue {
    /// Entity that holds the bad reference, e.g. `schedule 'Daily tip'.steps[0]`
    pub path: String,
    pub message: String,
    /// Exact names the reference could have matched, sorted
    pub candidates: Vec<String>,
}

impl ReferenceIssue {
    /// `what` named `name` does not exist; lists every valid alternative
    pub fn unresolved(path: impl Into<String>, what: &str, name: &str, candidates: Vec<String>) -> Self {
        let message = if candidates.is_empty() {
            format!("{} '{}' does not exist; no {}s are defined", what, name, what)
        } else {
            format!(
                "{} '{}' does not exist; valid {}s: {}",
                what,
                name,
                what,
                candidates.join(", ")
            )
        };
        Self {
            path: path.into(),
            message,
            candidates,
        }
    }

    pub fn conflict(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            candidates: Vec::new(),
        }
    }
}

impl fmt::Display for ReferenceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn join_issues(issues: &[ReferenceIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fatal compile and update errors
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    SchemaViolation(#[from] SchemaError),

    #[error("Synthesis failed: {0}")]
    SynthesisFailure(String),

    #[error("{} referential integrity error(s): {}", .0.len(), join_issues(.0))]
    ReferentialIntegrity(Vec<ReferenceIssue>),

    #[error("Persistence failed during {stage} stage: {source}")]
    Persistence {
        stage: &'static str,
        #[source]
        source: StorageError,
    },

    #[error("Update timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Agent {agent_id} is not owned by {owner_id}")]
    NotOwner { agent_id: String, owner_id: String },
}

impl CompileError {
    /// Stable machine-readable code for this error kind
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::SchemaViolation(_) => "SCHEMA_VIOLATION",
            CompileError::SynthesisFailure(_) => "SYNTHESIS_FAILURE",
            CompileError::ReferentialIntegrity(_) => "REFERENTIAL_INTEGRITY",
            CompileError::Persistence { .. } => "PERSISTENCE_FAILURE",
            CompileError::Timeout(_) => "TIMEOUT",
            CompileError::AgentNotFound(_) => "AGENT_NOT_FOUND",
            CompileError::NotOwner { .. } => "NOT_OWNER",
        }
    }

    /// Validation-class errors abort before anything is persisted
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CompileError::SchemaViolation(_)
                | CompileError::SynthesisFailure(_)
                | CompileError::ReferentialIntegrity(_)
        )
    }

    /// Map a store failure to a persistence error tagged with the stage it happened in
    pub fn persistence(stage: &'static str) -> impl FnOnce(StorageError) -> CompileError {
        move |source| CompileError::Persistence { stage, source }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

/// Non-fatal conditions reported alongside a successful outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum CompileWarning {
    /// Custom code step persisted without code; generation deferred to first use
    CodeGenerationDegraded {
        action: String,
        step: String,
        reason: String,
    },
    /// Keyword matched a provider outside the permitted connection set
    ConnectionNotPermitted { provider: String },
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileWarning::CodeGenerationDegraded {
                action,
                step,
                reason,
            } => write!(
                f,
                "step '{}' of action '{}' saved without code ({})",
                step, action, reason
            ),
            CompileWarning::ConnectionNotPermitted { provider } => {
                write!(f, "connection '{}' is not permitted and was skipped", provider)
            }
        }
    }
}

/// Failure of an external collaborator call
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("Collaborator rejected the request: {0}")]
    Rejected(String),

    #[error(transparent)]
    AI(#[from] AIServiceError),
}
