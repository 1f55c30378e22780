// ABOUTME: Agent specification compiler for Foundry
// ABOUTME: Turns declarative or feature-described agents into validated, persisted entity graphs

pub mod anthropic;
pub mod collaborators;
pub mod compiler;
pub mod config;
pub mod credentials;
pub mod display;
pub mod enricher;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod synthesizer;
pub mod types;
pub mod validator;

pub use anthropic::{AnthropicCodeGenerator, AnthropicSynthesizer};
pub use collaborators::{
    CodeGenerationRequest, CodeGenerator, GeneratedCode, SynthesisCollaborator, SynthesisRequest,
};
pub use compiler::Compiler;
pub use config::{CompilerConfig, ConfigError};
pub use credentials::{detect_connections, ConnectionRule, CONNECTION_CATALOG};
pub use enricher::{enrich, EnrichedGraph};
pub use error::{CollaboratorError, CompileError, CompileWarning, ReferenceIssue, Result};
pub use pipeline::{ActionsResolved, KnownIds, ModelsResolved, SchedulesResolved, StagedPersistence};
pub use progress::{ProgressReporter, ProgressStage, ProgressUpdate};
pub use types::{AgentSource, CompileCounts, CompileInput, CompileOutcome, FeatureInput, UpdateInput};
