// ABOUTME: Compile and update entry points of the agent compiler
// ABOUTME: Schema check, optional synthesis, enrichment and staged persistence with progress reporting

use std::sync::Arc;

use foundry_core::validation::{validate_agent_name, validate_graph};
use foundry_core::{AgentGraph, AgentRecord, Connection, HydratedGraph, SchemaError, SchemaViolation};
use foundry_storage::{AgentStore, AgentUpdate, NewAgent};
use tracing::{error, info};

use crate::collaborators::{CodeGenerator, SynthesisCollaborator};
use crate::config::CompilerConfig;
use crate::enricher::{enrich, EnrichedGraph};
use crate::error::{CompileError, CompileWarning, Result};
use crate::pipeline::{KnownIds, SchedulesResolved, StagedPersistence};
use crate::progress::{ProgressReporter, ProgressStage};
use crate::synthesizer::{default_root_model, Synthesizer};
use crate::types::{AgentSource, CompileCounts, CompileInput, CompileOutcome, UpdateInput};

/// Agent specification compiler bound to one store and its collaborators
pub struct Compiler {
    store: Arc<dyn AgentStore>,
    synthesizer: Option<Arc<dyn SynthesisCollaborator>>,
    code_generator: Option<Arc<dyn CodeGenerator>>,
    config: CompilerConfig,
    progress: ProgressReporter,
}

impl Compiler {
    pub fn new(store: Arc<dyn AgentStore>, config: CompilerConfig) -> Self {
        Self {
            store,
            synthesizer: None,
            code_generator: None,
            config,
            progress: ProgressReporter::silent(),
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SynthesisCollaborator>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn with_code_generator(mut self, code_generator: Arc<dyn CodeGenerator>) -> Self {
        self.code_generator = Some(code_generator);
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    fn code_generator(&self) -> Option<&dyn CodeGenerator> {
        if self.config.codegen_enabled {
            self.code_generator.as_deref()
        } else {
            None
        }
    }

    /// Compile a new agent. Validation errors abort before anything is persisted.
    pub async fn compile(&self, input: CompileInput) -> Result<CompileOutcome> {
        info!("Compiling agent '{}' for owner {}", input.name, input.owner_id);
        check_compile_input(&input)?;

        let (mut graph, permitted) = match &input.source {
            AgentSource::Graph { graph } => (graph.clone(), None),
            AgentSource::Features {
                feature_inputs,
                connections,
            } => {
                let collaborator = self.synthesizer.as_deref().ok_or_else(|| {
                    CompileError::SynthesisFailure(
                        "no synthesis collaborator is configured".to_string(),
                    )
                })?;
                let permitted = if connections.is_empty() {
                    self.config.permitted_connections.clone()
                } else {
                    connections.clone()
                };
                let graph = Synthesizer::new(collaborator)
                    .synthesize(&input.name, &input.description, feature_inputs, &permitted)
                    .await?;
                (graph, Some(permitted))
            }
        };
        if graph.root_model.is_none() {
            graph.root_model = default_root_model(&graph);
        }

        let enriched = enrich(&AgentGraph::default(), graph, permitted.as_deref())?;
        let derived_fields = enriched.derived_field_count();
        let EnrichedGraph {
            graph,
            field_additions,
            connections,
            mut warnings,
        } = enriched;

        let agent = self
            .store
            .create_agent(&NewAgent {
                name: input.name.clone(),
                description: input.description.clone(),
                owner_id: input.owner_id.clone(),
                root_model: graph.root_model.clone(),
                connections,
            })
            .await
            .map_err(CompileError::persistence("agent"))?;
        info!("Created agent {} ({})", agent.name, agent.id);

        let persisted = StagedPersistence::new(
            self.store.as_ref(),
            self.code_generator(),
            &self.progress,
            &agent.id,
        )
        .run(graph, &field_additions, KnownIds::default())
        .await
        .inspect_err(|e| error!("Compile of agent {} stopped: {}", agent.id, e))?;

        let counts = count(&persisted, derived_fields, agent.connections.len());
        warnings.extend(persisted.warnings);
        let graph = HydratedGraph {
            agent,
            models: persisted.models,
            actions: persisted.actions,
            schedules: persisted.schedules,
        };

        Ok(self.finish("Compiled", graph, counts, warnings))
    }

    /// Add entities to a persisted agent, bounded by the configured timeout
    pub async fn update(&self, input: UpdateInput) -> Result<CompileOutcome> {
        let limit = self.config.update_timeout;
        match tokio::time::timeout(limit, self.run_update(input)).await {
            Ok(result) => result,
            Err(_) => {
                error!("Update timed out after {:?}", limit);
                Err(CompileError::Timeout(limit))
            }
        }
    }

    async fn run_update(&self, input: UpdateInput) -> Result<CompileOutcome> {
        info!("Updating agent {}", input.agent_id);
        let delta = input.delta();
        SchemaError::check(|violations| {
            if input.agent_id.trim().is_empty() {
                violations.push(SchemaViolation::new("update", "agent id is required"));
            }
            if delta.is_empty() {
                violations.push(SchemaViolation::new("update", "nothing to add"));
            }
            validate_graph(&delta, violations);
        })?;

        let existing = self
            .store
            .load_graph(&input.agent_id)
            .await
            .map_err(CompileError::persistence("load"))?
            .ok_or_else(|| CompileError::AgentNotFound(input.agent_id.clone()))?;
        if existing.agent.owner_id != input.owner_id {
            return Err(CompileError::NotOwner {
                agent_id: input.agent_id.clone(),
                owner_id: input.owner_id.clone(),
            });
        }

        let enriched = enrich(&existing.to_graph(), delta, None)?;
        let derived_fields = enriched.derived_field_count();
        let EnrichedGraph {
            graph,
            field_additions,
            connections,
            mut warnings,
        } = enriched;
        let root_model = match existing.agent.root_model {
            Some(_) => None,
            None => default_root_model(&graph),
        };

        let persisted = StagedPersistence::new(
            self.store.as_ref(),
            self.code_generator(),
            &self.progress,
            &existing.agent.id,
        )
        .run(graph, &field_additions, KnownIds::from_hydrated(&existing))
        .await
        .inspect_err(|e| error!("Update of agent {} stopped: {}", existing.agent.id, e))?;

        let agent = self
            .store
            .update_agent(
                &existing.agent.id,
                &AgentUpdate {
                    description: None,
                    root_model,
                    connections: Some(merge_connections(&existing.agent.connections, connections)),
                },
            )
            .await
            .map_err(CompileError::persistence("agent"))?;

        let graph = self
            .store
            .load_graph(&agent.id)
            .await
            .map_err(CompileError::persistence("load"))?
            .ok_or_else(|| CompileError::AgentNotFound(agent.id.clone()))?;

        let counts = count(&persisted, derived_fields, agent.connections.len());
        warnings.extend(persisted.warnings);
        Ok(self.finish("Updated", graph, counts, warnings))
    }

    fn finish(
        &self,
        verb: &str,
        graph: HydratedGraph,
        counts: CompileCounts,
        warnings: Vec<CompileWarning>,
    ) -> CompileOutcome {
        let summary = summarize(verb, &graph.agent, &counts, &warnings);
        self.progress.stage_complete(
            ProgressStage::Complete,
            format!("{} agent {}", verb, graph.agent.name),
        );
        info!("{} agent {} with {} warning(s)", verb, graph.agent.id, warnings.len());

        CompileOutcome {
            agent_id: graph.agent.id.clone(),
            counts,
            summary,
            warnings,
            graph,
        }
    }
}

/// Local shape checks for a compile request; no I/O
fn check_compile_input(input: &CompileInput) -> Result<()> {
    SchemaError::check(|violations| {
        validate_agent_name(&input.name, violations);
        if input.owner_id.trim().is_empty() {
            violations.push(SchemaViolation::new("agent", "owner id is required"));
        }

        match &input.source {
            AgentSource::Graph { graph } => {
                if graph.models.is_empty() {
                    violations.push(SchemaViolation::new("graph", "at least one model is required"));
                }
                validate_graph(graph, violations);
            }
            AgentSource::Features { feature_inputs, .. } => {
                if input.description.trim().is_empty() && feature_inputs.is_empty() {
                    violations.push(SchemaViolation::new(
                        "agent",
                        "a description or at least one feature is required",
                    ));
                }
                for (idx, feature) in feature_inputs.iter().enumerate() {
                    if feature.description.trim().is_empty() {
                        violations.push(SchemaViolation::new(
                            format!("featureInputs[{}]", idx),
                            "feature description is required",
                        ));
                    }
                }
            }
        }
    })?;
    Ok(())
}

/// Existing connections plus newly required ones, one per provider
fn merge_connections(existing: &[Connection], added: Vec<Connection>) -> Vec<Connection> {
    let mut merged = existing.to_vec();
    for connection in added {
        if !merged.iter().any(|c| c.provider == connection.provider) {
            merged.push(connection);
        }
    }
    merged
}

fn count(persisted: &SchedulesResolved, derived_fields: usize, connections: usize) -> CompileCounts {
    CompileCounts {
        models: persisted.models.len(),
        actions: persisted.actions.len(),
        steps: persisted.actions.iter().map(|a| a.steps.len()).sum(),
        schedules: persisted.schedules.len(),
        schedule_steps: persisted.schedules.iter().map(|s| s.steps.len()).sum(),
        derived_fields,
        connections,
    }
}

fn summarize(
    verb: &str,
    agent: &AgentRecord,
    counts: &CompileCounts,
    warnings: &[CompileWarning],
) -> String {
    let mut lines = vec![
        format!("{} agent '{}' ({})", verb, agent.name, agent.id),
        format!(
            "  {} models, {} actions with {} steps, {} schedules with {} steps",
            counts.models, counts.actions, counts.steps, counts.schedules, counts.schedule_steps
        ),
        format!("  {} derived fields", counts.derived_fields),
    ];
    if let Some(root) = &agent.root_model {
        lines.push(format!("  root model: {}", root));
    }
    if !agent.connections.is_empty() {
        let names: Vec<&str> = agent.connections.iter().map(|c| c.title.as_str()).collect();
        lines.push(format!("  connections: {}", names.join(", ")));
    }
    for warning in warnings {
        lines.push(format!("  warning: {}", warning));
    }
    lines.join("\n")
}
