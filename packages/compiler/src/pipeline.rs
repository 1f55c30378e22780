// ABOUTME: Staged persistence pipeline for enriched agent graphs
// ABOUTME: Models, then actions and steps, then schedules; parallel within a stage, barrier between stages

use std::collections::{BTreeMap, HashMap};

use foundry_core::{
    Action, AgentGraph, Field, HydratedGraph, PersistedAction, PersistedModel, PersistedSchedule,
    PersistedScheduleStep, PersistedStep, Schedule, ScheduleStep, Step, StepConfig, StepKind,
};
use foundry_storage::AgentStore;
use futures::future::try_join_all;
use tracing::{debug, info, warn};

use crate::collaborators::{CodeGenerationRequest, CodeGenerator};
use crate::error::{CompileError, CompileWarning, ReferenceIssue, Result};
use crate::progress::{ProgressReporter, ProgressStage};

/// Identifiers of entities that were persisted before this run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownIds {
    pub model_ids: HashMap<String, String>,
    pub action_ids: HashMap<String, String>,
}

impl KnownIds {
    pub fn from_hydrated(graph: &HydratedGraph) -> Self {
        Self {
            model_ids: graph.model_ids(),
            action_ids: graph.action_ids(),
        }
    }
}

/// Every model of the delta has an id
#[derive(Debug)]
pub struct ModelsResolved {
    graph: AgentGraph,
    pub models: Vec<PersistedModel>,
    pub ids: KnownIds,
}

/// Every action (and its steps) of the delta has an id
#[derive(Debug)]
pub struct ActionsResolved {
    graph: AgentGraph,
    pub models: Vec<PersistedModel>,
    pub actions: Vec<PersistedAction>,
    pub ids: KnownIds,
    pub warnings: Vec<CompileWarning>,
}

/// The whole delta is persisted
#[derive(Debug)]
pub struct SchedulesResolved {
    pub models: Vec<PersistedModel>,
    pub actions: Vec<PersistedAction>,
    pub schedules: Vec<PersistedSchedule>,
    pub ids: KnownIds,
    pub warnings: Vec<CompileWarning>,
}

fn sorted_keys(map: &HashMap<String, String>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}

/// Persists one delta graph for one agent
pub struct StagedPersistence<'a> {
    store: &'a dyn AgentStore,
    code_generator: Option<&'a dyn CodeGenerator>,
    progress: &'a ProgressReporter,
    agent_id: &'a str,
}

impl<'a> StagedPersistence<'a> {
    pub fn new(
        store: &'a dyn AgentStore,
        code_generator: Option<&'a dyn CodeGenerator>,
        progress: &'a ProgressReporter,
        agent_id: &'a str,
    ) -> Self {
        Self {
            store,
            code_generator,
            progress,
            agent_id,
        }
    }

    /// Run all three stages in order
    pub async fn run(
        &self,
        graph: AgentGraph,
        field_additions: &BTreeMap<String, Vec<Field>>,
        known: KnownIds,
    ) -> Result<SchedulesResolved> {
        let models = self.stage_models(graph, field_additions, known).await?;
        let actions = self.stage_actions(models).await?;
        self.stage_schedules(actions).await
    }

    /// Create every new model and append derived fields to already persisted ones
    pub async fn stage_models(
        &self,
        graph: AgentGraph,
        field_additions: &BTreeMap<String, Vec<Field>>,
        known: KnownIds,
    ) -> Result<ModelsResolved> {
        let mut issues = Vec::new();
        let mut appends = Vec::new();
        for (model_name, fields) in field_additions {
            match known.model_ids.get(model_name) {
                Some(model_id) => appends.push((model_id.clone(), fields)),
                None => issues.push(ReferenceIssue::unresolved(
                    "field additions",
                    "model",
                    model_name,
                    sorted_keys(&known.model_ids),
                )),
            }
        }
        if !issues.is_empty() {
            return Err(CompileError::ReferentialIntegrity(issues));
        }

        let creates = graph.models.iter().map(|model| async move {
            let id = self
                .store
                .create_model(self.agent_id, model)
                .await
                .map_err(CompileError::persistence("models"))?;
            debug!("Persisted model {} as {}", model.name, id);
            Ok::<_, CompileError>(PersistedModel {
                id,
                model: model.clone(),
            })
        });
        let appended = appends.iter().map(|(model_id, fields)| async move {
            self.store
                .append_model_fields(model_id, fields)
                .await
                .map_err(CompileError::persistence("models"))
        });

        let (models, _) = futures::try_join!(try_join_all(creates), try_join_all(appended))?;

        let mut ids = known;
        for model in &models {
            ids.model_ids.insert(model.model.name.clone(), model.id.clone());
        }

        info!(
            "Models stage complete: {} created, {} extended",
            models.len(),
            appends.len()
        );
        self.progress.stage_complete(
            ProgressStage::Models,
            format!("Saved {} models", models.len()),
        );

        Ok(ModelsResolved { graph, models, ids })
    }

    /// Create every action, then its steps in declared order
    pub async fn stage_actions(&self, resolved: ModelsResolved) -> Result<ActionsResolved> {
        let ModelsResolved { graph, models, mut ids } = resolved;

        let mut issues = Vec::new();
        let mut targets = Vec::with_capacity(graph.actions.len());
        for action in &graph.actions {
            match ids.model_ids.get(&action.target_model) {
                Some(model_id) => targets.push((action, model_id.clone())),
                None => issues.push(ReferenceIssue::unresolved(
                    format!("action '{}'", action.name),
                    "model",
                    &action.target_model,
                    sorted_keys(&ids.model_ids),
                )),
            }
        }
        if !issues.is_empty() {
            return Err(CompileError::ReferentialIntegrity(issues));
        }

        let persisted = try_join_all(
            targets
                .iter()
                .map(|(action, model_id)| self.persist_action(action, model_id)),
        )
        .await?;

        let mut actions = Vec::with_capacity(persisted.len());
        let mut warnings = Vec::new();
        for (action, action_warnings) in persisted {
            ids.action_ids.insert(action.name.clone(), action.id.clone());
            actions.push(action);
            warnings.extend(action_warnings);
        }

        let step_count: usize = actions.iter().map(|a| a.steps.len()).sum();
        info!(
            "Actions stage complete: {} actions, {} steps, {} degraded",
            actions.len(),
            step_count,
            warnings.len()
        );
        self.progress.stage_complete(
            ProgressStage::Actions,
            format!("Saved {} actions with {} steps", actions.len(), step_count),
        );

        Ok(ActionsResolved {
            graph,
            models,
            actions,
            ids,
            warnings,
        })
    }

    /// Create every schedule, then its steps by execution order
    pub async fn stage_schedules(&self, resolved: ActionsResolved) -> Result<SchedulesResolved> {
        let ActionsResolved {
            graph,
            models,
            actions,
            ids,
            warnings,
        } = resolved;

        let mut issues = Vec::new();
        let mut plans = Vec::with_capacity(graph.schedules.len());
        for schedule in &graph.schedules {
            let mut steps: Vec<(usize, &ScheduleStep)> = schedule.steps.iter().enumerate().collect();
            steps.sort_by_key(|(_, step)| step.order);

            let mut resolved_steps = Vec::with_capacity(steps.len());
            for (idx, step) in steps {
                let path = format!("schedule '{}'.steps[{}]", schedule.name, idx);
                let model_id = ids.model_ids.get(&step.model_name);
                let action_id = ids.action_ids.get(&step.action_name);

                if model_id.is_none() {
                    issues.push(ReferenceIssue::unresolved(
                        &path,
                        "model",
                        &step.model_name,
                        sorted_keys(&ids.model_ids),
                    ));
                }
                if action_id.is_none() {
                    issues.push(ReferenceIssue::unresolved(
                        &path,
                        "action",
                        &step.action_name,
                        sorted_keys(&ids.action_ids),
                    ));
                }
                if let (Some(model_id), Some(action_id)) = (model_id, action_id) {
                    resolved_steps.push((step, model_id.clone(), action_id.clone()));
                }
            }
            plans.push((schedule, resolved_steps));
        }
        if !issues.is_empty() {
            return Err(CompileError::ReferentialIntegrity(issues));
        }

        let schedules = try_join_all(
            plans
                .iter()
                .map(|(schedule, steps)| self.persist_schedule(schedule, steps)),
        )
        .await?;

        info!("Schedules stage complete: {} schedules", schedules.len());
        self.progress.stage_complete(
            ProgressStage::Schedules,
            format!("Saved {} schedules", schedules.len()),
        );

        Ok(SchedulesResolved {
            models,
            actions,
            schedules,
            ids,
            warnings,
        })
    }

    async fn persist_action(
        &self,
        action: &Action,
        model_id: &str,
    ) -> Result<(PersistedAction, Vec<CompileWarning>)> {
        let action_id = self
            .store
            .create_action(self.agent_id, model_id, action)
            .await
            .map_err(CompileError::persistence("actions"))?;

        let mut steps = Vec::with_capacity(action.steps.len());
        let mut warnings = Vec::new();
        for (position, step) in action.steps.iter().enumerate() {
            let (step, warning) = self.prepare_step(action, step).await;
            warnings.extend(warning);

            let position = position as u32;
            let execution_ready = step.is_execution_ready();
            let id = self
                .store
                .create_step(&action_id, position, &step, execution_ready)
                .await
                .map_err(CompileError::persistence("actions"))?;

            steps.push(PersistedStep {
                id,
                position,
                execution_ready,
                step,
            });
        }

        debug!(
            "Persisted action {} as {} with {} steps",
            action.name,
            action_id,
            steps.len()
        );
        Ok((
            PersistedAction::new(action_id, model_id.to_string(), action, steps),
            warnings,
        ))
    }

    /// Generate code for custom code steps that have none. Never fails the pipeline.
    async fn prepare_step(&self, action: &Action, step: &Step) -> (Step, Option<CompileWarning>) {
        if step.kind() != StepKind::CustomCode || step.is_execution_ready() {
            return (step.clone(), None);
        }

        let degraded = |reason: String| {
            warn!(
                "Step '{}' of action '{}' saved without code: {}",
                step.name, action.name, reason
            );
            CompileWarning::CodeGenerationDegraded {
                action: action.name.clone(),
                step: step.name.clone(),
                reason,
            }
        };

        let Some(generator) = self.code_generator else {
            return (
                step.clone(),
                Some(degraded("code generation is disabled".to_string())),
            );
        };

        let request = CodeGenerationRequest {
            step_name: step.name.clone(),
            description: step.description.clone(),
            input_fields: step.input_fields.clone(),
            output_fields: step.output_fields.clone(),
            model_name: action.target_model.clone(),
        };

        match generator.generate(&request).await {
            Ok(generated) if !generated.code.trim().is_empty() => {
                let mut step = step.clone();
                step.config = StepConfig::CustomCode {
                    code: Some(generated.code),
                    dependencies: generated.dependencies,
                    env_vars: generated.env_vars,
                };
                (step, None)
            }
            Ok(_) => (
                step.clone(),
                Some(degraded("generator returned no code".to_string())),
            ),
            Err(e) => (step.clone(), Some(degraded(e.to_string()))),
        }
    }

    async fn persist_schedule(
        &self,
        schedule: &Schedule,
        steps: &[(&ScheduleStep, String, String)],
    ) -> Result<PersistedSchedule> {
        let schedule_id = self
            .store
            .create_schedule(self.agent_id, schedule)
            .await
            .map_err(CompileError::persistence("schedules"))?;

        let mut persisted = Vec::with_capacity(steps.len());
        for (step, model_id, action_id) in steps {
            let id = self
                .store
                .create_schedule_step(&schedule_id, model_id, action_id, step)
                .await
                .map_err(CompileError::persistence("schedules"))?;
            persisted.push(PersistedScheduleStep {
                id,
                model_id: model_id.clone(),
                action_id: action_id.clone(),
                step: (*step).clone(),
            });
        }

        debug!(
            "Persisted schedule {} as {} with {} steps",
            schedule.name,
            schedule_id,
            persisted.len()
        );
        Ok(PersistedSchedule::new(schedule_id, schedule, persisted))
    }
}
