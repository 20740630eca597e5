//! Agent chain orchestrator - implements the feedback loop
//!
//! PLAN → ENRICH? → (EXECUTE → CHECK → RETRY?)* → COMPLETE

pub mod context;
pub mod keywords;
pub mod wrapper;

pub use context::ChainContext;
pub use wrapper::AgentWrapper;

use crate::config::load_agent_configs;
use crate::context::ExternalLookup;
use crate::error::AgentError;
use crate::llm::LanguageModel;
use crate::models::{AgentConfig, AgentInfo, Termination};
use crate::signature::value_text;
use crate::Result;
use keywords::{is_blank, normalize_keywords};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const ANALYZE_AGENT: &str = "analyze_agent_0";
pub const EXECUTE_AGENT: &str = "execute_agent_0";
pub const CHECKER_AGENT: &str = "checker_agent_0";

pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

/// Result of one chain run
#[derive(Debug, Clone, Serialize)]
pub struct ChainOutcome {
    pub run_id: Uuid,
    /// The execute agent's output from the returned iteration
    pub response: Map<String, Value>,
    pub termination: Termination,
    pub iterations: u32,
    pub context: ChainContext,
}

enum CheckVerdict {
    Complete,
    Incomplete(String),
}

/// Ordered agents sharing one model handle
pub struct AgentChain {
    agents: Vec<AgentWrapper>,
}

impl AgentChain {
    pub fn new(configs: Vec<AgentConfig>, model: Arc<dyn LanguageModel>) -> Result<Self> {
        let agents = configs
            .into_iter()
            .map(|config| AgentWrapper::new(config, Arc::clone(&model)))
            .collect::<Result<Vec<_>>>()?;

        Self::from_agents(agents)
    }

    pub fn from_config_file(path: impl AsRef<Path>, model: Arc<dyn LanguageModel>) -> Result<Self> {
        Self::new(load_agent_configs(path)?, model)
    }

    /// Requires the analyze, execute and checker roles to be resolvable
    pub fn from_agents(agents: Vec<AgentWrapper>) -> Result<Self> {
        let chain = Self { agents };

        for role in [ANALYZE_AGENT, EXECUTE_AGENT, CHECKER_AGENT] {
            chain.agent(role).map_err(|_| {
                AgentError::ConfigError(format!(
                    "chain needs an agent named '{}' or one at its position",
                    role
                ))
            })?;
        }

        Ok(chain)
    }

    /// Look up an agent by exact name, falling back to the positional
    /// convention (analyze, execute, checker).
    pub fn agent(&self, name: &str) -> Result<&AgentWrapper> {
        if let Some(agent) = self.agents.iter().find(|a| a.name() == name) {
            return Ok(agent);
        }

        let position = match name {
            ANALYZE_AGENT => Some(0),
            EXECUTE_AGENT => Some(1),
            CHECKER_AGENT => Some(2),
            _ => None,
        };

        position
            .and_then(|i| self.agents.get(i))
            .ok_or_else(|| AgentError::AgentNotFound(name.to_string()))
    }

    pub fn chain_info(&self) -> Vec<AgentInfo> {
        self.agents.iter().map(AgentWrapper::info).collect()
    }

    /// Run the plan → execute → check loop for one question.
    ///
    /// Makes at most `2 * max_iterations + 1` generation calls.
    pub async fn execute(
        &self,
        user_question: &str,
        external_lookup: Option<&dyn ExternalLookup>,
        max_iterations: u32,
    ) -> Result<ChainOutcome> {
        let run_id = Uuid::new_v4();
        let start = Instant::now();
        let max_iterations = if max_iterations == 0 {
            warn!(%run_id, "max_iterations is 0, running one iteration");
            1
        } else {
            max_iterations
        };

        info!(%run_id, max_iterations, "Agent chain: starting run");

        let mut context = ChainContext::new(user_question);

        // === PLAN ===
        let planner = self.agent(ANALYZE_AGENT)?;
        let plan = planner.execute(&context.to_input_map()).await.map_err(|e| {
            error!(%run_id, "Plan stage failed: {}", e);
            e
        })?;
        context.record_plan(&plan);

        debug!(%run_id, keywords = ?context.external_keywords, "Plan recorded");

        // === ENRICH ===
        if let Some(lookup) = external_lookup {
            self.enrich(&mut context, lookup, run_id).await;
        }

        // === EXECUTE → CHECK ===
        for iteration in 1..=max_iterations {
            debug!(%run_id, iteration, "Starting iteration");

            match self.run_iteration(&mut context).await {
                Ok(CheckVerdict::Complete) => {
                    info!(
                        %run_id,
                        iteration,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Checker found no missing steps - run complete"
                    );
                    return finish(run_id, context, Termination::Completed, iteration);
                }
                Ok(CheckVerdict::Incomplete(missing)) => {
                    info!(%run_id, iteration, missing = %missing, "Checker reported missing steps");
                    context.set_loss_response(format!(
                        "Missing steps: {}. Please complete these steps: {}",
                        missing, missing
                    ));
                }
                Err(e) if iteration == 1 => {
                    error!(%run_id, "First iteration failed: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        %run_id,
                        iteration,
                        "Iteration failed, returning last response: {}",
                        e
                    );
                    // An answer produced this cycle but never checked
                    if context.executions() == iteration {
                        context.clear_verdict();
                    }
                    let answered = context.executions();
                    return finish(run_id, context, Termination::RecoveredFromFailure, answered);
                }
            }
        }

        warn!(
            %run_id,
            max_iterations,
            "Iterations exhausted with missing steps, returning last response"
        );
        finish(run_id, context, Termination::Exhausted, max_iterations)
    }

    async fn enrich(&self, context: &mut ChainContext, lookup: &dyn ExternalLookup, run_id: Uuid) {
        let raw = match &context.external_keywords {
            Some(value) if !is_blank(value) => value.clone(),
            _ => {
                debug!(%run_id, "No external keywords, skipping lookup");
                return;
            }
        };

        let keywords = match normalize_keywords(&raw) {
            Some(keywords) => keywords,
            None => {
                debug!(%run_id, raw = %raw, "Unreadable keyword list, using defaults");
                lookup.default_keywords()
            }
        };

        if keywords.is_empty() {
            debug!(%run_id, "Keyword list empty, skipping lookup");
            return;
        }

        match lookup.lookup(&keywords).await {
            Ok(Some(sources)) if !sources.is_empty() => {
                info!(%run_id, keywords = ?keywords, sources = sources.len(), "External data added");
                context.set_external_data(sources);
            }
            Ok(_) => debug!(%run_id, "Lookup returned nothing"),
            Err(e) => warn!(%run_id, "External lookup failed, continuing without it: {}", e),
        }
    }

    async fn run_iteration(&self, context: &mut ChainContext) -> Result<CheckVerdict> {
        let executor = self.agent(EXECUTE_AGENT)?;
        let execution = executor.execute(&context.to_input_map()).await?;
        context.record_execution(execution);

        let checker = self.agent(CHECKER_AGENT)?;
        let evaluation = checker.execute(&context.to_input_map()).await?;
        context.record_evaluation(evaluation);

        Ok(match missing_steps_text(context.missing_steps.as_ref()) {
            Some(missing) => CheckVerdict::Incomplete(missing),
            None => CheckVerdict::Complete,
        })
    }
}

/// Text of the checker's unmet steps, or `None` when it reported none.
///
/// "Nothing missing" arrives as an absent field, null, the string `"None"`,
/// or an empty string/list; all of them end the loop.
pub fn missing_steps_text(missing: Option<&Value>) -> Option<String> {
    let value = missing?;

    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) => {
            let trimmed = s.trim();
            let none_marker = ["none", "null"]
                .iter()
                .any(|m| trimmed.eq_ignore_ascii_case(m));
            if trimmed.is_empty() || none_marker {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => Some(
            items
                .iter()
                .map(value_text)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Object(map) if map.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(value_text(other)),
    }
}

fn finish(
    run_id: Uuid,
    context: ChainContext,
    termination: Termination,
    iterations: u32,
) -> Result<ChainOutcome> {
    let response = context.execute_response.clone().ok_or_else(|| {
        AgentError::ChainError(format!("run {} finished without an execute response", run_id))
    })?;

    Ok(ChainOutcome {
        run_id,
        response,
        termination,
        iterations,
        context,
    })
}
