//! A single prompt role bound to a language model

use crate::llm::LanguageModel;
use crate::models::{AgentConfig, AgentInfo};
use crate::signature::Signature;
use crate::Result;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

pub struct AgentWrapper {
    config: AgentConfig,
    signature: Signature,
    model: Arc<dyn LanguageModel>,
}

impl AgentWrapper {
    pub fn new(config: AgentConfig, model: Arc<dyn LanguageModel>) -> Result<Self> {
        let signature = Signature::from_config(&config)?;
        Ok(Self {
            config,
            signature,
            model,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn info(&self) -> AgentInfo {
        AgentInfo {
            name: self.config.name.clone(),
            inputs: self.signature.inputs().map(|f| f.name.clone()).collect(),
            outputs: self.signature.outputs().map(|f| f.name.clone()).collect(),
            instruction: self.signature.instruction().map(str::to_string),
        }
    }

    /// Run one generation call with the declared inputs taken from `input`.
    /// Failures are logged and returned unchanged.
    pub async fn execute(&self, input: &Map<String, Value>) -> Result<Map<String, Value>> {
        let start = Instant::now();

        let result = self.invoke(input).await;

        match &result {
            Ok(output) => debug!(
                agent = %self.config.name,
                model = self.model.model_name(),
                fields = output.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Agent completed"
            ),
            Err(e) => error!(
                agent = %self.config.name,
                model = self.model.model_name(),
                "Agent failed: {}",
                e
            ),
        }

        result
    }

    async fn invoke(&self, input: &Map<String, Value>) -> Result<Map<String, Value>> {
        let prompt = self.signature.user_prompt(input)?;
        let system = self.signature.system_prompt();

        let reply = self.model.complete(&system, &prompt).await?;

        self.signature.parse_reply(&reply)
    }
}
