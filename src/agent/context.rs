//! Per-run chain state
//!
//! Every stage writes its outputs here and the next stage reads its declared
//! inputs from `to_input_map`. Named fields cover the values the loop itself
//! inspects; any other agent output lands in `extra`.

use crate::context::{format_context, ContextSources};
use serde::Serialize;
use serde_json::{Map, Value};

/// The checker's output has been stored under both spellings historically.
const EVALUATE_RESPONSE_ALIAS: &str = "evalute_response";

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChainContext {
    revision: u64,
    executions: u32,
    pub user_question: Option<String>,
    pub plan: Option<Value>,
    pub external_keywords: Option<Value>,
    pub external_data: ContextSources,
    pub execute_response: Option<Map<String, Value>>,
    pub response: Option<Value>,
    pub evaluate_response: Option<Map<String, Value>>,
    pub missing_steps: Option<Value>,
    pub follow_plan: Option<Value>,
    pub score: Option<Value>,
    /// Checker feedback for the next execute attempt; empty until the
    /// first rejected answer.
    pub loss_response: String,
    pub extra: Map<String, Value>,
}

impl ChainContext {
    pub fn new(user_question: &str) -> Self {
        Self {
            revision: 1,
            user_question: Some(user_question.to_string()),
            ..Self::default()
        }
    }

    /// Incremented on every write
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Store the planner's output fields
    pub fn record_plan(&mut self, output: &Map<String, Value>) {
        self.absorb(output);
    }

    /// Number of execute outputs recorded this run
    pub fn executions(&self) -> u32 {
        self.executions
    }

    pub fn record_execution(&mut self, output: Map<String, Value>) {
        self.absorb(&output);
        self.execute_response = Some(output);
        self.executions += 1;
        self.revision += 1;
    }

    /// Drop the previous cycle's checker verdict once it no longer describes
    /// the stored answer.
    pub fn clear_verdict(&mut self) {
        self.missing_steps = None;
        self.follow_plan = None;
        self.evaluate_response = None;
        self.revision += 1;
    }

    pub fn record_evaluation(&mut self, output: Map<String, Value>) {
        // Fields the checker leaves out must not leak from a previous cycle.
        self.missing_steps = None;
        self.follow_plan = None;
        self.absorb(&output);
        self.evaluate_response = Some(output);
        self.revision += 1;
    }

    pub fn set_external_data(&mut self, sources: ContextSources) {
        self.external_data = sources;
        self.revision += 1;
    }

    pub fn set_loss_response(&mut self, feedback: String) {
        self.loss_response = feedback;
        self.revision += 1;
    }

    fn absorb(&mut self, output: &Map<String, Value>) {
        for (key, value) in output {
            match key.as_str() {
                "user_question" => {
                    if let Value::String(s) = value {
                        self.user_question = Some(s.clone());
                    }
                }
                "plan" => self.plan = Some(value.clone()),
                "external_keywords" => self.external_keywords = Some(value.clone()),
                "response" => self.response = Some(value.clone()),
                "missing_steps" => self.missing_steps = Some(value.clone()),
                "follow_plan" => self.follow_plan = Some(value.clone()),
                "score" => self.score = Some(value.clone()),
                _ => {
                    self.extra.insert(key.clone(), value.clone());
                }
            }
        }
        self.revision += 1;
    }

    /// Everything written so far, keyed by field name
    pub fn to_input_map(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();

        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                map.insert(key.to_string(), value);
            }
        };

        put("user_question", self.user_question.clone().map(Value::String));
        put("plan", self.plan.clone());
        put("external_keywords", self.external_keywords.clone());
        put(
            "external_data",
            Some(Value::String(format_context(&self.external_data))),
        );
        put("execute_response", self.execute_response.clone().map(Value::Object));
        put("response", self.response.clone());
        put("evaluate_response", self.evaluate_response.clone().map(Value::Object));
        put(
            EVALUATE_RESPONSE_ALIAS,
            self.evaluate_response.clone().map(Value::Object),
        );
        put("missing_steps", self.missing_steps.clone());
        put("follow_plan", self.follow_plan.clone());
        put("score", self.score.clone());
        put("loss_response", Some(Value::String(self.loss_response.clone())));

        map
    }
}
