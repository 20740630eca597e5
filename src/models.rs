//! Core data models for the agent chain

use crate::error::AgentError;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

//
// ================= Agent Config =================
//

/// One agent descriptor from the chain configuration file.
///
/// `input` and `output` map field names to the description shown to the
/// model. Field order follows the file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub name: String,
    pub input: Map<String, Value>,
    pub output: Map<String, Value>,
    #[serde(default)]
    pub objective_instruction: Option<String>,
}

impl AgentConfig {
    /// Build a config from one JSON descriptor, naming the offending agent
    /// when a required key is missing.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            AgentError::ConfigError(format!("agent descriptor is not an object: {}", value))
        })?;

        let name = object
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AgentError::ConfigError("agent descriptor missing 'name'".to_string()))?
            .to_string();

        let field_map = |key: &str| -> Result<Map<String, Value>> {
            object
                .get(key)
                .and_then(Value::as_object)
                .cloned()
                .ok_or_else(|| {
                    AgentError::ConfigError(format!(
                        "agent '{}' missing '{}' field map",
                        name, key
                    ))
                })
        };

        let input = field_map("input")?;
        let output = field_map("output")?;

        let objective_instruction = object
            .get("objective_instruction")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);

        Ok(Self {
            name,
            input,
            output,
            objective_instruction,
        })
    }
}

//
// ================= Signature Fields =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub description: String,
    pub direction: FieldDirection,
}

/// Summary of one agent in a chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentInfo {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub instruction: Option<String>,
}

//
// ================= Chain Outcome =================
//

/// Why the execute/check loop stopped
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The checker reported no missing steps
    Completed,
    /// `max_iterations` cycles ran without the checker accepting the answer
    Exhausted,
    /// A later iteration failed; the last good response was kept
    RecoveredFromFailure,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Termination::Completed => "completed",
            Termination::Exhausted => "exhausted",
            Termination::RecoveredFromFailure => "recovered_from_failure",
        };
        write!(f, "{}", s)
    }
}

//
// ================= Plan Evaluation =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanEvaluation {
    pub evaluation: String,
    /// 0 to 10
    pub score: u8,
    pub follow_plan: bool,
    pub missing_steps: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_from_value() {
        let value = json!({
            "name": "analyze_agent_0",
            "input": {"user_question": "The question"},
            "output": {"plan": "Steps", "external_keywords": "Keywords"},
            "objective_instruction": "Plan the answer"
        });

        let config = AgentConfig::from_value(&value).unwrap();
        assert_eq!(config.name, "analyze_agent_0");
        let outputs: Vec<&String> = config.output.keys().collect();
        assert_eq!(outputs, vec!["plan", "external_keywords"]);
        assert_eq!(config.objective_instruction.as_deref(), Some("Plan the answer"));
    }

    #[test]
    fn test_config_missing_keys() {
        let no_output = json!({"name": "a", "input": {}});
        let err = AgentConfig::from_value(&no_output).unwrap_err();
        assert!(err.to_string().contains("'output'"));

        let no_name = json!({"input": {}, "output": {}});
        assert!(matches!(
            AgentConfig::from_value(&no_name),
            Err(AgentError::ConfigError(_))
        ));
    }

    #[test]
    fn test_blank_instruction_is_none() {
        let value = json!({
            "name": "a",
            "input": {},
            "output": {"x": "y"},
            "objective_instruction": "   "
        });
        assert!(AgentConfig::from_value(&value).unwrap().objective_instruction.is_none());
    }
}
