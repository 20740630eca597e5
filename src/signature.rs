//! Agent signatures
//!
//! A signature is the explicit prompt contract of one agent: the named input
//! fields it is given, the named output fields it must produce, and an
//! optional objective. Prompts use `[[ ## field ## ]]` section markers in both
//! directions so replies can be split back into fields.

use crate::error::AgentError;
use crate::models::{AgentConfig, FieldDirection, FieldSpec};
use crate::Result;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;

const COMPLETED_MARKER: &str = "completed";

lazy_static! {
    static ref FIELD_MARKER: Regex =
        Regex::new(r"\[\[\s*##\s*(\w+)\s*##\s*\]\]").expect("field marker pattern");
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    agent: String,
    instruction: Option<String>,
    fields: Vec<FieldSpec>,
}

impl Signature {
    /// Build and validate the signature declared by an agent config
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let invalid = |reason: String| AgentError::InvalidSignature {
            agent: config.name.clone(),
            reason,
        };

        if config.output.is_empty() {
            return Err(invalid("no output fields declared".to_string()));
        }

        let mut fields = Vec::with_capacity(config.input.len() + config.output.len());
        let mut seen = HashSet::new();

        let declared = config
            .input
            .iter()
            .map(|f| (f, FieldDirection::Input))
            .chain(config.output.iter().map(|f| (f, FieldDirection::Output)));

        for ((name, description), direction) in declared {
            let name = name.trim();
            if name.is_empty() || name == COMPLETED_MARKER {
                return Err(invalid(format!("invalid field name '{}'", name)));
            }
            if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(invalid(format!("field '{}' must be a word", name)));
            }
            if !seen.insert(name.to_string()) {
                return Err(invalid(format!("field '{}' declared twice", name)));
            }

            fields.push(FieldSpec {
                name: name.to_string(),
                description: value_text(description),
                direction,
            });
        }

        Ok(Self {
            agent: config.name.clone(),
            instruction: config.objective_instruction.clone(),
            fields,
        })
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn instruction(&self) -> Option<&str> {
        self.instruction.as_deref()
    }

    pub fn inputs(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields
            .iter()
            .filter(|f| f.direction == FieldDirection::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields
            .iter()
            .filter(|f| f.direction == FieldDirection::Output)
    }

    /// Field descriptions, the exchange format and the objective
    pub fn system_prompt(&self) -> String {
        let mut out = String::new();

        out.push_str("Your input fields are:\n");
        for (i, field) in self.inputs().enumerate() {
            out.push_str(&format!("{}. `{}`: {}\n", i + 1, field.name, field.description));
        }

        out.push_str("Your output fields are:\n");
        for (i, field) in self.outputs().enumerate() {
            out.push_str(&format!("{}. `{}`: {}\n", i + 1, field.name, field.description));
        }

        out.push_str(
            "All interactions will be structured in the following way, \
             with the appropriate values filled in.\n\n",
        );
        for field in self.inputs().chain(self.outputs()) {
            out.push_str(&format!("[[ ## {} ## ]]\n{{{}}}\n\n", field.name, field.name));
        }
        out.push_str(&format!("[[ ## {} ## ]]\n", COMPLETED_MARKER));

        let objective = match &self.instruction {
            Some(text) => text.clone(),
            None => format!(
                "Given the fields {}, produce the fields {}.",
                backticked(self.inputs()),
                backticked(self.outputs())
            ),
        };
        out.push_str(&format!(
            "In adhering to this structure, your objective is: {}",
            objective
        ));

        out
    }

    /// Bind the declared inputs by name. Extra keys in `input` are ignored.
    pub fn user_prompt(&self, input: &Map<String, Value>) -> Result<String> {
        let mut out = String::new();

        for field in self.inputs() {
            let value = input.get(&field.name).ok_or_else(|| AgentError::MissingInput {
                agent: self.agent.clone(),
                field: field.name.clone(),
            })?;
            out.push_str(&format!("[[ ## {} ## ]]\n{}\n\n", field.name, value_text(value)));
        }

        let outputs: Vec<String> = self
            .outputs()
            .map(|f| format!("`[[ ## {} ## ]]`", f.name))
            .collect();
        out.push_str(&format!(
            "Respond with the corresponding output fields, starting with the field {}, \
             and then ending with the marker for `[[ ## {} ## ]]`.",
            outputs.join(", then "),
            COMPLETED_MARKER
        ));

        Ok(out)
    }

    /// Split a model reply into the declared output fields.
    ///
    /// Marker sections are preferred; a reply without markers is read as a
    /// JSON object.
    pub fn parse_reply(&self, reply: &str) -> Result<Map<String, Value>> {
        let sections = split_sections(reply);

        let found: Map<String, Value> = if sections.is_empty() {
            parse_json_object(reply).ok_or_else(|| {
                AgentError::LlmError(format!(
                    "agent '{}' reply has no field markers and is not a JSON object",
                    self.agent
                ))
            })?
        } else {
            sections
                .into_iter()
                .map(|(name, text)| (name, parse_field_value(&text)))
                .collect()
        };

        let mut output = Map::new();
        let mut missing = Vec::new();

        for field in self.outputs() {
            match found.get(&field.name) {
                Some(value) => {
                    output.insert(field.name.clone(), value.clone());
                }
                None => missing.push(field.name.as_str()),
            }
        }

        if !missing.is_empty() {
            return Err(AgentError::LlmError(format!(
                "agent '{}' reply missing field(s): {}",
                self.agent,
                missing.join(", ")
            )));
        }

        Ok(output)
    }
}

/// Render a field value as prompt text
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn backticked<'a>(fields: impl Iterator<Item = &'a FieldSpec>) -> String {
    fields
        .map(|f| format!("`{}`", f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn split_sections(reply: &str) -> Vec<(String, String)> {
    let markers: Vec<(usize, usize, String)> = FIELD_MARKER
        .captures_iter(reply)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some((whole.start(), whole.end(), name.as_str().to_string()))
        })
        .collect();

    markers
        .iter()
        .enumerate()
        .filter(|(_, (_, _, name))| name != COMPLETED_MARKER)
        .map(|(i, (_, end, name))| {
            let stop = markers.get(i + 1).map(|m| m.0).unwrap_or(reply.len());
            (name.clone(), reply[*end..stop].trim().to_string())
        })
        .collect()
}

/// Structured text stays structured; anything else is a string
fn parse_field_value(text: &str) -> Value {
    let looks_structured = text.starts_with('[') || text.starts_with('{');
    if looks_structured {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            return value;
        }
    }
    Value::String(text.to_string())
}

fn parse_json_object(reply: &str) -> Option<Map<String, Value>> {
    let cleaned = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(cleaned) {
        return Some(map);
    }

    // Fallback: the largest { ... } block in the text
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&cleaned[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn planner_signature() -> Signature {
        let config = AgentConfig::from_value(&json!({
            "name": "analyze_agent_0",
            "input": {"user_question": "The user's question"},
            "output": {
                "plan": "Ordered steps",
                "external_keywords": "Keywords to look up"
            }
        }))
        .unwrap();
        Signature::from_config(&config).unwrap()
    }

    #[test]
    fn test_fields_keep_declared_order() {
        let sig = planner_signature();
        let inputs: Vec<&str> = sig.inputs().map(|f| f.name.as_str()).collect();
        let outputs: Vec<&str> = sig.outputs().map(|f| f.name.as_str()).collect();
        assert_eq!(inputs, vec!["user_question"]);
        assert_eq!(outputs, vec!["plan", "external_keywords"]);
    }

    #[test]
    fn test_rejects_duplicate_and_empty_outputs() {
        let duplicate = AgentConfig::from_value(&json!({
            "name": "a",
            "input": {"plan": "x"},
            "output": {"plan": "y"}
        }))
        .unwrap();
        assert!(matches!(
            Signature::from_config(&duplicate),
            Err(AgentError::InvalidSignature { .. })
        ));

        let no_outputs = AgentConfig::from_value(&json!({
            "name": "a",
            "input": {"q": "x"},
            "output": {}
        }))
        .unwrap();
        assert!(Signature::from_config(&no_outputs).is_err());
    }

    #[test]
    fn test_system_prompt_default_objective() {
        let prompt = planner_signature().system_prompt();
        assert!(prompt.contains("1. `user_question`: The user's question"));
        assert!(prompt.contains("[[ ## external_keywords ## ]]"));
        assert!(prompt.contains(
            "Given the fields `user_question`, produce the fields `plan`, `external_keywords`."
        ));
    }

    #[test]
    fn test_user_prompt_binds_by_name() {
        let sig = planner_signature();
        let mut input = Map::new();
        input.insert("user_question".into(), json!("How should I trade today?"));
        input.insert("unrelated".into(), json!("ignored"));

        let prompt = sig.user_prompt(&input).unwrap();
        assert!(prompt.starts_with("[[ ## user_question ## ]]\nHow should I trade today?"));
        assert!(!prompt.contains("ignored"));
    }

    #[test]
    fn test_user_prompt_missing_input() {
        let err = planner_signature().user_prompt(&Map::new()).unwrap_err();
        assert!(matches!(err, AgentError::MissingInput { ref field, .. } if field == "user_question"));
    }

    #[test]
    fn test_parse_marker_reply() {
        let reply = "[[ ## plan ## ]]\n1. Compute life path\n2. Answer\n\n\
                     [[ ## external_keywords ## ]]\n[\"life_path\", \"soul\"]\n\n\
                     [[ ## completed ## ]]";

        let output = planner_signature().parse_reply(reply).unwrap();
        assert_eq!(output["plan"], json!("1. Compute life path\n2. Answer"));
        assert_eq!(output["external_keywords"], json!(["life_path", "soul"]));
    }

    #[test]
    fn test_parse_keeps_python_style_list_as_text() {
        let reply = "[[ ## plan ## ]]\nx\n[[ ## external_keywords ## ]]\n['a','b']";
        let output = planner_signature().parse_reply(reply).unwrap();
        assert_eq!(output["external_keywords"], json!("['a','b']"));
    }

    #[test]
    fn test_parse_json_reply() {
        let reply = "```json\n{\"plan\": \"p\", \"external_keywords\": [], \"extra\": 1}\n```";
        let output = planner_signature().parse_reply(reply).unwrap();
        assert_eq!(output.len(), 2);
        assert_eq!(output["plan"], json!("p"));
    }

    #[test]
    fn test_parse_reply_missing_field() {
        let err = planner_signature()
            .parse_reply("[[ ## plan ## ]]\nonly a plan")
            .unwrap_err();
        assert!(err.to_string().contains("external_keywords"));
    }
}
