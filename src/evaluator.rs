//! Plan-adherence scoring
//!
//! A standalone judge, separate from the chain's checker: given a question,
//! the plan and the final answer, it returns a written evaluation and a
//! 0-10 score.

use crate::agent::AgentWrapper;
use crate::llm::LanguageModel;
use crate::models::{AgentConfig, PlanEvaluation};
use crate::signature::value_text;
use crate::Result;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

const EVALUATOR_NAME: &str = "plan_evaluator";
const MAX_SCORE: u8 = 10;

lazy_static! {
    static ref SINGLE_DIGIT: Regex = Regex::new(r"\b[0-9]\b").expect("valid digit pattern");
    static ref DIGITS: Regex = Regex::new(r"[0-9]+").expect("valid digits pattern");
}

/// Score text → 0..=10. A standalone digit wins; otherwise the first digit
/// run is clamped; otherwise 0.
pub fn parse_score(text: &str) -> u8 {
    if let Some(m) = SINGLE_DIGIT.find(text) {
        if let Ok(score) = m.as_str().parse::<u8>() {
            return score;
        }
    }

    match DIGITS.find(text) {
        // An overflowing run is still larger than the cap
        Some(m) => m
            .as_str()
            .parse::<u64>()
            .map(|n| n.min(MAX_SCORE as u64) as u8)
            .unwrap_or(MAX_SCORE),
        None => 0,
    }
}

pub fn parse_follow_plan(text: &str) -> bool {
    text.trim().to_lowercase() == "true"
}

pub struct PlanEvaluator {
    agent: AgentWrapper,
}

impl PlanEvaluator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Result<Self> {
        let config = AgentConfig::from_value(&json!({
            "name": EVALUATOR_NAME,
            "input": {
                "question": "The user's original question",
                "plan": "The step-by-step plan the answer should follow",
                "answer": "The answer to evaluate"
            },
            "output": {
                "evaluation": "How well the answer follows the plan and answers the question",
                "score": "A single integer from 0 to 10",
                "follow_plan": "true if every plan step is covered, otherwise false",
                "missing_steps": "Plan steps the answer skipped, or None"
            },
            "objective_instruction": "Judge whether the answer follows the plan and fully answers the question."
        }))?;

        Ok(Self {
            agent: AgentWrapper::new(config, model)?,
        })
    }

    pub async fn evaluate(&self, question: &str, plan: &str, answer: &str) -> Result<PlanEvaluation> {
        let mut input = Map::new();
        input.insert("question".to_string(), Value::String(question.to_string()));
        input.insert("plan".to_string(), Value::String(plan.to_string()));
        input.insert("answer".to_string(), Value::String(answer.to_string()));

        let output = self.agent.execute(&input).await?;
        let field = |name: &str| output.get(name).map(value_text).unwrap_or_default();

        let evaluation = PlanEvaluation {
            evaluation: field("evaluation"),
            score: parse_score(&field("score")),
            follow_plan: parse_follow_plan(&field("follow_plan")),
            missing_steps: field("missing_steps"),
        };

        info!(
            score = evaluation.score,
            follow_plan = evaluation.follow_plan,
            "Plan evaluation complete"
        );
        Ok(evaluation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("7"), 7);
        assert_eq!(parse_score("7/10"), 7);
        assert_eq!(parse_score("Score: 15"), 10);
        assert_eq!(parse_score("no score"), 0);
        assert_eq!(parse_score("score 10"), 10);
        assert_eq!(parse_score("99999999999999999999999"), 10);
    }

    #[test]
    fn test_parse_follow_plan() {
        assert!(parse_follow_plan(" True "));
        assert!(!parse_follow_plan("true, mostly"));
        assert!(!parse_follow_plan("yes"));
    }

    #[tokio::test]
    async fn test_evaluate() {
        let model = Arc::new(ScriptedModel::from_replies([
            "[[ ## evaluation ## ]]\nCovers both steps.\n[[ ## score ## ]]\n8/10\n\
             [[ ## follow_plan ## ]]\nTRUE\n[[ ## missing_steps ## ]]\nNone\n[[ ## completed ## ]]",
        ]));
        let evaluator = PlanEvaluator::new(model.clone()).unwrap();

        let result = evaluator
            .evaluate("How to save?", "1. budget\n2. automate", "Budget, then automate.")
            .await
            .unwrap();

        assert_eq!(result.score, 8);
        assert!(result.follow_plan);
        assert_eq!(result.evaluation, "Covers both steps.");
        assert_eq!(result.missing_steps, "None");
        assert!(model.calls().await[0].1.contains("[[ ## answer ## ]]\nBudget, then automate."));
    }
}
