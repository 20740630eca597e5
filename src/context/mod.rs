//! External context providers
//!
//! After planning, the chain hands the planner's keywords to an
//! `ExternalLookup` and passes whatever it returns to the execute agent as
//! `external_data`.

pub mod numerology;
pub mod trading;

pub use numerology::NumerologyContextProvider;
pub use trading::TradingContextProvider;

use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Keyword → context text, ordered by keyword
pub type ContextSources = BTreeMap<String, String>;

#[async_trait]
pub trait ExternalLookup: Send + Sync {
    /// `Ok(None)` when there is nothing to add
    async fn lookup(&self, keywords: &[String]) -> Result<Option<ContextSources>>;

    /// Keywords used when the planner's list cannot be read
    fn default_keywords(&self) -> Vec<String> {
        Vec::new()
    }
}

/// `key: value` blocks separated by blank lines
pub fn format_context(sources: &ContextSources) -> String {
    sources
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join("\n\n")
}
