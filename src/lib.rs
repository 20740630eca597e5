//! Lumir Agent
//!
//! A three-role agent chain driven by JSON-declared prompt signatures:
//! - an analyze agent plans and names the context it needs
//! - an optional external lookup turns those keywords into reference text
//!   (numerology documents or trading statistics)
//! - an execute agent answers, and a checker agent lists missing plan steps
//!   that are fed back until the answer is accepted or iterations run out
//!
//! LOOP:
//! PLAN → ENRICH? → (EXECUTE → CHECK → RETRY?)* → COMPLETE

pub mod agent;
pub mod api;
pub mod config;
pub mod context;
pub mod documents;
pub mod error;
pub mod evaluator;
pub mod llm;
pub mod models;
pub mod numerology;
pub mod signature;
pub mod telemetry;
pub mod trading;

pub use error::Result;

// Re-export common types
pub use agent::{AgentChain, ChainOutcome};
pub use models::*;
