//! Script Generation Orchestrator: gathers evidence documents from all
//! active sources and drives the schema-constrained Gemini invocation.

pub mod orchestrator;

pub use orchestrator::{Orchestrator, RunConfig, RunOutcome, SearchSettings, wrap_prompt};
