//! Retrieval-augmented generation.
//!
//! This module provides:
//! - `Retriever`: ranked candidate lookup against the document index
//! - `build_prompt`: grounded prompt assembly from candidates and history
//! - `RagService`: the orchestrator external callers invoke

mod context;
mod retriever;
mod service;

pub use context::{build_prompt, HISTORY_WINDOW};
pub use retriever::{Retriever, DEFAULT_MAX_RESULTS, MAX_RESULTS_CEILING};
pub use service::RagService;
