//! Conversational engine for docent
//!
//! Wraps a session's knowledge index with the instruction prompt, a fixed
//! retrieval depth, and a bounded conversational memory, and drives one
//! turn at a time: streamed answer first, source-attribution footer second.

pub mod engine;
pub mod prompt;
pub mod turn;

pub use engine::{ChatEngine, EngineConfig, StreamedReply};
pub use turn::{build_sources_message, display_file_name, run_turn, TurnOutcome};
