//! Shared pipeline building blocks
//!
//! - **json**: locating and decoding JSON in model output
//! - **sequencer**: ordered task execution with status reporting

pub mod json;
pub mod sequencer;

pub use json::{extract_json, extract_json_object, parse_json, parse_json_object, ParseError};
pub use sequencer::{execute_plan, SequenceSummary, StepExecutor, TaskCallback};
