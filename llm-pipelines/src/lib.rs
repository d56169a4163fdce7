//! LLM pipelines
//!
//! Three small applications that wrap LLM calls in business logic:
//!
//! - **research**: plans web research, collects and analyzes sources and
//!   writes Markdown, HTML and PDF reports
//! - **clinic**: turns a doctor's note into a stored record, prescription PDF,
//!   follow-up appointment, patient notifications and a visit summary
//! - **medical**: chains diagnostic, specialist and coordinator prompts over a
//!   medical report
//!
//! Shared pieces live in [`llm`] (the model gateway), [`workflow_utils`]
//! (JSON extraction and the task sequencer) and the `llm-pipelines-sdk` crate
//! (tasks, plans and status events).

pub mod cli;
pub mod clinic;
pub mod config;
pub mod llm;
pub mod logging;
pub mod medical;
pub mod research;
pub mod workflow_utils;
