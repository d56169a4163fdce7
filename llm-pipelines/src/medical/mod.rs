//! Medical report analyzer
//!
//! Diagnostic, specialist and coordinator prompts chained over one report.

pub mod analyzer;

pub use analyzer::{
    agent_info, sample_report, AgentInfo, ConsultationResult, ReportAnalyzer, DEFAULT_MODEL, SAMPLE_REPORTS,
};
