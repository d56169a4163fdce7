//! Research assistant
//!
//! Plans web research on a topic and executes it as six sequential tasks:
//! source identification, content collection, analysis, drafting, self-review
//! and final production of Markdown, HTML and PDF reports.

pub mod analyzer;
pub mod charts;
pub mod collector;
pub mod orchestrator;
pub mod planner;
pub mod render;
pub mod steps;
pub mod types;

pub use analyzer::{AnalysisError, TextAnalyzer};
pub use collector::{ContentCollector, DuckDuckGoSearch, FetchError, HttpFetcher, PageFetcher, SearchHit, SearchProvider};
pub use orchestrator::{ResearchOrchestrator, ResearchOutcome};
pub use planner::{default_plan, parse_plan, PlanBuilder};
pub use render::ReportRenderer;
pub use steps::{ResearchStep, ResearchWorker};
pub use types::{AnalysisResult, ResearchReport, SentimentLabel, Source, SECTION_NAMES};
