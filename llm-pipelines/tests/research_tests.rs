//! Integration tests for the research assistant
//!
//! - Planner parsing and fallback
//! - Content collection and analysis
//! - Full orchestrated runs against stub search, fetch and model

mod research {
    mod common;
    mod test_components;
    mod test_pipeline;
}
