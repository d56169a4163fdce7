//! The six research steps and the worker that executes them

use super::analyzer::TextAnalyzer;
use super::collector::{truncate_chars, ContentCollector};
use super::render::ReportRenderer;
use super::types::{AnalysisResult, ResearchReport, Source, SECTION_NAMES};
use crate::config::Settings;
use crate::llm::SharedGateway;
use crate::workflow_utils::StepExecutor;
use anyhow::{Context, Result};
use llm_pipelines_sdk::{async_trait, StatusEvent, StatusReporter, Task};
use std::path::Path;

const WORKER: &str = "worker";
const WRITER: &str = "writer";
const EDITOR: &str = "editor";

const SOURCE_CONTEXT_CHARS: usize = 1500;
/// Reviewed text at or below this length is treated as a failed rewrite
const MIN_REVISION_CHARS: usize = 50;

const QUERY_TEMPERATURE: f32 = 0.3;
const DRAFT_TEMPERATURE: f32 = 0.7;
const REVIEW_TEMPERATURE: f32 = 0.5;

const WRITER_SYSTEM_PROMPT: &str = "You are a research report writer. Write clear, professional, \
and well-structured content based on the provided sources and analysis. Be factual and cite \
findings from the sources.";

const EDITOR_SYSTEM_PROMPT: &str = "You are a critical editor reviewing a research report. \
Identify specific improvements needed and rewrite sections to be clearer, more professional, and \
better structured. Focus on clarity and accuracy.";

/// Step kinds, keyed by task id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchStep {
    IdentifySources,
    CollectContent,
    Analyze,
    DraftReport,
    Review,
    Finalize,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("no research step has task id {0}")]
pub struct UnknownStep(pub u32);

impl TryFrom<u32> for ResearchStep {
    type Error = UnknownStep;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Ok(match id {
            1 => ResearchStep::IdentifySources,
            2 => ResearchStep::CollectContent,
            3 => ResearchStep::Analyze,
            4 => ResearchStep::DraftReport,
            5 => ResearchStep::Review,
            6 => ResearchStep::Finalize,
            other => return Err(UnknownStep(other)),
        })
    }
}

fn section_instruction(section: &str) -> &'static str {
    match section {
        "Executive Summary" => "Write a concise executive summary (2-3 paragraphs) of the research findings.",
        "Introduction" => "Write an introduction explaining the topic and its significance.",
        "Key Findings" => "Summarize the main findings from the sources in bullet points.",
        "Analysis" => "Provide deeper analysis and interpretation of the findings.",
        "Conclusion" => "Write a conclusion with key takeaways and potential future directions.",
        _ => "Write this section of the report.",
    }
}

/// Carries the state that flows between steps: sources, analysis and the
/// report under construction.
pub struct ResearchWorker {
    topic: String,
    llm: SharedGateway,
    collector: ContentCollector,
    analyzer: TextAnalyzer,
    renderer: ReportRenderer,
    max_sources: usize,
    max_review_iterations: usize,
    sources: Vec<Source>,
    analysis: Option<AnalysisResult>,
    report: ResearchReport,
}

impl ResearchWorker {
    pub fn new(
        topic: impl Into<String>,
        llm: SharedGateway,
        collector: ContentCollector,
        analyzer: TextAnalyzer,
        renderer: ReportRenderer,
        settings: &Settings,
    ) -> Self {
        let topic = topic.into();
        Self {
            report: ResearchReport::new(topic.clone()),
            topic,
            llm,
            collector,
            analyzer,
            renderer,
            max_sources: settings.max_sources,
            max_review_iterations: settings.max_review_iterations,
            sources: Vec::new(),
            analysis: None,
        }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn report(&self) -> &ResearchReport {
        &self.report
    }

    pub fn into_report(self) -> ResearchReport {
        self.report
    }

    fn event(phase: &str, message: impl Into<String>) -> StatusEvent {
        StatusEvent::new(phase, message).from_agent(WORKER)
    }

    async fn identify_sources(&mut self, reporter: &mut StatusReporter) -> Result<String> {
        reporter.emit(Self::event("SEARCH", format!("Searching for sources on: {}", self.topic)));

        let prompt = format!(
            "Create a focused search query to find authoritative sources about:\n{}\n\n\
             Respond with just the search query, nothing else.",
            self.topic
        );
        let response = self
            .llm
            .complete(&prompt, None, Some(QUERY_TEMPERATURE))
            .await
            .context("search query generation")?;
        let query = response.trim().trim_matches('"').trim();
        let query = if query.is_empty() { self.topic.as_str() } else { query };
        reporter.emit(Self::event("QUERY", format!("Search query: {}", query)));

        self.sources = self.collector.find_sources(query, self.max_sources + 2).await;

        let mut result = format!("Found {} sources:", self.sources.len());
        for source in self.sources.iter().take(self.max_sources) {
            result.push_str("\n- ");
            result.push_str(&source.title);
        }
        Ok(result)
    }

    async fn collect_content(&mut self, reporter: &mut StatusReporter) -> Result<String> {
        reporter.emit(Self::event(
            "COLLECT",
            format!("Collecting content from {} sources", self.sources.len().min(self.max_sources)),
        ));

        self.sources = self.collector.collect(&self.sources, self.max_sources, reporter).await;
        self.report.sources = self.sources.clone();

        let chars: usize = self.sources.iter().map(|s| s.content.chars().count()).sum();
        Ok(format!("Collected {} characters from {} sources", chars, self.sources.len()))
    }

    fn analyze(&mut self, reporter: &mut StatusReporter) -> Result<String> {
        reporter.emit(Self::event("ANALYZE", "Analyzing collected content"));

        let analysis = self.analyzer.analyze(&self.sources, &self.topic)?;
        let result = format!(
            "Analysis complete: {} words, sentiment: {}",
            analysis.word_count, analysis.sentiment_label
        );
        self.report.analysis = Some(analysis.clone());
        self.analysis = Some(analysis);
        Ok(result)
    }

    fn source_context(&self) -> String {
        if self.sources.is_empty() {
            return "No sources were collected.".to_string();
        }
        self.sources
            .iter()
            .map(|s| format!("SOURCE: {}\n{}", s.title, truncate_chars(&s.content, SOURCE_CONTEXT_CHARS)))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn analysis_context(&self) -> String {
        match &self.analysis {
            Some(a) => format!(
                "ANALYSIS RESULTS:\n- Words analyzed: {}\n- Sentiment: {} ({:.3})\n- Top keywords: {}",
                a.word_count,
                a.sentiment_label,
                a.sentiment_score,
                a.keyword_names(10).join(", ")
            ),
            None => "ANALYSIS RESULTS: no analysis available".to_string(),
        }
    }

    async fn draft_report(&mut self, reporter: &mut StatusReporter) -> Result<String> {
        reporter.emit(Self::event("DRAFT", "Drafting report sections"));

        let source_context = self.source_context();
        let analysis_context = self.analysis_context();

        for section in SECTION_NAMES {
            reporter.emit(Self::event("WRITING", format!("Writing: {}", section)).with_detail("section", section));
            let prompt = format!(
                "Based on the following sources and analysis, {}\n\nTOPIC: {}\n\n{}\n\n{}\n\nWrite the {} section:",
                section_instruction(section),
                self.topic,
                source_context,
                analysis_context,
                section
            );
            let content = self
                .llm
                .complete(&prompt, Some(WRITER_SYSTEM_PROMPT), Some(DRAFT_TEMPERATURE))
                .await
                .with_context(|| format!("drafting {}", section))?;

            self.report.set_section(section, content.trim());
            self.report.record_author(section, WRITER);
        }

        Ok(format!("Drafted {} sections", self.report.sections.len()))
    }

    async fn review(&mut self, reporter: &mut StatusReporter) -> Result<String> {
        reporter.emit(Self::event("REVIEW", "Starting self-review"));
        let mut improvements = 0;

        for iteration in 1..=self.max_review_iterations {
            reporter.emit(
                Self::event("REVIEW_ITERATION", format!("Review iteration {}/{}", iteration, self.max_review_iterations))
                    .with_detail("iteration", iteration),
            );

            let sections: Vec<(String, String)> = self
                .report
                .sections
                .iter()
                .map(|s| (s.name.clone(), s.content.clone()))
                .collect();

            for (name, content) in sections {
                let prompt = format!(
                    "Review and improve this section of a research report on \"{}\".\n\n\
                     SECTION: {}\nCURRENT CONTENT:\n{}\n\n\
                     Provide an improved version that is:\n\
                     1. Clearer and more concise\n\
                     2. Better structured\n\
                     3. More professional in tone\n\
                     4. Factually accurate\n\n\
                     Return ONLY the improved content, no explanations.",
                    self.topic, name, content
                );
                let revised = self
                    .llm
                    .complete(&prompt, Some(EDITOR_SYSTEM_PROMPT), Some(REVIEW_TEMPERATURE))
                    .await
                    .with_context(|| format!("reviewing {}", name))?;

                let revised = revised.trim();
                if revised.chars().count() > MIN_REVISION_CHARS {
                    self.report.set_section(&name, revised);
                    self.report.record_author(&name, EDITOR);
                    improvements += 1;
                } else {
                    tracing::debug!(section = %name, "revision too short, keeping draft");
                }
            }
        }

        Ok(format!(
            "Completed {} review iterations, {} improvements",
            self.max_review_iterations, improvements
        ))
    }

    fn finalize(&mut self, reporter: &mut StatusReporter) -> Result<String> {
        reporter.emit(Self::event("FINALIZE", "Producing final report"));

        let markdown = self.renderer.generate_markdown(&self.report)?;
        let md_path = self
            .renderer
            .save_markdown(&self.report, &markdown)
            .context("saving markdown report")?;
        self.report.markdown_content = markdown;
        self.report.artifacts.markdown = Some(md_path.clone());
        reporter.emit(Self::output_event("md", &md_path));
        let mut formats = vec!["md"];

        match self.renderer.save_html(&self.report, &self.report.markdown_content) {
            Ok(path) => {
                reporter.emit(Self::output_event("html", &path));
                self.report.artifacts.html = Some(path);
                formats.push("html");
            }
            Err(e) => tracing::warn!(error = %e, "HTML rendering failed"),
        }

        match self.renderer.save_pdf(&self.report, &self.report.markdown_content) {
            Ok(path) => {
                reporter.emit(Self::output_event("pdf", &path));
                self.report.artifacts.pdf = Some(path);
                formats.push("pdf");
            }
            Err(e) => {
                tracing::warn!(error = %e, "PDF rendering failed, using markdown");
                self.report.artifacts.pdf = Some(md_path);
            }
        }

        Ok(format!("Generated outputs: {}", formats.join(", ")))
    }

    fn output_event(format: &str, path: &Path) -> StatusEvent {
        Self::event("OUTPUT", format!("Saved {}: {}", format, path.display())).with_detail("format", format)
    }
}

#[async_trait]
impl StepExecutor for ResearchWorker {
    async fn execute_step(&mut self, task: &Task, reporter: &mut StatusReporter) -> Result<String> {
        match ResearchStep::try_from(task.id)? {
            ResearchStep::IdentifySources => self.identify_sources(reporter).await,
            ResearchStep::CollectContent => self.collect_content(reporter).await,
            ResearchStep::Analyze => self.analyze(reporter),
            ResearchStep::DraftReport => self.draft_report(reporter).await,
            ResearchStep::Review => self.review(reporter).await,
            ResearchStep::Finalize => self.finalize(reporter),
        }
    }

    fn agent_name(&self) -> &str {
        WORKER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_ids_map_to_kinds() {
        assert_eq!(ResearchStep::try_from(1), Ok(ResearchStep::IdentifySources));
        assert_eq!(ResearchStep::try_from(3), Ok(ResearchStep::Analyze));
        assert_eq!(ResearchStep::try_from(6), Ok(ResearchStep::Finalize));
        assert_eq!(ResearchStep::try_from(0), Err(UnknownStep(0)));
        assert_eq!(ResearchStep::try_from(7), Err(UnknownStep(7)));
    }

    #[test]
    fn test_every_section_has_an_instruction() {
        for section in SECTION_NAMES {
            assert_ne!(section_instruction(section), section_instruction("Appendix"));
        }
    }
}
