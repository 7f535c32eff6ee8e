//! AI response orchestration for Marquee.
//!
//! Everything between a prompt and a typed marketing result lives here:
//!
//! - [`normalize`]: coerces loosely formatted model output into JSON
//! - [`retry`]: bounded exponential backoff for rate-limited calls
//! - [`pipeline`]: named stages that report progress as a stream
//! - [`strategy`] and [`workflows`]: the marketing use cases built on top
//!
//! The model itself is injected as an `Arc<dyn Model>` through [`Orchestrator`].

pub mod domain;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod pacing;
pub mod pipeline;
pub mod prompts;
pub mod retry;
pub mod strategy;
pub mod workflows;

pub use domain::{
    AudienceSegment, BudgetAllocation, BudgetAnalysis, BusinessProfile, CalendarWeek,
    CampaignMetrics, CompetitorLandscape, CompetitorProfile, CompetitorSeoInsight, ContentCalendar,
    ContentItem, CreativeAnalysis, Faq, Grounded, KeywordOpportunity, KnowledgeBase, Offering,
    OptimizationSuggestion, Persona, PersonaReaction, ResonanceReport, SeoAnalysisResult,
};
pub use error::{OrchestrationError, Result, SERVICE_BUSY_MESSAGE};
pub use normalize::{normalize, normalize_bytes};
pub use orchestrator::Orchestrator;
pub use pacing::{NoPacing, Pacing, RandomPacing};
pub use pipeline::{
    OrchestrationStage, Pipeline, PipelineBuilder, ProgressEvent, ProgressStream, Stage,
    StageStatus, TaskList, drive,
};
pub use retry::{RetryPolicy, with_retry};
