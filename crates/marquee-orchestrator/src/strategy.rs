//! One-shot strategy functions.
//!
//! Each builds a prompt, calls the model through the orchestrator, and maps the
//! reply onto a domain record.

use crate::domain::{
    BudgetAnalysis, BusinessProfile, CampaignMetrics, CompetitorLandscape, ContentCalendar,
    CreativeAnalysis, Grounded, OptimizationSuggestion, Persona, PersonaList, SuggestionList,
};
use crate::error::{OrchestrationError, Result};
use crate::orchestrator::Orchestrator;
use crate::prompts;
use marquee_abstraction::{Attachment, ModelRequest};
use tracing::info;

/// Most personas one call may ask for.
pub const MAX_PERSONAS: usize = 10;

/// Longest content calendar one call may plan.
pub const MAX_CALENDAR_WEEKS: u32 = 12;

/// Generates `count` customer personas.
///
/// # Errors
/// `InvalidInput` for a count outside `1..=MAX_PERSONAS`, otherwise any
/// orchestration error.
pub async fn generate_personas(
    orchestrator: &Orchestrator,
    profile: &BusinessProfile,
    count: usize,
) -> Result<Vec<Persona>> {
    profile.validate()?;
    if !(1..=MAX_PERSONAS).contains(&count) {
        return Err(OrchestrationError::InvalidInput(format!(
            "Persona count must be between 1 and {MAX_PERSONAS}"
        )));
    }

    let request = ModelRequest::text(prompts::personas(profile, count)).json();
    let list: PersonaList = orchestrator.extract(&request).await?;
    info!(business = %profile.name, personas = list.personas.len(), "Generated personas");
    Ok(list.personas)
}

/// Splits `total_budget` across marketing channels.
///
/// # Errors
/// `InvalidInput` for a non-positive budget, otherwise any orchestration error.
pub async fn analyze_budget(
    orchestrator: &Orchestrator,
    profile: &BusinessProfile,
    total_budget: f64,
) -> Result<BudgetAnalysis> {
    profile.validate()?;
    if !total_budget.is_finite() || total_budget <= 0.0 {
        return Err(OrchestrationError::InvalidInput("Budget must be a positive amount".to_string()));
    }

    let request = ModelRequest::text(prompts::budget(profile, total_budget)).json();
    orchestrator.extract(&request).await
}

/// Suggests changes to a running campaign.
///
/// # Errors
/// Any orchestration error.
pub async fn suggest_optimizations(
    orchestrator: &Orchestrator,
    profile: &BusinessProfile,
    metrics: &CampaignMetrics,
) -> Result<Vec<OptimizationSuggestion>> {
    profile.validate()?;
    let request = ModelRequest::text(prompts::optimizations(profile, metrics)).json();
    let list: SuggestionList = orchestrator.extract(&request).await?;
    Ok(list.suggestions)
}

/// Plans `weeks` weeks of content.
///
/// # Errors
/// `InvalidInput` for a week count outside `1..=MAX_CALENDAR_WEEKS`, otherwise
/// any orchestration error.
pub async fn plan_content_calendar(
    orchestrator: &Orchestrator,
    profile: &BusinessProfile,
    weeks: u32,
) -> Result<ContentCalendar> {
    profile.validate()?;
    if !(1..=MAX_CALENDAR_WEEKS).contains(&weeks) {
        return Err(OrchestrationError::InvalidInput(format!(
            "Calendar length must be between 1 and {MAX_CALENDAR_WEEKS} weeks"
        )));
    }

    let request = ModelRequest::text(prompts::content_calendar(profile, weeks)).json();
    orchestrator.extract(&request).await
}

/// Critiques an image creative.
///
/// # Errors
/// `InvalidInput` if the attachment is not an image, otherwise any
/// orchestration error.
pub async fn analyze_creative(
    orchestrator: &Orchestrator,
    profile: &BusinessProfile,
    image: Attachment,
) -> Result<CreativeAnalysis> {
    profile.validate()?;
    if !image.mime_type.starts_with("image/") {
        return Err(OrchestrationError::InvalidInput(format!(
            "Creative must be an image, got {}",
            image.mime_type
        )));
    }

    let request = ModelRequest::text(prompts::creative(profile)).with_attachment(image).json();
    orchestrator.extract(&request).await
}

/// Researches competitors with web grounding.
///
/// # Errors
/// Any orchestration error.
pub async fn research_competitors(
    orchestrator: &Orchestrator,
    profile: &BusinessProfile,
) -> Result<Grounded<CompetitorLandscape>> {
    profile.validate()?;
    let request = ModelRequest::text(prompts::competitors(profile)).with_web_search();
    let landscape: Grounded<CompetitorLandscape> = orchestrator.extract_grounded(&request).await?;
    info!(
        business = %profile.name,
        competitors = landscape.value.competitors.len(),
        sources = landscape.sources.len(),
        "Researched competitors"
    );
    Ok(landscape)
}
