//! SEO audit: crawl the site, audit each competitor, then synthesize a grounded report.

use super::distinct_values;
use crate::domain::{BusinessProfile, Grounded, SeoAnalysisResult};
use crate::error::{OrchestrationError, Result};
use crate::orchestrator::Orchestrator;
use crate::pipeline::{Pipeline, PipelineBuilder, Stage};
use crate::prompts;
use marquee_abstraction::ModelRequest;
use tracing::info;

pub const SYNTHESIS_STAGE: &str = "Synthesizing SEO report";

/// Builds the SEO audit pipeline.
///
/// Stages: `Crawling <site>`, one `Auditing competitor <url>` per distinct
/// competitor, then [`SYNTHESIS_STAGE`], which makes one web-grounded call.
///
/// # Errors
/// `InvalidInput` if the profile or site URL is unusable.
pub fn seo_audit(
    orchestrator: &Orchestrator,
    profile: &BusinessProfile,
    site_url: &str,
    competitor_urls: &[String],
) -> Result<Pipeline<(), SeoAnalysisResult>> {
    profile.validate()?;
    let site = site_url.trim();
    if site.is_empty() {
        return Err(OrchestrationError::InvalidInput("A site URL is required for an SEO audit".to_string()));
    }

    let competitors = distinct_values(competitor_urls.iter().map(String::as_str));
    info!(site, competitors = competitors.len(), "Planning SEO audit");

    let mut builder = PipelineBuilder::new(())
        .with_pacing(orchestrator.pacing())
        .stage(Stage::paced(format!("Crawling {site}")));
    for url in &competitors {
        builder = builder.stage(Stage::paced(format!("Auditing competitor {url}")));
    }

    let request = ModelRequest::text(prompts::seo_synthesis(profile, site, &competitors)).with_web_search();
    let orchestrator = orchestrator.clone();

    Ok(builder.finish(SYNTHESIS_STAGE, move |()| async move {
        let Grounded { value: mut report, sources } =
            orchestrator.extract_grounded::<SeoAnalysisResult>(&request).await?;
        report.sources = sources;
        Ok(report)
    }))
}
