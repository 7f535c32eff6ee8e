//! Resonance test: simulate each persona's reaction to a piece of content.

use super::distinct_labels;
use crate::domain::{BusinessProfile, Persona, ResonanceReport};
use crate::error::{OrchestrationError, Result};
use crate::orchestrator::Orchestrator;
use crate::pipeline::{Pipeline, PipelineBuilder, Stage};
use crate::prompts;
use marquee_abstraction::ModelRequest;

pub const REPORT_STAGE: &str = "Compiling resonance report";

/// Builds the resonance test pipeline: one `Simulating <persona>` stage per
/// persona, then [`REPORT_STAGE`].
///
/// # Errors
/// `InvalidInput` if there is no content or no persona to test against.
pub fn resonance_test(
    orchestrator: &Orchestrator,
    profile: &BusinessProfile,
    content: &str,
    personas: &[Persona],
) -> Result<Pipeline<(), ResonanceReport>> {
    profile.validate()?;
    if content.trim().is_empty() {
        return Err(OrchestrationError::InvalidInput("Content to test is empty".to_string()));
    }
    if personas.is_empty() {
        return Err(OrchestrationError::InvalidInput(
            "At least one persona is required for a resonance test".to_string(),
        ));
    }

    let mut builder = PipelineBuilder::new(()).with_pacing(orchestrator.pacing());
    for name in distinct_labels(personas.iter().map(|p| p.name.as_str())) {
        builder = builder.stage(Stage::paced(format!("Simulating {name}")));
    }

    let request = ModelRequest::text(prompts::resonance(profile, content.trim(), personas)).json();
    let orchestrator = orchestrator.clone();

    Ok(builder.finish(REPORT_STAGE, move |()| async move {
        orchestrator.extract::<ResonanceReport>(&request).await
    }))
}
