//! Knowledge base build. Every stage does real model work and feeds the next.

use crate::domain::{
    AudienceSegment, BusinessProfile, KnowledgeBase, Offering, OfferingList, SegmentList,
};
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use crate::pipeline::{Pipeline, PipelineBuilder, Stage};
use crate::prompts;
use marquee_abstraction::{GroundingSource, ModelRequest};
use serde_json::json;
use tracing::debug;

pub const RESEARCH_STAGE: &str = "Researching brand presence";
pub const OFFERINGS_STAGE: &str = "Mapping offerings";
pub const AUDIENCE_STAGE: &str = "Profiling audience";
pub const ASSEMBLY_STAGE: &str = "Assembling knowledge base";

/// What earlier stages have learned so far.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeDraft {
    research: String,
    sources: Vec<GroundingSource>,
    offerings: Vec<Offering>,
    segments: Vec<AudienceSegment>,
}

/// Builds the knowledge base pipeline.
///
/// # Errors
/// `InvalidInput` if the profile is unusable.
pub fn knowledge_base(
    orchestrator: &Orchestrator,
    profile: &BusinessProfile,
) -> Result<Pipeline<KnowledgeDraft, KnowledgeBase>> {
    profile.validate()?;

    let research = {
        let orchestrator = orchestrator.clone();
        let request = ModelRequest::text(prompts::brand_research(profile)).with_web_search();
        Stage::work(RESEARCH_STAGE, move |mut draft: KnowledgeDraft| async move {
            let response = orchestrator.invoke(&request).await?;
            debug!(sources = response.grounding_sources.len(), "Brand research gathered");
            draft.research = response.raw_text;
            draft.sources = response.grounding_sources;
            Ok(draft)
        })
    };

    let offerings = {
        let orchestrator = orchestrator.clone();
        let profile = profile.clone();
        Stage::work(OFFERINGS_STAGE, move |mut draft: KnowledgeDraft| async move {
            let request = ModelRequest::text(prompts::offerings(&profile, &draft.research)).json();
            let list: OfferingList = orchestrator.extract(&request).await?;
            draft.offerings = list.offerings;
            Ok(draft)
        })
    };

    let audience = {
        let orchestrator = orchestrator.clone();
        let profile = profile.clone();
        Stage::work(AUDIENCE_STAGE, move |mut draft: KnowledgeDraft| async move {
            let request = ModelRequest::text(prompts::audience(&profile, &draft.research)).json();
            let list: SegmentList = orchestrator.extract(&request).await?;
            draft.segments = list.segments;
            Ok(draft)
        })
    };

    let orchestrator = orchestrator.clone();
    let profile = profile.clone();

    Ok(PipelineBuilder::new(KnowledgeDraft::default())
        .with_pacing(orchestrator.pacing())
        .stage(research)
        .stage(offerings)
        .stage(audience)
        .finish(ASSEMBLY_STAGE, move |draft: KnowledgeDraft| async move {
            let findings = json!({
                "offerings": &draft.offerings,
                "audience_segments": &draft.segments,
            })
            .to_string();
            let request =
                ModelRequest::text(prompts::knowledge_base(&profile, &draft.research, &findings)).json();

            let mut kb: KnowledgeBase = orchestrator.extract(&request).await?;
            kb.offerings = draft.offerings;
            kb.audience_segments = draft.segments;
            kb.sources = draft.sources;
            Ok(kb)
        }))
}
