//! Marketing domain records.
//!
//! Inputs (`BusinessProfile`, `CampaignMetrics`) are supplied by the caller.
//! Everything else is built from model output: fields a result cannot exist
//! without are required, every other field falls back to its default.

use crate::error::{OrchestrationError, Result};
use marquee_abstraction::GroundingSource;
use serde::{Deserialize, Serialize};

/// What the user tells us about their business.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub name: String,
    pub industry: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub competitors: Vec<String>,
    #[serde(default)]
    pub brand_voice: Option<String>,
}

impl BusinessProfile {
    pub fn new(name: impl Into<String>, industry: impl Into<String>) -> Self {
        Self { name: name.into(), industry: industry.into(), ..Self::default() }
    }

    /// Checks the fields every prompt relies on.
    ///
    /// # Errors
    /// Returns `InvalidInput` naming the first empty required field.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(OrchestrationError::InvalidInput("Business name is required".to_string()));
        }
        if self.industry.trim().is_empty() {
            return Err(OrchestrationError::InvalidInput("Industry is required".to_string()));
        }
        Ok(())
    }
}

/// A result together with the web pages the model cited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grounded<T> {
    pub value: T,
    pub sources: Vec<GroundingSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub summary: String,
    #[serde(default)]
    pub age_range: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub pain_points: Vec<String>,
    #[serde(default)]
    pub preferred_channels: Vec<String>,
    #[serde(default)]
    pub quote: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct PersonaList {
    pub personas: Vec<Persona>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAllocation {
    pub channel: String,
    pub amount: f64,
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAnalysis {
    pub total_budget: f64,
    pub allocations: Vec<BudgetAllocation>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub projected_outcome: Option<String>,
}

impl BudgetAnalysis {
    /// Sum of all allocated amounts.
    pub fn allocated(&self) -> f64 {
        self.allocations.iter().map(|a| a.amount).sum()
    }
}

/// Observed performance of a running campaign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignMetrics {
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub conversions: u64,
    #[serde(default)]
    pub spend: f64,
    #[serde(default)]
    pub revenue: f64,
}

impl CampaignMetrics {
    /// Click-through rate as a fraction, if there were impressions.
    #[allow(clippy::cast_precision_loss)]
    pub fn click_through_rate(&self) -> Option<f64> {
        (self.impressions > 0).then(|| self.clicks as f64 / self.impressions as f64)
    }

    /// Cost per conversion, if anything converted.
    #[allow(clippy::cast_precision_loss)]
    pub fn cost_per_acquisition(&self) -> Option<f64> {
        (self.conversions > 0).then(|| self.spend / self.conversions as f64)
    }

    /// Revenue over spend, if anything was spent.
    pub fn return_on_ad_spend(&self) -> Option<f64> {
        (self.spend > 0.0).then(|| self.revenue / self.spend)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSuggestion {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub expected_impact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct SuggestionList {
    pub suggestions: Vec<OptimizationSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub channel: String,
    pub topic: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarWeek {
    pub week: u32,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub items: Vec<ContentItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentCalendar {
    pub weeks: Vec<CalendarWeek>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeAnalysis {
    pub overall_score: f64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub brand_alignment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorProfile {
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub positioning: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorLandscape {
    pub competitors: Vec<CompetitorProfile>,
    #[serde(default)]
    pub market_summary: String,
    #[serde(default)]
    pub opportunities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordOpportunity {
    pub keyword: String,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorSeoInsight {
    pub url: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoAnalysisResult {
    pub overall_score: f64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub keyword_opportunities: Vec<KeywordOpportunity>,
    #[serde(default)]
    pub technical_issues: Vec<String>,
    #[serde(default)]
    pub content_gaps: Vec<String>,
    #[serde(default)]
    pub competitor_insights: Vec<CompetitorSeoInsight>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Filled from grounding metadata, never from the model's JSON.
    #[serde(default, skip_deserializing)]
    pub sources: Vec<GroundingSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaReaction {
    pub persona: String,
    pub reaction: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub concerns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceReport {
    pub overall_score: f64,
    pub reactions: Vec<PersonaReaction>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offering {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub differentiators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct OfferingList {
    pub offerings: Vec<Offering>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudienceSegment {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub needs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct SegmentList {
    pub segments: Vec<AudienceSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

/// Everything the assistant knows about a brand, assembled in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub brand_summary: String,
    #[serde(default)]
    pub brand_voice: String,
    #[serde(default)]
    pub key_messages: Vec<String>,
    #[serde(default)]
    pub faqs: Vec<Faq>,
    #[serde(default)]
    pub offerings: Vec<Offering>,
    #[serde(default)]
    pub audience_segments: Vec<AudienceSegment>,
    #[serde(default, skip_deserializing)]
    pub sources: Vec<GroundingSource>,
}
