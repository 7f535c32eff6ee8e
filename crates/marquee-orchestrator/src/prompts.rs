//! Prompt builders.
//!
//! Each builder returns the full prompt text for one model call. The JSON shape
//! described in each prompt mirrors the matching record in `domain`.

use crate::domain::{BusinessProfile, CampaignMetrics, Persona};
use std::fmt::Write;

/// Renders the profile as the context block shared by every prompt.
pub fn profile_context(profile: &BusinessProfile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Business: {}", profile.name);
    let _ = writeln!(out, "Industry: {}", profile.industry);
    if !profile.description.is_empty() {
        let _ = writeln!(out, "Description: {}", profile.description);
    }
    if let Some(website) = &profile.website {
        let _ = writeln!(out, "Website: {website}");
    }
    if !profile.target_audience.is_empty() {
        let _ = writeln!(out, "Target audience: {}", profile.target_audience);
    }
    push_list(&mut out, "Products and services", &profile.products);
    push_list(&mut out, "Goals", &profile.goals);
    push_list(&mut out, "Known competitors", &profile.competitors);
    if let Some(voice) = &profile.brand_voice {
        let _ = writeln!(out, "Brand voice: {voice}");
    }
    out
}

fn push_list(out: &mut String, label: &str, items: &[String]) {
    if !items.is_empty() {
        let _ = writeln!(out, "{label}: {}", items.join(", "));
    }
}

fn with_context(profile: &BusinessProfile, task: &str) -> String {
    format!(
        "You are a senior marketing strategist.\n\n{}\n{task}\n\nRespond with JSON only.",
        profile_context(profile)
    )
}

pub fn personas(profile: &BusinessProfile, count: usize) -> String {
    with_context(
        profile,
        &format!(
            "Create {count} distinct customer personas for this business. Return an object \
             {{\"personas\": [{{\"name\", \"summary\", \"age_range\", \"occupation\", \"goals\": [], \
             \"pain_points\": [], \"preferred_channels\": [], \"quote\"}}]}}."
        ),
    )
}

pub fn budget(profile: &BusinessProfile, total_budget: f64) -> String {
    with_context(
        profile,
        &format!(
            "Allocate a monthly marketing budget of {total_budget:.2} across channels. Return \
             {{\"total_budget\", \"allocations\": [{{\"channel\", \"amount\", \"percentage\", \
             \"rationale\"}}], \"recommendations\": [], \"projected_outcome\"}}. Amounts must sum \
             to the total budget."
        ),
    )
}

pub fn optimizations(profile: &BusinessProfile, metrics: &CampaignMetrics) -> String {
    let mut observed = format!(
        "Impressions: {}\nClicks: {}\nConversions: {}\nSpend: {:.2}\nRevenue: {:.2}\n",
        metrics.impressions, metrics.clicks, metrics.conversions, metrics.spend, metrics.revenue
    );
    if let Some(channel) = &metrics.channel {
        let _ = writeln!(observed, "Channel: {channel}");
    }
    if let Some(ctr) = metrics.click_through_rate() {
        let _ = writeln!(observed, "CTR: {:.2}%", ctr * 100.0);
    }
    if let Some(roas) = metrics.return_on_ad_spend() {
        let _ = writeln!(observed, "ROAS: {roas:.2}");
    }
    with_context(
        profile,
        &format!(
            "Campaign performance so far:\n{observed}\nSuggest concrete optimizations. Return \
             {{\"suggestions\": [{{\"title\", \"description\", \"category\", \"priority\", \
             \"expected_impact\"}}]}}."
        ),
    )
}

pub fn content_calendar(profile: &BusinessProfile, weeks: u32) -> String {
    with_context(
        profile,
        &format!(
            "Plan a {weeks}-week content calendar. Return {{\"weeks\": [{{\"week\", \"theme\", \
             \"items\": [{{\"channel\", \"topic\", \"format\", \"day\", \"caption\"}}]}}]}} with \
             weeks numbered from 1."
        ),
    )
}

pub fn creative(profile: &BusinessProfile) -> String {
    with_context(
        profile,
        "Critique the attached ad creative for this brand. Return {\"overall_score\" (0-10), \
         \"summary\", \"strengths\": [], \"weaknesses\": [], \"suggestions\": [], \
         \"brand_alignment\"}.",
    )
}

pub fn competitors(profile: &BusinessProfile) -> String {
    with_context(
        profile,
        "Search the web for this business's main competitors. Return {\"competitors\": \
         [{\"name\", \"website\", \"positioning\", \"strengths\": [], \"weaknesses\": []}], \
         \"market_summary\", \"opportunities\": []}.",
    )
}

pub fn seo_synthesis(profile: &BusinessProfile, site_url: &str, competitor_urls: &[String]) -> String {
    let competitors = if competitor_urls.is_empty() {
        "none given".to_string()
    } else {
        competitor_urls.join(", ")
    };
    with_context(
        profile,
        &format!(
            "Audit the SEO of {site_url} against these competitors: {competitors}. Use web search. \
             Return {{\"overall_score\" (0-100), \"summary\", \"keyword_opportunities\": \
             [{{\"keyword\", \"intent\", \"difficulty\"}}], \"technical_issues\": [], \
             \"content_gaps\": [], \"competitor_insights\": [{{\"url\", \"strengths\": [], \
             \"gaps\": []}}], \"recommendations\": []}}."
        ),
    )
}

pub fn resonance(profile: &BusinessProfile, content: &str, personas: &[Persona]) -> String {
    let mut audience = String::new();
    for persona in personas {
        let _ = writeln!(audience, "- {}: {}", persona.name, persona.summary);
    }
    with_context(
        profile,
        &format!(
            "Simulate how each persona reacts to this content:\n\"\"\"\n{content}\n\"\"\"\n\n\
             Personas:\n{audience}\nReturn {{\"overall_score\" (0-10), \"reactions\": \
             [{{\"persona\", \"reaction\", \"score\", \"concerns\": []}}], \"summary\", \
             \"recommendations\": []}}."
        ),
    )
}

/// Free-text research prompt; the reply feeds later knowledge-base stages.
pub fn brand_research(profile: &BusinessProfile) -> String {
    format!(
        "Research the public web presence of this business and summarize what customers, \
         press and the business itself say about it.\n\n{}",
        profile_context(profile)
    )
}

pub fn offerings(profile: &BusinessProfile, research: &str) -> String {
    with_context(
        profile,
        &format!(
            "Research notes:\n{research}\n\nList the business's offerings. Return \
             {{\"offerings\": [{{\"name\", \"description\", \"differentiators\": []}}]}}."
        ),
    )
}

pub fn audience(profile: &BusinessProfile, research: &str) -> String {
    with_context(
        profile,
        &format!(
            "Research notes:\n{research}\n\nDescribe the audience segments this business \
             serves. Return {{\"segments\": [{{\"name\", \"description\", \"needs\": []}}]}}."
        ),
    )
}

pub fn knowledge_base(profile: &BusinessProfile, research: &str, findings: &str) -> String {
    with_context(
        profile,
        &format!(
            "Research notes:\n{research}\n\nStructured findings:\n{findings}\n\nAssemble a brand \
             knowledge base. Return {{\"brand_summary\", \"brand_voice\", \"key_messages\": [], \
             \"faqs\": [{{\"question\", \"answer\"}}]}}."
        ),
    )
}
