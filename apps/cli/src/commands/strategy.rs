//! One-shot strategy commands.

use super::{CommandContext, print_list, print_sources, read_structured};
use crate::ProfileArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use marquee_abstraction::Attachment;
use marquee_orchestrator::{CampaignMetrics, strategy};
use std::path::Path;

pub async fn personas(ctx: &CommandContext, args: &ProfileArgs, count: usize) -> Result<()> {
    let (profile, project) = ctx.resolve(args)?;
    let orchestrator = ctx.orchestrator()?;

    let personas = strategy::generate_personas(&orchestrator, &profile, count).await?;

    ctx.emit(&personas, |personas| {
        for persona in personas {
            println!("{}", persona.name.bold().cyan());
            println!("  {}", persona.summary);
            if let Some(quote) = &persona.quote {
                println!("  {}", format!("\"{quote}\"").italic().dimmed());
            }
            if !persona.pain_points.is_empty() {
                println!("  {} {}", "Pain points:".dimmed(), persona.pain_points.join("; "));
            }
            if !persona.preferred_channels.is_empty() {
                println!("  {} {}", "Channels:".dimmed(), persona.preferred_channels.join(", "));
            }
            println!();
        }
    })?;
    ctx.save_artifact(project, "personas", &personas)
}

pub async fn budget(ctx: &CommandContext, args: &ProfileArgs, amount: f64) -> Result<()> {
    let (profile, project) = ctx.resolve(args)?;
    let orchestrator = ctx.orchestrator()?;

    let analysis = strategy::analyze_budget(&orchestrator, &profile, amount).await?;

    ctx.emit(&analysis, |analysis| {
        println!("{} {:.2}", "Total budget:".bold(), analysis.total_budget);
        for allocation in &analysis.allocations {
            println!(
                "  {:<24} {:>12.2}  {:>5.1}%",
                allocation.channel.cyan(),
                allocation.amount,
                allocation.percentage
            );
            if !allocation.rationale.is_empty() {
                println!("    {}", allocation.rationale.dimmed());
            }
        }
        print_list("Recommendations", &analysis.recommendations);
        if let Some(outcome) = &analysis.projected_outcome {
            println!("\n{} {outcome}", "Projected outcome:".bold());
        }
    })?;
    ctx.save_artifact(project, "budget", &analysis)
}

pub async fn optimize(ctx: &CommandContext, args: &ProfileArgs, metrics_path: &Path) -> Result<()> {
    let (profile, project) = ctx.resolve(args)?;
    let metrics: CampaignMetrics = read_structured(metrics_path)?;
    let orchestrator = ctx.orchestrator()?;

    let suggestions = strategy::suggest_optimizations(&orchestrator, &profile, &metrics).await?;

    ctx.emit(&suggestions, |suggestions| {
        for (i, suggestion) in suggestions.iter().enumerate() {
            let priority = suggestion.priority.as_deref().unwrap_or("-");
            println!("{}. {} [{}]", i + 1, suggestion.title.bold(), priority.yellow());
            println!("   {}", suggestion.description);
            if let Some(impact) = &suggestion.expected_impact {
                println!("   {} {impact}", "Impact:".dimmed());
            }
        }
    })?;
    ctx.save_artifact(project, "optimizations", &suggestions)
}

pub async fn calendar(ctx: &CommandContext, args: &ProfileArgs, weeks: u32) -> Result<()> {
    let (profile, project) = ctx.resolve(args)?;
    let orchestrator = ctx.orchestrator()?;

    let calendar = strategy::plan_content_calendar(&orchestrator, &profile, weeks).await?;

    ctx.emit(&calendar, |calendar| {
        for week in &calendar.weeks {
            println!("{} {}", format!("Week {}", week.week).bold(), week.theme.cyan());
            for item in &week.items {
                let day = item.day.as_deref().unwrap_or("");
                println!("  {:<10} {:<12} {}", day.dimmed(), item.channel, item.topic);
            }
        }
    })?;
    ctx.save_artifact(project, "content_calendar", &calendar)
}

pub async fn creative(ctx: &CommandContext, args: &ProfileArgs, image_path: &Path) -> Result<()> {
    let (profile, project) = ctx.resolve(args)?;
    let data = std::fs::read(image_path)
        .with_context(|| format!("Failed to read image {}", image_path.display()))?;
    let mime_type = mime_guess::from_path(image_path).first_or_octet_stream().to_string();
    let orchestrator = ctx.orchestrator()?;

    let analysis =
        strategy::analyze_creative(&orchestrator, &profile, Attachment::new(mime_type, data)).await?;

    ctx.emit(&analysis, |analysis| {
        println!("{} {:.1}/10", "Score:".bold(), analysis.overall_score);
        if !analysis.summary.is_empty() {
            println!("{}", analysis.summary);
        }
        print_list("Strengths", &analysis.strengths);
        print_list("Weaknesses", &analysis.weaknesses);
        print_list("Suggestions", &analysis.suggestions);
    })?;
    ctx.save_artifact(project, "creative_analysis", &analysis)
}

pub async fn competitors(ctx: &CommandContext, args: &ProfileArgs) -> Result<()> {
    let (profile, project) = ctx.resolve(args)?;
    let orchestrator = ctx.orchestrator()?;

    let landscape = strategy::research_competitors(&orchestrator, &profile).await?;

    ctx.emit(&landscape, |landscape| {
        for competitor in &landscape.value.competitors {
            println!("{}", competitor.name.bold().cyan());
            if let Some(website) = &competitor.website {
                println!("  {}", website.dimmed());
            }
            if !competitor.positioning.is_empty() {
                println!("  {}", competitor.positioning);
            }
        }
        if !landscape.value.market_summary.is_empty() {
            println!("\n{}", landscape.value.market_summary);
        }
        print_list("Opportunities", &landscape.value.opportunities);
        print_sources(&landscape.sources);
    })?;
    ctx.save_artifact(project, "competitors", &landscape)
}
