//! Multi-stage workflow commands with live progress.

use super::progress::run_with_task_list;
use super::{CommandContext, print_list, print_sources, read_structured};
use crate::ProfileArgs;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use marquee_orchestrator::{Persona, workflows};
use std::path::PathBuf;

pub async fn seo_audit(
    ctx: &CommandContext,
    args: &ProfileArgs,
    site: &str,
    competitors: &[String],
) -> Result<()> {
    let (profile, project) = ctx.resolve(args)?;
    let orchestrator = ctx.orchestrator()?;

    let pipeline = workflows::seo_audit(&orchestrator, &profile, site, competitors)?;
    let report = run_with_task_list(pipeline, ctx.json).await?;

    ctx.emit(&report, |report| {
        println!("\n{} {:.0}/100", "SEO score:".bold(), report.overall_score);
        if !report.summary.is_empty() {
            println!("{}", report.summary);
        }
        let keywords: Vec<String> = report
            .keyword_opportunities
            .iter()
            .map(|k| match &k.intent {
                Some(intent) => format!("{} ({intent})", k.keyword),
                None => k.keyword.clone(),
            })
            .collect();
        print_list("Keyword opportunities", &keywords);
        print_list("Technical issues", &report.technical_issues);
        print_list("Content gaps", &report.content_gaps);
        print_list("Recommendations", &report.recommendations);
        print_sources(&report.sources);
    })?;
    ctx.save_artifact(project, "seo_audit", &report)
}

pub async fn resonance(
    ctx: &CommandContext,
    args: &ProfileArgs,
    content: Option<String>,
    content_file: Option<PathBuf>,
    personas_path: Option<PathBuf>,
) -> Result<()> {
    let (profile, project) = ctx.resolve(args)?;

    let content = match (content, content_file) {
        (Some(content), _) => content,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => bail!("Pass the content to test with --content or --content-file"),
    };

    let personas: Vec<Persona> = match (&personas_path, &project) {
        (Some(path), _) => read_structured(path)?,
        (None, Some(project)) => project
            .artifact("personas")?
            .context("The project has no saved personas; run `mq personas --project <id>` first")?,
        (None, None) => bail!("Pass --personas <file> or a --project with saved personas"),
    };

    let orchestrator = ctx.orchestrator()?;
    let pipeline = workflows::resonance_test(&orchestrator, &profile, &content, &personas)?;
    let report = run_with_task_list(pipeline, ctx.json).await?;

    ctx.emit(&report, |report| {
        println!("\n{} {:.1}/10", "Resonance:".bold(), report.overall_score);
        for reaction in &report.reactions {
            let score = reaction.score.map(|s| format!(" ({s:.1})")).unwrap_or_default();
            println!("  {}{}: {}", reaction.persona.cyan(), score, reaction.reaction);
            for concern in &reaction.concerns {
                println!("    {} {concern}", "!".yellow());
            }
        }
        if !report.summary.is_empty() {
            println!("\n{}", report.summary);
        }
        print_list("Recommendations", &report.recommendations);
    })?;
    ctx.save_artifact(project, "resonance", &report)
}

pub async fn knowledge_base(ctx: &CommandContext, args: &ProfileArgs) -> Result<()> {
    let (profile, project) = ctx.resolve(args)?;
    let orchestrator = ctx.orchestrator()?;

    let pipeline = workflows::knowledge_base(&orchestrator, &profile)?;
    let kb = run_with_task_list(pipeline, ctx.json).await?;

    ctx.emit(&kb, |kb| {
        println!("\n{}", kb.brand_summary);
        if !kb.brand_voice.is_empty() {
            println!("{} {}", "Voice:".bold(), kb.brand_voice);
        }
        let offerings: Vec<String> = kb.offerings.iter().map(|o| o.name.clone()).collect();
        let segments: Vec<String> = kb.audience_segments.iter().map(|s| s.name.clone()).collect();
        print_list("Offerings", &offerings);
        print_list("Audience", &segments);
        print_list("Key messages", &kb.key_messages);
        if !kb.faqs.is_empty() {
            println!("\n{}", "FAQ".bold());
            for faq in &kb.faqs {
                println!("  {} {}", "Q:".cyan(), faq.question);
                println!("  {} {}", "A:".dimmed(), faq.answer);
            }
        }
        print_sources(&kb.sources);
    })?;
    ctx.save_artifact(project, "knowledge_base", &kb)
}
