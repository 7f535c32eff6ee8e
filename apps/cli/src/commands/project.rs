//! Project management commands.

use super::{CommandContext, read_structured};
use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use marquee_core::Project;
use marquee_orchestrator::BusinessProfile;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create a project from a business profile
    Save {
        /// Project name
        #[arg(short, long)]
        name: String,

        /// Business profile file (JSON or TOML)
        #[arg(short, long)]
        profile: PathBuf,
    },

    /// Show a project and its saved results
    Show {
        /// Project id or unique prefix
        id: String,
    },

    /// List saved projects
    List,
}

pub fn execute(ctx: &CommandContext, command: ProjectCommand) -> Result<()> {
    match command {
        ProjectCommand::Save { name, profile } => save(ctx, name, &profile),
        ProjectCommand::Show { id } => show(ctx, &id),
        ProjectCommand::List => list(ctx),
    }
}

fn save(ctx: &CommandContext, name: String, profile_path: &Path) -> Result<()> {
    let profile: BusinessProfile = read_structured(profile_path)?;
    profile.validate()?;

    let project = Project::new(name, profile);
    project.save(&ctx.store()?).context("Failed to save project")?;

    ctx.emit(&project, |project| {
        println!("{} Created project {} ({})", "✓".green(), project.name.bold(), project.id.to_string().cyan());
    })
}

fn show(ctx: &CommandContext, id: &str) -> Result<()> {
    let project = Project::find(&ctx.store()?, id).with_context(|| format!("Project '{id}' not found"))?;

    ctx.emit(&project, |project| {
        println!("{} {}", project.name.bold(), project.id.to_string().dimmed());
        println!("  {} {} ({})", "Business:".dimmed(), project.profile.name, project.profile.industry);
        println!("  {} {}", "Updated:".dimmed(), project.updated_at.format("%Y-%m-%d %H:%M UTC"));
        if project.artifacts.is_empty() {
            println!("  {}", "No saved results yet".dimmed());
        } else {
            println!("  {}", "Saved results:".dimmed());
            for kind in project.artifacts.keys() {
                println!("    • {}", kind.cyan());
            }
        }
    })
}

fn list(ctx: &CommandContext) -> Result<()> {
    let summaries = Project::list(&ctx.store()?)?;

    ctx.emit(&summaries, |summaries| {
        if summaries.is_empty() {
            println!("No projects yet. Create one with `mq project save --name <name> --profile <file>`.");
            return;
        }
        for summary in summaries {
            let id = summary.id.to_string();
            println!(
                "{}  {:<28} {}",
                id[..8].cyan(),
                summary.name,
                summary.artifacts.join(", ").dimmed()
            );
        }
    })
}
