//! Command implementations for the Marquee CLI.

pub mod progress;
pub mod project;
pub mod strategy;
pub mod workflow;

use crate::ProfileArgs;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use marquee_core::{FileStore, MarqueeConfig, Project};
use marquee_models::{DEFAULT_GEMINI_MODEL, ModelConfig, ModelFactory, ModelType};
use marquee_orchestrator::{BusinessProfile, NoPacing, OrchestrationError, Orchestrator, Pacing};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_ENGINE: &str = "gemini";

/// Everything a command needs besides its own arguments.
pub struct CommandContext {
    pub config: MarqueeConfig,
    pub json: bool,
}

impl CommandContext {
    pub fn new(config: MarqueeConfig, json: bool) -> Self {
        Self { config, json }
    }

    /// Builds the orchestrator from the configured engine, model and policies.
    pub fn orchestrator(&self) -> Result<Orchestrator> {
        let engine = self.config.engine.as_deref().unwrap_or(DEFAULT_ENGINE);
        let model_type = ModelType::from_str(engine).map_err(|()| {
            anyhow::anyhow!("Unknown engine '{engine}'. Supported engines: gemini, mock")
        })?;
        let model_id = self.config.model.clone().unwrap_or_else(|| match model_type {
            ModelType::Gemini => DEFAULT_GEMINI_MODEL.to_string(),
            ModelType::Mock => "mock".to_string(),
        });
        debug!(engine, model_id = %model_id, "Building orchestrator");

        let mut model_config = ModelConfig::new(model_type, model_id);
        if model_type == ModelType::Mock {
            if let Some(reply) = self.config.mock_reply().context("Failed to read the mock response")? {
                model_config = model_config.with_mock_reply(reply);
            }
        }
        let model = ModelFactory::create(model_config).map_err(OrchestrationError::from)?;
        let retry = self.config.retry_policy().context("Invalid [retry] configuration")?;
        let pacing: Arc<dyn Pacing> = match model_type {
            ModelType::Mock => Arc::new(NoPacing),
            ModelType::Gemini => self.config.pacing(),
        };

        Ok(Orchestrator::new(model).with_retry_policy(retry).with_pacing(pacing))
    }

    pub fn store(&self) -> Result<FileStore> {
        let dir = self.config.store_dir();
        FileStore::open(&dir).with_context(|| format!("Failed to open project store at {}", dir.display()))
    }

    /// Resolves the business profile from `--profile`, falling back to `--project`.
    pub fn resolve(&self, args: &ProfileArgs) -> Result<(BusinessProfile, Option<Project>)> {
        let project = match &args.project {
            Some(id) => {
                let store = self.store()?;
                Some(Project::find(&store, id).with_context(|| format!("Project '{id}' not found"))?)
            }
            None => None,
        };

        let profile = match (&args.profile, &project) {
            (Some(path), _) => read_structured::<BusinessProfile>(path)?,
            (None, Some(project)) => project.profile.clone(),
            (None, None) => bail!("A business profile is required: pass --profile <file> or --project <id>"),
        };
        Ok((profile, project))
    }

    /// Stores `value` in the project under `kind`, if a project is in use.
    pub fn save_artifact<T: Serialize>(&self, project: Option<Project>, kind: &str, value: &T) -> Result<()> {
        let Some(mut project) = project else {
            return Ok(());
        };
        project.record_artifact(kind, value)?;
        project.save(&self.store()?)?;
        if !self.json {
            println!("{} Saved {} to project {}", "✓".green(), kind.cyan(), project.name.bold());
        }
        Ok(())
    }

    /// Prints `value` as JSON or through `human`.
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

/// Reads a JSON or TOML file (chosen by extension) into `T`.
pub fn read_structured<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let is_toml = path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(&content).with_context(|| format!("Invalid TOML in {}", path.display()))
    } else {
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
    }
}

/// Prints a titled bullet list, skipping empty ones.
pub fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("\n{}", title.bold());
    for item in items {
        println!("  • {item}");
    }
}

/// Prints grounding citations.
pub fn print_sources(sources: &[marquee_abstraction::GroundingSource]) {
    if sources.is_empty() {
        return;
    }
    println!("\n{}", "Sources".bold());
    for source in sources {
        println!("  {} {}", source.title.dimmed(), source.url.cyan());
    }
}
