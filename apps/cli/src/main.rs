//! Marquee CLI - marketing strategy from the command line.
//!
//! This CLI provides the `mq` command: one-shot strategy calls (personas,
//! budgets, calendars, ...) and long-running workflows (SEO audit, resonance
//! test, knowledge base) with a live task list.

mod commands;
mod config;

use clap::{Args as ClapArgs, CommandFactory, Parser, Subcommand};
use colored::Colorize;
use marquee_orchestrator::OrchestrationError;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{CommandContext, project, strategy, workflow};

/// Marquee CLI - AI-assisted marketing strategy
#[derive(Parser, Debug)]
#[command(
    name = "mq",
    author,
    version,
    about = "Marquee - AI-assisted marketing strategy",
    long_about = "Marquee (mq) turns a business profile into personas, budgets, content plans,\nSEO audits and more, using Google Gemini."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Model engine (gemini, mock)
    #[arg(long, global = true)]
    engine: Option<String>,

    /// Model id (e.g. gemini-2.5-flash)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Where the business profile comes from, and where results are saved.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ProfileArgs {
    /// Business profile file (JSON or TOML)
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Project id (or unique prefix): supplies the profile and receives the result
    #[arg(long)]
    project: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate customer personas
    Personas {
        #[command(flatten)]
        profile: ProfileArgs,

        /// How many personas to create
        #[arg(short, long, default_value_t = 3)]
        count: usize,
    },

    /// Split a marketing budget across channels
    Budget {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Total monthly budget
        #[arg(short, long)]
        amount: f64,
    },

    /// Suggest optimizations for a running campaign
    Optimize {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Campaign metrics file (JSON or TOML)
        #[arg(short, long)]
        metrics: PathBuf,
    },

    /// Plan a content calendar
    Calendar {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Number of weeks to plan
        #[arg(short, long, default_value_t = 4)]
        weeks: u32,
    },

    /// Critique an ad creative image
    Creative {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Image file to analyze
        #[arg(short, long)]
        image: PathBuf,
    },

    /// Research competitors with web search
    Competitors {
        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Audit a site's SEO against competitors
    SeoAudit {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Site to audit
        #[arg(short, long)]
        site: String,

        /// Competitor URL (repeatable)
        #[arg(short = 'C', long = "competitor")]
        competitors: Vec<String>,
    },

    /// Test how personas react to a piece of content
    Resonance {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Content to test
        #[arg(short = 't', long, conflicts_with = "content_file")]
        content: Option<String>,

        /// Read the content from a file
        #[arg(long)]
        content_file: Option<PathBuf>,

        /// Personas file (JSON list); defaults to the project's saved personas
        #[arg(long)]
        personas: Option<PathBuf>,
    },

    /// Build a brand knowledge base
    KnowledgeBase {
        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Manage saved projects
    #[command(subcommand)]
    Project(project::ProjectCommand),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = config::load_config(config::FlagOverrides {
        engine: args.engine.clone(),
        model: args.model.clone(),
        log_level: args.log_level.clone(),
    });

    // Initialize tracing
    let level = match config.log_level.as_deref().unwrap_or("warn") {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let Some(command) = args.command else {
        let _ = Args::command().print_help();
        return;
    };

    let ctx = CommandContext::new(config, args.json);
    if let Err(err) = run(command, &ctx).await {
        report_error(&err);
        std::process::exit(1);
    }
}

async fn run(command: Command, ctx: &CommandContext) -> anyhow::Result<()> {
    match command {
        Command::Personas { profile, count } => strategy::personas(ctx, &profile, count).await,
        Command::Budget { profile, amount } => strategy::budget(ctx, &profile, amount).await,
        Command::Optimize { profile, metrics } => strategy::optimize(ctx, &profile, &metrics).await,
        Command::Calendar { profile, weeks } => strategy::calendar(ctx, &profile, weeks).await,
        Command::Creative { profile, image } => strategy::creative(ctx, &profile, &image).await,
        Command::Competitors { profile } => strategy::competitors(ctx, &profile).await,
        Command::SeoAudit { profile, site, competitors } => {
            workflow::seo_audit(ctx, &profile, &site, &competitors).await
        }
        Command::Resonance { profile, content, content_file, personas } => {
            workflow::resonance(ctx, &profile, content, content_file, personas).await
        }
        Command::KnowledgeBase { profile } => workflow::knowledge_base(ctx, &profile).await,
        Command::Project(command) => project::execute(ctx, command),
    }
}

/// Prints one human-readable line for the failure.
fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<OrchestrationError>() {
        Some(e) if e.is_service_busy() => {
            eprintln!("{} {}", "⏳".yellow(), e.user_message().yellow().bold());
            eprintln!("   {}", "The service is busy, try again later.".dimmed());
        }
        Some(e) => eprintln!("{} {}", "✗".red(), e.user_message().red()),
        None => eprintln!("{} {}", "✗".red(), format!("{err:#}").red()),
    }
}
