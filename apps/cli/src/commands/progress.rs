//! Live task-list rendering for workflow progress streams.

use colored::Colorize;
use marquee_orchestrator::{Pipeline, ProgressEvent, StageStatus, TaskList, drive};
use tracing::warn;

/// Runs `pipeline` to completion, printing one line per stage transition.
///
/// In JSON mode nothing is printed; the caller prints the result.
pub async fn run_with_task_list<C, T>(pipeline: Pipeline<C, T>, json: bool) -> marquee_orchestrator::Result<T>
where
    C: Send + 'static,
    T: Send + 'static,
{
    let mut tasks = TaskList::from_plan(pipeline.plan());
    if !json {
        for row in tasks.rows() {
            println!("  {} {}", "○".dimmed(), row.name.dimmed());
        }
        println!();
    }

    let result = drive(pipeline.run(), |event: &ProgressEvent<T>| {
        if let Err(e) = tasks.apply(event) {
            warn!(error = %e, "Ignoring out-of-order progress event");
            return;
        }
        if !json {
            render(event);
        }
    })
    .await;

    if result.is_err() && !json {
        if let Some(row) = tasks.rows().iter().find(|row| row.status == StageStatus::Running) {
            println!("  {} {}", "✗".red(), row.name.red());
        }
    }
    result
}

fn render<T>(event: &ProgressEvent<T>) {
    match event.status {
        StageStatus::Running => println!("  {} {}...", "⏳".yellow(), event.stage.yellow()),
        StageStatus::Complete => println!("  {} {}", "✓".green(), event.stage.green()),
        StageStatus::Pending => {}
    }
}
