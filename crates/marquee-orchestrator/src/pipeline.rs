//! Multi-stage workflows that report progress as they run.
//!
//! A [`Pipeline`] is a fixed list of named stages followed by a final stage that
//! produces the result. Running it yields a [`ProgressStream`]: `Running` when a
//! stage starts, `Complete` when it ends, and the final `Complete` carries the
//! result. A failing stage yields its error and ends the stream.

use crate::error::{OrchestrationError, Result};
use crate::pacing::{NoPacing, Pacing};
use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Status of one row in the task list. Ordered: statuses only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Complete,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Complete => "complete",
        };
        f.write_str(label)
    }
}

/// One transition of one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent<T> {
    pub stage: String,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

impl<T> ProgressEvent<T> {
    fn running(stage: &str) -> Self {
        Self { stage: stage.to_string(), status: StageStatus::Running, result: None }
    }

    fn complete(stage: &str) -> Self {
        Self { stage: stage.to_string(), status: StageStatus::Complete, result: None }
    }

    fn finished(stage: &str, result: T) -> Self {
        Self { stage: stage.to_string(), status: StageStatus::Complete, result: Some(result) }
    }

    /// Whether this event carries the workflow result.
    pub fn is_final(&self) -> bool {
        self.result.is_some()
    }
}

/// Boxed progress stream returned by every workflow.
pub type ProgressStream<T> = Pin<Box<dyn Stream<Item = Result<ProgressEvent<T>>> + Send>>;

type StageAction<C> = Box<dyn FnOnce(C) -> BoxFuture<'static, Result<C>> + Send>;
type FinalAction<C, T> = Box<dyn FnOnce(C) -> BoxFuture<'static, Result<T>> + Send>;

enum StageKind<C> {
    /// Waits according to the pipeline's pacing policy.
    Paced,
    /// Does real work, threading the context through.
    Work(StageAction<C>),
}

/// A named step of a pipeline.
pub struct Stage<C> {
    name: String,
    kind: StageKind<C>,
}

impl<C: Send + 'static> Stage<C> {
    /// A stage that only waits for the pipeline's pacing delay.
    pub fn paced(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: StageKind::Paced }
    }

    /// A stage that transforms the context.
    pub fn work<F, Fut>(name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce(C) -> Fut + Send + 'static,
        Fut: Future<Output = Result<C>> + Send + 'static,
    {
        Self { name: name.into(), kind: StageKind::Work(Box::new(move |ctx| Box::pin(action(ctx)))) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<C> fmt::Debug for Stage<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            StageKind::Paced => "paced",
            StageKind::Work(_) => "work",
        };
        f.debug_struct("Stage").field("name", &self.name).field("kind", &kind).finish()
    }
}

/// Collects stages until the final one is supplied.
pub struct PipelineBuilder<C> {
    context: C,
    stages: Vec<Stage<C>>,
    pacing: Arc<dyn Pacing>,
}

impl<C: Send + 'static> PipelineBuilder<C> {
    /// Starts a pipeline around the initial context. Pacing defaults to none.
    pub fn new(context: C) -> Self {
        Self { context, stages: Vec::new(), pacing: Arc::new(NoPacing) }
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: Arc<dyn Pacing>) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn stage(mut self, stage: Stage<C>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Supplies the final stage and seals the pipeline.
    pub fn finish<T, F, Fut>(self, name: impl Into<String>, action: F) -> Pipeline<C, T>
    where
        F: FnOnce(C) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Pipeline {
            context: self.context,
            stages: self.stages,
            final_name: name.into(),
            final_action: Box::new(move |ctx| Box::pin(action(ctx))),
            pacing: self.pacing,
        }
    }
}

/// A sealed, runnable workflow.
pub struct Pipeline<C, T> {
    context: C,
    stages: Vec<Stage<C>>,
    final_name: String,
    final_action: FinalAction<C, T>,
    pacing: Arc<dyn Pacing>,
}

impl<C: Send + 'static, T: Send + 'static> Pipeline<C, T> {
    /// Stage names in the order they will run, final stage included.
    pub fn plan(&self) -> Vec<String> {
        self.stages
            .iter()
            .map(|stage| stage.name.clone())
            .chain(std::iter::once(self.final_name.clone()))
            .collect()
    }

    /// Consumes the pipeline and returns its progress stream.
    ///
    /// Nothing runs until the stream is polled. Dropping the stream cancels
    /// whatever stage is in flight.
    pub fn run(self) -> ProgressStream<T> {
        Box::pin(self.into_stream())
    }

    fn into_stream(self) -> impl Stream<Item = Result<ProgressEvent<T>>> + Send {
        let Self { mut context, stages, final_name, final_action, pacing } = self;

        async_stream::stream! {
            for stage in stages {
                let Stage { name, kind } = stage;
                info!(stage = %name, "Stage started");
                yield Ok(ProgressEvent::running(&name));

                context = match kind {
                    StageKind::Paced => {
                        pacing.pause(&name).await;
                        context
                    }
                    StageKind::Work(action) => match action(context).await {
                        Ok(next) => next,
                        Err(e) => {
                            warn!(stage = %name, error = %e, "Stage failed");
                            yield Err(e);
                            return;
                        }
                    },
                };

                debug!(stage = %name, "Stage complete");
                yield Ok(ProgressEvent::complete(&name));
            }

            info!(stage = %final_name, "Final stage started");
            yield Ok(ProgressEvent::running(&final_name));

            match final_action(context).await {
                Ok(result) => {
                    info!(stage = %final_name, "Workflow complete");
                    yield Ok(ProgressEvent::finished(&final_name, result));
                }
                Err(e) => {
                    warn!(stage = %final_name, error = %e, "Final stage failed");
                    yield Err(e);
                }
            }
        }
    }
}

/// One row of the visible task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrchestrationStage {
    pub name: String,
    pub status: StageStatus,
}

/// Consumer-side view of a workflow: one row per distinct stage name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    rows: Vec<OrchestrationStage>,
}

impl TaskList {
    /// Seeds the list with the planned stages, all pending.
    pub fn from_plan<I, S>(plan: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = plan
            .into_iter()
            .map(|name| OrchestrationStage { name: name.into(), status: StageStatus::Pending })
            .collect();
        Self { rows }
    }

    /// Applies an event. Unknown stages are appended; backwards moves are refused.
    ///
    /// # Errors
    /// Returns `StageRegression` if the event would move a row backwards.
    pub fn apply<T>(&mut self, event: &ProgressEvent<T>) -> Result<()> {
        match self.rows.iter_mut().find(|row| row.name == event.stage) {
            Some(row) if event.status < row.status => Err(OrchestrationError::StageRegression {
                stage: row.name.clone(),
                from: row.status,
                to: event.status,
            }),
            Some(row) => {
                row.status = event.status;
                Ok(())
            }
            None => {
                self.rows.push(OrchestrationStage { name: event.stage.clone(), status: event.status });
                Ok(())
            }
        }
    }

    pub fn rows(&self) -> &[OrchestrationStage] {
        &self.rows
    }

    /// Whether every row has completed.
    pub fn is_complete(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|row| row.status == StageStatus::Complete)
    }
}

/// Polls a progress stream to the end, handing each event to `on_event`.
///
/// # Errors
/// Returns the first stage error, or `Incomplete` if the stream ends without a
/// result.
pub async fn drive<T, F>(mut stream: ProgressStream<T>, mut on_event: F) -> Result<T>
where
    F: FnMut(&ProgressEvent<T>),
{
    while let Some(event) = stream.next().await {
        let mut event = event?;
        on_event(&event);
        if let Some(result) = event.result.take() {
            return Ok(result);
        }
    }
    Err(OrchestrationError::Incomplete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn collect_statuses<T>(events: &[Result<ProgressEvent<T>>]) -> Vec<(String, StageStatus)> {
        events
            .iter()
            .filter_map(|e| e.as_ref().ok())
            .map(|e| (e.stage.clone(), e.status))
            .collect()
    }

    #[tokio::test]
    async fn test_stages_run_in_declared_order() {
        let pipeline = PipelineBuilder::new(Vec::<&'static str>::new())
            .stage(Stage::work("A", |mut seen: Vec<&'static str>| async move {
                seen.push("A");
                Ok(seen)
            }))
            .stage(Stage::paced("B"))
            .finish("C", |mut seen: Vec<&'static str>| async move {
                seen.push("C");
                Ok(seen.join(","))
            });

        assert_eq!(pipeline.plan(), vec!["A", "B", "C"]);

        let events: Vec<_> = pipeline.run().collect().await;
        let statuses = collect_statuses(&events);
        assert_eq!(
            statuses,
            vec![
                ("A".to_string(), StageStatus::Running),
                ("A".to_string(), StageStatus::Complete),
                ("B".to_string(), StageStatus::Running),
                ("B".to_string(), StageStatus::Complete),
                ("C".to_string(), StageStatus::Running),
                ("C".to_string(), StageStatus::Complete),
            ]
        );

        let results: Vec<_> = events.iter().filter_map(|e| e.as_ref().ok()?.result.clone()).collect();
        assert_eq!(results, vec!["A,C".to_string()]);
        assert!(events.last().unwrap().as_ref().unwrap().is_final());
    }

    #[tokio::test]
    async fn test_failure_stops_the_stream() {
        let final_ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&final_ran);

        let pipeline = PipelineBuilder::new(())
            .stage(Stage::paced("A"))
            .stage(Stage::work("B", |()| async {
                Err(OrchestrationError::InvalidInput("boom".to_string()))
            }))
            .finish("C", move |()| async move {
                flag.store(true, Ordering::SeqCst);
                Ok(1)
            });

        let events: Vec<_> = pipeline.run().collect().await;

        assert_eq!(events.len(), 4);
        assert_eq!(
            collect_statuses(&events),
            vec![
                ("A".to_string(), StageStatus::Running),
                ("A".to_string(), StageStatus::Complete),
                ("B".to_string(), StageStatus::Running),
            ]
        );
        assert!(matches!(events[3], Err(OrchestrationError::InvalidInput(_))));
        assert!(!final_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_drive_returns_result_and_fills_task_list() {
        let pipeline = PipelineBuilder::new(2_u32)
            .stage(Stage::work("Double", |n: u32| async move { Ok(n * 2) }))
            .finish("Report", |n: u32| async move { Ok(format!("n={n}")) });

        let mut tasks = TaskList::from_plan(pipeline.plan());
        assert!(!tasks.is_complete());

        let result = drive(pipeline.run(), |event| tasks.apply(event).unwrap()).await.unwrap();

        assert_eq!(result, "n=4");
        assert!(tasks.is_complete());
        assert_eq!(tasks.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_drive_surfaces_stage_error() {
        let pipeline = PipelineBuilder::new(())
            .finish("Only", |()| async { Err::<(), _>(OrchestrationError::RetryExhausted) });

        let err = drive(pipeline.run(), |_| {}).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::RetryExhausted));
    }

    #[test]
    fn test_task_list_rejects_regression() {
        let mut tasks = TaskList::from_plan(["Crawl"]);
        tasks.apply(&ProgressEvent::<()>::complete("Crawl")).unwrap();

        let err = tasks.apply(&ProgressEvent::<()>::running("Crawl")).unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::StageRegression { from: StageStatus::Complete, to: StageStatus::Running, .. }
        ));

        tasks.apply(&ProgressEvent::<()>::running("Extra")).unwrap();
        assert_eq!(tasks.rows().len(), 2);
        assert_eq!(tasks.rows()[1].status, StageStatus::Running);
    }
}
