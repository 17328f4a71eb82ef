use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use super::job::{ConversionJob, ConversionOutcome, ConversionSubmitter};
use super::pipeline::ConversionPipeline;
use crate::process::CancelHandle;

/// Runs conversions as detached tasks on a tokio runtime.
///
/// Every task shares one cancellation context; [`shutdown`](Self::shutdown)
/// cancels it so running encoder processes are terminated. Tasks that have
/// already finished are collected on each submission.
pub struct ConversionDispatcher {
    pipeline: Arc<ConversionPipeline>,
    runtime: Handle,
    tasks: Mutex<JoinSet<ConversionOutcome>>,
    finished: Mutex<Vec<ConversionOutcome>>,
    cancel: CancelHandle,
}

impl ConversionDispatcher {
    /// Must be called from within a tokio runtime.
    pub fn new(pipeline: Arc<ConversionPipeline>) -> Self {
        Self::with_runtime(pipeline, Handle::current())
    }

    pub fn with_runtime(pipeline: Arc<ConversionPipeline>, runtime: Handle) -> Self {
        Self {
            pipeline,
            runtime,
            tasks: Mutex::new(JoinSet::new()),
            finished: Mutex::new(Vec::new()),
            cancel: CancelHandle::new(),
        }
    }

    /// Number of conversions still in flight
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Wait for every submitted conversion, including ones submitted while
    /// waiting.
    ///
    /// Returns each outcome not returned by an earlier call.
    pub async fn drain(&self) -> Vec<ConversionOutcome> {
        let mut outcomes = std::mem::take(&mut *self.finished.lock());
        loop {
            let mut tasks = std::mem::replace(&mut *self.tasks.lock(), JoinSet::new());
            if tasks.is_empty() {
                break;
            }
            while let Some(result) = tasks.join_next().await {
                match result {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(e) => error!("Conversion task failed: {}", e),
                }
            }
        }
        outcomes
    }

    /// Terminate running conversions without waiting for them.
    ///
    /// Conversions submitted afterwards are cancelled before they start.
    pub fn cancel(&self) {
        info!("Cancelling {} pending conversions", self.pending());
        self.cancel.cancel();
    }

    /// Cancel running conversions and wait for them to wind down.
    pub async fn shutdown(&self) -> Vec<ConversionOutcome> {
        self.cancel();
        self.drain().await
    }

    fn reap(&self, tasks: &mut JoinSet<ConversionOutcome>) {
        while let Some(result) = tasks.try_join_next() {
            match result {
                Ok(outcome) => {
                    debug!("Collected finished conversion: {:?}", outcome);
                    self.finished.lock().push(outcome);
                }
                Err(e) => error!("Conversion task failed: {}", e),
            }
        }
    }
}

impl ConversionSubmitter for ConversionDispatcher {
    fn submit(&self, job: ConversionJob) {
        debug!("Queueing conversion of {}", job.source.display());
        let pipeline = Arc::clone(&self.pipeline);
        let cancel = self.cancel.signal();
        let mut tasks = self.tasks.lock();
        self.reap(&mut tasks);
        tasks.spawn_on(async move { pipeline.run(&job, cancel).await }, &self.runtime);
    }
}
