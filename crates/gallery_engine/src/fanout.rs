use std::fmt;
use std::future::Future;

use futures_util::stream::{FuturesUnordered, StreamExt};
use gallery_logging::gallery_debug;

use crate::gate::Gate;
use crate::task::{run_isolated, TaskFailure, TaskResult};

/// Result of one task, tagged with the task's position in the submitted list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion<T> {
    pub index: usize,
    pub result: TaskResult<T>,
}

/// Receives completions from [`FanOutCollector::run`].
///
/// Calls are never concurrent with each other: state touched only from these
/// methods needs no locking.
pub trait CompletionHandler<T> {
    fn on_each(&mut self, completion: &Completion<T>);

    fn on_done(&mut self, _completions: &[Completion<T>]) {}
}

/// Launches tasks under a shared [`Gate`] and hands their outcomes to a
/// handler in completion order.
#[derive(Debug, Clone)]
pub struct FanOutCollector {
    gate: Gate,
}

impl FanOutCollector {
    pub fn new(gate: Gate) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Runs every task to completion. Each task is spawned onto the runtime
    /// and only starts its body once admitted by the gate.
    pub async fn run<T, E, F, Fut, H>(&self, tasks: Vec<F>, handler: &mut H) -> Vec<Completion<T>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
        H: CompletionHandler<T> + ?Sized,
    {
        gallery_debug!(
            "{} gate: launching {} tasks, at most {} at once",
            self.gate.name(),
            tasks.len(),
            self.gate.limit()
        );
        let mut pending = FuturesUnordered::new();
        for (index, work) in tasks.into_iter().enumerate() {
            let gate = self.gate.clone();
            let handle = tokio::spawn(async move {
                match gate.acquire().await {
                    Ok(permit) => run_isolated(permit, work).await,
                    Err(closed) => Err(TaskFailure::aborted(closed.to_string())),
                }
            });
            pending.push(async move {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(join_err) => Err(TaskFailure::aborted(join_err.to_string())),
                };
                Completion { index, result }
            });
        }

        let mut completions = Vec::with_capacity(pending.len());
        while let Some(completion) = pending.next().await {
            handler.on_each(&completion);
            completions.push(completion);
        }
        handler.on_done(&completions);
        completions
    }
}
