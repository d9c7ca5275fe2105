use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;

use crate::gate::GatePermit;

pub type TaskResult<T> = Result<T, TaskFailure>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFailureKind {
    /// The task body returned an error.
    Failed,
    Panicked,
    /// The task never ran to completion (closed gate, runtime shutdown).
    Aborted,
}

/// A failure that was stopped at a task boundary and turned into data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub kind: TaskFailureKind,
    pub message: String,
}

impl TaskFailure {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            kind: TaskFailureKind::Failed,
            message: message.into(),
        }
    }

    pub fn panicked(message: impl Into<String>) -> Self {
        Self {
            kind: TaskFailureKind::Panicked,
            message: message.into(),
        }
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self {
            kind: TaskFailureKind::Aborted,
            message: message.into(),
        }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TaskFailureKind::Failed => write!(f, "failed: {}", self.message),
            TaskFailureKind::Panicked => write!(f, "panicked: {}", self.message),
            TaskFailureKind::Aborted => write!(f, "aborted: {}", self.message),
        }
    }
}

/// Runs `work` while holding `permit` and converts any error or panic into a
/// [`TaskFailure`]. The permit is released on every exit path.
pub async fn run_isolated<T, E, F, Fut>(permit: GatePermit, work: F) -> TaskResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let outcome = AssertUnwindSafe(async move { work().await })
        .catch_unwind()
        .await;
    drop(permit);

    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(TaskFailure::failed(err.to_string())),
        Err(payload) => Err(TaskFailure::panicked(panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{run_isolated, TaskFailureKind};
    use crate::gate::Gate;
    use std::num::NonZeroUsize;

    fn gate() -> Gate {
        Gate::new("test", NonZeroUsize::new(1).unwrap())
    }

    #[tokio::test]
    async fn success_passes_value_through() {
        let gate = gate();
        let permit = gate.acquire().await.unwrap();
        let result = run_isolated(permit, || async { Ok::<_, String>(7) }).await;
        assert_eq!(result, Ok(7));
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn error_becomes_data() {
        let gate = gate();
        let permit = gate.acquire().await.unwrap();
        let failure = run_isolated(permit, || async { Err::<(), _>("no route to host") })
            .await
            .unwrap_err();
        assert_eq!(failure.kind, TaskFailureKind::Failed);
        assert_eq!(failure.message, "no route to host");
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn panic_is_contained_and_slot_released() {
        let gate = gate();
        let permit = gate.acquire().await.unwrap();
        let failure = run_isolated(permit, || async {
            if gate_is_broken() {
                panic!("renderer exploded");
            }
            Ok::<(), String>(())
        })
        .await
        .unwrap_err();
        assert_eq!(failure.kind, TaskFailureKind::Panicked);
        assert_eq!(failure.message, "renderer exploded");
        assert_eq!(gate.in_flight(), 0);
        assert!(gate.acquire().await.is_ok());
    }

    fn gate_is_broken() -> bool {
        true
    }
}
