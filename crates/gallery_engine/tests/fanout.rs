use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gallery_engine::{Completion, CompletionHandler, FanOutCollector, Gate, TaskFailureKind};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct Recording {
    order: Vec<usize>,
    inside: Arc<AtomicBool>,
    overlapped: bool,
    done_with: Option<usize>,
}

impl<T> CompletionHandler<T> for Recording {
    fn on_each(&mut self, completion: &Completion<T>) {
        if self.inside.swap(true, Ordering::SeqCst) {
            self.overlapped = true;
        }
        self.order.push(completion.index);
        self.inside.store(false, Ordering::SeqCst);
    }

    fn on_done(&mut self, completions: &[Completion<T>]) {
        self.done_with = Some(completions.len());
    }
}

fn limit(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[tokio::test]
async fn completions_arrive_in_completion_order() {
    let collector = FanOutCollector::new(Gate::new("test", limit(3)));
    let delays = [60u64, 10, 30];
    let tasks: Vec<_> = delays
        .iter()
        .map(|&ms| {
            move || async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok::<_, String>(ms)
            }
        })
        .collect();

    let mut recording = Recording::default();
    let completions = collector.run(tasks, &mut recording).await;

    assert_eq!(recording.order, vec![1, 2, 0]);
    assert_eq!(recording.done_with, Some(3));
    assert!(!recording.overlapped);
    let values: Vec<u64> = completions
        .iter()
        .map(|c| *c.result.as_ref().unwrap())
        .collect();
    assert_eq!(values, vec![10, 30, 60]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn gate_bounds_running_tasks() {
    let gate = Gate::new("test", limit(2));
    let collector = FanOutCollector::new(gate.clone());
    let tasks: Vec<_> = (0..8)
        .map(|i| {
            move || async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, String>(i)
            }
        })
        .collect();

    let mut recording = Recording::default();
    let completions = collector.run(tasks, &mut recording).await;

    assert_eq!(completions.len(), 8);
    assert!(gate.peak() <= 2, "peak was {}", gate.peak());
    assert_eq!(gate.peak(), 2);
    assert_eq!(gate.in_flight(), 0);
    assert!(!recording.overlapped);
}

#[tokio::test]
async fn failing_and_panicking_tasks_do_not_stop_siblings() {
    let collector = FanOutCollector::new(Gate::new("test", limit(2)));
    let tasks: Vec<_> = (1u32..=4)
        .map(|i| {
            move || async move {
                match i {
                    2 => Err("broken".to_string()),
                    3 => panic!("boom"),
                    _ => Ok(i),
                }
            }
        })
        .collect();

    let mut recording = Recording::default();
    let mut completions = collector.run(tasks, &mut recording).await;
    completions.sort_by_key(|c| c.index);

    assert_eq!(completions.len(), 4);
    assert_eq!(completions[0].result, Ok(1));
    assert_eq!(
        completions[1].result.as_ref().unwrap_err().kind,
        TaskFailureKind::Failed
    );
    let panicked = completions[2].result.as_ref().unwrap_err();
    assert_eq!(panicked.kind, TaskFailureKind::Panicked);
    assert!(panicked.message.contains("boom"));
    assert_eq!(completions[3].result, Ok(4));
}

#[tokio::test]
async fn empty_task_list_still_reports_done() {
    let collector = FanOutCollector::new(Gate::new("test", limit(1)));
    let tasks: Vec<fn() -> std::future::Ready<Result<(), String>>> = Vec::new();

    let mut recording = Recording::default();
    let completions = collector.run(tasks, &mut recording).await;

    assert!(completions.is_empty());
    assert_eq!(recording.done_with, Some(0));
}
