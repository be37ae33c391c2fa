use futures::stream::FuturesUnordered;
use futures::StreamExt;

use crate::error::LoadError;

use super::task::{Resolution, Task};

/// Run a fixed set of tasks concurrently and collect their resolutions
///
/// # Arguments
///
/// * `tasks` - Tasks to settle; each is started before any is awaited
///
/// # Returns
///
/// One resolution per task, in input order regardless of completion order.
/// Completes once, after every task has settled; an empty input completes
/// immediately with an empty vector.
pub async fn run_all<V>(tasks: &[Task<V>]) -> Vec<Resolution<V>>
where
    V: Clone + Send + 'static,
{
    if tasks.is_empty() {
        return Vec::new();
    }

    let mut futs: FuturesUnordered<_> = FuturesUnordered::new();

    for (idx, task) in tasks.iter().enumerate() {
        task.start();
        let task = task.clone();
        futs.push(async move { (idx, task.get().await) });
    }

    let mut slots: Vec<Option<Resolution<V>>> = tasks.iter().map(|_| None).collect();

    while let Some((idx, res)) = futs.next().await {
        slots[idx] = Some(res);
    }

    slots
        .into_iter()
        .zip(tasks)
        .map(|(slot, task)| {
            slot.unwrap_or_else(|| {
                Err(LoadError::Unresolved {
                    name: task.label(),
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[test]
    fn test_empty_input_completes_immediately() {
        let mut fut = tokio_test::task::spawn(run_all::<i32>(&[]));
        let results = tokio_test::assert_ready!(fut.poll());
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_results_keep_input_order_when_settled_in_reverse() {
        let mut gates = Vec::new();
        let mut tasks = Vec::new();
        for i in 0..3usize {
            let (tx, rx) = oneshot::channel::<()>();
            gates.push(tx);
            tasks.push(Task::new(format!("t{i}"), move || async move {
                let _ = rx.await;
                Ok(i * 10)
            }));
        }

        let handle = tokio::spawn(async move { run_all(&tasks).await });

        // settle t2 then t1; the barrier must still be waiting on t0
        let mut gates = gates.into_iter().map(Some).collect::<Vec<_>>();
        for idx in [2, 1] {
            if let Some(tx) = gates[idx].take() {
                tx.send(()).unwrap();
            }
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }
        }
        assert!(!handle.is_finished());

        if let Some(tx) = gates[0].take() {
            tx.send(()).unwrap();
        }
        let results = handle.await.unwrap();
        assert_eq!(results, vec![Ok(0), Ok(10), Ok(20)]);
    }

    #[tokio::test]
    async fn test_failed_task_keeps_its_slot() {
        let tasks = vec![
            Task::new("ok", || async { Ok(1) }),
            Task::new("bad", || async {
                Err(LoadError::Unresolved { name: "bad".into() })
            }),
            Task::settled("cached", Ok(3)),
        ];
        let results = run_all(&tasks).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], Ok(1));
        assert!(results[1].is_err());
        assert_eq!(results[2], Ok(3));
    }
}
