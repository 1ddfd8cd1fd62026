//! Tests for the bounded worker pool: ceiling, failure isolation and stale batches

#[cfg(test)]
mod tests {
    use crate::support::{PanickingClient, ScriptedClient, png_bytes};
    use multiverse::MultiverseError;
    use multiverse::album::compositor::AlbumCompositor;
    use multiverse::orchestration::batch::Batch;
    use multiverse::orchestration::pool::{GenerationGuard, PoolConfig, PoolReport, WorkerPool};
    use multiverse::orchestration::task::{Task, TaskId, TaskStatus};
    use multiverse::universe::catalog::UNIVERSES;
    use multiverse::universe::prompt::build_tasks;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    fn pool(concurrency: usize) -> WorkerPool {
        WorkerPool::new(PoolConfig::new(concurrency).expect("valid concurrency"))
    }

    fn universe_batch() -> Arc<Batch> {
        Arc::new(Batch::new(1, build_tasks(&UNIVERSES)).expect("catalog keys are unique"))
    }

    // Tests one failing universe leaves the rest Done and blocks the album
    // Verified by aborting the worker on the first failure
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_failure_is_isolated() {
        let batch = universe_batch();
        let client = Arc::new(
            ScriptedClient::new()
                .failing_on("Fantasy")
                .with_delay(Duration::from_millis(20)),
        );

        let report = pool(2)
            .run(
                Arc::clone(&batch),
                png_bytes(32, 32, [200, 80, 40]),
                client.clone(),
                GenerationGuard::detached(1),
            )
            .await
            .expect("batch not yet dispatched");

        assert_eq!(
            report,
            PoolReport {
                completed: 5,
                failed: 1,
                discarded: 0
            }
        );
        assert_eq!(client.calls().len(), 6);
        assert_eq!(client.max_in_flight(), 2);

        let fantasy = TaskId::new("fantasy");
        assert_eq!(batch.store().status(&fantasy), Some(TaskStatus::Error));
        let message = batch
            .store()
            .get(&fantasy)
            .and_then(|state| state.error_message().map(str::to_string))
            .unwrap_or_default();
        assert!(message.contains("content policy"), "got: {message}");

        let album = AlbumCompositor::default().compose_batch(&batch);
        match album {
            Err(MultiverseError::IncompleteAlbumRequest { done, missing, .. }) => {
                assert_eq!(done, 5);
                assert_eq!(missing, [fantasy]);
            }
            other => unreachable!("Expected IncompleteAlbumRequest, got {other:?}"),
        }
    }

    // Tests no more than K calls are ever in flight
    // Verified by spawning one worker per task
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrency_ceiling() {
        let tasks: Vec<Task> = (0..12).map(|i| Task::new(format!("t{i}"), format!("p{i}"))).collect();
        let batch = Arc::new(Batch::new(1, tasks).expect("unique ids"));
        let client = Arc::new(ScriptedClient::new().with_delay(Duration::from_millis(15)));

        let report = pool(3)
            .run(
                Arc::clone(&batch),
                png_bytes(8, 8, [1, 2, 3]),
                client.clone(),
                GenerationGuard::detached(1),
            )
            .await
            .expect("batch not yet dispatched");

        assert_eq!(report.completed, 12);
        assert_eq!(client.max_in_flight(), 3);
        assert!(batch.is_complete());
    }

    // Tests tasks are started in submission order
    // Verified by popping from the back of the queue
    #[tokio::test]
    async fn test_single_worker_preserves_order() {
        let batch = universe_batch();
        let client = Arc::new(ScriptedClient::new());

        pool(1)
            .run(
                Arc::clone(&batch),
                png_bytes(8, 8, [9, 9, 9]),
                client.clone(),
                GenerationGuard::detached(1),
            )
            .await
            .expect("batch not yet dispatched");

        let expected: Vec<String> = batch.tasks().iter().map(|task| task.prompt.clone()).collect();
        assert_eq!(client.calls(), expected);
    }

    // Tests a call that never resolves becomes an Error instead of Pending
    // Verified by awaiting the call without a time limit
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timeout_marks_error() {
        let batch = Arc::new(
            Batch::new(1, vec![Task::new("a", "slow"), Task::new("b", "slow")]).expect("unique ids"),
        );
        let config = PoolConfig::new(2)
            .and_then(|config| config.with_timeout(Duration::from_millis(50)))
            .expect("valid config");
        let client = Arc::new(ScriptedClient::new().with_delay(Duration::from_secs(30)));

        let report = WorkerPool::new(config)
            .run(
                Arc::clone(&batch),
                png_bytes(8, 8, [9, 9, 9]),
                client.clone(),
                GenerationGuard::detached(1),
            )
            .await
            .expect("batch not yet dispatched");

        assert_eq!(report.failed, 2);
        let snapshot = batch.snapshot();
        for (_, state) in &snapshot.tasks {
            let message = state.error_message().unwrap_or_default();
            assert!(message.contains("timed out"), "got: {message}");
        }
        assert_eq!(client.max_in_flight(), 2);
    }

    // Tests timed out calls have stopped before the worker takes the next task
    // Verified by returning from the timeout without awaiting the aborted call
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_timeout_keeps_ceiling() {
        let tasks: Vec<Task> = (0..8).map(|i| Task::new(format!("t{i}"), "stalls")).collect();
        let batch = Arc::new(Batch::new(1, tasks).expect("unique ids"));
        let config = PoolConfig::new(1)
            .and_then(|config| config.with_timeout(Duration::from_millis(20)))
            .expect("valid config");
        let client = Arc::new(ScriptedClient::new().with_delay(Duration::from_secs(5)));

        let report = WorkerPool::new(config)
            .run(
                Arc::clone(&batch),
                png_bytes(8, 8, [9, 9, 9]),
                client.clone(),
                GenerationGuard::detached(1),
            )
            .await
            .expect("batch not yet dispatched");

        assert_eq!(report.failed, 8);
        assert_eq!(client.calls().len(), 8);
        assert_eq!(client.max_in_flight(), 1);
    }

    // Tests a panicking client fails its tasks without stopping the pool
    // Verified by awaiting the client inside the worker task
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_client_is_contained() {
        let batch = universe_batch();

        let report = pool(2)
            .run(
                Arc::clone(&batch),
                png_bytes(8, 8, [9, 9, 9]),
                Arc::new(PanickingClient),
                GenerationGuard::detached(1),
            )
            .await
            .expect("batch not yet dispatched");

        assert_eq!(report.failed, UNIVERSES.len());
        assert_eq!(batch.counts().failed, UNIVERSES.len());
        assert!(batch.is_complete());
    }

    // Tests an empty batch resolves immediately without calling the client
    // Verified by spawning workers for an empty queue and waiting on them
    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let batch = Arc::new(Batch::new(1, Vec::new()).expect("empty batch"));
        let client = Arc::new(ScriptedClient::new());

        let report = pool(4)
            .run(
                Arc::clone(&batch),
                png_bytes(8, 8, [9, 9, 9]),
                client.clone(),
                GenerationGuard::detached(1),
            )
            .await
            .expect("batch not yet dispatched");

        assert_eq!(report, PoolReport::default());
        assert!(client.calls().is_empty());
        assert!(batch.is_dispatched());
    }

    // Tests a batch is never run twice
    // Verified by ignoring the dispatch flag
    #[tokio::test]
    async fn test_second_run_is_refused() {
        let batch = universe_batch();
        let client = Arc::new(ScriptedClient::new());
        let workers = pool(2);

        let first = workers
            .run(
                Arc::clone(&batch),
                png_bytes(8, 8, [9, 9, 9]),
                client.clone(),
                GenerationGuard::detached(1),
            )
            .await
            .expect("batch not yet dispatched");
        let second = workers
            .run(
                Arc::clone(&batch),
                png_bytes(8, 8, [9, 9, 9]),
                client.clone(),
                GenerationGuard::detached(1),
            )
            .await;

        assert_eq!(first.completed, UNIVERSES.len());
        assert!(matches!(
            second,
            Err(MultiverseError::BatchAlreadyDispatched { generation: 1 })
        ));
        assert_eq!(client.calls().len(), UNIVERSES.len());
    }

    // Tests results landing after the guard went stale are dropped
    // Verified by skipping the post-call guard check
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stale_guard_discards_results() {
        let batch = universe_batch();
        let gate = Arc::new(Semaphore::new(0));
        let client = Arc::new(ScriptedClient::new().gated(Arc::clone(&gate)));
        let active = Arc::new(AtomicU64::new(1));
        let guard = GenerationGuard::new(Arc::clone(&active), 1);

        let running = tokio::spawn({
            let batch = Arc::clone(&batch);
            let client = client.clone();
            async move {
                pool(1)
                    .run(batch, png_bytes(8, 8, [9, 9, 9]), client, guard)
                    .await
                    .expect("batch not yet dispatched")
            }
        });

        for _ in 0..200 {
            if !client.calls().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(client.calls().len(), 1);

        active.store(2, Ordering::Release);
        gate.add_permits(UNIVERSES.len());
        let report = running.await.expect("pool task panicked");

        assert_eq!(
            report,
            PoolReport {
                completed: 0,
                failed: 0,
                discarded: UNIVERSES.len()
            }
        );
        assert_eq!(client.calls().len(), 1);
        assert_eq!(batch.counts().pending, UNIVERSES.len());
    }

    // Tests out-of-range configuration is rejected
    // Verified by accepting zero workers
    #[test]
    fn test_config_validation() {
        assert!(PoolConfig::new(0).is_err());
        assert!(PoolConfig::new(17).is_err());
        let config = PoolConfig::new(4).expect("in range");
        assert_eq!(config.concurrency(), 4);
        assert_eq!(config.timeout(), None);
        assert!(config.with_timeout(Duration::ZERO).is_err());
        assert_eq!(PoolConfig::default().concurrency(), 2);
    }
}
