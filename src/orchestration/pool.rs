//! Bounded worker pool draining one shared queue of generation tasks

use crate::generation::client::{GenerationClient, GenerationError, ImageBytes};
use crate::io::configuration::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
use crate::io::error::{MultiverseError, Result, invalid_parameter};
use crate::orchestration::batch::Batch;
use crate::orchestration::queue::TaskQueue;
use crate::orchestration::task::Task;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Worker pool parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    concurrency: usize,
    timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: None,
        }
    }
}

impl PoolConfig {
    /// Create a configuration allowing `concurrency` calls in flight
    ///
    /// # Errors
    ///
    /// Returns an error if `concurrency` is zero or above `MAX_CONCURRENCY`
    pub fn new(concurrency: usize) -> Result<Self> {
        if concurrency == 0 || concurrency > MAX_CONCURRENCY {
            return Err(invalid_parameter(
                "concurrency",
                &concurrency,
                &format!("must be between 1 and {MAX_CONCURRENCY}"),
            ));
        }
        Ok(Self {
            concurrency,
            timeout: None,
        })
    }

    /// Fail any single call that takes longer than `timeout`
    ///
    /// # Errors
    ///
    /// Returns an error if `timeout` is zero
    pub fn with_timeout(self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(invalid_parameter(
                "timeout",
                &format!("{timeout:?}"),
                &"must be greater than zero",
            ));
        }
        Ok(Self {
            timeout: Some(timeout),
            ..self
        })
    }

    /// Maximum number of calls in flight
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Per-call time limit, if any
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Tells workers whether their batch is still the active one
///
/// The owning session bumps the shared counter on reset, after which every
/// guard holding an older generation reports stale.
#[derive(Clone, Debug)]
pub struct GenerationGuard {
    active: Arc<AtomicU64>,
    generation: u64,
}

impl GenerationGuard {
    /// Guard tied to a session's active-generation counter
    pub const fn new(active: Arc<AtomicU64>, generation: u64) -> Self {
        Self { active, generation }
    }

    /// Guard that stays current forever, for batches run outside a session
    pub fn detached(generation: u64) -> Self {
        Self::new(Arc::new(AtomicU64::new(generation)), generation)
    }

    /// Generation this guard was issued for
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the batch is still the active one
    pub fn is_current(&self) -> bool {
        self.active.load(Ordering::Acquire) == self.generation
    }
}

/// Outcome counts of one pool run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Tasks moved to `Done`
    pub completed: usize,
    /// Tasks moved to `Error`
    pub failed: usize,
    /// Tasks dropped because their batch was reset
    pub discarded: usize,
}

impl PoolReport {
    fn merge(&mut self, other: Self) {
        self.completed += other.completed;
        self.failed += other.failed;
        self.discarded += other.discarded;
    }
}

/// Runs a batch with a fixed ceiling on concurrent generation calls
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerPool {
    config: PoolConfig,
}

impl WorkerPool {
    /// Create a pool from its configuration
    pub const fn new(config: PoolConfig) -> Self {
        Self { config }
    }

    /// Pool configuration
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Generate every task of `batch`, publishing each result as it lands
    ///
    /// Resolves once every worker has drained the queue and its last call
    /// has resolved. Failed tasks are recorded on the batch and never abort
    /// the run. If `guard` goes stale, workers stop taking new tasks and
    /// drop results that arrive late.
    ///
    /// # Errors
    ///
    /// Returns `BatchAlreadyDispatched` if the batch was already claimed by
    /// an earlier run; only one run ever dispatches a batch.
    #[tracing::instrument(
        name = "pool",
        skip_all,
        fields(generation = guard.generation(), tasks = batch.len())
    )]
    pub async fn run(
        &self,
        batch: Arc<Batch>,
        source: ImageBytes,
        client: Arc<dyn GenerationClient>,
        guard: GenerationGuard,
    ) -> Result<PoolReport> {
        if !batch.begin_dispatch() {
            warn!("batch was already dispatched, not running it again");
            return Err(MultiverseError::BatchAlreadyDispatched {
                generation: batch.generation(),
            });
        }
        if batch.is_empty() {
            debug!("empty batch, nothing to generate");
            return Ok(PoolReport::default());
        }

        let queue = Arc::new(TaskQueue::new(batch.tasks().iter().cloned()));
        let workers = self.config.concurrency.min(batch.len());
        info!(workers, "starting generation");

        let mut set = JoinSet::new();
        for index in 0..workers {
            let worker = Worker {
                index,
                queue: Arc::clone(&queue),
                batch: Arc::clone(&batch),
                source: source.clone(),
                client: Arc::clone(&client),
                guard: guard.clone(),
                timeout: self.config.timeout,
            };
            set.spawn(worker.drain());
        }

        let mut report = PoolReport::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(worker_report) => report.merge(worker_report),
                Err(join_error) => error!(%join_error, "worker stopped unexpectedly"),
            }
        }

        info!(
            completed = report.completed,
            failed = report.failed,
            discarded = report.discarded,
            "generation finished"
        );
        Ok(report)
    }
}

struct Worker {
    index: usize,
    queue: Arc<TaskQueue>,
    batch: Arc<Batch>,
    source: ImageBytes,
    client: Arc<dyn GenerationClient>,
    guard: GenerationGuard,
    timeout: Option<Duration>,
}

impl Worker {
    async fn drain(self) -> PoolReport {
        let mut report = PoolReport::default();

        loop {
            if !self.guard.is_current() {
                let dropped = self.queue.clear();
                if dropped > 0 {
                    debug!(worker = self.index, dropped, "batch was reset, dropping queued tasks");
                }
                report.discarded += dropped;
                break;
            }

            let Some(task) = self.queue.pop() else {
                break;
            };

            debug!(worker = self.index, task = %task.id, "dispatching");
            let outcome = self.call(&task).await;

            if !self.guard.is_current() {
                warn!(task = %task.id, "discarding late result from a reset batch");
                report.discarded += 1;
                continue;
            }

            let published = match outcome {
                Ok(image) => {
                    debug!(task = %task.id, bytes = image.len(), "generated");
                    report.completed += 1;
                    self.batch.store().complete(&task.id, image)
                }
                Err(failure) => {
                    warn!(task = %task.id, %failure, "generation failed");
                    report.failed += 1;
                    self.batch.store().fail(&task.id, failure.to_string())
                }
            };
            if let Err(rejected) = published {
                error!(task = %task.id, %rejected, "could not publish task result");
            }
        }

        report
    }

    // The call runs on its own task so a panicking client surfaces as a
    // join error instead of taking the worker down with it. A timed out call
    // is aborted and awaited, so it has stopped before the worker moves on.
    async fn call(&self, task: &Task) -> std::result::Result<ImageBytes, GenerationError> {
        let client = Arc::clone(&self.client);
        let source = self.source.clone();
        let prompt = task.prompt.clone();
        let mut handle = tokio::spawn(async move { client.generate(&source, &prompt).await });

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    if let Err(join_error) = handle.await
                        && join_error.is_panic()
                    {
                        warn!(task = %task.id, "timed out call panicked while stopping");
                    }
                    return Err(GenerationError::Timeout { after: limit });
                }
            },
            None => handle.await,
        };

        joined.unwrap_or_else(|join_error| {
            if join_error.is_panic() {
                Err(GenerationError::Panicked)
            } else {
                Err(GenerationError::Cancelled)
            }
        })
    }
}
