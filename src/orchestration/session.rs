//! Session: owns the single active batch and its lifecycle
//!
//! A session starts batches, runs them through the worker pool, exposes
//! their state and composes the album. Reset discards the batch wholesale;
//! each batch carries a generation number so workers of a discarded batch
//! can recognise that their results no longer matter.

use crate::album::compositor::{Album, AlbumCompositor};
use crate::generation::client::{GenerationClient, ImageBytes};
use crate::io::error::{MultiverseError, Result};
use crate::orchestration::batch::Batch;
use crate::orchestration::pool::{GenerationGuard, PoolReport, WorkerPool};
use crate::orchestration::store::BatchSnapshot;
use crate::orchestration::task::Task;
use crate::universe::catalog::Universe;
use crate::universe::prompt::build_tasks;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

/// Holds at most one active batch at a time
#[derive(Debug, Default)]
pub struct Session {
    pool: WorkerPool,
    active: Mutex<Option<Arc<Batch>>>,
    active_generation: Arc<AtomicU64>,
    next_generation: AtomicU64,
}

impl Session {
    /// Create a session with no active batch
    pub fn new(pool: WorkerPool) -> Self {
        Self {
            pool,
            ..Self::default()
        }
    }

    /// Worker pool used for every batch of this session
    pub const fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Start a batch rendering each universe with its catalog prompt
    ///
    /// # Errors
    ///
    /// See [`Session::start_batch`]
    pub fn start_universes(&self, universes: &[Universe]) -> Result<Arc<Batch>> {
        self.start_batch(build_tasks(universes))
    }

    /// Make a new batch of `tasks` the active one, all `Pending`
    ///
    /// A finished or never-dispatched batch is replaced; a running one must
    /// be reset first.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The active batch is running and still has tasks pending
    /// - Two tasks share an id
    pub fn start_batch(&self, tasks: Vec<Task>) -> Result<Arc<Batch>> {
        let mut active = self.lock_active();

        if let Some(batch) = active.as_ref()
            && batch.is_running()
        {
            return Err(MultiverseError::BatchInProgress {
                generation: batch.generation(),
                pending: batch.counts().pending,
            });
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let batch = Arc::new(Batch::new(generation, tasks)?);
        self.active_generation.store(generation, Ordering::Release);
        *active = Some(Arc::clone(&batch));

        info!(generation, tasks = batch.len(), "batch started");
        Ok(batch)
    }

    /// Run the active batch to completion
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No batch was started
    /// - The active batch was already dispatched
    pub async fn generate(
        &self,
        source: ImageBytes,
        client: Arc<dyn GenerationClient>,
    ) -> Result<PoolReport> {
        let batch = self.active_batch().ok_or(MultiverseError::NoActiveBatch)?;
        let guard = self.guard_for(&batch);
        self.pool.run(batch, source, client, guard).await
    }

    /// Start a batch for `universes` and run it to completion
    ///
    /// # Errors
    ///
    /// See [`Session::start_batch`]
    pub async fn run_universes(
        &self,
        universes: &[Universe],
        source: ImageBytes,
        client: Arc<dyn GenerationClient>,
    ) -> Result<PoolReport> {
        let batch = self.start_universes(universes)?;
        let guard = self.guard_for(&batch);
        self.pool.run(batch, source, client, guard).await
    }

    /// The active batch, if any
    pub fn active_batch(&self) -> Option<Arc<Batch>> {
        self.lock_active().clone()
    }

    /// Generation number of the active batch, 0 when there is none
    pub fn active_generation(&self) -> u64 {
        self.active_generation.load(Ordering::Acquire)
    }

    /// Read-only copy of the active batch's task states
    pub fn snapshot(&self) -> Option<BatchSnapshot> {
        self.active_batch().map(|batch| batch.snapshot())
    }

    /// Stale-result guard for `batch`
    pub fn guard_for(&self, batch: &Batch) -> GenerationGuard {
        GenerationGuard::new(Arc::clone(&self.active_generation), batch.generation())
    }

    /// Discard the active batch and return to the no-batch state
    ///
    /// Calls already in flight are not aborted; their results are dropped
    /// when they arrive.
    pub fn reset(&self) {
        let mut active = self.lock_active();
        if let Some(batch) = active.take() {
            info!(generation = batch.generation(), "batch reset");
        }
        self.active_generation.store(0, Ordering::Release);
    }

    /// Compose the album from the active batch
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No batch is active
    /// - Any task is not `Done`
    /// - Rendering or encoding the album fails
    pub fn compose_album(&self, compositor: &AlbumCompositor) -> Result<Album> {
        let batch = self.active_batch().ok_or(MultiverseError::NoActiveBatch)?;
        compositor.compose_batch(&batch)
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<Arc<Batch>>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
