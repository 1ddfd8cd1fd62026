//! Live per-universe progress display driven by the task state store

use crate::orchestration::batch::Batch;
use crate::orchestration::task::{TaskId, TaskState};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

const TICK_INTERVAL: Duration = Duration::from_millis(120);

static RUNNING_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:<18.bold} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
});

static FINISHED_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::with_template("  {prefix:<18.bold} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
});

/// Short status line for a task state
pub fn status_line(state: &TaskState) -> String {
    match state {
        TaskState::Pending => "generating…".to_string(),
        TaskState::Done(image) => format!("✓ done ({} KiB)", image.len().div_ceil(1024)),
        TaskState::Error(message) => format!("✗ {message}"),
    }
}

/// One spinner per task, updated as the store publishes transitions
pub struct ProgressManager {
    multi_progress: MultiProgress,
    bars: Vec<(TaskId, ProgressBar)>,
    watchers: JoinSet<()>,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressManager {
    /// Create a manager drawing to stderr
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    /// Create a manager that draws nothing
    pub fn hidden() -> Self {
        Self::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi_progress: MultiProgress::with_draw_target(target),
            bars: Vec::new(),
            watchers: JoinSet::new(),
        }
    }

    /// Add a spinner for every task of `batch` and follow its state
    ///
    /// Must be called from within a tokio runtime.
    pub fn track(&mut self, batch: &Batch) {
        for id in batch.ids() {
            let Some(receiver) = batch.store().subscribe(id) else {
                continue;
            };
            let bar = self.multi_progress.add(ProgressBar::new_spinner());
            bar.set_style(RUNNING_STYLE.clone());
            bar.set_prefix(id.to_string());
            bar.enable_steady_tick(TICK_INTERVAL);
            self.watchers.spawn(follow(receiver, bar.clone()));
            self.bars.push((id.clone(), bar));
        }
    }

    /// Number of spinners being shown
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Whether nothing is being tracked
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Current message of every spinner, in batch order
    pub fn messages(&self) -> Vec<String> {
        self.bars.iter().map(|(_, bar)| bar.message()).collect()
    }

    /// Stop following and render each task's final state from `batch`
    pub fn finish(&mut self, batch: &Batch) {
        self.watchers.abort_all();
        for (id, bar) in &self.bars {
            if let Some(state) = batch.store().get(id) {
                render(bar, &state);
            }
        }
    }
}

async fn follow(mut receiver: watch::Receiver<TaskState>, bar: ProgressBar) {
    loop {
        let state = receiver.borrow_and_update().clone();
        render(&bar, &state);
        if state.is_terminal() || receiver.changed().await.is_err() {
            break;
        }
    }
}

fn render(bar: &ProgressBar, state: &TaskState) {
    let line = status_line(state);
    if state.is_terminal() {
        bar.set_style(FINISHED_STYLE.clone());
        bar.finish_with_message(line);
    } else {
        bar.set_message(line);
    }
}
