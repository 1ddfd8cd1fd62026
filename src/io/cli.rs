//! Command-line interface: render one photo across every universe

use crate::album::compositor::{AlbumCompositor, AlbumFormat};
use crate::album::layout::AlbumLayout;
use crate::generation::client::GenerationClient;
use crate::generation::command::CommandClient;
use crate::generation::stylize::LocalStylizer;
use crate::io::configuration::{DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_DIR, DEFAULT_TIMEOUT_SECS};
use crate::io::error::{Result, invalid_parameter};
use crate::io::export::{export_album, export_universe_images, load_source};
use crate::io::logging::Verbosity;
use crate::io::progress::ProgressManager;
use crate::orchestration::pool::{PoolConfig, PoolReport, WorkerPool};
use crate::orchestration::session::Session;
use crate::universe::catalog::UNIVERSES;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Where generation requests are sent
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Built-in offline stylizer
    #[default]
    Local,
    /// External generator program
    Command,
}

#[derive(Parser)]
#[command(name = "multiverse")]
#[command(
    author,
    version,
    about = "Render one photo across six styled universes and composite them into an album"
)]
/// Command-line arguments for the multiverse tool
pub struct Cli {
    /// Source image to transform
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Directory receiving the universe images and the album
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Maximum number of generation calls in flight
    #[arg(short, long, env = "MULTIVERSE_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Generation backend
    #[arg(short, long, value_enum, default_value_t = Backend::Local)]
    pub backend: Backend,

    /// Generator program used by the command backend
    #[arg(short, long, env = "MULTIVERSE_GENERATOR")]
    pub generator: Option<PathBuf>,

    /// Extra argument passed to the generator before the generated ones (repeatable)
    #[arg(long = "generator-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub generator_args: Vec<String>,

    /// Per-call timeout in seconds, 0 to wait indefinitely
    #[arg(short, long, env = "MULTIVERSE_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Album encoding
    #[arg(short, long, value_enum, default_value_t = AlbumFormat::Png)]
    pub format: AlbumFormat,

    /// Skip album composition
    #[arg(long)]
    pub no_album: bool,

    /// Only report warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Report per-task dispatch details
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Logging level requested by the flags
    pub const fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Check if progress spinners should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }

    /// Worker pool configuration from the flags
    ///
    /// # Errors
    ///
    /// Returns an error if the concurrency is out of range
    pub fn pool_config(&self) -> Result<PoolConfig> {
        let config = PoolConfig::new(self.concurrency)?;
        if self.timeout == 0 {
            Ok(config)
        } else {
            config.with_timeout(Duration::from_secs(self.timeout))
        }
    }

    /// Generation client selected by the flags
    ///
    /// # Errors
    ///
    /// Returns an error if the command backend has no generator program
    pub fn client(&self) -> Result<Arc<dyn GenerationClient>> {
        match self.backend {
            Backend::Local => Ok(Arc::new(LocalStylizer::new())),
            Backend::Command => {
                let program = self.generator.as_ref().ok_or_else(|| {
                    invalid_parameter(
                        "generator",
                        &"<none>",
                        &"the command backend needs --generator or MULTIVERSE_GENERATOR",
                    )
                })?;
                Ok(Arc::new(
                    CommandClient::new(program).with_args(self.generator_args.iter().cloned()),
                ))
            }
        }
    }
}

/// What a run produced
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Pool outcome counts
    pub report: PoolReport,
    /// Universe images written, in batch order
    pub images: Vec<PathBuf>,
    /// Album written, if composed
    pub album: Option<PathBuf>,
}

/// Runs one batch end to end: generate, export, compose
pub struct BatchRunner {
    cli: Cli,
    progress_manager: Option<ProgressManager>,
}

impl BatchRunner {
    /// Create a runner for the given CLI arguments
    pub fn new(cli: Cli) -> Self {
        let progress_manager = cli.should_show_progress().then(ProgressManager::new);
        Self {
            cli,
            progress_manager,
        }
    }

    /// Create a runner that never draws progress
    pub const fn without_progress(cli: Cli) -> Self {
        Self {
            cli,
            progress_manager: None,
        }
    }

    /// Generate every universe, export the results and write the album
    ///
    /// Universe images that succeeded are written even when the album
    /// cannot be composed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The arguments are invalid or the source image cannot be loaded
    /// - An output file cannot be written
    /// - Any universe failed and an album was requested
    pub async fn run(&mut self) -> Result<RunSummary> {
        let start_time = Instant::now();
        let source = load_source(&self.cli.source)?;
        let client = self.cli.client()?;
        let compositor = AlbumCompositor::new(AlbumLayout::default(), self.cli.format)?;
        let session = Session::new(WorkerPool::new(self.cli.pool_config()?));

        let batch = session.start_universes(&UNIVERSES)?;
        if let Some(ref mut pm) = self.progress_manager {
            pm.track(&batch);
        }

        let report = session.generate(source, client).await?;

        if let Some(ref mut pm) = self.progress_manager {
            pm.finish(&batch);
        }

        let snapshot = batch.snapshot();
        for (id, state) in &snapshot.tasks {
            if let Some(message) = state.error_message() {
                warn!(universe = %id, "{message}");
            }
        }

        let images = export_universe_images(&self.cli.output, &snapshot)?;
        info!(
            written = images.len(),
            output = %self.cli.output.display(),
            "universe images exported"
        );

        let album = if self.cli.no_album {
            None
        } else {
            let album = session.compose_album(&compositor)?;
            let path = export_album(&self.cli.output, &album)?;
            info!(path = %path.display(), width = album.width, height = album.height, "album written");
            Some(path)
        };

        info!(elapsed = ?start_time.elapsed(), "done");
        Ok(RunSummary {
            report,
            images,
            album,
        })
    }
}
