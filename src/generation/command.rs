//! Generation client that delegates to an external generator program
//!
//! The program is invoked as
//! `PROGRAM [ARGS..] --prompt <text> --input <file> --output <file>`
//! and must write one image to the output path before exiting successfully.

use crate::generation::client::{GenerationClient, GenerationError, ImageBytes, validate_response};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Longest stderr excerpt kept in an error message
const STDERR_EXCERPT_CHARS: usize = 400;

/// Runs an external program once per generation request
#[derive(Clone, Debug)]
pub struct CommandClient {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandClient {
    /// Create a client for `program` with no extra arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Arguments placed before the generated ones
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Program this client runs
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, prompt: &str, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--prompt")
            .arg(prompt)
            .arg("--input")
            .arg(input)
            .arg("--output")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl GenerationClient for CommandClient {
    async fn generate(
        &self,
        source: &ImageBytes,
        prompt: &str,
    ) -> Result<ImageBytes, GenerationError> {
        let workdir = tempfile::Builder::new()
            .prefix("multiverse-")
            .tempdir()
            .map_err(|source| GenerationError::Io {
                operation: "create a scratch directory",
                source,
            })?;

        let extension = source
            .format()
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("img");
        let input = workdir.path().join(format!("source.{extension}"));
        let output = workdir.path().join("result.png");

        tokio::fs::write(&input, source.as_bytes())
            .await
            .map_err(|source| GenerationError::Io {
                operation: "stage the source image",
                source,
            })?;

        let mut cmd = self.command(prompt, &input, &output);
        debug!(program = %self.program.display(), "running generator");
        let finished = cmd.output().await.map_err(|source| GenerationError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !finished.status.success() {
            return Err(GenerationError::Exited {
                code: finished.status.code(),
                stderr: excerpt(&finished.stderr),
            });
        }

        let bytes = match tokio::fs::read(&output).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(GenerationError::MissingOutput { path: output });
            }
            Err(source) => {
                return Err(GenerationError::Io {
                    operation: "read the generated image",
                    source,
                });
            }
        };

        validate_response(bytes)
    }
}

fn excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    let mut excerpt: String = trimmed.chars().take(STDERR_EXCERPT_CHARS).collect();
    if trimmed.chars().count() > STDERR_EXCERPT_CHARS {
        excerpt.push('…');
    }
    excerpt
}
