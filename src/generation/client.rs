//! Generation client boundary: source image plus prompt in, styled image out

use async_trait::async_trait;
use image::ImageFormat;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Immutable encoded image buffer, cheap to clone and share across tasks
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ImageBytes(Arc<[u8]>);

impl ImageBytes {
    /// Wrap encoded image data
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// Raw encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the encoded data in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the buffer holds no data
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Container format sniffed from the leading magic bytes
    pub fn format(&self) -> Option<ImageFormat> {
        image::guess_format(&self.0).ok()
    }

    /// Decode into pixels
    ///
    /// # Errors
    ///
    /// Returns the decoder error if the bytes are not a supported image
    pub fn decode(&self) -> image::ImageResult<image::DynamicImage> {
        image::load_from_memory(&self.0)
    }
}

impl fmt::Debug for ImageBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format() {
            Some(format) => write!(f, "ImageBytes({format:?}, {} bytes)", self.len()),
            None => write!(f, "ImageBytes({} bytes)", self.len()),
        }
    }
}

impl From<Vec<u8>> for ImageBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for ImageBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Failure of a single generation call
///
/// Every variant collapses into the task's `Error` state; the `Display` text
/// becomes the task's message.
#[derive(Debug)]
pub enum GenerationError {
    /// The generator process could not be started
    Spawn {
        /// Program that failed to start
        program: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The generator process ended unsuccessfully
    Exited {
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Trimmed standard error output
        stderr: String,
    },

    /// The generator reported success but produced no image
    MissingOutput {
        /// Where the image was expected
        path: PathBuf,
    },

    /// The response was not a usable image
    InvalidResponse {
        /// What was wrong with the response
        reason: String,
    },

    /// The call did not resolve in time
    Timeout {
        /// Time allowed for the call
        after: Duration,
    },

    /// The service refused the request
    Rejected {
        /// Reason given by the service
        reason: String,
    },

    /// The client panicked while handling the call
    Panicked,

    /// The call was cancelled before it resolved
    Cancelled,

    /// Local I/O needed to stage the call failed
    Io {
        /// What was being done
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn { program, source } => {
                write!(f, "could not start generator '{}': {source}", program.display())
            }
            Self::Exited { code, stderr } => {
                match code {
                    Some(code) => write!(f, "generator exited with status {code}")?,
                    None => write!(f, "generator was terminated by a signal")?,
                }
                if stderr.is_empty() {
                    Ok(())
                } else {
                    write!(f, ": {stderr}")
                }
            }
            Self::MissingOutput { path } => {
                write!(f, "generator produced no image at '{}'", path.display())
            }
            Self::InvalidResponse { reason } => write!(f, "invalid generator response: {reason}"),
            Self::Timeout { after } => {
                write!(f, "generation timed out after {}s", after.as_secs_f32())
            }
            Self::Rejected { reason } => write!(f, "request rejected: {reason}"),
            Self::Panicked => write!(f, "generation client panicked"),
            Self::Cancelled => write!(f, "generation was cancelled"),
            Self::Io { operation, source } => write!(f, "failed to {operation}: {source}"),
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } | Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// External image synthesis service
///
/// Implementations may take arbitrarily long and may fail for any reason;
/// the worker pool places no retry around them.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate one styled image from `source` guided by `prompt`
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationError`] describing why no image was produced
    async fn generate(
        &self,
        source: &ImageBytes,
        prompt: &str,
    ) -> Result<ImageBytes, GenerationError>;
}

/// Reject responses that cannot be decoded as an image
///
/// # Errors
///
/// Returns `InvalidResponse` for empty or unrecognised data
pub fn validate_response(bytes: Vec<u8>) -> Result<ImageBytes, GenerationError> {
    if bytes.is_empty() {
        return Err(GenerationError::InvalidResponse {
            reason: "empty image".to_string(),
        });
    }
    let image = ImageBytes::from(bytes);
    if image.format().is_none() {
        return Err(GenerationError::InvalidResponse {
            reason: "unrecognised image format".to_string(),
        });
    }
    Ok(image)
}
