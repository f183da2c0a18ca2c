//! Error types for the cutout library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the preprocessing, refinement and batch stages.
#[derive(Error, Debug)]
pub enum Error {
    /// Input path does not exist.
    #[error("missing file: {}", path.display())]
    MissingFile { path: PathBuf },

    /// The external matting collaborator failed.
    #[error("matting model failed: {message}")]
    MatteModel { message: String },

    /// Matte refinement was asked to clean an image without alpha.
    #[error("missing alpha channel in {width}x{height} image")]
    MissingAlphaChannel { width: u32, height: u32 },

    /// Failed to decode or encode image bytes.
    #[error("failed to {context}: {source}")]
    Encoding {
        context: &'static str,
        #[source]
        source: image::ImageError,
    },

    /// Image or target dimensions are unusable.
    #[error("invalid dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: &'static str,
    },

    /// Float image with a channel count we cannot persist.
    #[error("unsupported channel count {channels}, expected 1, 3 or 4")]
    UnsupportedChannels { channels: usize },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Two inputs of one batch map to the same output file.
    #[error("output {} was already written by another input", path.display())]
    OutputCollision { path: PathBuf },

    /// IO error on a specific path.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Result type alias for cutout operations.
pub type Result<T> = std::result::Result<T, Error>;
