//! Error and warning types shared by every pipeline stage.
//!
//! Fatal conditions are variants of [`ConnectivityError`] and abort a run.
//! Recoverable conditions are [`RunWarning`]s, collected and handed back
//! alongside a successful result.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal failure of a connectivity run
#[derive(Error, Debug)]
pub enum ConnectivityError {
    /// An input path does not exist or cannot be read
    #[error("input not found or unreadable: {path} ({message})")]
    InputNotFound { path: PathBuf, message: String },

    /// An input was read but is not a usable volume (bad NIfTI, wrong
    /// dimensionality, non-integral labels, empty atlas)
    #[error("invalid input {path}: {message}")]
    InvalidInput { path: PathBuf, message: String },

    /// Functional volume and atlas do not share spatial geometry
    #[error("geometry mismatch: {message}")]
    GeometryMismatch { message: String },

    /// Output directory missing, not a directory, or a write failed
    #[error("failed to write output {path}: {message}")]
    OutputWriteError { path: PathBuf, message: String },

    /// Configuration left unresolved or inconsistent
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Raster encoding failed
    #[error("encoding error: {message}")]
    Encode { message: String },
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ConnectivityError>;

impl ConnectivityError {
    pub fn input_not_found(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InputNotFound {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_input(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn geometry(message: impl Into<String>) -> Self {
        Self::GeometryMismatch {
            message: message.into(),
        }
    }

    pub fn output(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::OutputWriteError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }
}

/// Recoverable condition reported with a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunWarning {
    /// The region's averaged signal has zero temporal variance. Its
    /// standardized column and its connectivity row/column are all zeros.
    DegenerateRegion { label: i64 },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::DegenerateRegion { label } => write!(
                f,
                "region {} has a constant signal; its time series and correlations are set to zero",
                label
            ),
        }
    }
}
