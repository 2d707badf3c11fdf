//! fc-core: parcellation-based functional connectivity
//!
//! Turns a denoised 4D fMRI volume and an integer-labelled parcellation into
//! a region-by-region correlation matrix, plus a carpet plot of the region
//! signals and a heatmap of the matrix.
//!
//! # Modules
//! - `nifti_io`: NIfTI-1 reading and writing (.nii / .nii.gz)
//! - `volume`: functional volume and atlas containers
//! - `masker`: region averaging and standardization
//! - `connectivity`: Pearson correlation matrix
//! - `plot`: carpet and matrix heatmaps
//! - `npy`, `output`: artifact encoding and all-or-nothing persistence
//! - `pipeline`: the end-to-end run

// Core modules
pub mod config;
pub mod error;

// I/O modules
pub mod nifti_io;
pub mod npy;
pub mod output;
pub mod volume;

// Algorithm modules
pub mod connectivity;
pub mod masker;
pub mod plot;

pub mod pipeline;

pub use config::ConnectivityConfig;
pub use error::{ConnectivityError, Result, RunWarning};
pub use pipeline::{analyze, run_connectivity, ConnectivityAnalysis, ConnectivityRun};
