//! Run configuration
//!
//! Inputs are checked once, up front, by [`ConnectivityConfig::validate`];
//! the numeric settings of every stage travel with the configuration rather
//! than living in process-wide defaults.

use std::path::{Path, PathBuf};

use crate::error::{ConnectivityError, Result};
use crate::masker::MaskerParams;
use crate::plot::{CarpetParams, MatrixPlotParams};

/// Everything one connectivity run needs
#[derive(Debug, Clone)]
pub struct ConnectivityConfig {
    /// Denoised 4D functional volume (.nii / .nii.gz)
    pub fmri_denoised: PathBuf,
    /// 3D integer-labelled parcellation (.nii / .nii.gz)
    pub parcellation: PathBuf,
    /// Destination directory; must be resolved by the caller before a run
    pub output_dir: Option<PathBuf>,
    pub masker: MaskerParams,
    pub carpet: CarpetParams,
    pub matrix_plot: MatrixPlotParams,
}

impl ConnectivityConfig {
    pub fn new(fmri_denoised: impl Into<PathBuf>, parcellation: impl Into<PathBuf>) -> Self {
        Self {
            fmri_denoised: fmri_denoised.into(),
            parcellation: parcellation.into(),
            output_dir: None,
            masker: MaskerParams::default(),
            carpet: CarpetParams::default(),
            matrix_plot: MatrixPlotParams::default(),
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    /// Check that both inputs exist and that an output directory was given
    ///
    /// The output directory itself is only checked when writing, so a bad
    /// destination does not prevent the computation from being attempted.
    pub fn validate(&self) -> Result<&Path> {
        for path in [&self.fmri_denoised, &self.parcellation] {
            if path.as_os_str().is_empty() {
                return Err(ConnectivityError::config("input path is empty"));
            }
            match std::fs::metadata(path) {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => {
                    return Err(ConnectivityError::input_not_found(path, "not a regular file"))
                }
                Err(e) => return Err(ConnectivityError::input_not_found(path, e.to_string())),
            }
        }

        match &self.output_dir {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(dir.as_path()),
            _ => Err(ConnectivityError::config(
                "output_dir is not set; the caller must choose a destination",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_is_reported_first() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = dir.path().join("atlas.nii");
        std::fs::write(&atlas, b"x").unwrap();

        let config = ConnectivityConfig::new(dir.path().join("missing.nii"), &atlas)
            .with_output_dir(dir.path());
        match config.validate() {
            Err(ConnectivityError::InputNotFound { path, .. }) => {
                assert!(path.ends_with("missing.nii"))
            }
            other => panic!("expected InputNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_directory_is_not_an_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let bold = dir.path().join("bold.nii");
        std::fs::write(&bold, b"x").unwrap();

        let config = ConnectivityConfig::new(&bold, dir.path()).with_output_dir(dir.path());
        assert!(matches!(
            config.validate(),
            Err(ConnectivityError::InputNotFound { .. })
        ));
    }

    #[test]
    fn test_output_dir_must_be_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let bold = dir.path().join("bold.nii");
        let atlas = dir.path().join("atlas.nii");
        std::fs::write(&bold, b"x").unwrap();
        std::fs::write(&atlas, b"x").unwrap();

        let config = ConnectivityConfig::new(&bold, &atlas);
        assert!(matches!(config.validate(), Err(ConnectivityError::Config { .. })));

        let config = config.with_output_dir(dir.path());
        assert_eq!(config.validate().unwrap(), dir.path());
    }
}
