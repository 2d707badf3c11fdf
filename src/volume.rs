//! In-memory functional volume and parcellation atlas
//!
//! Both types store voxels in NIfTI (Fortran) order so a spatial index
//! `x + y*nx + z*nx*ny` addresses the same voxel in either of them.

use std::path::Path;

use crate::error::{ConnectivityError, Result};
use crate::nifti_io::{read_nifti_file, NiftiData};

/// Atlas values further than this from an integer are rejected
const LABEL_TOLERANCE: f64 = 1e-3;

/// 4D functional volume (x, y, z, time)
#[derive(Debug, Clone)]
pub struct FunctionalVolume {
    data: Vec<f64>,
    dims: (usize, usize, usize, usize),
    affine: [f64; 16],
}

impl FunctionalVolume {
    /// Build a volume from a flat buffer, index = x + y*nx + z*nx*ny + t*nx*ny*nz
    pub fn new(
        data: Vec<f64>,
        dims: (usize, usize, usize, usize),
        affine: [f64; 16],
    ) -> Result<Self> {
        let (nx, ny, nz, nt) = dims;
        if nx * ny * nz == 0 || nt == 0 {
            return Err(ConnectivityError::invalid_input(
                "<memory>",
                format!("volume has an empty dimension: {:?}", dims),
            ));
        }
        if data.len() != nx * ny * nz * nt {
            return Err(ConnectivityError::invalid_input(
                "<memory>",
                format!(
                    "volume buffer holds {} values, dims {:?} need {}",
                    data.len(),
                    dims,
                    nx * ny * nz * nt
                ),
            ));
        }
        Ok(Self { data, dims, affine })
    }

    /// Load a functional volume from a .nii / .nii.gz file
    ///
    /// A 3D file is accepted as a single time point.
    pub fn load(path: &Path) -> Result<Self> {
        let nifti = read_nifti_file(path)?;
        Self::from_nifti(nifti).map_err(|e| relabel_path(e, path))
    }

    fn from_nifti(nifti: NiftiData) -> Result<Self> {
        Self::new(nifti.data, nifti.dims, nifti.affine)
    }

    pub fn dims(&self) -> (usize, usize, usize, usize) {
        self.dims
    }

    pub fn spatial_dims(&self) -> (usize, usize, usize) {
        (self.dims.0, self.dims.1, self.dims.2)
    }

    pub fn n_timepoints(&self) -> usize {
        self.dims.3
    }

    pub fn n_voxels(&self) -> usize {
        self.dims.0 * self.dims.1 * self.dims.2
    }

    pub fn affine(&self) -> &[f64; 16] {
        &self.affine
    }

    /// Flat view of the 3D frame at time `t`
    pub fn frame(&self, t: usize) -> &[f64] {
        let n = self.n_voxels();
        &self.data[t * n..(t + 1) * n]
    }
}

/// 3D integer-labelled parcellation; label 0 is background
#[derive(Debug, Clone)]
pub struct ParcellationAtlas {
    labels: Vec<i64>,
    dims: (usize, usize, usize),
    affine: [f64; 16],
}

impl ParcellationAtlas {
    pub fn new(labels: Vec<i64>, dims: (usize, usize, usize), affine: [f64; 16]) -> Result<Self> {
        let n = dims.0 * dims.1 * dims.2;
        if labels.len() != n {
            return Err(ConnectivityError::invalid_input(
                "<memory>",
                format!(
                    "atlas buffer holds {} labels, dims {:?} need {}",
                    labels.len(),
                    dims,
                    n
                ),
            ));
        }
        Ok(Self { labels, dims, affine })
    }

    /// Load an atlas from a .nii / .nii.gz file
    ///
    /// The file must be 3D (or 4D with a single volume) and hold integral
    /// values.
    pub fn load(path: &Path) -> Result<Self> {
        let nifti = read_nifti_file(path)?;
        Self::from_nifti(nifti).map_err(|e| relabel_path(e, path))
    }

    fn from_nifti(nifti: NiftiData) -> Result<Self> {
        let (nx, ny, nz, nt) = nifti.dims;
        if nt != 1 {
            return Err(ConnectivityError::invalid_input(
                "<memory>",
                format!("atlas must be a 3D volume, found {} volumes", nt),
            ));
        }

        let mut labels = Vec::with_capacity(nifti.data.len());
        for (idx, &v) in nifti.data.iter().enumerate() {
            let rounded = v.round();
            if !v.is_finite() || (v - rounded).abs() > LABEL_TOLERANCE {
                return Err(ConnectivityError::invalid_input(
                    "<memory>",
                    format!("atlas value {} at voxel {} is not an integer label", v, idx),
                ));
            }
            labels.push(rounded as i64);
        }

        Self::new(labels, (nx, ny, nz), nifti.affine)
    }

    pub fn dims(&self) -> (usize, usize, usize) {
        self.dims
    }

    pub fn affine(&self) -> &[f64; 16] {
        &self.affine
    }

    pub fn labels(&self) -> &[i64] {
        &self.labels
    }
}

/// Replace the placeholder path of an in-memory validation error
fn relabel_path(err: ConnectivityError, path: &Path) -> ConnectivityError {
    match err {
        ConnectivityError::InvalidInput { message, .. } => {
            ConnectivityError::invalid_input(path, message)
        }
        other => other,
    }
}
