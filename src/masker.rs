//! Parcellation-based signal extraction
//!
//! Averages the voxels of every non-background atlas label into one time
//! series and standardizes each series to zero mean and unit variance.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis};
use tracing::{debug, warn};

use crate::error::{ConnectivityError, Result, RunWarning};
use crate::volume::{FunctionalVolume, ParcellationAtlas};

/// Signal extraction parameters
#[derive(Debug, Clone)]
pub struct MaskerParams {
    /// Standardize every region series (default true)
    pub standardize: bool,
    /// Population standard deviations at or below this value mark a region
    /// as degenerate (default 0.0, i.e. only exactly constant signals)
    pub variance_epsilon: f64,
    /// Largest element-wise affine difference still treated as the same
    /// geometry (default 1e-4; NIfTI stores affines as f32)
    pub affine_tolerance: f64,
}

impl Default for MaskerParams {
    fn default() -> Self {
        Self {
            standardize: true,
            variance_epsilon: 0.0,
            affine_tolerance: 1e-4,
        }
    }
}

/// Region-averaged signals, T rows by P columns, columns in ascending label order
#[derive(Debug, Clone)]
pub struct RegionTimeSeries {
    signals: Array2<f64>,
    labels: Vec<i64>,
}

impl RegionTimeSeries {
    pub fn new(signals: Array2<f64>, labels: Vec<i64>) -> Result<Self> {
        if signals.ncols() != labels.len() {
            return Err(ConnectivityError::config(format!(
                "{} signal columns but {} labels",
                signals.ncols(),
                labels.len()
            )));
        }
        Ok(Self { signals, labels })
    }

    pub fn signals(&self) -> &Array2<f64> {
        &self.signals
    }

    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    pub fn n_timepoints(&self) -> usize {
        self.signals.nrows()
    }

    pub fn n_regions(&self) -> usize {
        self.signals.ncols()
    }
}

/// Extracted signals together with the regions flagged along the way
#[derive(Debug, Clone)]
pub struct Extraction {
    pub series: RegionTimeSeries,
    pub warnings: Vec<RunWarning>,
}

/// Verify that volume and atlas share shape and affine
pub fn check_geometry(
    volume: &FunctionalVolume,
    atlas: &ParcellationAtlas,
    affine_tolerance: f64,
) -> Result<()> {
    if volume.spatial_dims() != atlas.dims() {
        return Err(ConnectivityError::geometry(format!(
            "volume spatial shape {:?} differs from atlas shape {:?}",
            volume.spatial_dims(),
            atlas.dims()
        )));
    }

    let worst = volume
        .affine()
        .iter()
        .zip(atlas.affine().iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0_f64, f64::max);
    if !(worst <= affine_tolerance) {
        return Err(ConnectivityError::geometry(format!(
            "volume and atlas affines differ by up to {:.3e} (tolerance {:.1e})",
            worst, affine_tolerance
        )));
    }

    Ok(())
}

/// Average every labelled region of `volume` over its voxels
///
/// Labels that never occur produce no column; label 0 is ignored.
/// When `params.standardize` is set, columns are standardized and constant
/// columns become all zeros. Constant columns are reported as
/// [`RunWarning::DegenerateRegion`] either way.
pub fn extract_region_signals(
    volume: &FunctionalVolume,
    atlas: &ParcellationAtlas,
    params: &MaskerParams,
) -> Result<Extraction> {
    check_geometry(volume, atlas, params.affine_tolerance)?;

    // label -> voxel count, ordered by label
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for &label in atlas.labels().iter().filter(|&&l| l != 0) {
        *counts.entry(label).or_insert(0) += 1;
    }
    if counts.is_empty() {
        return Err(ConnectivityError::invalid_input(
            "<atlas>",
            "atlas has no labelled voxels",
        ));
    }

    let labels: Vec<i64> = counts.keys().copied().collect();
    let column_of: BTreeMap<i64, usize> =
        labels.iter().enumerate().map(|(c, &l)| (l, c)).collect();
    let voxel_columns: Vec<Option<usize>> = atlas
        .labels()
        .iter()
        .map(|l| column_of.get(l).copied())
        .collect();

    let nt = volume.n_timepoints();
    let n_regions = labels.len();
    debug!(n_regions, n_timepoints = nt, "averaging region signals");

    let mut signals = Array2::<f64>::zeros((nt, n_regions));
    for t in 0..nt {
        let frame = volume.frame(t);
        let mut row = signals.row_mut(t);
        for (value, column) in frame.iter().zip(voxel_columns.iter()) {
            if let Some(c) = *column {
                row[c] += value;
            }
        }
        for (c, label) in labels.iter().enumerate() {
            row[c] /= counts[label] as f64;
        }
    }

    let degenerate = if params.standardize {
        standardize_columns(&mut signals, params.variance_epsilon)
    } else {
        (0..n_regions)
            .filter(|&c| is_constant(signals.column(c)))
            .collect()
    };
    let warnings = degenerate
        .into_iter()
        .map(|c| {
            warn!(label = labels[c], "region has zero-variance signal");
            RunWarning::DegenerateRegion { label: labels[c] }
        })
        .collect();

    Ok(Extraction {
        series: RegionTimeSeries::new(signals, labels)?,
        warnings,
    })
}

/// Standardize every column in place (population standard deviation)
///
/// Returns the indices of degenerate columns, which are set to zero.
pub fn standardize_columns(signals: &mut Array2<f64>, variance_epsilon: f64) -> Vec<usize> {
    let mut degenerate = Vec::new();
    for (c, column) in signals.axis_iter_mut(Axis(1)).enumerate() {
        if !standardize_series(column, variance_epsilon) {
            degenerate.push(c);
        }
    }
    degenerate
}

fn is_constant(series: ArrayView1<f64>) -> bool {
    let mut values = series.iter();
    match values.next() {
        Some(&first) => values.all(|&v| v == first),
        None => true,
    }
}

/// Returns false (and zero-fills) when the series cannot be standardized
fn standardize_series(mut series: ArrayViewMut1<f64>, variance_epsilon: f64) -> bool {
    let n = series.len();
    if n == 0 {
        return true;
    }

    // An exactly constant series can leave a rounding residue in the
    // variance, so test for it directly.
    let constant = is_constant(series.view());

    let mean = series.sum() / n as f64;
    let variance = series.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
    let std = variance.sqrt();

    if constant || !std.is_finite() || std <= variance_epsilon {
        series.fill(0.0);
        return false;
    }

    series.mapv_inplace(|v| (v - mean) / std);
    true
}
