//! Pearson correlation between region time series
//!
//! Correlations use population normalization: for standardized columns
//! z_i, z_j of length T, r_ij = sum_t z_i(t) z_j(t) / T. Only the upper
//! triangle is computed and then mirrored, so the result is exactly
//! symmetric. Regions whose standardized series is all zeros (constant
//! signal) get a zero row, column and diagonal. Correlation with a constant
//! is undefined, and zero keeps the matrix finite.

use ndarray::Array2;

use crate::masker::{standardize_columns, RegionTimeSeries};

/// Correlation parameters
#[derive(Debug, Clone)]
pub struct ConnectivityParams {
    /// The input columns are already standardized (the default masker
    /// output). When false the computer standardizes a copy first.
    pub assume_standardized: bool,
}

impl Default for ConnectivityParams {
    fn default() -> Self {
        Self {
            assume_standardized: true,
        }
    }
}

/// Symmetric P x P correlation matrix, rows/columns in ascending label order
#[derive(Debug, Clone)]
pub struct ConnectivityMatrix {
    values: Array2<f64>,
    labels: Vec<i64>,
}

impl ConnectivityMatrix {
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    pub fn n_regions(&self) -> usize {
        self.labels.len()
    }
}

/// Compute the region-by-region correlation matrix
pub fn compute_connectivity(
    series: &RegionTimeSeries,
    params: &ConnectivityParams,
) -> ConnectivityMatrix {
    let restandardized;
    let z = if params.assume_standardized {
        series.signals()
    } else {
        let mut copy = series.signals().clone();
        standardize_columns(&mut copy, 0.0);
        restandardized = copy;
        &restandardized
    };

    let (nt, p) = z.dim();
    let degenerate: Vec<bool> = z
        .columns()
        .into_iter()
        .map(|col| col.iter().all(|&v| v == 0.0))
        .collect();

    let mut values = Array2::<f64>::zeros((p, p));
    for i in 0..p {
        if degenerate[i] {
            continue;
        }
        values[[i, i]] = 1.0;
        let zi = z.column(i);
        for j in (i + 1)..p {
            if degenerate[j] {
                continue;
            }
            let r = (zi.dot(&z.column(j)) / nt as f64).clamp(-1.0, 1.0);
            values[[i, j]] = r;
            values[[j, i]] = r;
        }
    }

    ConnectivityMatrix {
        values,
        labels: series.labels().to_vec(),
    }
}
