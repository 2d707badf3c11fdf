//! Connectivity matrix plot

use image::RgbImage;

use super::colormap::diverging;
use super::paint_grid;
use crate::connectivity::ConnectivityMatrix;

/// The color scale always spans the full correlation range so plots from
/// different runs share one scale
pub const CORRELATION_RANGE: (f64, f64) = (-1.0, 1.0);

/// Matrix plot geometry
#[derive(Debug, Clone)]
pub struct MatrixPlotParams {
    /// Pixels per matrix entry along each side (default 8)
    pub cell_size: u32,
}

impl Default for MatrixPlotParams {
    fn default() -> Self {
        Self { cell_size: 8 }
    }
}

/// Render a square heatmap of the correlation matrix
pub fn render_matrix_plot(matrix: &ConnectivityMatrix, params: &MatrixPlotParams) -> RgbImage {
    let values = matrix.values();
    let (vmin, vmax) = CORRELATION_RANGE;
    paint_grid(
        matrix.n_regions(),
        matrix.n_regions(),
        params.cell_size,
        params.cell_size,
        |col, row| diverging(values[[row, col]], vmin, vmax),
    )
}
