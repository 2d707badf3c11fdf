//! Carpet plot: time on the x axis, one row per region

use image::RgbImage;

use super::colormap::grayscale_symmetric;
use super::paint_grid;
use crate::masker::RegionTimeSeries;

/// Carpet plot geometry
#[derive(Debug, Clone)]
pub struct CarpetParams {
    /// Pixels per time point (default 2)
    pub cell_width: u32,
    /// Pixels per region (default 4)
    pub cell_height: u32,
}

impl Default for CarpetParams {
    fn default() -> Self {
        Self {
            cell_width: 2,
            cell_height: 4,
        }
    }
}

/// Render a (time x region) series as a grayscale heatmap
///
/// The gray scale spans [-m, m] where m is the largest observed absolute
/// value, so zero is always mid-gray. The first label is the top row.
pub fn render_carpet_plot(series: &RegionTimeSeries, params: &CarpetParams) -> RgbImage {
    let signals = series.signals();
    let limit = signals
        .iter()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));

    paint_grid(
        series.n_timepoints(),
        series.n_regions(),
        params.cell_width,
        params.cell_height,
        |t, region| grayscale_symmetric(signals[[t, region]], limit),
    )
}
