//! Diagnostic heatmaps
//!
//! - `carpet`: region-by-time signal heatmap
//! - `matrix`: region-by-region correlation heatmap
//! - `colormap`: fixed color mappings shared by both
//!
//! Every cell of a heatmap is a solid block of pixels, so image dimensions
//! are the grid dimensions times the cell size.

pub mod carpet;
pub mod colormap;
pub mod matrix;

pub use carpet::{render_carpet_plot, CarpetParams};
pub use matrix::{render_matrix_plot, MatrixPlotParams};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};

use crate::error::{ConnectivityError, Result};

/// Paint a grid of `n_cols` x `n_rows` cells, `color(col, row)` per cell
pub(crate) fn paint_grid<F>(
    n_cols: usize,
    n_rows: usize,
    cell_width: u32,
    cell_height: u32,
    color: F,
) -> RgbImage
where
    F: Fn(usize, usize) -> Rgb<u8>,
{
    let cw = cell_width.max(1);
    let ch = cell_height.max(1);
    let width = n_cols as u32 * cw;
    let height = n_rows as u32 * ch;
    RgbImage::from_fn(width, height, |x, y| color((x / cw) as usize, (y / ch) as usize))
}

/// Encode an RGB raster as PNG bytes
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| ConnectivityError::encode(format!("PNG encoding failed: {}", e)))?;
    Ok(buffer)
}
