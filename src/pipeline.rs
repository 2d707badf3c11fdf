//! Connectivity pipeline
//!
//! load -> extract region signals -> correlate -> render -> write.
//! Every stage runs to completion before the next starts; nothing is
//! written unless all stages up to the write succeed.

use std::time::Instant;

use image::RgbImage;
use tracing::{info, info_span};

use crate::config::ConnectivityConfig;
use crate::connectivity::{compute_connectivity, ConnectivityMatrix, ConnectivityParams};
use crate::error::{ConnectivityError, Result, RunWarning};
use crate::masker::{extract_region_signals, MaskerParams, RegionTimeSeries};
use crate::npy::encode_npy;
use crate::output::{base_name, write_outputs, OutputPaths, OutputPayloads};
use crate::plot::{encode_png, render_carpet_plot, render_matrix_plot};
use crate::volume::{FunctionalVolume, ParcellationAtlas};

/// In-memory result of the numeric stages
#[derive(Debug, Clone)]
pub struct ConnectivityAnalysis {
    pub series: RegionTimeSeries,
    pub matrix: ConnectivityMatrix,
    pub warnings: Vec<RunWarning>,
}

/// Outcome of a complete run
#[derive(Debug, Clone)]
pub struct ConnectivityRun {
    pub outputs: OutputPaths,
    pub labels: Vec<i64>,
    pub n_timepoints: usize,
    pub warnings: Vec<RunWarning>,
}

/// Extract region signals and correlate them
///
/// Takes the volume by value and drops it as soon as the region signals
/// exist.
pub fn analyze(
    volume: FunctionalVolume,
    atlas: &ParcellationAtlas,
    params: &MaskerParams,
) -> Result<ConnectivityAnalysis> {
    let extraction = extract_region_signals(&volume, atlas, params)?;
    drop(volume);

    let matrix = compute_connectivity(
        &extraction.series,
        &ConnectivityParams {
            assume_standardized: params.standardize,
        },
    );

    Ok(ConnectivityAnalysis {
        series: extraction.series,
        matrix,
        warnings: extraction.warnings,
    })
}

/// Run the whole pipeline for one configuration
pub fn run_connectivity(config: &ConnectivityConfig) -> Result<ConnectivityRun> {
    let span = info_span!("connectivity", input = %config.fmri_denoised.display());
    let _guard = span.enter();
    let start = Instant::now();

    let output_dir = config.validate()?;

    let volume = FunctionalVolume::load(&config.fmri_denoised)?;
    let atlas = ParcellationAtlas::load(&config.parcellation)?;
    let (nx, ny, nz, nt) = volume.dims();
    info!(nx, ny, nz, nt, "loaded functional volume");

    let analysis = analyze(volume, &atlas, &config.masker).map_err(|e| match e {
        ConnectivityError::InvalidInput { message, .. } => {
            ConnectivityError::invalid_input(&config.parcellation, message)
        }
        other => other,
    })?;
    info!(
        n_regions = analysis.series.n_regions(),
        n_degenerate = analysis.warnings.len(),
        "computed connectivity matrix"
    );

    let carpet = render_carpet_plot(&analysis.series, &config.carpet);
    let matrix_plot = render_matrix_plot(&analysis.matrix, &config.matrix_plot);
    let payloads = encode_payloads(&analysis.matrix, &carpet, &matrix_plot)?;

    let outputs = write_outputs(output_dir, &base_name(&config.fmri_denoised), &payloads)?;
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        corr_mat = %outputs.corr_mat.display(),
        "connectivity run finished"
    );

    Ok(ConnectivityRun {
        outputs,
        labels: analysis.matrix.labels().to_vec(),
        n_timepoints: analysis.series.n_timepoints(),
        warnings: analysis.warnings,
    })
}

fn encode_payloads(
    matrix: &ConnectivityMatrix,
    carpet: &RgbImage,
    matrix_plot: &RgbImage,
) -> Result<OutputPayloads> {
    Ok(OutputPayloads {
        corr_mat: encode_npy(matrix.values()),
        carpet_plot: encode_png(carpet)?,
        matrix_plot: encode_png(matrix_plot)?,
    })
}
