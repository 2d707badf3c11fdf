//! Command-line entry point
//!
//! ```bash
//! fc-connectivity --fmri-denoised sub-01_bold_denoised.nii.gz \
//!     --parcellation schaefer200.nii.gz --output-dir derivatives/
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fc_core::masker::MaskerParams;
use fc_core::plot::{CarpetParams, MatrixPlotParams};
use fc_core::{run_connectivity, ConnectivityConfig};

/// Compute a parcellation-based functional connectivity matrix
#[derive(Parser, Debug)]
#[command(name = "fc-connectivity", version, about)]
struct Cli {
    /// Denoised 4D functional volume (.nii or .nii.gz)
    #[arg(long)]
    fmri_denoised: PathBuf,

    /// 3D parcellation with integer labels, 0 = background
    #[arg(long)]
    parcellation: PathBuf,

    /// Existing output directory [default: current directory]
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Keep raw region averages instead of standardizing them
    #[arg(long)]
    no_standardize: bool,

    /// Carpet plot pixels per time point
    #[arg(long, default_value_t = CarpetParams::default().cell_width)]
    carpet_cell_width: u32,

    /// Carpet plot pixels per region
    #[arg(long, default_value_t = CarpetParams::default().cell_height)]
    carpet_cell_height: u32,

    /// Matrix plot pixels per entry
    #[arg(long, default_value_t = MatrixPlotParams::default().cell_size)]
    matrix_cell_size: u32,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_config(self) -> ConnectivityConfig {
        let output_dir = self.output_dir.unwrap_or_else(|| PathBuf::from("."));
        let mut config = ConnectivityConfig::new(self.fmri_denoised, self.parcellation)
            .with_output_dir(output_dir);
        config.masker = MaskerParams {
            standardize: !self.no_standardize,
            ..MaskerParams::default()
        };
        config.carpet = CarpetParams {
            cell_width: self.carpet_cell_width,
            cell_height: self.carpet_cell_height,
        };
        config.matrix_plot = MatrixPlotParams {
            cell_size: self.matrix_cell_size,
        };
        config
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run_connectivity(&cli.into_config()) {
        Ok(run) => {
            for warning in &run.warnings {
                eprintln!("warning: {}", warning);
            }
            println!("corr_mat: {}", run.outputs.corr_mat.display());
            println!("carpet_plot: {}", run.outputs.carpet_plot.display());
            println!("matrix_plot: {}", run.outputs.matrix_plot.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
