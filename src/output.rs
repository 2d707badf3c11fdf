//! Output persistence
//!
//! Writes the connectivity matrix (`.npy`) and both plots (`.png`) into an
//! existing directory. Either all three files end up in place or none do.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConnectivityError, Result};

/// Paths of the three artifacts of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub corr_mat: PathBuf,
    pub carpet_plot: PathBuf,
    pub matrix_plot: PathBuf,
}

impl OutputPaths {
    /// `{base}_conn_mat.npy`, `{base}_carpet_plot.png`, `{base}_matrix_plot.png`
    pub fn new(output_dir: &Path, base: &str) -> Self {
        Self {
            corr_mat: output_dir.join(format!("{}_conn_mat.npy", base)),
            carpet_plot: output_dir.join(format!("{}_carpet_plot.png", base)),
            matrix_plot: output_dir.join(format!("{}_matrix_plot.png", base)),
        }
    }
}

/// File name without directory and without its NIfTI extension
///
/// `.nii.gz` is stripped as a whole; otherwise only the last extension.
pub fn base_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if let Some(stem) = name.strip_suffix(".nii.gz") {
        return stem.to_string();
    }
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[..idx].to_string(),
        _ => name,
    }
}

/// Encoded payloads of one run
pub struct OutputPayloads {
    pub corr_mat: Vec<u8>,
    pub carpet_plot: Vec<u8>,
    pub matrix_plot: Vec<u8>,
}

/// Write all payloads into `output_dir`; the directory is never created
///
/// All three payloads are staged as hidden temporary siblings first, and
/// targets occupied by a directory are rejected, before any existing output
/// is replaced. Only then are the temporaries renamed into place. On
/// failure every temporary and every file renamed by this call is removed.
pub fn write_outputs(
    output_dir: &Path,
    base: &str,
    payloads: &OutputPayloads,
) -> Result<OutputPaths> {
    check_output_dir(output_dir)?;

    let paths = OutputPaths::new(output_dir, base);
    let jobs: [(&Path, &[u8]); 3] = [
        (paths.corr_mat.as_path(), payloads.corr_mat.as_slice()),
        (paths.carpet_plot.as_path(), payloads.carpet_plot.as_slice()),
        (paths.matrix_plot.as_path(), payloads.matrix_plot.as_slice()),
    ];

    let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(jobs.len());
    for (target, bytes) in jobs {
        match stage(target, bytes) {
            Ok(tmp) => staged.push((tmp, target)),
            Err(e) => {
                discard(&staged);
                return Err(e);
            }
        }
    }

    for (_, target) in &staged {
        if target.is_dir() {
            discard(&staged);
            return Err(ConnectivityError::output(*target, "target is a directory"));
        }
    }

    let mut committed: Vec<&Path> = Vec::with_capacity(staged.len());
    for (k, (tmp, target)) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(tmp, target) {
            discard(&staged[k..]);
            for done in &committed {
                fs::remove_file(done).ok();
            }
            return Err(ConnectivityError::output(*target, e.to_string()));
        }
        debug!(path = %target.display(), "wrote output");
        committed.push(*target);
    }

    Ok(paths)
}

fn check_output_dir(output_dir: &Path) -> Result<()> {
    let meta = fs::metadata(output_dir).map_err(|e| {
        ConnectivityError::output(output_dir, format!("output directory unavailable: {}", e))
    })?;
    if !meta.is_dir() {
        return Err(ConnectivityError::output(output_dir, "not a directory"));
    }
    if meta.permissions().readonly() {
        return Err(ConnectivityError::output(output_dir, "directory is read-only"));
    }
    Ok(())
}

fn temp_path(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.tmp", file_name))
}

/// Write `bytes` to the hidden temporary sibling of `target`
fn stage(target: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let tmp = temp_path(target);

    let result = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()
    })();

    match result {
        Ok(()) => {
            debug!(path = %tmp.display(), bytes = bytes.len(), "staged output");
            Ok(tmp)
        }
        Err(e) => {
            fs::remove_file(&tmp).ok();
            Err(ConnectivityError::output(target, e.to_string()))
        }
    }
}

fn discard(staged: &[(PathBuf, &Path)]) {
    for (tmp, _) in staged {
        fs::remove_file(tmp).ok();
    }
}
