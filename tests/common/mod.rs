//! Common test utilities for fc-core integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use fc_core::nifti_io::save_nifti_to_file;

pub const AFFINE: [f64; 16] = [
    2.0, 0.0, 0.0, -90.0,
    0.0, 2.0, 0.0, -126.0,
    0.0, 0.0, 2.0, -72.0,
    0.0, 0.0, 0.0, 1.0,
];

/// Write a synthetic 4D volume, voxel value = f(x, y, z, t)
pub fn write_volume(
    dir: &Path,
    name: &str,
    dims: (usize, usize, usize, usize),
    f: impl Fn(usize, usize, usize, usize) -> f64,
) -> PathBuf {
    let (nx, ny, nz, nt) = dims;
    let mut data = Vec::with_capacity(nx * ny * nz * nt);
    for t in 0..nt {
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    data.push(f(i, j, k, t));
                }
            }
        }
    }
    let path = dir.join(name);
    save_nifti_to_file(&path, &data, dims, (2.0, 2.0, 2.0), &AFFINE).unwrap();
    path
}

/// Write a synthetic 3D atlas, label = f(x, y, z)
pub fn write_atlas(
    dir: &Path,
    name: &str,
    dims: (usize, usize, usize),
    f: impl Fn(usize, usize, usize) -> i64,
) -> PathBuf {
    write_atlas_with_affine(dir, name, dims, &AFFINE, f)
}

/// Write a synthetic 3D atlas with its own sform affine
pub fn write_atlas_with_affine(
    dir: &Path,
    name: &str,
    dims: (usize, usize, usize),
    affine: &[f64; 16],
    f: impl Fn(usize, usize, usize) -> i64,
) -> PathBuf {
    let (nx, ny, nz) = dims;
    let mut data = Vec::with_capacity(nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                data.push(f(i, j, k) as f64);
            }
        }
    }
    let path = dir.join(name);
    save_nifti_to_file(&path, &data, (nx, ny, nz, 1), (2.0, 2.0, 2.0), affine).unwrap();
    path
}

/// Rewrite an uncompressed .nii header so that only the qform is set
///
/// Identity rotation; with the 2mm pixdim the fixtures use, the resulting
/// affine is `AFFINE` with its translation replaced by `qoffset`.
pub fn make_qform_only(path: &Path, qoffset: (f32, f32, f32)) {
    assert!(path.to_string_lossy().ends_with(".nii"), "expected an uncompressed .nii");
    let mut bytes = fs::read(path).unwrap();
    bytes[252..254].copy_from_slice(&1i16.to_le_bytes());
    bytes[254..256].copy_from_slice(&0i16.to_le_bytes());
    for offset in (256..268).step_by(4) {
        bytes[offset..offset + 4].copy_from_slice(&0.0f32.to_le_bytes());
    }
    bytes[268..272].copy_from_slice(&qoffset.0.to_le_bytes());
    bytes[272..276].copy_from_slice(&qoffset.1.to_le_bytes());
    bytes[276..280].copy_from_slice(&qoffset.2.to_le_bytes());
    // scrub the sform rows so nothing can fall back to them
    for offset in (280..328).step_by(4) {
        bytes[offset..offset + 4].copy_from_slice(&0.0f32.to_le_bytes());
    }
    fs::write(path, bytes).unwrap();
}

/// Parse a 2D `<f8` .npy file into (shape, row-major data)
pub fn read_npy(path: &Path) -> ((usize, usize), Vec<f64>) {
    let bytes = fs::read(path).unwrap();
    assert_eq!(&bytes[..6], b"\x93NUMPY", "bad npy magic");
    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let header = std::str::from_utf8(&bytes[10..10 + header_len]).unwrap();
    assert!(header.contains("'descr': '<f8'"));
    assert!(header.contains("'fortran_order': False"));

    let start = header.find("'shape': (").unwrap() + "'shape': (".len();
    let end = start + header[start..].find(')').unwrap();
    let dims: Vec<usize> = header[start..end]
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().unwrap())
        .collect();
    assert_eq!(dims.len(), 2, "expected a 2D array, header {}", header);

    let data: Vec<f64> = bytes[10 + header_len..]
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
        .collect();
    assert_eq!(data.len(), dims[0] * dims[1]);
    ((dims[0], dims[1]), data)
}

/// Read PNG dimensions from the IHDR chunk
pub fn png_dimensions(path: &Path) -> (u32, u32) {
    let bytes = fs::read(path).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
    let width = u32::from_be_bytes(bytes[16..20].try_into().unwrap());
    let height = u32::from_be_bytes(bytes[20..24].try_into().unwrap());
    (width, height)
}

/// Sorted file names in a directory
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Pearson correlation coefficient
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let (mut sum_a, mut sum_b, mut sum_ab, mut sum_a2, mut sum_b2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (&x, &y) in a.iter().zip(b) {
        sum_a += x;
        sum_b += y;
        sum_ab += x * y;
        sum_a2 += x * x;
        sum_b2 += y * y;
    }

    let numerator = n * sum_ab - sum_a * sum_b;
    let denominator = ((n * sum_a2 - sum_a * sum_a) * (n * sum_b2 - sum_b * sum_b)).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}
