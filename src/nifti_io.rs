//! NIfTI file I/O
//!
//! Loads 3D and 4D NIfTI-1 volumes (`.nii` and `.nii.gz`, gzip is
//! auto-detected) into flat Fortran-ordered buffers, and writes them back
//! as float32 NIfTI-1 single files.

use std::io::{Cursor, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use nifti::volume::ndarray::IntoNdArray;
use nifti::{InMemNiftiObject, NiftiHeader, NiftiObject};

use crate::error::{ConnectivityError, Result};

/// NIfTI data loaded from bytes
pub struct NiftiData {
    /// Volume data as f64, index = x + y*nx + z*nx*ny + t*nx*ny*nz
    pub data: Vec<f64>,
    /// Dimensions (nx, ny, nz, nt); nt is 1 for 3D volumes
    pub dims: (usize, usize, usize, usize),
    /// Number of dimensions declared by the header
    pub ndim: usize,
    /// Voxel sizes in mm
    pub voxel_size: (f64, f64, f64),
    /// Affine transformation matrix (4x4, row-major)
    pub affine: [f64; 16],
}

impl NiftiData {
    /// Number of voxels in one 3D frame
    pub fn n_voxels(&self) -> usize {
        self.dims.0 * self.dims.1 * self.dims.2
    }
}

/// Check if bytes are gzip compressed
fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

/// Get header info for diagnostics
fn get_header_info(bytes: &[u8]) -> String {
    if bytes.len() < 348 {
        return format!("File too small ({} bytes, need at least 348)", bytes.len());
    }

    let sizeof_hdr = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let magic = String::from_utf8_lossy(&bytes[344..348]).to_string();
    let ndim = i16::from_le_bytes([bytes[40], bytes[41]]);
    let datatype = i16::from_le_bytes([bytes[70], bytes[71]]);

    format!(
        "sizeof_hdr={}, magic='{}', ndim={}, datatype={}",
        sizeof_hdr, magic, ndim, datatype
    )
}

/// Load a NIfTI volume from bytes
///
/// 3D volumes come back with `nt == 1`. Volumes with more than four
/// dimensions are accepted only when the extra dimensions are singleton.
pub fn load_nifti(bytes: &[u8]) -> std::result::Result<NiftiData, String> {
    let obj: InMemNiftiObject = if is_gzip(bytes) {
        let decoder = GzDecoder::new(Cursor::new(bytes));
        InMemNiftiObject::from_reader(decoder).map_err(|e| {
            let mut decompressed = Vec::new();
            let info = if GzDecoder::new(Cursor::new(bytes))
                .read_to_end(&mut decompressed)
                .is_ok()
            {
                get_header_info(&decompressed)
            } else {
                "Could not decompress".to_string()
            };
            format!("Failed to read gzipped NIfTI: {} ({})", e, info)
        })?
    } else {
        let info = get_header_info(bytes);
        InMemNiftiObject::from_reader(Cursor::new(bytes))
            .map_err(|e| format!("Failed to read NIfTI: {} ({})", e, info))?
    };

    let header = obj.header();
    let ndim = header.dim[0] as usize;
    if ndim < 3 {
        return Err(format!("Expected at least 3D volume, got {}D", ndim));
    }

    let pixdim = header.pixdim;
    let voxel_size = (pixdim[1] as f64, pixdim[2] as f64, pixdim[3] as f64);
    let affine = get_affine(header);

    // into_ndarray applies scl_slope / scl_inter
    let array = obj
        .into_volume()
        .into_ndarray::<f64>()
        .map_err(|e| format!("Failed to convert to ndarray: {}", e))?;

    let shape = array.shape().to_vec();
    if shape.len() < 3 {
        return Err(format!("Expected at least 3D array, got {}D", shape.len()));
    }
    if shape.len() > 4 && shape[4..].iter().any(|&d| d != 1) {
        return Err(format!(
            "Unsupported {}D volume with shape {:?}",
            shape.len(),
            shape
        ));
    }

    // Use the actual array shape (nifti-rs may drop trailing singleton dims)
    let (nx, ny, nz) = (shape[0], shape[1], shape[2]);
    let nt = if shape.len() >= 4 { shape[3] } else { 1 };
    let array = array.into_shape((nx, ny, nz, nt)).map_err(|e| {
        format!("Failed to reshape volume {:?}: {}", shape, e)
    })?;

    // Fortran order: x varies fastest, time slowest
    let mut data = Vec::with_capacity(nx * ny * nz * nt);
    for t in 0..nt {
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    data.push(array[[i, j, k, t]]);
                }
            }
        }
    }

    Ok(NiftiData {
        data,
        dims: (nx, ny, nz, nt),
        ndim,
        voxel_size,
        affine,
    })
}

/// Get affine transformation matrix from header
///
/// sform when `sform_code > 0`, else qform when `qform_code > 0`, else a
/// pixdim-scaled identity.
fn get_affine(header: &NiftiHeader) -> [f64; 16] {
    if header.sform_code > 0 {
        let s = &header.srow_x;
        let t = &header.srow_y;
        let u = &header.srow_z;
        [
            s[0] as f64, s[1] as f64, s[2] as f64, s[3] as f64,
            t[0] as f64, t[1] as f64, t[2] as f64, t[3] as f64,
            u[0] as f64, u[1] as f64, u[2] as f64, u[3] as f64,
            0.0, 0.0, 0.0, 1.0,
        ]
    } else if header.qform_code > 0 {
        qform_affine(header)
    } else {
        // Fall back to identity with voxel scaling
        let vsx = header.pixdim[1] as f64;
        let vsy = header.pixdim[2] as f64;
        let vsz = header.pixdim[3] as f64;
        [
            vsx, 0.0, 0.0, 0.0,
            0.0, vsy, 0.0, 0.0,
            0.0, 0.0, vsz, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]
    }
}

/// Rotation from the quaternion (b, c, d), scaled by pixdim, plus qoffset
#[allow(clippy::many_single_char_names)]
fn qform_affine(header: &NiftiHeader) -> [f64; 16] {
    let b = header.quatern_b as f64;
    let c = header.quatern_c as f64;
    let d = header.quatern_d as f64;
    let a = (1.0 - b * b - c * c - d * d).max(0.0).sqrt();

    // pixdim[0] carries qfac, the handedness of the k axis
    let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
    let i = (header.pixdim[1] as f64).abs();
    let j = header.pixdim[2] as f64;
    let k = header.pixdim[3] as f64 * qfac;

    [
        (a * a + b * b - c * c - d * d) * i,
        2.0 * (b * c - a * d) * j,
        2.0 * (b * d + a * c) * k,
        header.quatern_x as f64,
        2.0 * (b * c + a * d) * i,
        (a * a - b * b + c * c - d * d) * j,
        2.0 * (c * d - a * b) * k,
        header.quatern_y as f64,
        2.0 * (b * d - a * c) * i,
        2.0 * (c * d + a * b) * j,
        (a * a - b * b - c * c + d * d) * k,
        header.quatern_z as f64,
        0.0, 0.0, 0.0, 1.0,
    ]
}

/// Save data as NIfTI bytes
///
/// Writes an uncompressed float32 .nii file. `dims.3 == 1` produces a 3D
/// header, anything larger a 4D one.
pub fn save_nifti(
    data: &[f64],
    dims: (usize, usize, usize, usize),
    voxel_size: (f64, f64, f64),
    affine: &[f64; 16],
) -> std::result::Result<Vec<u8>, String> {
    let (nx, ny, nz, nt) = dims;
    let (vsx, vsy, vsz) = voxel_size;

    let expected = nx * ny * nz * nt;
    if data.len() != expected {
        return Err(format!(
            "Data length {} does not match dims {:?} ({} values)",
            data.len(),
            dims,
            expected
        ));
    }
    let to_i16 = |d: usize| {
        i16::try_from(d).map_err(|_| format!("Dimension {} exceeds NIfTI-1 limit", d))
    };

    // NIfTI-1 header (348 bytes)
    let mut header = [0u8; 348];
    header[0..4].copy_from_slice(&348i32.to_le_bytes());

    let ndim: i16 = if nt > 1 { 4 } else { 3 };
    let dim: [i16; 8] = [ndim, to_i16(nx)?, to_i16(ny)?, to_i16(nz)?, to_i16(nt)?, 1, 1, 1];
    for (i, &d) in dim.iter().enumerate() {
        let offset = 40 + i * 2;
        header[offset..offset + 2].copy_from_slice(&d.to_le_bytes());
    }

    // datatype = 16 (FLOAT32), bitpix = 32
    header[70..72].copy_from_slice(&16i16.to_le_bytes());
    header[72..74].copy_from_slice(&32i16.to_le_bytes());

    let pixdim: [f32; 8] = [1.0, vsx as f32, vsy as f32, vsz as f32, 1.0, 1.0, 1.0, 1.0];
    for (i, &p) in pixdim.iter().enumerate() {
        let offset = 76 + i * 4;
        header[offset..offset + 4].copy_from_slice(&p.to_le_bytes());
    }

    // vox_offset = 352 (header + 4 bytes extension)
    header[108..112].copy_from_slice(&352.0f32.to_le_bytes());
    header[112..116].copy_from_slice(&1.0f32.to_le_bytes());
    header[116..120].copy_from_slice(&0.0f32.to_le_bytes());

    // sform_code = 1 (scanner anat)
    header[254..256].copy_from_slice(&1i16.to_le_bytes());
    for row in 0..3 {
        for col in 0..4 {
            let offset = 280 + row * 16 + col * 4;
            header[offset..offset + 4]
                .copy_from_slice(&(affine[row * 4 + col] as f32).to_le_bytes());
        }
    }

    header[344..348].copy_from_slice(b"n+1\0");

    let mut buffer = Vec::with_capacity(352 + data.len() * 4);
    buffer
        .write_all(&header)
        .map_err(|e| format!("Write header failed: {}", e))?;
    buffer
        .write_all(&[0u8; 4])
        .map_err(|e| format!("Write extension failed: {}", e))?;
    for &val in data {
        buffer
            .write_all(&(val as f32).to_le_bytes())
            .map_err(|e| format!("Write data failed: {}", e))?;
    }

    Ok(buffer)
}

/// Save data as gzipped NIfTI bytes (.nii.gz)
pub fn save_nifti_gz(
    data: &[f64],
    dims: (usize, usize, usize, usize),
    voxel_size: (f64, f64, f64),
    affine: &[f64; 16],
) -> std::result::Result<Vec<u8>, String> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let uncompressed = save_nifti(data, dims, voxel_size, affine)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&uncompressed)
        .map_err(|e| format!("Gzip compression failed: {}", e))?;
    encoder
        .finish()
        .map_err(|e| format!("Gzip finish failed: {}", e))
}

/// Read a NIfTI file from a filesystem path
///
/// A missing or unreadable file is `InputNotFound`; a readable file that
/// does not decode is `InvalidInput`.
pub fn read_nifti_file(path: &Path) -> Result<NiftiData> {
    let bytes = std::fs::read(path)
        .map_err(|e| ConnectivityError::input_not_found(path, e.to_string()))?;
    load_nifti(&bytes).map_err(|msg| ConnectivityError::invalid_input(path, msg))
}

/// Save NIfTI data to a file
///
/// If the path ends with .nii.gz, the file is gzip compressed.
/// Otherwise it is saved as uncompressed .nii.
pub fn save_nifti_to_file(
    path: &Path,
    data: &[f64],
    dims: (usize, usize, usize, usize),
    voxel_size: (f64, f64, f64),
    affine: &[f64; 16],
) -> Result<()> {
    let bytes = if path.to_string_lossy().ends_with(".nii.gz") {
        save_nifti_gz(data, dims, voxel_size, affine)
    } else {
        save_nifti(data, dims, voxel_size, affine)
    }
    .map_err(|msg| ConnectivityError::output(path, msg))?;

    std::fs::write(path, &bytes).map_err(|e| ConnectivityError::output(path, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: [f64; 16] = [
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ];

    #[test]
    fn test_affine_identity() {
        let mut header = NiftiHeader::default();
        header.pixdim[1] = 1.0;
        header.pixdim[2] = 2.0;
        header.pixdim[3] = 3.0;
        header.sform_code = 0;
        header.qform_code = 0;
        header.quatern_x = 99.0;

        let affine = get_affine(&header);
        assert_eq!(affine[0], 1.0);
        assert_eq!(affine[5], 2.0);
        assert_eq!(affine[10], 3.0);
        assert_eq!(affine[3], 0.0);
    }

    fn assert_affine_close(actual: &[f64; 16], expected: &[f64; 16]) {
        for i in 0..16 {
            assert!(
                (actual[i] - expected[i]).abs() < 1e-6,
                "Affine[{}] mismatch: expected {}, got {}",
                i, expected[i], actual[i]
            );
        }
    }

    #[test]
    fn test_affine_qform_offset() {
        let mut header = NiftiHeader::default();
        header.sform_code = 0;
        header.qform_code = 1;
        header.pixdim = [1.0, 2.0, 2.0, 2.5, 1.0, 1.0, 1.0, 1.0];
        header.quatern_x = 50.0;
        header.quatern_y = -20.0;
        header.quatern_z = 7.5;

        assert_affine_close(
            &get_affine(&header),
            &[
                2.0, 0.0, 0.0, 50.0,
                0.0, 2.0, 0.0, -20.0,
                0.0, 0.0, 2.5, 7.5,
                0.0, 0.0, 0.0, 1.0,
            ],
        );
    }

    #[test]
    fn test_affine_qform_rotation_and_qfac() {
        let mut header = NiftiHeader::default();
        header.sform_code = 0;
        header.qform_code = 1;
        // 90 degrees about z
        header.quatern_d = std::f32::consts::FRAC_1_SQRT_2;
        header.pixdim = [-1.0, 2.0, 3.0, 4.0, 1.0, 1.0, 1.0, 1.0];

        assert_affine_close(
            &get_affine(&header),
            &[
                0.0, -3.0, 0.0, 0.0,
                2.0, 0.0, 0.0, 0.0,
                0.0, 0.0, -4.0, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ],
        );
    }

    #[test]
    fn test_sform_wins_over_qform() {
        let mut header = NiftiHeader::default();
        header.sform_code = 1;
        header.qform_code = 1;
        header.srow_x = [1.0, 0.0, 0.0, -10.0];
        header.srow_y = [0.0, 1.0, 0.0, 0.0];
        header.srow_z = [0.0, 0.0, 1.0, 0.0];
        header.quatern_x = 40.0;

        assert_eq!(get_affine(&header)[3], -10.0);
    }

    #[test]
    fn test_qform_only_file_affine() {
        let dims = (2, 2, 1, 3);
        let data = vec![1.0; 12];
        let mut bytes = save_nifti(&data, dims, (2.0, 2.0, 2.0), &IDENTITY).unwrap();
        // qform_code = 1, sform_code = 0, qoffset = (50, 0, -4)
        bytes[252..254].copy_from_slice(&1i16.to_le_bytes());
        bytes[254..256].copy_from_slice(&0i16.to_le_bytes());
        bytes[268..272].copy_from_slice(&50.0f32.to_le_bytes());
        bytes[276..280].copy_from_slice(&(-4.0f32).to_le_bytes());

        let loaded = load_nifti(&bytes).unwrap();
        assert_affine_close(
            &loaded.affine,
            &[
                2.0, 0.0, 0.0, 50.0,
                0.0, 2.0, 0.0, 0.0,
                0.0, 0.0, 2.0, -4.0,
                0.0, 0.0, 0.0, 1.0,
            ],
        );
    }

    #[test]
    fn test_affine_sform() {
        let mut header = NiftiHeader::default();
        header.sform_code = 1;
        header.srow_x = [1.0, 0.0, 0.0, 10.0];
        header.srow_y = [0.0, 2.0, 0.0, 20.0];
        header.srow_z = [0.0, 0.0, 3.0, 30.0];

        let affine = get_affine(&header);
        assert_eq!(affine[3], 10.0);
        assert_eq!(affine[5], 2.0);
        assert_eq!(affine[11], 30.0);
        assert_eq!(affine[15], 1.0);
    }

    #[test]
    fn test_gzip_detection() {
        assert!(is_gzip(&[0x1f, 0x8b, 0x00]));
        assert!(!is_gzip(&[0x00, 0x00, 0x00]));
        assert!(!is_gzip(&[0x1f]));
    }

    #[test]
    fn test_save_nifti_4d_header() {
        let dims = (2, 2, 2, 5);
        let data = vec![0.0; 40];
        let bytes = save_nifti(&data, dims, (1.0, 1.0, 1.0), &IDENTITY).unwrap();

        assert_eq!(bytes.len(), 352 + 40 * 4);
        assert_eq!(&bytes[344..348], b"n+1\0");
        let ndim = i16::from_le_bytes([bytes[40], bytes[41]]);
        assert_eq!(ndim, 4);
        let nt = i16::from_le_bytes([bytes[48], bytes[49]]);
        assert_eq!(nt, 5);
    }

    #[test]
    fn test_save_nifti_rejects_wrong_length() {
        let result = save_nifti(&[0.0; 7], (2, 2, 2, 1), (1.0, 1.0, 1.0), &IDENTITY);
        assert!(result.is_err());
    }

    #[test]
    fn test_4d_roundtrip_preserves_fortran_order() {
        let dims = (3, 2, 2, 4);
        let n = dims.0 * dims.1 * dims.2 * dims.3;
        let data: Vec<f64> = (0..n).map(|i| i as f64 * 0.25).collect();

        let bytes = save_nifti(&data, dims, (2.0, 2.0, 2.0), &IDENTITY).unwrap();
        let loaded = load_nifti(&bytes).unwrap();

        assert_eq!(loaded.dims, dims);
        assert_eq!(loaded.ndim, 4);
        assert_eq!(loaded.n_voxels(), 12);
        for i in 0..n {
            assert!(
                (loaded.data[i] - data[i]).abs() < 1e-5,
                "Mismatch at {}: expected {}, got {}",
                i, data[i], loaded.data[i]
            );
        }
    }

    #[test]
    fn test_3d_loads_with_single_timepoint() {
        let dims = (4, 4, 4, 1);
        let data: Vec<f64> = (0..64).map(|i| (i % 3) as f64).collect();
        let bytes = save_nifti_gz(&data, dims, (1.0, 1.0, 1.0), &IDENTITY).unwrap();
        assert!(is_gzip(&bytes));

        let loaded = load_nifti(&bytes).unwrap();
        assert_eq!(loaded.dims, dims);
        assert_eq!(loaded.ndim, 3);
        assert_eq!(loaded.data, data);
    }

    #[test]
    fn test_file_roundtrip_affine() {
        let dims = (4, 4, 4, 2);
        let n = dims.0 * dims.1 * dims.2 * dims.3;
        let affine = [
            1.0, 0.1, 0.2, 10.0,
            0.3, 2.0, 0.4, 20.0,
            0.5, 0.6, 3.0, 30.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        let data: Vec<f64> = (0..n).map(|i| i as f64).collect();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("affine_rt.nii.gz");
        save_nifti_to_file(&path, &data, dims, (1.0, 2.0, 3.0), &affine).unwrap();
        let loaded = read_nifti_file(&path).unwrap();

        for i in 0..16 {
            assert!(
                (loaded.affine[i] - affine[i]).abs() < 1e-5,
                "Affine[{}] mismatch: expected {}, got {}",
                i, affine[i], loaded.affine[i]
            );
        }
        assert!((loaded.voxel_size.2 - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_nifti_invalid_bytes() {
        assert!(load_nifti(&[0u8; 10]).is_err());
        assert!(load_nifti(&[0x1f, 0x8b, 0x00, 0x00, 0x00]).is_err());
    }

    #[test]
    fn test_get_header_info() {
        assert!(get_header_info(&[0u8; 10]).contains("too small"));

        let mut bytes = vec![0u8; 348];
        bytes[0..4].copy_from_slice(&348i32.to_le_bytes());
        bytes[40..42].copy_from_slice(&4i16.to_le_bytes());
        bytes[70..72].copy_from_slice(&16i16.to_le_bytes());
        let info = get_header_info(&bytes);
        assert!(info.contains("sizeof_hdr=348"));
        assert!(info.contains("ndim=4"));
        assert!(info.contains("datatype=16"));
    }

    #[test]
    fn test_read_missing_file_is_input_not_found() {
        let result = read_nifti_file(Path::new("/tmp/nonexistent_fc_core_12345.nii"));
        assert!(matches!(result, Err(ConnectivityError::InputNotFound { .. })));
    }

    #[test]
    fn test_read_garbage_file_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.nii");
        std::fs::write(&path, b"definitely not a nifti header").unwrap();
        let result = read_nifti_file(&path);
        assert!(matches!(result, Err(ConnectivityError::InvalidInput { .. })));
    }
}
