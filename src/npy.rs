//! NumPy `.npy` serialization for f64 matrices
//!
//! Writes format version 1.0: the `\x93NUMPY` magic, a little-endian u16
//! header length, an ASCII dict header padded with spaces to a 64-byte
//! boundary and terminated by `\n`, then little-endian f64 data in C order.

use ndarray::Array2;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const HEADER_ALIGN: usize = 64;

/// Encode a 2D f64 array as `.npy` bytes (`<f8`, C order)
pub fn encode_npy(array: &Array2<f64>) -> Vec<u8> {
    let (rows, cols) = array.dim();
    let dict = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': ({}, {}), }}",
        rows, cols
    );

    // magic(6) + version(2) + header_len(2) + dict + padding + '\n'
    let prefix = MAGIC.len() + 4;
    let unpadded = prefix + dict.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    let header_len = dict.len() + padding + 1;

    let mut bytes = Vec::with_capacity(prefix + header_len + rows * cols * 8);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&[1, 0]);
    bytes.extend_from_slice(&(header_len as u16).to_le_bytes());
    bytes.extend_from_slice(dict.as_bytes());
    bytes.extend(std::iter::repeat(b' ').take(padding));
    bytes.push(b'\n');

    // iter() walks in logical (row-major) order whatever the memory layout
    for &v in array.iter() {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}
