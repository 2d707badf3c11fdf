//! Fixed color mappings

use image::Rgb;

/// Diverging red-blue anchors, blue at the low end and red at the high end
const RDBU_R: [[u8; 3]; 11] = [
    [5, 48, 97],
    [33, 102, 172],
    [67, 147, 195],
    [146, 197, 222],
    [209, 229, 240],
    [247, 247, 247],
    [253, 219, 199],
    [244, 165, 130],
    [214, 96, 77],
    [178, 24, 43],
    [103, 0, 31],
];

/// Color for non-finite values
pub const MISSING: Rgb<u8> = Rgb([0, 0, 0]);

/// Map `value` in [vmin, vmax] onto the diverging palette
///
/// Values outside the range are clamped; non-finite values map to
/// [`MISSING`].
pub fn diverging(value: f64, vmin: f64, vmax: f64) -> Rgb<u8> {
    if !value.is_finite() {
        return MISSING;
    }
    let span = vmax - vmin;
    let frac = if span > 0.0 {
        ((value - vmin) / span).clamp(0.0, 1.0)
    } else {
        0.5
    };

    let pos = frac * (RDBU_R.len() - 1) as f64;
    let lo = (pos.floor() as usize).min(RDBU_R.len() - 2);
    let w = pos - lo as f64;
    let (a, b) = (RDBU_R[lo], RDBU_R[lo + 1]);
    let mix = |i: usize| (a[i] as f64 + (b[i] as f64 - a[i] as f64) * w).round() as u8;
    Rgb([mix(0), mix(1), mix(2)])
}

/// Map `value` onto black..white over [-limit, limit]
///
/// A zero limit renders everything mid-gray.
pub fn grayscale_symmetric(value: f64, limit: f64) -> Rgb<u8> {
    if !value.is_finite() {
        return MISSING;
    }
    if !(limit > 0.0) {
        return Rgb([128, 128, 128]);
    }
    let frac = ((value + limit) / (2.0 * limit)).clamp(0.0, 1.0);
    let level = (frac * 255.0).round() as u8;
    Rgb([level, level, level])
}
