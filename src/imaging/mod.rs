//! Image representations and the conversions between them.

mod convert;
mod resize;

pub use convert::{
    decode, encode_png, normalize_layout, quantize, to_dynamic, to_float, validate_dimensions,
};
pub use resize::{parse_size, resize_dynamic, resize_float};

use ndarray::Array3;

/// Normalized float image in HWC layout (height, width, channels).
/// Values are in the [0, 1] range; channels are 1 (gray), 3 (RGB) or 4 (RGBA).
pub type FloatImage = Array3<f32>;

/// Number of leading channels that carry color, excluding a trailing alpha plane.
pub fn color_channels(image: &FloatImage) -> usize {
    match image.dim().2 {
        4 => 3,
        2 => 1,
        n => n,
    }
}

/// Mirror an index into `0..len` without repeating the edge sample
/// (`-1 -> 1`, `len -> len - 2`), bouncing as often as needed.
pub fn reflect(i: isize, len: usize) -> usize {
    let len = len as isize;
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let i = i.rem_euclid(period);
    (if i >= len { period - i } else { i }) as usize
}
