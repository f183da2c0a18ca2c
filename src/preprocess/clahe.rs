use ndarray::Array2;

use crate::imaging::{color_channels, FloatImage};

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a grid of tiles (tile side = dimension / `tiles`),
/// each tile gets its own clipped-histogram equalization map, and every pixel
/// blends the maps of the four nearest tile centers bilinearly.
#[derive(Debug, Clone)]
pub struct Clahe {
    clip_limit: f32,
    nbins: usize,
    tiles: usize,
}

impl Clahe {
    /// `clip_limit` is a fraction of the tile area in (0, 1]; callers validate it.
    pub fn new(clip_limit: f32, nbins: usize, tiles: usize) -> Self {
        Self {
            clip_limit,
            nbins: nbins.max(2),
            tiles: tiles.max(1),
        }
    }

    /// Equalize an image, rescaling the result to its own range.
    ///
    /// Gray images are equalized directly. Color images equalize the HSV value
    /// (max of the color channels) and scale the color channels by the same
    /// factor, which keeps hue and saturation. Alpha is left alone.
    pub fn apply(&self, image: &FloatImage) -> FloatImage {
        let _span = tracing::debug_span!("clahe", clip_limit = self.clip_limit).entered();

        let (height, width, _) = image.dim();
        let color = color_channels(image);

        let value = Array2::from_shape_fn((height, width), |(y, x)| {
            (0..color).fold(0.0f32, |v, c| v.max(image[[y, x, c]]))
        });
        let mut equalized = self.equalize_plane(&value);
        stretch(&mut equalized);

        let mut output = image.clone();
        for ((y, x), &target) in equalized.indexed_iter() {
            let current = value[[y, x]];
            if color == 1 {
                output[[y, x, 0]] = target;
            } else if current > f32::EPSILON {
                let scale = target / current;
                for c in 0..color {
                    output[[y, x, c]] = (image[[y, x, c]] * scale).clamp(0.0, 1.0);
                }
            } else {
                // Black has no hue; it maps to gray
                for c in 0..color {
                    output[[y, x, c]] = target;
                }
            }
        }

        output
    }

    fn equalize_plane(&self, plane: &Array2<f32>) -> Array2<f32> {
        let (height, width) = plane.dim();
        let tile_h = (height / self.tiles).max(1);
        let tile_w = (width / self.tiles).max(1);
        let rows = height.div_ceil(tile_h);
        let cols = width.div_ceil(tile_w);

        let bins = plane.mapv(|v| self.bin(v));

        let mut maps = Vec::with_capacity(rows * cols);
        for ty in 0..rows {
            for tx in 0..cols {
                let (y0, y1) = (ty * tile_h, ((ty + 1) * tile_h).min(height));
                let (x0, x1) = (tx * tile_w, ((tx + 1) * tile_w).min(width));

                let mut hist = vec![0usize; self.nbins];
                for y in y0..y1 {
                    for x in x0..x1 {
                        hist[bins[[y, x]]] += 1;
                    }
                }

                let area = (y1 - y0) * (x1 - x0);
                let clip = ((self.clip_limit * area as f32) as usize).max(1);
                clip_histogram(&mut hist, clip);
                maps.push(cumulative_map(&hist, area));
            }
        }

        let map = |ty: usize, tx: usize, bin: usize| maps[ty * cols + tx][bin];

        Array2::from_shape_fn((height, width), |(y, x)| {
            let (y_lo, y_hi, wy) = neighbours(y, tile_h, rows);
            let (x_lo, x_hi, wx) = neighbours(x, tile_w, cols);
            let bin = bins[[y, x]];

            let top = map(y_lo, x_lo, bin) * (1.0 - wx) + map(y_lo, x_hi, bin) * wx;
            let bottom = map(y_hi, x_lo, bin) * (1.0 - wx) + map(y_hi, x_hi, bin) * wx;
            (top * (1.0 - wy) + bottom * wy).clamp(0.0, 1.0)
        })
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn bin(&self, value: f32) -> usize {
        let top = (self.nbins - 1) as f32;
        ((value.clamp(0.0, 1.0) * top).round() as usize).min(self.nbins - 1)
    }
}

/// Two nearest tile indices along one axis and the weight of the second.
fn neighbours(position: usize, tile: usize, count: usize) -> (usize, usize, f32) {
    let last = (count - 1) as f32;
    let centered = ((position as f32 + 0.5) / tile as f32 - 0.5).clamp(0.0, last);
    let lo = centered.floor() as usize;
    let hi = (lo + 1).min(count - 1);
    (lo, hi, centered - lo as f32)
}

/// Clip every bin at `limit` and spread the excess evenly over all bins.
pub(crate) fn clip_histogram(hist: &mut [usize], limit: usize) {
    let excess: usize = hist.iter().map(|&count| count.saturating_sub(limit)).sum();
    if excess == 0 {
        return;
    }

    let increment = excess / hist.len();
    let remainder = excess % hist.len();
    for count in hist.iter_mut() {
        *count = (*count).min(limit) + increment;
    }

    if remainder > 0 {
        let step = (hist.len() / remainder).max(1);
        for count in hist.iter_mut().step_by(step).take(remainder) {
            *count += 1;
        }
    }
}

fn cumulative_map(hist: &[usize], area: usize) -> Vec<f32> {
    let mut total = 0usize;
    hist.iter()
        .map(|&count| {
            total += count;
            (total as f32 / area as f32).min(1.0)
        })
        .collect()
}

/// Linearly map the plane's min/max onto [0, 1]; flat planes are left as they are.
fn stretch(plane: &mut Array2<f32>) {
    let (min, max) = plane
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if max - min > f32::EPSILON {
        plane.mapv_inplace(|v| ((v - min) / (max - min)).clamp(0.0, 1.0));
    }
}
