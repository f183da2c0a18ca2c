use ndarray::{Array2, Array3};

use crate::error::{Error, Result};
use crate::imaging::{color_channels, reflect, FloatImage};

/// How patch similarity is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NlMeansMode {
    /// Uniform patch weights, one summed-area table per displacement.
    #[default]
    Fast,
    /// Gaussian-weighted patches compared pixel pair by pixel pair.
    Exact,
}

/// Non-local means denoiser.
///
/// Each pixel becomes a weighted average of the pixels in its search window,
/// weighted by how similar the 5x5 patches around them are. Similarity is
/// measured jointly over all color channels; alpha is carried through.
#[derive(Debug, Clone)]
pub struct NlMeansDenoiser {
    h: f32,
    patch_size: usize,
    patch_distance: usize,
    mode: NlMeansMode,
}

impl Default for NlMeansDenoiser {
    fn default() -> Self {
        Self {
            h: 0.1,
            patch_size: 5,
            patch_distance: 8,
            mode: NlMeansMode::Fast,
        }
    }
}

impl NlMeansDenoiser {
    /// Create a denoiser.
    ///
    /// # Arguments
    /// * `h` - Cut-off distance, in (0, 1]. Higher smooths more.
    /// * `patch_size` - Odd side length of the compared patches
    /// * `patch_distance` - Search window radius in pixels
    pub fn new(h: f32, patch_size: usize, patch_distance: usize) -> Result<Self> {
        if !(h > 0.0 && h <= 1.0) {
            return Err(Error::invalid_parameter("h", format!("{h} is outside (0, 1]")));
        }
        if patch_size == 0 || patch_size % 2 == 0 {
            return Err(Error::invalid_parameter(
                "patch_size",
                format!("{patch_size} is not a positive odd number"),
            ));
        }

        Ok(Self {
            h,
            patch_size,
            patch_distance,
            ..Self::default()
        })
    }

    pub fn with_mode(mut self, mode: NlMeansMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> NlMeansMode {
        self.mode
    }

    /// Denoise a normalized image. The output has the input's shape and stays in [0, 1].
    pub fn denoise(&self, image: &FloatImage) -> FloatImage {
        let _span = tracing::debug_span!("denoise", mode = ?self.mode).entered();

        let (height, width, _) = image.dim();
        if height == 0 || width == 0 {
            return image.clone();
        }

        let (accum, weights) = match self.mode {
            NlMeansMode::Fast => self.accumulate_fast(image),
            NlMeansMode::Exact => self.accumulate_exact(image),
        };

        let mut output = image.clone();
        for ((y, x, c), value) in accum.indexed_iter() {
            let weight = weights[[y, x]];
            if weight > 0.0 {
                output[[y, x, c]] = (value / weight).clamp(0.0, 1.0);
            }
        }

        output
    }

    fn weight(&self, distance: f32) -> f32 {
        (-distance.max(0.0) / (self.h * self.h)).exp()
    }

    /// Darbon et al.: for each displacement, sum squared differences over a
    /// summed-area table so every patch distance costs four lookups.
    fn accumulate_fast(&self, image: &FloatImage) -> (Array3<f32>, Array2<f32>) {
        let (height, width, _) = image.dim();
        let color = color_channels(image);
        let half = self.patch_size / 2;
        let reach = self.patch_distance as isize;
        let rows = ReflectTable::new(height, half + self.patch_distance);
        let cols = ReflectTable::new(width, half + self.patch_distance);
        let norm = (color * self.patch_size * self.patch_size) as f64;

        let padded_h = height + 2 * half;
        let padded_w = width + 2 * half;
        let mut integral = Array2::<f64>::zeros((padded_h + 1, padded_w + 1));

        let mut accum = Array3::<f32>::zeros((height, width, color));
        let mut weights = Array2::<f32>::zeros((height, width));

        for dy in -reach..=reach {
            for dx in -reach..=reach {
                // Summed-area table of the squared difference between the image
                // and its displaced copy, over the patch-padded domain
                for py in 0..padded_h {
                    let y = py as isize - half as isize;
                    let (ya, yb) = (rows.get(y), rows.get(y + dy));
                    let mut row_sum = 0.0f64;
                    for px in 0..padded_w {
                        let x = px as isize - half as isize;
                        let (xa, xb) = (cols.get(x), cols.get(x + dx));
                        let mut diff = 0.0f32;
                        for c in 0..color {
                            let d = image[[ya, xa, c]] - image[[yb, xb, c]];
                            diff += d * d;
                        }
                        row_sum += f64::from(diff);
                        integral[[py + 1, px + 1]] = integral[[py, px + 1]] + row_sum;
                    }
                }

                let size = self.patch_size;
                for y in 0..height {
                    let yb = rows.get(y as isize + dy);
                    for x in 0..width {
                        let patch = integral[[y + size, x + size]] - integral[[y, x + size]]
                            - integral[[y + size, x]]
                            + integral[[y, x]];
                        let weight = self.weight((patch / norm) as f32);
                        if weight == 0.0 {
                            continue;
                        }

                        let xb = cols.get(x as isize + dx);
                        weights[[y, x]] += weight;
                        for c in 0..color {
                            accum[[y, x, c]] += weight * image[[yb, xb, c]];
                        }
                    }
                }
            }
        }

        (accum, weights)
    }

    fn accumulate_exact(&self, image: &FloatImage) -> (Array3<f32>, Array2<f32>) {
        let (height, width, _) = image.dim();
        let color = color_channels(image);
        let half = (self.patch_size / 2) as isize;
        let reach = self.patch_distance as isize;
        let rows = ReflectTable::new(height, half as usize + self.patch_distance);
        let cols = ReflectTable::new(width, half as usize + self.patch_distance);
        let kernel = patch_kernel(self.patch_size);

        let mut accum = Array3::<f32>::zeros((height, width, color));
        let mut weights = Array2::<f32>::zeros((height, width));

        for y in 0..height as isize {
            for x in 0..width as isize {
                for dy in -reach..=reach {
                    for dx in -reach..=reach {
                        let mut distance = 0.0f32;
                        for ((i, j), k) in kernel.indexed_iter() {
                            let (oy, ox) = (i as isize - half, j as isize - half);
                            let (ya, xa) = (rows.get(y + oy), cols.get(x + ox));
                            let (yb, xb) = (rows.get(y + dy + oy), cols.get(x + dx + ox));
                            for c in 0..color {
                                let d = image[[ya, xa, c]] - image[[yb, xb, c]];
                                distance += k * d * d;
                            }
                        }

                        let weight = self.weight(distance / color as f32);
                        if weight == 0.0 {
                            continue;
                        }

                        let (yb, xb) = (rows.get(y + dy), cols.get(x + dx));
                        weights[[y as usize, x as usize]] += weight;
                        for c in 0..color {
                            accum[[y as usize, x as usize, c]] += weight * image[[yb, xb, c]];
                        }
                    }
                }
            }
        }

        (accum, weights)
    }
}

/// Normalized Gaussian patch weights with sigma = (size - 1) / 4.
fn patch_kernel(size: usize) -> Array2<f32> {
    let half = (size / 2) as f32;
    let spread = (size as f32 - 1.0) / 4.0;
    if spread <= 0.0 {
        return Array2::ones((size, size));
    }

    let mut kernel = Array2::from_shape_fn((size, size), |(i, j)| {
        let (dy, dx) = (i as f32 - half, j as f32 - half);
        (-(dy * dy + dx * dx) / (2.0 * spread * spread)).exp()
    });
    let total = kernel.sum();
    kernel.mapv_inplace(|k| k / total);
    kernel
}

/// Mirror indices (edge pixel not repeated) for coordinates up to `pad`
/// outside `0..len`.
struct ReflectTable {
    pad: isize,
    indices: Vec<usize>,
}

impl ReflectTable {
    fn new(len: usize, pad: usize) -> Self {
        let indices = (0..len + 2 * pad)
            .map(|i| reflect(i as isize - pad as isize, len))
            .collect();
        Self {
            pad: pad as isize,
            indices,
        }
    }

    #[inline]
    fn get(&self, i: isize) -> usize {
        self.indices[(i + self.pad) as usize]
    }
}
