use super::clahe::Clahe;
use crate::error::{Error, Result};
use crate::imaging::{color_channels, FloatImage};

/// Local contrast enhancement, intensity rescale and gamma, in that order.
#[derive(Debug, Clone)]
pub struct ToneNormalizer {
    clip_limit: f32,
    nbins: usize,
    tiles: usize,
    gamma: f32,
}

impl Default for ToneNormalizer {
    fn default() -> Self {
        Self {
            clip_limit: 0.03,
            nbins: 256,
            tiles: 8,
            gamma: 0.8,
        }
    }
}

impl ToneNormalizer {
    pub fn new(clip_limit: f32, gamma: f32) -> Result<Self> {
        if !(clip_limit > 0.0 && clip_limit <= 1.0) {
            return Err(Error::invalid_parameter(
                "clip_limit",
                format!("{clip_limit} is outside (0, 1]"),
            ));
        }
        if !(gamma > 0.0 && gamma.is_finite()) {
            return Err(Error::invalid_parameter(
                "gamma",
                format!("{gamma} must be positive"),
            ));
        }

        Ok(Self {
            clip_limit,
            gamma,
            ..Self::default()
        })
    }

    /// Number of histogram bins used by the equalization.
    pub fn with_bins(mut self, nbins: usize) -> Result<Self> {
        if nbins < 2 {
            return Err(Error::invalid_parameter("nbins", "at least 2 bins are required"));
        }
        self.nbins = nbins;
        Ok(self)
    }

    /// Enhance, rescale and gamma-correct. Every step keeps values in [0, 1].
    pub fn normalize(&self, image: &FloatImage) -> FloatImage {
        let _span = tracing::debug_span!("tone").entered();

        let mut output = Clahe::new(self.clip_limit, self.nbins, self.tiles).apply(image);
        rescale_intensity(&mut output);
        adjust_gamma(&mut output, self.gamma);
        output
    }
}

/// Linearly remap the observed min/max of the color channels onto [0, 1].
///
/// A constant image has no range to stretch and is only clamped.
pub fn rescale_intensity(image: &mut FloatImage) {
    let color = color_channels(image);
    let (min, max) = image
        .indexed_iter()
        .filter(|((_, _, c), _)| *c < color)
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), (_, &v)| {
            (lo.min(v), hi.max(v))
        });

    let range = max - min;
    for ((_, _, c), value) in image.indexed_iter_mut() {
        if c >= color {
            continue;
        }
        let stretched = if range > f32::EPSILON {
            (*value - min) / range
        } else {
            *value
        };
        *value = stretched.clamp(0.0, 1.0);
    }
}

/// Pointwise `value^gamma` on the color channels.
pub fn adjust_gamma(image: &mut FloatImage, gamma: f32) {
    let color = color_channels(image);
    for ((_, _, c), value) in image.indexed_iter_mut() {
        if c < color {
            *value = value.clamp(0.0, 1.0).powf(gamma);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Noise;

    fn in_unit_range(image: &FloatImage) -> bool {
        image.iter().all(|v| (0.0..=1.0).contains(v))
    }

    #[test]
    fn test_output_range_for_varied_inputs() {
        let normalizer = ToneNormalizer::default();

        for seed in 0..6 {
            let mut noise = Noise::new(seed);
            let scale = 0.1 + seed as f32 * 0.15;
            let channels = [1, 3, 4][seed as usize % 3];
            let image = FloatImage::from_shape_fn((19, 27, channels), |_| noise.next_unit() * scale);

            let output = normalizer.normalize(&image);

            assert_eq!(output.dim(), image.dim());
            assert!(in_unit_range(&output), "seed {seed} left the unit range");
        }
    }

    #[test]
    fn test_out_of_range_input_is_clamped() {
        let mut image = FloatImage::from_shape_fn((8, 8, 3), |(y, x, _)| (x + y) as f32 / 14.0);
        image[[0, 0, 0]] = -0.5;
        image[[7, 7, 2]] = 1.5;

        let output = ToneNormalizer::default().normalize(&image);
        assert!(in_unit_range(&output));
    }

    #[test]
    fn test_rescale_maps_range_to_unit() {
        let mut image = FloatImage::from_shape_vec((1, 3, 1), vec![0.2, 0.4, 0.6]).unwrap();
        rescale_intensity(&mut image);
        let values: Vec<f32> = image.iter().copied().collect();
        assert!((values[0] - 0.0).abs() < 1e-6);
        assert!((values[1] - 0.5).abs() < 1e-6);
        assert!((values[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rescale_constant_image_unchanged() {
        let mut image = FloatImage::from_elem((4, 4, 3), 0.3);
        rescale_intensity(&mut image);
        assert!(image.iter().all(|v| (v - 0.3).abs() < 1e-6));
    }

    #[test]
    fn test_rescale_ignores_alpha() {
        let mut image = FloatImage::from_shape_fn((1, 2, 4), |(_, x, c)| match (x, c) {
            (_, 3) => 0.9,
            (0, _) => 0.25,
            _ => 0.75,
        });
        rescale_intensity(&mut image);
        assert_eq!(image[[0, 0, 0]], 0.0);
        assert_eq!(image[[0, 1, 0]], 1.0);
        assert_eq!(image[[0, 0, 3]], 0.9);
    }

    #[test]
    fn test_gamma_brightens_midtones() {
        let mut image = FloatImage::from_elem((1, 1, 1), 0.25);
        adjust_gamma(&mut image, 0.8);
        let expected = 0.25f32.powf(0.8);
        assert!((image[[0, 0, 0]] - expected).abs() < 1e-6);
        assert!(image[[0, 0, 0]] > 0.25);
    }

    #[test]
    fn test_low_contrast_image_spans_full_range() {
        let image = FloatImage::from_shape_fn((24, 24, 1), |(y, x, _)| 0.4 + (x + y) as f32 / 460.0);
        let output = ToneNormalizer::default().normalize(&image);

        let min = output.iter().copied().fold(f32::INFINITY, f32::min);
        let max = output.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(min < 1e-6);
        assert!((max - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(ToneNormalizer::new(0.0, 0.8).is_err());
        assert!(ToneNormalizer::new(0.03, -1.0).is_err());
        assert!(ToneNormalizer::new(0.03, 0.8).unwrap().with_bins(1).is_err());
    }
}
