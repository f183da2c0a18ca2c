mod clahe;
mod denoise;
mod tone;

pub use clahe::Clahe;
pub use denoise::{NlMeansDenoiser, NlMeansMode};
pub use tone::{adjust_gamma, rescale_intensity, ToneNormalizer};

use crate::imaging::FloatImage;

/// Conditions a photograph before it is handed to a matting model.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    denoiser: NlMeansDenoiser,
    tone: ToneNormalizer,
}

impl Preprocessor {
    pub fn new(denoiser: NlMeansDenoiser, tone: ToneNormalizer) -> Self {
        Self { denoiser, tone }
    }

    /// Preprocess a normalized image
    ///
    /// Steps:
    /// 1. Non-local means denoising
    /// 2. CLAHE, intensity rescale and gamma correction
    ///
    /// Returns: an image of the same shape with values in [0, 1]
    pub fn process(&self, image: &FloatImage) -> FloatImage {
        let _span = tracing::debug_span!("preprocess").entered();

        let denoised = self.denoiser.denoise(image);
        self.tone.normalize(&denoised)
    }
}
