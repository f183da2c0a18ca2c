use super::types::MattingModel;
use crate::imaging::{decode, encode_png};
use anyhow::{bail, Context, Result};
use image::{imageops, DynamicImage, GrayImage, Luma, RgbImage, RgbaImage};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Salient-object matting with a U²-Net style ONNX model.
///
/// The model takes a 1x3xSxS ImageNet-normalized tensor and returns the
/// foreground probability map as its first output.
pub struct OnnxMatting {
    session: Session,
    input_size: u32,
    label: String,
}

impl OnnxMatting {
    /// Load a model from an ONNX file
    ///
    /// # Default Configuration
    /// - Input size: 320x320 (the resolution U²-Net was trained at)
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading matting model from {}", path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        tracing::info!("Matting model loaded successfully");

        let label = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_owned());

        Ok(Self {
            session,
            input_size: 320,
            label,
        })
    }
}

impl MattingModel for OnnxMatting {
    fn remove_background(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let _span = tracing::debug_span!("onnx_matting").entered();

        let image = decode(input)?;
        let rgb = image.to_rgb8();
        let size = self.input_size;

        let tensor = to_input_tensor(&rgb, size);
        let shape = [1usize, 3, size as usize, size as usize];
        let input_value = Tensor::from_array((shape, tensor.into_raw_vec()))?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .context("Failed to run inference")?;
        drop(_infer_span);

        let (dims, data) = outputs[0].try_extract_tensor::<f32>()?;
        if dims.len() != 4 {
            bail!("Unexpected output rank {} from {}", dims.len(), self.label);
        }
        let (mask_height, mask_width) = (dims[2] as u32, dims[3] as u32);
        let plane_len = (mask_height * mask_width) as usize;
        if data.len() < plane_len {
            bail!("Output of {} is shorter than its shape", self.label);
        }
        let plane = &data[..plane_len];

        let mask = to_mask(plane, mask_width, mask_height, rgb.width(), rgb.height());
        let cutout = apply_mask(&rgb, &mask);

        Ok(encode_png(&DynamicImage::ImageRgba8(cutout))?)
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Resize to `size` x `size` and normalize into an NCHW tensor
fn to_input_tensor(rgb: &RgbImage, size: u32) -> Array4<f32> {
    let resized = imageops::resize(rgb, size, size, imageops::FilterType::Lanczos3);

    let peak = resized
        .pixels()
        .flat_map(|p| p.0)
        .max()
        .map_or(1.0, |v| f32::from(v).max(1e-6));

    let mut tensor = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let value = f32::from(pixel[c]) / peak;
            tensor[[0, c, y as usize, x as usize]] = (value - MEAN[c]) / STD[c];
        }
    }

    tensor
}

/// Min-max normalize the probability map and resize it to the frame
fn to_mask(
    plane: &[f32],
    mask_width: u32,
    mask_height: u32,
    target_width: u32,
    target_height: u32,
) -> GrayImage {
    let (min, max) = plane
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = (max - min).max(1e-6);

    let mask = GrayImage::from_fn(mask_width, mask_height, |x, y| {
        let v = (plane[(y * mask_width + x) as usize] - min) / range;
        Luma([(v * 255.0).round().clamp(0.0, 255.0) as u8])
    });

    if mask.dimensions() == (target_width, target_height) {
        return mask;
    }

    imageops::resize(
        &mask,
        target_width,
        target_height,
        imageops::FilterType::Lanczos3,
    )
}

fn apply_mask(rgb: &RgbImage, mask: &GrayImage) -> RgbaImage {
    RgbaImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        image::Rgba([r, g, b, mask.get_pixel(x, y)[0]])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_input_tensor_shape_and_normalization() {
        let rgb = RgbImage::from_pixel(64, 48, Rgb([255, 255, 255]));
        let tensor = to_input_tensor(&rgb, 32);
        assert_eq!(tensor.shape(), &[1, 3, 32, 32]);
        let expected = (1.0 - MEAN[0]) / STD[0];
        assert!((tensor[[0, 0, 5, 5]] - expected).abs() < 1e-4);
    }

    #[test]
    fn test_mask_is_stretched_and_resized() {
        let plane = [0.2, 0.4, 0.6, 0.8];
        let mask = to_mask(&plane, 2, 2, 2, 2);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        assert_eq!(mask.get_pixel(1, 1)[0], 255);

        let resized = to_mask(&plane, 2, 2, 8, 6);
        assert_eq!(resized.dimensions(), (8, 6));
    }

    #[test]
    fn test_apply_mask_sets_alpha() {
        let rgb = RgbImage::from_pixel(2, 1, Rgb([1, 2, 3]));
        let mask = GrayImage::from_raw(2, 1, vec![0, 200]).unwrap();
        let rgba = apply_mask(&rgb, &mask);
        assert_eq!(rgba.get_pixel(1, 0).0, [1, 2, 3, 200]);
    }
}
