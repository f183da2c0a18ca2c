use anyhow::Result;

/// Trait for background-removal models
/// Allows swapping between different backends (external tools, ONNX, test stubs)
pub trait MattingModel {
    /// Cut the subject out of an encoded image
    ///
    /// # Arguments
    /// * `input` - Encoded image bytes (PNG, JPEG, WebP, ...)
    ///
    /// # Returns
    /// * RGBA PNG bytes whose alpha channel is the model's raw matte
    fn remove_background(&mut self, input: &[u8]) -> Result<Vec<u8>>;

    /// Short name used in log lines
    fn name(&self) -> &str {
        "matting"
    }
}

/// Plain functions and closures work as models, which keeps tests free of real inference.
impl<F> MattingModel for F
where
    F: FnMut(&[u8]) -> Result<Vec<u8>>,
{
    fn remove_background(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        self(input)
    }

    fn name(&self) -> &str {
        "closure"
    }
}
