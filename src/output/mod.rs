mod directory;
mod preview;

pub use directory::PngDirectory;
pub use preview::SystemViewer;

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Trait for output destinations
pub trait OutputSink {
    /// Persist an encoded image under `file_name` and return where it landed
    fn write_image(&mut self, file_name: &str, png: &[u8]) -> Result<PathBuf>;

    /// Where outputs are written
    fn location(&self) -> &Path;
}

/// Trait for showing a finished image to the user
pub trait Preview {
    /// Display the image without blocking the batch
    fn show(&mut self, path: &Path) -> anyhow::Result<()>;
}
