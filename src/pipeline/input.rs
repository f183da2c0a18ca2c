use std::fs;
use std::path::{Path, PathBuf};

use super::config::{BatchConfig, RunMode};
use crate::error::{Error, Result};

/// Extensions picked up by a directory scan, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Resolve the files a batch will process.
///
/// In test mode the listed names are joined to the input folder as-is, even
/// if they do not exist; missing files are reported per item later. Otherwise
/// the input folder is scanned for supported images, sorted by name.
pub fn collect_inputs(config: &BatchConfig) -> Result<Vec<PathBuf>> {
    if config.test_mode {
        return Ok(config
            .test_files
            .iter()
            .map(|name| config.input_folder.join(name))
            .collect());
    }

    let dir = &config.input_folder;
    let entries = fs::read_dir(dir).map_err(|source| Error::io(dir, source))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|source| Error::io(dir, source))?.path();
        if path.is_file() && is_supported(&path) {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

/// `<input stem><mode suffix>`, e.g. `cat.jpg` -> `cat_bg_removed.png`.
pub fn output_file_name(input: &Path, mode: RunMode) -> String {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_else(|| "output".into());
    format!("{stem}{}", mode.output_suffix())
}
