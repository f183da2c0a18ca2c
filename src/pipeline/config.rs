use std::path::PathBuf;

/// Which stages a batch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Denoise and tone-normalize only.
    Preprocess,
    /// Hand the original bytes straight to the matting model.
    #[default]
    RemoveBackground,
    /// Preprocess, then matte the preprocessed image.
    Full,
}

impl RunMode {
    pub fn preprocesses(self) -> bool {
        matches!(self, Self::Preprocess | Self::Full)
    }

    pub fn needs_matting(self) -> bool {
        matches!(self, Self::RemoveBackground | Self::Full)
    }

    /// Appended to the input stem to name the output file.
    pub fn output_suffix(self) -> &'static str {
        match self {
            Self::Preprocess => "_preprocessed.png",
            Self::RemoveBackground | Self::Full => "_bg_removed.png",
        }
    }

    pub fn default_output_folder(self) -> &'static str {
        match self {
            Self::Preprocess => "images/preprocessed_inputs",
            Self::RemoveBackground | Self::Full => "images/bg_removed",
        }
    }
}

/// Everything a batch run needs to know, passed in explicitly.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory holding the input images.
    pub input_folder: PathBuf,
    /// Directory the PNG results are written to; created if missing.
    pub output_folder: PathBuf,
    /// Process only `test_files` instead of scanning `input_folder`.
    pub test_mode: bool,
    /// File names inside `input_folder`, used when `test_mode` is set.
    pub test_files: Vec<String>,
    /// Open every result in the system image viewer.
    pub show_preview: bool,
    /// Clean the matte with closing and smoothing.
    pub post_process: bool,
    pub mode: RunMode,
    /// Resize to (width, height) before matting.
    pub resize: Option<(u32, u32)>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        let mode = RunMode::default();
        Self {
            input_folder: PathBuf::from("images/inputs"),
            output_folder: PathBuf::from(mode.default_output_folder()),
            test_mode: false,
            test_files: Vec::new(),
            show_preview: false,
            post_process: false,
            mode,
            resize: None,
        }
    }
}
