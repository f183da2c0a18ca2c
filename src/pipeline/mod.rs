//! Batch orchestration: enumerate inputs, run each through the configured
//! stages and collect a per-item outcome.

mod config;
mod input;
mod result;

pub use config::{BatchConfig, RunMode};
pub use input::{collect_inputs, is_supported, output_file_name, SUPPORTED_EXTENSIONS};
pub use result::{BatchSummary, ItemState, ProcessingResult};

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use image::DynamicImage;

use crate::error::{Error, Result};
use crate::imaging;
use crate::matting::{MatteRefiner, MattingModel};
use crate::output::{OutputSink, PngDirectory, Preview, SystemViewer};
use crate::preprocess::Preprocessor;

/// Sequential batch runner.
///
/// A failure on one image is recorded in the summary and the batch moves on;
/// only setup problems (bad configuration, unreadable input folder) abort a run.
pub struct Pipeline {
    config: BatchConfig,
    preprocessor: Preprocessor,
    refiner: MatteRefiner,
    model: Option<Box<dyn MattingModel>>,
    sink: Box<dyn OutputSink>,
    preview: Option<Box<dyn Preview>>,
    /// Output names persisted by this pipeline.
    written: HashSet<String>,
}

impl Pipeline {
    /// Build a pipeline writing PNGs to `config.output_folder`.
    ///
    /// `model` is required for modes that matte; the system viewer is used
    /// for previews when `config.show_preview` is set.
    pub fn new(config: BatchConfig, model: Option<Box<dyn MattingModel>>) -> Result<Self> {
        if config.mode.needs_matting() && model.is_none() {
            return Err(Error::invalid_parameter(
                "model",
                "a matting model is required to remove backgrounds",
            ));
        }
        if config.post_process && !config.mode.needs_matting() {
            return Err(Error::invalid_parameter(
                "post_process",
                "matte refinement needs a matting mode",
            ));
        }
        if let Some((width, height)) = config.resize {
            imaging::validate_dimensions(width, height)?;
        }

        let sink = PngDirectory::new(&config.output_folder)?;
        let preview: Option<Box<dyn Preview>> = if config.show_preview {
            Some(Box::new(SystemViewer))
        } else {
            None
        };

        Ok(Self {
            config,
            preprocessor: Preprocessor::default(),
            refiner: MatteRefiner::new(),
            model,
            sink: Box::new(sink),
            preview,
            written: HashSet::new(),
        })
    }

    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the previewer; only consulted when `show_preview` is set.
    pub fn with_preview(mut self, preview: Box<dyn Preview>) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Process every input and return one result per file, in order.
    pub fn run(&mut self) -> Result<BatchSummary> {
        let inputs = collect_inputs(&self.config)?;
        if inputs.is_empty() {
            tracing::warn!("No images found in {}", self.config.input_folder.display());
        }

        tracing::info!(
            "Processing {} image(s) into {}",
            inputs.len(),
            self.sink.location().display()
        );
        match self.model.as_ref() {
            Some(model) if self.config.mode.needs_matting() => {
                tracing::info!(
                    "Mode {:?} with {} model, post_process={}",
                    self.config.mode,
                    model.name(),
                    self.config.post_process
                );
            }
            _ => tracing::info!("Mode {:?}", self.config.mode),
        }

        let batch_start = Instant::now();
        self.written.clear();
        let mut summary = BatchSummary::default();
        for input in &inputs {
            let result = self.process_file(input);
            summary.push(result);
        }

        tracing::info!(
            "Done: {} succeeded, {} failed in {:.2}s",
            summary.succeeded(),
            summary.failed(),
            batch_start.elapsed().as_secs_f64()
        );

        Ok(summary)
    }

    /// Run one file through every stage, converting any error into a failed result.
    pub fn process_file(&mut self, input: &Path) -> ProcessingResult {
        let start = Instant::now();
        let mut state = ItemState::Pending;

        let outcome = self.run_stages(input, &mut state);
        let elapsed = start.elapsed();

        match outcome {
            Ok(output) => {
                tracing::info!(
                    "{} -> {} ({:.2}s)",
                    input.display(),
                    output.display(),
                    elapsed.as_secs_f64()
                );
                ProcessingResult::Succeeded {
                    input: input.to_path_buf(),
                    output,
                    elapsed,
                }
            }
            Err(error) => {
                match &error {
                    Error::MissingFile { .. } => {
                        tracing::warn!("Skipping {}: {}", input.display(), error)
                    }
                    _ => tracing::error!(
                        "Failed {} after {} stage: {}",
                        input.display(),
                        state,
                        error
                    ),
                }
                ProcessingResult::Failed {
                    input: input.to_path_buf(),
                    stage: state,
                    error,
                    elapsed,
                }
            }
        }
    }

    fn run_stages(&mut self, input: &Path, state: &mut ItemState) -> Result<PathBuf> {
        if !input.is_file() {
            return Err(Error::MissingFile {
                path: input.to_path_buf(),
            });
        }
        let mode = self.config.mode;
        let file_name = output_file_name(input, mode);
        if self.written.contains(&file_name) {
            return Err(Error::OutputCollision {
                path: self.sink.location().join(&file_name),
            });
        }

        let raw = fs::read(input).map_err(|source| Error::io(input, source))?;
        let mut image = imaging::decode(&raw)?;
        *state = ItemState::Loaded;

        // Set once the decoded image no longer matches `raw`
        let mut modified = false;

        if mode.preprocesses() {
            let _span = tracing::debug_span!("preprocess_stage").entered();
            let mut float = self.preprocessor.process(&imaging::to_float(&image));
            if let Some((width, height)) = self.config.resize {
                float = imaging::resize_float(&float, width, height)?;
            }
            image = imaging::to_dynamic(&float)?;
            modified = true;
            *state = ItemState::Preprocessed;
        } else if let Some((width, height)) = self.config.resize {
            image = imaging::resize_dynamic(&image, width, height)?;
            modified = true;
        }

        if mode.needs_matting() {
            let _span = tracing::debug_span!("matting_stage").entered();
            let model = self.model.as_mut().ok_or_else(|| Error::MatteModel {
                message: "no matting model configured".to_string(),
            })?;

            let payload = if modified {
                imaging::encode_png(&image)?
            } else {
                raw
            };
            let matted = model
                .remove_background(&payload)
                .map_err(|e| Error::MatteModel {
                    message: format!("{e:#}"),
                })?;
            image = imaging::decode(&matted)?;
            *state = ItemState::Matted;

            if self.config.post_process {
                image = self.refiner.refine(image)?;
                *state = ItemState::Refined;
            } else if !image.color().has_alpha() {
                tracing::debug!("{} returned no alpha, writing it opaque", model.name());
                image = DynamicImage::ImageRgba8(image.into_rgba8());
            }
        }

        let png = imaging::encode_png(&image)?;
        let path = self.sink.write_image(&file_name, &png)?;
        self.written.insert(file_name);
        *state = ItemState::Persisted;

        if self.config.show_preview {
            if let Some(preview) = self.preview.as_mut() {
                if let Err(e) = preview.show(&path) {
                    tracing::warn!("Preview failed: {e:#}");
                }
            }
        }

        Ok(path)
    }
}
