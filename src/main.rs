use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cutout::imaging::parse_size;
use cutout::matting::{self, MattingModel};
use cutout::preprocess::{NlMeansDenoiser, NlMeansMode, Preprocessor, ToneNormalizer};
use cutout::{BatchConfig, Pipeline, RunMode};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Folder scanned for .png, .jpg, .jpeg and .webp images
    #[arg(long, default_value = "images/inputs")]
    input_folder: PathBuf,

    /// Folder for the results (default depends on --mode)
    #[arg(long)]
    output_folder: Option<PathBuf>,

    /// Stages to run
    #[arg(long, value_enum, default_value_t = Mode::RemoveBackground)]
    mode: Mode,

    /// Process only this file from the input folder (repeatable)
    #[arg(long = "test-file", value_name = "NAME")]
    test_files: Vec<String>,

    /// Open each result in the system image viewer
    #[arg(long)]
    show_preview: bool,

    /// Clean the matte with a closing and a light blur
    #[arg(long)]
    post_process: bool,

    /// Resize before matting, e.g. 1024x768
    #[arg(long, value_name = "WxH", value_parser = parse_resize)]
    resize: Option<(u32, u32)>,

    /// Denoising search strategy
    #[arg(long, value_enum, default_value_t = Denoise::Fast)]
    denoise: Denoise,

    /// External program that reads an image on stdin and writes an RGBA PNG to stdout
    #[arg(long, value_name = "PROGRAM")]
    matting_command: Option<String>,

    /// Argument passed to the matting command (repeatable)
    #[arg(long = "matting-arg", value_name = "ARG", allow_hyphen_values = true)]
    matting_args: Vec<String>,

    /// Path to a salient-object ONNX model
    #[cfg(feature = "onnx")]
    #[arg(long)]
    model: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Preprocess,
    RemoveBackground,
    Full,
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Preprocess => RunMode::Preprocess,
            Mode::RemoveBackground => RunMode::RemoveBackground,
            Mode::Full => RunMode::Full,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Denoise {
    Fast,
    Exact,
}

fn parse_resize(value: &str) -> std::result::Result<(u32, u32), String> {
    parse_size(value).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("cutout={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every image succeeded.
fn run(args: Args) -> Result<bool> {
    let mode = RunMode::from(args.mode);
    let config = BatchConfig {
        input_folder: args.input_folder.clone(),
        output_folder: args
            .output_folder
            .clone()
            .unwrap_or_else(|| PathBuf::from(mode.default_output_folder())),
        test_mode: !args.test_files.is_empty(),
        test_files: args.test_files.clone(),
        show_preview: args.show_preview,
        post_process: args.post_process,
        mode,
        resize: args.resize,
    };

    tracing::info!("cutout starting");
    tracing::info!("Input: {}", config.input_folder.display());
    tracing::info!("Output: {}", config.output_folder.display());
    if let Some((width, height)) = config.resize {
        tracing::info!("Resize: {}x{}", width, height);
    }

    let model = if mode.needs_matting() {
        Some(load_model(&args)?)
    } else {
        None
    };

    let denoise_mode = match args.denoise {
        Denoise::Fast => NlMeansMode::Fast,
        Denoise::Exact => NlMeansMode::Exact,
    };
    let preprocessor = Preprocessor::new(
        NlMeansDenoiser::default().with_mode(denoise_mode),
        ToneNormalizer::default(),
    );

    let mut pipeline = Pipeline::new(config, model)
        .context("Failed to initialize pipeline")?
        .with_preprocessor(preprocessor);

    let summary = pipeline.run().context("Failed to run batch")?;
    for failure in summary.failures() {
        if let Some(error) = failure.error() {
            tracing::debug!("{}: {}", failure.input().display(), error);
        }
    }

    Ok(summary.all_succeeded())
}

fn load_model(args: &Args) -> Result<Box<dyn MattingModel>> {
    #[cfg(feature = "onnx")]
    if let Some(model_path) = &args.model {
        tracing::info!("Loading matting model from {}", model_path);
        let model =
            matting::create_onnx_model(model_path).context("Failed to load matting model")?;
        tracing::info!("Matting model loaded successfully");
        return Ok(model);
    }

    match &args.matting_command {
        Some(program) => {
            tracing::info!("Using matting command {} {:?}", program, args.matting_args);
            Ok(matting::create_command_model(
                program,
                args.matting_args.iter(),
            ))
        }
        None => anyhow::bail!(
            "No matting model configured; pass --matting-command{}",
            if cfg!(feature = "onnx") { " or --model" } else { "" }
        ),
    }
}
