mod command;
mod morphology;
#[cfg(feature = "onnx")]
mod onnx;
mod refine;
pub mod types;

pub use command::CommandMatting;
pub use morphology::{close, dilate, erode, gaussian_blur, gaussian_kernel};
#[cfg(feature = "onnx")]
pub use onnx::OnnxMatting;
pub use refine::{extract_alpha, replace_alpha, MatteRefiner, CLOSING_KERNEL, SMOOTHING_KERNEL};
pub use types::MattingModel;

/// Create a matting model that shells out to an external program
pub fn create_command_model<P, I, A>(program: P, args: I) -> Box<dyn MattingModel>
where
    P: Into<std::ffi::OsString>,
    I: IntoIterator<Item = A>,
    A: Into<std::ffi::OsString>,
{
    Box::new(CommandMatting::new(program, args))
}

/// Create a matting model backed by an ONNX file
#[cfg(feature = "onnx")]
pub fn create_onnx_model(model_path: &str) -> anyhow::Result<Box<dyn MattingModel>> {
    let model = OnnxMatting::new(model_path)?;
    Ok(Box::new(model))
}
