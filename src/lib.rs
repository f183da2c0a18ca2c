//! # cutout
//!
//! Batch background removal for product and portrait photos.
//!
//! Each image can be denoised and tone-normalized, handed to a matting model
//! that cuts out the subject, and have its matte cleaned with a morphological
//! closing plus a light blur before it is written as an RGBA PNG.
//!
//! ## Example
//!
//! ```no_run
//! use cutout::{BatchConfig, Pipeline, RunMode};
//! use cutout::matting::create_command_model;
//!
//! # fn main() -> cutout::Result<()> {
//! let config = BatchConfig {
//!     mode: RunMode::Full,
//!     post_process: true,
//!     ..BatchConfig::default()
//! };
//! let model = create_command_model("rembg", ["i", "-", "-"]);
//! let mut pipeline = Pipeline::new(config, Some(model))?;
//!
//! let summary = pipeline.run()?;
//! println!("{} of {} succeeded", summary.succeeded(), summary.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod imaging;
pub mod matting;
pub mod output;
pub mod pipeline;
pub mod preprocess;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use pipeline::{BatchConfig, BatchSummary, Pipeline, RunMode};
