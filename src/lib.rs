#![warn(missing_docs)]
//! Bailian image generation from a prompt file.
//!
//! Reads a DashScope API key from a JSON config file, reads generation
//! parameters from a prompt file, calls the Alibaba Cloud Bailian
//! multimodal-generation API once, and downloads every returned image
//! into an output directory with a timestamped filename.
//!
//! # Quick Start
//!
//! ```no_run
//! use bailian_imagegen::{run, RunOptions};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let saved = run(&RunOptions::default()).await;
//!     println!("saved {} image(s)", saved.len());
//! }
//! ```
//!
//! # Using the client directly
//!
//! ```no_run
//! use bailian_imagegen::{DashScopeClient, GenerationRequest, ImageGenerator};
//!
//! # async fn demo() -> bailian_imagegen::Result<()> {
//! let client = DashScopeClient::builder("sk-...").build()?;
//! let request = GenerationRequest::new("A lighthouse at dusk").with_size("1328*1328");
//! for (i, image) in client.generate_image(&request).await?.iter().enumerate() {
//!     client.download_image(image, format!("lighthouse_{i}.png").as_ref()).await;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! The library emits `tracing` events and never installs a subscriber;
//! the binary (feature `cli`) sets one up.

pub mod config;
mod error;
pub mod image;
pub mod output;
pub mod pipeline;
pub mod prompt;

// Re-export error types at crate root
pub use error::{Error, Result};

pub use config::Config;
pub use image::providers::{DashScopeClient, DashScopeClientBuilder};
pub use image::{GenerationRequest, ImageGenerator, ImageResult};
pub use output::OutputDir;
pub use pipeline::{execute, generate_and_save, run, RunOptions};
pub use prompt::PromptSpec;

