//! End-to-end run: config, prompt, generation, downloads, summary.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::image::providers::{DashScopeClientBuilder, DEFAULT_ENDPOINT};
use crate::image::{GenerationRequest, ImageGenerator};
use crate::output::{OutputDir, SLUG_SOURCE_CHARS};
use crate::prompt::PromptSpec;
use std::path::PathBuf;

/// Logged after any fatal error.
pub const TROUBLESHOOTING_HINTS: [&str; 5] = [
    "check that DASHSCOPE_API_KEY in the config file is correct",
    "make sure the API key has enough balance and permissions",
    "check that the network connection is working",
    "check that the prompt file is formatted correctly",
    "try simplifying the prompt",
];

/// Characters of prompt text shown when logging parameters.
const PREVIEW_CHARS: usize = 80;

const RULE: &str = "============================================================";

/// Inputs and outputs of a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// JSON config file.
    pub config_path: PathBuf,
    /// Prompt text file.
    pub prompt_path: PathBuf,
    /// Directory receiving downloaded images.
    pub output_dir: PathBuf,
    /// Generation endpoint URL.
    pub endpoint: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("config.json"),
            prompt_path: PathBuf::from("prompt.txt"),
            output_dir: PathBuf::from("./output"),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// Runs the whole job and returns the saved files in download order.
///
/// Never fails: fatal errors and Ctrl-C are logged and yield an empty list.
pub async fn run(options: &RunOptions) -> Vec<PathBuf> {
    tracing::info!("{RULE}");
    tracing::info!("Bailian image generator v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("multimodal generation API (qwen-image models)");
    tracing::info!("{RULE}");

    tokio::select! {
        result = execute(options) => match result {
            Ok(saved) => saved,
            Err(e) => {
                report_failure(&e);
                Vec::new()
            }
        },
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted by user");
            Vec::new()
        }
    }
}

/// Runs the job, surfacing the first fatal error.
pub async fn execute(options: &RunOptions) -> Result<Vec<PathBuf>> {
    Config::validate(&options.config_path)?;
    let config = Config::load(&options.config_path)?;
    let spec = PromptSpec::from_file(&options.prompt_path)?;
    let output = OutputDir::create(&options.output_dir)?;

    let client = DashScopeClientBuilder::from_config(&config)
        .endpoint(options.endpoint.as_str())
        .build()?;

    generate_and_save(&client, &spec, &output).await
}

/// Generates images for `spec` and downloads them into `output`.
///
/// Downloads run one at a time in the order the service returned them.
/// A failed download is left out of the result; the rest still proceed.
pub async fn generate_and_save<G>(
    generator: &G,
    spec: &PromptSpec,
    output: &OutputDir,
) -> Result<Vec<PathBuf>>
where
    G: ImageGenerator + ?Sized,
{
    log_parameters(spec);

    tracing::info!(generator = generator.name(), "starting generation...");
    let images = generator
        .generate_image(&GenerationRequest::from(spec))
        .await?;

    tracing::info!("saving {} image(s)...", images.len());
    let base: String = spec.prompt().chars().take(SLUG_SOURCE_CHARS).collect();
    let mut saved = Vec::with_capacity(images.len());

    for (index, image) in images.iter().enumerate() {
        let path = match output.next_path(index, Some(base.as_str())) {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(index, error = %e, "cannot prepare output path");
                continue;
            }
        };
        if generator.download_image(image, &path).await {
            saved.push(path);
        }
    }

    log_summary(&saved);
    Ok(saved)
}

fn report_failure(err: &Error) {
    tracing::error!("run failed: {err}");
    tracing::error!("troubleshooting:");
    for (i, hint) in TROUBLESHOOTING_HINTS.iter().enumerate() {
        tracing::error!("  {}. {hint}", i + 1);
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn log_parameters(spec: &PromptSpec) {
    tracing::info!("generation parameters:");
    tracing::info!("  prompt: {}", preview(spec.prompt()));
    tracing::info!("  size: {}", spec.size());
    tracing::info!("  prompt extend: {}", yes_no(spec.prompt_extend()));
    tracing::info!("  watermark: {}", yes_no(spec.watermark()));
    if !spec.negative_prompt().is_empty() {
        tracing::info!("  negative prompt: {}", preview(spec.negative_prompt()));
    }
}

/// Sums the on-disk size of `files`, counting unreadable files as empty.
fn total_size(files: &[PathBuf]) -> u64 {
    files
        .iter()
        .filter_map(|f| std::fs::metadata(f).ok())
        .map(|m| m.len())
        .sum()
}

fn log_summary(saved: &[PathBuf]) {
    tracing::info!("{RULE}");
    tracing::info!("image generation finished");
    tracing::info!("saved {} image(s):", saved.len());
    for path in saved {
        let name = path.file_name().unwrap_or(path.as_os_str());
        tracing::info!("  {}", name.to_string_lossy());
    }
    let total = total_size(saved);
    tracing::info!(
        "total size: {total} bytes ({:.2} MB)",
        total as f64 / 1024.0 / 1024.0
    );
    tracing::info!("{RULE}");
}
