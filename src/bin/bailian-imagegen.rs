//! CLI for Bailian image generation.

use bailian_imagegen::image::providers::DEFAULT_ENDPOINT;
use bailian_imagegen::RunOptions;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bailian-imagegen")]
#[command(about = "Generate images from a prompt file via Alibaba Cloud Bailian (DashScope)")]
#[command(version)]
struct Cli {
    /// JSON config file holding DASHSCOPE_API_KEY (and optionally MODEL)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Prompt file
    #[arg(short, long, default_value = "prompt.txt")]
    prompt: PathBuf,

    /// Directory to save images into
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Generation endpoint (e.g. the international region)
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Log request/response bodies and download progress
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bailian_imagegen={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = RunOptions {
        config_path: cli.config,
        prompt_path: cli.prompt,
        output_dir: cli.output,
        endpoint: cli.endpoint,
    };

    bailian_imagegen::run(&options).await;
    Ok(())
}
