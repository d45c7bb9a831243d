use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use bark_tracker::classify::NoModels;
use bark_tracker::config::{AppConfig, AudioConfig};
use bark_tracker::pipeline::{FfmpegSource, PipelineRegistry, PipelineStatus, SourceMode};
use bark_tracker::sink::{DetectionSink, JsonlSink};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "bark_tracker",
    about = "Dog bark detection over RTSP streams and media files"
)]
struct Cli {
    /// JSON configuration file (defaults are used when absent or invalid)
    #[arg(long)]
    config: Option<PathBuf>,
    /// ML model URL or path, overriding the configured one
    #[arg(long)]
    model: Option<String>,
    /// JSON-lines file receiving detection events
    #[arg(long, default_value = "bark_events.jsonl")]
    output: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Monitor a live stream until interrupted
    Stream {
        /// Stream URL (e.g. rtsp://camera/live)
        url: String,
    },
    /// Process a finite media file and exit
    File {
        /// Path to the media file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::default(),
    };
    if let Some(model) = cli.model {
        config.ml.model = Some(model);
        // The ML path wants 16 kHz windows with overlap
        if cli.config.is_none() {
            config.audio = AudioConfig::ml_defaults();
        }
    }
    config
        .audio
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid audio configuration")?;
    tracing::info!(
        sample_rate = config.audio.sample_rate,
        window_size = config.audio.window_size,
        overlap_size = config.audio.overlap_size,
        "starting bark tracker"
    );

    let sink: Arc<dyn DetectionSink> = Arc::new(
        JsonlSink::create(&cli.output)
            .with_context(|| format!("opening output file {}", cli.output.display()))?,
    );
    let registry = PipelineRegistry::new();

    match cli.command {
        Commands::Stream { url } => run_stream(&registry, &config, sink, url).await,
        Commands::File { path } => run_file(&registry, &config, sink, path).await,
    }
}

async fn run_stream(
    registry: &PipelineRegistry,
    config: &AppConfig,
    sink: Arc<dyn DetectionSink>,
    url: String,
) -> Result<ExitCode> {
    let source = FfmpegSource::stream(url, config.audio.sample_rate);
    let id = registry
        .start(&source, SourceMode::Stream, config, &NoModels, sink)
        .context("starting stream pipeline")?;

    // Run until the stream dies on its own or the user interrupts
    let report = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            registry.stop(id).await
        }
        report = registry.wait(id) => report,
    };

    match report {
        Some(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(exit_code_for(report.status))
        }
        None => Ok(ExitCode::from(1)),
    }
}

async fn run_file(
    registry: &PipelineRegistry,
    config: &AppConfig,
    sink: Arc<dyn DetectionSink>,
    path: PathBuf,
) -> Result<ExitCode> {
    let source = FfmpegSource::file(path.display().to_string(), config.audio.sample_rate);
    let id = registry
        .start(&source, SourceMode::File, config, &NoModels, sink)
        .context("starting file pipeline")?;

    let report = registry
        .wait(id)
        .await
        .context("file pipeline task failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(exit_code_for(report.status))
}

fn exit_code_for(status: PipelineStatus) -> ExitCode {
    match status {
        PipelineStatus::Completed | PipelineStatus::Stopped => ExitCode::from(0),
        _ => ExitCode::from(2),
    }
}
