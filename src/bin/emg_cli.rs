use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use emg_gesture::analysis::classifier::Centroid;
use emg_gesture::ingest::SyntheticSource;
use emg_gesture::{
    check_shape, AppConfig, BrushSize, Classifier, MailboxChannels, NearestCentroidClassifier,
    Pipeline, UiMailbox,
};
use serde::Serialize;
use tokio::sync::broadcast::error::TryRecvError;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "emg_cli",
    about = "Run and inspect the EMG gesture recognition pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pipeline on a synthetic armband and print recognition events
    Run {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Centroid model JSON; a built-in demo model is used when omitted
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long, default_value_t = 10)]
        seconds: u64,
        /// Run a rest-state calibration before recognising
        #[arg(long)]
        calibrate: bool,
    },
    /// Check that a model matches the configured window shape
    CheckModel {
        #[arg(long)]
        model: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the effective configuration
    DumpConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            model,
            seconds,
            calibrate,
        } => run_pipeline(config.as_deref(), model.as_deref(), seconds, calibrate),
        Commands::CheckModel { model, config } => run_check_model(&model, config.as_deref()),
        Commands::DumpConfig { config } => run_dump_config(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> AppConfig {
    path.map(AppConfig::load_from_file).unwrap_or_default()
}

/// Rest centroid plus one per channel group: lower half -> extension, upper half -> flexion
fn demo_classifier(config: &AppConfig) -> Result<NearestCentroidClassifier> {
    let window = config.window.window_size;
    let channels = config.window.channel_count;
    let half = channels / 2;
    let level = config.window.preprocess.apply(30);
    let rest = config.window.preprocess.apply(2);

    let burst = |active: std::ops::Range<usize>| -> Vec<f32> {
        (0..window)
            .flat_map(|_| (0..channels).map(|ch| if active.contains(&ch) { level } else { rest }))
            .collect()
    };

    let centroids = vec![
        Centroid {
            label: 0,
            vector: burst(0..0),
        },
        Centroid {
            label: 2,
            vector: burst(0..half),
        },
        Centroid {
            label: 1,
            vector: burst(half..channels),
        },
    ];
    NearestCentroidClassifier::from_centroids(config.window.input_len(), centroids)
        .context("building demo classifier")
}

fn run_pipeline(
    config_path: Option<&Path>,
    model_path: Option<&Path>,
    seconds: u64,
    calibrate: bool,
) -> Result<ExitCode> {
    let config = load_config(config_path);
    let classifier: Arc<dyn Classifier> = match model_path {
        Some(path) => Arc::new(
            NearestCentroidClassifier::load_from_file(path)
                .with_context(|| format!("loading model {}", path.display()))?,
        ),
        None => Arc::new(demo_classifier(&config)?),
    };

    let source = SyntheticSource::new(config.window.channel_count, config.source.sample_rate_hz);
    let MailboxChannels {
        sender,
        receiver: mut mailbox,
    } = UiMailbox::new(config.dispatch.mailbox_capacity);
    let pipeline = Pipeline::new(config, classifier, Box::new(source), sender)
        .context("creating pipeline")?;
    let mut events = pipeline.subscribe_events();

    pipeline.start().context("starting pipeline")?;

    if calibrate {
        pipeline.start_calibration().context("starting calibration")?;
        let report = pipeline.wait_calibration().context("calibrating")?;
        println!("{}", serde_json::to_string(&CliLine::Calibration(&report))?);
    }

    // This thread plays the UI: it owns the brush and pumps the mailbox.
    let mut brush = BrushSize::default();
    let deadline = Instant::now() + Duration::from_secs(seconds);
    while Instant::now() < deadline {
        loop {
            match events.try_recv() {
                Ok(event) => {
                    if event.action.is_some() {
                        println!("{}", serde_json::to_string(&CliLine::Event(&event))?);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("[emg_cli] Skipped {} events", skipped);
                }
                Err(_) => break,
            }
        }
        let summary = mailbox.pump(&mut brush);
        if summary.applied > 0 {
            println!(
                "{}",
                serde_json::to_string(&CliLine::Brush { size: brush.get() })?
            );
        }
        thread::sleep(Duration::from_millis(16));
    }

    pipeline.stop().context("stopping pipeline")?;
    println!(
        "{}",
        serde_json::to_string(&CliLine::Stats(&pipeline.stats()))?
    );
    Ok(ExitCode::from(0))
}

fn run_check_model(model_path: &Path, config_path: Option<&Path>) -> Result<ExitCode> {
    let config = load_config(config_path);
    let model = NearestCentroidClassifier::load_from_file(model_path)
        .with_context(|| format!("loading model {}", model_path.display()))?;

    match check_shape(
        &model,
        config.window.window_size,
        config.window.channel_count,
    ) {
        Ok(()) => {
            println!(
                "ok: input length {} ({} x {}), labels {:?}",
                model.input_len(),
                config.window.window_size,
                config.window.channel_count,
                model.labels()
            );
            Ok(ExitCode::from(0))
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(ExitCode::from(2))
        }
    }
}

fn run_dump_config(config_path: Option<&Path>) -> Result<ExitCode> {
    let config = load_config(config_path);
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
enum CliLine<'a> {
    Calibration(&'a emg_gesture::CalibrationReport),
    Event(&'a emg_gesture::RecognitionEvent),
    Brush { size: u32 },
    Stats(&'a emg_gesture::StatsSnapshot),
}
