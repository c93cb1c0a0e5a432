use std::path::PathBuf;
use std::time::{Duration, Instant};

use agrodetect::{
    dataset_info, recommendations_for, ConnectorConfig, HubConfig, HubModelSource, InferenceConnector,
    ModelManager, PredictionResult, RecommendationRecord,
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding downloaded models
    #[arg(long, global = true)]
    models_dir: Option<PathBuf>,

    /// Give up on acquiring the model after this many seconds
    #[arg(long, global = true, default_value_t = 120)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify one or more leaf images
    Classify {
        images: Vec<PathBuf>,
        /// Skip the model and use simulated predictions
        #[arg(long)]
        demo: bool,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
        /// Number of ranked classes to show
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Show treatment guidance for a disease label
    Recommend {
        label: String,
        #[arg(long)]
        json: bool,
    },
    /// Download the model files into the local cache
    Download {
        /// Force a fresh download of the model files
        #[arg(short, long)]
        fresh: bool,
    },
    /// Show dataset details and whether the model can be loaded
    Info,
}

#[derive(Serialize)]
struct Report<'a> {
    image: String,
    prediction: &'a PredictionResult,
    label: &'static str,
    recommendations: RecommendationRecord,
}

fn hub_config(args: &Args) -> HubConfig {
    let mut config = HubConfig::default();
    if let Some(dir) = &args.models_dir {
        config.models_dir = dir.clone();
    }
    config
}

async fn download(config: HubConfig, fresh: bool) -> anyhow::Result<()> {
    let source = HubModelSource::new(config);
    let manager: &ModelManager = source.manager().await?;
    let model = &source.config().model;

    if fresh {
        info!("Fresh download requested - removing any existing model files...");
        manager.remove_download(model)?;
    }
    manager.ensure_model_downloaded(model).await?;
    println!("Model files ready in {}", manager.models_dir().display());
    Ok(())
}

fn print_result(path: &str, result: &PredictionResult, top: usize) {
    let advice = recommendations_for(result.predicted_label());
    println!("\n{}", path);
    if result.is_simulated() {
        println!("  [demo mode] simulated prediction, not a real diagnosis");
    }
    println!("  {}", result.summary());
    println!("  Top predictions:");
    for (class, probability) in result.top_k(top) {
        println!("    {}: {:.1}%", class, probability * 100.0);
    }
    println!("  Status: {} (severity: {})", advice.status, advice.severity);
    println!("  {}", advice.message);
    println!("  Actions:");
    for action in &advice.actions {
        println!("    - {}", action);
    }
    println!("  Prevention:");
    for item in &advice.prevention {
        println!("    - {}", item);
    }
}

async fn classify(
    connector: &InferenceConnector,
    images: &[PathBuf],
    json: bool,
    top: usize,
) -> anyhow::Result<()> {
    let start = Instant::now();
    for path in images {
        let display = path.display().to_string();
        let image = image::open(path).with_context(|| format!("Failed to open image {}", display))?;

        let (valid, reason) = connector.validate(Some(&image));
        if !valid {
            eprintln!("{}: {}", display, reason);
            continue;
        }

        let classification = connector.classify_detailed(&image).await?;
        info!("{} classified via {:?}", display, classification.path);
        let result = classification.result;

        if json {
            let report = Report {
                image: display,
                prediction: &result,
                label: result.predicted_label(),
                recommendations: recommendations_for(result.predicted_label()),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_result(&display, &result, top);
        }
    }
    info!("Classified {} image(s) in {:.2?}", images.len(), start.elapsed());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let connector_config = |force_simulated: bool| ConnectorConfig {
        acquire_timeout: Duration::from_secs(args.timeout_secs),
        force_simulated,
        ..ConnectorConfig::default()
    };

    match &args.command {
        Command::Classify { images, demo, json, top } => {
            if images.is_empty() {
                anyhow::bail!("No images given");
            }
            let connector = InferenceConnector::from_hub(hub_config(&args)).with_config(connector_config(*demo));
            classify(&connector, images, *json, *top).await?;
        }
        Command::Recommend { label, json } => {
            let advice = recommendations_for(label);
            if *json {
                println!("{}", serde_json::to_string_pretty(&advice)?);
            } else {
                println!("{} (severity: {})", advice.status, advice.severity);
                println!("{}", advice.message);
                for action in &advice.actions {
                    println!("  - {}", action);
                }
            }
        }
        Command::Download { fresh } => {
            download(hub_config(&args), *fresh).await?;
        }
        Command::Info => {
            let info = dataset_info();
            println!("{}", serde_json::to_string_pretty(&info)?);
            let connector = InferenceConnector::from_hub(hub_config(&args)).with_config(connector_config(false));
            if connector.is_model_available().await {
                println!("Model: available");
            } else {
                println!("Model: unavailable (demo mode)");
            }
        }
    }

    Ok(())
}
