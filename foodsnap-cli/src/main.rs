// FoodSnap command line interface
// Identify food in a photo and look up its nutrition

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use foodsnap_api::{AppConfig, FoodSnap};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "foodsnap")]
#[command(about = "FoodSnap - food recognition and nutrition lookup", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (JSON, TOML or YAML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify the food in an image and resolve its nutrition
    Predict {
        /// Image file (JPEG or PNG)
        image: PathBuf,

        /// MIME type; guessed from the extension when omitted
        #[arg(long)]
        mime: Option<String>,

        /// Confidence threshold override
        #[arg(long, short)]
        threshold: Option<f32>,

        /// Model directory override
        #[arg(long, short)]
        model: Option<PathBuf>,

        /// Include the raw prediction (confidence, size, regions)
        #[arg(long, short)]
        detailed: bool,
    },

    /// Look up nutrition for a food name
    Nutrition {
        /// Food name, e.g. "paneer butter masala"
        food: String,
    },

    /// Show model and provider status
    Health,
}

#[derive(Serialize)]
struct DetailedOutput<'a> {
    prediction: &'a foodsnap_api::PredictionResult,
    response: &'a foodsnap_api::PredictionResponse,
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

fn guess_mime(path: &Path) -> anyhow::Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => Ok("image/jpeg"),
        Some("png") => Ok("image/png"),
        _ => bail!("Cannot infer image type of {:?}; pass --mime", path),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs);

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Predict {
            image,
            mime,
            threshold,
            model,
            detailed,
        } => {
            if let Some(threshold) = threshold {
                config.vision.confidence_threshold = threshold;
            }
            if let Some(model) = model {
                config.vision.model_path = Some(model);
            }

            let mime = match mime {
                Some(mime) => mime,
                None => guess_mime(&image)?.to_string(),
            };
            let bytes = std::fs::read(&image).with_context(|| format!("Failed to read {:?}", image))?;
            debug!("Read {} bytes from {:?} as {}", bytes.len(), image, mime);

            let app = FoodSnap::new(config)?;
            let analysis = match app.analyze_detailed(bytes, &mime).await {
                Ok(analysis) => analysis,
                Err(e) => {
                    eprintln!("{}", serde_json::to_string(&e.to_response())?);
                    bail!("Prediction failed with status {}", e.status_code());
                }
            };

            info!("Prediction {:?} complete", analysis.response.prediction_id);
            if detailed {
                print_json(&DetailedOutput {
                    prediction: &analysis.prediction,
                    response: &analysis.response,
                })?;
            } else {
                print_json(&analysis.response)?;
            }
        }

        Commands::Nutrition { food } => {
            let app = FoodSnap::new(config)?;
            print_json(&app.nutrition(&food).await)?;
        }

        Commands::Health => {
            let app = FoodSnap::new(config)?;
            print_json(&app.health())?;
        }
    }

    Ok(())
}
