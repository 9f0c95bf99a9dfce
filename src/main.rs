// Command line entry point: one document or a full submission, JSON on stdout

use clap::{Parser, Subcommand};
use docscan::config::Strategy;
use docscan::models::DocumentType;
use docscan::processing::TextRecognizer;
use docscan::utils::DocScanError;
use docscan::{DocumentProcessor, PipelineConfig, Submission};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "docscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract structured fields from photos of vehicle property cards and ID cards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a single document image
    Extract {
        /// Image file to process
        image: PathBuf,

        /// Document type (propiedad, cedula, or any other name for plain text)
        document_type: String,

        /// Recognition strategy (auto, variants, regions)
        #[arg(long)]
        strategy: Option<String>,

        /// Pipeline configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Process an ID card (front and/or back) and a vehicle property card together
    Submission {
        #[arg(long = "id-front")]
        id_front: Option<PathBuf>,

        #[arg(long = "id-back")]
        id_back: Option<PathBuf>,

        #[arg(long = "card-front")]
        card_front: Option<PathBuf>,

        /// Pipeline configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct ErrorOutput {
    error: String,
}

fn fail(message: String) -> ! {
    let output = ErrorOutput { error: message };
    match serde_json::to_string(&output) {
        Ok(json) => println!("{}", json),
        Err(_) => println!("{{\"error\": \"invalid arguments\"}}"),
    }
    process::exit(1);
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, DocScanError> {
    match path {
        Some(path) => PipelineConfig::load(path),
        None => Ok(PipelineConfig::default()),
    }
}

fn read_upload(path: Option<&Path>) -> Result<Option<Vec<u8>>, DocScanError> {
    path.map(|p| {
        std::fs::read(p).map_err(|e| DocScanError::IoError(format!("Failed to read {}: {}", p.display(), e)))
    })
    .transpose()
}

#[cfg(feature = "tesseract")]
fn build_recognizer(config: &PipelineConfig) -> Box<dyn TextRecognizer> {
    Box::new(docscan::processing::TesseractRecognizer::new(&config.recognition))
}

#[cfg(not(feature = "tesseract"))]
fn build_recognizer(_config: &PipelineConfig) -> Box<dyn TextRecognizer> {
    log::warn!("Built without an OCR backend; every document will come back empty");
    Box::new(docscan::processing::UnavailableRecognizer)
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(format!("Failed to serialize result: {}", e)),
    }
}

fn run(cli: Cli) -> Result<(), DocScanError> {
    match cli.command {
        Commands::Extract {
            image,
            document_type,
            strategy,
            config,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(strategy) = strategy {
                config.strategy = strategy.parse::<Strategy>()?;
            }
            let document_type = DocumentType::parse(&document_type);
            let processor = DocumentProcessor::with_config(build_recognizer(&config), config);

            info!("Extracting {} from {}", document_type.as_str(), image.display());
            let record = processor.process_path(&image, &document_type);
            print_json(&record);
        }
        Commands::Submission {
            id_front,
            id_back,
            card_front,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let submission = Submission {
                id_front: read_upload(id_front.as_deref())?,
                id_back: read_upload(id_back.as_deref())?,
                card_front: read_upload(card_front.as_deref())?,
            };
            let processor = DocumentProcessor::with_config(build_recognizer(&config), config);

            let record = processor.process_submission(&submission);
            print_json(&record);
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => e.exit(),
            _ => fail(e.to_string().trim().to_string()),
        },
    };

    if let Err(e) = run(cli) {
        fail(e.to_string());
    }
}
