//! # CLI Module
//!
//! Command-line interface for the face gallery enroller.
//!
//! ## Usage
//! ```bash
//! # Enroll every labeled photo under ./Enrollment
//! face-enroll enroll ./Enrollment --output face_encodings.bin
//!
//! # Tune the accuracy/latency tradeoff
//! face-enroll enroll ./Enrollment --jitter 100 --max-side 1200
//!
//! # Summarize an existing store
//! face-enroll inspect face_encodings.bin
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use face_gallery::core::face::{DetectorVariant, OnnxFaceEncoder, OnnxFaceLocator};
use face_gallery::core::pipeline::{EnrollmentReport, Pipeline};
use face_gallery::core::scanner::ScanConfig;
use face_gallery::core::store::EncodingStore;
use face_gallery::core::worker::{EnrollWorker, WorkerConfig, WorkerFactory};
use face_gallery::error::{EncodeError, EnrollError, Result, ScanError};
use face_gallery::events::{EncodeEvent, Event, EventChannel, PipelineEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// Expected model file names inside the models directory
const FAST_DETECTOR_FILE: &str = "version-RFB-320.onnx";
const SLOW_DETECTOR_FILE: &str = "version-RFB-640.onnx";
const ENCODER_FILE: &str = "w600k_r50.onnx";

/// Face Gallery - enroll labeled reference photos into an encoding store
#[derive(Parser, Debug)]
#[command(name = "face-enroll")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a labeled directory tree and build the encoding store
    Enroll {
        /// Enrollment root: one subdirectory per person
        root: PathBuf,

        /// Destination path of the encoding store
        #[arg(short, long, default_value = "face_encodings.bin")]
        output: PathBuf,

        /// Directory containing the ONNX face models
        #[arg(long, default_value = "models")]
        models: PathBuf,

        /// Randomized encoding passes per face (higher = more robust, slower)
        #[arg(short, long, default_value = "70")]
        jitter: u32,

        /// Cap on the longest image dimension before detection
        #[arg(long, default_value = "1600")]
        max_side: u32,

        /// Worker pool size (defaults to the number of CPU cores)
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Only accept these file extensions (defaults to the standard set)
        #[arg(long, value_delimiter = ',')]
        extensions: Option<Vec<String>>,

        /// Include hidden files and directories
        #[arg(long)]
        include_hidden: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        format: OutputFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Summarize an existing encoding store
    Inspect {
        /// Path to the encoding store
        store: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Enroll {
            root,
            output,
            models,
            jitter,
            max_side,
            concurrency,
            extensions,
            include_hidden,
            format,
            verbose,
        } => run_enroll(EnrollArgs {
            root,
            output,
            models,
            jitter,
            max_side,
            concurrency,
            extensions,
            include_hidden,
            format,
            verbose,
        }),
        Commands::Inspect { store, format } => run_inspect(&store, format),
    }
}

struct EnrollArgs {
    root: PathBuf,
    output: PathBuf,
    models: PathBuf,
    jitter: u32,
    max_side: u32,
    concurrency: Option<usize>,
    extensions: Option<Vec<String>>,
    include_hidden: bool,
    format: OutputFormat,
    verbose: bool,
}

/// Build the factory that gives each worker thread its own model sessions.
///
/// The underlying inference sessions are not shareable across threads, so
/// the factory re-loads them per worker.
fn onnx_worker_factory(models: &Path) -> Result<Arc<dyn WorkerFactory>> {
    let fast_path = models.join(FAST_DETECTOR_FILE);
    let slow_path = models.join(SLOW_DETECTOR_FILE);
    let encoder_path = models.join(ENCODER_FILE);

    for path in [&fast_path, &slow_path, &encoder_path] {
        if !path.exists() {
            return Err(EnrollError::Config(format!(
                "model file not found: {} (download the UltraFace/ArcFace ONNX models into {})",
                path.display(),
                models.display()
            )));
        }
    }

    let factory = move || -> std::result::Result<EnrollWorker, EncodeError> {
        let fast = OnnxFaceLocator::load(&fast_path, DetectorVariant::Fast)?;
        let slow = OnnxFaceLocator::load(&slow_path, DetectorVariant::Accurate)?;
        let encoder = OnnxFaceEncoder::load(&encoder_path)?;

        Ok(EnrollWorker::new(
            Box::new(fast),
            Box::new(slow),
            Box::new(encoder),
            WorkerConfig::default(),
        ))
    };

    Ok(Arc::new(factory))
}

fn run_enroll(args: EnrollArgs) -> Result<()> {
    let term = Term::stderr();

    // Print header
    if matches!(args.format, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Face Gallery").bold().cyan(),
            style(env!("CARGO_PKG_VERSION")).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let factory = onnx_worker_factory(&args.models)?;

    let scan_config = ScanConfig {
        include_hidden: args.include_hidden,
        extensions: args.extensions.clone(),
        ..Default::default()
    };

    let worker_config = WorkerConfig {
        max_image_side: args.max_side,
        jitter_count: args.jitter,
    };

    let pipeline = Pipeline::builder()
        .root(&args.root)
        .output(&args.output)
        .scan_config(scan_config)
        .worker_config(worker_config)
        .concurrency(args.concurrency)
        .worker_factory(factory)
        .build()?;

    // Set up event handling
    let (sender, receiver) = EventChannel::new();

    // Progress bar for pretty output
    let progress = if matches!(args.format, OutputFormat::Pretty) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let verbose = args.verbose;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.set_message(format!("{}", phase));
                    }
                }
                Event::Encode(EncodeEvent::Started { total_photos }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.set_length(total_photos as u64);
                    }
                }
                Event::Encode(EncodeEvent::Progress(p)) => {
                    if let Some(ref pb) = progress_clone {
                        pb.set_position(p.completed as u64);
                        if verbose {
                            pb.set_message(
                                p.current_path
                                    .file_name()
                                    .unwrap_or_default()
                                    .to_string_lossy()
                                    .to_string(),
                            );
                        }
                    }
                }
                Event::Encode(EncodeEvent::Skipped { path, message }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.println(format!(
                            "{} {}: {}",
                            style("warning:").yellow().bold(),
                            path.display(),
                            message
                        ));
                    }
                }
                Event::Pipeline(PipelineEvent::Completed { .. }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.finish_and_clear();
                    }
                }
                _ => {}
            }
        }
    });

    // Run the pipeline
    let result = pipeline.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    match result {
        Ok(report) => {
            match args.format {
                OutputFormat::Pretty => print_pretty_report(&term, &report),
                OutputFormat::Json => print_json_report(&report),
            }
            Ok(())
        }
        // An enrollment tree with nothing to do is a warning, not a failure.
        Err(EnrollError::Scan(
            e @ (ScanError::NoLabelDirectories { .. } | ScanError::NoImagesFound { .. }),
        )) => {
            if let Some(pb) = progress {
                pb.finish_and_clear();
            }
            term.write_line(&format!("{} {}", style("warning:").yellow().bold(), e))
                .ok();
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn print_pretty_report(term: &Term, report: &EnrollmentReport) {
    term.write_line("").ok();
    term.write_line(&format!(
        "{} Enrollment Complete",
        style("✓").green().bold()
    ))
    .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} photos processed in {:.1}s",
        style(report.total_photos).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();

    term.write_line(&format!(
        "  {} faces encoded for {} identities",
        style(report.encoded).cyan(),
        style(report.identities).cyan()
    ))
    .ok();

    if report.skipped > 0 {
        term.write_line(&format!(
            "  {} photos skipped (see warnings above)",
            style(report.skipped).yellow()
        ))
        .ok();
    }

    term.write_line("").ok();

    match &report.store_path {
        Some(path) => {
            term.write_line(&format!(
                "  Encoding store written to {}",
                style(path.display()).bold()
            ))
            .ok();
        }
        None => {
            term.write_line(&format!(
                "  {} No faces were encoded; the store was not written.",
                style("!").yellow().bold()
            ))
            .ok();
        }
    }
}

fn print_json_report(report: &EnrollmentReport) {
    let output = serde_json::json!({
        "total_photos": report.total_photos,
        "encoded": report.encoded,
        "skipped": report.skipped,
        "identities": report.identities,
        "store_path": report.store_path,
        "errors": report.errors,
        "duration_ms": report.duration_ms,
    });

    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}

fn run_inspect(store_path: &Path, format: OutputFormat) -> Result<()> {
    let store = EncodingStore::load(store_path)?;

    let mut per_label: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dimension = 0usize;
    for (label, signature) in store.iter() {
        *per_label.entry(label).or_default() += 1;
        dimension = signature.len();
    }

    match format {
        OutputFormat::Pretty => {
            let term = Term::stdout();
            term.write_line(&format!(
                "{} ({} records, {} identities, {}-dim signatures)",
                style(store_path.display()).bold(),
                store.len(),
                per_label.len(),
                dimension
            ))
            .ok();

            for (label, count) in &per_label {
                term.write_line(&format!("  {:>4}  {}", count, label)).ok();
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "store_path": store_path,
                "records": store.len(),
                "identities": per_label.len(),
                "signature_dimension": dimension,
                "per_label": per_label,
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap());
        }
    }

    Ok(())
}
