//! # Pipeline Module
//!
//! Orchestrates the full enrollment workflow: scan, encode, persist.
//!
//! ## Example
//! ```rust,ignore
//! let pipeline = Pipeline::builder()
//!     .root("Enrollment")
//!     .output("face_encodings.bin")
//!     .worker_factory(factory)
//!     .build()?;
//!
//! let report = pipeline.run()?;
//! println!("encoded {} faces", report.encoded);
//! ```

use crate::core::dispatcher::Dispatcher;
use crate::core::scanner::{EnrollmentScanner, LabelDirScanner, ScanConfig};
use crate::core::worker::{WorkerConfig, WorkerFactory};
use crate::error::EnrollError;
use crate::events::{
    null_sender, Event, EventSender, PipelineEvent, PipelinePhase, PipelineSummary, StoreEvent,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Result of a full enrollment run
#[derive(Debug)]
pub struct EnrollmentReport {
    /// Photos discovered by the scanner
    pub total_photos: usize,
    /// Faces successfully encoded
    pub encoded: usize,
    /// Photos that contributed nothing
    pub skipped: usize,
    /// Distinct identities enrolled
    pub identities: usize,
    /// Where the store was written; None when nothing was encoded
    pub store_path: Option<PathBuf>,
    /// Non-fatal errors encountered while scanning
    pub errors: Vec<String>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Enrollment root directory (one subdirectory per identity)
    pub root: PathBuf,
    /// Destination path of the encoding store
    pub output: PathBuf,
    /// Scanner configuration
    pub scan_config: ScanConfig,
    /// Per-image worker configuration
    pub worker_config: WorkerConfig,
    /// Worker pool size (None = available CPU cores)
    pub concurrency: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("Enrollment"),
            output: PathBuf::from("face_encodings.bin"),
            scan_config: ScanConfig::default(),
            worker_config: WorkerConfig::default(),
            concurrency: None,
        }
    }
}

/// Builder for the enrollment pipeline
pub struct PipelineBuilder {
    config: PipelineConfig,
    factory: Option<Arc<dyn WorkerFactory>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            factory: None,
        }
    }

    /// Set the enrollment root directory
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.root = root.into();
        self
    }

    /// Set the encoding store destination
    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.config.output = output.into();
        self
    }

    /// Set scanner configuration
    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.config.scan_config = config;
        self
    }

    /// Set per-image worker configuration
    pub fn worker_config(mut self, config: WorkerConfig) -> Self {
        self.config.worker_config = config;
        self
    }

    /// Set the worker pool size
    pub fn concurrency(mut self, concurrency: Option<usize>) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Include hidden files and directories
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.scan_config.include_hidden = include;
        self
    }

    /// Set the factory that builds per-thread workers
    pub fn worker_factory(mut self, factory: Arc<dyn WorkerFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> crate::Result<Pipeline> {
        let factory = self.factory.ok_or_else(|| {
            EnrollError::Config("pipeline requires a worker factory".to_string())
        })?;

        Ok(Pipeline {
            config: self.config,
            factory,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The enrollment pipeline
pub struct Pipeline {
    config: PipelineConfig,
    factory: Arc<dyn WorkerFactory>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline without events
    pub fn run(&self) -> crate::Result<EnrollmentReport> {
        self.run_with_events(&null_sender())
    }

    /// Run the pipeline with event reporting
    pub fn run_with_events(&self, events: &EventSender) -> crate::Result<EnrollmentReport> {
        let start_time = Instant::now();

        events.send(Event::Pipeline(PipelineEvent::Started));

        // Phase 1: Scanning
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Scanning,
        }));

        let scanner = LabelDirScanner::new(self.config.scan_config.clone());
        let scan_result = scanner.scan_with_events(&self.config.root, events)?;

        let errors: Vec<String> = scan_result.errors.iter().map(|e| e.to_string()).collect();
        let total_photos = scan_result.units.len();

        // Phase 2: Encoding
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Encoding,
        }));

        let dispatcher = Dispatcher::new(self.config.concurrency);
        tracing::info!(
            photos = total_photos,
            workers = dispatcher.concurrency(),
            "starting enrollment"
        );

        let configured = ConfiguredFactory {
            inner: self.factory.clone(),
            config: self.config.worker_config.clone(),
        };

        let dispatch = dispatcher.run(scan_result.units, &configured, events)?;
        let store = dispatch.store;

        // Phase 3: Writing
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Writing,
        }));

        let store_path = if store.is_empty() {
            tracing::warn!("enrollment complete, but no faces were successfully encoded");
            events.send(Event::Store(StoreEvent::NothingToWrite));
            None
        } else {
            events.send(Event::Store(StoreEvent::Writing {
                path: self.config.output.clone(),
                records: store.len(),
            }));

            store.save(&self.config.output)?;

            events.send(Event::Store(StoreEvent::Written {
                path: self.config.output.clone(),
                records: store.len(),
            }));

            Some(self.config.output.clone())
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        let summary = PipelineSummary {
            total_photos,
            encoded: store.len(),
            skipped: dispatch.skipped,
            identities: store.identity_count(),
            duration_ms,
        };

        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: summary.clone(),
        }));

        Ok(EnrollmentReport {
            total_photos,
            encoded: summary.encoded,
            skipped: summary.skipped,
            identities: summary.identities,
            store_path,
            errors,
            duration_ms,
        })
    }
}

/// Wraps the user-supplied factory so every worker it creates carries the
/// pipeline's worker configuration.
struct ConfiguredFactory {
    inner: Arc<dyn WorkerFactory>,
    config: WorkerConfig,
}

impl WorkerFactory for ConfiguredFactory {
    fn create(&self) -> Result<crate::core::worker::EnrollWorker, crate::error::EncodeError> {
        self.inner
            .create()
            .map(|w| w.with_config(self.config.clone()))
    }
}
