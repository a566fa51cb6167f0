//! # Dispatcher Module
//!
//! Fans enrollment units out across a rayon worker pool and collects
//! results as they complete.
//!
//! ## Isolation
//! The detection/encoding backends are not safe to share across
//! concurrent invocations, so every pool thread builds its own
//! [`EnrollWorker`] through the factory (`map_init`). Workers communicate
//! results by value over a channel; the collector is the sole owner of
//! the accumulating store, so no locking is needed anywhere.
//!
//! ## Ordering
//! Results are appended in completion order, not submission order. The
//! record order inside the store is therefore non-deterministic across
//! runs with the same input set.

use crate::core::scanner::EnrollmentUnit;
use crate::core::store::EncodingStore;
use crate::core::worker::WorkerFactory;
use crate::error::{DispatchError, EncodeError};
use crate::events::{EncodeEvent, EncodeProgress, Event, EventSender};
use rayon::prelude::*;

/// Result of dispatching a full work list
#[derive(Debug)]
pub struct DispatchResult {
    /// Accumulated (label, signature) records, in completion order
    pub store: EncodingStore,
    /// Units processed, successful or not
    pub completed: usize,
    /// Units that contributed nothing
    pub skipped: usize,
}

/// Distributes per-image work across parallel workers.
pub struct Dispatcher {
    concurrency: usize,
}

impl Dispatcher {
    /// Create a dispatcher with the given worker count.
    ///
    /// `None` sizes the pool to the number of available CPU cores.
    pub fn new(concurrency: Option<usize>) -> Self {
        Self {
            concurrency: concurrency.unwrap_or_else(num_cpus::get).max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Process every unit and collect the survivors into a store.
    ///
    /// Per-unit failures are reported as events and warnings, never as
    /// errors from this function. The only failure here is the pool
    /// itself refusing to start.
    pub fn run(
        &self,
        units: Vec<EnrollmentUnit>,
        factory: &dyn WorkerFactory,
        events: &EventSender,
    ) -> Result<DispatchResult, DispatchError> {
        let total = units.len();
        events.send(Event::Encode(EncodeEvent::Started {
            total_photos: total,
        }));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|i| format!("enroll-worker-{i}"))
            .build()
            .map_err(|e| DispatchError::PoolStart(e.to_string()))?;

        let (tx, rx) = crossbeam_channel::unbounded();

        let mut store = EncodingStore::new();
        let mut completed = 0usize;
        let mut skipped = 0usize;

        pool.in_place_scope(|scope| {
            scope.spawn(move |_| {
                units
                    .into_par_iter()
                    .map_init(
                        || factory.create(),
                        |worker, unit| {
                            let result = match worker {
                                Ok(w) => w.process(&unit),
                                Err(e) => Err(EncodeError::Inference(format!(
                                    "worker initialization failed: {e}"
                                ))),
                            };
                            (unit.image_path, result)
                        },
                    )
                    .for_each_with(tx, |tx, outcome| {
                        let _ = tx.send(outcome);
                    });
            });

            // Collection loop: single owner of the accumulating sequences,
            // appending strictly in completion order.
            for (path, result) in rx.iter() {
                completed += 1;

                match result {
                    Ok(face) => {
                        events.send(Event::Encode(EncodeEvent::FaceEncoded {
                            path: path.clone(),
                            label: face.label.clone(),
                        }));
                        store.push(face.label, face.signature);
                    }
                    Err(e) => {
                        skipped += 1;
                        tracing::warn!(path = %path.display(), "skipping image: {e}");
                        events.send(Event::Encode(EncodeEvent::Skipped {
                            path: path.clone(),
                            message: e.to_string(),
                        }));
                    }
                }

                events.send(Event::Encode(EncodeEvent::Progress(EncodeProgress {
                    completed,
                    total,
                    current_path: path,
                })));
            }
        });

        events.send(Event::Encode(EncodeEvent::Completed {
            encoded: store.len(),
            skipped,
        }));

        Ok(DispatchResult {
            store,
            completed,
            skipped,
        })
    }
}
