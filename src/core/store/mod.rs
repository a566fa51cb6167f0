//! # Store Module
//!
//! The persisted gallery artifact: every enrolled signature paired with
//! its identity label, positionally.
//!
//! ## Format
//! A single bincode-serialized binary file holding `{signatures, labels}`.
//! This is the handoff contract to the downstream matching process and
//! must stay stable across enrollment runs. A successful run fully
//! replaces any prior store; there is no merging.

use crate::core::face::Signature;
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// The gallery of enrolled identities.
///
/// `signatures[i]` and `labels[i]` form one enrolled record; the two
/// sequences are always the same length. [`push`](Self::push) is the only
/// mutator, so the invariant cannot be broken from outside.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncodingStore {
    signatures: Vec<Signature>,
    labels: Vec<String>,
}

impl EncodingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one enrolled record.
    pub fn push(&mut self, label: String, signature: Signature) {
        self.labels.push(label);
        self.signatures.push(signature);
    }

    /// Number of enrolled records
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Iterate over (label, signature) records
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Signature)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.signatures.iter())
    }

    /// Number of distinct identities with at least one record
    pub fn identity_count(&self) -> usize {
        self.labels
            .iter()
            .collect::<std::collections::HashSet<_>>()
            .len()
    }

    /// Serialize and write the store to `path`.
    ///
    /// Creates missing parent directories. The write is a direct
    /// overwrite of the destination, not a temp-file swap.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::Write {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let file = File::create(path).map_err(|e| StoreError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;

        bincode::serialize_into(BufWriter::new(file), self)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        tracing::info!(
            path = %path.display(),
            records = self.len(),
            "wrote encoding store"
        );

        Ok(())
    }

    /// Read a store back from `path`, validating the pairing invariant.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path).map_err(|e| StoreError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let store: EncodingStore = bincode::deserialize_from(BufReader::new(file))
            .map_err(|_| StoreError::Corrupted {
                path: path.to_path_buf(),
            })?;

        if store.signatures.len() != store.labels.len() {
            return Err(StoreError::Corrupted {
                path: path.to_path_buf(),
            });
        }

        Ok(store)
    }
}
