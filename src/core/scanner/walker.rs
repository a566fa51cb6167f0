//! Label directory walking implementation using walkdir.

use super::{filter::ImageFilter, EnrollmentScanner, EnrollmentUnit, ScanResult};
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent};
use std::path::Path;
use walkdir::WalkDir;

/// Configuration for the enrollment scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Custom extensions to include (None = use defaults)
    pub extensions: Option<Vec<String>>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            include_hidden: false,
            extensions: None,
        }
    }
}

/// Scanner implementation using the walkdir crate.
///
/// Walks exactly two levels: immediate subdirectories of the root are
/// identity labels, and regular files directly inside a label directory
/// are candidate enrollment photos. Deeper nesting is ignored.
pub struct LabelDirScanner {
    config: ScanConfig,
    filter: ImageFilter,
}

impl LabelDirScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = ImageFilter::new().with_hidden(config.include_hidden);

        if let Some(ref extensions) = config.extensions {
            filter = filter.with_extensions(extensions.clone());
        }

        Self { config, filter }
    }

    /// Enumerate the immediate subdirectories of the root.
    ///
    /// Any error here means the root itself is unreadable, which is fatal.
    fn list_label_dirs(&self, root: &Path) -> Result<Vec<(String, std::path::PathBuf)>, ScanError> {
        let mut labels = Vec::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(self.config.follow_symlinks);

        for entry_result in walker {
            let entry = entry_result.map_err(|e| {
                let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
                ScanError::ReadDirectory {
                    path,
                    source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                }
            })?;

            if !entry.file_type().is_dir() {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                continue;
            };

            if !self.config.include_hidden && name.starts_with('.') {
                continue;
            }

            labels.push((name.to_string(), entry.path().to_path_buf()));
        }

        Ok(labels)
    }

    /// Collect supported image files directly inside one label directory.
    ///
    /// Entry-level errors are recorded but do not abort the scan.
    fn scan_label_dir(
        &self,
        label: &str,
        dir: &Path,
        units: &mut Vec<EnrollmentUnit>,
        errors: &mut Vec<ScanError>,
        events: &EventSender,
    ) {
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(self.config.follow_symlinks);

        for entry_result in walker {
            match entry_result {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }

                    if !self.filter.should_include(entry.path()) {
                        continue;
                    }

                    let unit = EnrollmentUnit {
                        image_path: entry.path().to_path_buf(),
                        label: label.to_string(),
                    };

                    events.send(Event::Scan(ScanEvent::PhotoFound {
                        path: unit.image_path.clone(),
                        label: unit.label.clone(),
                    }));

                    units.push(unit);
                }
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    let error = ScanError::ReadDirectory {
                        path: path.clone(),
                        source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                    };

                    tracing::warn!(path = %path.display(), "failed to read enrollment entry");
                    events.send(Event::Scan(ScanEvent::Error {
                        path,
                        message: error.to_string(),
                    }));

                    errors.push(error);
                }
            }
        }
    }
}

impl EnrollmentScanner for LabelDirScanner {
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        self.scan_with_events(root, &crate::events::null_sender())
    }

    fn scan_with_events(
        &self,
        root: &Path,
        events: &EventSender,
    ) -> Result<ScanResult, ScanError> {
        if !root.exists() {
            return Err(ScanError::RootNotFound {
                path: root.to_path_buf(),
            });
        }

        if !root.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        events.send(Event::Scan(ScanEvent::Started {
            root: root.to_path_buf(),
        }));

        let label_dirs = self.list_label_dirs(root)?;

        if label_dirs.is_empty() {
            return Err(ScanError::NoLabelDirectories {
                path: root.to_path_buf(),
            });
        }

        let mut units = Vec::new();
        let mut errors = Vec::new();
        let mut labels = Vec::with_capacity(label_dirs.len());

        for (label, dir) in &label_dirs {
            events.send(Event::Scan(ScanEvent::LabelFound {
                label: label.clone(),
            }));
            labels.push(label.clone());

            self.scan_label_dir(label, dir, &mut units, &mut errors, events);
        }

        if units.is_empty() {
            return Err(ScanError::NoImagesFound {
                path: root.to_path_buf(),
            });
        }

        events.send(Event::Scan(ScanEvent::Completed {
            total_photos: units.len(),
            total_labels: labels.len(),
        }));

        Ok(ScanResult {
            units,
            labels,
            errors,
        })
    }
}
