//! File filtering logic for the scanner.

use std::path::Path;

/// Filters files to determine if they are supported enrollment images
pub struct ImageFilter {
    /// File extensions to include
    extensions: std::collections::HashSet<String>,
    /// Whether to include hidden files
    include_hidden: bool,
}

impl ImageFilter {
    /// Create a new filter with the default supported extensions
    pub fn new() -> Self {
        Self {
            extensions: Self::default_extensions().into_iter().collect(),
            include_hidden: false,
        }
    }

    /// The extension set accepted by default
    pub fn default_extensions() -> Vec<String> {
        vec![
            "png".to_string(),
            "jpg".to_string(),
            "jpeg".to_string(),
            "heic".to_string(),
            "heif".to_string(),
            "tiff".to_string(),
        ]
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Override the list of extensions to accept
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Check if a file should be included
    pub fn should_include(&self, path: &Path) -> bool {
        // Check if hidden
        if !self.include_hidden {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    return false;
                }
            }
        }

        // Check extension (case-insensitive)
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            let ext_lower = ext.to_lowercase();
            self.extensions.contains(&ext_lower)
        } else {
            false
        }
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new()
    }
}
