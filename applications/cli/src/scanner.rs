//! File scanning for audio files

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Supported audio file extensions
const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "wav", "aac", "m4a", "opus"];

/// Scanner for audio files in directories
#[derive(Default)]
pub struct FileScanner {
    /// Whether to follow symbolic links
    follow_links: bool,

    /// Maximum depth to traverse
    max_depth: Option<usize>,
}

impl FileScanner {
    /// Create a new file scanner
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to follow symbolic links
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Set maximum directory depth to traverse
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Collect audio files from a mix of file and directory paths
    ///
    /// Unreadable directories are logged and skipped; explicit non-audio
    /// file arguments are logged and skipped too. The result is sorted for
    /// stable downstream file ids.
    pub fn scan(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut audio_files = Vec::new();

        for path in paths {
            if path.is_file() {
                if is_audio_file(path) {
                    audio_files.push(path.clone());
                } else {
                    tracing::warn!(path = %path.display(), "not a supported audio file, skipping");
                }
                continue;
            }
            if !path.is_dir() {
                tracing::warn!(path = %path.display(), "path does not exist, skipping");
                continue;
            }

            let mut walker = WalkDir::new(path).follow_links(self.follow_links);
            if let Some(depth) = self.max_depth {
                walker = walker.max_depth(depth);
            }

            for entry in walker.into_iter().filter_map(|e| e.ok()) {
                let entry_path = entry.path();
                if entry_path.is_file() && is_audio_file(entry_path) {
                    audio_files.push(entry_path.to_path_buf());
                }
            }
        }

        audio_files.sort();
        audio_files.dedup();
        audio_files
    }
}

/// Check if a file has a supported audio extension
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let lower = ext.to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}
