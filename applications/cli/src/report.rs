//! Result formatting

use refrain_core::DuplicateGroup;
use refrain_index::DuplicateIndex;
use serde::Serialize;

/// One duplicate group resolved to paths
#[derive(Debug, Serialize)]
pub struct GroupReport {
    pub avg_similarity: f64,
    pub files: Vec<String>,
}

/// Full scan report
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub scanned_files: usize,
    pub indexed_files: usize,
    pub duplicate_groups: Vec<GroupReport>,
}

impl ScanReport {
    /// Resolve group member ids to paths against the index
    pub fn new(index: &DuplicateIndex, scanned_files: usize, groups: &[DuplicateGroup]) -> Self {
        let duplicate_groups = groups
            .iter()
            .map(|group| GroupReport {
                avg_similarity: group.avg_similarity,
                files: group
                    .files
                    .iter()
                    .filter_map(|&id| index.get_file(id).map(|f| f.path().to_string()))
                    .collect(),
            })
            .collect();

        Self {
            scanned_files,
            indexed_files: index.file_count(),
            duplicate_groups,
        }
    }

    /// Human-readable listing
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if self.duplicate_groups.is_empty() {
            out.push_str(&format!(
                "No duplicates found among {} files.\n",
                self.indexed_files
            ));
            return out;
        }

        out.push_str(&format!(
            "{} duplicate group(s) among {} files:\n",
            self.duplicate_groups.len(),
            self.indexed_files
        ));
        for (i, group) in self.duplicate_groups.iter().enumerate() {
            out.push_str(&format!(
                "\nGroup {} (similarity {:.1}%):\n",
                i + 1,
                group.avg_similarity * 100.0
            ));
            for file in &group.files {
                out.push_str(&format!("  {file}\n"));
            }
        }
        out
    }

    /// JSON rendering
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
