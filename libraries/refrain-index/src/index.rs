//! Thread-safe index façade
//!
//! Owns every registered fingerprint (dense table keyed by `FileId`) plus
//! the inverted hash index, behind a single-writer/multi-reader lock.
//! Configuration lives outside the lock as an atomically swapped immutable
//! snapshot: setters publish a fresh validated snapshot and queries keep the
//! one they loaded at entry, so a running query never sees a half-updated
//! configuration.

use crate::engine;
use crate::postings::InvertedIndex;
use arc_swap::ArcSwap;
use refrain_core::{DuplicateGroup, FileId, Fingerprint, MatchConfig, RefrainError, Result};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One owned fingerprint with its registered path
pub(crate) struct FileEntry {
    path: String,
    fingerprint: Fingerprint,
}

impl FileEntry {
    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

/// Everything guarded by the reader-writer lock
pub(crate) struct IndexState {
    pub(crate) files: Vec<FileEntry>,
    pub(crate) postings: InvertedIndex,
}

/// Read-only view of one registered file
///
/// Borrows from the index through a shared read guard, so the reference
/// stays valid exactly as long as the `FileRef` lives and writers are held
/// off for that long. Drop it promptly.
pub struct FileRef<'a> {
    guard: RwLockReadGuard<'a, IndexState>,
    id: FileId,
}

impl FileRef<'_> {
    /// Identifier of the file
    pub fn id(&self) -> FileId {
        self.id
    }

    /// Registered path
    pub fn path(&self) -> &str {
        self.guard.files[self.id.index()].path()
    }

    /// The owned fingerprint
    pub fn fingerprint(&self) -> &Fingerprint {
        self.guard.files[self.id.index()].fingerprint()
    }
}

/// Thread-safe fingerprint index and duplicate finder
///
/// # Example
///
/// ```rust
/// use refrain_core::Fingerprint;
/// use refrain_index::DuplicateIndex;
///
/// let index = DuplicateIndex::new();
/// let data: Vec<u32> = (0..100u32).map(|i| i.wrapping_mul(2654435761)).collect();
/// let fp = Fingerprint::new(data, 12.4, "/music/a.flac").unwrap();
/// index.add_file("/music/a.flac", fp.clone()).unwrap();
/// index.add_file("/music/a (copy).flac", fp).unwrap();
///
/// let groups = index.find_all_duplicates();
/// assert_eq!(groups.len(), 1);
/// ```
pub struct DuplicateIndex {
    state: RwLock<IndexState>,
    config: ArcSwap<MatchConfig>,
}

impl DuplicateIndex {
    /// Create an empty index with the default configuration
    pub fn new() -> Self {
        Self {
            state: RwLock::new(IndexState {
                files: Vec::new(),
                postings: InvertedIndex::new(),
            }),
            config: ArcSwap::from_pointee(MatchConfig::default()),
        }
    }

    /// Create an empty index with a validated configuration
    pub fn with_config(config: MatchConfig) -> Result<Self> {
        config.validate()?;
        let index = Self::new();
        index.config.store(Arc::new(config));
        Ok(index)
    }

    /// Register one fingerprint and index its hashes
    ///
    /// Takes the writer lock once; linear in the fingerprint length.
    pub fn add_file(&self, path: impl Into<String>, fingerprint: Fingerprint) -> Result<FileId> {
        let path = path.into();
        let mut state = self.write();
        Ok(register(&mut state, path, fingerprint))
    }

    /// Register a batch of fingerprints under a single writer lock
    pub fn add_files_batch(
        &self,
        entries: Vec<(String, Fingerprint)>,
    ) -> Result<Vec<FileId>> {
        let mut state = self.write();
        Ok(entries
            .into_iter()
            .map(|(path, fingerprint)| register(&mut state, path, fingerprint))
            .collect())
    }

    /// Candidate duplicates of a registered file
    ///
    /// The file itself appears in its own candidate list; skip it when
    /// comparing. An unknown id yields an empty list.
    ///
    /// # Errors
    /// `RefrainError::NotInitialized` when the index holds no files.
    pub fn candidates(&self, file_id: FileId) -> Result<Vec<FileId>> {
        let config = self.config.load();
        let state = self.read();
        if state.files.is_empty() {
            return Err(RefrainError::NotInitialized);
        }
        let Some(entry) = state.files.get(file_id.index()) else {
            return Ok(Vec::new());
        };
        Ok(state
            .postings
            .candidates(entry.fingerprint(), config.hash_threshold)
            .into_iter()
            .map(|(id, _hits)| id)
            .collect())
    }

    /// Candidate duplicates of an unregistered query fingerprint
    ///
    /// # Errors
    /// `RefrainError::NotInitialized` when the index holds no files.
    pub fn candidates_for(&self, fingerprint: &Fingerprint) -> Result<Vec<FileId>> {
        let config = self.config.load();
        let state = self.read();
        if state.files.is_empty() {
            return Err(RefrainError::NotInitialized);
        }
        Ok(state
            .postings
            .candidates(fingerprint, config.hash_threshold)
            .into_iter()
            .map(|(id, _hits)| id)
            .collect())
    }

    /// Discover all duplicate groups, single-threaded
    pub fn find_all_duplicates(&self) -> Vec<DuplicateGroup> {
        let config = self.config.load_full();
        let state = self.read();
        engine::discover(&state, &config)
    }

    /// Discover all duplicate groups on a rayon pool
    ///
    /// `num_threads` bounds the pool; `None` uses the global pool.
    pub fn find_all_duplicates_parallel(
        &self,
        num_threads: Option<usize>,
    ) -> Vec<DuplicateGroup> {
        let config = self.config.load_full();
        let state = self.read();
        engine::discover_parallel(&state, &config, num_threads)
    }

    /// Read-only view of one file; `None` for unknown ids
    pub fn get_file(&self, file_id: FileId) -> Option<FileRef<'_>> {
        let guard = self.read();
        if file_id.index() < guard.files.len() {
            Some(FileRef {
                guard,
                id: file_id,
            })
        } else {
            None
        }
    }

    /// Number of registered files
    pub fn file_count(&self) -> usize {
        self.read().files.len()
    }

    /// Total postings across all hash keys
    pub fn posting_count(&self) -> usize {
        self.read().postings.posting_count()
    }

    /// Whether no files are registered
    pub fn is_empty(&self) -> bool {
        self.read().files.is_empty()
    }

    /// Drop every file and posting
    pub fn clear(&self) {
        let mut state = self.write();
        state.files.clear();
        state.postings.clear();
    }

    /// The current configuration snapshot
    pub fn config(&self) -> Arc<MatchConfig> {
        self.config.load_full()
    }

    /// Replace the whole configuration
    pub fn set_config(&self, config: MatchConfig) -> Result<()> {
        config.validate()?;
        self.config.store(Arc::new(config));
        Ok(())
    }

    /// Set the minimum similarity for a duplicate verdict
    pub fn set_similarity_threshold(&self, threshold: f64) -> Result<()> {
        self.update_config(|config| config.similarity_threshold = threshold)
    }

    /// Set the maximum bit error rate for a duplicate verdict
    pub fn set_bit_error_threshold(&self, threshold: f64) -> Result<()> {
        self.update_config(|config| config.bit_error_threshold = threshold)
    }

    /// Set the minimum overlap (in words) required of a comparable pair
    pub fn set_minimum_overlap(&self, overlap: usize) -> Result<()> {
        self.update_config(|config| config.minimum_overlap = overlap)
    }

    /// Set the half-range of the alignment search (in words)
    pub fn set_max_alignment_offset(&self, offset: usize) -> Result<()> {
        self.update_config(|config| config.max_alignment_offset = offset)
    }

    /// Set the minimum distinct hash hits for candidate retrieval
    pub fn set_hash_threshold(&self, threshold: usize) -> Result<()> {
        self.update_config(|config| config.hash_threshold = threshold)
    }

    /// Validate and atomically publish a modified snapshot
    fn update_config(&self, mutate: impl FnOnce(&mut MatchConfig)) -> Result<()> {
        let mut next = MatchConfig::clone(&self.config.load());
        mutate(&mut next);
        next.validate()?;
        self.config.store(Arc::new(next));
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DuplicateIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Append one entry and its postings under an already-held writer lock
fn register(state: &mut IndexState, path: String, fingerprint: Fingerprint) -> FileId {
    let file_id = FileId::new(state.files.len() as u32);
    let words = fingerprint.len();
    state.postings.insert(file_id, &fingerprint);
    state.files.push(FileEntry { path, fingerprint });
    tracing::debug!(%file_id, words, "registered fingerprint");
    file_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use refrain_core::SUBFINGERPRINT_DURATION_SECONDS;

    fn fp(data: Vec<u32>, path: &str) -> Fingerprint {
        let duration = data.len() as f64 * SUBFINGERPRINT_DURATION_SECONDS;
        Fingerprint::new(data, duration, path).unwrap()
    }

    #[test]
    fn ids_are_assigned_densely() {
        let index = DuplicateIndex::new();
        let first = index.add_file("a", fp(vec![1; 20], "a")).unwrap();
        let second = index.add_file("b", fp(vec![2; 20], "b")).unwrap();

        assert_eq!(first, FileId::new(0));
        assert_eq!(second, FileId::new(1));
        assert_eq!(index.file_count(), 2);
    }

    #[test]
    fn get_file_borrows_path_and_fingerprint() {
        let index = DuplicateIndex::new();
        let id = index.add_file("/music/x.flac", fp(vec![5; 30], "/music/x.flac")).unwrap();

        let file = index.get_file(id).expect("file should exist");
        assert_eq!(file.id(), id);
        assert_eq!(file.path(), "/music/x.flac");
        assert_eq!(file.fingerprint().len(), 30);
    }

    #[test]
    fn get_file_returns_none_for_unknown_ids() {
        let index = DuplicateIndex::new();
        assert!(index.get_file(FileId::new(0)).is_none());

        index.add_file("a", fp(vec![1; 20], "a")).unwrap();
        assert!(index.get_file(FileId::new(1)).is_none());
    }

    #[test]
    fn candidates_on_an_empty_index_fail() {
        let index = DuplicateIndex::new();
        let err = index.candidates(FileId::new(0)).unwrap_err();
        assert!(matches!(err, RefrainError::NotInitialized));

        let query = fp(vec![1; 20], "q");
        assert!(matches!(
            index.candidates_for(&query),
            Err(RefrainError::NotInitialized)
        ));
    }

    #[test]
    fn candidates_for_an_unknown_id_are_empty() {
        let index = DuplicateIndex::new();
        index.add_file("a", fp(vec![1; 20], "a")).unwrap();
        assert!(index.candidates(FileId::new(9)).unwrap().is_empty());
    }

    #[test]
    fn clear_resets_everything() {
        let index = DuplicateIndex::new();
        index.add_file("a", fp(vec![1; 20], "a")).unwrap();
        index.clear();

        assert!(index.is_empty());
        assert!(index.get_file(FileId::new(0)).is_none());
        assert!(matches!(
            index.candidates(FileId::new(0)),
            Err(RefrainError::NotInitialized)
        ));
    }

    #[test]
    fn invalid_configuration_is_rejected_and_not_published() {
        let index = DuplicateIndex::new();
        assert!(index.set_similarity_threshold(1.5).is_err());
        assert_eq!(index.config().similarity_threshold, 0.85);

        index.set_similarity_threshold(0.9).unwrap();
        assert_eq!(index.config().similarity_threshold, 0.9);
    }

    #[test]
    fn config_snapshots_are_immutable() {
        let index = DuplicateIndex::new();
        let snapshot = index.config();
        index.set_similarity_threshold(0.99).unwrap();

        // The earlier snapshot is untouched by the publish.
        assert_eq!(snapshot.similarity_threshold, 0.85);
        assert_eq!(index.config().similarity_threshold, 0.99);
    }
}
