//! Artifact tracking and guaranteed cleanup for pipeline runs.

use crate::error::{RelayError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Tracks every file a pipeline run creates so it can all be removed when
/// the run finishes, successfully or not.
///
/// The segment directory is shared by all items of a run; it is created
/// lazily on first use. Segment file names are namespaced by item identity
/// and ordinal by the writer, so concurrent items never collide.
pub struct ArtifactStore {
    root: PathBuf,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    sources: Vec<PathBuf>,
    converted: Vec<PathBuf>,
    segment_dir_created: bool,
}

impl ArtifactStore {
    /// `root` is the directory segment files live under. Nothing is created
    /// until the first segment is written.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            state: Mutex::new(State::default()),
        }
    }

    /// Record a downloaded source file for later removal.
    pub fn register_source(&self, path: &Path) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.sources.iter().any(|p| p == path) {
            state.sources.push(path.to_path_buf());
        }
    }

    /// Record a converted waveform file for later removal.
    ///
    /// Call this before running the conversion: a conversion that fails
    /// half-way may still have written a partial file, and that partial file
    /// must be cleaned up with everything else.
    pub fn register_converted(&self, path: &Path) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.converted.iter().any(|p| p == path) {
            state.converted.push(path.to_path_buf());
        }
    }

    /// Path of the shared segment directory, creating it on first use.
    pub fn segment_dir(&self) -> Result<PathBuf> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.segment_dir_created {
            fs::create_dir_all(&self.root).map_err(|e| RelayError::ArtifactDir {
                path: self.root.display().to_string(),
                message: e.to_string(),
            })?;
            state.segment_dir_created = true;
        }
        Ok(self.root.clone())
    }

    /// Remove every artifact this run created: the segment directory tree,
    /// then converted waveforms, then downloaded sources.
    ///
    /// Idempotent, and never fails past its own boundary. Individual
    /// deletion failures are logged and skipped so one stubborn file does
    /// not block removal of the rest.
    pub fn cleanup(&self) {
        let (sources, converted) = {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            (state.sources.clone(), state.converted.clone())
        };

        if let Err(e) = fs::remove_dir_all(&self.root)
            && e.kind() != ErrorKind::NotFound
        {
            log::warn!(
                "Failed to remove segment directory {}: {}",
                self.root.display(),
                e
            );
        }

        for path in converted.iter().chain(sources.iter()) {
            if let Err(e) = fs::remove_file(path)
                && e.kind() != ErrorKind::NotFound
            {
                log::warn!("Failed to remove artifact {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_dir_is_created_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("segments");
        let store = ArtifactStore::new(root.clone());

        assert!(!root.exists());

        let first = store.segment_dir().unwrap();
        assert_eq!(first, root);
        assert!(root.is_dir());

        let second = store.segment_dir().unwrap();
        assert_eq!(second, root);
    }

    #[test]
    fn cleanup_removes_sources_converted_and_segments() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("segments");
        let store = ArtifactStore::new(root.clone());

        let source = dir.path().join("10.oga");
        let wav = dir.path().join("10.wav");
        std::fs::write(&source, b"opus").unwrap();
        std::fs::write(&wav, b"wav").unwrap();
        store.register_source(&source);
        store.register_converted(&wav);

        let seg_dir = store.segment_dir().unwrap();
        let segment = seg_dir.join("10-001.wav");
        std::fs::write(&segment, b"seg").unwrap();

        store.cleanup();

        assert!(!source.exists());
        assert!(!wav.exists());
        assert!(!segment.exists());
        assert!(!root.exists());
    }

    #[test]
    fn cleanup_twice_does_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("segments"));

        let source = dir.path().join("1.oga");
        std::fs::write(&source, b"opus").unwrap();
        store.register_source(&source);
        store.segment_dir().unwrap();

        store.cleanup();
        store.cleanup();

        assert!(!source.exists());
    }

    #[test]
    fn cleanup_ignores_files_that_were_never_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("segments"));

        // Registered before a conversion that then failed without output
        store.register_converted(&dir.path().join("5.wav"));
        store.register_source(&dir.path().join("5.oga"));

        store.cleanup();
    }

    #[test]
    fn cleanup_leaves_unrelated_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("segments"));

        let bystander = dir.path().join("keep.txt");
        std::fs::write(&bystander, b"keep me").unwrap();

        let source = dir.path().join("2.oga");
        std::fs::write(&source, b"opus").unwrap();
        store.register_source(&source);

        store.cleanup();

        assert!(bystander.exists());
        assert!(!source.exists());
    }

    #[test]
    fn segment_dir_failure_is_an_artifact_dir_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not dir").unwrap();

        // Root lies underneath a regular file, so creation cannot succeed
        let store = ArtifactStore::new(blocker.join("segments"));
        let result = store.segment_dir();

        match result {
            Err(RelayError::ArtifactDir { path, .. }) => {
                assert!(path.contains("segments"));
            }
            other => panic!("Expected ArtifactDir error, got {:?}", other),
        }
    }

    #[test]
    fn registering_the_same_path_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("segments"));

        let source = dir.path().join("3.oga");
        std::fs::write(&source, b"opus").unwrap();
        store.register_source(&source);
        store.register_source(&source);

        store.cleanup();
        assert!(!source.exists());
    }
}
