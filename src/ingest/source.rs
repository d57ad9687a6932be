//! Item delivery boundary

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use super::IngestError;

/// Token acknowledging one delivered item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AckToken(pub u64);

/// One delivered file
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Path relative to the source root, `/`-separated
    pub rel_filepath: String,
    pub bytes: Vec<u8>,
    pub token: AckToken,
}

/// A source of files to ingest
///
/// Items are acknowledged only after they were processed without error.
pub trait ItemSource: Send + Sync {
    /// Next item, or `None` once the source is drained
    fn fetch(&self) -> Result<Option<Delivery>, IngestError>;

    fn acknowledge(&self, token: AckToken) -> Result<(), IngestError>;
}

#[derive(Debug, Default)]
struct AckLedger {
    next_token: AtomicU64,
    acked: Mutex<HashSet<u64>>,
}

impl AckLedger {
    fn issue(&self) -> AckToken {
        AckToken(self.next_token.fetch_add(1, Ordering::SeqCst))
    }

    fn ack(&self, token: AckToken) -> Result<(), IngestError> {
        if token.0 >= self.next_token.load(Ordering::SeqCst) {
            return Err(IngestError::Source(format!("unknown ack token {}", token.0)));
        }
        self.acked
            .lock()
            .map_err(|_| IngestError::Source("ack ledger poisoned".to_string()))?
            .insert(token.0);
        Ok(())
    }

    fn acked(&self) -> usize {
        self.acked.lock().map(|a| a.len()).unwrap_or(0)
    }

    fn issued(&self) -> usize {
        self.next_token.load(Ordering::SeqCst) as usize
    }
}

/// Serves files discovered under a directory
pub struct DirectoryItemSource {
    base_path: PathBuf,
    queue: Mutex<VecDeque<PathBuf>>,
    ledger: AckLedger,
}

impl DirectoryItemSource {
    /// Discover files matching a glob pattern under `base_path`
    pub fn discover(base_path: &Path, pattern: &str) -> Result<Self, IngestError> {
        let files = discover_local_files(base_path, pattern)?;
        debug!(files = files.len(), base = %base_path.display(), "Discovered files");
        Ok(Self {
            base_path: base_path.to_path_buf(),
            queue: Mutex::new(files.into()),
            ledger: AckLedger::default(),
        })
    }

    /// Files not yet fetched
    pub fn remaining(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn acknowledged(&self) -> usize {
        self.ledger.acked()
    }

    pub fn delivered(&self) -> usize {
        self.ledger.issued()
    }
}

impl ItemSource for DirectoryItemSource {
    fn fetch(&self) -> Result<Option<Delivery>, IngestError> {
        let next = self
            .queue
            .lock()
            .map_err(|_| IngestError::Source("queue poisoned".to_string()))?
            .pop_front();
        let Some(path) = next else {
            return Ok(None);
        };
        let rel_filepath = relative_filepath(&self.base_path, &path);
        let bytes = fs::read(&path).map_err(|e| IngestError::ItemUnreadable {
            rel_filepath: rel_filepath.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(Delivery {
            rel_filepath,
            bytes,
            token: self.ledger.issue(),
        }))
    }

    fn acknowledge(&self, token: AckToken) -> Result<(), IngestError> {
        self.ledger.ack(token)
    }
}

/// Serves items held in memory
pub struct MemoryItemSource {
    queue: Mutex<VecDeque<(String, Vec<u8>)>>,
    ledger: AckLedger,
}

impl MemoryItemSource {
    pub fn new(items: Vec<(String, Vec<u8>)>) -> Self {
        Self {
            queue: Mutex::new(items.into()),
            ledger: AckLedger::default(),
        }
    }

    pub fn acknowledged(&self) -> usize {
        self.ledger.acked()
    }

    pub fn delivered(&self) -> usize {
        self.ledger.issued()
    }
}

impl ItemSource for MemoryItemSource {
    fn fetch(&self) -> Result<Option<Delivery>, IngestError> {
        let next = self
            .queue
            .lock()
            .map_err(|_| IngestError::Source("queue poisoned".to_string()))?
            .pop_front();
        Ok(next.map(|(rel_filepath, bytes)| Delivery {
            rel_filepath,
            bytes,
            token: self.ledger.issue(),
        }))
    }

    fn acknowledge(&self, token: AckToken) -> Result<(), IngestError> {
        self.ledger.ack(token)
    }
}

/// Discover files matching a pattern in a local directory, sorted by path
pub fn discover_local_files(base_path: &Path, pattern: &str) -> Result<Vec<PathBuf>, IngestError> {
    let full_pattern = format!("{}/{}", base_path.display(), pattern);
    let entries = glob::glob(&full_pattern)
        .map_err(|e| IngestError::InvalidPattern(format!("{pattern}: {e}")))?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("Error accessing path: {}", e),
        }
    }
    files.sort();
    Ok(files)
}

/// Path relative to `base`, joined with `/`
///
/// A path outside `base` is kept as it is.
fn relative_filepath(base: &Path, path: &Path) -> String {
    match path.strip_prefix(base) {
        Ok(relative) => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => {
            warn!(
                path = %path.display(),
                base = %base.display(),
                "Path outside source root, keeping it unchanged"
            );
            path.to_string_lossy().into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_source_serves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2023_04_15").join("Camera_11_30_10");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("frame_0002.bmp"), b"two").unwrap();
        fs::write(nested.join("frame_0001.bmp"), b"one").unwrap();
        fs::write(dir.path().join("notes.txt"), b"skip").unwrap();

        let source = DirectoryItemSource::discover(dir.path(), "**/*.bmp").unwrap();
        assert_eq!(source.remaining(), 2);

        let first = source.fetch().unwrap().unwrap();
        assert_eq!(first.rel_filepath, "2023_04_15/Camera_11_30_10/frame_0001.bmp");
        assert_eq!(first.bytes, b"one");
        source.acknowledge(first.token).unwrap();

        let second = source.fetch().unwrap().unwrap();
        assert_eq!(second.rel_filepath, "2023_04_15/Camera_11_30_10/frame_0002.bmp");
        assert!(source.fetch().unwrap().is_none());

        assert_eq!(source.delivered(), 2);
        assert_eq!(source.acknowledged(), 1);
    }

    #[test]
    fn test_missing_file_fails_only_that_item() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.bmp"), b"a").unwrap();
        fs::write(dir.path().join("b.bmp"), b"b").unwrap();

        let source = DirectoryItemSource::discover(dir.path(), "*.bmp").unwrap();
        fs::remove_file(dir.path().join("a.bmp")).unwrap();

        let err = source.fetch().unwrap_err();
        assert!(err.is_item_error());
        assert!(matches!(err, IngestError::ItemUnreadable { ref rel_filepath, .. } if rel_filepath == "a.bmp"));

        let next = source.fetch().unwrap().unwrap();
        assert_eq!(next.rel_filepath, "b.bmp");
        assert_eq!(source.delivered(), 1);
    }

    #[test]
    fn test_path_outside_root_is_kept() {
        assert_eq!(
            relative_filepath(Path::new("/data/frames"), Path::new("/archive/x/frame.bmp")),
            "/archive/x/frame.bmp"
        );
        assert_eq!(
            relative_filepath(Path::new("/data/frames"), Path::new("/data/frames/x/frame.bmp")),
            "x/frame.bmp"
        );
    }

    #[test]
    fn test_invalid_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirectoryItemSource::discover(dir.path(), "[").err().unwrap();
        assert!(matches!(err, IngestError::InvalidPattern(_)));
    }

    #[test]
    fn test_unknown_token_is_rejected() {
        let source = MemoryItemSource::new(vec![("a.bmp".to_string(), vec![1])]);
        assert!(source.acknowledge(AckToken(5)).is_err());
        let item = source.fetch().unwrap().unwrap();
        source.acknowledge(item.token).unwrap();
        assert_eq!(source.acknowledged(), 1);
    }
}
