//! Active dataset and its single-slot store
//!
//! Exactly one dataset is active process-wide. Uploads install a new dataset
//! by swapping the slot's reference; readers that captured an `Arc` before
//! the swap keep a consistent view of the old dataset until they finish.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// The currently active table: a Parquet file on disk plus the shape
/// metadata captured at upload time. Read-only after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub path: PathBuf,
    pub row_count: u64,
    pub column_count: u64,
    pub uploaded_at: DateTime<Utc>,
}

impl Dataset {
    pub fn new(path: impl Into<PathBuf>, row_count: u64, column_count: u64) -> Self {
        Self {
            path: path.into(),
            row_count,
            column_count,
            uploaded_at: Utc::now(),
        }
    }
}

/// Single-slot reference cell holding the active dataset.
///
/// Writes swap the whole `Arc`, so in-flight readers never observe a torn
/// dataset. Two concurrent uploads race and the last write wins. The lock is
/// only held for the duration of the clone/swap, never across suspension
/// points.
#[derive(Debug, Default)]
pub struct DatasetSlot {
    inner: RwLock<Option<Arc<Dataset>>>,
}

impl DatasetSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new dataset, returning the displaced one (if any) so the
    /// caller can clean up its backing file.
    pub fn install(&self, dataset: Dataset) -> Option<Arc<Dataset>> {
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        slot.replace(Arc::new(dataset))
    }

    /// Cheap handle to the active dataset, or `None` before the first upload.
    pub fn active(&self) -> Option<Arc<Dataset>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.active().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_starts_empty() {
        let slot = DatasetSlot::new();
        assert!(slot.active().is_none());
        assert!(!slot.is_loaded());
    }

    #[test]
    fn install_returns_displaced_dataset() {
        let slot = DatasetSlot::new();
        assert!(slot.install(Dataset::new("/tmp/a.parquet", 10, 2)).is_none());

        let displaced = slot.install(Dataset::new("/tmp/b.parquet", 20, 3)).unwrap();
        assert_eq!(displaced.path, PathBuf::from("/tmp/a.parquet"));
        assert_eq!(slot.active().unwrap().row_count, 20);
    }

    #[test]
    fn readers_keep_old_reference_across_swap() {
        let slot = DatasetSlot::new();
        slot.install(Dataset::new("/tmp/a.parquet", 10, 2));

        let before = slot.active().unwrap();
        slot.install(Dataset::new("/tmp/b.parquet", 20, 3));

        // The captured handle still points at the old dataset.
        assert_eq!(before.path, PathBuf::from("/tmp/a.parquet"));
        assert_eq!(slot.active().unwrap().path, PathBuf::from("/tmp/b.parquet"));
    }

    #[test]
    fn last_write_wins() {
        let slot = DatasetSlot::new();
        for i in 0..5 {
            slot.install(Dataset::new(format!("/tmp/{i}.parquet"), i, 1));
        }
        assert_eq!(slot.active().unwrap().row_count, 4);
    }
}
