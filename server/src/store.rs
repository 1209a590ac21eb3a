use anyhow::{Context, Result};
use fulltext_core::DocId;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Raw document bytes on disk, one file per doc id.
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Opens a fresh store at `root`. Anything already there is removed: the
    /// index lives in memory only, so old files would sit under ids that now
    /// belong to other documents.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if root.exists() {
            fs::remove_dir_all(&root).with_context(|| format!("remove store root {}", root.display()))?;
        }
        fs::create_dir_all(&root).with_context(|| format!("create store root {}", root.display()))?;
        Ok(Self { root })
    }

    fn path(&self, doc_id: DocId) -> PathBuf { self.root.join(doc_id.to_string()) }

    pub fn put(&self, doc_id: DocId, bytes: &[u8]) -> Result<()> {
        tracing::debug!(doc_id, len = bytes.len(), "store document");
        fs::write(self.path(doc_id), bytes).with_context(|| format!("write document {doc_id}"))
    }

    pub fn get(&self, doc_id: DocId) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path(doc_id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read document {doc_id}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_then_get() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::open(dir.path().join("store")).unwrap();
        store.put(3, b"home sales").unwrap();
        assert_eq!(store.get(3).unwrap().as_deref(), Some(&b"home sales"[..]));
        assert_eq!(store.get(4).unwrap(), None);
    }

    #[test]
    fn open_clears_previous_contents() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        DocumentStore::open(&root).unwrap().put(0, b"stale").unwrap();
        let store = DocumentStore::open(&root).unwrap();
        assert_eq!(store.get(0).unwrap(), None);
    }
}
