//! On-disk page store
//!
//! Layout under the image root:
//!
//! ```text
//! <image_dir>/<document_id>/1.jpg
//!                          /2.jpg
//!                          /bookmark.json
//! ```
//!
//! The page files double as resume state: reopening the store marks every
//! page already on disk as finalized.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::error::StoreResult;
use crate::types::{DocumentId, PageIndex};

pub const BOOKMARK_FILE: &str = "bookmark.json";

/// Per-document directory of composed page images
#[derive(Debug, Clone)]
pub struct PageStore {
    dir: PathBuf,
    extension: String,
}

impl PageStore {
    /// Create (or reopen) the directory for `document_id` and return the
    /// pages already persisted there.
    pub fn open(
        image_root: &Path,
        document_id: DocumentId,
        extension: &str,
    ) -> StoreResult<(Self, BTreeSet<PageIndex>)> {
        let dir = image_root.join(document_id.to_string());
        fs::create_dir_all(&dir)?;

        let store = Self {
            dir,
            extension: extension.to_string(),
        };
        let existing = list_page_images(&store.dir, &store.extension)?
            .into_iter()
            .map(|(page, _)| page)
            .collect::<BTreeSet<_>>();

        if !existing.is_empty() {
            tracing::info!(
                document_id,
                pages = existing.len(),
                dir = %store.dir.display(),
                "Found pages from a previous run"
            );
        }

        Ok((store, existing))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn page_path(&self, page: PageIndex) -> PathBuf {
        self.dir.join(format!("{}.{}", page, self.extension))
    }

    /// Write a page image. The file only appears under its final name once
    /// fully written, so an interrupted write is never picked up on resume.
    pub fn save_page(&self, page: PageIndex, bytes: &[u8]) -> StoreResult<PathBuf> {
        let path = self.page_path(page);
        let partial = self.dir.join(format!("{}.{}.part", page, self.extension));
        fs::write(&partial, bytes)?;
        fs::rename(&partial, &path)?;
        Ok(path)
    }

    pub fn save_bookmark(&self, tree: &Value) -> StoreResult<()> {
        fs::write(self.dir.join(BOOKMARK_FILE), serde_json::to_vec(tree)?)?;
        Ok(())
    }

    pub fn load_bookmark(&self) -> StoreResult<Option<Value>> {
        load_bookmark(&self.dir)
    }
}

/// Read `bookmark.json` from a page directory, if present
pub fn load_bookmark(dir: &Path) -> StoreResult<Option<Value>> {
    let path = dir.join(BOOKMARK_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&text)?))
}

/// `<n>.<extension>` files in `dir`, sorted by page number. Files whose
/// stem is not a number are ignored.
pub fn list_page_images(dir: &Path, extension: &str) -> std::io::Result<Vec<(PageIndex, PathBuf)>> {
    let mut pages = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        let Some(page) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<PageIndex>().ok())
        else {
            continue;
        };
        pages.push((page, path));
    }
    pages.sort_by_key(|(page, _)| *page);
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_directory() {
        let root = TempDir::new().unwrap();
        let (store, existing) = PageStore::open(root.path(), 42, "jpg").unwrap();
        assert!(store.dir().is_dir());
        assert!(store.dir().ends_with("42"));
        assert!(existing.is_empty());
    }

    #[test]
    fn test_reopen_finds_saved_pages() {
        let root = TempDir::new().unwrap();
        let (store, _) = PageStore::open(root.path(), 7, "jpg").unwrap();
        store.save_page(3, b"three").unwrap();
        store.save_page(1, b"one").unwrap();
        // Noise that must not count as pages
        std::fs::write(store.dir().join("cover.jpg"), b"x").unwrap();
        std::fs::write(store.dir().join("2.png"), b"x").unwrap();
        std::fs::write(store.dir().join("4.jpg.part"), b"x").unwrap();

        let (_, existing) = PageStore::open(root.path(), 7, "jpg").unwrap();
        assert_eq!(existing.into_iter().collect::<Vec<_>>(), vec![1, 3]);
        assert!(!store.dir().join("3.jpg.part").exists());
    }

    #[test]
    fn test_list_sorts_numerically() {
        let root = TempDir::new().unwrap();
        for page in [10, 2, 1, 33] {
            std::fs::write(root.path().join(format!("{}.webp", page)), b"x").unwrap();
        }
        let pages: Vec<_> = list_page_images(root.path(), "webp")
            .unwrap()
            .into_iter()
            .map(|(page, _)| page)
            .collect();
        assert_eq!(pages, vec![1, 2, 10, 33]);
    }

    #[test]
    fn test_bookmark_round_trip() {
        let root = TempDir::new().unwrap();
        let (store, _) = PageStore::open(root.path(), 1, "jpg").unwrap();
        assert_eq!(store.load_bookmark().unwrap(), None);

        let tree = json!([{"label": "Cover", "pnum": "1", "children": null}]);
        store.save_bookmark(&tree).unwrap();
        assert_eq!(store.load_bookmark().unwrap(), Some(tree));
    }
}
