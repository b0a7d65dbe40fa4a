//! On-disk artifacts: per-page texts and the final chunk list.
//!
//! ```text
//! {root}/
//! ├── tmp/
//! │   ├── {file_id}-page-1.txt
//! │   └── {file_id}-page-2.txt
//! └── chunks/
//!     └── {file_id}.json
//! ```
//!
//! Every write goes to a uniquely named sibling first and is renamed into
//! place, so readers never see a partial artifact. Paths are namespaced by
//! file id; [`ArtifactStore::lock`] serializes whole runs for one file id.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Error, Result, TextChunk};

const PAGES_DIR: &str = "tmp";
const CHUNKS_DIR: &str = "chunks";
const PAGE_INFIX: &str = "-page-";

type LockMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

fn lock_map(locks: &LockMap) -> MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Filesystem store for page and chunk artifacts.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    locks: Arc<LockMap>,
}

/// Held single-flight guard for one file id, from [`ArtifactStore::lock`].
///
/// Dropping the last guard for an id removes its entry, so the store only
/// tracks ids that are in use.
#[derive(Debug)]
pub struct FileLock {
    guard: Option<OwnedMutexGuard<()>>,
    file_id: String,
    locks: Arc<LockMap>,
}

impl FileLock {
    /// The file id this guard serializes.
    #[must_use]
    pub fn file_id(&self) -> &str {
        &self.file_id
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Release the mutex before inspecting the count: the guard owns a clone.
        drop(self.guard.take());
        let mut locks = lock_map(&self.locks);
        if locks
            .get(&self.file_id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            locks.remove(&self.file_id);
        }
    }
}

impl ArtifactStore {
    /// A store rooted at `root`. Directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Arc::default(),
        }
    }

    /// The storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/tmp/{file_id}-page-{page}.txt`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidFileId`] if `file_id` fails [`validate_file_id`].
    pub fn page_path(&self, file_id: &str, page: u32) -> Result<PathBuf> {
        validate_file_id(file_id)?;
        Ok(self
            .root
            .join(PAGES_DIR)
            .join(format!("{file_id}{PAGE_INFIX}{page}.txt")))
    }

    /// `{root}/chunks/{file_id}.json`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidFileId`] if `file_id` fails [`validate_file_id`].
    pub fn chunks_path(&self, file_id: &str) -> Result<PathBuf> {
        validate_file_id(file_id)?;
        Ok(self.root.join(CHUNKS_DIR).join(format!("{file_id}.json")))
    }

    /// Write one page artifact, replacing any previous version.
    ///
    /// # Errors
    ///
    /// An invalid file id, or an I/O error creating, writing or renaming.
    pub async fn write_page(&self, file_id: &str, page: u32, text: &str) -> Result<PathBuf> {
        let path = self.page_path(file_id, page)?;
        write_atomic(&path, text.as_bytes()).await?;
        Ok(path)
    }

    /// Read one page artifact.
    ///
    /// # Errors
    ///
    /// An invalid file id, or an I/O error (including a missing page).
    pub async fn read_page(&self, file_id: &str, page: u32) -> Result<String> {
        let path = self.page_path(file_id, page)?;
        Ok(tokio::fs::read_to_string(path).await?)
    }

    /// Write the chunk list as an indented JSON array, in the given order.
    ///
    /// # Errors
    ///
    /// An invalid file id, a serialization error, or an I/O error.
    pub async fn write_chunks(&self, file_id: &str, chunks: &[TextChunk]) -> Result<PathBuf> {
        let path = self.chunks_path(file_id)?;
        let json = serde_json::to_vec_pretty(chunks)?;
        write_atomic(&path, &json).await?;

        info!(file_id, chunks = chunks.len(), path = %path.display(), "wrote chunk list");
        Ok(path)
    }

    /// Read a chunk list written by [`write_chunks`](Self::write_chunks).
    ///
    /// # Errors
    ///
    /// An invalid file id, an I/O error, or [`Error::Json`] for a malformed list.
    pub async fn read_chunks(&self, file_id: &str) -> Result<Vec<TextChunk>> {
        let path = self.chunks_path(file_id)?;
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Stored page artifacts for `file_id`, sorted by page number.
    ///
    /// A missing page directory means no pages.
    ///
    /// # Errors
    ///
    /// An invalid file id, or an I/O error reading the page directory.
    pub async fn list_pages(&self, file_id: &str) -> Result<Vec<(u32, PathBuf)>> {
        validate_file_id(file_id)?;
        let dir = self.root.join(PAGES_DIR);

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut pages = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some((owner, page)) = parse_page_file_name(name) else {
                continue;
            };
            if owner == file_id {
                pages.push((page, entry.path()));
            }
        }
        pages.sort_by_key(|(page, _)| *page);
        Ok(pages)
    }

    /// Delete every stored page artifact for `file_id`. Returns how many were
    /// removed.
    ///
    /// # Errors
    ///
    /// An invalid file id, or an I/O error listing or removing a page.
    pub async fn clear_pages(&self, file_id: &str) -> Result<usize> {
        let pages = self.list_pages(file_id).await?;
        let mut removed = 0;
        for (_, path) in &pages {
            match tokio::fs::remove_file(path).await {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        if removed > 0 {
            debug!(file_id, removed, "cleared stored pages");
        }
        Ok(removed)
    }

    /// Acquire the single-flight guard for `file_id`.
    ///
    /// Holders of the guard for the same id run one at a time; different ids
    /// do not contend.
    pub async fn lock(&self, file_id: &str) -> FileLock {
        let mutex = {
            let mut locks = lock_map(&self.locks);
            // Entries left by waits that were dropped before acquiring.
            locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
            Arc::clone(locks.entry(file_id.to_string()).or_default())
        };
        let guard = mutex.lock_owned().await;
        FileLock {
            guard: Some(guard),
            file_id: file_id.to_string(),
            locks: Arc::clone(&self.locks),
        }
    }
}

/// Page number encoded in a page artifact path, if it is one.
///
/// ```rust
/// use std::path::Path;
/// use pageslab::page_number_from_path;
///
/// assert_eq!(page_number_from_path(Path::new("tmp/report-page-12.txt")), Some(12));
/// assert_eq!(page_number_from_path(Path::new("notes.txt")), None);
/// ```
#[must_use]
pub fn page_number_from_path(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    parse_page_file_name(name).map(|(_, page)| page)
}

/// Page number of a page artifact path owned by `file_id`.
pub(crate) fn owned_page_number(path: &Path, file_id: &str) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    parse_page_file_name(name)
        .filter(|(owner, _)| *owner == file_id)
        .map(|(_, page)| page)
}

/// Split `{file_id}-page-{n}.txt` into its owner and page number.
fn parse_page_file_name(name: &str) -> Option<(&str, u32)> {
    let stem = name.strip_suffix(".txt")?;
    let (owner, page) = stem.rsplit_once(PAGE_INFIX)?;
    if owner.is_empty() || page.is_empty() || !page.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((owner, page.parse().ok()?))
}

/// Reject ids that could escape the storage root or collide with temp files.
///
/// # Errors
///
/// [`Error::InvalidFileId`] for an empty id, `.`, `..`, or an id containing
/// `/`, `\` or NUL.
pub fn validate_file_id(file_id: &str) -> Result<()> {
    let invalid = file_id.is_empty()
        || file_id == "."
        || file_id == ".."
        || file_id.contains(['/', '\\', '\0']);
    if invalid {
        return Err(Error::InvalidFileId(file_id.to_string()));
    }
    Ok(())
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(format!(".{}.tmp", Uuid::new_v4()));
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await?;
    if let Err(err) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(err.into());
    }
    Ok(())
}
