//! Filesystem-backed content store.
//!
//! [`FsContentStore`] maps the article namespace onto a directory tree
//! below a single root. The whole tree is guarded by one `RwLock`: loads
//! and listings share it, writes and removals hold it exclusively.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use alexandria_types::ContentPath;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::article::{Article, Category, Resolved};
use crate::codec::ARTICLE_EXTENSION;
use crate::error::{ContentError, ContentResult};
use crate::traits::ContentStore;

/// A [`ContentStore`] over a directory tree.
///
/// Only one store may own a given root, or any directory below it. The lock
/// coordinates threads inside this process only.
#[derive(Debug)]
pub struct FsContentStore {
    root: PathBuf,
    lock: RwLock<()>,
}

impl FsContentStore {
    /// Create a store over `root` without touching the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: RwLock::new(()),
        }
    }

    /// Create a store over `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> ContentResult<Self> {
        let store = Self::new(root);
        fs::create_dir_all(&store.root)?;
        debug!(root = %store.root.display(), "opened content store");
        Ok(store)
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_guard(&self) -> ContentResult<RwLockReadGuard<'_, ()>> {
        self.lock.read().map_err(|_| ContentError::LockPoisoned)
    }

    fn write_guard(&self) -> ContentResult<RwLockWriteGuard<'_, ()>> {
        self.lock.write().map_err(|_| ContentError::LockPoisoned)
    }

    /// List the directory at `path`. Caller holds the lock.
    fn category(&self, path: &ContentPath) -> ContentResult<Category> {
        let dir = path.to_fs_path(&self.root);
        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = PathBuf::from(entry.file_name());
            let is_dir = entry.file_type()?.is_dir();
            let display = if is_dir {
                name.to_string_lossy().into_owned()
            } else {
                name.file_stem()
                    .unwrap_or(name.as_os_str())
                    .to_string_lossy()
                    .into_owned()
            };
            entries.push(display);
        }
        entries.sort();
        entries.dedup();

        Ok(Category {
            path: path.clone(),
            name: path.name().to_string(),
            parent: path.parent(),
            entries,
        })
    }
}

/// A lookup error meaning nothing exists at the path, including a path that
/// runs through an article file.
fn is_absent(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

impl ContentStore for FsContentStore {
    fn load(&self, path: &ContentPath) -> ContentResult<Resolved> {
        let _guard = self.read_guard()?;

        match fs::metadata(path.to_fs_path(&self.root)) {
            Ok(meta) if meta.is_dir() => {
                debug!(path = %path, "resolved category");
                return Ok(Resolved::Category(self.category(path)?));
            }
            Ok(_) => {}
            Err(e) if is_absent(&e) => {}
            Err(e) => return Err(e.into()),
        }

        if path.is_root() {
            return Err(ContentError::NotFound(path.clone()));
        }

        let file = path.to_fs_file(&self.root, ARTICLE_EXTENSION);
        let bytes = match fs::read(&file) {
            Ok(bytes) => bytes,
            Err(e) if is_absent(&e) => {
                return Err(ContentError::NotFound(path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let article = Article::from_bytes(path.clone(), &bytes).map_err(|source| {
            warn!(path = %path, error = %source, "malformed article");
            ContentError::MalformedArticle {
                path: path.clone(),
                source,
            }
        })?;

        let parent = path.parent().unwrap_or_else(ContentPath::root);
        let category = self.category(&parent)?;
        debug!(path = %path, bytes = bytes.len(), "loaded article");
        Ok(Resolved::Article { article, category })
    }

    fn write(&self, article: &Article) -> ContentResult<()> {
        if article.path.is_root() {
            return Err(ContentError::InvalidPath {
                path: article.path.clone(),
                reason: "the root is a category".into(),
            });
        }

        let bytes = article.to_bytes();
        let file = article.path.to_fs_file(&self.root, ARTICLE_EXTENSION);

        let _guard = self.write_guard()?;
        if let Some(dir) = file.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&file, &bytes)?;
        debug!(path = %article.path, bytes = bytes.len(), "wrote article");
        Ok(())
    }

    fn remove(&self, path: &ContentPath) -> ContentResult<()> {
        let file = path.to_fs_file(&self.root, ARTICLE_EXTENSION);
        let _guard = self.write_guard()?;
        match fs::remove_file(&file) {
            Ok(()) => {
                debug!(path = %path, "removed article");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ContentError::NotFound(path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn articles(&self) -> ContentResult<Vec<ContentPath>> {
        let _guard = self.read_guard()?;
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            let file = entry.path();
            if !entry.file_type().is_file()
                || file.extension().and_then(|e| e.to_str()) != Some(ARTICLE_EXTENSION)
            {
                continue;
            }
            let stem = file.with_extension("");
            let Ok(relative) = stem.strip_prefix(&self.root) else {
                continue;
            };
            let raw = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            match ContentPath::parse(&raw) {
                Ok(path) if !path.is_root() => paths.push(path),
                Ok(_) => {}
                Err(e) => warn!(file = %file.display(), error = %e, "skipping unaddressable article"),
            }
        }
        paths.sort();
        Ok(paths)
    }
}
