//! Virtual file provider with lazy, write-once content caching.
//!
//! The provider answers two questions for the checker: "can this logical
//! file name be resolved?" and "what is its text?". Contents are read
//! from disk at most once per name and cached for the provider's
//! lifetime; synthetic files never touch the disk at all.
//!
//! # Resolution Flow
//!
//! ```text
//! FileProvider
//! ├── index: FxHashMap<name, Origin>     // built once, Disk(dir) | Synthetic
//! └── cache: RwLock<FxHashMap<name, Arc<str>>>
//!
//! load_file(name):
//! 1. cache hit              → clone (no I/O)
//! 2. index: Disk(dir)       → read dir/name, decode, cache, return
//! 3. index: Synthetic/none  → LoadError::Unresolved (synthetic entries
//!                             are seeded into the cache at registration)
//! ```
//!
//! Search directories are scanned non-recursively at construction; only
//! regular files ending in [`DECL_SUFFIX`] are indexed. When two listed
//! directories contain a file of the same name, the later-listed
//! directory wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// File name suffix selecting declaration modules during directory scans.
pub const DECL_SUFFIX: &str = ".decl";

// =============================================================================
// Errors
// =============================================================================

/// Failure to build the file index at provider construction.
///
/// There is no partial-index fallback: a bad search directory aborts
/// construction.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A configured search directory is missing or unreadable.
    #[error("failed to scan search directory `{dir}`")]
    DirUnreadable {
        /// The directory that could not be scanned.
        dir: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Failure to load the contents of a logical file name.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The name has no index entry. Loading a name without checking
    /// [`FileProvider::is_loadable_file`] first is a caller bug; no disk
    /// access is performed.
    #[error("no source registered for `{0}`")]
    Unresolved(String),

    /// A disk-backed entry could not be read.
    #[error("failed to read `{name}` from `{dir}`")]
    Io {
        /// The logical file name being loaded.
        name: String,
        /// The search directory the index resolved it to.
        dir: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The file's bytes were not valid UTF-8.
    #[error("`{0}` is not valid UTF-8")]
    InvalidUtf8(String),
}

// =============================================================================
// Origin
// =============================================================================

/// Where a logical file's contents come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Backed by a regular file inside a search directory.
    Disk(PathBuf),
    /// Registered in memory via [`FileProvider::manually_add_file`];
    /// indistinguishable from a disk-backed file to consumers.
    Synthetic,
}

// =============================================================================
// FileProvider
// =============================================================================

/// Lazy-loading virtual file provider.
///
/// Construct one per test run from a fixed set of search directories plus
/// any synthetic name → content entries, then share it across compiles.
/// The index is immutable after construction except through
/// [`manually_add_file`](FileProvider::manually_add_file); the content
/// cache is write-once per name, so concurrent redundant loads of the
/// same file are benign races.
///
/// # Example
///
/// ```ignore
/// use decl_harness::FileProvider;
///
/// let mut provider = FileProvider::builder()
///     .search_dir("fixtures/decls")
///     .file("app.decl", "export const api: { ping: () -> void };")
///     .build()?;
///
/// assert!(provider.is_loadable_file("app.decl"));
/// let text = provider.load_file("app.decl")?;
/// ```
#[derive(Debug)]
pub struct FileProvider {
    index: FxHashMap<String, Origin>,
    cache: RwLock<FxHashMap<String, Arc<str>>>,
}

impl FileProvider {
    /// Start building a provider.
    pub fn builder() -> FileProviderBuilder {
        FileProviderBuilder::default()
    }

    /// Build a provider from search directories only.
    pub fn from_dirs<I, P>(dirs: I) -> Result<Self, ScanError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut builder = Self::builder();
        for dir in dirs {
            builder = builder.search_dir(dir);
        }
        builder.build()
    }

    /// Check whether the contents of `name` can be loaded.
    ///
    /// True for both disk-backed and synthetic entries. Callers must get
    /// a `true` here before calling [`load_file`](Self::load_file).
    pub fn is_loadable_file(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Load the contents of the file with the given logical name.
    ///
    /// Cached contents are returned without touching the disk; otherwise
    /// the file is read from its indexed directory, cached, and returned.
    /// Each disk-backed name is read at most once for the lifetime of the
    /// provider.
    pub fn load_file(&self, name: &str) -> Result<Arc<str>, LoadError> {
        if let Some(text) = self.cache.read().get(name) {
            return Ok(text.clone());
        }
        self.load_miss(name)
    }

    /// Register a file with the given `name` and `contents` directly.
    ///
    /// The entry is installed in the index and its contents seeded into
    /// the cache in one step; there is no lazy path for synthetic files.
    /// An existing entry of the same name (disk-backed or not) is
    /// overwritten.
    pub fn manually_add_file(&mut self, name: impl Into<String>, contents: impl Into<Arc<str>>) {
        let name = name.into();
        self.index.insert(name.clone(), Origin::Synthetic);
        self.cache.write().insert(name, contents.into());
    }

    /// The origin recorded for `name`, if any.
    pub fn origin(&self, name: &str) -> Option<&Origin> {
        self.index.get(name)
    }

    /// Iterate over all loadable logical file names.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Number of loadable files.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the provider has no loadable files.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Read, decode, and cache the contents of `name`.
    ///
    /// The single point at which disk I/O happens.
    fn load_miss(&self, name: &str) -> Result<Arc<str>, LoadError> {
        let dir = match self.index.get(name) {
            Some(Origin::Disk(dir)) => dir,
            // Synthetic entries are seeded at registration; a cache miss
            // means the name was never registered.
            Some(Origin::Synthetic) | None => {
                return Err(LoadError::Unresolved(name.to_string()));
            }
        };

        let bytes = fs::read(dir.join(name)).map_err(|source| LoadError::Io {
            name: name.to_string(),
            dir: dir.clone(),
            source,
        })?;
        let text = decode_utf8(&bytes).ok_or_else(|| LoadError::InvalidUtf8(name.to_string()))?;

        let text: Arc<str> = Arc::from(text);
        self.cache.write().insert(name.to_string(), text.clone());
        Ok(text)
    }
}

/// Decode bytes as UTF-8, stripping a BOM if present.
fn decode_utf8(buf: &[u8]) -> Option<&str> {
    let buf = buf.strip_prefix(b"\xef\xbb\xbf").unwrap_or(buf);
    std::str::from_utf8(buf).ok()
}

// =============================================================================
// FileProviderBuilder
// =============================================================================

/// Builder for [`FileProvider`].
///
/// Search directories are indexed in the order given; on name collisions
/// the entry from the later-listed directory wins. Synthetic files are
/// applied after all directories and win over disk-backed entries.
#[derive(Debug, Default)]
pub struct FileProviderBuilder {
    dirs: Vec<PathBuf>,
    files: Vec<(String, Arc<str>)>,
}

impl FileProviderBuilder {
    /// Add a search directory.
    pub fn search_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dirs.push(dir.as_ref().to_path_buf());
        self
    }

    /// Add several search directories, preserving order.
    pub fn search_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.dirs
            .extend(dirs.into_iter().map(|d| d.as_ref().to_path_buf()));
        self
    }

    /// Add a synthetic file with the given logical name and contents.
    pub fn file(mut self, name: impl Into<String>, contents: impl Into<Arc<str>>) -> Self {
        self.files.push((name.into(), contents.into()));
        self
    }

    /// Scan the search directories and build the provider.
    ///
    /// Fails if any search directory cannot be read; there is no
    /// partial-index fallback.
    pub fn build(self) -> Result<FileProvider, ScanError> {
        let mut index = FxHashMap::default();
        for dir in &self.dirs {
            scan_dir(&mut index, dir)?;
        }

        let mut provider = FileProvider {
            index,
            cache: RwLock::new(FxHashMap::default()),
        };
        for (name, contents) in self.files {
            provider.manually_add_file(name, contents);
        }
        Ok(provider)
    }
}

/// Index all declaration files directly inside `dir`.
///
/// Non-recursive; entries that are not regular files or do not carry the
/// declaration suffix are skipped. Insertion overwrites, which is what
/// gives later-listed directories precedence.
fn scan_dir(index: &mut FxHashMap<String, Origin>, dir: &Path) -> Result<(), ScanError> {
    let entries = fs::read_dir(dir).map_err(|source| ScanError::DirUnreadable {
        dir: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| ScanError::DirUnreadable {
            dir: dir.to_path_buf(),
            source,
        })?;
        let file_type = entry.file_type().map_err(|source| ScanError::DirUnreadable {
            dir: dir.to_path_buf(),
            source,
        })?;
        if !file_type.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.ends_with(DECL_SUFFIX) {
            index.insert(name, Origin::Disk(dir.to_path_buf()));
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn provider_from(dir: &TempDir) -> FileProvider {
        FileProvider::from_dirs([dir.path()]).unwrap()
    }

    #[test]
    fn test_scan_indexes_decl_files_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.decl"), "x").unwrap();
        fs::write(dir.path().join("notes.txt"), "y").unwrap();

        let provider = provider_from(&dir);
        assert!(provider.is_loadable_file("a.decl"));
        assert!(!provider.is_loadable_file("notes.txt"));
        assert_eq!(provider.len(), 1);
    }

    #[test]
    fn test_scan_skips_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub.decl")).unwrap();
        fs::write(dir.path().join("sub.decl").join("inner.decl"), "x").unwrap();

        let provider = provider_from(&dir);
        // Neither the directory itself nor anything inside it is indexed.
        assert!(provider.is_empty());
    }

    #[test]
    fn test_scan_error_on_missing_dir() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone");
        let result = FileProvider::from_dirs([missing.as_path()]);
        assert!(matches!(result, Err(ScanError::DirUnreadable { .. })));
    }

    #[test]
    fn test_later_listed_directory_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(first.path().join("shared.decl"), "from first").unwrap();
        fs::write(second.path().join("shared.decl"), "from second").unwrap();

        let provider = FileProvider::from_dirs([first.path(), second.path()]).unwrap();
        assert_eq!(&*provider.load_file("shared.decl").unwrap(), "from second");

        // Reversed order flips the winner.
        let provider = FileProvider::from_dirs([second.path(), first.path()]).unwrap();
        assert_eq!(&*provider.load_file("shared.decl").unwrap(), "from first");
    }

    #[test]
    fn test_manual_add_loads_without_disk() {
        let mut provider = FileProvider::builder().build().unwrap();
        provider.manually_add_file("app.decl", "export const x: number;");

        assert!(provider.is_loadable_file("app.decl"));
        assert_eq!(provider.origin("app.decl"), Some(&Origin::Synthetic));
        assert_eq!(
            &*provider.load_file("app.decl").unwrap(),
            "export const x: number;"
        );
    }

    #[test]
    fn test_manual_add_overrides_disk_entry() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.decl"), "on disk").unwrap();

        let mut provider = provider_from(&dir);
        provider.manually_add_file("a.decl", "in memory");
        assert_eq!(&*provider.load_file("a.decl").unwrap(), "in memory");
        assert_eq!(provider.origin("a.decl"), Some(&Origin::Synthetic));
    }

    #[test]
    fn test_load_reads_disk_at_most_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.decl");
        fs::write(&path, "cached contents").unwrap();

        let provider = provider_from(&dir);
        let first = provider.load_file("a.decl").unwrap();

        // Removing the backing file proves the second load is a pure
        // cache read.
        fs::remove_file(&path).unwrap();
        let second = provider.load_file("a.decl").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unresolved_name_fails_without_disk_access() {
        let provider = FileProvider::builder().build().unwrap();
        let err = provider.load_file("ghost.decl").unwrap_err();
        assert!(matches!(err, LoadError::Unresolved(name) if name == "ghost.decl"));
    }

    #[test]
    fn test_load_error_on_vanished_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.decl");
        fs::write(&path, "x").unwrap();

        let provider = provider_from(&dir);
        // Indexed at construction, removed before first load.
        fs::remove_file(&path).unwrap();
        let err = provider.load_file("a.decl").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_load_strips_bom() {
        let dir = TempDir::new().unwrap();
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice(b"const x = 1;");
        fs::write(dir.path().join("a.decl"), &bytes).unwrap();

        let provider = provider_from(&dir);
        assert_eq!(&*provider.load_file("a.decl").unwrap(), "const x = 1;");
    }

    #[test]
    fn test_load_rejects_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.decl"), [0xff, 0xfe]).unwrap();

        let provider = provider_from(&dir);
        let err = provider.load_file("a.decl").unwrap_err();
        assert!(matches!(err, LoadError::InvalidUtf8(_)));
    }

    #[test]
    fn test_builder_files_and_dirs_compose() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("disk.decl"), "disk").unwrap();

        let provider = FileProvider::builder()
            .search_dir(dir.path())
            .file("mem.decl", "mem")
            .build()
            .unwrap();

        assert_eq!(provider.len(), 2);
        assert_eq!(&*provider.load_file("disk.decl").unwrap(), "disk");
        assert_eq!(&*provider.load_file("mem.decl").unwrap(), "mem");
    }
}
