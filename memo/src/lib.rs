//! Content-addressed memoization store.
//!
//! Each entry is keyed by an operation tag plus a SHA-256 digest of the
//! operation's serialized input, so a key survives process restarts and
//! goes stale the moment the underlying data changes. Entries live as
//! JSON files under one directory per operation tag, fronted by an
//! in-process map. Publishing is atomic (write to a temporary file,
//! then rename), and anything unreadable on disk is treated as a miss.

mod error;

pub use crate::error::MemoError;
use dashmap::DashMap;
use log::{debug, warn};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fmt,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Stable identity of a memoized operation.
///
/// The name/version pair, not any in-memory function identity, is what
/// addresses the operation on disk. Bumping `version` retires all of an
/// operation's prior entries without touching the rest of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpTag {
    name: &'static str,
    version: u32,
}

impl OpTag {
    pub const fn new(name: &'static str, version: u32) -> Self {
        Self { name, version }
    }

    fn dir_name(&self) -> String {
        format!("{}.v{}", self.name, self.version)
    }
}

impl fmt::Display for OpTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.v{}", self.name, self.version)
    }
}

/// Disk-persisted memo store.
///
/// The store never evicts. Deleting the root directory (or calling
/// [`Store::clear`]) forces full recomputation and is always safe.
pub struct Store {
    /// Directory holding one subdirectory per operation tag.
    root: PathBuf,

    /// Entry bytes already read or written by this process.
    entries: DashMap<PathBuf, Arc<[u8]>>,
}

impl Store {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, MemoError> {
        let root = root.into();
        if root.exists() && !root.is_dir() {
            return Err(MemoError::Path(root));
        }
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            entries: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the memoized result for `(op, input)`, computing and
    /// persisting it on a miss.
    ///
    /// Only `compute`'s own error can fail this call. Store-level
    /// trouble (unreadable, corrupt, or unwritable entries) is logged
    /// and recovered by recomputing; correctness never depends on the
    /// cache being present.
    pub fn get_or_compute<T, I, E, F>(&self, op: OpTag, input: &I, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        I: Serialize + ?Sized,
        F: FnOnce() -> Result<T, E>,
    {
        let Some(path) = self.entry_path(op, input) else {
            return compute();
        };
        if let Some(value) = self.read_entry(&path) {
            debug!("memo hit for {op}");
            return Ok(value);
        }
        debug!("memo miss for {op}");
        let value = compute()?;
        self.write_entry(&path, &value);
        Ok(value)
    }

    /// Deletes every persisted entry.
    pub fn clear(&self) -> Result<(), MemoError> {
        self.entries.clear();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(path)?;
            } else {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

/// Private API.
impl Store {
    fn entry_path<I: Serialize + ?Sized>(&self, op: OpTag, input: &I) -> Option<PathBuf> {
        let bytes = match serde_json::to_vec(input) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("unhashable input for {op}, bypassing store: {e}");
                return None;
            }
        };
        let digest = Sha256::digest(&bytes);
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            hex.push_str(&format!("{byte:02x}"));
        }
        Some(self.root.join(op.dir_name()).join(format!("{hex}.json")))
    }

    fn read_entry<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        let bytes = match self.entries.get(path) {
            Some(cached) => Arc::clone(cached.value()),
            None => match fs::read(path) {
                Ok(bytes) => {
                    let bytes: Arc<[u8]> = Arc::from(bytes.into_boxed_slice());
                    self.entries.insert(path.to_path_buf(), Arc::clone(&bytes));
                    bytes
                }
                Err(e) if e.kind() == ErrorKind::NotFound => return None,
                Err(e) => {
                    warn!("unreadable entry {path:?}, treating as miss: {e}");
                    return None;
                }
            },
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("corrupt entry {path:?}, treating as miss: {e}");
                self.entries.remove(path);
                None
            }
        }
    }

    fn write_entry<T: Serialize>(&self, path: &Path, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("unencodable value for {path:?}, not persisting: {e}");
                return;
            }
        };
        if let Err(e) = publish(path, &bytes) {
            warn!("failed to persist entry {path:?}: {e}");
            return;
        }
        self.entries
            .insert(path.to_path_buf(), Arc::from(bytes.into_boxed_slice()));
    }
}

/// Atomically replaces `path` with `bytes`.
///
/// Readers see either the previous entry or the complete new one. Two
/// processes publishing the same key race benignly: the key is a
/// content hash, so both wrote equal bytes.
fn publish(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let Some(dir) = path.parent() else {
        return Err(std::io::Error::from(ErrorKind::InvalidInput));
    };
    fs::create_dir_all(dir)?;
    let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::{MemoError, OpTag, Store};
    use std::cell::Cell;

    const SQUARE: OpTag = OpTag::new("square", 1);

    fn squared(store: &Store, calls: &Cell<u32>, input: &[i64]) -> Vec<i64> {
        store
            .get_or_compute(SQUARE, input, || {
                calls.set(calls.get() + 1);
                Ok::<_, String>(input.iter().map(|n| n * n).collect())
            })
            .unwrap()
    }

    #[test]
    fn test_second_call_skips_compute() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let calls = Cell::new(0);

        assert_eq!(squared(&store, &calls, &[1, 2, 3]), vec![1, 4, 9]);
        assert_eq!(squared(&store, &calls, &[1, 2, 3]), vec![1, 4, 9]);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_changed_input_recomputes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let calls = Cell::new(0);

        squared(&store, &calls, &[1, 2, 3]);
        assert_eq!(squared(&store, &calls, &[1, 2, 4]), vec![1, 4, 16]);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Cell::new(0);

        let first = {
            let store = Store::open(dir.path()).unwrap();
            squared(&store, &calls, &[7, 8])
        };
        let store = Store::open(dir.path()).unwrap();
        let second = squared(&store, &calls, &[7, 8]);

        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_corrupt_entry_recomputes() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Cell::new(0);

        {
            let store = Store::open(dir.path()).unwrap();
            squared(&store, &calls, &[5]);
        }

        // Clobber the single persisted entry.
        let op_dir = dir.path().join(SQUARE.dir_name());
        let entry = std::fs::read_dir(&op_dir)
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        std::fs::write(&entry, b"not json").unwrap();

        let store = Store::open(dir.path()).unwrap();
        assert_eq!(squared(&store, &calls, &[5]), vec![25]);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_open_rejects_non_directory() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            Store::open(file.path()),
            Err(MemoError::Path(_))
        ));
    }

    #[test]
    fn test_publish_leaves_only_the_final_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let calls = Cell::new(0);

        squared(&store, &calls, &[4]);

        let names: Vec<String> = std::fs::read_dir(dir.path().join(SQUARE.dir_name()))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".json"));
    }

    #[test]
    fn test_stale_temporary_is_never_read_as_an_entry() {
        let dir = tempfile::tempdir().unwrap();

        // A crashed writer's leftover temporary, with plausible content.
        let op_dir = dir.path().join(SQUARE.dir_name());
        std::fs::create_dir_all(&op_dir).unwrap();
        std::fs::write(op_dir.join("0f3a.tmp.99999"), b"[1]").unwrap();

        let store = Store::open(dir.path()).unwrap();
        let calls = Cell::new(0);
        assert_eq!(squared(&store, &calls, &[4]), vec![16]);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_clear_forces_recompute() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let calls = Cell::new(0);

        squared(&store, &calls, &[2]);
        store.clear().unwrap();
        squared(&store, &calls, &[2]);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_ops_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        let a: i64 = store
            .get_or_compute(OpTag::new("double", 1), &3, || Ok::<_, String>(6))
            .unwrap();
        let b: i64 = store
            .get_or_compute(OpTag::new("triple", 1), &3, || Ok::<_, String>(9))
            .unwrap();
        assert_eq!((a, b), (6, 9));
    }

    #[test]
    fn test_version_bump_retires_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let calls = Cell::new(0);

        for version in [1, 2] {
            let _: Vec<i64> = store
                .get_or_compute(OpTag::new("square", version), &[3i64][..], || {
                    calls.set(calls.get() + 1);
                    Ok::<_, String>(vec![9])
                })
                .unwrap();
        }
        assert_eq!(calls.get(), 2);
    }
}
