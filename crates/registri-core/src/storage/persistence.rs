//! JSON state file persistence
//!
//! Handles saving and loading the annotation and pagination maps to/from the
//! filesystem. Uses atomic writes (write to temp file, then rename) so a crash
//! mid-save never leaves a half-written file behind.
//!
//! Storage location: `~/.local/share/registri/` (configurable via `Config`)
//!
//! Files:
//! - `page-annotations.json` - book id -> year -> page numbers
//! - `book-pagination-config.json` - book id -> pagination config

use std::fs::{self, File};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::{StorageError, StorageResult};

/// Result of [`JsonFile::load_or_init`]
///
/// `recovered_from` holds the error that forced a reset to the default value,
/// so callers can surface it to the user.
#[derive(Debug)]
pub struct Loaded<T> {
    pub value: T,
    pub recovered_from: Option<StorageError>,
}

/// A single pretty-printed JSON file holding one value of type `T`
#[derive(Debug, Clone)]
pub struct JsonFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFile<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the value from disk
    ///
    /// Returns `None` if the file doesn't exist.
    /// Returns `InvalidFormat` if the file exists but isn't valid JSON for `T`.
    pub fn load(&self) -> StorageResult<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| StorageError::from_read(e, self.path.clone()))?;

        let value = serde_json::from_str(&content).map_err(|e| StorageError::InvalidFormat {
            path: self.path.clone(),
            details: e.to_string(),
        })?;

        debug!("Loaded {:?}", self.path);
        Ok(Some(value))
    }

    /// Write the value to disk, pretty-printed, replacing the whole file
    pub fn save(&self, value: &T) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(value).map_err(|e| StorageError::Serialize {
            path: self.path.clone(),
            source: e,
        })?;

        atomic_write(&self.path, json.as_bytes())?;
        debug!("Saved {:?}", self.path);
        Ok(())
    }

    /// Load the value, falling back to the default on any failure
    ///
    /// - Missing file: the default is written back immediately.
    /// - Unparseable file: a backup copy is made and the default is used; the
    ///   file itself is rewritten on the next save.
    /// - Unreadable file: the default is used.
    ///
    /// Never fails; problems are logged and reported via `recovered_from`.
    pub fn load_or_init(&self) -> Loaded<T> {
        match self.load() {
            Ok(Some(value)) => Loaded {
                value,
                recovered_from: None,
            },
            Ok(None) => {
                info!("{:?} not found, creating empty", self.path);
                let value = T::default();
                if let Err(e) = self.save(&value) {
                    warn!("Could not create {:?}: {}", self.path, e);
                }
                Loaded {
                    value,
                    recovered_from: None,
                }
            }
            Err(err @ StorageError::InvalidFormat { .. }) => {
                warn!("{}; starting from an empty state", err);
                let backup = backup_path(&self.path);
                match fs::copy(&self.path, &backup) {
                    Ok(_) => info!("Backed up unreadable file to {:?}", backup),
                    Err(e) => warn!("Could not back up {:?}: {}", self.path, e),
                }
                Loaded {
                    value: T::default(),
                    recovered_from: Some(err),
                }
            }
            Err(err) => {
                warn!("{}; starting from an empty state", err);
                Loaded {
                    value: T::default(),
                    recovered_from: Some(err),
                }
            }
        }
    }
}

/// Path used to keep a copy of a file that failed to parse
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".corrupt.backup");
    path.with_file_name(name)
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    // Same directory, so the rename stays on one filesystem
    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|e| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    type Pages = BTreeMap<String, Vec<u32>>;

    fn test_file(temp_dir: &TempDir) -> JsonFile<Pages> {
        JsonFile::new(temp_dir.path().join("page-annotations.json"))
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let file = test_file(&temp_dir);

        assert!(!file.path().exists());
        assert!(file.load().unwrap().is_none());

        let mut value = Pages::new();
        value.insert("1700".to_string(), vec![3, 4, 5]);
        file.save(&value).unwrap();

        assert!(file.path().exists());
        assert_eq!(file.load().unwrap().unwrap(), value);
        assert!(!temp_dir.path().join("page-annotations.tmp").exists());
    }

    #[test]
    fn test_save_is_pretty_printed() {
        let temp_dir = TempDir::new().unwrap();
        let file = test_file(&temp_dir);

        let mut value = Pages::new();
        value.insert("1699".to_string(), vec![1, 2]);
        file.save(&value).unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        assert!(content.contains('\n'));
        assert!(content.contains("  \"1699\""));
    }

    #[test]
    fn test_load_or_init_missing_file_writes_default() {
        let temp_dir = TempDir::new().unwrap();
        let file = test_file(&temp_dir);

        let loaded = file.load_or_init();
        assert!(loaded.value.is_empty());
        assert!(loaded.recovered_from.is_none());

        // Written back immediately
        assert!(file.path().exists());
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "{}");
    }

    #[test]
    fn test_load_or_init_malformed_file_resets_and_backs_up() {
        let temp_dir = TempDir::new().unwrap();
        let file = test_file(&temp_dir);
        fs::write(file.path(), "{ not json").unwrap();

        let loaded = file.load_or_init();
        assert!(loaded.value.is_empty());
        assert!(matches!(
            loaded.recovered_from,
            Some(StorageError::InvalidFormat { .. })
        ));

        let backup = backup_path(file.path());
        assert_eq!(fs::read_to_string(backup).unwrap(), "{ not json");
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file: JsonFile<Pages> = JsonFile::new(temp_dir.path().join("nested/state.json"));

        file.save(&Pages::new()).unwrap();
        assert!(file.path().exists());
    }

    #[test]
    fn test_backup_path_appends_suffix() {
        let path = Path::new("/data/page-annotations.json");
        assert_eq!(
            backup_path(path),
            PathBuf::from("/data/page-annotations.json.corrupt.backup")
        );
    }
}
