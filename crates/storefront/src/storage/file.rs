//! Directory-backed store: one `<key>.json` file per key.

use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::{KeyValueStore, StorageError, validate_key};

/// A [`KeyValueStore`] that keeps each key in its own file.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous value intact. On Unix a directory the
/// store creates is `0700` and every file is created `0600`, since the
/// session blob holds a token. An existing directory keeps its mode.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;

        Ok(Self { dir })
    }

    /// Directory holding the blobs.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");

        let io_err = |source| StorageError::Io {
            path: tmp.clone(),
            source,
        };

        // A leftover from an interrupted write may carry looser permissions.
        match fs::remove_file(&tmp) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(io_err(e)),
            _ => {}
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp).map_err(io_err)?;
        file.write_all(value.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp, &path).map_err(|source| StorageError::Io { path, source })
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_load_delete_cycle() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let mut store = FileStore::open(tmp.path().join("state")).expect("open");

        assert!(store.get("cart").expect("get").is_none());

        store.set("cart", r#"[{"id":1}]"#).expect("set");
        assert_eq!(
            store.get("cart").expect("get").as_deref(),
            Some(r#"[{"id":1}]"#)
        );
        assert!(store.dir().join("cart.json").exists());
        assert!(!store.dir().join("cart.json.tmp").exists());

        store.remove("cart").expect("remove");
        assert!(store.get("cart").expect("get").is_none());
        store.remove("cart").expect("second remove is a no-op");
    }

    #[test]
    fn test_values_survive_reopen() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        {
            let mut store = FileStore::open(tmp.path()).expect("open");
            store.set("wishlist", "[]").expect("set");
        }

        let store = FileStore::open(tmp.path()).expect("reopen");
        assert_eq!(store.get("wishlist").expect("get").as_deref(), Some("[]"));
    }

    #[test]
    fn test_key_cannot_escape_directory() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let mut store = FileStore::open(tmp.path()).expect("open");

        assert!(matches!(
            store.set("../outside", "x"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_files_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let mut store = FileStore::open(tmp.path()).expect("open");
        store.set("currentUser", "{}").expect("set");

        let mode = fs::metadata(store.dir().join("currentUser.json"))
            .expect("metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600, "session file should be 0600");
    }

    #[cfg(unix)]
    #[test]
    fn test_new_directory_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let store = FileStore::open(tmp.path().join("a/state")).expect("open");

        let mode = fs::metadata(store.dir())
            .expect("metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_directory_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let shared = tmp.path().join("shared");
        fs::create_dir(&shared).expect("mkdir");
        fs::set_permissions(&shared, fs::Permissions::from_mode(0o755)).expect("chmod");

        FileStore::open(&shared).expect("open");

        let mode = fs::metadata(&shared)
            .expect("metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o755, "caller's directory should not be chmodded");
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_temp_file_does_not_leak_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let mut store = FileStore::open(tmp.path()).expect("open");
        let stale = store.dir().join("currentUser.json.tmp");
        fs::write(&stale, "half-written").expect("write stale");
        fs::set_permissions(&stale, fs::Permissions::from_mode(0o644)).expect("chmod");

        store.set("currentUser", r#"{"token":"t"}"#).expect("set");

        let path = store.dir().join("currentUser.json");
        let mode = fs::metadata(&path)
            .expect("metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            r#"{"token":"t"}"#
        );
        assert!(!stale.exists());
    }
}
