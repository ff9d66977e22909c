use crate::services::platform::WindowRef;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Durable snapshot of the hidden-window set: one decimal window handle
/// per line, no header. File absence means "nothing hidden", which keeps
/// the normal-shutdown fast path a plain delete.
pub struct PersistenceStore {
    file_path: PathBuf,
}

impl PersistenceStore {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    /// Rewrites the snapshot after a registry mutation. An empty set
    /// deletes the backing file entirely.
    pub fn save(&self, windows: &[WindowRef]) -> io::Result<()> {
        if windows.is_empty() {
            return match fs::remove_file(&self.file_path) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            };
        }

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut contents = String::new();
        for window in windows {
            let _ = writeln!(contents, "{}", window.as_raw());
        }
        fs::write(&self.file_path, contents)
    }

    /// Reads back raw handle values. Missing file loads as empty; a
    /// malformed entry is skipped and logged, never aborting the rest.
    /// Liveness of the returned handles is the caller's responsibility.
    pub fn load(&self) -> Vec<WindowRef> {
        let contents = match fs::read_to_string(&self.file_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(
                    event = "persistence.load_read_error",
                    file = %self.file_path.display(),
                    error = %e,
                    "Failed to read hidden-window snapshot"
                );
                return Vec::new();
            }
        };

        let mut windows = Vec::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.parse::<isize>() {
                Ok(raw) => windows.push(WindowRef::from_raw(raw)),
                Err(_) => {
                    tracing::warn!(
                        event = "persistence.load_skipped_entry",
                        entry = line,
                        "Skipping malformed hidden-window entry"
                    );
                }
            }
        }
        windows
    }

    pub fn file_exists(&self) -> bool {
        self.file_path.exists()
    }
}

/// Snapshot location under the local app-data folder.
pub fn default_state_path() -> PathBuf {
    let app_data = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    app_data.join("TrayNest").join("hidden_windows.dat")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> PersistenceStore {
        PersistenceStore::new(dir.path().join("hidden_windows.dat"))
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let windows = vec![WindowRef::from_raw(131_584), WindowRef::from_raw(655_432)];
        store.save(&windows).unwrap();
        assert_eq!(store.load(), windows);
    }

    #[test]
    fn save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store
            .save(&[WindowRef::from_raw(1), WindowRef::from_raw(2)])
            .unwrap();
        store.save(&[WindowRef::from_raw(3)]).unwrap();
        assert_eq!(store.load(), vec![WindowRef::from_raw(3)]);
    }

    #[test]
    fn saving_empty_set_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&[WindowRef::from_raw(42)]).unwrap();
        assert!(store.file_exists());
        store.save(&[]).unwrap();
        assert!(!store.file_exists());
    }

    #[test]
    fn saving_empty_set_without_a_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.save(&[]).is_ok());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hidden_windows.dat");
        fs::write(&path, "131584\nnot-a-handle\n\n655432\n12,99\n").unwrap();
        let store = PersistenceStore::new(path);
        assert_eq!(
            store.load(),
            vec![WindowRef::from_raw(131_584), WindowRef::from_raw(655_432)]
        );
    }
}
