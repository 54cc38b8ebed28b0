use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// Where a store keeps its records between restarts. Backends persist whole
/// snapshots; the stores own all in-memory state.
pub trait Persistence<T>: Send + Sync {
    fn load(&self) -> Result<Vec<T>, StoreError>;
    fn save(&self, items: &[T]) -> Result<(), StoreError>;
}

/// No durability. Used by tests and when no data directory is configured.
pub struct InMemory;

impl<T> Persistence<T> for InMemory {
    fn load(&self) -> Result<Vec<T>, StoreError> {
        Ok(Vec::new())
    }

    fn save(&self, _items: &[T]) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Whole-snapshot JSON file. Writes go to a sibling tmp file first so a
/// crash mid-write cannot truncate the previous snapshot.
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl<T> Persistence<T> for JsonFile
where
    T: Serialize + DeserializeOwned,
{
    fn load(&self) -> Result<Vec<T>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: display(&self.path),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            path: display(&self.path),
            source,
        })
    }

    fn save(&self, items: &[T]) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(items).map_err(|source| StoreError::Corrupt {
            path: display(&self.path),
            source,
        })?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw).map_err(|source| StoreError::Io {
            path: display(&tmp),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: display(&self.path),
            source,
        })
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{JsonFile, Persistence};
    use crate::models::user::{Identity, Role};

    fn identity(seed: u128) -> Identity {
        Identity {
            id: Uuid::from_u128(seed),
            phone: "9876543210".to_string(),
            name: None,
            role: Role::Customer,
        }
    }

    #[test]
    fn load_of_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("missing.json"));

        let loaded: Vec<Identity> = file.load().unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn save_then_load_returns_the_same_items() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("identities.json"));

        let items = vec![identity(1), identity(2)];
        file.save(&items).unwrap();

        let loaded: Vec<Identity> = file.load().unwrap();
        assert_eq!(loaded, items);
    }

    #[test]
    fn save_overwrites_the_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("identities.json"));

        file.save(&[identity(1), identity(2)]).unwrap();
        file.save(&[identity(3)]).unwrap();

        let loaded: Vec<Identity> = file.load().unwrap();
        assert_eq!(loaded, vec![identity(3)]);
    }
}
