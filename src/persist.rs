//! State Repository
//!
//! Persists one node tree so a host can restore its last UI state instead of
//! parsing again. The inflater only uses the trait; storage is up to the host.

use crate::error::PersistError;
use crate::tree::json::to_json;
use crate::tree::Node;
use parking_lot::RwLock;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Storage for a single persisted tree
pub trait StateRepository: Send + Sync {
    fn has_state(&self) -> bool;

    fn load(&self) -> Result<Option<Node>, PersistError>;

    fn save(&self, node: &Node) -> Result<(), PersistError>;

    /// Replace the stored tree
    fn update(&self, node: &Node) -> Result<(), PersistError> {
        self.save(node)
    }
}

/// Keeps the tree in memory
#[derive(Debug, Default)]
pub struct MemoryStateRepository {
    state: RwLock<Option<Node>>,
    writes: RwLock<usize>,
}

impl MemoryStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of save/update calls
    pub fn writes(&self) -> usize {
        *self.writes.read()
    }
}

impl StateRepository for MemoryStateRepository {
    fn has_state(&self) -> bool {
        self.state.read().is_some()
    }

    fn load(&self) -> Result<Option<Node>, PersistError> {
        Ok(self.state.read().clone())
    }

    fn save(&self, node: &Node) -> Result<(), PersistError> {
        *self.state.write() = Some(node.clone());
        *self.writes.write() += 1;
        Ok(())
    }
}

/// Stores the tree as a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStateRepository {
    path: PathBuf,
}

impl JsonFileStateRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStateRepository { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the stored file, if any
    pub fn remove(&self) -> Result<(), PersistError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

impl StateRepository for JsonFileStateRepository {
    fn has_state(&self) -> bool {
        self.path.is_file()
    }

    fn load(&self) -> Result<Option<Node>, PersistError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn save(&self, node: &Node) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = to_json(node)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Attributes;

    fn sample() -> Node {
        let attrs: Attributes = [("orientation", "vertical")].into_iter().collect();
        Node::with_children("LinearLayout", attrs, vec![Node::new("TextView", Attributes::new())])
    }

    fn temp_state_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rustylayout_state_{}_{}.json", label, std::process::id()))
    }

    #[test]
    fn test_memory_repository() {
        let repo = MemoryStateRepository::new();
        assert!(!repo.has_state());
        assert!(repo.load().unwrap().is_none());

        repo.save(&sample()).unwrap();
        assert!(repo.has_state());
        assert_eq!(repo.load().unwrap(), Some(sample()));

        let replacement = Node::new("FrameLayout", Attributes::new());
        repo.update(&replacement).unwrap();
        assert_eq!(repo.load().unwrap(), Some(replacement));
        assert_eq!(repo.writes(), 2);
    }

    #[test]
    fn test_json_file_repository() {
        let path = temp_state_path("roundtrip");
        let repo = JsonFileStateRepository::new(&path);
        repo.remove().unwrap();
        assert!(!repo.has_state());
        assert!(repo.load().unwrap().is_none());

        repo.save(&sample()).unwrap();
        assert!(repo.has_state());
        assert_eq!(repo.load().unwrap(), Some(sample()));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"type\": \"LinearLayout\""));

        repo.remove().unwrap();
        assert!(!repo.has_state());
    }

    #[test]
    fn test_corrupt_file_is_json_error() {
        let path = temp_state_path("corrupt");
        fs::write(&path, b"{not json").unwrap();
        let err = JsonFileStateRepository::new(&path).load().unwrap_err();
        assert!(matches!(err, PersistError::Json(_)));
        let _ = fs::remove_file(&path);
    }
}
