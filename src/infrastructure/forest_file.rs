//! Forest snapshot file used by the CLI
//!
//! Unlike the exchange format, a snapshot keeps node ids and raw intervals
//! (including gaps), so ids stay stable between invocations.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::ApplicationError;
use crate::domain::Node;
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::memory::MemoryStore;

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ForestDocument {
    version: u32,
    nodes: Vec<Node>,
}

/// Snapshot file backing a `MemoryStore`.
#[derive(Debug, Clone)]
pub struct ForestFile {
    path: PathBuf,
}

impl ForestFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot; a missing file yields an empty store.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> InfraResult<MemoryStore> {
        if !self.path.exists() {
            debug!("load: no forest file, starting empty");
            return Ok(MemoryStore::new());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| InfraError::io(format!("read {}", self.path.display()), e))?;
        let document: ForestDocument =
            serde_json::from_str(&content).map_err(|source| ApplicationError::Serialization {
                context: format!("parse {}", self.path.display()),
                source,
            })?;
        if document.version != FORMAT_VERSION {
            return Err(ApplicationError::Config {
                message: format!(
                    "{}: unsupported forest file version {}",
                    self.path.display(),
                    document.version
                ),
            }
            .into());
        }
        let store = MemoryStore::from_nodes(document.nodes).map_err(ApplicationError::from)?;
        Ok(store)
    }

    /// Write all committed nodes of `store`, replacing the file atomically.
    #[instrument(level = "debug", skip(self, store), fields(path = %self.path.display()))]
    pub fn save(&self, store: &MemoryStore, pretty: bool) -> InfraResult<()> {
        let document = ForestDocument {
            version: FORMAT_VERSION,
            nodes: store.nodes(),
        };
        let rendered = if pretty {
            serde_json::to_string_pretty(&document)
        } else {
            serde_json::to_string(&document)
        }
        .map_err(|source| ApplicationError::Serialization {
            context: "render forest file".to_string(),
            source,
        })?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| InfraError::io(format!("create {}", dir.display()), e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| InfraError::io(format!("create temp file in {}", dir.display()), e))?;
        tmp.write_all(rendered.as_bytes())
            .map_err(|e| InfraError::io("write forest file", e))?;
        tmp.persist(&self.path)
            .map_err(|e| InfraError::io(format!("replace {}", self.path.display()), e.error))?;
        debug!("save: {} nodes", document.nodes.len());
        Ok(())
    }
}
