use crate::errors::Result;
use crate::scheme::{SchemeDocument, SchemeKind};
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Version written into every saved document
pub const CONFIG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Persistence for one configuration scope.
///
/// Stores hand out documents as persisted. Callers re-validate rules when
/// turning a document into a rule set.
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Result<SchemeDocument>;
    fn save(&self, document: &SchemeDocument) -> Result<()>;
}

/// Store backed by a pretty-printed JSON file.
///
/// The document is cached in memory; writes go to a temporary file that is
/// renamed over the target.
#[derive(Debug)]
pub struct JsonConfigStore {
    config_path: PathBuf,
    document: Arc<RwLock<SchemeDocument>>,
}

impl JsonConfigStore {
    /// Opens the document at `config_path`.
    ///
    /// A missing file is not created: the store starts from a fresh document
    /// for `kind` and touches the disk only on the first save.
    pub fn open(config_path: impl Into<PathBuf>, kind: SchemeKind) -> Result<Self> {
        let config_path = config_path.into();
        let store = Self {
            config_path,
            document: Arc::new(RwLock::new(SchemeDocument::new(
                CONFIG_VERSION.to_string(),
                kind,
            ))),
        };

        if store.config_path.exists() {
            store.load_document()?;
        } else {
            debug!(
                "No rule configuration at {}; starting from an empty {} scheme",
                store.config_path.display(),
                kind
            );
        }

        Ok(store)
    }

    fn load_document(&self) -> Result<()> {
        debug!("Loading rule configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path)?;
        let loaded: SchemeDocument = serde_json::from_str(&content)?;
        let scheme_count = loaded.schemes.len();

        *self.document.write() = loaded;

        info!(
            "Loaded rule configuration with {} scheme(s) from {}",
            scheme_count,
            self.config_path.display()
        );
        Ok(())
    }

    fn save_document(&self) -> Result<()> {
        debug!("Saving rule configuration to: {}", self.config_path.display());

        let content = {
            let document = self.document.read();
            serde_json::to_string_pretty(&*document)?
        };

        if let Some(parent) = self.config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.config_path.with_extension("tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.config_path)?;

        debug!("Rule configuration saved successfully");
        Ok(())
    }

    pub fn with_document<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SchemeDocument) -> R,
    {
        let document = self.document.read();
        f(&document)
    }

    pub fn with_document_mut<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut SchemeDocument) -> R,
    {
        let result = {
            let mut document = self.document.write();
            let result = f(&mut document);
            document.touch(CONFIG_VERSION);
            result
        };

        self.save_document()?;
        Ok(result)
    }

    pub fn reload(&self) -> Result<()> {
        if self.config_path.exists() {
            self.load_document()
        } else {
            debug!(
                "Rule configuration not saved yet, keeping in-memory document: {}",
                self.config_path.display()
            );
            Ok(())
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

impl Clone for JsonConfigStore {
    fn clone(&self) -> Self {
        Self {
            config_path: self.config_path.clone(),
            document: Arc::clone(&self.document),
        }
    }
}

impl ConfigStore for JsonConfigStore {
    fn load(&self) -> Result<SchemeDocument> {
        self.reload()?;
        Ok(self.with_document(Clone::clone))
    }

    fn save(&self, document: &SchemeDocument) -> Result<()> {
        self.with_document_mut(|current| *current = document.clone())
    }
}

/// Store that keeps the document in memory only
#[derive(Debug)]
pub struct MemoryConfigStore {
    document: RwLock<SchemeDocument>,
}

impl MemoryConfigStore {
    pub fn new(kind: SchemeKind) -> Self {
        Self::with_document(SchemeDocument::new(CONFIG_VERSION.to_string(), kind))
    }

    pub fn with_document(document: SchemeDocument) -> Self {
        Self {
            document: RwLock::new(document),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<SchemeDocument> {
        Ok(self.document.read().clone())
    }

    fn save(&self, document: &SchemeDocument) -> Result<()> {
        let mut stored = document.clone();
        stored.touch(CONFIG_VERSION);
        *self.document.write() = stored;
        Ok(())
    }
}
