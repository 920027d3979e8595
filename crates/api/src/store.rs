//! Record Store: one JSON file per document, one directory per collection.
//!
//! Documents live at `<data_dir>/<collection>/<key>.json`. All operations
//! are whole-file reads and truncate-rewrite writes; there is no partial
//! patching and no locking. Concurrent writers to the same key race at the
//! filesystem level and the last writer wins - a known, accepted race;
//! documented here rather than fixed.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Failure, Result};

/// The five document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Menus,
    Users,
    Tokens,
    Carts,
    Orders,
}

impl Collection {
    /// Every collection, for startup bootstrap.
    pub const ALL: [Self; 5] = [
        Self::Menus,
        Self::Users,
        Self::Tokens,
        Self::Carts,
        Self::Orders,
    ];

    /// Directory name under the data root.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Menus => "menus",
            Self::Users => "users",
            Self::Tokens => "tokens",
            Self::Carts => "carts",
            Self::Orders => "orders",
        }
    }
}

/// File-backed CRUD store keyed by `(collection, key)`.
#[derive(Debug, Clone)]
pub struct RecordStore {
    base_dir: PathBuf,
}

impl RecordStore {
    /// Create a store rooted at `base_dir`. No I/O happens until
    /// [`Self::bootstrap`] or the first operation.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Ensure every collection directory exists.
    ///
    /// # Errors
    ///
    /// Returns [`Failure::Storage`] if a directory cannot be created.
    pub async fn bootstrap(&self) -> Result<()> {
        for collection in Collection::ALL {
            let dir = self.base_dir.join(collection.dir_name());
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|err| Failure::Storage(format!("{}: {err}", dir.display())))?;
        }
        Ok(())
    }

    /// Data root, mainly for logging.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path(&self, collection: Collection, key: &str) -> PathBuf {
        self.base_dir
            .join(collection.dir_name())
            .join(format!("{key}.json"))
    }

    /// Whether a document is present at the key.
    pub async fn exists(&self, collection: Collection, key: &str) -> bool {
        tokio::fs::try_exists(self.path(collection, key))
            .await
            .unwrap_or(false)
    }

    /// Existence probe failing with [`Failure::NotFound`] when absent.
    ///
    /// # Errors
    ///
    /// [`Failure::NotFound`] if no document is stored at the key.
    pub async fn ensure_exists(&self, collection: Collection, key: &str) -> Result<()> {
        if self.exists(collection, key).await {
            Ok(())
        } else {
            Err(Failure::NotFound(format!(
                "{}/{key}",
                collection.dir_name()
            )))
        }
    }

    /// Existence probe failing with [`Failure::AlreadyExists`] when present.
    ///
    /// # Errors
    ///
    /// [`Failure::AlreadyExists`] if a document is stored at the key.
    pub async fn ensure_absent(&self, collection: Collection, key: &str) -> Result<()> {
        if self.exists(collection, key).await {
            Err(Failure::AlreadyExists(format!(
                "{}/{key}",
                collection.dir_name()
            )))
        } else {
            Ok(())
        }
    }

    /// Write a new document.
    ///
    /// # Errors
    ///
    /// [`Failure::AlreadyExists`] if the key is taken; [`Failure::Storage`]
    /// on serialization or filesystem faults.
    pub async fn create<T: Serialize>(
        &self,
        collection: Collection,
        key: &str,
        doc: &T,
    ) -> Result<()> {
        self.ensure_absent(collection, key).await?;
        self.write(collection, key, doc).await
    }

    /// Read and deserialize a document.
    ///
    /// # Errors
    ///
    /// [`Failure::NotFound`] if the file is absent; [`Failure::Storage`] on
    /// read or parse faults.
    pub async fn read<T: DeserializeOwned>(&self, collection: Collection, key: &str) -> Result<T> {
        let path = self.path(collection, key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Failure::NotFound(format!(
                    "{}/{key}",
                    collection.dir_name()
                )));
            }
            Err(err) => return Err(Failure::Storage(format!("{}: {err}", path.display()))),
        };
        serde_json::from_str(&raw)
            .map_err(|err| Failure::Storage(format!("{}: {err}", path.display())))
    }

    /// Replace an existing document (truncate + rewrite, whole file).
    ///
    /// # Errors
    ///
    /// [`Failure::NotFound`] if the document does not exist;
    /// [`Failure::Storage`] on serialization or filesystem faults.
    pub async fn update<T: Serialize>(
        &self,
        collection: Collection,
        key: &str,
        doc: &T,
    ) -> Result<()> {
        self.ensure_exists(collection, key).await?;
        self.write(collection, key, doc).await
    }

    /// Remove a document.
    ///
    /// # Errors
    ///
    /// [`Failure::NotFound`] if absent; [`Failure::Storage`] on filesystem
    /// faults.
    pub async fn delete(&self, collection: Collection, key: &str) -> Result<()> {
        let path = self.path(collection, key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(Failure::NotFound(
                format!("{}/{key}", collection.dir_name()),
            )),
            Err(err) => Err(Failure::Storage(format!("{}: {err}", path.display()))),
        }
    }

    /// The set of keys in a collection (file names minus `.json`).
    ///
    /// # Errors
    ///
    /// [`Failure::Storage`] if the collection directory cannot be read.
    pub async fn list(&self, collection: Collection) -> Result<Vec<String>> {
        let dir = self.base_dir.join(collection.dir_name());
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|err| Failure::Storage(format!("{}: {err}", dir.display())))?;

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| Failure::Storage(format!("{}: {err}", dir.display())))?
        {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(key) = name.strip_suffix(".json") {
                keys.push(key.to_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Aggregate listing: every key mapped through `read`. A key whose read
    /// fails is silently excluded; there is no partial-failure propagation.
    ///
    /// # Errors
    ///
    /// [`Failure::Storage`] only if the directory listing itself fails.
    pub async fn read_all(&self, collection: Collection) -> Result<Vec<Value>> {
        let mut docs = Vec::new();
        for key in self.list(collection).await? {
            if let Ok(doc) = self.read::<Value>(collection, &key).await {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    async fn write<T: Serialize>(&self, collection: Collection, key: &str, doc: &T) -> Result<()> {
        let path = self.path(collection, key);
        let raw = serde_json::to_vec(doc)?;
        tokio::fs::write(&path, raw)
            .await
            .map_err(|err| Failure::Storage(format!("{}: {err}", path.display())))
    }
}
