//! Key-value document store: collections of JSON documents addressed by id.
//!
//! `DocumentStore` is the seam the question and progress logic depends on.
//! `MemoryStore` keeps everything in a `RwLock<HashMap>`, optionally mirrored
//! to a JSON snapshot file so data survives restarts.
//!
//! There are no transactions: `set` overwrites unconditionally and `update`
//! merges top-level fields only. Read-modify-write callers can lose updates
//! under concurrency.

use std::{
  collections::{BTreeMap, HashMap},
  path::PathBuf,
};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::error::StoreError;

pub type Document = Map<String, Value>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
  /// Fetch a document; `None` when absent.
  async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

  /// Unconditional overwrite.
  async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError>;

  /// Merge `fields` into the document at top-level granularity, creating it if
  /// absent. Nested maps are replaced, not deep-merged.
  async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError>;

  /// All document ids in a collection, sorted.
  async fn list_ids(&self, collection: &str) -> Result<Vec<String>, StoreError>;
}

/// Decode a stored document into `T`.
pub async fn get_as<T: DeserializeOwned>(
  store: &dyn DocumentStore,
  collection: &str,
  id: &str,
) -> Result<Option<T>, StoreError> {
  match store.get(collection, id).await? {
    Some(doc) => serde_json::from_value(Value::Object(doc))
      .map(Some)
      .map_err(|source| StoreError::Corrupt { key: format!("{collection}/{id}"), source }),
    None => Ok(None),
  }
}

/// Encode `value` into a document. Non-object encodings are rejected.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
  match serde_json::to_value(value) {
    Ok(Value::Object(map)) => Ok(map),
    Ok(other) => Err(StoreError::Unavailable(format!("expected a JSON object, got {other}"))),
    Err(e) => Err(StoreError::Unavailable(format!("encode failed: {e}"))),
  }
}

type Collections = HashMap<String, BTreeMap<String, Document>>;

#[derive(Default)]
pub struct MemoryStore {
  collections: RwLock<Collections>,
  snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Open a store mirrored to `path`. A missing file starts empty.
  #[instrument(level = "info", fields(path = %path.display()))]
  pub async fn with_snapshot(path: PathBuf) -> Result<Self, StoreError> {
    let collections = match tokio::fs::read_to_string(&path).await {
      Ok(s) => serde_json::from_str::<Collections>(&s)
        .map_err(|source| StoreError::Corrupt { key: path.display().to_string(), source })?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Collections::new(),
      Err(e) => return Err(StoreError::Unavailable(format!("reading {}: {e}", path.display()))),
    };
    let docs: usize = collections.values().map(|c| c.len()).sum();
    info!(target: "skillboost_backend", docs, "Loaded store snapshot");
    Ok(Self { collections: RwLock::new(collections), snapshot_path: Some(path) })
  }

  /// Rewrite the snapshot file while holding the write guard, so snapshots
  /// land in write order.
  async fn persist(&self, collections: &Collections) -> Result<(), StoreError> {
    let Some(path) = &self.snapshot_path else { return Ok(()) };
    let body = serde_json::to_vec(collections)
      .map_err(|e| StoreError::Unavailable(format!("encoding snapshot: {e}")))?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, body)
      .await
      .map_err(|e| StoreError::Unavailable(format!("writing {}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
      .await
      .map_err(|e| StoreError::Unavailable(format!("renaming to {}: {e}", path.display())))
  }

  /// Install `doc` and persist. If the snapshot write fails the previous entry
  /// is restored, so a failed write is never visible to readers.
  async fn commit(
    &self,
    collections: &mut Collections,
    collection: &str,
    id: &str,
    doc: Document,
  ) -> Result<(), StoreError> {
    let previous = collections
      .entry(collection.to_string())
      .or_default()
      .insert(id.to_string(), doc);

    if let Err(e) = self.persist(collections).await {
      if let Some(docs) = collections.get_mut(collection) {
        match previous {
          Some(prev) => {
            docs.insert(id.to_string(), prev);
          }
          None => {
            docs.remove(id);
          }
        }
        if docs.is_empty() {
          collections.remove(collection);
        }
      }
      return Err(e);
    }
    Ok(())
  }
}

#[async_trait]
impl DocumentStore for MemoryStore {
  async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
    let guard = self.collections.read().await;
    Ok(guard.get(collection).and_then(|c| c.get(id)).cloned())
  }

  async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError> {
    let mut guard = self.collections.write().await;
    self.commit(&mut guard, collection, id, doc).await?;
    debug!(target: "skillboost_backend", %collection, %id, "Document set");
    Ok(())
  }

  async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
    let mut guard = self.collections.write().await;
    let mut doc = guard
      .get(collection)
      .and_then(|c| c.get(id))
      .cloned()
      .unwrap_or_default();
    for (k, v) in fields {
      doc.insert(k, v);
    }
    self.commit(&mut guard, collection, id, doc).await?;
    debug!(target: "skillboost_backend", %collection, %id, "Document merged");
    Ok(())
  }

  async fn list_ids(&self, collection: &str) -> Result<Vec<String>, StoreError> {
    let guard = self.collections.read().await;
    Ok(guard.get(collection).map(|c| c.keys().cloned().collect()).unwrap_or_default())
  }
}
