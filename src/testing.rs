//! Test doubles for the store and generator collaborators.

use std::{
  collections::VecDeque,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
  },
};

use async_trait::async_trait;

use crate::error::{GenerationError, StoreError};
use crate::generator::TextGenerator;
use crate::store::{Document, DocumentStore, MemoryStore};

/// Replays canned responses in order; the last one repeats once the queue
/// is drained. Records every user instruction it receives.
pub struct ScriptedGenerator {
  responses: Mutex<VecDeque<Result<String, String>>>,
  last: Mutex<Option<Result<String, String>>>,
  pub calls: AtomicUsize,
  pub prompts: Mutex<Vec<(String, f32)>>,
}

impl ScriptedGenerator {
  pub fn new(responses: impl IntoIterator<Item = &'static str>) -> Self {
    Self::from_results(responses.into_iter().map(|r| Ok(r.to_string())))
  }

  pub fn from_results(responses: impl IntoIterator<Item = Result<String, String>>) -> Self {
    Self {
      responses: Mutex::new(responses.into_iter().collect()),
      last: Mutex::new(None),
      calls: AtomicUsize::new(0),
      prompts: Mutex::new(Vec::new()),
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
  async fn generate(
    &self,
    _system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<String, GenerationError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.prompts.lock().unwrap().push((user.to_string(), temperature));
    let next = self.responses.lock().unwrap().pop_front();
    let resp = match next {
      Some(r) => {
        *self.last.lock().unwrap() = Some(r.clone());
        r
      }
      None => self.last.lock().unwrap().clone().unwrap_or_else(|| Err("no script".into())),
    };
    resp.map_err(GenerationError::Unavailable)
  }
}

/// `MemoryStore` that counts writes.
#[derive(Default)]
pub struct CountingStore {
  pub inner: MemoryStore,
  pub writes: AtomicUsize,
}

impl CountingStore {
  pub fn writes(&self) -> usize {
    self.writes.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl DocumentStore for CountingStore {
  async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
    self.inner.get(collection, id).await
  }

  async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError> {
    self.writes.fetch_add(1, Ordering::SeqCst);
    self.inner.set(collection, id, doc).await
  }

  async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
    self.writes.fetch_add(1, Ordering::SeqCst);
    self.inner.update(collection, id, fields).await
  }

  async fn list_ids(&self, collection: &str) -> Result<Vec<String>, StoreError> {
    self.inner.list_ids(collection).await
  }
}

/// Store whose every call fails.
pub struct DownStore;

#[async_trait]
impl DocumentStore for DownStore {
  async fn get(&self, _: &str, _: &str) -> Result<Option<Document>, StoreError> {
    Err(StoreError::Unavailable("connection refused".into()))
  }

  async fn set(&self, _: &str, _: &str, _: Document) -> Result<(), StoreError> {
    Err(StoreError::Unavailable("connection refused".into()))
  }

  async fn update(&self, _: &str, _: &str, _: Document) -> Result<(), StoreError> {
    Err(StoreError::Unavailable("connection refused".into()))
  }

  async fn list_ids(&self, _: &str) -> Result<Vec<String>, StoreError> {
    Err(StoreError::Unavailable("connection refused".into()))
  }
}
