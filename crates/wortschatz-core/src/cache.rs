//! The study-content cache seam and its in-process implementation, plus
//! the memo of per-position sentence contexts.

use std::{
  collections::HashMap,
  future::Future,
  sync::{Arc, Mutex},
  time::{Duration, Instant},
};

use sha2::{Digest, Sha256};

use crate::{
  annotate::TokenContext, generate::StudyContent, knowledge::ProficiencyLevel,
};

/// Entries a [`ContextMemo`] holds before it starts over.
pub const DEFAULT_MEMO_CAPACITY: usize = 256;

/// Shortest time-to-live a cached entry may be given.
pub const MIN_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Time-to-live used when none is configured.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Raise `configured` to [`MIN_CACHE_TTL`] if it is shorter.
pub fn effective_ttl(configured: Duration) -> Duration {
  configured.max(MIN_CACHE_TTL)
}

/// Cache key of a focus-word study request.
pub fn study_key(lemma: &str, level: ProficiencyLevel) -> String {
  format!("study:{}:{level}", lemma.trim().to_lowercase())
}

/// A get/set/ttl key-value cache for generated study content.
pub trait StudyCache: Send + Sync {
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Option<StudyContent>> + Send + 'a;

  fn set(
    &self,
    key: String,
    value: StudyContent,
    ttl: Duration,
  ) -> impl Future<Output = ()> + Send + '_;
}

/// Process-local cache. Expired entries are dropped when read and swept on
/// every write.
#[derive(Debug, Default)]
pub struct MemoryCache {
  entries: Mutex<HashMap<String, (Instant, StudyContent)>>,
}

impl MemoryCache {
  pub fn new() -> Self { Self::default() }

  pub fn len(&self) -> usize {
    self.entries.lock().map_or(0, |entries| entries.len())
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl StudyCache for MemoryCache {
  async fn get<'a>(&'a self, key: &'a str) -> Option<StudyContent> {
    let mut entries = self.entries.lock().ok()?;
    match entries.get(key) {
      Some((expires_at, value)) if *expires_at > Instant::now() => {
        Some(value.clone())
      }
      Some(_) => {
        entries.remove(key);
        None
      }
      None => None,
    }
  }

  async fn set(&self, key: String, value: StudyContent, ttl: Duration) {
    if let Ok(mut entries) = self.entries.lock() {
      let now = Instant::now();
      entries.retain(|_, (expires_at, _)| *expires_at > now);
      entries.insert(key, (now + ttl, value));
    }
  }
}

// ─── Context memo ────────────────────────────────────────────────────────────

/// Per-position contexts of one annotated text.
pub type ContextMap = HashMap<usize, TokenContext>;

/// Memoises [`crate::annotate::Annotation::contexts`] keyed by the SHA-256
/// of the exact raw text. Once `capacity` distinct texts are held the memo
/// is cleared.
#[derive(Debug)]
pub struct ContextMemo {
  entries:  Mutex<HashMap<String, Arc<ContextMap>>>,
  capacity: usize,
}

impl Default for ContextMemo {
  fn default() -> Self { Self::with_capacity(DEFAULT_MEMO_CAPACITY) }
}

impl ContextMemo {
  pub fn with_capacity(capacity: usize) -> Self {
    Self { entries: Mutex::new(HashMap::new()), capacity: capacity.max(1) }
  }

  pub fn text_key(raw_text: &str) -> String {
    hex::encode(Sha256::digest(raw_text.as_bytes()))
  }

  pub fn get(&self, raw_text: &str) -> Option<Arc<ContextMap>> {
    let entries = self.entries.lock().ok()?;
    entries.get(&Self::text_key(raw_text)).cloned()
  }

  pub fn insert(&self, raw_text: &str, contexts: ContextMap) -> Arc<ContextMap> {
    let contexts = Arc::new(contexts);
    if let Ok(mut entries) = self.entries.lock() {
      if entries.len() >= self.capacity {
        entries.clear();
      }
      entries.insert(Self::text_key(raw_text), Arc::clone(&contexts));
    }
    contexts
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn memo_is_keyed_by_exact_text() {
    let memo = ContextMemo::with_capacity(2);
    memo.insert("Der Arzt.", ContextMap::new());
    assert!(memo.get("Der Arzt.").is_some());
    assert!(memo.get("Der Arzt. ").is_none());

    memo.insert("b", ContextMap::new());
    memo.insert("c", ContextMap::new());
    assert!(memo.get("Der Arzt.").is_none());
    assert!(memo.get("c").is_some());
  }

  #[test]
  fn ttl_floor_is_enforced() {
    assert_eq!(effective_ttl(Duration::from_secs(5)), MIN_CACHE_TTL);
    assert_eq!(effective_ttl(DEFAULT_CACHE_TTL), DEFAULT_CACHE_TTL);
  }

  #[test]
  fn keys_ignore_lemma_case() {
    assert_eq!(
      study_key("Schmerzmittel", ProficiencyLevel::B1),
      study_key("schmerzmittel ", ProficiencyLevel::B1)
    );
    assert_ne!(
      study_key("schmerzmittel", ProficiencyLevel::B1),
      study_key("schmerzmittel", ProficiencyLevel::C1)
    );
  }

  #[tokio::test]
  async fn entries_expire() {
    let cache = MemoryCache::new();
    let content = StudyContent { desafio: "x".into(), ..Default::default() };

    cache.set("live".into(), content.clone(), Duration::from_secs(60)).await;
    cache.set("dead".into(), content.clone(), Duration::ZERO).await;

    assert_eq!(cache.get("live").await, Some(content));
    assert_eq!(cache.get("dead").await, None);
    assert_eq!(cache.len(), 1);
  }

  #[tokio::test]
  async fn writes_sweep_expired_entries() {
    let cache = MemoryCache::new();
    let content = StudyContent::default();

    for key in ["a", "b", "c"] {
      cache.set(key.into(), content.clone(), Duration::ZERO).await;
    }
    cache.set("fresh".into(), content, Duration::from_secs(60)).await;

    assert_eq!(cache.len(), 1);
    assert!(cache.get("fresh").await.is_some());
  }
}
