//! Identity cache
//!
//! One canonical, shared instance per record id. Every consumer that asks
//! for id `"42"` gets a handle to the same allocation, so a change made
//! through the store is immediately visible everywhere.
//!
//! Records are mutated only through [`EntityStore::upsert`] and
//! [`EntityStore::mutate`]; both deliver a change to the record's watchers
//! after the write lock is released. The cache is unbounded and lives as
//! long as its owner.

use crate::error::{LibraryError, Result};
use crate::models::{raw_id, CacheEntity, EntityKind, Episode, Series, User};
use crate::observers::{ObserverGuard, ObserverRegistry, RecordObserver};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Shared handle to the canonical instance of a record.
pub struct Canonical<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> Canonical<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write()
    }

    /// Whether both handles point to the same canonical instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> Canonical<T> {
    pub fn snapshot(&self) -> T {
        self.inner.read().clone()
    }
}

impl<T> Clone for Canonical<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Canonical<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Canonical").field(&*self.inner.read()).finish()
    }
}

/// Canonical records of one kind plus their watchers.
pub struct EntityStore<T: CacheEntity> {
    records: RwLock<HashMap<String, Canonical<T>>>,
    observers: Arc<ObserverRegistry<T>>,
}

impl<T: CacheEntity> EntityStore<T> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            observers: Arc::new(ObserverRegistry::new()),
        }
    }

    /// Create or update the record described by `raw`.
    ///
    /// An existing record keeps its identity and only the fields present in
    /// `raw` change. A payload that fails to decode changes nothing.
    #[instrument(skip(self, raw), fields(kind = %T::KIND))]
    pub fn upsert(&self, raw: &Value) -> Result<Canonical<T>> {
        let id = raw_id(raw)?;
        let patch: T::Patch =
            serde_json::from_value(raw.clone()).map_err(|e| LibraryError::InvalidRecord {
                kind: T::KIND,
                message: e.to_string(),
            })?;

        let (record, created) = {
            let mut records = self.records.write();
            match records.get(&id) {
                Some(existing) => {
                    existing.write().apply(patch);
                    (existing.clone(), false)
                }
                None => {
                    let record = Canonical::new(T::create(id.clone(), patch));
                    records.insert(id.clone(), record.clone());
                    (record, true)
                }
            }
        };

        debug!(id = %id, created, "Record upserted");
        self.observers.notify(&id, &record);
        Ok(record)
    }

    pub fn get(&self, id: &str) -> Option<Canonical<T>> {
        self.records.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.read().contains_key(id)
    }

    /// Apply `change` to the canonical record and notify its watchers.
    pub fn mutate<R>(&self, id: &str, change: impl FnOnce(&mut T) -> R) -> Result<R> {
        let record = self.get(id).ok_or_else(|| LibraryError::NotFound {
            kind: T::KIND,
            id: id.to_string(),
        })?;

        let result = {
            let mut guard = record.write();
            change(&mut guard)
        };

        self.observers.notify(id, &record);
        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn observers(&self) -> &ObserverRegistry<T> {
        &self.observers
    }

    pub fn register_observer<O>(&self, observer: &Arc<O>, id: &str) -> bool
    where
        O: RecordObserver<T> + 'static,
    {
        self.observers.register(observer, id)
    }

    pub fn remove_observer<O, I, S>(&self, observer: &Arc<O>, ids: I)
    where
        O: RecordObserver<T> + 'static,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.observers.remove(observer, ids)
    }

    /// Register `observer` for `ids` until the returned guard is dropped.
    pub fn watch<O, I, S>(&self, observer: &Arc<O>, ids: I) -> ObserverGuard<T>
    where
        O: RecordObserver<T> + 'static,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let observer: Arc<dyn RecordObserver<T>> = observer.clone();
        let weak = Arc::downgrade(&observer);
        let ids: Vec<String> = ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .filter(|id| self.observers.register_dyn(weak.clone(), id))
            .collect();
        ObserverGuard::new(&self.observers, weak, ids)
    }
}

impl<T: CacheEntity> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`IdentityCache::upsert`].
#[derive(Debug, Clone)]
pub enum CachedRecord {
    Episode(Canonical<Episode>),
    Series(Canonical<Series>),
    User(Canonical<User>),
}

impl CachedRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            CachedRecord::Episode(_) => EntityKind::Episode,
            CachedRecord::Series(_) => EntityKind::Series,
            CachedRecord::User(_) => EntityKind::User,
        }
    }
}

/// Canonical stores for every record kind.
#[derive(Default)]
pub struct IdentityCache {
    episodes: EntityStore<Episode>,
    series: EntityStore<Series>,
    users: EntityStore<User>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn episodes(&self) -> &EntityStore<Episode> {
        &self.episodes
    }

    pub fn series(&self) -> &EntityStore<Series> {
        &self.series
    }

    pub fn users(&self) -> &EntityStore<User> {
        &self.users
    }

    pub fn upsert(&self, kind: EntityKind, raw: &Value) -> Result<CachedRecord> {
        Ok(match kind {
            EntityKind::Episode => CachedRecord::Episode(self.episodes.upsert(raw)?),
            EntityKind::Series => CachedRecord::Series(self.series.upsert(raw)?),
            EntityKind::User => CachedRecord::User(self.users.upsert(raw)?),
        })
    }

    pub fn upsert_episode(&self, raw: &Value) -> Result<Canonical<Episode>> {
        self.episodes.upsert(raw)
    }

    /// Upsert every element of a JSON array of episodes, stopping at the first bad one.
    pub fn upsert_episodes(&self, raw: &[Value]) -> Result<Vec<Canonical<Episode>>> {
        raw.iter().map(|item| self.episodes.upsert(item)).collect()
    }

    pub fn episode(&self, id: &str) -> Option<Canonical<Episode>> {
        self.episodes.get(id)
    }

    pub fn register_episode_observer<O>(&self, observer: &Arc<O>, id: &str) -> bool
    where
        O: RecordObserver<Episode> + 'static,
    {
        self.episodes.register_observer(observer, id)
    }

    /// Watch every episode in `episodes`.
    pub fn register_episode_observer_for<O>(
        &self,
        observer: &Arc<O>,
        episodes: &[Canonical<Episode>],
    ) -> usize
    where
        O: RecordObserver<Episode> + 'static,
    {
        let ids: Vec<String> = episodes.iter().map(|e| e.read().id.clone()).collect();
        self.episodes.observers().register_all(observer, ids)
    }

    pub fn remove_episode_observer<O, I, S>(&self, observer: &Arc<O>, ids: I)
    where
        O: RecordObserver<Episode> + 'static,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.episodes.remove_observer(observer, ids)
    }
}

impl fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityCache")
            .field("episodes", &self.episodes.len())
            .field("series", &self.series.len())
            .field("users", &self.users.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upsert_keeps_identity() {
        let cache = IdentityCache::new();
        let first = cache
            .upsert_episode(&json!({"id": "42", "title": "Old"}))
            .unwrap();
        let second = cache
            .upsert_episode(&json!({"id": "42", "title": "New"}))
            .unwrap();

        assert!(first.ptr_eq(&second));
        assert_eq!(first.read().title, "New");
        assert_eq!(cache.episodes().len(), 1);
    }

    #[test]
    fn test_invalid_payload_changes_nothing() {
        let cache = IdentityCache::new();
        cache
            .upsert_episode(&json!({"id": "42", "title": "Kept"}))
            .unwrap();

        let result = cache.upsert_episode(&json!({"id": "42", "title": 7}));
        assert!(matches!(result, Err(LibraryError::InvalidRecord { .. })));
        assert_eq!(cache.episode("42").unwrap().read().title, "Kept");
    }

    #[test]
    fn test_mutate_missing_record() {
        let cache = IdentityCache::new();
        let result = cache.episodes().mutate("nope", |e| e.is_playing = true);
        assert!(matches!(result, Err(LibraryError::NotFound { .. })));
    }

    #[test]
    fn test_kinds_are_separate() {
        let cache = IdentityCache::new();
        let series = cache
            .upsert(EntityKind::Series, &json!({"id": 1, "title": "Show"}))
            .unwrap();
        let user = cache
            .upsert(EntityKind::User, &json!({"id": 1, "username": "ada"}))
            .unwrap();

        assert_eq!(series.kind(), EntityKind::Series);
        assert_eq!(user.kind(), EntityKind::User);
        assert!(cache.episode("1").is_none());
        assert_eq!(cache.series().get("1").unwrap().read().title, "Show");
    }

    #[test]
    fn test_upsert_episodes_batch() {
        let cache = IdentityCache::new();
        let episodes = cache
            .upsert_episodes(&[json!({"id": "a"}), json!({"id": "b"})])
            .unwrap();
        assert_eq!(episodes.len(), 2);
        assert!(cache.episodes().contains("b"));
    }
}
