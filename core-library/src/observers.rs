//! Per-record change watchers.
//!
//! The registry keeps `Weak` references: a watcher that is dropped without
//! unregistering simply stops receiving changes and is pruned on the next
//! delivery for its id.

use crate::cache::Canonical;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Receives a change for every mutation of a watched record.
pub trait RecordObserver<T>: Send + Sync {
    fn record_changed(&self, record: &Canonical<T>);
}

type WeakObserver<T> = Weak<dyn RecordObserver<T>>;

/// Watchers registered per record id, in registration order.
pub struct ObserverRegistry<T> {
    watchers: Mutex<HashMap<String, Vec<WeakObserver<T>>>>,
}

impl<T: 'static> ObserverRegistry<T> {
    pub fn new() -> Self {
        Self {
            watchers: Mutex::new(HashMap::new()),
        }
    }

    /// Register `observer` for `id`.
    ///
    /// Returns `false` when the observer is already registered for that id;
    /// each watcher receives a change at most once.
    pub fn register<O>(&self, observer: &Arc<O>, id: &str) -> bool
    where
        O: RecordObserver<T> + 'static,
    {
        let observer: Arc<dyn RecordObserver<T>> = observer.clone();
        self.register_dyn(Arc::downgrade(&observer), id)
    }

    /// Register `observer` for every id in `ids`. Returns how many were new.
    pub fn register_all<O, I, S>(&self, observer: &Arc<O>, ids: I) -> usize
    where
        O: RecordObserver<T> + 'static,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter()
            .filter(|id| self.register(observer, id.as_ref()))
            .count()
    }

    pub(crate) fn register_dyn(&self, observer: WeakObserver<T>, id: &str) -> bool {
        let mut watchers = self.watchers.lock();
        let list = watchers.entry(id.to_string()).or_default();
        list.retain(|w| w.strong_count() > 0);
        if list.iter().any(|w| same_observer(w, &observer)) {
            return false;
        }
        list.push(observer);
        true
    }

    /// Remove `observer` from each id in `ids`. Unknown pairs are ignored.
    pub fn remove<O, I, S>(&self, observer: &Arc<O>, ids: I)
    where
        O: RecordObserver<T> + 'static,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let observer: Arc<dyn RecordObserver<T>> = observer.clone();
        let weak = Arc::downgrade(&observer);
        for id in ids {
            self.remove_dyn(&weak, id.as_ref());
        }
    }

    pub(crate) fn remove_dyn(&self, observer: &WeakObserver<T>, id: &str) {
        let mut watchers = self.watchers.lock();
        if let Some(list) = watchers.get_mut(id) {
            list.retain(|w| !same_observer(w, observer) && w.strong_count() > 0);
            if list.is_empty() {
                watchers.remove(id);
            }
        }
    }

    /// Remove `observer` from every id it watches.
    pub fn remove_everywhere<O>(&self, observer: &Arc<O>)
    where
        O: RecordObserver<T> + 'static,
    {
        let observer: Arc<dyn RecordObserver<T>> = observer.clone();
        let weak = Arc::downgrade(&observer);
        let mut watchers = self.watchers.lock();
        watchers.retain(|_, list| {
            list.retain(|w| !same_observer(w, &weak) && w.strong_count() > 0);
            !list.is_empty()
        });
    }

    /// Deliver a change to the live watchers of `id`.
    ///
    /// Watchers run after the registry lock is released, so they may
    /// register or remove observers themselves.
    pub fn notify(&self, id: &str, record: &Canonical<T>) -> usize {
        let live: Vec<Arc<dyn RecordObserver<T>>> = {
            let mut watchers = self.watchers.lock();
            let Some(list) = watchers.get_mut(id) else {
                return 0;
            };
            list.retain(|w| w.strong_count() > 0);
            list.iter().filter_map(|w| w.upgrade()).collect()
        };

        for observer in &live {
            observer.record_changed(record);
        }
        live.len()
    }

    /// Number of live watchers for `id`.
    pub fn watcher_count(&self, id: &str) -> usize {
        self.watchers
            .lock()
            .get(id)
            .map_or(0, |list| list.iter().filter(|w| w.strong_count() > 0).count())
    }
}

impl<T: 'static> Default for ObserverRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn same_observer<T>(a: &WeakObserver<T>, b: &WeakObserver<T>) -> bool {
    std::ptr::addr_eq(a.as_ptr(), b.as_ptr())
}

/// Scoped registration: removes the observer from its ids when dropped.
#[must_use = "the observer is unregistered when the guard is dropped"]
pub struct ObserverGuard<T: 'static> {
    registry: Weak<ObserverRegistry<T>>,
    observer: WeakObserver<T>,
    ids: Vec<String>,
}

impl<T: 'static> ObserverGuard<T> {
    pub(crate) fn new(
        registry: &Arc<ObserverRegistry<T>>,
        observer: WeakObserver<T>,
        ids: Vec<String>,
    ) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            observer,
            ids,
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

impl<T: 'static> Drop for ObserverGuard<T> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            for id in &self.ids {
                registry.remove_dyn(&self.observer, id);
            }
        }
    }
}
