//! Change delivery through the identity cache.

use core_library::{Canonical, Episode, IdentityCache, RecordObserver};
use mockall::mock;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

mock! {
    Watcher {}

    impl RecordObserver<Episode> for Watcher {
        fn record_changed(&self, record: &Canonical<Episode>);
    }
}

/// Appends its label to a shared log on every change.
struct Labelled {
    label: &'static str,
    log: Arc<Mutex<Vec<(&'static str, String)>>>,
}

impl RecordObserver<Episode> for Labelled {
    fn record_changed(&self, record: &Canonical<Episode>) {
        self.log.lock().push((self.label, record.read().title.clone()));
    }
}

#[test]
fn observers_are_notified_in_registration_order() {
    let cache = IdentityCache::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let first = Arc::new(Labelled {
        label: "first",
        log: log.clone(),
    });
    let second = Arc::new(Labelled {
        label: "second",
        log: log.clone(),
    });

    cache.upsert_episode(&json!({"id": "42", "title": "Before"})).unwrap();
    cache.register_episode_observer(&first, "42");
    cache.register_episode_observer(&second, "42");

    cache
        .episodes()
        .mutate("42", |episode| episode.title = "After".to_string())
        .unwrap();

    assert_eq!(
        *log.lock(),
        vec![("first", "After".to_string()), ("second", "After".to_string())]
    );
}

#[test]
fn upsert_of_existing_record_notifies_once() {
    let cache = IdentityCache::new();
    cache.upsert_episode(&json!({"id": "7"})).unwrap();

    let mut watcher = MockWatcher::new();
    watcher
        .expect_record_changed()
        .withf(|record| record.read().is_bookmarked)
        .times(1)
        .return_const(());
    let watcher = Arc::new(watcher);

    cache.register_episode_observer(&watcher, "7");
    cache.register_episode_observer(&watcher, "7");
    cache
        .upsert_episode(&json!({"id": "7", "isBookmarked": true}))
        .unwrap();
}

#[test]
fn removed_observer_receives_nothing() {
    let cache = IdentityCache::new();
    let episodes = cache
        .upsert_episodes(&[json!({"id": "a"}), json!({"id": "b"})])
        .unwrap();

    let mut watcher = MockWatcher::new();
    watcher.expect_record_changed().times(0);
    let watcher = Arc::new(watcher);

    assert_eq!(cache.register_episode_observer_for(&watcher, &episodes), 2);
    cache.remove_episode_observer(&watcher, ["a", "b", "never-registered"]);

    cache.episodes().mutate("a", |e| e.is_downloaded = true).unwrap();
    cache.episodes().mutate("b", |e| e.is_downloaded = true).unwrap();
}

#[test]
fn guard_scopes_registration() {
    let cache = IdentityCache::new();
    cache.upsert_episode(&json!({"id": "g"})).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let watcher = Arc::new(Labelled {
        label: "scoped",
        log: log.clone(),
    });

    {
        let guard = cache.episodes().watch(&watcher, ["g"]);
        assert_eq!(guard.ids(), ["g".to_string()]);
        cache.episodes().mutate("g", |e| e.title = "one".into()).unwrap();
    }
    cache.episodes().mutate("g", |e| e.title = "two".into()).unwrap();

    assert_eq!(*log.lock(), vec![("scoped", "one".to_string())]);
}

#[test]
fn every_consumer_sees_the_same_instance() {
    let cache = IdentityCache::new();
    let held_by_list = cache.upsert_episode(&json!({"id": "42", "title": "A"})).unwrap();
    let held_by_player = cache.episode("42").unwrap();

    cache
        .upsert_episode(&json!({"id": "42", "currentProgress": 0.5}))
        .unwrap();

    assert!(held_by_list.ptr_eq(&held_by_player));
    assert_eq!(held_by_player.read().current_progress, 0.5);
    assert_eq!(held_by_player.read().title, "A");
}
