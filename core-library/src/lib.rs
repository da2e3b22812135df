//! # Library Module
//!
//! Owns the canonical podcast records (episodes, series, users) and
//! broadcasts their changes.
//!
//! ## Overview
//!
//! - [`IdentityCache`](cache::IdentityCache): one shared instance per record id
//! - [`ObserverRegistry`](observers::ObserverRegistry): per-id watchers, notified
//!   synchronously on every mutation
//! - Domain models decoded from raw JSON payloads

pub mod cache;
pub mod error;
pub mod models;
pub mod observers;

pub use cache::{Canonical, CachedRecord, EntityStore, IdentityCache};
pub use error::{LibraryError, Result};
pub use models::{CacheEntity, EntityKind, Episode, Series, User};
pub use observers::{ObserverGuard, ObserverRegistry, RecordObserver};
