//! Workspace placeholder crate.
//!
//! This crate exposes feature flags that map onto the individual workspace
//! crates. Hosts that want the whole playback core (engine, identity cache,
//! runtime wiring) enable `service`; hosts that drive the engine themselves
//! enable `playback-only` and skip the service façade.

#[cfg(feature = "service")]
pub use core_service;

#[cfg(feature = "playback-only")]
pub use core_library;
#[cfg(feature = "playback-only")]
pub use core_playback;
