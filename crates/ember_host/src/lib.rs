//! # Ember Host
//!
//! The engine side of the mod boundary. The host owns all engine state a
//! mod can reach ([`HostState`]: camera, log channel, named events, key
//! and mouse input, frame delta) and lends it to one mod at a time through
//! [`ModContext`], its implementation of [`ember_mod_api::HostApi`].
//!
//! [`ModManager`] loads mods, either registered in-process or opened from
//! dynamic libraries, and drives their lifecycle:
//!
//! ```rust
//! use ember_host::{create_mod_manager, HostConfig};
//!
//! let mut manager = create_mod_manager(HostConfig::default());
//! manager.register(Box::new(hell_mod::HellMod::new())).unwrap();
//!
//! manager.scroll(2.5);
//! assert_eq!(manager.zoom(), 3.5);
//! ```

pub mod camera;
pub mod error;
pub mod events;
pub mod input;
pub mod loader;
pub mod manager;
pub mod state;

pub use camera::{Camera, ZoomPolicy};
pub use error::HostError;
pub use events::{EventManager, EventStats, QueuedEvent, UNREGISTERED_EVENT};
pub use input::ScrollDelta;
pub use loader::{load_library, LibraryMod};
pub use manager::{
    DispatchStats, DispatchSummary, ModDiscovery, ModInfo, ModManager, ModOrigin, ModSystemStats,
};
pub use state::{HostState, LogEntry, ModContext};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Host-assigned id of a loaded mod. Ids grow with load order and are never
/// reused, except that a reloaded mod keeps its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModHandle(u64);

impl ModHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mod#{}", self.0)
    }
}

/// Settings the host is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub initial_zoom: f32,
    pub zoom_policy: ZoomPolicy,
    /// Directory scanned for mod libraries.
    pub mod_directory: PathBuf,
    /// Library stems allowed by `load_all_mods`. Empty admits all.
    pub whitelist: Vec<String>,
    /// Number of mod log entries kept in memory.
    pub log_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            initial_zoom: 1.0,
            zoom_policy: ZoomPolicy::Unbounded,
            mod_directory: PathBuf::from("mods"),
            whitelist: Vec::new(),
            log_capacity: state::DEFAULT_LOG_CAPACITY,
        }
    }
}

impl HostConfig {
    pub fn camera(&self) -> Camera {
        Camera::new(self.initial_zoom, self.zoom_policy)
    }
}

/// Creates a mod manager with no mods loaded.
pub fn create_mod_manager(config: HostConfig) -> ModManager {
    ModManager::new(config)
}
