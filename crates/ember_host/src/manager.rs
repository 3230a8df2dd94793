//! Mod manager: owns the host state and every loaded mod, and drives their
//! lifecycle.

use crate::error::HostError;
use crate::events::EventStats;
use crate::input::ScrollDelta;
use crate::loader::{self, is_library_path};
use crate::state::HostState;
use crate::{HostConfig, ModHandle};
use ember_mod_api::{dispatch, EventData, GameMod, KeyCode, Lifecycle, LifecycleCall, ModError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Where a loaded mod came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum ModOrigin {
    /// Registered in-process.
    Builtin,
    Library(PathBuf),
}

/// Per-mod callback counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub calls: u64,
    pub failures: u64,
    pub panics: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModInfo {
    pub handle: ModHandle,
    pub name: String,
    pub version: String,
    pub origin: ModOrigin,
    pub stats: DispatchStats,
}

/// A library found on disk by [`ModManager::discover_mods`].
#[derive(Debug, Clone, Serialize)]
pub struct ModDiscovery {
    pub name: String,
    pub path: PathBuf,
    pub is_loaded: bool,
}

/// Outcome of one dispatch pass over the loaded mods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub failed: usize,
}

impl DispatchSummary {
    fn record(&mut self, result: Result<(), HostError>) {
        self.delivered += 1;
        if result.is_err() {
            self.failed += 1;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModSystemStats {
    pub loaded_mods: usize,
    pub library_mods: usize,
    pub builtin_mods: usize,
    pub zoom: f32,
    pub total_calls: u64,
    pub total_failures: u64,
    pub total_panics: u64,
    pub log_entries: usize,
    pub key_subscriptions: usize,
    pub rejected_text: u64,
    pub events: EventStats,
}

struct LoadedMod {
    handle: ModHandle,
    name: String,
    version: String,
    origin: ModOrigin,
    stats: DispatchStats,
    game_mod: Box<dyn GameMod>,
}

impl LoadedMod {
    fn info(&self) -> ModInfo {
        ModInfo {
            handle: self.handle,
            name: self.name.clone(),
            version: self.version.clone(),
            origin: self.origin.clone(),
            stats: self.stats,
        }
    }
}

/// Loads mods, owns the engine state they act on and dispatches lifecycle
/// callbacks to them in load order.
///
/// Every dispatch method takes `&mut self`, so at most one callback runs at
/// a time. A callback that fails or panics is logged and counted; the other
/// mods still receive the call.
pub struct ModManager {
    state: HostState,
    mods: BTreeMap<ModHandle, LoadedMod>,
    next_handle: u64,
    mod_directory: PathBuf,
    whitelist: Vec<String>,
}

impl ModManager {
    pub fn new(config: HostConfig) -> Self {
        let state = HostState::new(config.camera(), config.log_capacity);
        Self {
            state,
            mods: BTreeMap::new(),
            next_handle: 1,
            mod_directory: config.mod_directory,
            whitelist: config.whitelist,
        }
    }

    pub fn state(&self) -> &HostState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut HostState {
        &mut self.state
    }

    pub fn zoom(&self) -> f32 {
        self.state.camera.zoom()
    }

    /// Registers an in-process mod and runs its `init`.
    pub fn register(&mut self, game_mod: Box<dyn GameMod>) -> Result<ModHandle, HostError> {
        let handle = self.allocate_handle();
        self.install(handle, game_mod, ModOrigin::Builtin, DispatchStats::default())
    }

    /// Loads a mod from a dynamic library and runs its `init`.
    pub fn load_library(&mut self, path: impl AsRef<Path>) -> Result<ModHandle, HostError> {
        let path = path.as_ref();
        info!("Loading mod library from: {}", path.display());
        let loaded = loader::load_library(path)?;
        let handle = self.allocate_handle();
        self.install(
            handle,
            Box::new(loaded),
            ModOrigin::Library(path.to_path_buf()),
            DispatchStats::default(),
        )
    }

    fn allocate_handle(&mut self) -> ModHandle {
        let handle = ModHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn install(
        &mut self,
        handle: ModHandle,
        game_mod: Box<dyn GameMod>,
        origin: ModOrigin,
        stats: DispatchStats,
    ) -> Result<ModHandle, HostError> {
        let name = game_mod.name().to_string();
        if self.find_by_name(&name).is_some() {
            return Err(HostError::AlreadyLoaded(name));
        }

        let mut loaded = LoadedMod {
            handle,
            version: game_mod.version().to_string(),
            name,
            origin,
            stats,
            game_mod,
        };

        if let Err(e) = invoke(&mut self.state, &mut loaded, LifecycleCall::Init) {
            error!("Mod {} initialization failed: {}", loaded.name, e);
            self.state.forget_mod(handle);
            return Err(e);
        }

        info!("Mod {} v{} loaded as {}", loaded.name, loaded.version, handle);
        self.mods.insert(handle, loaded);
        Ok(handle)
    }

    /// Delivers queued events, then calls `update` on every mod.
    pub fn update(&mut self, delta_time: f32) -> DispatchSummary {
        self.state.set_delta_time(delta_time);
        let mut summary = self.deliver_events();

        for loaded in self.mods.values_mut() {
            summary.record(invoke(&mut self.state, loaded, LifecycleCall::Update));
        }
        summary
    }

    fn deliver_events(&mut self) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        for loaded in self.mods.values_mut() {
            for queued in self.state.events.drain(loaded.handle) {
                let call = LifecycleCall::Event(queued.handle, &queued.data);
                summary.record(invoke(&mut self.state, loaded, call));
            }
        }
        summary
    }

    /// Calls `key_event` on every mod that wants `key`.
    pub fn key_event(&mut self, key: impl Into<KeyCode>) -> DispatchSummary {
        let key = key.into();
        let mut summary = DispatchSummary::default();
        for loaded in self.mods.values_mut() {
            if self.state.wants_key(loaded.handle, key) {
                summary.record(invoke(&mut self.state, loaded, LifecycleCall::KeyEvent(key)));
            }
        }
        summary
    }

    /// Marks `key` as held, then delivers it like [`ModManager::key_event`].
    /// A key that is already held is not delivered again.
    pub fn press_key(&mut self, key: impl Into<KeyCode>) -> DispatchSummary {
        let key = key.into();
        if !self.state.press_key(key) {
            return DispatchSummary::default();
        }
        self.key_event(key)
    }

    pub fn release_key(&mut self, key: impl Into<KeyCode>) {
        let key = key.into();
        if !self.state.release_key(key) {
            debug!("Released {} without a matching press", key);
        }
    }

    /// Calls `scroll` on every mod. A zero delta is not dispatched.
    pub fn scroll(&mut self, amount: f32) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        if amount == 0.0 {
            return summary;
        }
        for loaded in self.mods.values_mut() {
            summary.record(invoke(&mut self.state, loaded, LifecycleCall::Scroll(amount)));
        }
        summary
    }

    pub fn scroll_input(&mut self, delta: ScrollDelta) -> DispatchSummary {
        self.scroll(delta.amount())
    }

    /// Queues a host-originated event; it reaches subscribers on the next
    /// update. Returns the number of queued deliveries.
    pub fn emit_event(&mut self, name: &str, data: EventData) -> usize {
        let queued = self.state.events.emit_from_host(name, data);
        debug!("Host event {} queued for {} mods", name, queued);
        queued
    }

    /// Calls `shutdown` and drops the mod. A failing `shutdown` is logged
    /// and the mod is unloaded anyway.
    pub fn unload(&mut self, handle: ModHandle) -> Result<(), HostError> {
        let mut loaded = self.mods.remove(&handle).ok_or(HostError::NotFound(handle))?;
        info!("Unloading mod: {}", loaded.name);
        self.retire(&mut loaded);
        info!("Mod {} unloaded successfully", loaded.name);
        Ok(())
    }

    fn retire(&mut self, loaded: &mut LoadedMod) {
        if let Err(e) = invoke(&mut self.state, loaded, LifecycleCall::Shutdown) {
            error!("Error shutting down mod {}: {}", loaded.name, e);
        }
        self.state.forget_mod(loaded.handle);
    }

    /// Reopens a library mod from its path under the same handle and runs
    /// `init` again. The old instance is shut down and its library closed
    /// first. The platform loader may keep the old image mapped, so a
    /// rebuilt file is not guaranteed to be picked up. If the library does
    /// not come back, the mod stays unloaded.
    pub fn reload(&mut self, handle: ModHandle) -> Result<(), HostError> {
        let path = match &self.mods.get(&handle).ok_or(HostError::NotFound(handle))?.origin {
            ModOrigin::Library(path) => path.clone(),
            ModOrigin::Builtin => return Err(HostError::NotReloadable(handle)),
        };

        let stats = {
            let Some(mut old) = self.mods.remove(&handle) else {
                return Err(HostError::NotFound(handle));
            };
            info!("Reloading mod {} from {}", old.name, path.display());
            self.retire(&mut old);
            old.stats
        };

        let fresh = loader::load_library(&path)?;
        self.install(handle, Box::new(fresh), ModOrigin::Library(path), stats)?;
        Ok(())
    }

    /// Reloads every library mod. Returns the handles that came back;
    /// failures are logged.
    pub fn reload_all(&mut self) -> Vec<ModHandle> {
        let handles: Vec<_> = self
            .mods
            .values()
            .filter(|loaded| matches!(loaded.origin, ModOrigin::Library(_)))
            .map(|loaded| loaded.handle)
            .collect();

        let mut reloaded = Vec::new();
        for handle in handles {
            match self.reload(handle) {
                Ok(()) => reloaded.push(handle),
                Err(e) => error!("Failed to reload {}: {}", handle, e),
            }
        }
        reloaded
    }

    /// Lists mod libraries in the configured directory. A missing directory
    /// yields an empty list.
    pub async fn discover_mods(&self) -> Result<Vec<ModDiscovery>, HostError> {
        if !self.mod_directory.exists() {
            warn!(
                "Mod directory does not exist: {}",
                self.mod_directory.display()
            );
            return Ok(Vec::new());
        }

        let mut discoveries = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.mod_directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_library_path(&path) {
                continue;
            }
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let is_loaded = self.is_path_loaded(&path);
            discoveries.push(ModDiscovery {
                name,
                path,
                is_loaded,
            });
        }

        discoveries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(discoveries)
    }

    /// Loads every discovered library that passes the whitelist. Libraries
    /// that fail to load are logged and skipped.
    pub async fn load_all_mods(&mut self) -> Result<Vec<ModHandle>, HostError> {
        let discoveries = self.discover_mods().await?;
        info!(
            "Found {} mod libraries in {}",
            discoveries.len(),
            self.mod_directory.display()
        );

        let mut loaded = Vec::new();
        let mut failed = Vec::new();
        for discovery in discoveries {
            if discovery.is_loaded {
                debug!("Skipping already loaded mod: {}", discovery.name);
                continue;
            }
            if !self.is_whitelisted(&discovery.name) {
                info!("Skipping mod {} (not whitelisted)", discovery.name);
                continue;
            }
            match self.load_library(&discovery.path) {
                Ok(handle) => loaded.push(handle),
                Err(e) => {
                    error!("Failed to load mod {}: {}", discovery.name, e);
                    failed.push((discovery.name, e));
                }
            }
        }

        if !failed.is_empty() {
            warn!("Failed to load {} mods", failed.len());
            for (name, error) in &failed {
                warn!("  {}: {}", name, error);
            }
        }
        info!("Loaded {} mods", loaded.len());
        Ok(loaded)
    }

    /// Empty whitelist admits everything. Entries match the file stem with
    /// or without a leading `lib`.
    fn is_whitelisted(&self, stem: &str) -> bool {
        if self.whitelist.is_empty() {
            return true;
        }
        let bare = stem.strip_prefix("lib").unwrap_or(stem);
        self.whitelist
            .iter()
            .any(|allowed| allowed == stem || allowed == bare)
    }

    fn is_path_loaded(&self, path: &Path) -> bool {
        self.mods
            .values()
            .any(|loaded| matches!(&loaded.origin, ModOrigin::Library(p) if p == path))
    }

    /// Unloads every mod, newest first.
    pub fn shutdown_all(&mut self) {
        if self.mods.is_empty() {
            return;
        }
        info!("Shutting down {} mods", self.mods.len());
        while let Some((_, mut loaded)) = self.mods.pop_last() {
            self.retire(&mut loaded);
            debug!("Mod {} shut down", loaded.name);
        }
    }

    /// Loaded mods in load order.
    pub fn loaded_mods(&self) -> Vec<ModInfo> {
        self.mods.values().map(LoadedMod::info).collect()
    }

    pub fn mod_info(&self, handle: ModHandle) -> Option<ModInfo> {
        self.mods.get(&handle).map(LoadedMod::info)
    }

    pub fn find_by_name(&self, name: &str) -> Option<ModHandle> {
        self.mods
            .values()
            .find(|loaded| loaded.name == name)
            .map(|loaded| loaded.handle)
    }

    pub fn mod_count(&self) -> usize {
        self.mods.len()
    }

    pub fn stats(&self) -> ModSystemStats {
        let library_mods = self
            .mods
            .values()
            .filter(|loaded| matches!(loaded.origin, ModOrigin::Library(_)))
            .count();
        let (calls, failures, panics) = self.mods.values().fold((0, 0, 0), |acc, loaded| {
            (
                acc.0 + loaded.stats.calls,
                acc.1 + loaded.stats.failures,
                acc.2 + loaded.stats.panics,
            )
        });

        ModSystemStats {
            loaded_mods: self.mods.len(),
            library_mods,
            builtin_mods: self.mods.len() - library_mods,
            zoom: self.zoom(),
            total_calls: calls,
            total_failures: failures,
            total_panics: panics,
            log_entries: self.state.log().count(),
            key_subscriptions: self.state.key_subscription_count(),
            rejected_text: self.state.rejected_text_count(),
            events: self.state.events.stats(),
        }
    }
}

impl Drop for ModManager {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}

/// Runs one callback with panic isolation and updates the mod's counters.
fn invoke(
    state: &mut HostState,
    loaded: &mut LoadedMod,
    call: LifecycleCall<'_>,
) -> Result<(), HostError> {
    let lifecycle = call.lifecycle();
    let mut ctx = state.context(loaded.handle);
    let game_mod = loaded.game_mod.as_mut();
    let result = catch_unwind(AssertUnwindSafe(|| dispatch(game_mod, &mut ctx, call)))
        .unwrap_or_else(|payload| Err(ModError::from_panic(payload)));

    loaded.stats.calls += 1;
    match result {
        Ok(()) => Ok(()),
        Err(source) => {
            loaded.stats.failures += 1;
            if matches!(source, ModError::Panicked(_)) {
                loaded.stats.panics += 1;
            }
            if lifecycle != Lifecycle::Init && lifecycle != Lifecycle::Shutdown {
                error!("Mod {} {:?} callback failed: {}", loaded.name, lifecycle, source);
            }
            Err(HostError::Mod {
                name: loaded.name.clone(),
                source,
            })
        }
    }
}
