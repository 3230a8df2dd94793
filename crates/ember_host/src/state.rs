//! Engine state owned by the host and the per-call view mods get of it.

use crate::camera::Camera;
use crate::events::{EventManager, UNREGISTERED_EVENT};
use crate::ModHandle;
use ember_mod_api::{EventData, EventHandle, HostApi, KeyCode, LogLevel, ModError, ModStr, Position};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, error, info, trace, warn};

pub const DEFAULT_LOG_CAPACITY: usize = 1024;

/// One message a mod logged through the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: String,
    pub message: String,
    /// The mod that was running, if any.
    pub source: Option<ModHandle>,
}

#[derive(Debug)]
pub struct HostState {
    pub camera: Camera,
    pub events: EventManager,
    log: VecDeque<LogEntry>,
    log_capacity: usize,
    key_subscriptions: HashMap<ModHandle, HashSet<KeyCode>>,
    pressed_keys: HashSet<KeyCode>,
    mouse: Position,
    delta_time: f32,
    rejected_text: u64,
}

impl Default for HostState {
    fn default() -> Self {
        Self::new(Camera::default(), DEFAULT_LOG_CAPACITY)
    }
}

impl HostState {
    pub fn new(camera: Camera, log_capacity: usize) -> Self {
        Self {
            camera,
            events: EventManager::new(),
            log: VecDeque::new(),
            log_capacity: log_capacity.max(1),
            key_subscriptions: HashMap::new(),
            pressed_keys: HashSet::new(),
            mouse: Position::ORIGIN,
            delta_time: 0.0,
            rejected_text: 0,
        }
    }

    /// Borrows the state as the `HostApi` handed to `handle`'s callbacks.
    pub fn context(&mut self, handle: ModHandle) -> ModContext<'_> {
        ModContext {
            state: self,
            handle,
        }
    }

    /// Records a log entry and forwards it to `tracing`. The oldest entry
    /// is dropped once the buffer is full.
    pub fn record(&mut self, entry: LogEntry) {
        let module = entry.module.as_str();
        let message = entry.message.as_str();
        match entry.level {
            LogLevel::Error => error!(module = %module, "{}", message),
            LogLevel::Warn => warn!(module = %module, "{}", message),
            LogLevel::Info => info!(module = %module, "{}", message),
            LogLevel::Debug => debug!(module = %module, "{}", message),
            LogLevel::Trace => trace!(module = %module, "{}", message),
        }

        if self.log.len() == self.log_capacity {
            self.log.pop_front();
        }
        self.log.push_back(entry);
    }

    /// Recorded entries, oldest first.
    pub fn log(&self) -> impl Iterator<Item = &LogEntry> {
        self.log.iter()
    }

    pub fn last_log(&self) -> Option<&LogEntry> {
        self.log.back()
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    pub fn set_delta_time(&mut self, delta: f32) {
        self.delta_time = delta;
    }

    /// Whether `handle` should see `key`. Mods without subscriptions see
    /// every key.
    pub fn wants_key(&self, handle: ModHandle, key: KeyCode) -> bool {
        match self.key_subscriptions.get(&handle) {
            Some(keys) => keys.contains(&key),
            None => true,
        }
    }

    pub fn key_subscription_count(&self) -> usize {
        self.key_subscriptions.values().map(HashSet::len).sum()
    }

    /// Marks `key` as held. Returns `false` if it already was.
    pub fn press_key(&mut self, key: KeyCode) -> bool {
        self.pressed_keys.insert(key)
    }

    /// Returns `false` if `key` was not held.
    pub fn release_key(&mut self, key: KeyCode) -> bool {
        self.pressed_keys.remove(&key)
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn mouse_position(&self) -> Position {
        self.mouse
    }

    pub fn set_mouse_position(&mut self, position: Position) {
        self.mouse = position;
    }

    /// Mod strings dropped because they were not valid UTF-8.
    pub fn rejected_text_count(&self) -> u64 {
        self.rejected_text
    }

    fn reject_text(&mut self, handle: ModHandle, what: &str, text: ModStr<'_>, err: ModError) {
        self.rejected_text += 1;
        warn!(
            "{} passed a {} of {} bytes that is not valid UTF-8, dropped: {}",
            handle,
            what,
            text.len(),
            err
        );
    }

    /// Drops everything the host tracks for an unloaded mod.
    pub fn forget_mod(&mut self, handle: ModHandle) {
        self.key_subscriptions.remove(&handle);
        self.events.forget(handle);
    }
}

/// [`HostApi`] implementation scoped to one mod and one callback.
pub struct ModContext<'a> {
    state: &'a mut HostState,
    handle: ModHandle,
}

impl HostApi for ModContext<'_> {
    /// Copies both strings exactly. A string that is not UTF-8 drops the
    /// whole entry rather than recording altered text.
    fn log(&mut self, level: LogLevel, module: ModStr<'_>, message: ModStr<'_>) {
        let module = match module.to_str() {
            Ok(text) => text,
            Err(e) => return self.state.reject_text(self.handle, "log module", module, e),
        };
        let message = match message.to_str() {
            Ok(text) => text,
            Err(e) => return self.state.reject_text(self.handle, "log message", message, e),
        };
        self.state.record(LogEntry {
            level,
            module: module.to_string(),
            message: message.to_string(),
            source: Some(self.handle),
        });
    }

    fn get_zoom(&self) -> f32 {
        self.state.camera.zoom()
    }

    fn set_zoom(&mut self, zoom: f32) {
        self.state.camera.set_zoom(zoom);
    }

    fn get_camera_position(&self) -> Position {
        self.state.camera.position()
    }

    fn set_camera_position(&mut self, position: Position) {
        self.state.camera.set_position(position);
    }

    fn delta_time(&self) -> f32 {
        self.state.delta_time
    }

    fn subscribe_key(&mut self, key: KeyCode) {
        self.state
            .key_subscriptions
            .entry(self.handle)
            .or_default()
            .insert(key);
    }

    fn key_pressed(&self, key: KeyCode) -> bool {
        self.state.is_key_pressed(key)
    }

    fn mouse_position(&self) -> Position {
        self.state.mouse
    }

    fn subscribe_event(&mut self, name: ModStr<'_>) -> EventHandle {
        match name.to_str() {
            Ok(name) => self.state.events.subscribe_by_name(name, self.handle),
            Err(e) => {
                self.state.reject_text(self.handle, "event name", name, e);
                UNREGISTERED_EVENT
            }
        }
    }

    fn send_event(&mut self, handle: EventHandle, data: EventData) {
        if let Err(e) = self.state.events.emit(Some(self.handle), handle, data) {
            warn!("{} sent an event the host does not know: {}", self.handle, e);
        }
    }
}
