//! # Ember Mod API
//!
//! The contract between the Ember engine and its mods.
//!
//! A mod is a unit of code exposing a fixed set of lifecycle callbacks
//! ([`GameMod`]). The host owns every piece of engine state (camera, log
//! channel, event system) and hands the mod a capability object
//! ([`HostApi`]) for the duration of each callback. There is no global
//! engine state on either side of the boundary.
//!
//! ## Lifecycle
//!
//! | Callback    | Invoked when                                  |
//! |-------------|-----------------------------------------------|
//! | `init`      | once, when the mod is loaded (or reloaded)    |
//! | `update`    | once per engine tick                          |
//! | `event`     | for each queued named event the mod follows   |
//! | `key_event` | on keyboard input                             |
//! | `scroll`    | on scroll input, with a signed delta          |
//! | `shutdown`  | when the mod is unloaded                      |
//!
//! Calls are strictly serialized by the host: at most one callback runs at
//! a time and no callback may block waiting on the host.
//!
//! ## Writing a mod
//!
//! ```rust
//! use ember_mod_api::{GameMod, HostApi, ModError, ModStr};
//!
//! #[derive(Default)]
//! struct ZoomMod;
//!
//! impl GameMod for ZoomMod {
//!     fn name(&self) -> &str { "zoom_mod" }
//!     fn version(&self) -> &str { "1.0.0" }
//!
//!     fn init(&mut self, host: &mut dyn HostApi) -> Result<(), ModError> {
//!         host.info(ModStr::new("zoom_mod"), ModStr::new("ready"));
//!         Ok(())
//!     }
//!
//!     fn scroll(&mut self, host: &mut dyn HostApi, amount: f32) -> Result<(), ModError> {
//!         host.set_zoom(host.get_zoom() + amount);
//!         Ok(())
//!     }
//! }
//! ```
//!
//! To ship the mod as a dynamic library, build it as a `cdylib` and invoke
//! [`create_mod!`] once at the crate root.

pub mod error;
pub mod handlers;
pub mod macros;
pub mod types;

pub use error::ModError;
pub use handlers::{ClosureMod, HandlerTable, Lifecycle, LifecycleCall};
pub use types::{EventData, EventHandle, KeyCode, LogLevel, ModStr, Position};

/// Version of this crate. Mod libraries export it so hosts can refuse
/// libraries built against a different contract.
pub const MOD_API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// [`MOD_API_VERSION`] with a trailing NUL, for the exported version symbol.
pub const MOD_API_VERSION_NUL: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

/// Symbol name of the exported mod constructor.
pub const CREATE_MOD_SYMBOL: &[u8] = b"create_mod";
/// Symbol name of the exported mod destructor.
pub const DESTROY_MOD_SYMBOL: &[u8] = b"destroy_mod";
/// Symbol name of the exported API version getter.
pub const API_VERSION_SYMBOL: &[u8] = b"get_mod_api_version";

/// Capabilities the host grants a mod during a callback.
///
/// All calls are infallible from the mod's point of view. Text arguments are
/// borrowed [`ModStr`] values; the host copies whatever it keeps.
pub trait HostApi {
    /// Records `message` under `module` at the given level.
    fn log(&mut self, level: LogLevel, module: ModStr<'_>, message: ModStr<'_>);

    fn info(&mut self, module: ModStr<'_>, message: ModStr<'_>) {
        self.log(LogLevel::Info, module, message)
    }

    fn warn(&mut self, module: ModStr<'_>, message: ModStr<'_>) {
        self.log(LogLevel::Warn, module, message)
    }

    fn error(&mut self, module: ModStr<'_>, message: ModStr<'_>) {
        self.log(LogLevel::Error, module, message)
    }

    fn debug(&mut self, module: ModStr<'_>, message: ModStr<'_>) {
        self.log(LogLevel::Debug, module, message)
    }

    fn trace(&mut self, module: ModStr<'_>, message: ModStr<'_>) {
        self.log(LogLevel::Trace, module, message)
    }

    /// Current camera zoom.
    fn get_zoom(&self) -> f32;

    /// Overwrites the camera zoom. Whether the value is bounded is host
    /// policy; the default host accepts any value.
    fn set_zoom(&mut self, zoom: f32);

    fn get_camera_position(&self) -> Position;

    fn set_camera_position(&mut self, position: Position);

    /// Shifts the camera by `offset`.
    fn move_camera(&mut self, offset: Position) {
        let position = self.get_camera_position() + offset;
        self.set_camera_position(position)
    }

    /// Seconds elapsed during the current tick.
    fn delta_time(&self) -> f32;

    /// Restricts this mod's `key_event` delivery to subscribed keys. A mod
    /// that never subscribes receives every key.
    fn subscribe_key(&mut self, key: KeyCode);

    /// Whether `key` is currently held down. Polling does not depend on key
    /// subscriptions.
    fn key_pressed(&self, key: KeyCode) -> bool;

    /// Last known mouse position.
    fn mouse_position(&self) -> Position;

    /// Registers interest in a named event. The same name always yields the
    /// same handle.
    fn subscribe_event(&mut self, name: ModStr<'_>) -> EventHandle;

    /// Queues `data` for every other mod subscribed to `handle`.
    fn send_event(&mut self, handle: EventHandle, data: EventData);
}

/// Lifecycle callbacks a mod exposes to the host.
///
/// Every callback has a silent no-op default, so a mod only implements what
/// it reacts to. Errors are reported to the host, which logs them and keeps
/// dispatching to other mods.
pub trait GameMod: Send {
    /// Unique mod name. The host refuses a second mod with the same name.
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn init(&mut self, _host: &mut dyn HostApi) -> Result<(), ModError> {
        Ok(())
    }

    fn update(&mut self, _host: &mut dyn HostApi) -> Result<(), ModError> {
        Ok(())
    }

    fn event(
        &mut self,
        _host: &mut dyn HostApi,
        _handle: EventHandle,
        _data: &EventData,
    ) -> Result<(), ModError> {
        Ok(())
    }

    fn key_event(&mut self, _host: &mut dyn HostApi, _key: KeyCode) -> Result<(), ModError> {
        Ok(())
    }

    fn scroll(&mut self, _host: &mut dyn HostApi, _amount: f32) -> Result<(), ModError> {
        Ok(())
    }

    fn shutdown(&mut self, _host: &mut dyn HostApi) -> Result<(), ModError> {
        Ok(())
    }
}

/// Routes a [`LifecycleCall`] to the matching [`GameMod`] callback.
pub fn dispatch(
    game_mod: &mut dyn GameMod,
    host: &mut dyn HostApi,
    call: LifecycleCall<'_>,
) -> Result<(), ModError> {
    match call {
        LifecycleCall::Init => game_mod.init(host),
        LifecycleCall::Update => game_mod.update(host),
        LifecycleCall::Event(handle, data) => game_mod.event(host, handle, data),
        LifecycleCall::KeyEvent(key) => game_mod.key_event(host, key),
        LifecycleCall::Scroll(amount) => game_mod.scroll(host, amount),
        LifecycleCall::Shutdown => game_mod.shutdown(host),
    }
}
