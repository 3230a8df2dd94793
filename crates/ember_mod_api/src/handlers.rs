//! Registered handler tables.
//!
//! Instead of implementing [`GameMod`] on a type, a mod (or a host embedding
//! scripted behavior) can register closures against lifecycle tags and wrap
//! the table in a [`ClosureMod`]. Tags without a handler are no-ops.
//!
//! ```rust
//! use ember_mod_api::{ClosureMod, HandlerTable, Lifecycle, ModStr};
//!
//! let handlers = HandlerTable::new()
//!     .on_init(|host| {
//!         host.info(ModStr::new("scripted"), ModStr::new("hello"));
//!         Ok(())
//!     })
//!     .on_scroll(|host, amount| {
//!         host.set_zoom(host.get_zoom() + amount);
//!         Ok(())
//!     });
//!
//! assert!(handlers.contains(Lifecycle::Scroll));
//! let scripted = ClosureMod::new("scripted", "0.1.0", handlers);
//! ```

use crate::error::ModError;
use crate::types::{EventData, EventHandle, KeyCode};
use crate::{GameMod, HostApi};
use std::collections::HashMap;
use std::fmt;

/// Lifecycle tag used as the handler table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lifecycle {
    Init,
    Update,
    Event,
    KeyEvent,
    Scroll,
    Shutdown,
}

impl Lifecycle {
    pub const ALL: [Lifecycle; 6] = [
        Lifecycle::Init,
        Lifecycle::Update,
        Lifecycle::Event,
        Lifecycle::KeyEvent,
        Lifecycle::Scroll,
        Lifecycle::Shutdown,
    ];
}

/// A single lifecycle invocation together with its arguments.
#[derive(Debug, Clone, Copy)]
pub enum LifecycleCall<'a> {
    Init,
    Update,
    Event(EventHandle, &'a EventData),
    KeyEvent(KeyCode),
    Scroll(f32),
    Shutdown,
}

impl LifecycleCall<'_> {
    pub fn lifecycle(&self) -> Lifecycle {
        match self {
            LifecycleCall::Init => Lifecycle::Init,
            LifecycleCall::Update => Lifecycle::Update,
            LifecycleCall::Event(..) => Lifecycle::Event,
            LifecycleCall::KeyEvent(_) => Lifecycle::KeyEvent,
            LifecycleCall::Scroll(_) => Lifecycle::Scroll,
            LifecycleCall::Shutdown => Lifecycle::Shutdown,
        }
    }
}

type HostHandler = Box<dyn FnMut(&mut dyn HostApi) -> Result<(), ModError> + Send>;
type EventHandler =
    Box<dyn FnMut(&mut dyn HostApi, EventHandle, &EventData) -> Result<(), ModError> + Send>;
type KeyHandler = Box<dyn FnMut(&mut dyn HostApi, KeyCode) -> Result<(), ModError> + Send>;
type ScrollHandler = Box<dyn FnMut(&mut dyn HostApi, f32) -> Result<(), ModError> + Send>;

enum Handler {
    Host(HostHandler),
    Event(EventHandler),
    Key(KeyHandler),
    Scroll(ScrollHandler),
}

/// Map from lifecycle tag to registered closure.
#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<Lifecycle, Handler>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_init<F>(self, handler: F) -> Self
    where
        F: FnMut(&mut dyn HostApi) -> Result<(), ModError> + Send + 'static,
    {
        self.with(Lifecycle::Init, Handler::Host(Box::new(handler)))
    }

    pub fn on_update<F>(self, handler: F) -> Self
    where
        F: FnMut(&mut dyn HostApi) -> Result<(), ModError> + Send + 'static,
    {
        self.with(Lifecycle::Update, Handler::Host(Box::new(handler)))
    }

    pub fn on_shutdown<F>(self, handler: F) -> Self
    where
        F: FnMut(&mut dyn HostApi) -> Result<(), ModError> + Send + 'static,
    {
        self.with(Lifecycle::Shutdown, Handler::Host(Box::new(handler)))
    }

    pub fn on_event<F>(self, handler: F) -> Self
    where
        F: FnMut(&mut dyn HostApi, EventHandle, &EventData) -> Result<(), ModError>
            + Send
            + 'static,
    {
        self.with(Lifecycle::Event, Handler::Event(Box::new(handler)))
    }

    pub fn on_key_event<F>(self, handler: F) -> Self
    where
        F: FnMut(&mut dyn HostApi, KeyCode) -> Result<(), ModError> + Send + 'static,
    {
        self.with(Lifecycle::KeyEvent, Handler::Key(Box::new(handler)))
    }

    pub fn on_scroll<F>(self, handler: F) -> Self
    where
        F: FnMut(&mut dyn HostApi, f32) -> Result<(), ModError> + Send + 'static,
    {
        self.with(Lifecycle::Scroll, Handler::Scroll(Box::new(handler)))
    }

    /// Removes the handler for `lifecycle`, turning it back into a no-op.
    pub fn remove(&mut self, lifecycle: Lifecycle) -> bool {
        self.handlers.remove(&lifecycle).is_some()
    }

    pub fn contains(&self, lifecycle: Lifecycle) -> bool {
        self.handlers.contains_key(&lifecycle)
    }

    /// Registered tags in lifecycle order.
    pub fn registered(&self) -> Vec<Lifecycle> {
        Lifecycle::ALL
            .into_iter()
            .filter(|lifecycle| self.contains(*lifecycle))
            .collect()
    }

    /// Runs the handler registered for the call's tag, if any.
    pub fn dispatch(
        &mut self,
        host: &mut dyn HostApi,
        call: LifecycleCall<'_>,
    ) -> Result<(), ModError> {
        let Some(handler) = self.handlers.get_mut(&call.lifecycle()) else {
            return Ok(());
        };

        match (handler, call) {
            (
                Handler::Host(handler),
                LifecycleCall::Init | LifecycleCall::Update | LifecycleCall::Shutdown,
            ) => handler(host),
            (Handler::Event(handler), LifecycleCall::Event(handle, data)) => {
                handler(host, handle, data)
            }
            (Handler::Key(handler), LifecycleCall::KeyEvent(key)) => handler(host, key),
            (Handler::Scroll(handler), LifecycleCall::Scroll(amount)) => handler(host, amount),
            (_, call) => Err(ModError::failed(format!(
                "handler registered for {:?} does not accept this call",
                call.lifecycle()
            ))),
        }
    }

    fn with(mut self, lifecycle: Lifecycle, handler: Handler) -> Self {
        self.handlers.insert(lifecycle, handler);
        self
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("registered", &self.registered())
            .finish()
    }
}

/// A [`GameMod`] whose behavior is a [`HandlerTable`].
#[derive(Debug)]
pub struct ClosureMod {
    name: String,
    version: String,
    handlers: HandlerTable,
}

impl ClosureMod {
    pub fn new(name: impl Into<String>, version: impl Into<String>, handlers: HandlerTable) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            handlers,
        }
    }

    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }
}

impl GameMod for ClosureMod {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn init(&mut self, host: &mut dyn HostApi) -> Result<(), ModError> {
        self.handlers.dispatch(host, LifecycleCall::Init)
    }

    fn update(&mut self, host: &mut dyn HostApi) -> Result<(), ModError> {
        self.handlers.dispatch(host, LifecycleCall::Update)
    }

    fn event(
        &mut self,
        host: &mut dyn HostApi,
        handle: EventHandle,
        data: &EventData,
    ) -> Result<(), ModError> {
        self.handlers.dispatch(host, LifecycleCall::Event(handle, data))
    }

    fn key_event(&mut self, host: &mut dyn HostApi, key: KeyCode) -> Result<(), ModError> {
        self.handlers.dispatch(host, LifecycleCall::KeyEvent(key))
    }

    fn scroll(&mut self, host: &mut dyn HostApi, amount: f32) -> Result<(), ModError> {
        self.handlers.dispatch(host, LifecycleCall::Scroll(amount))
    }

    fn shutdown(&mut self, host: &mut dyn HostApi) -> Result<(), ModError> {
        self.handlers.dispatch(host, LifecycleCall::Shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_host::RecordingHost;
    use crate::ModStr;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn empty_table_is_all_no_ops() {
        let mut table = HandlerTable::new();
        let mut host = RecordingHost::default();
        assert!(table.registered().is_empty());
        assert!(table.dispatch(&mut host, LifecycleCall::Scroll(1.0)).is_ok());
        assert_eq!(host.zoom, 0.0);
    }

    #[test]
    fn scroll_handler_adjusts_zoom() {
        let mut scripted = ClosureMod::new(
            "scripted",
            "0.1.0",
            HandlerTable::new().on_scroll(|host, amount| {
                host.set_zoom(host.get_zoom() + amount);
                Ok(())
            }),
        );
        let mut host = RecordingHost {
            zoom: 1.0,
            ..Default::default()
        };

        scripted.scroll(&mut host, 2.5).unwrap();
        scripted.scroll(&mut host, -0.5).unwrap();
        assert_eq!(host.zoom, 3.0);
        assert_eq!(scripted.handlers().registered(), vec![Lifecycle::Scroll]);
    }

    #[test]
    fn handlers_see_their_arguments() {
        let seen = Arc::new(AtomicU32::new(0));
        let seen_key = seen.clone();
        let mut table = HandlerTable::new()
            .on_key_event(move |_, key| {
                seen_key.store(key.raw(), Ordering::SeqCst);
                Ok(())
            })
            .on_event(|host, handle, data| {
                if let EventData::String(text) = data {
                    host.info(ModStr::new("events"), ModStr::new(text));
                }
                assert_eq!(handle.raw(), 9);
                Ok(())
            });
        let mut host = RecordingHost::default();

        table
            .dispatch(&mut host, LifecycleCall::KeyEvent(KeyCode(42)))
            .unwrap();
        let data = EventData::from("boom");
        table
            .dispatch(
                &mut host,
                LifecycleCall::Event(EventHandle::from_raw(9), &data),
            )
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 42);
        assert_eq!(host.log[0].2, "boom");
    }

    #[test]
    fn removed_handler_becomes_no_op() {
        let mut table = HandlerTable::new().on_update(|_| Err(ModError::failed("nope")));
        let mut host = RecordingHost::default();
        assert!(table.dispatch(&mut host, LifecycleCall::Update).is_err());

        assert!(table.remove(Lifecycle::Update));
        assert!(!table.remove(Lifecycle::Update));
        assert!(table.dispatch(&mut host, LifecycleCall::Update).is_ok());
    }

    #[test]
    fn init_and_shutdown_are_separate_slots() {
        let mut scripted = ClosureMod::new(
            "slots",
            "0.1.0",
            HandlerTable::new()
                .on_init(|host| {
                    host.info(ModStr::new("slots"), ModStr::new("up"));
                    Ok(())
                })
                .on_shutdown(|host| {
                    host.info(ModStr::new("slots"), ModStr::new("down"));
                    Ok(())
                }),
        );
        let mut host = RecordingHost::default();

        scripted.init(&mut host).unwrap();
        scripted.update(&mut host).unwrap();
        scripted.shutdown(&mut host).unwrap();

        let messages: Vec<_> = host.log.iter().map(|(_, _, m)| m.as_str()).collect();
        assert_eq!(messages, vec!["up", "down"]);
    }
}
