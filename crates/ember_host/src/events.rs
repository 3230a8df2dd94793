//! Named events exchanged between mods.
//!
//! Mods subscribe to events by name and receive a stable [`EventHandle`].
//! Emitting queues the payload for every subscriber except the sender; the
//! manager drains each mod's queue at the start of the next update pass.

use crate::error::HostError;
use crate::ModHandle;
use ember_mod_api::{EventData, EventHandle};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Returned for names the host cannot register. Never maps to an event, so
/// sending on it is dropped.
pub const UNREGISTERED_EVENT: EventHandle = EventHandle::from_raw(u64::MAX);

/// An event waiting to be delivered to one mod.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedEvent {
    pub handle: EventHandle,
    pub data: EventData,
    /// `None` when the host emitted the event.
    pub sender: Option<ModHandle>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EventStats {
    pub registered_events: usize,
    pub events_emitted: u64,
    pub deliveries_queued: u64,
    pub pending: usize,
}

#[derive(Debug, Default)]
pub struct EventManager {
    names: Vec<String>,
    subscriptions: HashMap<ModHandle, HashSet<EventHandle>>,
    queues: HashMap<ModHandle, VecDeque<QueuedEvent>>,
    events_emitted: u64,
    deliveries_queued: u64,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `name`, registering it first if needed.
    pub fn register(&mut self, name: &str) -> EventHandle {
        if let Some(handle) = self.handle_for(name) {
            return handle;
        }
        self.names.push(name.to_string());
        let handle = EventHandle::from_raw((self.names.len() - 1) as u64);
        debug!("Event registered: {} as {}", name, handle);
        handle
    }

    pub fn handle_for(&self, name: &str) -> Option<EventHandle> {
        self.names
            .iter()
            .position(|known| known == name)
            .map(|index| EventHandle::from_raw(index as u64))
    }

    pub fn name_of(&self, handle: EventHandle) -> Option<&str> {
        self.names.get(handle.raw() as usize).map(String::as_str)
    }

    pub fn subscribe_by_name(&mut self, name: &str, subscriber: ModHandle) -> EventHandle {
        let handle = self.register(name);
        self.subscriptions
            .entry(subscriber)
            .or_default()
            .insert(handle);
        handle
    }

    pub fn subscribe_by_handle(
        &mut self,
        handle: EventHandle,
        subscriber: ModHandle,
    ) -> Result<(), HostError> {
        if self.name_of(handle).is_none() {
            return Err(HostError::UnknownEvent(handle));
        }
        self.subscriptions
            .entry(subscriber)
            .or_default()
            .insert(handle);
        Ok(())
    }

    pub fn is_subscribed(&self, subscriber: ModHandle, handle: EventHandle) -> bool {
        self.subscriptions
            .get(&subscriber)
            .is_some_and(|handles| handles.contains(&handle))
    }

    /// Queues `data` for every subscriber of `handle` other than `sender`.
    /// Returns the number of queued deliveries.
    pub fn emit(
        &mut self,
        sender: Option<ModHandle>,
        handle: EventHandle,
        data: EventData,
    ) -> Result<usize, HostError> {
        if self.name_of(handle).is_none() {
            return Err(HostError::UnknownEvent(handle));
        }
        self.events_emitted += 1;

        let mut queued = 0;
        for (subscriber, handles) in &self.subscriptions {
            if Some(*subscriber) == sender || !handles.contains(&handle) {
                continue;
            }
            self.queues
                .entry(*subscriber)
                .or_default()
                .push_back(QueuedEvent {
                    handle,
                    data: data.clone(),
                    sender,
                });
            queued += 1;
        }
        self.deliveries_queued += queued as u64;
        Ok(queued)
    }

    /// Host-originated event by name. Unknown names are registered, so a
    /// host may emit before any mod has subscribed.
    pub fn emit_from_host(&mut self, name: &str, data: EventData) -> usize {
        let handle = self.register(name);
        // The handle was just registered, so emit cannot fail.
        self.emit(None, handle, data).unwrap_or(0)
    }

    /// Takes the pending events for `subscriber` in emission order.
    pub fn drain(&mut self, subscriber: ModHandle) -> Vec<QueuedEvent> {
        self.queues
            .get_mut(&subscriber)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn pending(&self, subscriber: ModHandle) -> usize {
        self.queues.get(&subscriber).map_or(0, VecDeque::len)
    }

    /// Drops subscriptions and pending events of an unloaded mod.
    pub fn forget(&mut self, subscriber: ModHandle) {
        self.subscriptions.remove(&subscriber);
        self.queues.remove(&subscriber);
    }

    pub fn stats(&self) -> EventStats {
        EventStats {
            registered_events: self.names.len(),
            events_emitted: self.events_emitted,
            deliveries_queued: self.deliveries_queued,
            pending: self.queues.values().map(VecDeque::len).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handles() -> (ModHandle, ModHandle, ModHandle) {
        (
            ModHandle::from_raw(1),
            ModHandle::from_raw(2),
            ModHandle::from_raw(3),
        )
    }

    #[test]
    fn same_name_same_handle() {
        let mut events = EventManager::new();
        let (a, b, _) = handles();
        let first = events.subscribe_by_name("spawn", a);
        let second = events.subscribe_by_name("spawn", b);
        let other = events.register("despawn");

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(events.name_of(other), Some("despawn"));
    }

    #[test]
    fn emit_skips_sender_and_non_subscribers() {
        let mut events = EventManager::new();
        let (a, b, c) = handles();
        let spawn = events.subscribe_by_name("spawn", a);
        events.subscribe_by_name("spawn", b);
        events.subscribe_by_name("other", c);

        let queued = events.emit(Some(a), spawn, EventData::I32(1)).unwrap();
        assert_eq!(queued, 1);
        assert_eq!(events.pending(a), 0);
        assert_eq!(events.pending(b), 1);
        assert_eq!(events.pending(c), 0);
    }

    #[test]
    fn drain_preserves_emission_order() {
        let mut events = EventManager::new();
        let (a, b, _) = handles();
        let tick = events.subscribe_by_name("tick", b);

        for n in 0..3 {
            events.emit(Some(a), tick, EventData::I64(n)).unwrap();
        }

        let drained: Vec<_> = events.drain(b).into_iter().map(|e| e.data).collect();
        assert_eq!(
            drained,
            vec![EventData::I64(0), EventData::I64(1), EventData::I64(2)]
        );
        assert!(events.drain(b).is_empty());
    }

    #[test]
    fn unknown_handles_are_rejected() {
        let mut events = EventManager::new();
        let (a, _, _) = handles();
        let bogus = EventHandle::from_raw(99);

        assert!(matches!(
            events.emit(None, bogus, EventData::None),
            Err(HostError::UnknownEvent(h)) if h == bogus
        ));
        assert!(events.subscribe_by_handle(bogus, a).is_err());
    }

    #[test]
    fn host_events_reach_every_subscriber() {
        let mut events = EventManager::new();
        let (a, b, _) = handles();
        events.subscribe_by_name("pause", a);
        let pause = events.handle_for("pause").unwrap();
        events.subscribe_by_handle(pause, b).unwrap();

        assert_eq!(events.emit_from_host("pause", EventData::None), 2);
        assert_eq!(events.drain(a)[0].sender, None);
        assert_eq!(events.emit_from_host("nobody_listens", EventData::None), 0);
    }

    #[test]
    fn forget_drops_queue_and_subscriptions() {
        let mut events = EventManager::new();
        let (a, b, _) = handles();
        let spawn = events.subscribe_by_name("spawn", b);
        events.emit(Some(a), spawn, EventData::None).unwrap();

        events.forget(b);
        assert_eq!(events.pending(b), 0);
        assert!(!events.is_subscribed(b, spawn));
        assert_eq!(events.emit(Some(a), spawn, EventData::None).unwrap(), 0);

        let stats = events.stats();
        assert_eq!(stats.events_emitted, 2);
        assert_eq!(stats.deliveries_queued, 1);
        assert_eq!(stats.pending, 0);
    }
}
