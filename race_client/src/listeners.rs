//! Push listener registry.
//!
//! One slot per event name. Subscribing returns a [`ListenerHandle`]; the
//! slot is released when the handle drops, so a scene cannot leak a listener
//! past its own lifetime. Subscribing to an occupied event replaces the
//! previous listener rather than stacking a second one.
//!
//! A [`ListenerScope`] bundles the handles of one scene with a single inbound
//! queue, preserving delivery order across event names.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use race_shared::net::{ServerEventKind, ServerPush};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

struct Slot {
    id: u64,
    owner: &'static str,
    tx: mpsc::UnboundedSender<ServerPush>,
}

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    slots: Mutex<HashMap<ServerEventKind, Slot>>,
}

/// Shared registry. Cloning is cheap; all clones see the same slots.
#[derive(Clone, Default)]
pub struct Listeners {
    inner: Arc<Inner>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<ServerEventKind, Slot>> {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Routes pushes of `kind` to `tx` until the returned handle drops.
    pub fn subscribe(
        &self,
        kind: ServerEventKind,
        owner: &'static str,
        tx: mpsc::UnboundedSender<ServerPush>,
    ) -> ListenerHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let previous = self.slots().insert(kind, Slot { id, owner, tx });
        if let Some(prev) = previous {
            warn!(
                event = %kind,
                previous = prev.owner,
                owner,
                "Listener replaced; previous subscription was never released"
            );
        }
        trace!(event = %kind, owner, id, "Listener subscribed");
        ListenerHandle {
            listeners: self.clone(),
            kind,
            id,
        }
    }

    /// Removes whatever listener holds `kind`.
    pub fn unsubscribe(&self, kind: ServerEventKind) -> bool {
        self.slots().remove(&kind).is_some()
    }

    fn release(&self, kind: ServerEventKind, id: u64) {
        let mut slots = self.slots();
        if slots.get(&kind).is_some_and(|s| s.id == id) {
            slots.remove(&kind);
            trace!(event = %kind, id, "Listener released");
        }
    }

    /// Delivers a push to its listener. Returns false when nobody listens.
    pub fn dispatch(&self, push: ServerPush) -> bool {
        let kind = push.kind();
        let mut slots = self.slots();
        let Some(slot) = slots.get(&kind) else {
            debug!(event = %kind, "No listener for push");
            return false;
        };
        if slot.tx.send(push).is_err() {
            slots.remove(&kind);
            debug!(event = %kind, "Listener queue closed; slot dropped");
            return false;
        }
        true
    }

    pub fn is_subscribed(&self, kind: ServerEventKind) -> bool {
        self.slots().contains_key(&kind)
    }

    /// Subscribed event names in a stable order.
    pub fn active(&self) -> Vec<ServerEventKind> {
        let mut kinds: Vec<_> = self.slots().keys().copied().collect();
        kinds.sort();
        kinds
    }
}

/// Keeps one event subscribed while alive.
pub struct ListenerHandle {
    listeners: Listeners,
    kind: ServerEventKind,
    id: u64,
}

impl ListenerHandle {
    pub fn kind(&self) -> ServerEventKind {
        self.kind
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.listeners.release(self.kind, self.id);
    }
}

/// The listeners of one scene and their shared inbound queue.
pub struct ListenerScope {
    label: &'static str,
    tx: mpsc::UnboundedSender<ServerPush>,
    rx: mpsc::UnboundedReceiver<ServerPush>,
    handles: Vec<ListenerHandle>,
}

impl ListenerScope {
    pub fn new(listeners: &Listeners, label: &'static str, kinds: &[ServerEventKind]) -> Self {
        let mut scope = Self::empty(label);
        scope.handles = kinds
            .iter()
            .map(|&kind| listeners.subscribe(kind, label, scope.tx.clone()))
            .collect();
        debug!(scope = label, events = ?kinds, "Listener scope acquired");
        scope
    }

    /// A scope with no subscriptions; `recv` never yields.
    pub fn empty(label: &'static str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            label,
            tx,
            rx,
            handles: Vec::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn events(&self) -> Vec<ServerEventKind> {
        self.handles.iter().map(ListenerHandle::kind).collect()
    }

    pub fn try_recv(&mut self) -> Option<ServerPush> {
        self.rx.try_recv().ok()
    }

    /// Waits for the next push. Pends forever on a released or empty scope.
    pub async fn recv(&mut self) -> Option<ServerPush> {
        self.rx.recv().await
    }

    /// Unsubscribes everything and discards pushes that were still queued.
    pub fn release(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        self.handles.clear();
        let mut dropped = 0usize;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        debug!(scope = self.label, dropped, "Listener scope released");
    }
}

impl Drop for ListenerScope {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use race_shared::net::ServerError;
    use serde_json::Value;

    fn error_push(msg: &str) -> ServerPush {
        ServerPush::Error(ServerError {
            message: msg.to_string(),
        })
    }

    #[test]
    fn dropping_scope_unsubscribes_everything() {
        let listeners = Listeners::new();
        let scope = ListenerScope::new(
            &listeners,
            "lobby",
            &[ServerEventKind::LobbyUpdate, ServerEventKind::GameStart],
        );
        assert_eq!(
            listeners.active(),
            vec![ServerEventKind::LobbyUpdate, ServerEventKind::GameStart]
        );
        drop(scope);
        assert!(listeners.active().is_empty());
        assert!(!listeners.dispatch(ServerPush::GameStart(Value::Null)));
    }

    #[test]
    fn resubscribe_replaces_instead_of_duplicating() {
        let listeners = Listeners::new();
        let mut first = ListenerScope::new(&listeners, "first", &[ServerEventKind::Error]);
        let mut second = ListenerScope::new(&listeners, "second", &[ServerEventKind::Error]);

        assert!(listeners.dispatch(error_push("boom")));
        assert!(first.try_recv().is_none());
        assert!(matches!(second.try_recv(), Some(ServerPush::Error(_))));

        // Dropping the stale scope must not remove the newer listener.
        drop(first);
        assert!(listeners.is_subscribed(ServerEventKind::Error));
        drop(second);
        assert!(!listeners.is_subscribed(ServerEventKind::Error));
    }

    #[test]
    fn scope_preserves_delivery_order_across_events() {
        let listeners = Listeners::new();
        let mut scope = ListenerScope::new(
            &listeners,
            "race",
            &[ServerEventKind::GameState, ServerEventKind::Error],
        );
        listeners.dispatch(error_push("a"));
        listeners.dispatch(ServerPush::GameState(Box::default()));
        listeners.dispatch(error_push("b"));

        let kinds: Vec<_> = std::iter::from_fn(|| scope.try_recv())
            .map(|p| p.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                ServerEventKind::Error,
                ServerEventKind::GameState,
                ServerEventKind::Error
            ]
        );
    }

    #[test]
    fn release_discards_queued_pushes() {
        let listeners = Listeners::new();
        let mut scope = ListenerScope::new(&listeners, "lobby", &[ServerEventKind::GameStart]);
        listeners.dispatch(ServerPush::GameStart(Value::Null));
        scope.release();
        assert!(scope.try_recv().is_none());
        assert!(scope.events().is_empty());
    }

    #[test]
    fn explicit_unsubscribe() {
        let listeners = Listeners::new();
        let _scope = ListenerScope::new(&listeners, "race", &[ServerEventKind::GameEnd]);
        assert!(listeners.unsubscribe(ServerEventKind::GameEnd));
        assert!(!listeners.unsubscribe(ServerEventKind::GameEnd));
    }
}
