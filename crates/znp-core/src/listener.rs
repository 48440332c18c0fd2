//! The listener registry: the correlation core's only piece of mutable
//! state, owned exclusively by the core task (see `correlation.rs`).
//!
//! A listener is registered with a matching set — one or more
//! [`DecodedCommand`] partial constraints, reduced to the maximal elements of
//! the matches-subsumption order (see `znp_proto::matching_set`) — and a
//! [`Resolution`]: a one-shot waiter fired exactly once, or a persistent
//! callback fired on every match.

use std::{
    collections::HashMap,
    sync::Arc,
};

use tokio::sync::oneshot;
use znp_proto::{DecodedCommand, matching_set};

/// Opaque handle to a registered listener, returned by
/// [`ListenerRegistry::register`] and accepted by
/// [`ListenerRegistry::cancel`].
pub type ListenerId = u64;

/// What happens when a listener's matching set accepts an incoming command.
pub enum Resolution {
    /// Fire once, then deregister.
    OneShot(oneshot::Sender<DecodedCommand>),
    /// Fire on every match, until explicitly cancelled.
    Callback(Arc<dyn Fn(DecodedCommand) + Send + Sync>),
}

struct Listener {
    matching: Vec<DecodedCommand>,
    resolution: Resolution,
}

/// Dispatches decoded commands to the listeners whose matching set accepts
/// them. Not thread-safe by design: it is only ever touched from the single
/// core task that owns it.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: ListenerId,
    by_header: HashMap<znp_proto::CommandHeader, Vec<ListenerId>>,
    listeners: HashMap<ListenerId, Listener>,
}

impl ListenerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. `matching` is reduced to its maximal elements
    /// before indexing, so a redundant constraint (e.g. a broad `Rsp`
    /// alongside a narrower one) never causes duplicate dispatch.
    pub fn register(&mut self, matching: Vec<DecodedCommand>, resolution: Resolution) -> ListenerId {
        let matching = matching_set::reduce_to_maximal(matching);
        let id = self.next_id;
        self.next_id += 1;

        let mut indexed_headers = Vec::new();
        for header in matching.iter().map(DecodedCommand::header) {
            if !indexed_headers.contains(&header) {
                indexed_headers.push(header);
                self.by_header.entry(header).or_default().push(id);
            }
        }

        self.listeners.insert(id, Listener { matching, resolution });
        id
    }

    /// Deregister a listener. A no-op if `id` already fired (one-shot) or
    /// was already cancelled.
    pub fn cancel(&mut self, id: ListenerId) {
        if let Some(listener) = self.listeners.remove(&id) {
            self.unindex(id, &listener.matching);
        }
    }

    /// Deregister every listener. Dropping a one-shot listener's sender
    /// without sending causes its waiter to observe cancellation; dropping a
    /// callback listener simply discards it.
    #[allow(dead_code)]
    pub fn cancel_all(&mut self) {
        self.by_header.clear();
        self.listeners.clear();
    }

    /// Route `command` to every listener whose matching set accepts it.
    /// Logs at `warn` if nothing in the catalog was listening for this
    /// header — an unsolicited AREQ the driver never asked for.
    pub fn dispatch(&mut self, command: DecodedCommand) {
        let header = command.header();
        let candidates = self.by_header.get(&header).cloned().unwrap_or_default();
        let mut matched_any = false;

        for id in candidates {
            let accepts = self
                .listeners
                .get(&id)
                .is_some_and(|listener| listener.matching.iter().any(|constraint| constraint.matches(&command)));
            if !accepts {
                continue;
            }
            matched_any = true;

            let is_one_shot = matches!(self.listeners.get(&id), Some(Listener { resolution: Resolution::OneShot(_), .. }));
            if is_one_shot {
                if let Some(listener) = self.listeners.remove(&id) {
                    self.unindex(id, &listener.matching);
                    if let Resolution::OneShot(sender) = listener.resolution {
                        let _ = sender.send(command.clone());
                    }
                }
            } else if let Some(Listener { resolution: Resolution::Callback(callback), .. }) = self.listeners.get(&id) {
                callback(command.clone());
            }
        }

        if !matched_any {
            tracing::warn!(%header, "no listener registered for incoming command");
        }
    }

    fn unindex(&mut self, id: ListenerId, matching: &[DecodedCommand]) {
        for header in matching.iter().map(DecodedCommand::header) {
            if let Some(ids) = self.by_header.get_mut(&header) {
                ids.retain(|existing| *existing != id);
            }
        }
    }
}
