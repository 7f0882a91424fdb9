// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Diagnostic events
//!
//! The runtime reports what happens to actors (creation, failures, restarts, termination, dead
//! letters and unhandled messages) on a broadcast channel. Anyone holding a [`SystemRef`] can
//! subscribe, either directly or by running a [`Sink`].
//!
//! [`SystemRef`]: crate::SystemRef
//! [`Sink`]: crate::Sink

use crate::ActorPath;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::broadcast;
use tracing::debug;

use std::fmt::Debug;

/// Trait for events that can be delivered to a [`Sink`](crate::Sink).
pub trait Event:
    Serialize + DeserializeOwned + Debug + Clone + Send + Sync + 'static
{
}

/// Kind of a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorEventKind {
    /// The actor was built and its dispatch loop started.
    Created,
    /// A handler failed; the detail carries the reason.
    Failed,
    /// A fresh instance replaced a failed one.
    Restarted,
    /// The actor stopped for good.
    Terminated,
    /// A message could not be delivered because its target no longer exists.
    DeadLetter,
    /// The current behavior ignored a message.
    Unhandled,
}

/// Structured diagnostic event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorEvent {
    /// Name of the actor system that emitted the event.
    pub system: String,
    /// Identity of the actor concerned.
    pub path: ActorPath,
    pub kind: ActorEventKind,
    /// Free-form detail.
    pub detail: String,
}

impl Event for ActorEvent {}

/// Publishing side of the event channel, shared by the system and every actor reference.
#[derive(Clone)]
pub(crate) struct EventBus {
    system: String,
    sender: broadcast::Sender<ActorEvent>,
    log_dead_letters: bool,
}

impl EventBus {
    pub(crate) fn new(system: &str, capacity: usize, log_dead_letters: bool) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            system: system.to_owned(),
            sender,
            log_dead_letters,
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ActorEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn publish(
        &self,
        path: &ActorPath,
        kind: ActorEventKind,
        detail: impl Into<String>,
    ) {
        // Fails only when nobody is subscribed.
        let _ = self.sender.send(ActorEvent {
            system: self.system.clone(),
            path: path.clone(),
            kind,
            detail: detail.into(),
        });
    }

    pub(crate) fn dead_letter(&self, path: &ActorPath, detail: String) {
        if self.log_dead_letters {
            debug!("Dead letter to {}: {}", path, detail);
        }
        self.publish(path, ActorEventKind::DeadLetter, detail);
    }
}
