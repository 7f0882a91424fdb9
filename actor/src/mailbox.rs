// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Mailboxes and control channels.
//!
//! Every actor owns two queues. The mailbox carries the actor's own protocol and is drained one
//! message at a time by the dispatch loop. The control channel carries runtime traffic (stop
//! requests, watch registrations, child notifications) and is polled first, so lifecycle
//! decisions never wait behind application messages.

use crate::{ActorPath, Error};

use tokio::sync::{mpsc, oneshot};

use std::collections::HashMap;

/// Mailbox receiver side. Only the owning dispatch loop holds it.
pub(crate) type MailboxReceiver<M> = mpsc::UnboundedReceiver<M>;

/// Mailbox sender side, cloned into every reference to the actor.
pub(crate) type MailboxSender<M> = mpsc::UnboundedSender<M>;

/// Creates a new unbounded mailbox. Enqueueing never blocks the sender.
pub(crate) fn mailbox<M>() -> (MailboxSender<M>, MailboxReceiver<M>) {
    mpsc::unbounded_channel()
}

/// Delivers a termination message to a watcher. Called at most once.
pub(crate) type Notifier = Box<dyn FnOnce() + Send + 'static>;

/// A watch registration held by the watched actor.
pub(crate) struct Watcher {
    /// Control channel of the watcher, closed once the watcher has terminated.
    control: SystemSender,
    notifier: Notifier,
}

impl Watcher {
    pub(crate) fn new(control: SystemSender, notifier: Notifier) -> Self {
        Self { control, notifier }
    }

    pub(crate) fn is_alive(&self) -> bool {
        !self.control.is_closed()
    }

    pub(crate) fn notify(self) {
        (self.notifier)();
    }
}

/// Watch registrations by watcher path.
pub(crate) type Watchers = HashMap<ActorPath, Watcher>;

/// Adds a registration and forgets the watchers that terminated in the meantime.
pub(crate) fn add_watcher(
    watchers: &mut Watchers,
    path: ActorPath,
    watcher: Watcher,
) {
    watchers.retain(|_, watcher| watcher.is_alive());
    watchers.insert(path, watcher);
}

/// Runtime traffic addressed to an actor.
pub(crate) enum SystemMessage {
    /// Stop the actor. The sender, if any, is answered once the actor has fully terminated.
    Stop(Option<oneshot::Sender<()>>),
    /// Register `watcher` for the termination of this actor.
    Watch { path: ActorPath, watcher: Watcher },
    /// Drop the registration made by `watcher`.
    Unwatch(ActorPath),
    /// A child has fully stopped and released its name.
    ChildTerminated { name: String, uid: u64 },
    /// A child gave up and escalated its failure. `uid` is the child's incarnation.
    ChildFailed {
        child: ActorPath,
        uid: u64,
        error: Error,
    },
}

/// Control channel receiver side.
pub(crate) type SystemReceiver = mpsc::UnboundedReceiver<SystemMessage>;

/// Control channel sender side.
pub(crate) type SystemSender = mpsc::UnboundedSender<SystemMessage>;

/// Creates a new control channel.
pub(crate) fn control_channel() -> (SystemSender, SystemReceiver) {
    mpsc::unbounded_channel()
}

/// Sends a watch registration. When the target is already gone the notice is delivered right
/// away.
pub(crate) fn register_watch(
    control: &SystemSender,
    path: ActorPath,
    watcher: Watcher,
) {
    if let Err(mpsc::error::SendError(SystemMessage::Watch { watcher, .. })) =
        control.send(SystemMessage::Watch { path, watcher })
    {
        watcher.notify();
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[test]
    fn test_mailbox() {
        let (sender, receiver) = mailbox::<()>();
        assert!(!sender.is_closed());
        assert!(!receiver.is_closed());
    }

    #[test]
    fn test_watch_on_closed_control_notifies_immediately() {
        let (control, receiver) = control_channel();
        drop(receiver);
        let (watcher_control, _watcher_receiver) = control_channel();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        register_watch(
            &control,
            ActorPath::from("/user/watcher"),
            Watcher::new(
                watcher_control,
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            ),
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_watch_on_live_control_is_queued() {
        let (control, mut receiver) = control_channel();
        let (watcher_control, _watcher_receiver) = control_channel();
        register_watch(
            &control,
            ActorPath::from("/user/watcher"),
            Watcher::new(watcher_control, Box::new(|| {})),
        );
        match receiver.try_recv() {
            Ok(SystemMessage::Watch { path, .. }) => {
                assert_eq!(path, ActorPath::from("/user/watcher"))
            }
            _ => panic!("expected a watch registration"),
        }
    }

    #[test]
    fn test_terminated_watchers_are_forgotten() {
        let mut watchers = Watchers::new();
        let (live, _live_receiver) = control_channel();
        let (gone, gone_receiver) = control_channel();

        add_watcher(
            &mut watchers,
            ActorPath::from("/user/live"),
            Watcher::new(live.clone(), Box::new(|| {})),
        );
        add_watcher(
            &mut watchers,
            ActorPath::from("/user/gone"),
            Watcher::new(gone, Box::new(|| {})),
        );
        assert_eq!(watchers.len(), 2);

        drop(gone_receiver);
        add_watcher(
            &mut watchers,
            ActorPath::from("/user/next"),
            Watcher::new(live, Box::new(|| {})),
        );

        assert_eq!(watchers.len(), 2);
        assert!(watchers.contains_key(&ActorPath::from("/user/live")));
        assert!(watchers.contains_key(&ActorPath::from("/user/next")));
        assert!(!watchers.contains_key(&ActorPath::from("/user/gone")));
    }
}
