// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Inbox
//!
//! Code outside the actor system (a `main`, a test) can not receive messages by itself. An
//! [`Inbox`] owns a mailbox and hands out ordinary [`ActorRef`]s to it, so requests can carry
//! a reply handle that leads back to the caller.
//!

use crate::{
    ActorPath, ActorRef, Error, Message,
    mailbox::{
        MailboxReceiver, SystemMessage, SystemReceiver, Watchers, add_watcher,
        control_channel, mailbox,
    },
    system::SystemRef,
};

use tokio::{select, sync::oneshot};
use tracing::debug;

use std::time::Duration;

/// Reply receiver for callers that are not actors.
///
/// The inbox lives at `/temp/<name>`. Stop requests and watches on its references are honored:
/// a stop closes it (queued replies can still be read), and both a stop and dropping the inbox
/// notify watchers.
pub struct Inbox<M: Message> {
    reference: ActorRef<M>,
    receiver: MailboxReceiver<M>,
    control: SystemReceiver,
    watchers: Watchers,
    closed: bool,
}

impl<M: Message> Inbox<M> {
    /// Creates an inbox attached to `system`.
    pub fn new(system: &SystemRef, name: &str) -> Self {
        let path = ActorPath::from("/temp") / name;
        let (sender, receiver) = mailbox();
        let (control_sender, control) = control_channel();
        let reference =
            ActorRef::new(path, sender, control_sender, system.events().clone());
        Self {
            reference,
            receiver,
            control,
            watchers: Watchers::new(),
            closed: false,
        }
    }

    /// A reference that delivers into this inbox.
    pub fn reference(&self) -> ActorRef<M> {
        self.reference.clone()
    }

    /// Waits for the next message. Returns `None` once the inbox is closed and empty.
    pub async fn recv(&mut self) -> Option<M> {
        loop {
            select! {
                biased;

                control = self.control.recv(), if !self.closed => {
                    if let Some(control) = control {
                        self.handle_control(control);
                    }
                }
                msg = self.receiver.recv() => return msg,
            }
        }
    }

    /// Waits for the next message at most `timeout`.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] when nothing arrives in time.
    /// - [`Error::Stop`] when the inbox is closed and empty.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<M, Error> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(Some(msg)) => Ok(msg),
            Ok(None) => Err(Error::Stop),
            Err(_) => Err(Error::Timeout(millis(timeout))),
        }
    }

    /// Takes a message if one is already queued.
    pub fn try_recv(&mut self) -> Option<M> {
        while !self.closed {
            match self.control.try_recv() {
                Ok(control) => self.handle_control(control),
                Err(_) => break,
            }
        }
        self.receiver.try_recv().ok()
    }

    fn handle_control(&mut self, control: SystemMessage) {
        match control {
            SystemMessage::Stop(ack) => {
                debug!("Inbox {} stopped.", self.reference.path());
                self.close(ack);
            }
            SystemMessage::Watch { path, watcher } => {
                add_watcher(&mut self.watchers, path, watcher);
            }
            SystemMessage::Unwatch(watcher) => {
                self.watchers.remove(&watcher);
            }
            SystemMessage::ChildTerminated { .. }
            | SystemMessage::ChildFailed { .. } => {}
        }
    }

    fn close(&mut self, ack: Option<oneshot::Sender<()>>) {
        self.closed = true;
        self.receiver.close();
        self.control.close();

        let mut acks: Vec<oneshot::Sender<()>> = ack.into_iter().collect();
        while let Ok(control) = self.control.try_recv() {
            match control {
                SystemMessage::Stop(Some(ack)) => acks.push(ack),
                SystemMessage::Watch { path, watcher } => {
                    add_watcher(&mut self.watchers, path, watcher);
                }
                SystemMessage::Unwatch(watcher) => {
                    self.watchers.remove(&watcher);
                }
                _ => {}
            }
        }
        for (_, watcher) in self.watchers.drain() {
            watcher.notify();
        }
        for ack in acks {
            let _ = ack.send(());
        }
    }
}

/// Whole milliseconds of `duration`, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl<M: Message> Drop for Inbox<M> {
    fn drop(&mut self) {
        if !self.closed {
            self.close(None);
        }
    }
}
