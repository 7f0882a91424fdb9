// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Event sinks.
//!
//! A [`Sink`] drains a broadcast receiver (usually [`SystemRef::subscribe`]) in its own task
//! and hands every event to a [`Subscriber`]. Use [`SystemRef::run_sink`] to start one.
//!
//! [`SystemRef::subscribe`]: crate::SystemRef::subscribe
//! [`SystemRef::run_sink`]: crate::SystemRef::run_sink

use crate::Event;

use async_trait::async_trait;
use tokio::sync::broadcast::{Receiver as EventReceiver, error::RecvError};

use tracing::{debug, warn};

/// Feeds events from a broadcast channel to a subscriber.
pub struct Sink<E: Event> {
    subscriber: Box<dyn Subscriber<E>>,
    event_receiver: EventReceiver<E>,
}

impl<E: Event> Sink<E> {
    pub fn new(
        event_receiver: EventReceiver<E>,
        subscriber: impl Subscriber<E>,
    ) -> Self {
        Sink {
            subscriber: Box::new(subscriber),
            event_receiver,
        }
    }

    /// Processes events until the channel closes. A slow subscriber skips the events it missed
    /// and carries on.
    pub async fn run(&mut self) {
        loop {
            match self.event_receiver.recv().await {
                Ok(event) => {
                    debug!(
                        "Received event: {:?}. Notify to the subscriber.",
                        event
                    );
                    self.subscriber.notify(event).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Sink lagged behind, {} events skipped.", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

/// Receives the events of a [`Sink`].
#[async_trait]
pub trait Subscriber<E: Event>: Send + Sync + 'static {
    async fn notify(&self, event: E);
}
