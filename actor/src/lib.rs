// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor runtime
//!
//! A typed, supervised actor runtime on top of tokio. Actors own their state, process one
//! message at a time and talk to each other only through [`ActorRef`] handles.
//!
//! ## Overview
//!
//! In response to a message, an actor can:
//! - Update its private state
//! - Create child actors, which it supervises
//! - Send messages to any actor it holds a reference to (including itself)
//! - Watch other actors to learn when they terminate
//! - Decide how the next message is handled ([`Behavior`])
//!
//! ### Supervision tree
//!
//! Every actor but the top level ones has a parent. When a handler fails (it returns an
//! [`Error`] or panics) the failure is handed to the [`SupervisionStrategy`] chosen for that
//! actor: restart it from its factory, stop it, or escalate the failure to the parent.
//! Stopping an actor stops its whole subtree, children first.
//!
//! ### Messages and replies
//!
//! Each actor accepts one protocol type (its [`Actor::Message`]). Replies are ordinary
//! messages sent to a reply handle carried in the request, so there is no special
//! request/response channel. Callers outside the system receive replies through an
//! [`Inbox`].
//!
//! ### Diagnostic events
//!
//! The runtime publishes an [`ActorEvent`] for creations, failures, restarts, terminations,
//! dead letters and unhandled messages. Subscribe with [`SystemRef::subscribe`] or run a
//! [`Sink`].
//!
//! ## Getting started
//!
//! ```ignore
//! use actor::{Actor, ActorContext, ActorRef, ActorSystem, Behavior, Error, Handler, Inbox,
//!     Message, Props};
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Counter {
//!     value: u64,
//! }
//!
//! #[derive(Debug)]
//! enum CounterCommand {
//!     Add(u64),
//!     Get(ActorRef<CounterValue>),
//! }
//!
//! impl Message for CounterCommand {}
//!
//! #[derive(Debug)]
//! struct CounterValue(u64);
//!
//! impl Message for CounterValue {}
//!
//! #[async_trait]
//! impl Actor for Counter {
//!     type Message = CounterCommand;
//! }
//!
//! #[async_trait]
//! impl Handler<Counter> for Counter {
//!     async fn handle_message(
//!         &mut self,
//!         msg: CounterCommand,
//!         _ctx: &mut ActorContext<Counter>,
//!     ) -> Result<Behavior<Counter>, Error> {
//!         match msg {
//!             CounterCommand::Add(n) => self.value += n,
//!             CounterCommand::Get(reply_to) => reply_to.tell(CounterValue(self.value)),
//!         }
//!         Ok(Behavior::Same)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let (system, mut runner) = ActorSystem::create("counters", CancellationToken::new());
//!     let counter = system
//!         .create_root_actor("counter", Props::new(|| Counter { value: 0 }))
//!         .await?;
//!
//!     let mut inbox = Inbox::new(&system, "main");
//!     counter.tell(CounterCommand::Add(2));
//!     counter.tell(CounterCommand::Get(inbox.reference()));
//!     let CounterValue(value) = inbox.recv().await.ok_or(Error::Stop)?;
//!     assert_eq!(value, 2);
//!
//!     system.stop_system();
//!     runner.run().await;
//!     Ok(())
//! }
//! ```
//!

// Private modules containing the implementation
mod actor;
mod error;
mod event;
mod inbox;
mod mailbox;
mod path;
mod runner;
mod sink;
mod supervision;
mod system;

//
// Core Actor System Types
//

/// The actor trait: state, protocol type, default supervision and setup hook.
pub use actor::Actor;

/// Supervision tree node handed to every handler. Creates, watches and stops actors.
pub use actor::ActorContext;

/// Cloneable handle used to send messages to an actor.
pub use actor::ActorRef;

/// Outcome of handling one message.
pub use actor::Behavior;

/// Processes the messages and lifecycle signals of an actor.
pub use actor::Handler;

/// Marker trait for every protocol and reply type.
pub use actor::Message;

/// Factory and supervision strategy used to build (and rebuild) an actor.
pub use actor::Props;

/// Lifecycle signals delivered apart from the protocol.
pub use actor::Signal;

/// Reply receiver for callers that are not actors.
pub use inbox::Inbox;

//
// Error Handling
//

/// Error type of every runtime operation and of handler failures.
pub use error::Error;

//
// Actor Addressing
//

/// Hierarchical path identifying an actor within the supervision tree.
pub use path::ActorPath;

//
// Event System
//

/// Diagnostic event published by the runtime.
pub use event::ActorEvent;

/// Kind of a diagnostic event.
pub use event::ActorEventKind;

/// Trait for events that can be processed by a [`Sink`].
pub use event::Event;

/// Runs a [`Subscriber`] over an event stream.
pub use sink::Sink;

/// Receives the events of a [`Sink`].
pub use sink::Subscriber;

//
// Supervision
//

/// Retry strategy with a user-defined sequence of waits.
pub use supervision::CustomIntervalStrategy;

/// Retry strategy with an exponentially growing wait.
pub use supervision::ExponentialBackoffStrategy;

/// Retry strategy with a fixed wait.
pub use supervision::FixedIntervalStrategy;

/// Retry strategy that restarts immediately.
pub use supervision::NoIntervalStrategy;

/// Trait for custom retry strategies.
pub use supervision::RetryStrategy;

/// Built-in retry strategies.
pub use supervision::Strategy;

/// What the runtime does when a handler fails.
pub use supervision::SupervisionStrategy;

//
// Actor System
//

/// Entry point that creates actor systems.
pub use system::ActorSystem;

/// Runtime configuration.
pub use system::SystemConfig;

/// Internal system notifications.
pub use system::SystemEvent;

/// Cloneable handle to a running actor system.
pub use system::SystemRef;

/// Waits for the system to shut down.
pub use system::SystemRunner;
