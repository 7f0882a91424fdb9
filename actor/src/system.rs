// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor system
//!
//! The `system` module provides the `ActorSystem` type. The `ActorSystem` type is the responsible for
//! creating the top level actors and for shutting them down in order.
//!

use crate::{
    Actor, ActorPath, ActorRef, Error, Event, Handler, Props,
    actor::ActorContext,
    event::{ActorEvent, EventBus},
    mailbox::{SystemMessage, SystemSender, control_channel, mailbox},
    runner::ActorRunner,
    sink::Sink,
};

use serde::Deserialize;
use tokio::sync::{RwLock, broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use tracing::{debug, error};

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Runtime configuration.
///
/// Every field has a default, so a partial document in any serde format is enough.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Capacity of the diagnostic event channel.
    pub event_capacity: usize,
    /// Whether dead letters are logged.
    pub log_dead_letters: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            event_capacity: 10000,
            log_dead_letters: true,
        }
    }
}

/// Actor system.
///
pub struct ActorSystem {}

/// Default implementation for `ActorSystem`.
impl ActorSystem {
    /// Create a new actor system with the default configuration.
    ///
    /// # Returns
    ///
    /// Returns a tuple with the system reference and the system runner.
    pub fn create(
        name: &str,
        token: CancellationToken,
    ) -> (SystemRef, SystemRunner) {
        Self::create_with_config(name, SystemConfig::default(), token)
    }

    /// Create a new actor system.
    pub fn create_with_config(
        name: &str,
        config: SystemConfig,
        token: CancellationToken,
    ) -> (SystemRef, SystemRunner) {
        let (event_sender, event_receiver) = mpsc::channel(100);
        let system = SystemRef::new(name, &config, event_sender, token);
        let runner = SystemRunner::new(event_receiver);
        (system, runner)
    }

    /// Create a new actor system together with its root actor, living at `/user/<name>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Create`] when the root actor can not be built.
    pub async fn create_with_root<A>(
        name: &str,
        props: Props<A>,
        token: CancellationToken,
    ) -> Result<(SystemRef, SystemRunner, ActorRef<A::Message>), Error>
    where
        A: Actor + Handler<A>,
    {
        let (system, runner) = Self::create(name, token);
        let root = system.create_root_actor(name, props).await?;
        Ok((system, runner, root))
    }
}

/// System event.
///
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// Stop the actor system.
    StopSystem,
}

/// A top level actor, as tracked for shutdown.
struct RootEntry {
    path: ActorPath,
    control: SystemSender,
}

/// System reference.
///
/// Cheap to clone. Every actor context carries one, there is no global system.
#[derive(Clone)]
pub struct SystemRef {
    name: Arc<String>,

    /// Diagnostic events.
    events: EventBus,

    /// Top level actors, in creation order.
    roots: Arc<RwLock<Vec<RootEntry>>>,

    /// Source of incarnation ids.
    uids: Arc<AtomicU64>,

    token: CancellationToken,
}

impl SystemRef {
    /// Create system reference.
    fn new(
        name: &str,
        config: &SystemConfig,
        event_sender: mpsc::Sender<SystemEvent>,
        token: CancellationToken,
    ) -> Self {
        let roots = Arc::new(RwLock::new(Vec::<RootEntry>::new()));
        let roots_clone = roots.clone();
        let token_clone = token.clone();

        tokio::spawn(async move {
            token_clone.cancelled().await;
            debug!("Stopping actor system...");
            let mut roots = roots_clone.write().await;
            while let Some(root) = roots.pop() {
                let (stop_sender, stop_receiver) = oneshot::channel();
                if root
                    .control
                    .send(SystemMessage::Stop(Some(stop_sender)))
                    .is_ok()
                {
                    debug!("Waiting for root actor {} to stop.", root.path);
                    let _ = stop_receiver.await;
                }
            }

            let _ = event_sender.send(SystemEvent::StopSystem).await;
        });

        SystemRef {
            name: Arc::new(name.to_owned()),
            events: EventBus::new(
                name,
                config.event_capacity,
                config.log_dead_letters,
            ),
            roots,
            uids: Arc::new(AtomicU64::new(1)),
            token,
        }
    }

    /// Name of the actor system.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates an actor with the given path, starts its runner and waits until the first
    /// instance is built. Returns the reference and the incarnation id.
    pub(crate) async fn create_actor_path<A>(
        &self,
        path: ActorPath,
        props: Props<A>,
        parent: Option<SystemSender>,
    ) -> Result<(ActorRef<A::Message>, u64), Error>
    where
        A: Actor + Handler<A>,
    {
        debug!("Creating actor {}.", &path);
        let (sender, receiver) = mailbox();
        let (control, control_receiver) = control_channel();
        let actor_ref =
            ActorRef::new(path.clone(), sender, control, self.events.clone());

        let uid = self.next_uid();
        let ctx = ActorContext::new(
            path.clone(),
            uid,
            self.clone(),
            actor_ref.clone(),
            parent,
        );
        let mut runner =
            ActorRunner::new(path.clone(), props, receiver, control_receiver);

        let (sender, receiver) = oneshot::channel();
        tokio::spawn(async move {
            runner.init(ctx, Some(sender)).await;
        });

        match receiver.await {
            Ok(Ok(())) => Ok((actor_ref, uid)),
            Ok(Err(err)) => Err(err),
            Err(err) => {
                error!("Actor {} runner vanished while starting.", &path);
                Err(Error::Create(path, err.to_string()))
            }
        }
    }

    /// Creates a top level actor at `/user/<name>`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`] when `name` is empty or contains `/`.
    /// - [`Error::NameConflict`] when a live top level actor already uses `name`.
    /// - [`Error::Create`] when the actor can not be built.
    pub async fn create_root_actor<A>(
        &self,
        name: &str,
        props: Props<A>,
    ) -> Result<ActorRef<A::Message>, Error>
    where
        A: Actor + Handler<A>,
    {
        if !ActorPath::is_valid_name(name) {
            return Err(Error::InvalidName(name.to_owned()));
        }
        let path = ActorPath::from("/user") / name;
        if self.has_live_root(&path).await {
            error!("Actor '{}' already exists!", &path);
            return Err(Error::NameConflict(path));
        }

        let (actor_ref, _) =
            self.create_actor_path(path.clone(), props, None).await?;

        let mut roots = self.roots.write().await;
        roots.retain(|root| !root.control.is_closed());
        if roots.iter().any(|root| root.path == path) {
            // Lost a race against a concurrent creation with the same name.
            drop(roots);
            actor_ref.ask_stop().await?;
            return Err(Error::NameConflict(path));
        }
        roots.push(RootEntry {
            path,
            control: actor_ref.control().clone(),
        });
        Ok(actor_ref)
    }

    async fn has_live_root(&self, path: &ActorPath) -> bool {
        self.roots
            .read()
            .await
            .iter()
            .any(|root| &root.path == path && !root.control.is_closed())
    }

    /// Paths of the live top level actors.
    pub async fn root_actors(&self) -> Vec<ActorPath> {
        self.roots
            .read()
            .await
            .iter()
            .filter(|root| !root.control.is_closed())
            .map(|root| root.path.clone())
            .collect()
    }

    /// Stops every top level actor, newest first, then the system.
    pub fn stop_system(&self) {
        self.token.cancel();
    }

    /// Subscribes to the diagnostic events of this system.
    pub fn subscribe(&self) -> broadcast::Receiver<ActorEvent> {
        self.events.subscribe()
    }

    /// Runs a sink in its own task.
    pub async fn run_sink<E>(&self, mut sink: Sink<E>)
    where
        E: Event,
    {
        tokio::spawn(async move {
            sink.run().await;
        });
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.events
    }

    pub(crate) fn next_uid(&self) -> u64 {
        self.uids.fetch_add(1, Ordering::Relaxed)
    }
}

/// System runner.
pub struct SystemRunner {
    /// The event receiver.
    event_receiver: mpsc::Receiver<SystemEvent>,
}

impl SystemRunner {
    /// Create a new system runner.
    pub(crate) fn new(event_receiver: mpsc::Receiver<SystemEvent>) -> Self {
        Self { event_receiver }
    }

    /// Run the actor system. Returns once every top level actor has stopped.
    pub async fn run(&mut self) {
        debug!("Running actor system...");
        while let Some(event) = self.event_receiver.recv().await {
            match event {
                SystemEvent::StopSystem => {
                    debug!("Actor system stopped.");
                    break;
                }
            }
        }
    }
}
