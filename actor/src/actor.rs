// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor
//!
//! Core abstractions of the runtime:
//!
//! - [`Actor`] and [`Handler`]: the state of an actor and the function that processes its
//!   protocol one message at a time.
//! - [`Behavior`]: what the dispatch loop does after a message (keep going, swap the state,
//!   stop, or report the message as unhandled).
//! - [`Signal`]: lifecycle notifications delivered apart from the protocol.
//! - [`Props`]: the factory used to build (and rebuild after a failure) an actor.
//! - [`ActorContext`]: the supervision tree node handed to every handler.
//! - [`ActorRef`]: the opaque, cloneable handle used to send messages.
//!

use crate::{
    ActorPath, Error,
    event::EventBus,
    mailbox::{
        MailboxSender, Notifier, SystemMessage, SystemSender, Watcher,
        register_watch,
    },
    supervision::SupervisionStrategy,
    system::SystemRef,
};

use async_trait::async_trait;

use tokio::sync::oneshot;

use tracing::{debug, error};

use std::{
    any::Any,
    collections::HashMap,
    fmt::{self, Debug},
    hash::{Hash, Hasher},
    sync::Arc,
};

/// Trait implemented by every protocol that can be sent to an actor, including replies.
///
/// Protocols are closed enums (or plain structs for replies) so that handling them is an
/// exhaustive `match`.
pub trait Message: Debug + Send + 'static {}

/// Lifecycle signals injected by the runtime.
///
/// Signals travel apart from the actor protocol and reach [`Handler::on_signal`], so protocols
/// never need lifecycle variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The instance failed and is about to be replaced. Delivered to the old instance.
    PreRestart,
    /// The actor has stopped and its children are gone.
    PostStop,
}

/// Outcome of processing one message.
pub enum Behavior<A> {
    /// Keep the current state and handler.
    Same,
    /// Replace the current state with a new one. The next message is handled by it.
    Become(A),
    /// Terminate the actor.
    Stopped,
    /// The message does not apply to the current behavior. It is dropped and reported, it is
    /// not a failure.
    Unhandled,
}

impl<A> Debug for Behavior<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Behavior::Same => write!(f, "Same"),
            Behavior::Become(_) => write!(f, "Become"),
            Behavior::Stopped => write!(f, "Stopped"),
            Behavior::Unhandled => write!(f, "Unhandled"),
        }
    }
}

/// The actor trait.
///
/// An actor owns its state exclusively. The runtime guarantees that at most one message (or
/// signal) is being processed for a given actor at any time, so no locking is needed inside.
///
/// # Example
///
/// ```ignore
/// struct Counter {
///     value: u64,
/// }
///
/// #[derive(Debug)]
/// enum CounterCommand {
///     Add(u64),
///     Get(ActorRef<CounterValue>),
/// }
///
/// impl Message for CounterCommand {}
///
/// #[async_trait]
/// impl Actor for Counter {
///     type Message = CounterCommand;
/// }
///
/// #[async_trait]
/// impl Handler<Counter> for Counter {
///     async fn handle_message(
///         &mut self,
///         msg: CounterCommand,
///         _ctx: &mut ActorContext<Counter>,
///     ) -> Result<Behavior<Counter>, Error> {
///         match msg {
///             CounterCommand::Add(n) => self.value += n,
///             CounterCommand::Get(reply_to) => reply_to.tell(CounterValue(self.value)),
///         }
///         Ok(Behavior::Same)
///     }
/// }
/// ```
#[async_trait]
pub trait Actor: Send + Sync + Sized + 'static + Handler<Self> {
    /// The protocol accepted by this actor.
    type Message: Message;

    /// Supervision strategy used when the parent does not choose one.
    fn supervision_strategy() -> SupervisionStrategy {
        SupervisionStrategy::default()
    }

    /// Setup hook, run on every fresh instance before its first message (after a restart too).
    /// An error here is a construction failure.
    async fn pre_start(
        &mut self,
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        Ok(())
    }
}

/// Message handler.
#[async_trait]
pub trait Handler<A: Actor + Handler<A>>: Send + Sync {
    /// Processes one message. An `Err` (or a panic) is a failure handed to the supervisor; the
    /// message is not delivered again.
    async fn handle_message(
        &mut self,
        msg: A::Message,
        ctx: &mut ActorContext<A>,
    ) -> Result<Behavior<A>, Error>;

    /// Processes a lifecycle signal. Ignored by default.
    async fn on_signal(
        &mut self,
        _signal: Signal,
        _ctx: &mut ActorContext<A>,
    ) -> Result<(), Error> {
        Ok(())
    }
}

/// Recipe for building an actor.
///
/// The factory is kept for the whole life of the actor: every restart builds a fresh instance
/// from it, so the actor comes back with its initial state.
pub struct Props<A: Actor> {
    factory: Arc<dyn Fn() -> Result<A, Error> + Send + Sync>,
    supervision: SupervisionStrategy,
}

impl<A: Actor> Props<A> {
    /// Props from an infallible factory.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Self::try_new(move || Ok(factory()))
    }

    /// Props from a factory that may fail.
    pub fn try_new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<A, Error> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            supervision: A::supervision_strategy(),
        }
    }

    /// Overrides the supervision strategy for this child.
    pub fn with_supervision(mut self, supervision: SupervisionStrategy) -> Self {
        self.supervision = supervision;
        self
    }

    pub fn supervision(&self) -> &SupervisionStrategy {
        &self.supervision
    }

    pub(crate) fn produce(&self) -> Result<A, Error> {
        (self.factory)()
    }
}

impl<A: Actor> Clone for Props<A> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            supervision: self.supervision.clone(),
        }
    }
}

/// A child as seen from its parent.
struct ChildEntry {
    /// Incarnation id, so a late termination notice never removes a newer child with the same
    /// name.
    uid: u64,
    path: ActorPath,
    control: SystemSender,
    /// The typed `ActorRef`, erased.
    reference: Box<dyn Any + Send + Sync>,
}

/// Actor context.
///
/// The supervision tree node of a running actor: its identity, its parent link, the children it
/// owns and the operations to create, watch and stop actors. Children are only removed from
/// the context when their termination notice arrives.
pub struct ActorContext<A: Actor + Handler<A>> {
    path: ActorPath,
    uid: u64,
    system: SystemRef,
    myself: ActorRef<A::Message>,
    parent: Option<SystemSender>,
    children: HashMap<String, ChildEntry>,
}

impl<A> ActorContext<A>
where
    A: Actor + Handler<A>,
{
    pub(crate) fn new(
        path: ActorPath,
        uid: u64,
        system: SystemRef,
        myself: ActorRef<A::Message>,
        parent: Option<SystemSender>,
    ) -> Self {
        Self {
            path,
            uid,
            system,
            myself,
            parent,
            children: HashMap::new(),
        }
    }

    /// Path of the actor.
    pub fn path(&self) -> &ActorPath {
        &self.path
    }

    /// The actor system this actor runs in.
    pub fn system(&self) -> &SystemRef {
        &self.system
    }

    /// A reference to the actor itself.
    pub fn reference(&self) -> ActorRef<A::Message> {
        self.myself.clone()
    }

    /// Creates a child actor, waits until it is built and returns its reference.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`] when `name` is empty or contains `/`.
    /// - [`Error::NameConflict`] when a live child already uses `name`.
    /// - [`Error::Create`] when the factory or `pre_start` of the child fails.
    pub async fn create_child<C>(
        &mut self,
        name: &str,
        props: Props<C>,
    ) -> Result<ActorRef<C::Message>, Error>
    where
        C: Actor + Handler<C>,
    {
        if !ActorPath::is_valid_name(name) {
            error!("Invalid child name '{}' requested by {}.", name, &self.path);
            return Err(Error::InvalidName(name.to_owned()));
        }
        let path = self.path.clone() / name;
        if self.children.contains_key(name) {
            error!("Actor '{}' already exists!", &path);
            return Err(Error::NameConflict(path));
        }

        let (actor_ref, uid) = self
            .system
            .create_actor_path(
                path.clone(),
                props,
                Some(self.myself.control().clone()),
            )
            .await?;

        self.children.insert(
            name.to_owned(),
            ChildEntry {
                uid,
                path,
                control: actor_ref.control().clone(),
                reference: Box::new(actor_ref.clone()),
            },
        );
        Ok(actor_ref)
    }

    /// Returns a live child by name. `M` must be the child's protocol.
    pub fn get_child<M: Message>(&self, name: &str) -> Option<ActorRef<M>> {
        self.children
            .get(name)
            .and_then(|child| child.reference.downcast_ref::<ActorRef<M>>())
            .cloned()
    }

    /// Paths of the live children.
    pub fn children(&self) -> Vec<ActorPath> {
        self.children.values().map(|child| child.path.clone()).collect()
    }

    /// Asks a child to stop. Its entry goes away when the termination notice arrives.
    pub fn stop_child(&self, name: &str) {
        if let Some(child) = self.children.get(name) {
            debug!("Stopping child {}.", &child.path);
            let _ = child.control.send(SystemMessage::Stop(None));
        }
    }

    /// Watches `target`: once it has fully stopped, `message` is delivered to this actor
    /// exactly once. Watching an actor that is already gone delivers `message` right away.
    /// The registration survives restarts of `target`.
    pub fn watch<M: Message>(&self, target: &ActorRef<M>, message: A::Message) {
        debug!("Actor {} watches {}.", &self.path, target.path());
        register_watch(
            target.control(),
            self.path.clone(),
            Watcher::new(
                self.myself.control().clone(),
                self.myself.deliver_once(message),
            ),
        );
    }

    /// Cancels a previous [`watch`](Self::watch) on `target`.
    pub fn unwatch<M: Message>(&self, target: &ActorRef<M>) {
        debug!("Actor {} unwatches {}.", &self.path, target.path());
        let _ = target
            .control()
            .send(SystemMessage::Unwatch(self.path.clone()));
    }

    /// Stops this actor once the current message is done. Children stop first, then
    /// [`Signal::PostStop`] is delivered, then watchers are notified.
    pub fn stop(&self) {
        debug!("Stopping actor {} from its context.", &self.path);
        let _ = self.myself.control().send(SystemMessage::Stop(None));
    }

    pub(crate) fn uid(&self) -> u64 {
        self.uid
    }

    /// Checks whether `name` is a live child of the given incarnation.
    pub(crate) fn is_current_child(&self, name: &str, uid: u64) -> bool {
        self.children.get(name).is_some_and(|child| child.uid == uid)
    }

    /// Removes a child entry if it still belongs to the given incarnation.
    pub(crate) fn remove_child(&mut self, name: &str, uid: u64) -> bool {
        match self.children.get(name) {
            Some(child) if child.uid == uid => {
                self.children.remove(name);
                true
            }
            _ => false,
        }
    }

    /// Stops every child and waits until each one (and its own subtree) is gone.
    pub(crate) async fn stop_children(&mut self) {
        for (_, child) in self.children.drain() {
            let (stop_sender, stop_receiver) = oneshot::channel();
            if child
                .control
                .send(SystemMessage::Stop(Some(stop_sender)))
                .is_err()
            {
                continue;
            }
            debug!("Waiting for child {} to stop.", &child.path);
            let _ = stop_receiver.await;
        }
    }

    pub(crate) fn notify_parent(&self, message: SystemMessage) {
        if let Some(parent) = self.parent.as_ref() {
            let _ = parent.send(message);
        }
    }

    pub(crate) fn has_parent(&self) -> bool {
        self.parent.is_some()
    }
}

/// Actor reference.
///
/// The only way to reach an actor. References are cheap to clone and carry no ownership of the
/// actor: sending to an actor that has terminated drops the message as a dead letter. Two
/// references are equal when they lead to the same mailbox.
pub struct ActorRef<M: Message> {
    path: ActorPath,
    mailbox: MailboxSender<M>,
    control: SystemSender,
    events: EventBus,
}

impl<M: Message> ActorRef<M> {
    pub(crate) fn new(
        path: ActorPath,
        mailbox: MailboxSender<M>,
        control: SystemSender,
        events: EventBus,
    ) -> Self {
        Self {
            path,
            mailbox,
            control,
            events,
        }
    }

    /// Sends a message and returns immediately (fire-and-forget).
    pub fn tell(&self, message: M) {
        if let Err(error) = self.mailbox.send(message) {
            self.events.dead_letter(&self.path, format!("{:?}", error.0));
        }
    }

    /// Asks the actor to stop and waits until it has fully terminated.
    pub async fn ask_stop(&self) -> Result<(), Error> {
        debug!("Stopping actor {} from handle reference.", &self.path);
        let (response_sender, response_receiver) = oneshot::channel();

        if self
            .control
            .send(SystemMessage::Stop(Some(response_sender)))
            .is_err()
        {
            Ok(())
        } else {
            response_receiver
                .await
                .map_err(|error| Error::Send(error.to_string()))
        }
    }

    /// Asks the actor to stop without waiting.
    pub fn tell_stop(&self) {
        debug!("Stopping actor {} from handle reference.", &self.path);
        let _ = self.control.send(SystemMessage::Stop(None));
    }

    /// Path of the actor.
    pub fn path(&self) -> ActorPath {
        self.path.clone()
    }

    /// True once the actor has terminated.
    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    pub(crate) fn control(&self) -> &SystemSender {
        &self.control
    }

    /// Builds a notifier that sends `message` to this actor.
    pub(crate) fn deliver_once(&self, message: M) -> Notifier {
        let target = self.clone();
        Box::new(move || target.tell(message))
    }
}

impl<M: Message> Clone for ActorRef<M> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            mailbox: self.mailbox.clone(),
            control: self.control.clone(),
            events: self.events.clone(),
        }
    }
}

impl<M: Message> PartialEq for ActorRef<M> {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.mailbox.same_channel(&other.mailbox)
    }
}

impl<M: Message> Eq for ActorRef<M> {}

impl<M: Message> Hash for ActorRef<M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl<M: Message> Debug for ActorRef<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorRef({})", self.path)
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use crate::{Inbox, system::ActorSystem};

    use tokio_util::sync::CancellationToken;

    use std::time::Duration;

    #[derive(Debug)]
    struct TestActor {
        counter: usize,
    }

    #[derive(Debug)]
    enum TestMessage {
        Add(usize),
        Get(ActorRef<TestResponse>),
        Spawn(String, ActorRef<SpawnResult>),
    }

    impl Message for TestMessage {}

    #[derive(Debug, PartialEq)]
    struct TestResponse(usize);

    impl Message for TestResponse {}

    #[derive(Debug)]
    struct SpawnResult(Result<ActorRef<TestMessage>, Error>);

    impl Message for SpawnResult {}

    #[async_trait]
    impl Actor for TestActor {
        type Message = TestMessage;
    }

    #[async_trait]
    impl Handler<TestActor> for TestActor {
        async fn handle_message(
            &mut self,
            msg: TestMessage,
            ctx: &mut ActorContext<TestActor>,
        ) -> Result<Behavior<TestActor>, Error> {
            match msg {
                TestMessage::Add(value) => self.counter += value,
                TestMessage::Get(reply_to) => {
                    reply_to.tell(TestResponse(self.counter))
                }
                TestMessage::Spawn(name, reply_to) => {
                    let result = ctx
                        .create_child(&name, Props::new(|| TestActor { counter: 0 }))
                        .await;
                    reply_to.tell(SpawnResult(result));
                }
            }
            Ok(Behavior::Same)
        }
    }

    #[tokio::test]
    async fn test_actor() {
        let (system, _runner) =
            ActorSystem::create("test", CancellationToken::new());
        let actor_ref = system
            .create_root_actor("test", Props::new(|| TestActor { counter: 0 }))
            .await
            .unwrap();
        let mut inbox = Inbox::<TestResponse>::new(&system, "probe");

        actor_ref.tell(TestMessage::Add(10));
        actor_ref.tell(TestMessage::Add(10));
        actor_ref.tell(TestMessage::Get(inbox.reference()));

        let response = inbox.recv_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(response, TestResponse(20));

        actor_ref.ask_stop().await.unwrap();
        assert!(actor_ref.is_closed());
    }

    #[tokio::test]
    async fn test_child_name_conflict() {
        let (system, _runner) =
            ActorSystem::create("test", CancellationToken::new());
        let parent = system
            .create_root_actor("parent", Props::new(|| TestActor { counter: 0 }))
            .await
            .unwrap();
        let mut inbox = Inbox::<SpawnResult>::new(&system, "probe");

        parent.tell(TestMessage::Spawn("child".to_owned(), inbox.reference()));
        let first = inbox.recv_timeout(Duration::from_secs(1)).await.unwrap();
        let child = first.0.unwrap();
        assert_eq!(child.path(), ActorPath::from("/user/parent/child"));

        parent.tell(TestMessage::Spawn("child".to_owned(), inbox.reference()));
        let second = inbox.recv_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(
            second.0.unwrap_err(),
            Error::NameConflict(ActorPath::from("/user/parent/child"))
        );

        parent.tell(TestMessage::Spawn("a/b".to_owned(), inbox.reference()));
        let third = inbox.recv_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(third.0.unwrap_err(), Error::InvalidName("a/b".to_owned()));
    }

    #[tokio::test]
    async fn test_tell_to_terminated_actor_is_dead_letter() {
        let (system, _runner) =
            ActorSystem::create("test", CancellationToken::new());
        let mut events = system.subscribe();
        let actor_ref = system
            .create_root_actor("gone", Props::new(|| TestActor { counter: 0 }))
            .await
            .unwrap();
        actor_ref.ask_stop().await.unwrap();

        actor_ref.tell(TestMessage::Add(1));

        loop {
            let event = events.recv().await.unwrap();
            if event.kind == crate::ActorEventKind::DeadLetter {
                assert_eq!(event.path, ActorPath::from("/user/gone"));
                assert_eq!(event.detail, "Add(1)");
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_refs_equality() {
        let (system, _runner) =
            ActorSystem::create("test", CancellationToken::new());
        let first = system
            .create_root_actor("first", Props::new(|| TestActor { counter: 0 }))
            .await
            .unwrap();
        let second = system
            .create_root_actor("second", Props::new(|| TestActor { counter: 0 }))
            .await
            .unwrap();
        assert_eq!(first, first.clone());
        assert_ne!(first, second);
        assert_eq!(format!("{:?}", first), "ActorRef(/user/first)");
    }
}
