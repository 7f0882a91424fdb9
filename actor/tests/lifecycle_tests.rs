// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

// Lifecycle tests for the actor module: watch, stop order, behavior swaps and dead letters.

use actor::{
    Actor, ActorContext, ActorEvent, ActorEventKind, ActorPath, ActorRef,
    ActorSystem, Behavior, Error, Handler, Inbox, Message, Props, Signal, Sink,
    Subscriber, SystemConfig,
};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

const TIMEOUT: Duration = Duration::from_secs(2);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Defines target command
#[derive(Debug)]
pub enum TargetCommand {
    Fail,
    Passivate,
    Ping(ActorRef<Pong>),
}

impl Message for TargetCommand {}

#[derive(Debug, PartialEq)]
pub struct Pong;

impl Message for Pong {}

// Defines target actor.
#[derive(Debug)]
pub struct Target;

#[async_trait]
impl Actor for Target {
    type Message = TargetCommand;
}

#[async_trait]
impl Handler<Target> for Target {
    async fn handle_message(
        &mut self,
        msg: TargetCommand,
        _ctx: &mut ActorContext<Target>,
    ) -> Result<Behavior<Target>, Error> {
        match msg {
            TargetCommand::Fail => Err(Error::Functional("target failed".to_owned())),
            TargetCommand::Passivate => Ok(Behavior::Stopped),
            TargetCommand::Ping(reply_to) => {
                reply_to.tell(Pong);
                Ok(Behavior::Same)
            }
        }
    }
}

// Defines observer command
#[derive(Debug)]
pub enum ObserverCommand {
    Watch(ActorRef<TargetCommand>, String),
    WatchInbox(ActorRef<Pong>, String),
    Unwatch(ActorRef<TargetCommand>),
    Terminated(String),
    Notices(ActorRef<Notices>),
}

impl Message for ObserverCommand {}

#[derive(Debug, PartialEq)]
pub struct Notices(Vec<String>);

impl Message for Notices {}

// Defines observer actor: records termination notices.
#[derive(Debug, Default)]
pub struct Observer {
    notices: Vec<String>,
}

#[async_trait]
impl Actor for Observer {
    type Message = ObserverCommand;
}

#[async_trait]
impl Handler<Observer> for Observer {
    async fn handle_message(
        &mut self,
        msg: ObserverCommand,
        ctx: &mut ActorContext<Observer>,
    ) -> Result<Behavior<Observer>, Error> {
        match msg {
            ObserverCommand::Watch(target, label) => {
                ctx.watch(&target, ObserverCommand::Terminated(label))
            }
            ObserverCommand::WatchInbox(target, label) => {
                ctx.watch(&target, ObserverCommand::Terminated(label))
            }
            ObserverCommand::Unwatch(target) => ctx.unwatch(&target),
            ObserverCommand::Terminated(label) => self.notices.push(label),
            ObserverCommand::Notices(reply_to) => {
                reply_to.tell(Notices(self.notices.clone()))
            }
        }
        Ok(Behavior::Same)
    }
}

async fn notices(
    observer: &ActorRef<ObserverCommand>,
    inbox: &mut Inbox<Notices>,
) -> Vec<String> {
    observer.tell(ObserverCommand::Notices(inbox.reference()));
    inbox.recv_timeout(TIMEOUT).await.unwrap().0
}

async fn wait_for_notices(
    observer: &ActorRef<ObserverCommand>,
    inbox: &mut Inbox<Notices>,
    expected: &[&str],
) {
    for _ in 0..100 {
        if notices(observer, inbox).await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("notices never became {:?}", expected);
}

#[tokio::test]
async fn test_watch_terminated_actor_notifies_immediately() {
    init_tracing();
    let (system, _runner) =
        ActorSystem::create("test", CancellationToken::new());
    let target = system
        .create_root_actor("target", Props::new(|| Target))
        .await
        .unwrap();
    let observer = system
        .create_root_actor("observer", Props::new(Observer::default))
        .await
        .unwrap();
    let mut inbox = Inbox::new(&system, "probe");

    target.ask_stop().await.unwrap();
    observer.tell(ObserverCommand::Watch(target.clone(), "target".to_owned()));

    wait_for_notices(&observer, &mut inbox, &["target"]).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(notices(&observer, &mut inbox).await, vec!["target"]);
}

#[tokio::test]
async fn test_watch_survives_restart() {
    init_tracing();
    let (system, _runner) =
        ActorSystem::create("test", CancellationToken::new());
    let target = system
        .create_root_actor("target", Props::new(|| Target))
        .await
        .unwrap();
    let observer = system
        .create_root_actor("observer", Props::new(Observer::default))
        .await
        .unwrap();
    let mut notice_inbox = Inbox::new(&system, "notices");
    let mut pong_inbox = Inbox::new(&system, "pong");

    observer.tell(ObserverCommand::Watch(target.clone(), "target".to_owned()));
    // Make sure the registration is in place before the failure.
    assert!(notices(&observer, &mut notice_inbox).await.is_empty());

    target.tell(TargetCommand::Fail);
    target.tell(TargetCommand::Ping(pong_inbox.reference()));
    assert_eq!(pong_inbox.recv_timeout(TIMEOUT).await.unwrap(), Pong);
    assert!(notices(&observer, &mut notice_inbox).await.is_empty());

    target.tell(TargetCommand::Passivate);
    wait_for_notices(&observer, &mut notice_inbox, &["target"]).await;
}

#[tokio::test]
async fn test_unwatch_cancels_notice() {
    let (system, _runner) =
        ActorSystem::create("test", CancellationToken::new());
    let target = system
        .create_root_actor("target", Props::new(|| Target))
        .await
        .unwrap();
    let observer = system
        .create_root_actor("observer", Props::new(Observer::default))
        .await
        .unwrap();
    let mut inbox = Inbox::new(&system, "probe");

    observer.tell(ObserverCommand::Watch(target.clone(), "target".to_owned()));
    observer.tell(ObserverCommand::Unwatch(target.clone()));
    assert!(notices(&observer, &mut inbox).await.is_empty());

    target.ask_stop().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(notices(&observer, &mut inbox).await.is_empty());
}

#[tokio::test]
async fn test_dropped_inbox_notifies_watchers() {
    let (system, _runner) =
        ActorSystem::create("test", CancellationToken::new());
    let observer = system
        .create_root_actor("observer", Props::new(Observer::default))
        .await
        .unwrap();
    let mut inbox = Inbox::new(&system, "probe");
    let watched = Inbox::<Pong>::new(&system, "watched");

    observer.tell(ObserverCommand::WatchInbox(
        watched.reference(),
        "inbox".to_owned(),
    ));
    assert!(notices(&observer, &mut inbox).await.is_empty());

    drop(watched);
    wait_for_notices(&observer, &mut inbox, &["inbox"]).await;
}

// Defines a tree node that records its PostStop in a shared log.
pub struct Node {
    name: String,
    children: Vec<(String, Vec<String>)>,
    log: Arc<Mutex<Vec<String>>>,
}

#[derive(Debug)]
pub struct NodeCommand;

impl Message for NodeCommand {}

fn node(
    name: &str,
    children: Vec<(String, Vec<String>)>,
    log: Arc<Mutex<Vec<String>>>,
) -> Props<Node> {
    let name = name.to_owned();
    Props::new(move || Node {
        name: name.clone(),
        children: children.clone(),
        log: log.clone(),
    })
}

#[async_trait]
impl Actor for Node {
    type Message = NodeCommand;

    async fn pre_start(
        &mut self,
        ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        for (child, grandchildren) in self.children.clone() {
            let grandchildren = grandchildren
                .into_iter()
                .map(|name| (name, vec![]))
                .collect();
            ctx.create_child(&child, node(&child, grandchildren, self.log.clone()))
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<Node> for Node {
    async fn handle_message(
        &mut self,
        _msg: NodeCommand,
        _ctx: &mut ActorContext<Node>,
    ) -> Result<Behavior<Node>, Error> {
        Ok(Behavior::Same)
    }

    async fn on_signal(
        &mut self,
        signal: Signal,
        _ctx: &mut ActorContext<Node>,
    ) -> Result<(), Error> {
        if signal == Signal::PostStop {
            if let Ok(mut log) = self.log.lock() {
                log.push(self.name.clone());
            }
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_children_stop_before_parent() {
    let (system, _runner) =
        ActorSystem::create("test", CancellationToken::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let root = system
        .create_root_actor(
            "a",
            node(
                "a",
                vec![
                    ("b".to_owned(), vec!["d".to_owned()]),
                    ("c".to_owned(), vec![]),
                ],
                log.clone(),
            ),
        )
        .await
        .unwrap();

    root.ask_stop().await.unwrap();

    let log = log.lock().unwrap().clone();
    let position = |name: &str| log.iter().position(|n| n == name).unwrap();
    assert_eq!(log.len(), 4);
    assert!(position("d") < position("b"));
    assert!(position("b") < position("a"));
    assert!(position("c") < position("a"));
    assert_eq!(log.last().map(String::as_str), Some("a"));
}

// Defines a light switch that swaps its state with Become.
#[derive(Debug)]
pub enum Switch {
    On,
    Off,
}

#[derive(Debug)]
pub enum SwitchCommand {
    Toggle,
    State(ActorRef<SwitchState>),
    ResetOnly,
}

impl Message for SwitchCommand {}

#[derive(Debug, PartialEq)]
pub struct SwitchState(bool);

impl Message for SwitchState {}

#[async_trait]
impl Actor for Switch {
    type Message = SwitchCommand;
}

#[async_trait]
impl Handler<Switch> for Switch {
    async fn handle_message(
        &mut self,
        msg: SwitchCommand,
        _ctx: &mut ActorContext<Switch>,
    ) -> Result<Behavior<Switch>, Error> {
        match (msg, &self) {
            (SwitchCommand::Toggle, Switch::Off) => Ok(Behavior::Become(Switch::On)),
            (SwitchCommand::Toggle, Switch::On) => Ok(Behavior::Become(Switch::Off)),
            (SwitchCommand::State(reply_to), state) => {
                reply_to.tell(SwitchState(matches!(state, Switch::On)));
                Ok(Behavior::Same)
            }
            // Only meaningful when the switch is on.
            (SwitchCommand::ResetOnly, Switch::Off) => Ok(Behavior::Unhandled),
            (SwitchCommand::ResetOnly, Switch::On) => Ok(Behavior::Become(Switch::Off)),
        }
    }
}

#[tokio::test]
async fn test_become_swaps_state_and_unhandled_is_reported() {
    let (system, _runner) =
        ActorSystem::create("test", CancellationToken::new());
    let mut events = system.subscribe();
    let switch = system
        .create_root_actor("switch", Props::new(|| Switch::Off))
        .await
        .unwrap();
    let mut inbox = Inbox::new(&system, "probe");

    switch.tell(SwitchCommand::Toggle);
    switch.tell(SwitchCommand::State(inbox.reference()));
    assert_eq!(inbox.recv_timeout(TIMEOUT).await.unwrap(), SwitchState(true));

    switch.tell(SwitchCommand::Toggle);
    switch.tell(SwitchCommand::ResetOnly);
    switch.tell(SwitchCommand::State(inbox.reference()));
    assert_eq!(inbox.recv_timeout(TIMEOUT).await.unwrap(), SwitchState(false));

    loop {
        let event = events.recv().await.unwrap();
        assert_ne!(event.kind, ActorEventKind::Failed);
        if event.kind == ActorEventKind::Unhandled {
            assert_eq!(event.path, ActorPath::from("/user/switch"));
            break;
        }
    }
}

struct Collect(mpsc::UnboundedSender<ActorEvent>);

#[async_trait]
impl Subscriber<ActorEvent> for Collect {
    async fn notify(&self, event: ActorEvent) {
        let _ = self.0.send(event);
    }
}

#[tokio::test]
async fn test_queued_mail_becomes_dead_letters() {
    let config = SystemConfig {
        log_dead_letters: false,
        ..SystemConfig::default()
    };
    let (system, _runner) =
        ActorSystem::create_with_config("test", config, CancellationToken::new());
    let (sender, mut receiver) = mpsc::unbounded_channel();
    system
        .run_sink(Sink::new(system.subscribe(), Collect(sender)))
        .await;
    let target = system
        .create_root_actor("target", Props::new(|| Target))
        .await
        .unwrap();
    let pong = Inbox::<Pong>::new(&system, "pong");

    target.tell(TargetCommand::Passivate);
    target.tell(TargetCommand::Ping(pong.reference()));
    target.tell(TargetCommand::Ping(pong.reference()));

    let mut dead_letters = 0;
    let mut terminated = false;
    while !terminated || dead_letters < 2 {
        let event = tokio::time::timeout(TIMEOUT, receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.system, "test");
        match event.kind {
            ActorEventKind::DeadLetter => {
                assert!(event.detail.starts_with("Ping"));
                dead_letters += 1;
            }
            ActorEventKind::Terminated => terminated = true,
            _ => {}
        }
    }
    assert!(target.is_closed());
}
