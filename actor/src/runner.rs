// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor runner
//!
//! The `ActorRunner` drives one actor for its whole life. It owns the receiving ends of the
//! mailbox and the control channel, the current instance, the watchers and the supervision
//! strategy, and moves the actor through its lifecycle:
//!
//! ```text
//!   Created ──build ok──> Started ──message failed──> Failed
//!      │                   │  ^                          │
//!      │ build failed      │  └──────restart ok──────────┤
//!      v                   v                             │ stop / give up / escalate
//!   Stopped <──stop / Behavior::Stopped──────────────────┘
//!      │
//!      v
//!   Terminated
//! ```
//!
//! Handler failures (errors and panics) are captured here as values and handed to the
//! supervision strategy. They never unwind across tasks.
//!

use crate::{
    ActorPath, Error,
    actor::{Actor, ActorContext, Behavior, Handler, Props, Signal},
    event::ActorEventKind,
    mailbox::{
        MailboxReceiver, SystemMessage, SystemReceiver, Watchers, add_watcher,
    },
    supervision::{RetryStrategy, SupervisionStrategy},
};

use futures::FutureExt;

use tokio::{select, sync::oneshot};
use tracing::{debug, error, info, warn};

use std::{
    any::Any,
    future::Future,
    panic::{AssertUnwindSafe, catch_unwind},
};

/// Lifecycle of an actor.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ActorLifecycle {
    /// Waiting for an instance to be built.
    Created,
    /// Processing messages.
    Started,
    /// A handler failed; supervision decides what comes next.
    Failed,
    /// Shutting down.
    Stopped,
    /// Gone.
    Terminated,
}

/// Why the message loop ended.
enum RunExit {
    Stop,
    Fail(Error),
}

/// Executes an actor.
pub(crate) struct ActorRunner<A: Actor + Handler<A>> {
    path: ActorPath,
    props: Props<A>,
    actor: Option<A>,
    lifecycle: ActorLifecycle,
    supervision: SupervisionStrategy,
    /// Consecutive failures since the last successfully handled message.
    failures: usize,
    /// Failure waiting for the supervision decision.
    error: Option<Error>,
    receiver: MailboxReceiver<A::Message>,
    control_receiver: SystemReceiver,
    watchers: Watchers,
    stop_acks: Vec<oneshot::Sender<()>>,
}

impl<A> ActorRunner<A>
where
    A: Actor + Handler<A>,
{
    pub(crate) fn new(
        path: ActorPath,
        props: Props<A>,
        receiver: MailboxReceiver<A::Message>,
        control_receiver: SystemReceiver,
    ) -> Self {
        debug!("Creating new actor runner for {}.", &path);
        let supervision = props.supervision().clone();
        Self {
            path,
            props,
            actor: None,
            lifecycle: ActorLifecycle::Created,
            supervision,
            failures: 0,
            error: None,
            receiver,
            control_receiver,
            watchers: Watchers::new(),
            stop_acks: Vec::new(),
        }
    }

    /// Main loop of the actor. `started` is answered once the first instance is built (or
    /// failed to build).
    pub(crate) async fn init(
        &mut self,
        mut ctx: ActorContext<A>,
        mut started: Option<oneshot::Sender<Result<(), Error>>>,
    ) {
        debug!("Initializing actor {} runner.", &self.path);

        loop {
            match self.lifecycle {
                // State: CREATED
                ActorLifecycle::Created => {
                    debug!("Actor {} is created.", &self.path);
                    match self.build(&mut ctx).await {
                        Ok(actor) => {
                            self.actor = Some(actor);
                            self.lifecycle = ActorLifecycle::Started;
                            ctx.system().events().publish(
                                &self.path,
                                ActorEventKind::Created,
                                "",
                            );
                            if let Some(sender) = started.take() {
                                sender.send(Ok(())).unwrap_or_else(|_| {
                                    error!("Failed to send start signal!");
                                });
                            }
                        }
                        Err(err) => {
                            error!(
                                "Actor {} failed to start: {}",
                                &self.path, err
                            );
                            ctx.system().events().publish(
                                &self.path,
                                ActorEventKind::Failed,
                                err.to_string(),
                            );
                            if let Some(sender) = started.take() {
                                let _ = sender.send(Err(err));
                            } else {
                                self.escalate(&ctx, err);
                            }
                            self.lifecycle = ActorLifecycle::Stopped;
                        }
                    }
                }
                // State: STARTED
                ActorLifecycle::Started => {
                    debug!("Actor {} is started.", &self.path);
                    match self.run(&mut ctx).await {
                        RunExit::Stop => {
                            self.lifecycle = ActorLifecycle::Stopped;
                        }
                        RunExit::Fail(err) => {
                            self.error = Some(err);
                            self.lifecycle = ActorLifecycle::Failed;
                        }
                    }
                }
                // State: FAILED
                ActorLifecycle::Failed => {
                    debug!("Actor {} is faulty.", &self.path);
                    self.apply_supervision_strategy(&mut ctx).await;
                }
                // State: STOPPED
                ActorLifecycle::Stopped => {
                    debug!("Actor {} is stopped.", &self.path);
                    self.terminate(&mut ctx).await;
                    self.lifecycle = ActorLifecycle::Terminated;
                }
                // State: TERMINATED
                ActorLifecycle::Terminated => {
                    info!("Actor {} is terminated.", &self.path);
                    ctx.system().events().publish(
                        &self.path,
                        ActorEventKind::Terminated,
                        "",
                    );
                    break;
                }
            }
        }
    }

    /// Builds a fresh instance: factory, then `pre_start`.
    async fn build(&mut self, ctx: &mut ActorContext<A>) -> Result<A, Error> {
        let produced = catch_unwind(AssertUnwindSafe(|| self.props.produce()))
            .map_err(|panic| Error::Panic(panic_message(panic)))
            .and_then(|result| result);
        let mut actor = produced
            .map_err(|err| Error::Create(self.path.clone(), err.to_string()))?;
        guarded(actor.pre_start(ctx))
            .await
            .map_err(|err| Error::Create(self.path.clone(), err.to_string()))?;
        Ok(actor)
    }

    /// Message loop. Control traffic always goes before mail.
    async fn run(&mut self, ctx: &mut ActorContext<A>) -> RunExit {
        debug!("Running actor {}.", &self.path);

        loop {
            select! {
                biased;

                control = self.control_receiver.recv() => {
                    match control {
                        Some(SystemMessage::Stop(ack)) => {
                            debug!("Stopping actor {}.", &self.path);
                            if let Some(ack) = ack {
                                self.stop_acks.push(ack);
                            }
                            return RunExit::Stop;
                        }
                        Some(SystemMessage::Watch { path, watcher }) => {
                            debug!("Actor {} is watched by {}.", &self.path, &path);
                            add_watcher(&mut self.watchers, path, watcher);
                        }
                        Some(SystemMessage::Unwatch(watcher)) => {
                            self.watchers.remove(&watcher);
                        }
                        Some(SystemMessage::ChildTerminated { name, uid }) => {
                            if ctx.remove_child(&name, uid) {
                                debug!("Child {} of {} removed.", name, &self.path);
                            }
                        }
                        Some(SystemMessage::ChildFailed { child, uid, error }) => {
                            if child.is_child_of(&self.path)
                                && ctx.is_current_child(&child.key(), uid)
                            {
                                return RunExit::Fail(Error::Escalated(child, error.to_string()));
                            }
                            debug!("Stale failure of {} ignored by {}.", child, &self.path);
                        }
                        // Unreachable while the context holds a sender.
                        None => return RunExit::Stop,
                    }
                }
                msg = self.receiver.recv() => {
                    match msg {
                        Some(msg) => {
                            if let Some(exit) = self.dispatch(msg, ctx).await {
                                return exit;
                            }
                        }
                        None => return RunExit::Stop,
                    }
                }
            }
        }
    }

    /// Hands one message to the current behavior.
    async fn dispatch(
        &mut self,
        msg: A::Message,
        ctx: &mut ActorContext<A>,
    ) -> Option<RunExit> {
        let Some(actor) = self.actor.as_mut() else {
            ctx.system()
                .events()
                .dead_letter(&self.path, format!("{:?}", msg));
            return Some(RunExit::Stop);
        };

        let behavior = match guarded(actor.handle_message(msg, ctx)).await {
            Ok(behavior) => behavior,
            Err(err) => return Some(RunExit::Fail(err)),
        };

        if self.failures > 0 {
            self.failures = 0;
            if let SupervisionStrategy::Restart(strategy) = &mut self.supervision {
                strategy.reset();
            }
        }

        match behavior {
            Behavior::Same => None,
            Behavior::Become(next) => {
                debug!("Actor {} changes its behavior.", &self.path);
                self.actor = Some(next);
                None
            }
            Behavior::Stopped => Some(RunExit::Stop),
            Behavior::Unhandled => {
                debug!("Message unhandled by actor {}.", &self.path);
                ctx.system().events().publish(
                    &self.path,
                    ActorEventKind::Unhandled,
                    "",
                );
                None
            }
        }
    }

    /// Applies the supervision strategy to the pending failure.
    async fn apply_supervision_strategy(&mut self, ctx: &mut ActorContext<A>) {
        let error = self
            .error
            .take()
            .unwrap_or_else(|| Error::Functional("unknown failure".to_owned()));
        error!("Actor {} failed: {}", &self.path, error);
        ctx.system().events().publish(
            &self.path,
            ActorEventKind::Failed,
            error.to_string(),
        );

        let strategy = match &mut self.supervision {
            SupervisionStrategy::Stop => {
                debug!("Stopping actor {} after failure.", &self.path);
                self.lifecycle = ActorLifecycle::Stopped;
                return;
            }
            SupervisionStrategy::Escalate => {
                self.escalate(ctx, error);
                self.lifecycle = ActorLifecycle::Stopped;
                return;
            }
            SupervisionStrategy::Restart(strategy) => strategy,
        };

        debug!("Restarting actor with retry strategy: {:?}", strategy);
        if self.failures >= strategy.max_retries() {
            warn!(
                "Actor {} reached {} restarts, giving up.",
                &self.path, self.failures
            );
            self.lifecycle = ActorLifecycle::Stopped;
            return;
        }
        if let Some(duration) = strategy.next_backoff() {
            debug!("Backoff for {:?}", &duration);
            tokio::time::sleep(duration).await;
        }
        self.failures += 1;

        if let Some(actor) = self.actor.as_mut() {
            if let Err(err) = guarded(actor.on_signal(Signal::PreRestart, ctx)).await {
                error!("Actor {} failed in PreRestart: {}", &self.path, err);
                self.escalate(ctx, err);
                self.lifecycle = ActorLifecycle::Stopped;
                return;
            }
        }
        ctx.stop_children().await;
        self.actor = None;

        match self.build(ctx).await {
            Ok(actor) => {
                info!("Actor {} restarted.", &self.path);
                self.actor = Some(actor);
                ctx.system().events().publish(
                    &self.path,
                    ActorEventKind::Restarted,
                    error.to_string(),
                );
                self.lifecycle = ActorLifecycle::Started;
            }
            Err(err) => {
                error!("Actor {} could not be rebuilt: {}", &self.path, err);
                self.escalate(ctx, err);
                self.lifecycle = ActorLifecycle::Stopped;
            }
        }
    }

    /// Reports a fatal failure to the parent. A top level actor just stops.
    fn escalate(&self, ctx: &ActorContext<A>, error: Error) {
        if ctx.has_parent() {
            warn!("Actor {} escalates: {}", &self.path, error);
            ctx.notify_parent(SystemMessage::ChildFailed {
                child: self.path.clone(),
                uid: ctx.uid(),
                error,
            });
        } else {
            warn!("Top level actor {} can not escalate: {}", &self.path, error);
        }
    }

    /// Children first, then `PostStop`, then the parent releases the name, then queued mail
    /// becomes dead letters, then watchers and stop requesters are answered.
    async fn terminate(&mut self, ctx: &mut ActorContext<A>) {
        ctx.stop_children().await;

        if let Some(actor) = self.actor.as_mut() {
            if let Err(err) = guarded(actor.on_signal(Signal::PostStop, ctx)).await {
                error!("Actor '{}' failed to stop: {}", &self.path, err);
            }
        }
        self.actor = None;

        ctx.notify_parent(SystemMessage::ChildTerminated {
            name: self.path.key(),
            uid: ctx.uid(),
        });

        self.receiver.close();
        while let Ok(msg) = self.receiver.try_recv() {
            ctx.system()
                .events()
                .dead_letter(&self.path, format!("{:?}", msg));
        }

        self.control_receiver.close();
        while let Ok(control) = self.control_receiver.try_recv() {
            match control {
                SystemMessage::Stop(Some(ack)) => self.stop_acks.push(ack),
                SystemMessage::Watch { path, watcher } => {
                    add_watcher(&mut self.watchers, path, watcher);
                }
                SystemMessage::Unwatch(watcher) => {
                    self.watchers.remove(&watcher);
                }
                _ => {}
            }
        }

        for (path, watcher) in self.watchers.drain() {
            debug!("Notifying {} of the termination of {}.", path, &self.path);
            watcher.notify();
        }
        for ack in self.stop_acks.drain(..) {
            let _ = ack.send(());
        }
    }
}

/// Runs a handler future and turns a panic into an error.
async fn guarded<T, F>(future: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(Error::Panic(panic_message(panic))),
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}
