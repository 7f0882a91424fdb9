// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!

use crate::ActorPath;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for the actor system.
///
/// Failures raised by message handlers are handed to the supervisor as values of this type.
/// Nothing in the runtime reports them back to the senders of messages.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// An error occurred while sending a message to an actor.
    #[error("An error occurred while sending a message to actor: {0}.")]
    Send(String),
    /// No message arrived in the given time (milliseconds).
    #[error("Timed out after {0} ms waiting for a message.")]
    Timeout(u64),
    /// A live sibling already uses the requested name.
    #[error("Actor {0} already exists.")]
    NameConflict(ActorPath),
    /// The name can not be used as a path segment.
    #[error("Invalid actor name '{0}'.")]
    InvalidName(String),
    /// The factory or the `pre_start` hook failed while building an instance.
    #[error("Actor {0} could not be created: {1}.")]
    Create(ActorPath, String),
    /// A handler panicked.
    #[error("Actor panicked: {0}.")]
    Panic(String),
    /// A child gave up and escalated its failure to the parent.
    #[error("Child {0} escalated a failure: {1}.")]
    Escalated(ActorPath, String),
    /// An error occurred while stopping an actor.
    #[error("An error occurred while stopping an actor.")]
    Stop,
    /// Error that does not compromise the operation of the system.
    #[error("Error: {0}")]
    Functional(String),
}
