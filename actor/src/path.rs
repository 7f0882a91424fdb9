// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor paths
//!
//! Every actor is identified by the chain of names from the top of the tree down to it, e.g.
//! `/user/manager/group-g1/device-d1`. A path is assigned once when the actor is created and never
//! changes, not even across restarts.
//!

use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::fmt::{Error, Formatter};

/// Hierarchical, immutable identity of an actor.
#[derive(
    Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ActorPath(Vec<String>);

impl ActorPath {
    /// Returns the path of the parent. The parent of a top level path is the empty path.
    pub fn parent(&self) -> Self {
        let mut tokens = self.0.clone();
        tokens.pop();
        ActorPath(tokens)
    }

    /// Last segment of the path (the actor's own name).
    pub fn key(&self) -> String {
        self.0.last().cloned().unwrap_or_default()
    }

    /// Depth of the path.
    pub fn level(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_parent_of(&self, other: &ActorPath) -> bool {
        !other.is_empty() && *self == other.parent()
    }

    pub fn is_child_of(&self, other: &ActorPath) -> bool {
        other.is_parent_of(self)
    }

    /// Checks whether `name` can be used as a single path segment.
    pub fn is_valid_name(name: &str) -> bool {
        !name.trim().is_empty() && !name.contains('/')
    }
}

impl From<&str> for ActorPath {
    fn from(str: &str) -> Self {
        let tokens: Vec<String> = str
            .split('/')
            .filter(|x| !x.trim().is_empty())
            .map(|s| s.to_string())
            .collect();
        ActorPath(tokens)
    }
}

impl From<String> for ActorPath {
    fn from(string: String) -> Self {
        ActorPath::from(string.as_str())
    }
}

impl std::ops::Div<&str> for ActorPath {
    type Output = ActorPath;

    fn div(self, rhs: &str) -> Self::Output {
        let mut keys = self.0;
        keys.extend(
            rhs.split('/')
                .filter(|x| !x.trim().is_empty())
                .map(|s| s.to_string()),
        );
        ActorPath(keys)
    }
}

impl std::fmt::Display for ActorPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self.level().cmp(&1) {
            Ordering::Less => write!(f, "/"),
            _ => write!(f, "/{}", self.0.join("/")),
        }
    }
}

impl std::fmt::Debug for ActorPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        std::fmt::Display::fmt(self, f)
    }
}
