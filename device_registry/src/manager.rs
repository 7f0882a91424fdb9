// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Device manager
//!
//! Entry point of the registry. Spawns one group per group id on demand and routes requests
//! to it.
//!

use crate::{
    group::DeviceGroup,
    protocol::{
        GroupCommand, ListDevices, ManagerCommand, ReplyDeviceList,
        ReplyGroupList, TrackDevice,
    },
};

use actor::{
    Actor, ActorContext, ActorRef, Behavior, Error, Handler, Props, Signal,
};

use async_trait::async_trait;
use tracing::{info, warn};

use std::collections::{HashMap, HashSet};

/// Registry root.
#[derive(Debug, Default)]
pub struct DeviceManager {
    groups: HashMap<String, ActorRef<GroupCommand>>,
}

impl DeviceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn props() -> Props<DeviceManager> {
        Props::new(DeviceManager::new)
    }

    /// Name of the child actor that runs group `group_id`.
    pub fn child_name(group_id: &str) -> String {
        format!("group-{}", group_id)
    }

    async fn track(
        &mut self,
        request: TrackDevice,
        ctx: &mut ActorContext<DeviceManager>,
    ) {
        if let Some(group) = self.groups.get(&request.group_id) {
            group.tell(GroupCommand::TrackDevice(request));
            return;
        }

        info!("Creating device group actor for {}.", request.group_id);
        let group = match ctx
            .create_child(
                &Self::child_name(&request.group_id),
                DeviceGroup::props(&request.group_id),
            )
            .await
        {
            Ok(group) => group,
            Err(e) => {
                warn!(
                    "Device group {} could not be created: {}",
                    request.group_id, e
                );
                return;
            }
        };
        ctx.watch(
            &group,
            ManagerCommand::GroupTerminated {
                group_id: request.group_id.clone(),
                group: group.clone(),
            },
        );
        self.groups.insert(request.group_id.clone(), group.clone());
        group.tell(GroupCommand::TrackDevice(request));
    }

    fn list(&self, request: ListDevices) {
        match self.groups.get(&request.group_id) {
            Some(group) => group.tell(GroupCommand::ListDevices(request)),
            None => request.reply_to.tell(ReplyDeviceList {
                request_id: request.request_id,
                ids: HashSet::new(),
            }),
        }
    }
}

#[async_trait]
impl Actor for DeviceManager {
    type Message = ManagerCommand;

    async fn pre_start(
        &mut self,
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        info!("Device manager started.");
        Ok(())
    }
}

#[async_trait]
impl Handler<DeviceManager> for DeviceManager {
    async fn handle_message(
        &mut self,
        msg: ManagerCommand,
        ctx: &mut ActorContext<DeviceManager>,
    ) -> Result<Behavior<DeviceManager>, Error> {
        match msg {
            ManagerCommand::TrackDevice(request) => {
                self.track(request, ctx).await
            }
            ManagerCommand::ListDevices(request) => self.list(request),
            ManagerCommand::GroupTerminated { group_id, group } => {
                if self.groups.get(&group_id) == Some(&group) {
                    info!(
                        "Device group actor for {} has been terminated.",
                        group_id
                    );
                    self.groups.remove(&group_id);
                }
            }
            ManagerCommand::PassivateGroup { group_id } => {
                if let Some(group) = self.groups.get(&group_id) {
                    group.tell(GroupCommand::Passivate);
                }
            }
            ManagerCommand::ListGroups {
                request_id,
                reply_to,
            } => reply_to.tell(ReplyGroupList {
                request_id,
                ids: self.groups.keys().cloned().collect(),
            }),
        }
        Ok(Behavior::Same)
    }

    async fn on_signal(
        &mut self,
        signal: Signal,
        _ctx: &mut ActorContext<DeviceManager>,
    ) -> Result<(), Error> {
        if signal == Signal::PostStop {
            info!("Device manager stopped.");
        }
        Ok(())
    }
}
