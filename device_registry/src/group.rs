// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Device group
//!
//! Owns the devices of one group. Devices are spawned on first tracking and watched, so a
//! device that stops (passivated or given up by its supervisor) leaves the group.
//!

use crate::{
    device::Device,
    protocol::{
        DeviceCommand, DeviceRegistered, GroupCommand, ListDevices,
        ReplyDeviceList, TrackDevice,
    },
};

use actor::{
    Actor, ActorContext, ActorRef, Behavior, Error, Handler, Props, Signal,
};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use std::collections::HashMap;

/// Group of devices.
#[derive(Debug)]
pub struct DeviceGroup {
    group_id: String,
    devices: HashMap<String, ActorRef<DeviceCommand>>,
}

impl DeviceGroup {
    pub fn new(group_id: &str) -> Self {
        Self {
            group_id: group_id.to_owned(),
            devices: HashMap::new(),
        }
    }

    pub fn props(group_id: &str) -> Props<DeviceGroup> {
        let group_id = group_id.to_owned();
        Props::new(move || DeviceGroup::new(&group_id))
    }

    /// Name of the child actor that runs device `device_id`.
    pub fn child_name(device_id: &str) -> String {
        format!("device-{}", device_id)
    }

    async fn track(
        &mut self,
        request: TrackDevice,
        ctx: &mut ActorContext<DeviceGroup>,
    ) -> Behavior<DeviceGroup> {
        if request.group_id != self.group_id {
            warn!(
                "Ignoring TrackDevice request for {}. This actor is responsible for {}.",
                request.group_id, self.group_id
            );
            return Behavior::Unhandled;
        }

        if let Some(device) = self.devices.get(&request.device_id) {
            request.reply_to.tell(DeviceRegistered {
                device: device.clone(),
            });
            return Behavior::Same;
        }

        info!("Creating device actor for {}.", request.device_id);
        let device = match ctx
            .create_child(
                &Self::child_name(&request.device_id),
                Device::props(&self.group_id, &request.device_id),
            )
            .await
        {
            Ok(device) => device,
            Err(e) => {
                warn!(
                    "Device {} could not be created: {}",
                    request.device_id, e
                );
                return Behavior::Same;
            }
        };
        ctx.watch(
            &device,
            GroupCommand::DeviceTerminated {
                device_id: request.device_id.clone(),
                device: device.clone(),
            },
        );
        self.devices
            .insert(request.device_id.clone(), device.clone());
        request.reply_to.tell(DeviceRegistered { device });
        Behavior::Same
    }

    fn list(&self, request: ListDevices) -> Behavior<DeviceGroup> {
        if request.group_id != self.group_id {
            warn!(
                "Ignoring ListDevices request for {}. This actor is responsible for {}.",
                request.group_id, self.group_id
            );
            return Behavior::Unhandled;
        }
        request.reply_to.tell(ReplyDeviceList {
            request_id: request.request_id,
            ids: self.devices.keys().cloned().collect(),
        });
        Behavior::Same
    }
}

#[async_trait]
impl Actor for DeviceGroup {
    type Message = GroupCommand;

    async fn pre_start(
        &mut self,
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        debug!("Device group {} started.", self.group_id);
        Ok(())
    }
}

#[async_trait]
impl Handler<DeviceGroup> for DeviceGroup {
    async fn handle_message(
        &mut self,
        msg: GroupCommand,
        ctx: &mut ActorContext<DeviceGroup>,
    ) -> Result<Behavior<DeviceGroup>, Error> {
        let behavior = match msg {
            GroupCommand::TrackDevice(request) => self.track(request, ctx).await,
            GroupCommand::ListDevices(request) => self.list(request),
            GroupCommand::DeviceTerminated { device_id, device } => {
                if self.devices.get(&device_id) == Some(&device) {
                    info!("Device actor for {} has been terminated.", device_id);
                    self.devices.remove(&device_id);
                }
                Behavior::Same
            }
            GroupCommand::Passivate => Behavior::Stopped,
        };
        Ok(behavior)
    }

    async fn on_signal(
        &mut self,
        signal: Signal,
        _ctx: &mut ActorContext<DeviceGroup>,
    ) -> Result<(), Error> {
        if signal == Signal::PostStop {
            info!("Device group {} stopped.", self.group_id);
        }
        Ok(())
    }
}
