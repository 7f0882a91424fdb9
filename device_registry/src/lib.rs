// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Device registry
//!
//! A three level supervision tree that tracks temperature sensors:
//!
//! ```text
//! /user/<system>                DeviceManager
//!     group-<group_id>          DeviceGroup
//!         device-<device_id>    Device
//! ```
//!
//! The manager creates groups on demand and the groups create devices on demand. Both watch
//! their children, so a group or device that stops for any reason is forgotten. A device that
//! fails is restarted by the runtime and comes back with no reading.
//!

mod device;
mod group;
mod manager;
mod protocol;

pub use device::Device;
pub use group::DeviceGroup;
pub use manager::DeviceManager;
pub use protocol::{
    DeviceCommand, DeviceRegistered, GroupCommand, ListDevices, ManagerCommand,
    ReplyDeviceList, ReplyGroupList, RespondTemperature, TemperatureRecorded,
    TrackDevice,
};

use actor::{ActorRef, ActorSystem, Error, SystemRef, SystemRunner};

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Starts an actor system whose root actor is a [`DeviceManager`].
///
/// # Errors
///
/// Returns [`Error::Create`] when the manager can not be built.
pub async fn start_registry(
    name: &str,
    token: CancellationToken,
) -> Result<(SystemRef, SystemRunner, ActorRef<ManagerCommand>), Error> {
    let (system, runner, manager) =
        ActorSystem::create_with_root(name, DeviceManager::props(), token)
            .await?;
    info!("Device registry {} started.", name);
    Ok((system, runner, manager))
}
