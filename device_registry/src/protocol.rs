// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Registry protocol
//!
//! One closed command enum per role plus the request and reply types shared between them.
//! Every request carries the handle the reply must be sent to, and every reply echoes the
//! caller's `request_id`.
//!

use actor::{ActorRef, Message};

use std::collections::HashSet;

/// Asks for the device `device_id` of group `group_id`, creating it if needed.
#[derive(Debug)]
pub struct TrackDevice {
    pub group_id: String,
    pub device_id: String,
    pub reply_to: ActorRef<DeviceRegistered>,
}

/// Reply to [`TrackDevice`].
#[derive(Debug, PartialEq)]
pub struct DeviceRegistered {
    pub device: ActorRef<DeviceCommand>,
}

impl Message for DeviceRegistered {}

/// Asks for the ids of the devices tracked by group `group_id`.
#[derive(Debug)]
pub struct ListDevices {
    pub request_id: u64,
    pub group_id: String,
    pub reply_to: ActorRef<ReplyDeviceList>,
}

/// Reply to [`ListDevices`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyDeviceList {
    pub request_id: u64,
    pub ids: HashSet<String>,
}

impl Message for ReplyDeviceList {}

/// Reply to [`ManagerCommand::ListGroups`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyGroupList {
    pub request_id: u64,
    pub ids: HashSet<String>,
}

impl Message for ReplyGroupList {}

/// Protocol of the [`DeviceManager`](crate::DeviceManager).
#[derive(Debug)]
pub enum ManagerCommand {
    TrackDevice(TrackDevice),
    ListDevices(ListDevices),
    /// Termination notice of a group.
    GroupTerminated {
        group_id: String,
        group: ActorRef<GroupCommand>,
    },
    /// Stops a group and all its devices.
    PassivateGroup { group_id: String },
    ListGroups {
        request_id: u64,
        reply_to: ActorRef<ReplyGroupList>,
    },
}

impl Message for ManagerCommand {}

/// Protocol of a [`DeviceGroup`](crate::DeviceGroup).
#[derive(Debug)]
pub enum GroupCommand {
    TrackDevice(TrackDevice),
    ListDevices(ListDevices),
    /// Termination notice of a device.
    DeviceTerminated {
        device_id: String,
        device: ActorRef<DeviceCommand>,
    },
    Passivate,
}

impl Message for GroupCommand {}

/// Acknowledges a temperature write.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureRecorded {
    pub request_id: u64,
}

impl Message for TemperatureRecorded {}

/// Reply to [`DeviceCommand::ReadTemperature`]. `None` until a reading is recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct RespondTemperature {
    pub request_id: u64,
    pub value: Option<f64>,
}

impl Message for RespondTemperature {}

/// Protocol of a [`Device`](crate::Device).
#[derive(Debug)]
pub enum DeviceCommand {
    RecordTemperature {
        request_id: u64,
        value: f64,
        reply_to: ActorRef<TemperatureRecorded>,
    },
    ReadTemperature {
        request_id: u64,
        reply_to: ActorRef<RespondTemperature>,
    },
    /// Raw sensor payload, parsed into a reading. A malformed payload is a failure.
    RecordRawReading {
        request_id: u64,
        payload: String,
        reply_to: ActorRef<TemperatureRecorded>,
    },
    Passivate,
}

impl Message for DeviceCommand {}
