// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! IoT actors.
//!
//! Umbrella crate over the actor runtime ([`actor`]) and the device registry built on it
//! ([`device_registry`]).

pub use actor::{
    Actor, ActorContext, ActorEvent, ActorEventKind, ActorPath, ActorRef,
    ActorSystem, Behavior, CustomIntervalStrategy, Error as ActorError, Event,
    ExponentialBackoffStrategy, FixedIntervalStrategy, Handler, Inbox, Message,
    NoIntervalStrategy, Props, RetryStrategy, Signal, Sink, Strategy,
    Subscriber, SupervisionStrategy, SystemConfig, SystemEvent, SystemRef,
    SystemRunner,
};

pub use device_registry::{
    Device, DeviceCommand, DeviceGroup, DeviceManager, DeviceRegistered,
    GroupCommand, ListDevices, ManagerCommand, ReplyDeviceList, ReplyGroupList,
    RespondTemperature, TemperatureRecorded, TrackDevice, start_registry,
};
