// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Device
//!
//! Leaf of the registry: holds the last temperature reported by one sensor.
//!

use crate::protocol::{DeviceCommand, RespondTemperature, TemperatureRecorded};

use actor::{
    Actor, ActorContext, Behavior, Error, Handler, Props, Signal,
};

use async_trait::async_trait;
use tracing::debug;

/// A sensor. Restarts come back with no reading.
#[derive(Debug)]
pub struct Device {
    group_id: String,
    device_id: String,
    last_temperature: Option<f64>,
}

impl Device {
    pub fn new(group_id: &str, device_id: &str) -> Self {
        Self {
            group_id: group_id.to_owned(),
            device_id: device_id.to_owned(),
            last_temperature: None,
        }
    }

    pub fn props(group_id: &str, device_id: &str) -> Props<Device> {
        let group_id = group_id.to_owned();
        let device_id = device_id.to_owned();
        Props::new(move || Device::new(&group_id, &device_id))
    }

    fn record(&mut self, request_id: u64, value: f64) {
        debug!(
            "Device {}-{} recorded temperature {} with {}.",
            self.group_id, self.device_id, value, request_id
        );
        self.last_temperature = Some(value);
    }
}

#[async_trait]
impl Actor for Device {
    type Message = DeviceCommand;

    async fn pre_start(
        &mut self,
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        debug!("Device actor {}-{} started.", self.group_id, self.device_id);
        Ok(())
    }
}

#[async_trait]
impl Handler<Device> for Device {
    async fn handle_message(
        &mut self,
        msg: DeviceCommand,
        _ctx: &mut ActorContext<Device>,
    ) -> Result<Behavior<Device>, Error> {
        match msg {
            DeviceCommand::RecordTemperature {
                request_id,
                value,
                reply_to,
            } => {
                self.record(request_id, value);
                reply_to.tell(TemperatureRecorded { request_id });
            }
            DeviceCommand::ReadTemperature {
                request_id,
                reply_to,
            } => {
                reply_to.tell(RespondTemperature {
                    request_id,
                    value: self.last_temperature,
                });
            }
            DeviceCommand::RecordRawReading {
                request_id,
                payload,
                reply_to,
            } => {
                let value = payload.trim().parse::<f64>().map_err(|e| {
                    Error::Functional(format!(
                        "malformed reading '{}': {}",
                        payload, e
                    ))
                })?;
                self.record(request_id, value);
                reply_to.tell(TemperatureRecorded { request_id });
            }
            DeviceCommand::Passivate => return Ok(Behavior::Stopped),
        }
        Ok(Behavior::Same)
    }

    async fn on_signal(
        &mut self,
        signal: Signal,
        _ctx: &mut ActorContext<Device>,
    ) -> Result<(), Error> {
        match signal {
            Signal::PreRestart => debug!(
                "Device actor {}-{} restarting.",
                self.group_id, self.device_id
            ),
            Signal::PostStop => debug!(
                "Device actor {}-{} stopped.",
                self.group_id, self.device_id
            ),
        }
        Ok(())
    }
}
