// Wire types exchanged with the bridges over zenoh (JSON payloads)
//
// The gamepad bridge publishes `ControllerSnapshot` (see input.rs) as-is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::motor::{ActuatorCommand, ActuatorId};
use crate::orientation::OrientationState;

// IMU bridge -> runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TiltReading {
    pub roll_deg: f32,
}

// Motor bridge -> runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JointReading {
    pub joint: ActuatorId,
    pub angle: f32,
}

// Runtime -> motor bridge, once per tick
// Only actuators present at startup appear in `motors`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActuationFrame {
    pub orientation: OrientationState,
    pub motors: BTreeMap<ActuatorId, ActuatorCommand>,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    InputStale,
}
