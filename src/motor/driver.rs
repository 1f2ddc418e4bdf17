// Motor driver seam for the clawbot
//
// The core only needs two actuator primitives (run at a signed speed, brake)
// plus an angle read for the protected joint. Whatever drives the motors
// (hub firmware, a zenoh bridge, a test fake) implements `MotorBus`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;

/// Every motor the teleop core can command
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorId {
    LeftDrive,
    RightDrive,
    Claw,
    Wrist,
    Auxiliary,
}

impl ActuatorId {
    /// Motors the robot cannot operate without
    pub const REQUIRED: [ActuatorId; 3] =
        [ActuatorId::LeftDrive, ActuatorId::RightDrive, ActuatorId::Claw];
}

/// Command for one actuator for one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "speed", rename_all = "snake_case")]
pub enum ActuatorCommand {
    RunAt(f32),
    /// Active resistance, as opposed to coasting at zero speed
    Brake,
}

impl ActuatorCommand {
    pub fn is_brake(&self) -> bool {
        matches!(self, ActuatorCommand::Brake)
    }
}

/// Motor driver collaborator
pub trait MotorBus {
    fn set_speed(&mut self, motor: ActuatorId, speed: f32);

    fn brake(&mut self, motor: ActuatorId);

    /// Current angle of a joint in encoder degrees, if the driver knows it
    fn joint_angle(&mut self, motor: ActuatorId) -> Option<f32>;

    /// Whether a motor answered on its port. Only asked once, at startup.
    fn is_present(&mut self, _motor: ActuatorId) -> bool {
        true
    }
}

/// Send one command through the bus
pub fn apply<B: MotorBus + ?Sized>(bus: &mut B, motor: ActuatorId, command: ActuatorCommand) {
    match command {
        ActuatorCommand::RunAt(speed) => bus.set_speed(motor, speed),
        ActuatorCommand::Brake => bus.brake(motor),
    }
}

/// Set of actuators found at startup.
/// Absent optional actuators are skipped every tick instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    present: BTreeSet<ActuatorId>,
}

impl Capabilities {
    pub fn new(present: impl IntoIterator<Item = ActuatorId>) -> Self {
        Self {
            present: present.into_iter().collect(),
        }
    }

    /// Probe the optional actuators enabled in `config`. Required motors are
    /// assumed present; acquiring them is the driver's job.
    pub fn probe<B: MotorBus + ?Sized>(bus: &mut B, config: &Config) -> Self {
        let mut present: BTreeSet<ActuatorId> = ActuatorId::REQUIRED.into_iter().collect();

        let optional = [
            (ActuatorId::Wrist, config.actuators.wrist),
            (ActuatorId::Auxiliary, config.actuators.auxiliary),
        ];
        for (id, enabled) in optional {
            if !enabled {
                debug!("{:?} disabled in config", id);
                continue;
            }
            if bus.is_present(id) {
                present.insert(id);
            } else {
                warn!("{:?} not found, running without it", id);
            }
        }

        info!("Actuators present: {:?}", present);
        Self { present }
    }

    pub fn has(&self, motor: ActuatorId) -> bool {
        self.present.contains(&motor)
    }

    pub fn iter(&self) -> impl Iterator<Item = ActuatorId> + '_ {
        self.present.iter().copied()
    }
}
