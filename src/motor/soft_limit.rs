// Soft travel limits for the wrist joint
//
// Limits are software bounds in encoder degrees, distinct from the hardware
// end-stops, and can be moved by the operator at runtime. They are lost on
// restart.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::driver::ActuatorCommand;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub lower: f32,
    pub upper: f32,
}

impl JointLimits {
    pub const fn new(lower: f32, upper: f32) -> Self {
        Self { lower, upper }
    }

    pub fn is_ordered(&self) -> bool {
        self.lower <= self.upper
    }
}

/// Direction the operator asks the wrist to move this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WristRequest {
    Extend,
    Retract,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitDecision {
    pub command: ActuatorCommand,
    /// A motion request hit a limit. Expected at the travel extremes.
    pub refused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recalibration {
    /// Current angle becomes the upper limit
    RaiseCeiling,
    /// Current angle becomes the lower limit
    LowerFloor,
    /// Back to the configured defaults
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecalibrationOutcome {
    Applied(JointLimits),
    /// Would have inverted the limits. Nothing changed.
    Rejected {
        current: JointLimits,
        requested: JointLimits,
    },
}

#[derive(Debug, Clone)]
pub struct SoftLimitController {
    limits: JointLimits,
    defaults: JointLimits,
    speed: f32,
}

impl SoftLimitController {
    pub fn new(defaults: JointLimits, speed: f32) -> Self {
        Self {
            limits: defaults,
            defaults,
            speed,
        }
    }

    pub fn limits(&self) -> JointLimits {
        self.limits
    }

    /// Gate a motion request against the limits at angle `angle`
    pub fn gate(&self, angle: f32, request: WristRequest) -> LimitDecision {
        let allowed = |command| LimitDecision {
            command,
            refused: false,
        };
        let refused = LimitDecision {
            command: ActuatorCommand::Brake,
            refused: true,
        };

        match request {
            WristRequest::Extend if angle < self.limits.upper => {
                allowed(ActuatorCommand::RunAt(self.speed))
            }
            WristRequest::Retract if angle > self.limits.lower => {
                allowed(ActuatorCommand::RunAt(-self.speed))
            }
            WristRequest::Extend | WristRequest::Retract => refused,
            WristRequest::None => allowed(ActuatorCommand::Brake),
        }
    }

    pub fn recalibrate(&mut self, action: Recalibration, angle: f32) -> RecalibrationOutcome {
        let requested = match action {
            Recalibration::RaiseCeiling => JointLimits::new(self.limits.lower, angle),
            Recalibration::LowerFloor => JointLimits::new(angle, self.limits.upper),
            Recalibration::Reset => self.defaults,
        };

        if !requested.is_ordered() {
            warn!(
                "Rejected {:?} at {}: would set limits to [{}, {}]",
                action, angle, requested.lower, requested.upper
            );
            return RecalibrationOutcome::Rejected {
                current: self.limits,
                requested,
            };
        }

        info!(
            "Wrist limits {:?}: [{}, {}] -> [{}, {}]",
            action, self.limits.lower, self.limits.upper, requested.lower, requested.upper
        );
        self.limits = requested;
        RecalibrationOutcome::Applied(requested)
    }
}
