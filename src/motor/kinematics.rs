// Arcade-drive kinematics for the two-wheel differential base
// Mixes a forward axis and a turn axis into left/right wheel speeds.

use crate::input::{clamp, deadzone};
use crate::orientation::OrientationState;

use super::driver::ActuatorCommand;

/// Hard speed bounds shared by every drive computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedBounds {
    pub min: f32,
    pub max: f32,
}

impl SpeedBounds {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn apply(&self, value: f32) -> f32 {
        clamp(value, self.min, self.max)
    }
}

/// Wheel speeds for one tick, already clamped
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveCommand {
    pub left: f32,
    pub right: f32,
}

impl DriveCommand {
    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Per-side motor commands. A side inside the deadzone of zero brakes
    /// rather than running at zero, so it resists instead of coasting.
    pub fn to_actuators(&self, threshold: f32) -> (ActuatorCommand, ActuatorCommand) {
        (side_command(self.left, threshold), side_command(self.right, threshold))
    }
}

fn side_command(speed: f32, threshold: f32) -> ActuatorCommand {
    if deadzone(speed, threshold) == 0.0 {
        ActuatorCommand::Brake
    } else {
        ActuatorCommand::RunAt(speed)
    }
}

/// Upright arcade mix: `left = forward + turn`, `right = forward - turn`.
///
/// Inputs are clamped before mixing and the sums are clamped again, since two
/// in-range inputs can add up to twice the bound.
pub fn arcade_drive(forward: f32, turn: f32, bounds: SpeedBounds) -> DriveCommand {
    let forward = bounds.apply(forward);
    let turn = bounds.apply(turn);

    DriveCommand {
        left: bounds.apply(forward + turn),
        right: bounds.apply(forward - turn),
    }
}

/// Arcade mix in the control frame matching the chassis orientation.
///
/// Flipped, both sides are negated and swapped (`left = -(f - t)`,
/// `right = -(f + t)`) so the operator's stick still means the same travel
/// direction on the ground.
pub fn frame_drive(
    forward: f32,
    turn: f32,
    orientation: OrientationState,
    bounds: SpeedBounds,
) -> DriveCommand {
    match orientation {
        OrientationState::Upright => arcade_drive(forward, turn, bounds),
        OrientationState::Flipped => {
            let forward = bounds.apply(forward);
            let turn = bounds.apply(turn);
            DriveCommand {
                left: bounds.apply(-(forward - turn)),
                right: bounds.apply(-(forward + turn)),
            }
        }
    }
}
