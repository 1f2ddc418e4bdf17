// Chassis orientation from the hub's roll angle
//
// The robot can drive upside down. Past +/-90 degrees of roll it is considered
// flipped and the drive and wrist controls switch to the mirrored frame.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationState {
    #[default]
    Upright,
    Flipped,
}

/// Inertial sensor collaborator
pub trait TiltSensor {
    /// Roll angle in degrees
    fn tilt_roll(&mut self) -> f32;
}

/// Stateless rule: flipped iff `roll < -threshold` or `roll > threshold`
pub fn classify(roll: f32, threshold: f32) -> OrientationState {
    if roll < -threshold || roll > threshold {
        OrientationState::Flipped
    } else {
        OrientationState::Upright
    }
}

/// Holds the last classification.
///
/// With `hysteresis = 0` this is exactly `classify`. A positive band requires
/// the roll to go `hysteresis` past the threshold before switching, in either
/// direction.
#[derive(Debug, Clone)]
pub struct OrientationMonitor {
    threshold: f32,
    hysteresis: f32,
    state: OrientationState,
}

impl OrientationMonitor {
    pub fn new(threshold: f32, hysteresis: f32) -> Self {
        Self {
            threshold,
            hysteresis,
            state: OrientationState::Upright,
        }
    }

    pub fn state(&self) -> OrientationState {
        self.state
    }

    pub fn update(&mut self, roll: f32) -> OrientationState {
        if !roll.is_finite() {
            debug!("Ignoring non-finite roll reading {}", roll);
            return self.state;
        }

        let next = match self.state {
            OrientationState::Upright => classify(roll, self.threshold + self.hysteresis),
            OrientationState::Flipped if roll.abs() <= self.threshold - self.hysteresis => {
                OrientationState::Upright
            }
            OrientationState::Flipped => OrientationState::Flipped,
        };

        if next != self.state {
            info!("Orientation {:?} -> {:?} (roll {:.1})", self.state, next, roll);
            self.state = next;
        }
        next
    }
}
