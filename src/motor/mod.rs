// Motor side of the clawbot
//
// Provides:
// - Actuator identifiers, commands and the motor driver seam
// - Arcade-drive kinematics for the differential base
// - Soft travel limits for the wrist

mod driver;
pub mod kinematics;
pub mod soft_limit;

pub use driver::{apply, ActuatorCommand, ActuatorId, Capabilities, MotorBus};
pub use kinematics::{arcade_drive, frame_drive, DriveCommand, SpeedBounds};
pub use soft_limit::{JointLimits, SoftLimitController, WristRequest};
