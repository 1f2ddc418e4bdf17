// Teleop control core for a differential-drive clawbot
//
// Gamepad in, motor commands out: deadzone and clamp shaping, arcade drive,
// upside-down frame inversion and a soft-limited wrist with haptic feedback.

pub mod config;
pub mod control;
pub mod dispatch;
pub mod input;
pub mod messages;
pub mod motor;
pub mod orientation;
pub mod runtime;
