// Operator input: gamepad snapshots, deadzone/clamp shaping and logical actions
//
// Raw device buttons are resolved to `Action`s exactly once, here. Everything
// downstream works with actions and never sees controller-specific naming.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Zero out readings whose magnitude is below `threshold`.
///
/// The boundary is inclusive: `|value| >= threshold` passes through unchanged.
/// NaN readings map to zero.
pub fn deadzone(value: f32, threshold: f32) -> f32 {
    if value.abs() >= threshold { value } else { 0.0 }
}

/// Bound `value` to `[min, max]`. Never panics, unlike `f32::clamp`.
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    if value > max {
        max
    } else if value < min {
        min
    } else if value.is_nan() {
        // NaN compares false against both bounds
        0.0f32.max(min).min(max)
    } else {
        value
    }
}

/// One analog stick, in raw device units (percent of full deflection)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stick {
    pub x: f32,
    pub y: f32,
}

impl Stick {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Raw gamepad buttons as decoded by the controller bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    A,
    B,
    X,
    Y,
    Lb,
    Rb,
    Up,
    Down,
    Left,
    Right,
    View,
    Menu,
    Guide,
    LeftStick,
    RightStick,
}

/// Immutable per-tick read of the whole controller.
/// `Default` is the neutral snapshot: sticks centered, triggers released, no buttons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSnapshot {
    pub left_stick: Stick,
    pub right_stick: Stick,
    pub left_trigger: f32,
    pub right_trigger: f32,
    pub buttons: BTreeSet<Button>,
}

impl ControllerSnapshot {
    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons.contains(&button)
    }
}

/// Rumble request sent back to the operator's controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HapticPulse {
    pub intensity: u8, // percent
    pub duration_ms: u32,
    pub count: u32,
    pub interval_ms: u32,
}

impl HapticPulse {
    pub const fn new(intensity: u8, duration_ms: u32, count: u32, interval_ms: u32) -> Self {
        Self {
            intensity,
            duration_ms,
            count,
            interval_ms,
        }
    }
}

/// Gamepad collaborator: snapshot source and haptic sink
pub trait Gamepad {
    /// Read the current controller state. May block until a sample is available.
    fn read_snapshot(&mut self) -> ControllerSnapshot;

    /// Fire-and-forget rumble
    fn emit_haptic(&mut self, pulse: HapticPulse);
}

/// Logical operator actions, independent of the physical controller layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ExtendWrist,
    RetractWrist,
    RaiseCeiling,
    LowerFloor,
    ResetLimits,
    ReportWrist,
    AuxForward,
    AuxReverse,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::ExtendWrist,
        Action::RetractWrist,
        Action::RaiseCeiling,
        Action::LowerFloor,
        Action::ResetLimits,
        Action::ReportWrist,
        Action::AuxForward,
        Action::AuxReverse,
    ];

    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Counterpart when the chassis is upside down. Only the wrist pairs mirror.
    pub fn mirrored(self) -> Self {
        match self {
            Action::ExtendWrist => Action::RetractWrist,
            Action::RetractWrist => Action::ExtendWrist,
            Action::RaiseCeiling => Action::LowerFloor,
            Action::LowerFloor => Action::RaiseCeiling,
            other => other,
        }
    }
}

/// Small bitset of `Action`s active in one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionSet(u16);

impl ActionSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, action: Action) {
        self.0 |= action.bit();
    }

    pub fn contains(&self, action: Action) -> bool {
        self.0 & action.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn union(&self, other: ActionSet) -> ActionSet {
        Self(self.0 | other.0)
    }

    /// Actions present in `self` but not in `previous` (rising edges)
    pub fn pressed_since(&self, previous: ActionSet) -> ActionSet {
        Self(self.0 & !previous.0)
    }

    pub fn mirrored(&self) -> ActionSet {
        let mut out = ActionSet::empty();
        for action in self.iter() {
            out.insert(action.mirrored());
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        Action::ALL.into_iter().filter(|a| self.contains(*a))
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut set = ActionSet::empty();
        for action in iter {
            set.insert(action);
        }
        set
    }
}

/// Which raw button triggers each logical action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonMap {
    pub extend_wrist: Button,
    pub retract_wrist: Button,
    pub raise_ceiling: Button,
    pub lower_floor: Button,
    pub reset_limits: Button,
    pub report_wrist: Button,
    pub aux_forward: Button,
    pub aux_reverse: Button,
}

impl Default for ButtonMap {
    fn default() -> Self {
        Self {
            extend_wrist: Button::Lb,
            retract_wrist: Button::Rb,
            raise_ceiling: Button::Up,
            lower_floor: Button::Down,
            reset_limits: Button::Y,
            report_wrist: Button::A,
            aux_forward: Button::X,
            aux_reverse: Button::B,
        }
    }
}

impl ButtonMap {
    pub fn button_for(&self, action: Action) -> Button {
        match action {
            Action::ExtendWrist => self.extend_wrist,
            Action::RetractWrist => self.retract_wrist,
            Action::RaiseCeiling => self.raise_ceiling,
            Action::LowerFloor => self.lower_floor,
            Action::ResetLimits => self.reset_limits,
            Action::ReportWrist => self.report_wrist,
            Action::AuxForward => self.aux_forward,
            Action::AuxReverse => self.aux_reverse,
        }
    }

    /// First button that drives both the wrist and the auxiliary joint, if any
    pub fn shared_joint_button(&self) -> Option<Button> {
        let wrist = [
            self.extend_wrist,
            self.retract_wrist,
            self.raise_ceiling,
            self.lower_floor,
            self.reset_limits,
            self.report_wrist,
        ];
        [self.aux_forward, self.aux_reverse]
            .into_iter()
            .find(|b| wrist.contains(b))
    }

    /// Resolve the pressed buttons of a snapshot into logical actions
    pub fn resolve(&self, snapshot: &ControllerSnapshot) -> ActionSet {
        Action::ALL
            .into_iter()
            .filter(|a| snapshot.is_pressed(self.button_for(*a)))
            .collect()
    }
}

/// Snapshot after deadzone, scaling and clamping
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NormalizedInput {
    pub forward: f32,
    pub turn: f32,
    pub close: f32, // left trigger
    pub open: f32,  // right trigger
    pub actions: ActionSet,
}

/// Shape a raw snapshot: forward from the left stick Y axis, turn from the right stick X axis
pub fn normalize(snapshot: &ControllerSnapshot, config: &Config) -> NormalizedInput {
    let shape = |raw: f32, scale: f32| {
        clamp(
            deadzone(raw, config.deadzone) * scale,
            config.speed_min,
            config.speed_max,
        )
    };

    NormalizedInput {
        forward: shape(snapshot.left_stick.y, config.drive_scale),
        turn: shape(snapshot.right_stick.x, config.drive_scale),
        close: deadzone(snapshot.left_trigger, config.deadzone),
        open: deadzone(snapshot.right_trigger, config.deadzone),
        actions: config.buttons.resolve(snapshot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadzone_threshold() {
        assert_eq!(deadzone(0.005, 0.01), 0.0);
        assert_eq!(deadzone(-0.005, 0.01), 0.0);
        assert_eq!(deadzone(0.02, 0.01), 0.02);
        assert_eq!(deadzone(-0.02, 0.01), -0.02);
    }

    #[test]
    fn test_deadzone_boundary_is_inclusive() {
        assert_eq!(deadzone(0.25, 0.25), 0.25);
        assert_eq!(deadzone(-0.25, 0.25), -0.25);
    }

    #[test]
    fn test_deadzone_nan_is_zero() {
        assert_eq!(deadzone(f32::NAN, 0.01), 0.0);
    }

    #[test]
    fn test_clamp_bounds() {
        assert_eq!(clamp(1500.0, -500.0, 500.0), 500.0);
        assert_eq!(clamp(-1500.0, -500.0, 500.0), -500.0);
        assert_eq!(clamp(42.0, -500.0, 500.0), 42.0);
    }

    #[test]
    fn test_clamp_idempotent() {
        for v in [-1e9, -501.0, -3.5, 0.0, 7.25, 499.9, 1e9] {
            let once = clamp(v, -500.0, 500.0);
            assert_eq!(clamp(once, -500.0, 500.0), once);
            assert!((-500.0..=500.0).contains(&once));
        }
    }

    #[test]
    fn test_clamp_nan_stays_in_range() {
        assert_eq!(clamp(f32::NAN, -1.0, 1.0), 0.0);
        assert_eq!(clamp(f32::NAN, 2.0, 3.0), 2.0);
    }

    #[test]
    fn test_rising_edges() {
        let previous: ActionSet = [Action::RaiseCeiling].into_iter().collect();
        let current: ActionSet = [Action::RaiseCeiling, Action::ResetLimits]
            .into_iter()
            .collect();

        let edges = current.pressed_since(previous);
        assert!(!edges.contains(Action::RaiseCeiling));
        assert!(edges.contains(Action::ResetLimits));
    }

    #[test]
    fn test_mirroring_only_touches_wrist_pairs() {
        let set: ActionSet = [Action::ExtendWrist, Action::LowerFloor, Action::AuxForward]
            .into_iter()
            .collect();
        let mirrored = set.mirrored();

        assert!(mirrored.contains(Action::RetractWrist));
        assert!(mirrored.contains(Action::RaiseCeiling));
        assert!(mirrored.contains(Action::AuxForward));
        assert!(!mirrored.contains(Action::ExtendWrist));
        assert!(!mirrored.contains(Action::LowerFloor));
    }

    #[test]
    fn test_default_map_keeps_joints_apart() {
        let map = ButtonMap::default();
        assert_eq!(map.shared_joint_button(), None);

        let mut snapshot = ControllerSnapshot::default();
        snapshot.buttons.insert(Button::Lb);
        let actions = map.resolve(&snapshot);
        assert!(actions.contains(Action::ExtendWrist));
        assert!(!actions.contains(Action::AuxForward));
        assert!(!actions.contains(Action::RetractWrist));
    }

    #[test]
    fn test_shared_button_drives_both_joints() {
        let map = ButtonMap {
            aux_forward: Button::Lb,
            ..ButtonMap::default()
        };
        assert_eq!(map.shared_joint_button(), Some(Button::Lb));

        let mut snapshot = ControllerSnapshot::default();
        snapshot.buttons.insert(Button::Lb);
        let actions = map.resolve(&snapshot);
        assert!(actions.contains(Action::ExtendWrist));
        assert!(actions.contains(Action::AuxForward));
    }

    #[test]
    fn test_normalize_applies_deadzone_scale_and_clamp() {
        let config = Config {
            drive_scale: 2.0,
            ..Config::default()
        };
        let snapshot = ControllerSnapshot {
            left_stick: Stick::new(0.0, 80.0),
            right_stick: Stick::new(0.005, 0.0),
            left_trigger: 30.0,
            ..ControllerSnapshot::default()
        };

        let input = normalize(&snapshot, &config);
        assert_eq!(input.forward, 100.0); // 160 clamped
        assert_eq!(input.turn, 0.0);
        assert_eq!(input.close, 30.0);
        assert_eq!(input.open, 0.0);
        assert!(input.actions.is_empty());
    }

    #[test]
    fn test_snapshot_json_defaults() {
        let snapshot: ControllerSnapshot =
            serde_json::from_str(r#"{"left_stick":{"x":0.0,"y":50.0},"buttons":["lb","up"]}"#)
                .unwrap();
        assert_eq!(snapshot.left_stick.y, 50.0);
        assert_eq!(snapshot.right_trigger, 0.0);
        assert!(snapshot.is_pressed(Button::Lb));
        assert!(snapshot.is_pressed(Button::Up));
    }
}
