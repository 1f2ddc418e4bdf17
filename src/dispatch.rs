// Turns one tick of normalized input into a command for every present actuator
//
// Drive sides, claw, wrist (through its soft limits) and the auxiliary joint.
// Optional actuators missing from the capability set are skipped.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{Config, StopPolicy};
use crate::control::ControlState;
use crate::input::{Action, ActionSet, HapticPulse, NormalizedInput};
use crate::motor::soft_limit::{Recalibration, RecalibrationOutcome};
use crate::motor::{
    ActuatorCommand, ActuatorId, Capabilities, DriveCommand, JointLimits, SpeedBounds,
    WristRequest,
};
use crate::orientation::OrientationState;

/// Everything the motors should do this tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActuatorCommands {
    pub left_drive: ActuatorCommand,
    pub right_drive: ActuatorCommand,
    pub claw: ActuatorCommand,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrist: Option<ActuatorCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auxiliary: Option<ActuatorCommand>,
}

impl ActuatorCommands {
    /// Brake on every actuator in `capabilities`
    pub fn all_brake(capabilities: &Capabilities) -> Self {
        let optional = |id| capabilities.has(id).then_some(ActuatorCommand::Brake);
        Self {
            left_drive: ActuatorCommand::Brake,
            right_drive: ActuatorCommand::Brake,
            claw: ActuatorCommand::Brake,
            wrist: optional(ActuatorId::Wrist),
            auxiliary: optional(ActuatorId::Auxiliary),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActuatorId, ActuatorCommand)> {
        [
            (ActuatorId::LeftDrive, Some(self.left_drive)),
            (ActuatorId::RightDrive, Some(self.right_drive)),
            (ActuatorId::Claw, Some(self.claw)),
            (ActuatorId::Wrist, self.wrist),
            (ActuatorId::Auxiliary, self.auxiliary),
        ]
        .into_iter()
        .filter_map(|(id, cmd)| cmd.map(|c| (id, c)))
    }

    pub fn get(&self, motor: ActuatorId) -> Option<ActuatorCommand> {
        self.iter().find(|(id, _)| *id == motor).map(|(_, c)| c)
    }

    pub fn is_all_brake(&self) -> bool {
        self.iter().all(|(_, c)| c.is_brake())
    }
}

/// Wrist angle and limits, reported on operator request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WristReport {
    pub angle: f32,
    pub limits: JointLimits,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub commands: ActuatorCommands,
    pub haptic: Option<HapticPulse>,
    pub report: Option<WristReport>,
}

pub struct ActuatorDispatcher {
    bounds: SpeedBounds,
    deadzone: f32,
    claw_scale: f32,
    aux_speed: f32,
    aux_stop: StopPolicy,
    mirror_wrist_when_flipped: bool,
    limit_alert: HapticPulse,
    limit_alert_on_onset_only: bool,
    capabilities: Capabilities,
}

impl ActuatorDispatcher {
    pub fn new(config: &Config, capabilities: Capabilities) -> Self {
        Self {
            bounds: SpeedBounds::new(config.speed_min, config.speed_max),
            deadzone: config.deadzone,
            claw_scale: config.claw_scale,
            aux_speed: config.aux_speed,
            aux_stop: config.aux_stop,
            mirror_wrist_when_flipped: config.mirror_wrist_when_flipped,
            limit_alert: config.limit_alert,
            limit_alert_on_onset_only: config.limit_alert_on_onset_only,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Held actions and rising edges as seen in the current control frame
    pub fn frame_actions(
        &self,
        held: ActionSet,
        pressed: ActionSet,
        orientation: OrientationState,
    ) -> (ActionSet, ActionSet) {
        if orientation == OrientationState::Flipped && self.mirror_wrist_when_flipped {
            (held.mirrored(), pressed.mirrored())
        } else {
            (held, pressed)
        }
    }

    /// Build this tick's commands.
    ///
    /// `pressed` holds only the actions whose button went down this tick, so
    /// recalibration and reports fire once per press. Presses that arrive while
    /// the wrist angle is unknown are held back until the next known angle.
    pub fn dispatch(
        &self,
        drive: DriveCommand,
        input: &NormalizedInput,
        pressed: ActionSet,
        wrist_angle: Option<f32>,
        state: &mut ControlState,
    ) -> DispatchOutcome {
        let orientation = state.orientation.state();
        let (held, pressed) = self.frame_actions(input.actions, pressed, orientation);

        let (left_drive, right_drive) = drive.to_actuators(self.deadzone);
        let mut haptic = None;
        let mut report = None;

        let wrist = if self.capabilities.has(ActuatorId::Wrist) {
            Some(self.wrist_command(
                held,
                pressed,
                wrist_angle,
                state,
                &mut haptic,
                &mut report,
            ))
        } else {
            None
        };

        let auxiliary = self
            .capabilities
            .has(ActuatorId::Auxiliary)
            .then(|| self.auxiliary_command(held));

        DispatchOutcome {
            commands: ActuatorCommands {
                left_drive,
                right_drive,
                claw: self.claw_command(input),
                wrist,
                auxiliary,
            },
            haptic,
            report,
        }
    }

    /// Left trigger closes (negative), right trigger opens. Left wins when both are pulled.
    fn claw_command(&self, input: &NormalizedInput) -> ActuatorCommand {
        let speed = |trigger: f32| self.bounds.apply(trigger * self.claw_scale);

        if input.close != 0.0 {
            ActuatorCommand::RunAt(-speed(input.close))
        } else if input.open != 0.0 {
            ActuatorCommand::RunAt(speed(input.open))
        } else {
            ActuatorCommand::Brake
        }
    }

    fn auxiliary_command(&self, held: ActionSet) -> ActuatorCommand {
        if held.contains(Action::AuxForward) {
            ActuatorCommand::RunAt(self.aux_speed)
        } else if held.contains(Action::AuxReverse) {
            ActuatorCommand::RunAt(-self.aux_speed)
        } else {
            match self.aux_stop {
                StopPolicy::Brake => ActuatorCommand::Brake,
                StopPolicy::Coast => ActuatorCommand::RunAt(0.0),
            }
        }
    }

    fn wrist_command(
        &self,
        held: ActionSet,
        pressed: ActionSet,
        angle: Option<f32>,
        state: &mut ControlState,
        haptic: &mut Option<HapticPulse>,
        report: &mut Option<WristReport>,
    ) -> ActuatorCommand {
        let Some(angle) = angle else {
            debug!("No wrist angle this tick, holding wrist");
            state.wrist_refused = false;
            state.pending_wrist = state.pending_wrist.union(pressed);
            return ActuatorCommand::Brake;
        };
        let pressed = pressed.union(std::mem::take(&mut state.pending_wrist));

        let recalibrations = [
            (Action::RaiseCeiling, Recalibration::RaiseCeiling),
            (Action::LowerFloor, Recalibration::LowerFloor),
            (Action::ResetLimits, Recalibration::Reset),
        ];
        for (action, recalibration) in recalibrations {
            if !pressed.contains(action) {
                continue;
            }
            if let RecalibrationOutcome::Rejected { .. } =
                state.wrist.recalibrate(recalibration, angle)
            {
                *haptic = Some(self.limit_alert);
            }
        }

        if pressed.contains(Action::ReportWrist) {
            let limits = state.wrist.limits();
            info!(
                "Wrist angle: {}, high limit: {}, low limit: {}",
                angle, limits.upper, limits.lower
            );
            *report = Some(WristReport { angle, limits });
        }

        let request = if held.contains(Action::RetractWrist) {
            WristRequest::Retract
        } else if held.contains(Action::ExtendWrist) {
            WristRequest::Extend
        } else {
            WristRequest::None
        };

        let decision = state.wrist.gate(angle, request);
        let suppress = state.wrist_refused && self.limit_alert_on_onset_only;
        if decision.refused && !suppress {
            debug!("Wrist {:?} refused at {}", request, angle);
            *haptic = Some(self.limit_alert);
        }
        state.wrist_refused = decision.refused;
        decision.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(optional: &[ActuatorId]) -> Capabilities {
        Capabilities::new(ActuatorId::REQUIRED.into_iter().chain(optional.iter().copied()))
    }

    fn run(
        dispatcher: &ActuatorDispatcher,
        input: &NormalizedInput,
        pressed: ActionSet,
        wrist_angle: Option<f32>,
        state: &mut ControlState,
    ) -> DispatchOutcome {
        dispatcher.dispatch(DriveCommand::default(), input, pressed, wrist_angle, state)
    }

    fn held(actions: &[Action]) -> NormalizedInput {
        NormalizedInput {
            actions: actions.iter().copied().collect(),
            ..NormalizedInput::default()
        }
    }

    #[test]
    fn test_claw_triggers() {
        let config = Config {
            claw_scale: 2.0,
            ..Config::default()
        };
        let dispatcher = ActuatorDispatcher::new(&config, caps(&[]));
        let mut state = ControlState::new(&config);

        let close = NormalizedInput {
            close: 30.0,
            open: 80.0,
            ..NormalizedInput::default()
        };
        let out = run(&dispatcher, &close, ActionSet::empty(), None, &mut state);
        assert_eq!(out.commands.claw, ActuatorCommand::RunAt(-60.0));

        let open = NormalizedInput {
            open: 80.0,
            ..NormalizedInput::default()
        };
        let out = run(&dispatcher, &open, ActionSet::empty(), None, &mut state);
        assert_eq!(out.commands.claw, ActuatorCommand::RunAt(100.0));

        let idle = NormalizedInput::default();
        let out = run(&dispatcher, &idle, ActionSet::empty(), None, &mut state);
        assert_eq!(out.commands.claw, ActuatorCommand::Brake);
    }

    #[test]
    fn test_missing_optional_actuators_are_omitted() {
        let config = Config::default();
        let dispatcher = ActuatorDispatcher::new(&config, caps(&[]));
        let mut state = ControlState::new(&config);

        let input = held(&[Action::ExtendWrist, Action::AuxForward, Action::ReportWrist]);
        let out = run(&dispatcher, &input, input.actions, Some(0.0), &mut state);

        assert_eq!(out.commands.wrist, None);
        assert_eq!(out.commands.auxiliary, None);
        assert_eq!(out.report, None);
        assert_eq!(out.commands.iter().count(), 3);
    }

    #[test]
    fn test_auxiliary_buttons_and_stop_policy() {
        let config = Config {
            aux_stop: StopPolicy::Coast,
            ..Config::default()
        };
        let dispatcher = ActuatorDispatcher::new(&config, caps(&[ActuatorId::Auxiliary]));
        let mut state = ControlState::new(&config);

        let reverse = held(&[Action::AuxReverse]);
        let out = run(&dispatcher, &reverse, ActionSet::empty(), None, &mut state);
        assert_eq!(out.commands.auxiliary, Some(ActuatorCommand::RunAt(-100.0)));

        let out = run(&dispatcher, &held(&[]), ActionSet::empty(), None, &mut state);
        assert_eq!(out.commands.auxiliary, Some(ActuatorCommand::RunAt(0.0)));
    }

    #[test]
    fn test_refusal_alerts_every_tick() {
        let config = Config::default();
        let dispatcher = ActuatorDispatcher::new(&config, caps(&[ActuatorId::Wrist]));
        let mut state = ControlState::new(&config);
        let extend = held(&[Action::ExtendWrist]);

        for _ in 0..3 {
            let out = run(&dispatcher, &extend, ActionSet::empty(), Some(2000.0), &mut state);
            assert_eq!(out.commands.wrist, Some(ActuatorCommand::Brake));
            assert_eq!(out.haptic, Some(config.limit_alert));
        }

        let allowed = run(&dispatcher, &extend, ActionSet::empty(), Some(1999.0), &mut state);
        assert_eq!(allowed.commands.wrist, Some(ActuatorCommand::RunAt(100.0)));
        assert_eq!(allowed.haptic, None);
    }

    #[test]
    fn test_refusal_alert_onset_only() {
        let config = Config {
            limit_alert_on_onset_only: true,
            ..Config::default()
        };
        let dispatcher = ActuatorDispatcher::new(&config, caps(&[ActuatorId::Wrist]));
        let mut state = ControlState::new(&config);
        let extend = held(&[Action::ExtendWrist]);

        let first = run(&dispatcher, &extend, ActionSet::empty(), Some(2000.0), &mut state);
        assert_eq!(first.commands.wrist, Some(ActuatorCommand::Brake));
        assert_eq!(first.haptic, Some(config.limit_alert));

        let second = run(&dispatcher, &extend, ActionSet::empty(), Some(2000.0), &mut state);
        assert_eq!(second.commands.wrist, Some(ActuatorCommand::Brake));
        assert_eq!(second.haptic, None);

        let allowed = run(&dispatcher, &extend, ActionSet::empty(), Some(1999.0), &mut state);
        assert_eq!(allowed.commands.wrist, Some(ActuatorCommand::RunAt(100.0)));
        assert_eq!(allowed.haptic, None);
    }

    #[test]
    fn test_retract_wins_over_extend() {
        let config = Config::default();
        let dispatcher = ActuatorDispatcher::new(&config, caps(&[ActuatorId::Wrist]));
        let mut state = ControlState::new(&config);

        let both = held(&[Action::ExtendWrist, Action::RetractWrist]);
        let out = run(&dispatcher, &both, ActionSet::empty(), Some(0.0), &mut state);
        assert_eq!(out.commands.wrist, Some(ActuatorCommand::RunAt(-100.0)));
    }

    #[test]
    fn test_unknown_wrist_angle_brakes() {
        let config = Config::default();
        let dispatcher = ActuatorDispatcher::new(&config, caps(&[ActuatorId::Wrist]));
        let mut state = ControlState::new(&config);

        let input = held(&[Action::ExtendWrist, Action::RaiseCeiling]);
        let out = run(&dispatcher, &input, input.actions, None, &mut state);
        assert_eq!(out.commands.wrist, Some(ActuatorCommand::Brake));
        assert_eq!(state.wrist.limits(), config.wrist_limits);
        assert!(state.pending_wrist.contains(Action::RaiseCeiling));

        let out = run(&dispatcher, &input, ActionSet::empty(), Some(40.0), &mut state);
        assert_eq!(out.commands.wrist, Some(ActuatorCommand::Brake));
        assert_eq!(state.wrist.limits(), JointLimits::new(-2000.0, 40.0));
        assert!(state.pending_wrist.is_empty());
    }

    #[test]
    fn test_flipped_frame_mirrors_wrist_buttons() {
        let config = Config::default();
        let dispatcher = ActuatorDispatcher::new(&config, caps(&[ActuatorId::Wrist]));
        let mut state = ControlState::new(&config);
        state.orientation.update(180.0);

        // Raise-ceiling button while flipped moves the floor
        let input = held(&[Action::ExtendWrist, Action::RaiseCeiling]);
        let out = run(&dispatcher, &input, input.actions, Some(-500.0), &mut state);

        assert_eq!(state.wrist.limits(), JointLimits::new(-500.0, 2000.0));
        // Extend button retracts, and the wrist sits on the new floor
        assert_eq!(out.commands.wrist, Some(ActuatorCommand::Brake));
        assert!(state.wrist_refused);
    }

    #[test]
    fn test_rejected_recalibration_alerts() {
        let config = Config::default();
        let dispatcher = ActuatorDispatcher::new(&config, caps(&[ActuatorId::Wrist]));
        let mut state = ControlState::new(&config);

        let input = held(&[Action::LowerFloor]);
        let out = run(&dispatcher, &input, input.actions, Some(2500.0), &mut state);
        assert_eq!(out.haptic, Some(config.limit_alert));
        assert_eq!(state.wrist.limits(), config.wrist_limits);
    }

    #[test]
    fn test_report_after_recalibration() {
        let config = Config::default();
        let dispatcher = ActuatorDispatcher::new(&config, caps(&[ActuatorId::Wrist]));
        let mut state = ControlState::new(&config);

        let input = held(&[Action::RaiseCeiling, Action::ReportWrist]);
        let out = run(&dispatcher, &input, input.actions, Some(750.0), &mut state);
        assert_eq!(
            out.report,
            Some(WristReport {
                angle: 750.0,
                limits: JointLimits::new(-2000.0, 750.0),
            })
        );
    }

    #[test]
    fn test_all_brake_helper() {
        let commands = ActuatorCommands::all_brake(&caps(&[ActuatorId::Wrist]));
        assert!(commands.is_all_brake());
        assert_eq!(commands.get(ActuatorId::Wrist), Some(ActuatorCommand::Brake));
        assert_eq!(commands.get(ActuatorId::Auxiliary), None);
    }
}
