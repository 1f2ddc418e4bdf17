// Fixed-cadence teleop control loop
//
// One tick: read snapshot, tilt and wrist angle -> normalize -> classify
// orientation -> drive mix -> dispatch actuators -> emit commands and haptics.
// The caller owns the cadence (see runtime.rs).

use tracing::debug;

use crate::config::Config;
use crate::dispatch::{ActuatorCommands, ActuatorDispatcher, WristReport};
use crate::input::{normalize, ActionSet, ControllerSnapshot, Gamepad, HapticPulse};
use crate::motor::{
    apply, frame_drive, ActuatorId, Capabilities, MotorBus, SoftLimitController, SpeedBounds,
};
use crate::orientation::{OrientationMonitor, OrientationState, TiltSensor};

/// Everything a tick needs from the outside world
pub trait Robot: Gamepad + TiltSensor + MotorBus {}

impl<T: Gamepad + TiltSensor + MotorBus> Robot for T {}

/// State carried from one tick to the next
#[derive(Debug, Clone)]
pub struct ControlState {
    pub orientation: OrientationMonitor,
    pub wrist: SoftLimitController,
    /// Logical actions held last tick, for edge detection
    pub held: ActionSet,
    /// The wrist was refused last tick
    pub wrist_refused: bool,
    /// Wrist edges pressed while no angle was known, applied once one arrives
    pub pending_wrist: ActionSet,
}

impl ControlState {
    pub fn new(config: &Config) -> Self {
        Self {
            orientation: OrientationMonitor::new(
                config.flip_threshold_deg,
                config.flip_hysteresis_deg,
            ),
            wrist: SoftLimitController::new(config.wrist_limits, config.wrist_speed),
            held: ActionSet::empty(),
            wrist_refused: false,
            pending_wrist: ActionSet::empty(),
        }
    }
}

/// Result of one tick, after it has been sent to the hardware
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    pub orientation: OrientationState,
    pub commands: ActuatorCommands,
    pub haptic: Option<HapticPulse>,
    pub report: Option<WristReport>,
}

pub struct ControlLoop {
    config: Config,
    bounds: SpeedBounds,
    dispatcher: ActuatorDispatcher,
    state: ControlState,
}

impl ControlLoop {
    pub fn new(config: Config, capabilities: Capabilities) -> Self {
        Self {
            bounds: SpeedBounds::new(config.speed_min, config.speed_max),
            dispatcher: ActuatorDispatcher::new(&config, capabilities),
            state: ControlState::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn capabilities(&self) -> &Capabilities {
        self.dispatcher.capabilities()
    }

    /// Tell the operator the robot is ready
    pub fn start<G: Gamepad + ?Sized>(&mut self, gamepad: &mut G) {
        gamepad.emit_haptic(self.config.startup_pulse);
    }

    /// Compute one tick from already-sampled inputs. Touches no hardware.
    pub fn step(
        &mut self,
        snapshot: &ControllerSnapshot,
        roll: f32,
        wrist_angle: Option<f32>,
    ) -> TickOutput {
        let input = normalize(snapshot, &self.config);
        let orientation = self.state.orientation.update(roll);

        let pressed = input.actions.pressed_since(self.state.held);
        self.state.held = input.actions;

        let drive = frame_drive(input.forward, input.turn, orientation, self.bounds);
        let outcome = self
            .dispatcher
            .dispatch(drive, &input, pressed, wrist_angle, &mut self.state);

        TickOutput {
            orientation,
            commands: outcome.commands,
            haptic: outcome.haptic,
            report: outcome.report,
        }
    }

    /// Sample the robot, compute, and send every command back out
    pub fn tick<R: Robot + ?Sized>(&mut self, robot: &mut R) -> TickOutput {
        let snapshot = robot.read_snapshot();
        let roll = robot.tilt_roll();
        let wrist_angle = if self.capabilities().has(ActuatorId::Wrist) {
            robot.joint_angle(ActuatorId::Wrist)
        } else {
            None
        };

        let output = self.step(&snapshot, roll, wrist_angle);

        for (motor, command) in output.commands.iter() {
            apply(robot, motor, command);
        }
        if let Some(pulse) = output.haptic {
            robot.emit_haptic(pulse);
        }

        debug!("Tick: {:?} {:?}", output.orientation, output.commands);
        output
    }
}
