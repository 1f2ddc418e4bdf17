// Teleop runtime: fixed-rate control loop over zenoh, with input watchdogs
// Note: if the gamepad bridge stops publishing, the robot gets the neutral
// snapshot (everything brakes) until fresh input arrives. Joint angles and tilt
// older than the same timeout read as unknown.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};
use zenoh::handlers::FifoChannelHandler;
use zenoh::pubsub::Subscriber;
use zenoh::sample::Sample;

// local imports
use crate::config::{
    Config, PROBE_WINDOW, TOPIC_GAMEPAD, TOPIC_HAPTIC, TOPIC_HEALTH, TOPIC_JOINT, TOPIC_RT_MOTORS,
    TOPIC_TILT, TOPIC_WRIST,
};
use crate::control::ControlLoop;
use crate::input::{ControllerSnapshot, Gamepad, HapticPulse};
use crate::messages::{ActuationFrame, JointReading, RuntimeHealth, TiltReading};
use crate::motor::{ActuatorCommand, ActuatorId, Capabilities, MotorBus};
use crate::orientation::{OrientationState, TiltSensor};

/// Robot as seen through the bus: caches the latest samples, buffers outgoing
/// commands until the tick is published
pub struct ZenohIo {
    latest_snapshot: Option<ControllerSnapshot>,
    snapshot_received_at: Instant,
    input_timeout: Duration,
    roll_deg: Option<(f32, Instant)>,
    joint_angles: BTreeMap<ActuatorId, (f32, Instant)>,
    motors: BTreeMap<ActuatorId, ActuatorCommand>,
    haptics: Vec<HapticPulse>,
    health: RuntimeHealth,
}

impl ZenohIo {
    pub fn new(input_timeout: Duration) -> Self {
        Self {
            latest_snapshot: None,
            snapshot_received_at: Instant::now(),
            input_timeout,
            roll_deg: None,
            joint_angles: BTreeMap::new(),
            motors: BTreeMap::new(),
            haptics: Vec::new(),
            health: RuntimeHealth::InputStale, // Stale until first snapshot
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    fn on_snapshot(&mut self, snapshot: ControllerSnapshot) {
        self.latest_snapshot = Some(snapshot);
        self.snapshot_received_at = Instant::now();
    }

    fn on_tilt(&mut self, reading: TiltReading) {
        self.roll_deg = Some((reading.roll_deg, Instant::now()));
    }

    fn on_joint(&mut self, reading: JointReading) {
        self.joint_angles
            .insert(reading.joint, (reading.angle, Instant::now()));
    }

    fn is_fresh(&self, received_at: Instant) -> bool {
        received_at.elapsed() <= self.input_timeout
    }

    /// Commands sent since the last call, as one frame
    pub fn take_actuation(&mut self, orientation: OrientationState) -> ActuationFrame {
        ActuationFrame {
            orientation,
            motors: std::mem::take(&mut self.motors),
        }
    }

    pub fn take_haptics(&mut self) -> Vec<HapticPulse> {
        std::mem::take(&mut self.haptics)
    }
}

impl Gamepad for ZenohIo {
    fn read_snapshot(&mut self) -> ControllerSnapshot {
        let age = self.snapshot_received_at.elapsed();

        match &self.latest_snapshot {
            Some(snapshot) if age <= self.input_timeout => {
                if self.health != RuntimeHealth::Ok {
                    info!("Gamepad input live");
                }
                self.health = RuntimeHealth::Ok;
                snapshot.clone()
            }
            _ => {
                // Watchdog triggered - neutral input brakes everything
                if self.health != RuntimeHealth::InputStale {
                    warn!("Gamepad input stale ({:?} old), braking", age);
                }
                self.health = RuntimeHealth::InputStale;
                ControllerSnapshot::default()
            }
        }
    }

    fn emit_haptic(&mut self, pulse: HapticPulse) {
        self.haptics.push(pulse);
    }
}

impl TiltSensor for ZenohIo {
    /// NaN once the hub stops reporting, which holds the current orientation
    fn tilt_roll(&mut self) -> f32 {
        match self.roll_deg {
            Some((roll, at)) if self.is_fresh(at) => roll,
            Some(_) => f32::NAN,
            None => 0.0, // Upright until the hub reports
        }
    }
}

impl MotorBus for ZenohIo {
    fn set_speed(&mut self, motor: ActuatorId, speed: f32) {
        self.motors.insert(motor, ActuatorCommand::RunAt(speed));
    }

    fn brake(&mut self, motor: ActuatorId) {
        self.motors.insert(motor, ActuatorCommand::Brake);
    }

    fn joint_angle(&mut self, motor: ActuatorId) -> Option<f32> {
        match self.joint_angles.get(&motor) {
            Some(&(angle, at)) if self.is_fresh(at) => Some(angle),
            Some(_) => {
                debug!("{:?} angle stale, treating as unknown", motor);
                None
            }
            None => None,
        }
    }

    /// The wrist counts as present once the motor bridge has reported its angle.
    /// The auxiliary joint reports nothing, so config alone decides.
    fn is_present(&mut self, motor: ActuatorId) -> bool {
        match motor {
            ActuatorId::Wrist => self.joint_angles.contains_key(&motor),
            _ => true,
        }
    }
}

type Inbox = Subscriber<FifoChannelHandler<Sample>>;

fn parse<T: DeserializeOwned>(sample: &Sample, what: &str) -> Option<T> {
    let payload = sample.payload().to_bytes();
    match serde_json::from_slice::<T>(&payload) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to parse {}: {}", what, e);
            None
        }
    }
}

/// Drain all pending samples (non-blocking), keep latest
fn drain_inputs(io: &mut ZenohIo, gamepad: &Inbox, tilt: &Inbox, joints: &Inbox) {
    while let Ok(Some(sample)) = gamepad.try_recv() {
        if let Some(snapshot) = parse(&sample, "gamepad snapshot") {
            io.on_snapshot(snapshot);
        }
    }
    while let Ok(Some(sample)) = tilt.try_recv() {
        if let Some(reading) = parse(&sample, "tilt reading") {
            io.on_tilt(reading);
        }
    }
    while let Ok(Some(sample)) = joints.try_recv() {
        if let Some(reading) = parse(&sample, "joint reading") {
            io.on_joint(reading);
        }
    }
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_gamepad = session.declare_subscriber(TOPIC_GAMEPAD).await?;
    let sub_tilt = session.declare_subscriber(TOPIC_TILT).await?;
    let sub_joint = session.declare_subscriber(TOPIC_JOINT).await?;
    let pub_motors = session.declare_publisher(TOPIC_RT_MOTORS).await?;
    let pub_haptic = session.declare_publisher(TOPIC_HAPTIC).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;
    let pub_wrist = session.declare_publisher(TOPIC_WRIST).await?;

    let mut io = ZenohIo::new(config.input_timeout());

    // Give the bridges a moment to report which joints exist
    info!("Probing actuators for {}ms...", PROBE_WINDOW.as_millis());
    sleep(PROBE_WINDOW).await;
    drain_inputs(&mut io, &sub_gamepad, &sub_tilt, &sub_joint);
    let capabilities = Capabilities::probe(&mut io, &config);

    let mut control = ControlLoop::new(config, capabilities);
    control.start(&mut io);

    let mut tick = interval(control.config().tick_interval());
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        "Runtime started: {}ms tick, {}ms gamepad watchdog",
        control.config().tick_interval_ms,
        control.config().input_timeout_ms
    );
    info!(
        "Subscribed to: {}, {}, {}",
        TOPIC_GAMEPAD, TOPIC_TILT, TOPIC_JOINT
    );
    info!(
        "Publishing to: {}, {}, {}, {}",
        TOPIC_RT_MOTORS, TOPIC_HAPTIC, TOPIC_HEALTH, TOPIC_WRIST
    );

    loop {
        tick.tick().await;

        // 1. Take in whatever arrived since last tick
        drain_inputs(&mut io, &sub_gamepad, &sub_tilt, &sub_joint);

        // 2. Run the control core (includes watchdog logic)
        let output = control.tick(&mut io);

        // 3. Publish actuation
        let frame = io.take_actuation(output.orientation);
        pub_motors.put(serde_json::to_string(&frame)?).await?;

        // 4. Operator feedback
        for pulse in io.take_haptics() {
            pub_haptic.put(serde_json::to_string(&pulse)?).await?;
        }
        if let Some(report) = output.report {
            pub_wrist.put(serde_json::to_string(&report)?).await?;
        }

        // 5. Publish health
        let health_json = serde_json::to_string(&io.health())?;
        pub_health.put(health_json).await?;
    }
}
