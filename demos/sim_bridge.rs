// Simulated hub for running the teleop runtime without hardware
//
// Listens to actuation frames, integrates the wrist speed into an angle and
// publishes it back together with a fixed roll angle.
//
// Usage: cargo run --example sim_bridge -- --roll 180
use clap::Parser;
use clawbot_teleop::config::{TOPIC_HAPTIC, TOPIC_JOINT, TOPIC_RT_MOTORS, TOPIC_TILT};
use clawbot_teleop::input::HapticPulse;
use clawbot_teleop::messages::{ActuationFrame, JointReading, TiltReading};
use clawbot_teleop::motor::{ActuatorCommand, ActuatorId};
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(about = "Simulated clawbot hub")]
struct Args {
    /// Roll angle reported by the simulated IMU, degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    roll: f32,

    /// Wrist encoder degrees per second at speed 100
    #[arg(long, default_value_t = 720.0)]
    wrist_rate: f32,

    /// Simulate a robot without the wrist motor
    #[arg(long)]
    no_wrist: bool,
}

const SIM_HZ: u64 = 50;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let sub_motors = session.declare_subscriber(TOPIC_RT_MOTORS).await?;
    let sub_haptic = session.declare_subscriber(TOPIC_HAPTIC).await?;
    let pub_tilt = session.declare_publisher(TOPIC_TILT).await?;
    let pub_joint = session.declare_publisher(TOPIC_JOINT).await?;

    let dt = 1.0 / SIM_HZ as f32;
    let mut wrist_angle = 0.0f32;
    let mut wrist_speed = 0.0f32;
    let mut tick = interval(Duration::from_millis(1000 / SIM_HZ));

    info!("Simulating: roll {} deg, wrist {}", args.roll, !args.no_wrist);

    loop {
        tick.tick().await;

        while let Ok(Some(sample)) = sub_motors.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<ActuationFrame>(&payload) {
                Ok(frame) => {
                    wrist_speed = match frame.motors.get(&ActuatorId::Wrist) {
                        Some(ActuatorCommand::RunAt(speed)) => *speed,
                        _ => 0.0,
                    };
                }
                Err(e) => warn!("Failed to parse actuation: {}", e),
            }
        }

        while let Ok(Some(sample)) = sub_haptic.try_recv() {
            let payload = sample.payload().to_bytes();
            if let Ok(pulse) = serde_json::from_slice::<HapticPulse>(&payload) {
                info!("Rumble: {:?}", pulse);
            }
        }

        wrist_angle += wrist_speed / 100.0 * args.wrist_rate * dt;

        let tilt = TiltReading { roll_deg: args.roll };
        pub_tilt.put(serde_json::to_string(&tilt)?).await?;

        if !args.no_wrist {
            let joint = JointReading {
                joint: ActuatorId::Wrist,
                angle: wrist_angle,
            };
            pub_joint.put(serde_json::to_string(&joint)?).await?;
        }
    }
}
