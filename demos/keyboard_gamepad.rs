// Keyboard stand-in for the gamepad bridge
// WASD drive, Q/E claw close/open, I/K wrist extend/retract, Z/X aux joint,
// U/J set wrist ceiling/floor, Y reset limits, P report, R/F speed, Esc quit
use clawbot_teleop::config::TOPIC_GAMEPAD;
use clawbot_teleop::input::{Button, ControllerSnapshot};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::info;

const STICK_LEVELS: [f32; 3] = [25.0, 60.0, 100.0]; // percent deflection
const INPUT_TIMEOUT_MS: u64 = 100; // Release sticks and triggers after this much time with no input
const BUTTON_TIMEOUT_MS: u64 = 100; // Release a button this long after its own last key event

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_GAMEPAD).await?;

    info!("Controls: WASD=drive, Q/E=claw, I/K=wrist, Z/X=aux, U/J=ceiling/floor, Y=reset, P=report");
    info!("Speed: LOW");

    enable_raw_mode()?;
    let result = run_gamepad(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_gamepad(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut level: usize = 0;
    let mut snapshot = ControllerSnapshot::default();
    let mut last_input = Instant::now();
    let mut buttons: BTreeMap<Button, Instant> = BTreeMap::new();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                let stick = STICK_LEVELS[level];

                match code {
                    KeyCode::Char('w') if pressed => snapshot.left_stick.y = stick,
                    KeyCode::Char('s') if pressed => snapshot.left_stick.y = -stick,
                    KeyCode::Char('a') if pressed => snapshot.right_stick.x = -stick,
                    KeyCode::Char('d') if pressed => snapshot.right_stick.x = stick,

                    KeyCode::Char('q') if pressed => snapshot.left_trigger = 100.0,
                    KeyCode::Char('e') if pressed => snapshot.right_trigger = 100.0,

                    KeyCode::Char('i') if pressed => hold(&mut buttons, Button::Lb),
                    KeyCode::Char('k') if pressed => hold(&mut buttons, Button::Rb),
                    KeyCode::Char('u') if pressed => hold(&mut buttons, Button::Up),
                    KeyCode::Char('j') if pressed => hold(&mut buttons, Button::Down),
                    KeyCode::Char('y') if pressed => hold(&mut buttons, Button::Y),
                    KeyCode::Char('p') if pressed => hold(&mut buttons, Button::A),
                    KeyCode::Char('z') if pressed => hold(&mut buttons, Button::X),
                    KeyCode::Char('x') if pressed => hold(&mut buttons, Button::B),

                    // Speed control
                    KeyCode::Char('r') if pressed => {
                        level = (level + 1).min(2);
                        print_speed(level);
                    }
                    KeyCode::Char('f') if pressed => {
                        level = level.saturating_sub(1);
                        print_speed(level);
                    }

                    // Quit
                    KeyCode::Esc if pressed => break,

                    _ => {}
                }
                if pressed {
                    last_input = Instant::now();
                }
            }
        }

        // Terminals have no key-up events: each button expires on its own,
        // axes after INPUT_TIMEOUT_MS of silence
        release_expired(&mut buttons, Instant::now());
        if last_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            snapshot = ControllerSnapshot::default();
        }
        snapshot.buttons = buttons.keys().copied().collect();

        // Always publish at ~50Hz
        publisher.put(serde_json::to_string(&snapshot)?).await?;
    }

    Ok(())
}

/// Drop buttons whose last key event is older than BUTTON_TIMEOUT_MS
fn release_expired(buttons: &mut BTreeMap<Button, Instant>, now: Instant) {
    let timeout = Duration::from_millis(BUTTON_TIMEOUT_MS);
    buttons.retain(|_, at| now.duration_since(*at) <= timeout);
}

fn hold(buttons: &mut BTreeMap<Button, Instant>, button: Button) {
    buttons.insert(button, Instant::now());
}

fn print_speed(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Speed: {}", label);
}
