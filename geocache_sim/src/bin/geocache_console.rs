use std::env;
use std::io::{self, BufRead};
use std::thread;

use crossbeam_channel::{unbounded, Receiver};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use geocache_runtime::{parse_command_line, CommandEnvelope, SessionCommand};
use geocache_sim::{
    load_game_config_from_env, GameSession, InteractionOutcome, JsonFileStore, LatLng,
    MovementMode,
};

const STORE_PATH_ENV: &str = "GEOCACHE_STORE_PATH";
const DEFAULT_STORE_PATH: &str = "geocache_store.json";
const WALK_SEED: u64 = 0x6765_6f63;

/// Stand-in for a device location sensor: drifts up to half a tile per
/// reading in each axis.
struct WanderingSensor {
    rng: ChaCha8Rng,
    position: LatLng,
    stride: f64,
}

impl WanderingSensor {
    fn new(start: LatLng, tile_degrees: f64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(WALK_SEED),
            position: start,
            stride: tile_degrees * 0.5,
        }
    }

    fn next_reading(&mut self) -> LatLng {
        let dlat = self.rng.gen_range(-self.stride..=self.stride);
        let dlng = self.rng.gen_range(-self.stride..=self.stride);
        self.position = self.position + LatLng::new(dlat, dlng);
        self.position
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (config, metadata) = load_game_config_from_env();
    let store_path = env::var(STORE_PATH_ENV).unwrap_or_else(|_| DEFAULT_STORE_PATH.to_string());
    let store = JsonFileStore::open(&store_path);
    let tile_degrees = config.tile_degrees;

    let mut session = GameSession::new(config, Box::new(store));
    session.app_mut().insert_resource(metadata);

    info!(
        target: "geocache::console",
        store = %store_path,
        "geocache console ready"
    );
    print_view(&session);

    let commands = spawn_stdin_reader();
    let mut sensor: Option<WanderingSensor> = None;

    while let Ok(command) = commands.recv() {
        if let SessionCommand::Status = command {
            print_view(&session);
            continue;
        }

        if session.mode() == MovementMode::Sensor {
            let walker = sensor
                .get_or_insert_with(|| WanderingSensor::new(session.player().position(), tile_degrees));
            session.sensor_feed().report(walker.next_reading());
        } else {
            sensor = None;
        }

        let outcome = session.apply_command(&command);
        if let Some(outcome) = outcome {
            println!("{}", describe(&outcome));
        }
        print_view(&session);
    }
}

fn spawn_stdin_reader() -> Receiver<SessionCommand> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let parsed = if trimmed.starts_with('{') {
                CommandEnvelope::decode(trimmed)
                    .map(|envelope| envelope.payload)
                    .map_err(|err| err.to_string())
            } else {
                parse_command_line(trimmed).map_err(|err| err.to_string())
            };
            match parsed {
                Ok(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(target: "geocache::console", error = %err, "command.rejected");
                    eprintln!("error: {err}");
                }
            }
        }
    });
    rx
}

fn describe(outcome: &InteractionOutcome) -> String {
    match *outcome {
        InteractionOutcome::PickedUp { cell, value } => format!("picked up {value} at {cell}"),
        InteractionOutcome::Merged { cell, value, .. } => format!("merged into {value} at {cell}"),
        InteractionOutcome::OutOfRange { cell, distance } => {
            format!("{cell} is out of reach ({distance:.2} cells)")
        }
        InteractionOutcome::Mismatch {
            cell,
            carried,
            cache,
        } => format!("cannot merge {carried} into {cache} at {cell}"),
        InteractionOutcome::NothingHere { cell } => format!("no cache at {cell}"),
        InteractionOutcome::Overflow { cell, value } => {
            format!("{value} at {cell} is too large to merge")
        }
    }
}

fn print_view(session: &GameSession) {
    println!(
        "[frame {} | {} | cell {}] {}",
        session.frame(),
        session.mode().as_str(),
        session.player_cell(),
        session.status()
    );
    print!("{}", session.render_map());
}
