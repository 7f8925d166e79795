//! Party console - headless round driver.
//!
//! Plays a scripted round with simulated handhelds and logs the outcome:
//!
//! ```text
//! party-console [chicken-fly|the-first-penguin] [--players N] [--training] [--seed N] [--realtime] [--write-tuning]
//! ```

use anyhow::{anyhow, bail, Context, Result};
use engine_core::{PlayerId, Time, Vec3};
use game::{GameKind, GltfLoader, MemoryLoader, Round, SceneMode, Tuning};
use input::{map_range, GamepadData, KeyName, SignalData};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Simulated round length cap.
const ROUND_LIMIT: Duration = Duration::from_secs(60);
/// Interval between scripted hazards.
const HAZARD_INTERVAL: Duration = Duration::from_millis(700);
/// Interval between simulated handheld samples.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(50);

struct Options {
    kind: GameKind,
    players: usize,
    mode: SceneMode,
    seed: u64,
    realtime: bool,
    write_tuning: bool,
}

fn parse_args() -> Result<Options> {
    let mut options = Options {
        kind: GameKind::ChickenFly,
        players: 4,
        mode: SceneMode::Normal,
        seed: 42,
        realtime: false,
        write_tuning: false,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--players" => {
                let value = args.next().context("--players needs a value")?;
                options.players = value
                    .parse()
                    .with_context(|| format!("invalid player count '{value}'"))?;
            }
            "--seed" => {
                let value = args.next().context("--seed needs a value")?;
                options.seed = value.parse().with_context(|| format!("invalid seed '{value}'"))?;
            }
            "--training" => options.mode = SceneMode::Training,
            "--realtime" => options.realtime = true,
            "--write-tuning" => options.write_tuning = true,
            name => {
                options.kind = GameKind::from_name(name).ok_or_else(|| anyhow!("unknown game '{name}'"))?;
            }
        }
    }

    if !(1..=8).contains(&options.players) {
        bail!("player count must be between 1 and 8, got {}", options.players);
    }
    Ok(options)
}

fn analog(name: KeyName, value: f32) -> SignalData {
    SignalData::Analog { name, value }
}

fn digital(name: KeyName, value: bool) -> SignalData {
    SignalData::Digital { name, value }
}

/// Handheld tilt range in degrees.
const TILT_RANGE: f32 = 60.0;

/// A random tilt reading in degrees.
fn tilt(rng: &mut StdRng) -> f32 {
    map_range(rng.gen::<f32>(), 0.0, 1.0, -TILT_RANGE, TILT_RANGE)
}

/// One simulated handheld sample for `player`.
fn scripted_sample(kind: GameKind, player: &PlayerId, rng: &mut StdRng) -> GamepadData {
    let keys = match kind {
        GameKind::ChickenFly => vec![
            analog(KeyName::XAxis, tilt(rng)),
            analog(KeyName::YAxis, tilt(rng)),
        ],
        GameKind::TheFirstPenguin => vec![
            analog(KeyName::XAxis, rng.gen_range(-1.0..1.0)),
            analog(KeyName::YAxis, rng.gen_range(-1.0..1.0)),
            digital(KeyName::A, rng.gen_bool(0.2)),
        ],
    };
    GamepadData {
        player_id: player.as_str().to_string(),
        keys,
    }
}

/// Feeds simulated samples and hazards into a round.
struct Script {
    kind: GameKind,
    next_sample: Duration,
    next_hazard: Duration,
}

impl Script {
    fn new(kind: GameKind) -> Self {
        Self {
            kind,
            next_sample: Duration::ZERO,
            next_hazard: HAZARD_INTERVAL,
        }
    }

    fn finished(&self, round: &Round) -> bool {
        round.now() >= ROUND_LIMIT || round.is_over()
    }

    fn drive(&mut self, round: &mut Round, roster: &[PlayerId], rng: &mut StdRng) -> Result<()> {
        let now = round.now();

        if now >= self.next_sample {
            for player in roster {
                round
                    .handle_gamepad(&scripted_sample(self.kind, player, rng))
                    .with_context(|| format!("routing sample from {player}"))?;
            }
            self.next_sample = now + SAMPLE_INTERVAL;
        }

        if now >= self.next_hazard {
            match self.kind {
                GameKind::ChickenFly => {
                    if let Some(target) = round.hit_random(rng) {
                        log::debug!("hazard hit {target}");
                    }
                }
                GameKind::TheFirstPenguin => {
                    let target = &roster[rng.gen_range(0..roster.len())];
                    let direction = Vec3::new(rng.gen_range(-1.0..1.0), 0.0, rng.gen_range(-1.0..1.0));
                    round.assault(target, direction)?;
                }
            }
            self.next_hazard = now + HAZARD_INTERVAL;
        }
        Ok(())
    }
}

fn play(round: &mut Round, roster: &[PlayerId], rng: &mut StdRng, realtime: bool) -> Result<()> {
    let tick = round.tick();
    let mut script = Script::new(round.kind());

    if !realtime {
        while !script.finished(round) {
            script.drive(round, roster, rng)?;
            round.step(tick);
        }
        return Ok(());
    }

    // Pace fixed ticks against the wall clock.
    let mut wall = Time::new();
    wall.set_fixed_rate(1.0 / tick.as_secs_f64());
    while !script.finished(round) {
        wall.update();
        while wall.should_fixed_update() && !script.finished(round) {
            script.drive(round, roster, rng)?;
            round.step(tick);
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = parse_args()?;
    let tuning = Tuning::load();
    if options.write_tuning {
        tuning.save();
    }

    log::info!(
        "Starting {} with {} player(s) ({:?})",
        options.kind.name(),
        options.players,
        options.mode
    );

    let roster: Vec<PlayerId> = (0..options.players)
        .map(|i| PlayerId::new(format!("player-{}", i + 1)))
        .collect();
    let mut round = Round::new(options.kind, options.mode, tuning.clone()).with_seed(options.seed);

    if tuning.asset_dir.is_dir() {
        let loader = GltfLoader::new(&tuning.asset_dir);
        pollster::block_on(round.spawn_players(&loader, &roster))
            .with_context(|| format!("loading models from {:?}", tuning.asset_dir))?;
    } else {
        log::warn!("Asset directory {:?} not found, using built-in models", tuning.asset_dir);
        pollster::block_on(round.spawn_players(&MemoryLoader::builtin(), &roster))
            .context("spawning built-in models")?;
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    play(&mut round, &roster, &mut rng, options.realtime)?;

    log::info!("Round finished at {:.2}s", round.now().as_secs_f32());
    for (place, player) in round.ranking().iter().enumerate() {
        match round.transform(player) {
            Some(t) => log::info!("  #{} {} at {:.1?}", place + 1, player, t.position),
            None => log::info!("  #{} {} (out)", place + 1, player),
        }
    }

    round.teardown();
    Ok(())
}
