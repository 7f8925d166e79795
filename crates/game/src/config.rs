//! Controller tuning. Loaded from tuning.ron at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Console settings and per-avatar tuning. Loaded from `tuning.ron` in the current directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tuning {
    /// Directory holding `chicken-fly/` and `the-first-penguin/` model folders.
    #[serde(default = "default_asset_dir")]
    pub asset_dir: PathBuf,
    /// Simulation rate in Hz.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: f64,
    #[serde(default)]
    pub flight: FlightTuning,
    #[serde(default)]
    pub ground: GroundTuning,
}

/// Flying avatar constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightTuning {
    /// Attitude bound in degrees, applied to pitch and roll.
    #[serde(default = "default_max_angle_deg")]
    pub max_angle_deg: f32,
    /// Speed at which lift stops assisting motion along an axis.
    #[serde(default = "default_flight_max_speed")]
    pub max_speed: f32,
    #[serde(default = "default_lift_coefficient")]
    pub lift_coefficient: f32,
    #[serde(default = "default_lift_interval_ms")]
    pub lift_interval_ms: u64,
    /// Stun after a hit before control returns.
    #[serde(default = "default_stun_ms")]
    pub stun_ms: u64,
    #[serde(default = "default_health")]
    pub health: u32,
    /// Spin applied by a tumble (Y axis fixed, X/Z random within ±spin).
    #[serde(default = "default_tumble_spin")]
    pub tumble_spin: f32,
    /// How far the body sinks during the exit animation.
    #[serde(default = "default_exit_drop")]
    pub exit_drop: f32,
    /// Speed ratio for the attitude tween.
    #[serde(default = "default_turn_speed_ratio")]
    pub turn_speed_ratio: f32,
}

/// Ground avatar constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTuning {
    #[serde(default = "default_ground_max_speed")]
    pub max_speed: f32,
    /// Impulse magnitude when shoved.
    #[serde(default = "default_knockback")]
    pub knockback: f32,
    /// Force applied per unit of stick deflection.
    #[serde(default = "default_walk_force")]
    pub walk_force: f32,
    #[serde(default = "default_walk_idle_ms")]
    pub walk_idle_ms: u64,
    #[serde(default = "default_attack_cooldown_ms")]
    pub attack_cooldown_ms: u64,
    #[serde(default = "default_attack_idle_ms")]
    pub attack_idle_ms: u64,
    #[serde(default = "default_assault_cooldown_ms")]
    pub assault_cooldown_ms: u64,
    #[serde(default = "default_blend_step")]
    pub blend_step: f32,
    #[serde(default = "default_attack_blend_step")]
    pub attack_blend_step: f32,
    #[serde(default = "default_turn_speed_ratio")]
    pub turn_speed_ratio: f32,
}

fn default_asset_dir() -> PathBuf {
    PathBuf::from("assets")
}
fn default_tick_rate() -> f64 {
    60.0
}
fn default_max_angle_deg() -> f32 {
    45.0
}
fn default_flight_max_speed() -> f32 {
    4.0
}
fn default_lift_coefficient() -> f32 {
    15.0
}
fn default_lift_interval_ms() -> u64 {
    10
}
fn default_stun_ms() -> u64 {
    2000
}
fn default_health() -> u32 {
    3
}
fn default_tumble_spin() -> f32 {
    10.0
}
fn default_exit_drop() -> f32 {
    5.0
}
fn default_turn_speed_ratio() -> f32 {
    3.0
}
fn default_ground_max_speed() -> f32 {
    15.0
}
fn default_knockback() -> f32 {
    20.0
}
fn default_walk_force() -> f32 {
    40.0
}
fn default_walk_idle_ms() -> u64 {
    500
}
fn default_attack_cooldown_ms() -> u64 {
    2000
}
fn default_attack_idle_ms() -> u64 {
    1000
}
fn default_assault_cooldown_ms() -> u64 {
    500
}
fn default_blend_step() -> f32 {
    0.1
}
fn default_attack_blend_step() -> f32 {
    0.3
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            asset_dir: default_asset_dir(),
            tick_rate: default_tick_rate(),
            flight: FlightTuning::default(),
            ground: GroundTuning::default(),
        }
    }
}

impl Default for FlightTuning {
    fn default() -> Self {
        Self {
            max_angle_deg: default_max_angle_deg(),
            max_speed: default_flight_max_speed(),
            lift_coefficient: default_lift_coefficient(),
            lift_interval_ms: default_lift_interval_ms(),
            stun_ms: default_stun_ms(),
            health: default_health(),
            tumble_spin: default_tumble_spin(),
            exit_drop: default_exit_drop(),
            turn_speed_ratio: default_turn_speed_ratio(),
        }
    }
}

/// Smallest speed bound accepted from a tuning file.
const MIN_MAX_SPEED: f32 = 0.1;

impl FlightTuning {
    /// Bring hand-edited values back into a range the controllers can use.
    fn sanitized(mut self) -> Self {
        if !self.tumble_spin.is_finite() {
            log::warn!("flight.tumble_spin {} is not finite, using default", self.tumble_spin);
            self.tumble_spin = default_tumble_spin();
        }
        self.tumble_spin = self.tumble_spin.abs();
        if !(self.max_speed >= MIN_MAX_SPEED) {
            log::warn!("flight.max_speed {} too small, using {}", self.max_speed, MIN_MAX_SPEED);
            self.max_speed = MIN_MAX_SPEED;
        }
        self
    }

    pub fn max_angle(&self) -> f32 {
        self.max_angle_deg.to_radians()
    }

    pub fn lift_interval(&self) -> Duration {
        Duration::from_millis(self.lift_interval_ms)
    }

    pub fn stun(&self) -> Duration {
        Duration::from_millis(self.stun_ms)
    }
}

impl Default for GroundTuning {
    fn default() -> Self {
        Self {
            max_speed: default_ground_max_speed(),
            knockback: default_knockback(),
            walk_force: default_walk_force(),
            walk_idle_ms: default_walk_idle_ms(),
            attack_cooldown_ms: default_attack_cooldown_ms(),
            attack_idle_ms: default_attack_idle_ms(),
            assault_cooldown_ms: default_assault_cooldown_ms(),
            blend_step: default_blend_step(),
            attack_blend_step: default_attack_blend_step(),
            turn_speed_ratio: default_turn_speed_ratio(),
        }
    }
}

impl GroundTuning {
    pub fn walk_idle(&self) -> Duration {
        Duration::from_millis(self.walk_idle_ms)
    }

    pub fn attack_cooldown(&self) -> Duration {
        Duration::from_millis(self.attack_cooldown_ms)
    }

    pub fn attack_idle(&self) -> Duration {
        Duration::from_millis(self.attack_idle_ms)
    }

    pub fn assault_cooldown(&self) -> Duration {
        Duration::from_millis(self.assault_cooldown_ms)
    }
}

impl Tuning {
    /// Load tuning from `tuning.ron`. If the file is missing or invalid, returns defaults.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match Self::parse(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid tuning at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }

    pub fn parse(data: &str) -> Result<Self, ron::error::SpannedError> {
        let mut tuning: Self = ron::from_str(data)?;
        tuning.flight = tuning.flight.sanitized();
        Ok(tuning)
    }

    /// Save current tuning to `tuning.ron`. Logs on error.
    pub fn save(&self) {
        let path = config_path();
        if let Ok(s) = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            if let Err(e) = std::fs::write(&path, s) {
                log::warn!("Could not write tuning to {:?}: {}", path, e);
            }
        }
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("tuning.ron")
}
