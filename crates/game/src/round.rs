//! A single game round: the physics world, the clock and every player's avatar.
//!
//! Avatars live in a `hecs` world keyed by their owner. Per-frame hooks run
//! in spawn order around one physics step, so a round behaves the same no
//! matter how the handhelds interleave their samples.

use engine_core::{Entity, PlayerId, Time, Transform, Vec3, World};
use input::{GamepadData, GamepadState};
use physics::PhysicsWorld;
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;

use crate::assets::AssetLoader;
use crate::config::Tuning;
use crate::error::ControllerError;
use crate::flight::{FlightEntity, FlightParams, FlightState};
use crate::ground::{GroundEntity, GroundParams};
use crate::spawner::{code_name, player_color, player_color_name, square_matrix_positions, Plane};

/// Which party game the round plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameKind {
    /// Flying avatars, last one airborne wins.
    ChickenFly,
    /// Ground avatars shoving each other around.
    TheFirstPenguin,
}

impl GameKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "chicken-fly" => Some(Self::ChickenFly),
            "the-first-penguin" => Some(Self::TheFirstPenguin),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ChickenFly => "chicken-fly",
            Self::TheFirstPenguin => "the-first-penguin",
        }
    }

    /// Spawn grid: gap, origin and plane.
    fn layout(self) -> (f32, Vec3, Plane) {
        match self {
            Self::ChickenFly => (2.0, Vec3::new(0.0, 4.0, 0.0), Plane::Xy),
            Self::TheFirstPenguin => (6.0, Vec3::new(0.0, 2.0, 0.0), Plane::Xz),
        }
    }
}

/// How the scene is being used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneMode {
    #[default]
    Normal,
    /// Menu backdrop.
    Showcase,
    /// Practice round.
    Training,
}

impl SceneMode {
    /// Whether avatars spawned in this mode keep their health.
    pub fn locks_health(self) -> bool {
        matches!(self, Self::Showcase | Self::Training)
    }
}

/// Avatar component.
pub enum Avatar {
    Flight(FlightEntity),
    Ground(GroundEntity),
}

impl Avatar {
    pub fn owner(&self) -> &PlayerId {
        match self {
            Avatar::Flight(f) => f.owner(),
            Avatar::Ground(g) => g.owner(),
        }
    }

    pub fn is_alive(&self) -> bool {
        match self {
            Avatar::Flight(f) => f.state() != FlightState::Dead,
            Avatar::Ground(_) => true,
        }
    }

    pub fn died_at(&self) -> Option<Duration> {
        match self {
            Avatar::Flight(f) => f.died_at(),
            Avatar::Ground(_) => None,
        }
    }

    fn pre_step(&mut self, physics: &mut PhysicsWorld, now: Duration, dt: f32) {
        match self {
            Avatar::Flight(f) => f.pre_step(physics, now, dt),
            Avatar::Ground(g) => g.pre_step(physics, now, dt),
        }
    }

    fn post_step(&mut self, physics: &mut PhysicsWorld) {
        match self {
            Avatar::Flight(f) => f.post_step(physics),
            Avatar::Ground(g) => g.post_step(physics),
        }
    }

    fn despawn(&mut self, physics: &mut PhysicsWorld) {
        match self {
            Avatar::Flight(f) => f.despawn(physics),
            Avatar::Ground(g) => g.despawn(physics),
        }
    }
}

pub struct Round {
    kind: GameKind,
    mode: SceneMode,
    tuning: Tuning,
    pub physics: PhysicsWorld,
    time: Time,
    world: World,
    /// Spawn order; hooks run in this order.
    order: Vec<Entity>,
    owners: HashMap<PlayerId, Entity>,
    pads: HashMap<PlayerId, GamepadState>,
    seed: Option<u64>,
}

impl Round {
    pub fn new(kind: GameKind, mode: SceneMode, tuning: Tuning) -> Self {
        let mut physics = PhysicsWorld::new();
        if kind == GameKind::TheFirstPenguin {
            physics.add_ground_plane();
        }
        let mut time = Time::new();
        if tuning.tick_rate > 0.0 {
            time.set_fixed_rate(tuning.tick_rate);
        } else {
            log::warn!("Ignoring tick rate {}, keeping {:?}", tuning.tick_rate, time.fixed_timestep());
        }

        Self {
            kind,
            mode,
            tuning,
            physics,
            time,
            world: World::new(),
            order: Vec::new(),
            owners: HashMap::new(),
            pads: HashMap::new(),
            seed: None,
        }
    }

    /// Seed flight tumbles so a round replays identically.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn kind(&self) -> GameKind {
        self.kind
    }

    pub fn mode(&self) -> SceneMode {
        self.mode
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    pub fn now(&self) -> Duration {
        self.time.elapsed()
    }

    /// Fixed simulation step configured by `tick_rate`.
    pub fn tick(&self) -> Duration {
        self.time.fixed_timestep()
    }

    pub fn player_count(&self) -> usize {
        self.order.len()
    }

    /// Spawn one avatar per player on the game's spawn grid.
    pub async fn spawn_players<L: AssetLoader>(&mut self, loader: &L, players: &[PlayerId]) -> Result<(), ControllerError> {
        let (gap, origin, plane) = self.kind.layout();
        let positions = square_matrix_positions(gap, players.len(), origin, plane);
        for (index, (player, position)) in players.iter().zip(positions).enumerate() {
            let seat = code_name(index);
            self.spawn(loader, player.clone(), &seat, position).await?;
        }
        log::info!(
            "{} round ({:?}) ready with {} player(s)",
            self.kind.name(),
            self.mode,
            self.order.len()
        );
        Ok(())
    }

    /// Spawn and initialise one avatar for `player`, tinted by `seat`.
    pub async fn spawn<L: AssetLoader>(
        &mut self,
        loader: &L,
        player: PlayerId,
        seat: &str,
        position: Vec3,
    ) -> Result<Entity, ControllerError> {
        if let Some(&existing) = self.owners.get(&player) {
            log::warn!("{player} already has an avatar");
            return Ok(existing);
        }

        let tint = player_color(seat);
        let name = format!("{}-{seat}", self.kind.name());
        let avatar = match self.kind {
            GameKind::ChickenFly => {
                let params = FlightParams {
                    position,
                    owner: player.clone(),
                    tint,
                };
                let tuning = self.tuning.flight.clone();
                let mut entity = match self.seed {
                    Some(seed) => FlightEntity::with_seed(name, params, tuning, seed.wrapping_add(self.order.len() as u64)),
                    None => FlightEntity::new(name, params, tuning),
                };
                entity.init(loader, &mut self.physics).await?;
                entity.set_health_lock(self.mode.locks_health());
                Avatar::Flight(entity)
            }
            GameKind::TheFirstPenguin => {
                let params = GroundParams {
                    position,
                    owner: player.clone(),
                    tint,
                };
                let mut entity = GroundEntity::new(name, params, self.tuning.ground.clone());
                entity.init(loader, &mut self.physics).await?;
                Avatar::Ground(entity)
            }
        };

        let entity = self.world.spawn((player.clone(), avatar));
        log::info!("{player} joined as {seat} ({})", player_color_name(seat));
        self.order.push(entity);
        self.owners.insert(player, entity);
        Ok(entity)
    }

    /// Run `f` on the avatar owned by `player`.
    fn with_avatar<R>(&mut self, player: &PlayerId, f: impl FnOnce(&mut Avatar, &mut PhysicsWorld, Duration) -> R) -> Option<R> {
        let entity = *self.owners.get(player)?;
        let now = self.time.elapsed();
        let mut avatar = self.world.get::<&mut Avatar>(entity).ok()?;
        Some(f(&mut *avatar, &mut self.physics, now))
    }

    /// Borrow the avatar owned by `player`.
    pub fn avatar(&self, player: &PlayerId) -> Option<hecs::Ref<'_, Avatar>> {
        let entity = *self.owners.get(player)?;
        self.world.get::<&Avatar>(entity).ok()
    }

    /// World transform of `player`'s avatar body, if it still has one.
    pub fn transform(&self, player: &PlayerId) -> Option<Transform> {
        let avatar = self.avatar(player)?;
        let handle = match &*avatar {
            Avatar::Flight(f) => f.body()?.rigid_body,
            Avatar::Ground(g) => g.body()?.rigid_body,
        };
        self.physics.body_transform(handle)
    }

    /// Route one handheld sample to its owner's avatar.
    pub fn handle_gamepad(&mut self, data: &GamepadData) -> Result<(), ControllerError> {
        let player = data.player();
        if !self.owners.contains_key(&player) {
            log::debug!("dropping sample from {player}: no avatar");
            return Ok(());
        }

        let mut pad = self.pads.remove(&player).unwrap_or_default();
        pad.process(data);

        let walk_force = self.tuning.ground.walk_force;
        let result = self.with_avatar(&player, |avatar, physics, now| -> Result<(), ControllerError> {
            match avatar {
                Avatar::Flight(flight) => {
                    if let Some(sample) = pad.attitude() {
                        flight.set_attitude(sample.pitch, sample.roll);
                    }
                }
                Avatar::Ground(ground) => {
                    let movement = pad.movement();
                    if movement != Vec3::ZERO {
                        ground.walk(physics, movement * walk_force, now)?;
                    }
                    if pad.is_attack_pressed() {
                        ground.attack(now);
                    }
                }
            }
            Ok(())
        });

        pad.clear_edges();
        self.pads.insert(player, pad);
        result.unwrap_or(Ok(()))
    }

    /// Deliver a hit to `player`'s flying avatar. Returns whether one was found.
    pub fn hit(&mut self, player: &PlayerId) -> bool {
        self.with_avatar(player, |avatar, physics, now| match avatar {
            Avatar::Flight(flight) => {
                flight.attacked(physics, now);
                true
            }
            Avatar::Ground(_) => false,
        })
        .unwrap_or(false)
    }

    /// Shove `player`'s ground avatar along `direction`.
    pub fn assault(&mut self, player: &PlayerId, direction: Vec3) -> Result<bool, ControllerError> {
        self.with_avatar(player, |avatar, physics, now| match avatar {
            Avatar::Ground(ground) => ground.assaulted(physics, direction, now),
            Avatar::Flight(_) => Ok(false),
        })
        .unwrap_or(Ok(false))
    }

    /// Hit a random surviving flyer. Returns its owner.
    pub fn hit_random<R: Rng>(&mut self, rng: &mut R) -> Option<PlayerId> {
        let alive = self.survivors();
        if alive.is_empty() {
            return None;
        }
        let target = alive[rng.gen_range(0..alive.len())].clone();
        self.hit(&target).then_some(target)
    }

    /// Advance the round by `dt`.
    pub fn step(&mut self, dt: Duration) {
        self.time.advance(dt);
        let now = self.time.elapsed();
        let seconds = dt.as_secs_f32();

        for &entity in &self.order {
            if let Ok(mut avatar) = self.world.get::<&mut Avatar>(entity) {
                avatar.pre_step(&mut self.physics, now, seconds);
            }
        }

        self.physics.step(seconds);

        for &entity in &self.order {
            if let Ok(mut avatar) = self.world.get::<&mut Avatar>(entity) {
                avatar.post_step(&mut self.physics);
            }
        }
    }

    /// Owners of avatars still in play, in spawn order.
    pub fn survivors(&self) -> Vec<PlayerId> {
        self.order
            .iter()
            .filter_map(|&e| self.world.get::<&Avatar>(e).ok())
            .filter(|avatar| avatar.is_alive())
            .map(|avatar| avatar.owner().clone())
            .collect()
    }

    pub fn alive_count(&self) -> usize {
        self.survivors().len()
    }

    /// Whether the flight round has a winner (or nobody left).
    pub fn is_over(&self) -> bool {
        match self.kind {
            GameKind::ChickenFly if self.mode == SceneMode::Normal => {
                let alive = self.alive_count();
                alive == 0 || (alive == 1 && self.order.len() > 1)
            }
            _ => false,
        }
    }

    /// Owners from first to last place: survivors in spawn order, then the
    /// fallen from the latest death to the earliest.
    pub fn ranking(&self) -> Vec<PlayerId> {
        let mut standings: Vec<(PlayerId, Option<Duration>)> = self
            .order
            .iter()
            .filter_map(|&e| self.world.get::<&Avatar>(e).ok())
            .map(|avatar| (avatar.owner().clone(), avatar.died_at()))
            .collect();

        standings.sort_by(|a, b| match (a.1, b.1) {
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
            (Some(a), Some(b)) => b.cmp(&a),
        });
        standings.into_iter().map(|(player, _)| player).collect()
    }

    /// Release every avatar and its physics body.
    pub fn teardown(&mut self) {
        for &entity in &self.order {
            if let Ok(mut avatar) = self.world.get::<&mut Avatar>(entity) {
                avatar.despawn(&mut self.physics);
            }
        }
        self.world.clear();
        self.order.clear();
        self.owners.clear();
        self.pads.clear();
        log::info!("{} round torn down", self.kind.name());
    }
}
