//! Ground avatar: walks by force, turns to face its motion, attacks on a
//! cooldown and gets shoved around by other players.

use engine_core::{Debounce, PlayerId, Quat, Throttle, Tint, Vec3};
use physics::{BodyDesc, BoxCollider, CollisionGroup, PhysicsBody, PhysicsWorld};
use std::f32::consts::{PI, TAU};
use std::time::Duration;

use crate::animation::{ClipId, ClipMixer};
use crate::assets::{AssetLoader, Visual, PENGUIN};
use crate::blend::{BlendSession, BlendStep};
use crate::config::GroundTuning;
use crate::error::{AssetError, ControllerError};
use crate::tween::Tween;

/// Seconds per badge revolution.
const BADGE_PERIOD: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroundState {
    #[default]
    Idle,
    Walk,
    Attack,
}

impl GroundState {
    pub fn clip_name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Walk => "walk",
            Self::Attack => "attack",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ClipSet {
    idle: ClipId,
    walk: ClipId,
    attack: ClipId,
}

impl ClipSet {
    fn resolve(mixer: &ClipMixer, model: &str) -> Result<Self, AssetError> {
        let find = |state: GroundState| {
            let clip = state.clip_name();
            mixer.find(clip).ok_or_else(|| AssetError::MissingClip {
                model: model.to_string(),
                clip,
            })
        };
        Ok(Self {
            idle: find(GroundState::Idle)?,
            walk: find(GroundState::Walk)?,
            attack: find(GroundState::Attack)?,
        })
    }

    fn get(&self, state: GroundState) -> ClipId {
        match state {
            GroundState::Idle => self.idle,
            GroundState::Walk => self.walk,
            GroundState::Attack => self.attack,
        }
    }
}

/// Spinning marker in the player's color above the avatar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Badge {
    pub tint: Tint,
    pub offset: Vec3,
    /// Current spin around Y, in `[0, TAU)`.
    pub spin: f32,
}

impl Badge {
    fn update(&mut self, dt: f32) {
        self.spin = (self.spin + TAU * dt / BADGE_PERIOD).rem_euclid(TAU);
    }
}

/// Spawn parameters.
#[derive(Debug, Clone)]
pub struct GroundParams {
    pub position: Vec3,
    pub owner: PlayerId,
    pub tint: Tint,
}

impl Default for GroundParams {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            owner: PlayerId::default(),
            tint: Tint::rgb(0.9, 0.9, 0.9),
        }
    }
}

/// Signed angle around Y between `force` and the +Z facing axis.
///
/// Negative when the force points toward -X.
pub fn facing_angle(force: Vec3) -> f32 {
    let direction = force.normalize_or_zero();
    let angle = direction.dot(Vec3::Z).clamp(-1.0, 1.0).acos();
    if direction.x < 0.0 {
        -angle
    } else {
        angle
    }
}

pub struct GroundEntity {
    name: String,
    params: GroundParams,
    tuning: GroundTuning,
    state: GroundState,
    body: Option<PhysicsBody>,
    visual: Option<Visual>,
    badge: Option<Badge>,
    mixer: ClipMixer,
    clips: Option<ClipSet>,
    blend: Option<BlendSession>,
    /// Heading around Y in radians.
    facing: f32,
    turn: Option<Tween<f32>>,
    walk_idle: Debounce,
    attack_idle: Debounce,
    attack_cooldown: Throttle,
    assault_cooldown: Throttle,
}

impl GroundEntity {
    pub fn new(name: impl Into<String>, params: GroundParams, tuning: GroundTuning) -> Self {
        Self {
            name: name.into(),
            params,
            state: GroundState::Idle,
            body: None,
            visual: None,
            badge: None,
            mixer: ClipMixer::default(),
            clips: None,
            blend: None,
            facing: 0.0,
            turn: None,
            walk_idle: Debounce::new(tuning.walk_idle()),
            attack_idle: Debounce::new(tuning.attack_idle()),
            attack_cooldown: Throttle::new(tuning.attack_cooldown()),
            assault_cooldown: Throttle::new(tuning.assault_cooldown()),
            tuning,
        }
    }

    /// Load the model, wire its clips and create the hit box. Runs at most once.
    pub async fn init<L: AssetLoader>(&mut self, loader: &L, physics: &mut PhysicsWorld) -> Result<(), ControllerError> {
        if self.body.is_some() {
            log::debug!("{} already initialised", self.name);
            return Ok(());
        }

        let asset = loader.load(PENGUIN).await?;

        let mut mixer = ClipMixer::from_names(asset.clips.iter().cloned());
        mixer.stop_all();
        let clips = ClipSet::resolve(&mixer, &asset.id)?;

        let desc = BodyDesc::new(self.params.position, CollisionGroup::Walker)
            .lock_rotations()
            .with_collider(
                BoxCollider::sized(2.0, 4.0, 2.0)
                    .friction(0.7)
                    .restitution(0.7),
            );
        let body = physics.add_body(&desc);

        self.body = Some(body);
        self.visual = Some(Visual::from_asset(&asset).placed(Vec3::new(0.0, -2.0, 0.0), Quat::IDENTITY, 1.0));
        self.badge = Some(Badge {
            tint: self.params.tint,
            offset: Vec3::new(0.0, 3.0, 0.0),
            spin: 0.0,
        });
        self.mixer = mixer;
        self.clips = Some(clips);

        let idle = clips.get(self.state);
        self.mixer.play(idle, true);
        self.mixer.set_weight(idle, 1.0);

        log::info!("{} ready for {}", self.name, self.params.owner);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &PlayerId {
        &self.params.owner
    }

    pub fn state(&self) -> GroundState {
        self.state
    }

    pub fn facing(&self) -> f32 {
        self.facing
    }

    /// Heading the current turn is heading to.
    pub fn facing_target(&self) -> Option<f32> {
        self.turn.as_ref().map(Tween::target)
    }

    pub fn is_initialized(&self) -> bool {
        self.body.is_some()
    }

    pub fn body(&self) -> Option<&PhysicsBody> {
        self.body.as_ref()
    }

    pub fn visual(&self) -> Option<&Visual> {
        self.visual.as_ref()
    }

    pub fn badge(&self) -> Option<&Badge> {
        self.badge.as_ref()
    }

    pub fn mixer(&self) -> &ClipMixer {
        &self.mixer
    }

    pub fn blend(&self) -> Option<&BlendSession> {
        self.blend.as_ref()
    }

    fn body_handle(&self) -> Result<physics::RigidBodyHandle, ControllerError> {
        self.body
            .as_ref()
            .map(|b| b.rigid_body)
            .ok_or_else(|| ControllerError::NotInitialized {
                name: self.name.clone(),
            })
    }

    /// Push the avatar with `force` and face along it.
    pub fn walk(&mut self, physics: &mut PhysicsWorld, force: Vec3, now: Duration) -> Result<(), ControllerError> {
        if self.state == GroundState::Attack {
            return Ok(());
        }
        let handle = self.body_handle()?;

        physics.apply_force(handle, force);
        if force.length_squared() > f32::EPSILON {
            self.rotate(facing_angle(force));
        }

        self.set_state(GroundState::Walk);
        self.walk_idle.call(now);
        Ok(())
    }

    fn rotate(&mut self, angle: f32) {
        let current = self.facing;
        // Unwinding more than half a turn: jump to the equivalent heading on
        // the other side first.
        if (angle - current).abs() > PI {
            let supplementary = TAU - current.abs();
            self.facing = if current < 0.0 { supplementary } else { -supplementary };
        }
        self.turn = Some(Tween::new(angle, self.tuning.turn_speed_ratio).starting_at(self.facing));
    }

    /// Attack if the cooldown allows. Returns whether it fired.
    pub fn attack(&mut self, now: Duration) -> bool {
        if !self.attack_cooldown.try_fire(now) {
            log::debug!("{} attack dropped (cooling down)", self.name);
            return false;
        }
        self.set_state(GroundState::Attack);
        self.attack_idle.call(now);
        self.walk_idle.cancel();
        true
    }

    /// Knock the avatar along `direction`. Returns whether the shove landed.
    pub fn assaulted(&mut self, physics: &mut PhysicsWorld, direction: Vec3, now: Duration) -> Result<bool, ControllerError> {
        let handle = self.body_handle()?;
        if !self.assault_cooldown.try_fire(now) {
            return Ok(false);
        }
        let impulse = direction.normalize_or_zero() * self.tuning.knockback;
        physics.apply_impulse(handle, impulse);
        Ok(true)
    }

    /// Whether a walk-to-idle reversion is pending.
    pub fn is_walk_idle_pending(&self) -> bool {
        self.walk_idle.is_pending()
    }

    fn set_state(&mut self, next: GroundState) {
        if next == self.state {
            return;
        }
        log::debug!("{} {:?} -> {:?}", self.name, self.state, next);
        let previous_state = std::mem::replace(&mut self.state, next);

        let Some(clips) = self.clips else { return };
        let (from, to) = (clips.get(previous_state), clips.get(next));
        if let Some(previous) = self.blend.take() {
            previous.supersede(&mut self.mixer, to);
        }

        let attacking = next == GroundState::Attack;
        let step = if attacking {
            self.tuning.attack_blend_step
        } else {
            self.tuning.blend_step
        };
        self.blend = Some(BlendSession::start(&mut self.mixer, from, to, !attacking, step));
    }

    /// Per-frame work before the physics step.
    pub fn pre_step(&mut self, physics: &mut PhysicsWorld, now: Duration, dt: f32) {
        if self.walk_idle.poll(now) {
            self.set_state(GroundState::Idle);
        }
        if self.attack_idle.poll(now) {
            self.set_state(GroundState::Idle);
        }

        if let Some(blend) = &mut self.blend {
            if blend.advance(&mut self.mixer) == BlendStep::Finished {
                self.blend = None;
            }
        }

        let Some(handle) = self.body.as_ref().map(|b| b.rigid_body) else {
            return;
        };

        if let Some(turn) = &mut self.turn {
            self.facing = turn.advance(self.facing, dt);
            if turn.is_finished() {
                self.turn = None;
            }
        }
        physics.set_rotation(handle, Quat::from_rotation_y(self.facing));

        if let Some(badge) = &mut self.badge {
            badge.update(dt);
        }
    }

    /// Per-frame work after the physics step: cap speed, keep direction.
    pub fn post_step(&mut self, physics: &mut PhysicsWorld) {
        let Some(body) = &self.body else { return };
        let Some(velocity) = physics.linear_velocity(body.rigid_body) else {
            return;
        };
        if velocity.length() > self.tuning.max_speed {
            physics.set_linear_velocity(body.rigid_body, velocity.normalize() * self.tuning.max_speed);
        }
    }

    /// Release the body (round teardown).
    pub fn despawn(&mut self, physics: &mut PhysicsWorld) {
        if let Some(body) = self.body.take() {
            physics.remove_body(body.rigid_body);
        }
        self.visual = None;
        self.badge = None;
        self.mixer.stop_all();
        self.blend = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryLoader;

    const DT: f32 = 1.0 / 60.0;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn spawn(physics: &mut PhysicsWorld) -> GroundEntity {
        let params = GroundParams {
            position: Vec3::new(0.0, 2.0, 0.0),
            owner: PlayerId::new("p1"),
            tint: Tint::rgb(0.0, 1.0, 0.0),
        };
        let mut entity = GroundEntity::new("penguin-0", params, GroundTuning::default());
        pollster::block_on(entity.init(&MemoryLoader::builtin(), physics)).unwrap();
        entity
    }

    fn tick(entity: &mut GroundEntity, physics: &mut PhysicsWorld, now: Duration) {
        entity.pre_step(physics, now, DT);
        physics.step(DT);
        entity.post_step(physics);
    }

    #[test]
    fn walk_before_init_is_an_error() {
        let mut physics = PhysicsWorld::new();
        let mut entity = GroundEntity::new("ghost", GroundParams::default(), GroundTuning::default());
        let err = entity.walk(&mut physics, Vec3::Z, ms(0)).unwrap_err();
        assert!(matches!(err, ControllerError::NotInitialized { .. }));
        let err = entity.assaulted(&mut physics, Vec3::X, ms(0)).unwrap_err();
        assert!(matches!(err, ControllerError::NotInitialized { .. }));
        // Per-frame hooks stay quiet.
        entity.pre_step(&mut physics, ms(16), DT);
        entity.post_step(&mut physics);
    }

    #[test]
    fn init_requires_state_clips() {
        let mut loader = MemoryLoader::new();
        loader.insert(crate::assets::ModelAsset {
            id: PENGUIN.to_string(),
            nodes: vec!["__root__".into()],
            clips: vec!["idle".into(), "walk".into()],
        });
        let mut physics = PhysicsWorld::new();
        let mut entity = GroundEntity::new("penguin-x", GroundParams::default(), GroundTuning::default());
        let err = pollster::block_on(entity.init(&loader, &mut physics)).unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Asset(AssetError::MissingClip { clip: "attack", .. })
        ));
        assert!(!entity.is_initialized());
        assert_eq!(physics.rigid_body_set.len(), 0);
    }

    #[test]
    fn init_plays_idle() {
        let mut physics = PhysicsWorld::new();
        let entity = spawn(&mut physics);
        let idle = entity.mixer().by_name("idle").unwrap();
        assert!(idle.playing && idle.looping);
        assert_eq!(entity.mixer().playing().count(), 1);
        assert_eq!(entity.badge().unwrap().tint, Tint::rgb(0.0, 1.0, 0.0));
    }

    #[test]
    fn facing_angle_is_signed_by_x() {
        assert!(facing_angle(Vec3::Z).abs() < 1e-6);
        assert!((facing_angle(Vec3::X) - PI / 2.0).abs() < 1e-6);
        assert!((facing_angle(-Vec3::X) + PI / 2.0).abs() < 1e-6);
        assert!((facing_angle(-Vec3::Z) - PI).abs() < 1e-6);
    }

    #[test]
    fn walk_sets_state_and_reverts_after_quiet_period() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);

        entity.walk(&mut physics, Vec3::new(10.0, 0.0, 0.0), ms(0)).unwrap();
        assert_eq!(entity.state(), GroundState::Walk);

        tick(&mut entity, &mut physics, ms(300));
        entity.walk(&mut physics, Vec3::new(10.0, 0.0, 0.0), ms(300)).unwrap();
        tick(&mut entity, &mut physics, ms(700));
        assert_eq!(entity.state(), GroundState::Walk);

        tick(&mut entity, &mut physics, ms(800));
        assert_eq!(entity.state(), GroundState::Idle);
    }

    #[test]
    fn walk_turns_toward_force() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);
        entity.walk(&mut physics, Vec3::new(1.0, 0.0, 0.0), ms(0)).unwrap();
        assert!((entity.facing_target().unwrap() - PI / 2.0).abs() < 1e-5);

        let mut now = ms(0);
        for _ in 0..30 {
            now += ms(16);
            tick(&mut entity, &mut physics, now);
        }
        assert!((entity.facing() - PI / 2.0).abs() < 1e-4);
        let yaw = engine_core::yaw_pitch_roll(physics.rotation(entity.body().unwrap().rigid_body).unwrap()).0;
        assert!((yaw - PI / 2.0).abs() < 1e-3);
    }

    #[test]
    fn long_turn_snaps_to_equivalent_heading_first() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);
        entity.facing = -3.0;
        entity.rotate(3.0);
        assert!((entity.facing() - (TAU - 3.0)).abs() < 1e-6);
        assert_eq!(entity.facing_target(), Some(3.0));
    }

    #[test]
    fn attack_is_throttled_on_leading_edge() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);

        assert!(entity.attack(ms(0)));
        assert_eq!(entity.state(), GroundState::Attack);
        assert!(!entity.attack(ms(1500)));
        assert!(entity.attack(ms(2000)));
    }

    #[test]
    fn attack_reverts_to_idle_after_a_second() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);
        entity.attack(ms(0));
        tick(&mut entity, &mut physics, ms(999));
        assert_eq!(entity.state(), GroundState::Attack);
        tick(&mut entity, &mut physics, ms(1000));
        assert_eq!(entity.state(), GroundState::Idle);
    }

    #[test]
    fn walking_is_ignored_while_attacking() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);
        entity.attack(ms(0));
        entity.walk(&mut physics, Vec3::X, ms(10)).unwrap();
        assert_eq!(entity.state(), GroundState::Attack);
        assert!(entity.facing_target().is_none());
    }

    #[test]
    fn attack_cancels_pending_walk_idle() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);
        entity.walk(&mut physics, Vec3::X, ms(0)).unwrap();
        assert!(entity.is_walk_idle_pending());

        entity.attack(ms(100));
        assert!(!entity.is_walk_idle_pending());

        // The walk debounce would have fired at 500 ms; attack holds until 1100 ms.
        tick(&mut entity, &mut physics, ms(600));
        assert_eq!(entity.state(), GroundState::Attack);
        tick(&mut entity, &mut physics, ms(1100));
        assert_eq!(entity.state(), GroundState::Idle);
    }

    #[test]
    fn assault_is_throttled_and_keeps_state() {
        let mut physics = PhysicsWorld::with_gravity(Vec3::ZERO);
        let mut entity = spawn(&mut physics);
        tick(&mut entity, &mut physics, ms(0));

        assert!(entity.assaulted(&mut physics, Vec3::new(3.0, 0.0, 4.0), ms(10)).unwrap());
        assert!(!entity.assaulted(&mut physics, Vec3::X, ms(200)).unwrap());
        assert_eq!(entity.state(), GroundState::Idle);

        tick(&mut entity, &mut physics, ms(26));
        let v = physics.linear_velocity(entity.body().unwrap().rigid_body).unwrap();
        let dir = v.normalize();
        assert!((dir - Vec3::new(0.6, 0.0, 0.8)).length() < 1e-3);

        assert!(entity.assaulted(&mut physics, Vec3::X, ms(510)).unwrap());
    }

    #[test]
    fn speed_is_capped_and_direction_kept() {
        let mut physics = PhysicsWorld::with_gravity(Vec3::ZERO);
        let mut entity = spawn(&mut physics);
        let handle = entity.body().unwrap().rigid_body;
        let fast = Vec3::new(30.0, 0.0, 40.0);
        physics.set_linear_velocity(handle, fast);

        tick(&mut entity, &mut physics, ms(16));
        let v = physics.linear_velocity(handle).unwrap();
        assert!(v.length() <= 15.0 + 1e-3);
        assert!((v.normalize() - fast.normalize()).length() < 1e-4);
    }

    #[test]
    fn state_change_cross_fades_clips() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);
        entity.walk(&mut physics, Vec3::Z, ms(0)).unwrap();

        let mut now = ms(0);
        let mut steps = 0;
        while entity.blend().is_some() {
            now += ms(16);
            tick(&mut entity, &mut physics, now);
            let idle = entity.mixer().by_name("idle").unwrap().weight;
            let walk = entity.mixer().by_name("walk").unwrap().weight;
            assert!((idle + walk - 1.0).abs() < 1e-5);
            steps += 1;
        }
        assert_eq!(steps, 10);
        assert!(!entity.mixer().by_name("idle").unwrap().playing);
        assert!(entity.mixer().by_name("walk").unwrap().playing);
    }

    #[test]
    fn attack_mid_blend_takes_over() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);
        entity.walk(&mut physics, Vec3::Z, ms(0)).unwrap();
        tick(&mut entity, &mut physics, ms(16));
        tick(&mut entity, &mut physics, ms(32));

        entity.attack(ms(40));
        let attack = entity.mixer().by_name("attack").unwrap();
        assert!(attack.playing && !attack.looping);
        assert_eq!(attack.weight, 0.0);
        // The idle clip the walk blend never finished fading is gone.
        assert!(!entity.mixer().by_name("idle").unwrap().playing);

        let mut now = ms(40);
        for _ in 0..4 {
            now += ms(16);
            tick(&mut entity, &mut physics, now);
        }
        assert!(entity.blend().is_none());
        assert_eq!(entity.mixer().by_name("attack").unwrap().weight, 1.0);
        assert!(!entity.mixer().by_name("walk").unwrap().playing);
    }
}
