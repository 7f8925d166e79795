//! Flying avatar: a buoyant glider kept aloft by attitude-driven lift.
//!
//! The handheld streams pitch/roll samples; the controller tweens the body
//! toward the requested attitude and the lift model turns the resulting
//! orientation into force. Hits tumble the avatar and lock steering for the
//! stun window; the last hit sinks it out of view and frees its resources.

pub mod lift;
pub mod machine;

use engine_core::{quat_from_yaw_pitch_roll, yaw_pitch_roll, PlayerId, Quat, Throttle, Tint, Vec3};
use physics::{BodyDesc, BoxCollider, CollisionGroup, PhysicsBody, PhysicsWorld};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::FRAC_PI_2;
use std::time::Duration;

use crate::assets::{AssetLoader, Visual, FLYING_CHICKEN};
use crate::config::FlightTuning;
use crate::error::ControllerError;
use crate::tween::Tween;

pub use machine::{EntryAction, FlightEvent, FlightMachine, FlightState, Transition};

/// Spawn parameters.
#[derive(Debug, Clone)]
pub struct FlightParams {
    pub position: Vec3,
    pub owner: PlayerId,
    pub tint: Tint,
}

impl Default for FlightParams {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            owner: PlayerId::default(),
            tint: Tint::WHITE,
        }
    }
}

pub struct FlightEntity {
    name: String,
    params: FlightParams,
    tuning: FlightTuning,
    machine: FlightMachine,
    body: Option<PhysicsBody>,
    visual: Option<Visual>,
    /// In-flight attitude tween; the latest `set_attitude` replaces it.
    attitude: Option<Tween<Quat>>,
    /// Exit animation started on death.
    exit: Option<Tween<Vec3>>,
    lift_throttle: Throttle,
    died_at: Option<Duration>,
    disposed: bool,
    rng: StdRng,
}

impl FlightEntity {
    pub fn new(name: impl Into<String>, params: FlightParams, tuning: FlightTuning) -> Self {
        Self::with_rng(name, params, tuning, StdRng::from_entropy())
    }

    /// Same as `new` with a reproducible tumble.
    pub fn with_seed(name: impl Into<String>, params: FlightParams, tuning: FlightTuning, seed: u64) -> Self {
        Self::with_rng(name, params, tuning, StdRng::seed_from_u64(seed))
    }

    fn with_rng(name: impl Into<String>, params: FlightParams, tuning: FlightTuning, rng: StdRng) -> Self {
        Self {
            name: name.into(),
            params,
            machine: FlightMachine::new(tuning.health, tuning.stun()),
            lift_throttle: Throttle::new(tuning.lift_interval()),
            tuning,
            body: None,
            visual: None,
            attitude: None,
            exit: None,
            died_at: None,
            disposed: false,
            rng,
        }
    }

    /// Load the model and create the hit box. Runs at most once.
    pub async fn init<L: AssetLoader>(&mut self, loader: &L, physics: &mut PhysicsWorld) -> Result<(), ControllerError> {
        if self.body.is_some() || self.disposed {
            log::debug!("{} already initialised", self.name);
            return Ok(());
        }

        let asset = loader.load(FLYING_CHICKEN).await?;

        let desc = BodyDesc::new(self.params.position, CollisionGroup::Flyer)
            .with_collider(BoxCollider::sized(0.3, 0.48, 0.76).restitution(0.5))
            .with_collider(
                BoxCollider::sized(0.8, 0.1, 0.23)
                    .offset(Vec3::new(0.0, -0.1, -0.02))
                    .mass(0.1),
            );
        let body = physics.add_body(&desc);

        let mut visual = Visual::from_asset(&asset).placed(
            Vec3::new(0.0, -0.1, -0.2),
            Quat::from_rotation_y(FRAC_PI_2),
            0.15,
        );
        if !visual.tint_node("body", self.params.tint) {
            log::warn!("{} has no 'body' node to tint", asset.id);
        }

        self.body = Some(body);
        self.visual = Some(visual);
        log::info!("{} ready for {}", self.name, self.params.owner);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &PlayerId {
        &self.params.owner
    }

    pub fn tint(&self) -> Tint {
        self.params.tint
    }

    pub fn state(&self) -> FlightState {
        self.machine.state()
    }

    pub fn health(&self) -> u32 {
        self.machine.health()
    }

    /// Simulation time of death.
    pub fn died_at(&self) -> Option<Duration> {
        self.died_at
    }

    pub fn health_lock(&self) -> bool {
        self.machine.health_lock
    }

    /// Freeze health (training and showcase modes).
    pub fn set_health_lock(&mut self, locked: bool) {
        self.machine.health_lock = locked;
    }

    pub fn is_initialized(&self) -> bool {
        self.body.is_some()
    }

    /// Whether the exit animation finished and resources were released.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn body(&self) -> Option<&PhysicsBody> {
        self.body.as_ref()
    }

    pub fn visual(&self) -> Option<&Visual> {
        self.visual.as_ref()
    }

    /// Steer toward `(pitch, roll)` in radians.
    pub fn set_attitude(&mut self, pitch: f32, roll: f32) {
        if self.state() == FlightState::Attacked || self.machine.is_done() {
            return;
        }
        if self.body.is_none() {
            return;
        }

        let max = self.tuning.max_angle();
        let pitch = (-pitch).clamp(-max, max);
        let roll = (-roll).clamp(-max, max);
        let yaw = roll / 2.0;

        let target = quat_from_yaw_pitch_roll(yaw, pitch, roll);
        self.attitude = Some(Tween::new(target, self.tuning.turn_speed_ratio));
    }

    /// Target of the attitude tween currently in flight.
    pub fn attitude_target(&self) -> Option<Quat> {
        self.attitude.as_ref().map(Tween::target)
    }

    /// Register a hit.
    pub fn attacked(&mut self, physics: &mut PhysicsWorld, now: Duration) {
        if self.machine.is_done() || self.body.is_none() {
            return;
        }
        if let Some(transition) = self.machine.send(FlightEvent::Attacked, now) {
            self.run_entry(&transition, physics, now);
        }
    }

    fn run_entry(&mut self, transition: &Transition, physics: &mut PhysicsWorld, now: Duration) {
        if transition.target != FlightState::Idle {
            self.attitude = None;
        }
        for action in transition.entry {
            match action {
                // Applied by the machine.
                EntryAction::MinusHealth => {}
                EntryAction::Tumble => self.tumble(physics),
                EntryAction::Die => self.die(physics, now),
            }
        }
    }

    fn tumble(&mut self, physics: &mut PhysicsWorld) {
        let Some(body) = &self.body else { return };
        let spin = self.tuning.tumble_spin.abs();
        let angular = Vec3::new(
            self.rng.gen_range(-spin..=spin),
            spin,
            self.rng.gen_range(-spin..=spin),
        );
        physics.set_angular_velocity(body.rigid_body, angular);
    }

    fn die(&mut self, physics: &mut PhysicsWorld, now: Duration) {
        let Some(body) = &self.body else { return };
        self.died_at = Some(now);

        let start = physics.translation(body.rigid_body).unwrap_or(self.params.position);
        let drop = Vec3::new(0.0, -self.tuning.exit_drop, 0.0);
        self.exit = Some(Tween::new(start + drop, 1.0).starting_at(start));
        log::info!("{} ({}) is out at {:?}", self.name, self.params.owner, now);
    }

    /// Per-frame work before the physics step.
    pub fn pre_step(&mut self, physics: &mut PhysicsWorld, now: Duration, dt: f32) {
        let Some(handle) = self.body.as_ref().map(|b| b.rigid_body) else {
            return;
        };

        if let Some(transition) = self.machine.update(now) {
            self.run_entry(&transition, physics, now);
        }

        if let Some(tween) = &mut self.attitude {
            if let Some(current) = physics.rotation(handle) {
                physics.set_rotation(handle, tween.advance(current, dt));
            }
            if tween.is_finished() {
                self.attitude = None;
            }
        }

        let exit_finished = match &mut self.exit {
            Some(tween) => {
                if let Some(current) = physics.translation(handle) {
                    physics.set_translation(handle, tween.advance(current, dt));
                }
                tween.is_finished()
            }
            None => false,
        };
        if exit_finished {
            self.dispose(physics);
            return;
        }

        if self.lift_throttle.try_fire(now) {
            self.apply_lift(physics);
        }
    }

    fn apply_lift(&mut self, physics: &mut PhysicsWorld) {
        let Some(body) = &self.body else { return };
        let (Some(rotation), Some(velocity)) = (
            physics.rotation(body.rigid_body),
            physics.linear_velocity(body.rigid_body),
        ) else {
            return;
        };

        let (_, pitch, roll) = yaw_pitch_roll(rotation);
        let force = lift::lift_force(
            velocity,
            pitch,
            roll,
            self.tuning.max_speed,
            self.tuning.lift_coefficient,
        );
        physics.apply_force(body.rigid_body, force);
    }

    /// Per-frame work after the physics step: pin depth and stop idle spin.
    pub fn post_step(&mut self, physics: &mut PhysicsWorld) {
        let Some(body) = &self.body else { return };
        let handle = body.rigid_body;

        if let Some(mut position) = physics.translation(handle) {
            if position.z != 0.0 {
                position.z = 0.0;
                physics.set_translation(handle, position);
            }
        }

        if self.state() == FlightState::Idle {
            physics.set_angular_velocity(handle, Vec3::ZERO);
        }
    }

    fn dispose(&mut self, physics: &mut PhysicsWorld) {
        if let Some(body) = self.body.take() {
            physics.remove_body(body.rigid_body);
        }
        self.visual = None;
        self.exit = None;
        self.disposed = true;
        log::debug!("{} disposed", self.name);
    }

    /// Release resources without the exit animation (round teardown).
    pub fn despawn(&mut self, physics: &mut PhysicsWorld) {
        self.dispose(physics);
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

    fn spawn(physics: &mut PhysicsWorld) -> FlightEntity {
        let params = FlightParams {
            position: Vec3::new(0.0, 2.0, 0.0),
            owner: PlayerId::new("p1"),
            tint: Tint::rgb(1.0, 0.0, 0.0),
        };
        let mut entity = FlightEntity::with_seed("chicken-0", params, FlightTuning::default(), 7);
        pollster::block_on(entity.init(&MemoryLoader::builtin(), physics)).unwrap();
        entity
    }

    /// Drive frames from `from` until `to` (exclusive) at 60 fps.
    fn run(entity: &mut FlightEntity, physics: &mut PhysicsWorld, from: Duration, to: Duration) -> Duration {
        let step = Duration::from_secs_f32(DT);
        let mut now = from;
        while now < to {
            now += step;
            entity.pre_step(physics, now, DT);
            physics.step(DT);
            entity.post_step(physics);
        }
        now
    }

    #[test]
    fn uninitialised_entity_ignores_everything() {
        let mut physics = PhysicsWorld::new();
        let mut entity = FlightEntity::new("ghost", FlightParams::default(), FlightTuning::default());
        entity.set_attitude(0.3, 0.3);
        entity.attacked(&mut physics, ms(0));
        entity.pre_step(&mut physics, ms(16), DT);
        entity.post_step(&mut physics);
        assert_eq!(entity.state(), FlightState::Idle);
        assert_eq!(entity.health(), 3);
        assert!(entity.attitude_target().is_none());
    }

    #[test]
    fn init_runs_once_and_tints_body() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);
        let first = entity.body().unwrap().rigid_body;
        pollster::block_on(entity.init(&MemoryLoader::builtin(), &mut physics)).unwrap();
        assert_eq!(entity.body().unwrap().rigid_body, first);
        assert_eq!(physics.rigid_body_set.len(), 1);
        let body_node = entity.visual().unwrap().node("body").unwrap();
        assert_eq!(body_node.tint, Some(Tint::rgb(1.0, 0.0, 0.0)));
    }

    #[test]
    fn init_propagates_missing_model() {
        let mut physics = PhysicsWorld::new();
        let mut entity = FlightEntity::new("c", FlightParams::default(), FlightTuning::default());
        let result = pollster::block_on(entity.init(&MemoryLoader::new(), &mut physics));
        assert!(matches!(result, Err(ControllerError::Asset(_))));
        assert!(!entity.is_initialized());
    }

    #[test]
    fn attitude_is_clamped_and_inverted() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);
        entity.set_attitude(90_f32.to_radians(), -90_f32.to_radians());

        let target = entity.attitude_target().unwrap();
        let (yaw, pitch, roll) = yaw_pitch_roll(target);
        let max = 45_f32.to_radians();
        assert!((pitch + max).abs() < 1e-4);
        assert!((roll - max).abs() < 1e-4);
        assert!((yaw - max / 2.0).abs() < 1e-4);
    }

    #[test]
    fn latest_attitude_call_wins() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);
        entity.set_attitude(0.2, 0.0);
        entity.set_attitude(-0.1, 0.0);
        let (_, pitch, _) = yaw_pitch_roll(entity.attitude_target().unwrap());
        assert!((pitch - 0.1).abs() < 1e-4);
    }

    #[test]
    fn attitude_tween_rotates_body() {
        let mut physics = PhysicsWorld::with_gravity(Vec3::ZERO);
        let mut entity = spawn(&mut physics);
        entity.set_attitude(-0.3, 0.0);
        let handle = entity.body().unwrap().rigid_body;

        entity.pre_step(&mut physics, ms(16), DT);
        let early = physics.rotation(handle).unwrap();
        let (_, early_pitch, _) = yaw_pitch_roll(early);
        assert!(early_pitch > 0.0 && early_pitch < 0.3);
    }

    #[test]
    fn attitude_ignored_while_attacked() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);
        entity.attacked(&mut physics, ms(0));
        assert_eq!(entity.state(), FlightState::Attacked);
        entity.set_attitude(0.3, 0.3);
        assert!(entity.attitude_target().is_none());
    }

    #[test]
    fn attitude_ignored_when_dead() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);
        for i in 0..3 {
            entity.attacked(&mut physics, ms(i * 10));
        }
        assert_eq!(entity.state(), FlightState::Dead);
        entity.set_attitude(0.3, 0.3);
        assert!(entity.attitude_target().is_none());
    }

    #[test]
    fn zero_tumble_spin_from_tuning_still_takes_hits() {
        let tuning = crate::config::Tuning::parse("(flight: (tumble_spin: 0.0, max_speed: 0.0))").unwrap();
        let mut physics = PhysicsWorld::new();
        let mut entity = FlightEntity::with_seed("chicken-z", FlightParams::default(), tuning.flight, 3);
        pollster::block_on(entity.init(&MemoryLoader::builtin(), &mut physics)).unwrap();

        entity.attacked(&mut physics, ms(0));
        let handle = entity.body().unwrap().rigid_body;
        assert_eq!(physics.angular_velocity(handle).unwrap(), Vec3::ZERO);

        run(&mut entity, &mut physics, ms(0), ms(100));
        assert!(physics.translation(handle).unwrap().is_finite());
        for i in 1..3 {
            entity.attacked(&mut physics, ms(100 + i));
        }
        assert_eq!(entity.state(), FlightState::Dead);
    }

    #[test]
    fn hit_tumbles_with_bounded_spin() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);
        entity.attacked(&mut physics, ms(0));
        let spin = physics.angular_velocity(entity.body().unwrap().rigid_body).unwrap();
        assert_eq!(spin.y, 10.0);
        assert!(spin.x.abs() <= 10.0 && spin.z.abs() <= 10.0);
        assert_eq!(entity.health(), 2);
    }

    #[test]
    fn health_lock_keeps_health_but_tumbles() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);
        entity.set_health_lock(true);
        entity.attacked(&mut physics, ms(0));
        assert_eq!(entity.state(), FlightState::Attacked);
        assert_eq!(entity.health(), 3);
        let spin = physics.angular_velocity(entity.body().unwrap().rigid_body).unwrap();
        assert_eq!(spin.y, 10.0);
    }

    #[test]
    fn recovers_to_idle_after_stun() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);
        entity.attacked(&mut physics, ms(0));
        let now = run(&mut entity, &mut physics, ms(0), ms(1950));
        assert_eq!(entity.state(), FlightState::Attacked);
        run(&mut entity, &mut physics, now, ms(2020));
        assert_eq!(entity.state(), FlightState::Idle);
    }

    #[test]
    fn idle_stops_spin_and_pins_depth() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);
        let handle = entity.body().unwrap().rigid_body;
        physics.set_angular_velocity(handle, Vec3::new(1.0, 2.0, 3.0));
        physics.set_linear_velocity(handle, Vec3::new(0.0, 0.0, 5.0));
        run(&mut entity, &mut physics, ms(0), ms(100));
        assert_eq!(physics.angular_velocity(handle).unwrap(), Vec3::ZERO);
        assert_eq!(physics.translation(handle).unwrap().z, 0.0);
    }

    #[test]
    fn lift_pushes_toward_pitch() {
        let mut physics = PhysicsWorld::with_gravity(Vec3::ZERO);
        let mut entity = spawn(&mut physics);
        let handle = entity.body().unwrap().rigid_body;
        physics.set_rotation(handle, quat_from_yaw_pitch_roll(0.0, 0.3, 0.0));

        entity.pre_step(&mut physics, ms(16), DT);
        physics.step(DT);
        assert!(physics.linear_velocity(handle).unwrap().y > 0.0);
    }

    #[test]
    fn full_life_cycle_ends_disposed() {
        let mut physics = PhysicsWorld::new();
        let mut entity = spawn(&mut physics);

        entity.attacked(&mut physics, ms(0));
        assert_eq!((entity.state(), entity.health()), (FlightState::Attacked, 2));

        let now = run(&mut entity, &mut physics, ms(0), ms(2050));
        assert_eq!(entity.state(), FlightState::Idle);

        entity.attacked(&mut physics, now);
        entity.attacked(&mut physics, now);
        assert_eq!(entity.state(), FlightState::Dead);
        assert_eq!(entity.died_at(), Some(now));
        assert!(!entity.is_disposed());

        // Further hits change nothing.
        entity.attacked(&mut physics, now);
        assert_eq!(entity.health(), 1);

        run(&mut entity, &mut physics, now, now + ms(1100));
        assert!(entity.is_disposed());
        assert!(entity.visual().is_none());
        assert_eq!(physics.rigid_body_set.len(), 0);
    }
}
