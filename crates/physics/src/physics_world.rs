//! Physics world management with Rapier3D.

use crate::collision::{CollisionGroup, PhysicsBody};
use engine_core::{Quat, Transform, Vec3};
use rapier3d::na::{Quaternion, UnitQuaternion};
use rapier3d::prelude::*;

/// One box collider of a (possibly compound) body.
#[derive(Debug, Clone, Copy)]
pub struct BoxCollider {
    pub half_extents: Vec3,
    /// Offset from the body origin.
    pub offset: Vec3,
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl BoxCollider {
    /// Box of the given full size (width, height, depth) with unit mass.
    pub fn sized(width: f32, height: f32, depth: f32) -> Self {
        Self {
            half_extents: Vec3::new(width, height, depth) * 0.5,
            offset: Vec3::ZERO,
            mass: 1.0,
            friction: 0.5,
            restitution: 0.0,
        }
    }

    pub fn offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }
}

/// Description of a dynamic body to create.
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub position: Vec3,
    pub rotation: Quat,
    /// Keep the body upright; orientation is then driven kinematically.
    pub lock_rotations: bool,
    pub group: CollisionGroup,
    pub colliders: Vec<BoxCollider>,
}

impl BodyDesc {
    pub fn new(position: Vec3, group: CollisionGroup) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            lock_rotations: false,
            group,
            colliders: Vec::new(),
        }
    }

    pub fn with_collider(mut self, collider: BoxCollider) -> Self {
        self.colliders.push(collider);
        self
    }

    pub fn lock_rotations(mut self) -> Self {
        self.lock_rotations = true;
        self
    }
}

fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_rotation(q: Quat) -> Rotation<Real> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

fn from_rotation(rot: &Rotation<Real>) -> Quat {
    Quat::from_xyzw(rot.i, rot.j, rot.k, rot.w)
}

/// Main physics world containing all simulation state.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Create a new physics world with default gravity.
    pub fn new() -> Self {
        Self::with_gravity(Vec3::new(0.0, -9.81, 0.0))
    }

    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            gravity: to_vector(gravity),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Step the physics simulation by `dt` seconds.
    ///
    /// Forces added since the previous step act for this step only.
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
        for (_, body) in self.rigid_body_set.iter_mut() {
            body.reset_forces(false);
        }
    }

    /// Create a dynamic body with its colliders.
    pub fn add_body(&mut self, desc: &BodyDesc) -> PhysicsBody {
        let mut builder = RigidBodyBuilder::dynamic()
            .translation(to_vector(desc.position))
            .rotation(to_rotation(desc.rotation).scaled_axis());
        if desc.lock_rotations {
            builder = builder.lock_rotations();
        }
        let handle = self.rigid_body_set.insert(builder.build());

        let groups = desc.group.interaction_groups();
        let colliders = desc
            .colliders
            .iter()
            .map(|c| {
                let collider = ColliderBuilder::cuboid(c.half_extents.x, c.half_extents.y, c.half_extents.z)
                    .translation(to_vector(c.offset))
                    .mass(c.mass)
                    .friction(c.friction)
                    .restitution(c.restitution)
                    .collision_groups(groups)
                    .build();
                self.collider_set
                    .insert_with_parent(collider, handle, &mut self.rigid_body_set)
            })
            .collect();

        log::debug!("Added body {:?} with {} collider(s)", handle, desc.colliders.len());
        PhysicsBody::with_colliders(handle, colliders)
    }

    /// Add a ground plane collider (flat Y=0 half-space).
    pub fn add_ground_plane(&mut self) -> ColliderHandle {
        let collider = ColliderBuilder::halfspace(Vector::y_axis())
            .collision_groups(CollisionGroup::Environment.interaction_groups())
            .build();
        self.collider_set.insert(collider)
    }

    /// Get the transform of a rigid body.
    pub fn body_transform(&self, handle: RigidBodyHandle) -> Option<Transform> {
        self.rigid_body_set.get(handle).map(|body| Transform {
            position: from_vector(body.translation()),
            rotation: from_rotation(body.rotation()),
            scale: Vec3::ONE,
        })
    }

    pub fn translation(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set
            .get(handle)
            .map(|body| from_vector(body.translation()))
    }

    pub fn set_translation(&mut self, handle: RigidBodyHandle, position: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_translation(to_vector(position), true);
        }
    }

    pub fn rotation(&self, handle: RigidBodyHandle) -> Option<Quat> {
        self.rigid_body_set
            .get(handle)
            .map(|body| from_rotation(body.rotation()))
    }

    pub fn set_rotation(&mut self, handle: RigidBodyHandle, rotation: Quat) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_rotation(to_rotation(rotation), true);
        }
    }

    pub fn linear_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set
            .get(handle)
            .map(|body| from_vector(body.linvel()))
    }

    pub fn set_linear_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_linvel(to_vector(velocity), true);
        }
    }

    pub fn angular_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set
            .get(handle)
            .map(|body| from_vector(body.angvel()))
    }

    pub fn set_angular_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_angvel(to_vector(velocity), true);
        }
    }

    /// Apply a force at the body's center of mass for the next step.
    pub fn apply_force(&mut self, handle: RigidBodyHandle, force: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.add_force(to_vector(force), true);
        }
    }

    /// Apply an impulse to a dynamic body.
    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.apply_impulse(to_vector(impulse), true);
        }
    }

    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set.contains(handle)
    }

    /// Remove a rigid body and its colliders.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }
}
