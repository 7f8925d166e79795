//! Collision groups and filtering.

use rapier3d::prelude::*;

/// Collision groups for different entity types.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionGroup {
    /// Static environment (ground plane, ice floes)
    Environment = 1 << 0,
    /// Flying avatars
    Flyer = 1 << 1,
    /// Ground avatars
    Walker = 1 << 2,
}

impl CollisionGroup {
    /// Membership and filter for this group.
    pub fn membership_filter(self) -> (Group, Group) {
        match self {
            Self::Environment => Self::environment(),
            Self::Flyer => Self::flyer(),
            Self::Walker => Self::walker(),
        }
    }

    pub fn interaction_groups(self) -> InteractionGroups {
        let (membership, filter) = self.membership_filter();
        InteractionGroups::new(membership, filter)
    }

    /// Create a collision group for environment.
    pub fn environment() -> (Group, Group) {
        let membership = Group::from_bits_retain(Self::Environment as u32);
        let filter = Group::ALL;
        (membership, filter)
    }

    /// Flyers bump into each other and the environment, never into walkers.
    pub fn flyer() -> (Group, Group) {
        let membership = Group::from_bits_retain(Self::Flyer as u32);
        let filter = Group::from_bits_retain(Self::Environment as u32 | Self::Flyer as u32);
        (membership, filter)
    }

    /// Walkers shove each other around on the environment.
    pub fn walker() -> (Group, Group) {
        let membership = Group::from_bits_retain(Self::Walker as u32);
        let filter = Group::from_bits_retain(Self::Environment as u32 | Self::Walker as u32);
        (membership, filter)
    }
}

/// Handles an avatar owns inside the physics world.
#[derive(Debug, Clone)]
pub struct PhysicsBody {
    pub rigid_body: RigidBodyHandle,
    pub colliders: Vec<ColliderHandle>,
}

impl PhysicsBody {
    pub fn with_colliders(rigid_body: RigidBodyHandle, colliders: Vec<ColliderHandle>) -> Self {
        Self {
            rigid_body,
            colliders,
        }
    }
}
