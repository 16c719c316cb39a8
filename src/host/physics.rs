// src/host/physics.rs

use rapier3d::prelude::*;
use rapier3d::prelude::{Group, InteractionGroups};
use tracing::{info, warn};

pub const GROUP_GROUND: Group  = Group::from_bits_truncate(0b0001);
pub const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);
pub const GROUP_WALKER: Group  = Group::from_bits_truncate(0b0100);

/// Bodies further than this from the origin are considered exploded.
const WORLD_LIMIT: Real = 1_000.0;

pub struct PhysicsWorld {
    pub gravity: Vector<Real>, // gravity vector, Z-up
    pub pipeline: PhysicsPipeline, // physics pipeline
    pub island_manager: IslandManager, // manages islands of bodies
    pub broad_phase: DefaultBroadPhase, // broad-phase collision detection
    pub narrow_phase: NarrowPhase, // collision detection
    pub bodies: RigidBodySet, // for rigid bodies
    pub colliders: ColliderSet, // for collision shapes
    pub joints: ImpulseJointSet, // for constraints
    pub multibody_joints: MultibodyJointSet,// for articulated bodies
    pub ccd: CCDSolver, // continuous collision detection
    pub query_pipeline: QueryPipeline, // for raycasting
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            gravity: vector![0.0, 0.0, -9.81],
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Big static ground box whose top surface is exactly at z = 0.
    pub fn insert_ground(&mut self, half_extent: Real) -> RigidBodyHandle {
        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, 0.0, -0.1])
            .build();

        let ground_handle = self.bodies.insert(ground_rb);

        let ground_collider = ColliderBuilder::cuboid(half_extent, half_extent, 0.1)
            .collision_groups(InteractionGroups::new(
                GROUP_GROUND,
                GROUP_CHASSIS | GROUP_WALKER,
            ))
            .friction(1.2)
            .restitution(0.0)
            .build();

        self.colliders.insert_with_parent(ground_collider, ground_handle, &mut self.bodies);

        info!(
            bodies = self.bodies.len(),
            colliders = self.colliders.len(),
            "🌎 Ground inserted"
        );
        ground_handle
    }

    pub fn insert_body(&mut self, body: RigidBody, collider: Collider) -> RigidBodyHandle {
        let handle = self.bodies.insert(body); // insert rigid body
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies); // attach to body
        handle
    }

    /// Rebuild the query acceleration structure after bodies were added or
    /// teleported outside of `step`.
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }

    /// Nearest solid, non-sensor hit on the segment `from -> to`, skipping
    /// colliders attached to any of the `exclude` bodies.
    pub fn cast_segment(
        &self,
        from: Point<Real>,
        to: Point<Real>,
        exclude: &[RigidBodyHandle],
    ) -> Option<(ColliderHandle, Point<Real>, Vector<Real>)> {
        let delta = to - from;
        let length = delta.norm();
        if length <= Real::EPSILON {
            return None;
        }

        let ray = Ray::new(from, delta / length);
        let keep = |_handle: ColliderHandle, collider: &Collider| {
            collider.parent().map_or(true, |body| !exclude.contains(&body))
        };
        let filter = QueryFilter::default().exclude_sensors().predicate(&keep);

        let (handle, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &self.bodies,
            &self.colliders,
            &ray,
            length,
            true,
            filter,
        )?;

        Some((handle, ray.point_at(hit.time_of_impact), hit.normal))
    }

    pub fn step(&mut self, dt: Real) {
        let hooks = ();
        let events = ();

        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &hooks,
            &events,
        );

        self.reset_exploded_bodies();
    }

    /// Safety: prevent bodies from exploding to insane coordinates.
    fn reset_exploded_bodies(&mut self) {
        for (handle, body) in self.bodies.iter_mut() {
            let pos = *body.translation();

            let bad = !pos.iter().all(|c| c.is_finite()) || pos.iter().any(|c| c.abs() > WORLD_LIMIT);

            if bad {
                let safe = vector![0.0, 0.0, 2.0];
                body.set_translation(safe, true);
                body.set_linvel(Vector::zeros(), true);
                body.set_angvel(Vector::zeros(), true);

                warn!(?handle, "⚠️ Reset exploding body back to {:?}", safe);
            }
        }
    }
}
