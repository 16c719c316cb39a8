//! rapier3d-backed engine: one `RapierHost` implements every capability the
//! vehicle core needs.
//!
//! Per step:
//!   1. parented bodies (a seated driver) follow their parent kinematically
//!   2. each raycast-vehicle constraint updates, then anti-roll impulses
//!   3. the rapier pipeline steps
//!   4. attached wheel nodes are moved to their simulated centers

pub mod anti_roll;
pub mod physics;
pub mod scene;

use std::collections::HashMap;

use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};
use rapier3d::control::{DynamicRayCastVehicleController, WheelTuning as RapierWheelTuning};
use rapier3d::prelude::*;
use serde_json::Value;
use tracing::debug;

use crate::engine::{ConstraintId, ObjectId, PhysicsBackend, RayHit, SceneGraph, SpatialQuery, WheelMount, WheelTuning};

pub use physics::PhysicsWorld;
pub use scene::{Scene, SceneNode};

/// Up and forward axis indices for the controller (Z-up, Y-forward).
const UP_AXIS: usize = 2;
const FORWARD_AXIS: usize = 1;

struct WheelLink {
    object: ObjectId,
    steering: bool,
    roll_influence: f32,
}

struct VehicleConstraint {
    chassis: ObjectId,
    body: RigidBodyHandle,
    controller: DynamicRayCastVehicleController,
    wheels: Vec<WheelLink>,
}

pub struct RapierHost {
    pub physics: PhysicsWorld,
    pub scene: Scene,
    constraints: HashMap<ConstraintId, VehicleConstraint>,
    next_constraint: u32,
}

impl Default for RapierHost {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierHost {
    pub fn new() -> Self {
        Self {
            physics: PhysicsWorld::new(),
            scene: Scene::new(),
            constraints: HashMap::new(),
            next_constraint: 0,
        }
    }

    pub fn add_node(&mut self, node: SceneNode) -> ObjectId {
        self.scene.insert(node)
    }

    pub fn tag(&mut self, object: ObjectId, name: &str, value: Value) {
        if let Some(node) = self.scene.get_mut(object) {
            node.props.insert(name.to_string(), value);
        }
    }

    /// Give a node a rigid body placed at the node's current world transform.
    pub fn attach_body(&mut self, object: ObjectId, builder: RigidBodyBuilder, collider: Collider) -> RigidBodyHandle {
        let world = self.world_of(object);
        let handle = self.physics.insert_body(builder.position(world).build(), collider);
        self.scene.bind_body(object, handle);
        handle
    }

    pub fn add_ground(&mut self, half_extent: f32) -> ObjectId {
        let body = self.physics.insert_ground(half_extent);
        let mut node = SceneNode::new(
            "ground",
            None,
            Isometry3::identity(),
            Vector3::new(half_extent * 2.0, half_extent * 2.0, 0.2),
        );
        node.body = Some(body);
        self.scene.insert(node)
    }

    /// Switch every collider of an object's body on or off.
    pub fn set_colliders_enabled(&mut self, object: ObjectId, enabled: bool) {
        let Some(handle) = self.scene.body_of(object) else { return };
        let Some(body) = self.physics.bodies.get(handle) else { return };
        for collider in body.colliders().to_vec() {
            if let Some(c) = self.physics.colliders.get_mut(collider) {
                c.set_enabled(enabled);
            }
        }
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    fn world_of(&self, object: ObjectId) -> Isometry3<f32> {
        let Some(node) = self.scene.get(object) else {
            return Isometry3::identity();
        };
        match (node.parent, node.body) {
            (Some(parent), _) => self.world_of(parent) * node.local,
            (None, Some(body)) => self
                .physics
                .bodies
                .get(body)
                .map(|b| *b.position())
                .unwrap_or(node.local),
            (None, None) => node.local,
        }
    }

    fn body_mut(&mut self, object: ObjectId) -> Option<&mut RigidBody> {
        let handle = self.scene.body_of(object)?;
        self.physics.bodies.get_mut(handle)
    }

    fn body(&self, object: ObjectId) -> Option<&RigidBody> {
        let handle = self.scene.body_of(object)?;
        self.physics.bodies.get(handle)
    }

    fn wheel_mut(&mut self, constraint: ConstraintId, wheel: usize) -> Option<&mut rapier3d::control::Wheel> {
        self.constraints
            .get_mut(&constraint)?
            .controller
            .wheels_mut()
            .get_mut(wheel)
    }

    pub fn step(&mut self, dt: f32) {
        self.follow_parents();

        for c in self.constraints.values_mut() {
            c.controller.update_vehicle(
                dt,
                &mut self.physics.bodies,
                &self.physics.colliders,
                &self.physics.query_pipeline,
                QueryFilter::default().exclude_rigid_body(c.body),
            );

            let roll: Vec<f32> = c.wheels.iter().map(|w| w.roll_influence).collect();
            anti_roll::apply(&c.controller, c.body, &roll, &mut self.physics.bodies, dt);
        }

        self.physics.step(dt);
        self.sync_wheels();
    }

    /// Kinematic bodies under a parent are carried along with it.
    fn follow_parents(&mut self) {
        let carried: Vec<(RigidBodyHandle, Isometry3<f32>)> = self
            .scene
            .iter()
            .filter(|(_, n)| n.parent.is_some())
            .filter_map(|(id, n)| n.body.map(|b| (b, self.world_of(id))))
            .collect();

        for (handle, world) in carried {
            if let Some(body) = self.physics.bodies.get_mut(handle) {
                if body.is_kinematic() {
                    body.set_next_kinematic_position(world);
                }
            }
        }
    }

    fn sync_wheels(&mut self) {
        let mut placed: Vec<(ObjectId, Isometry3<f32>)> = Vec::new();

        for c in self.constraints.values() {
            let Some(chassis) = self.physics.bodies.get(c.body) else { continue };
            let chassis_rotation = chassis.position().rotation;

            for (link, wheel) in c.wheels.iter().zip(c.controller.wheels()) {
                let steer = if link.steering {
                    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), wheel.steering)
                } else {
                    UnitQuaternion::identity()
                };
                let center = wheel.center();
                placed.push((link.object, Isometry3::from_parts(center.coords.into(), chassis_rotation * steer)));
            }
        }

        for (object, world) in placed {
            if let Some(node) = self.scene.get_mut(object) {
                if node.parent.is_none() {
                    node.local = world;
                }
            }
        }
    }
}

impl PhysicsBackend for RapierHost {
    fn create_vehicle_constraint(&mut self, chassis: ObjectId) -> ConstraintId {
        let body = self.scene.body_of(chassis).unwrap_or_else(RigidBodyHandle::invalid);
        let mut controller = DynamicRayCastVehicleController::new(body);
        controller.index_up_axis = UP_AXIS;
        controller.index_forward_axis = FORWARD_AXIS;

        let id = ConstraintId(self.next_constraint);
        self.next_constraint += 1;
        self.constraints.insert(id, VehicleConstraint { chassis, body, controller, wheels: Vec::new() });

        debug!(constraint = id.0, chassis = chassis.0, "vehicle constraint created");
        id
    }

    fn remove_vehicle_constraint(&mut self, constraint: ConstraintId) {
        if let Some(c) = self.constraints.remove(&constraint) {
            debug!(constraint = constraint.0, chassis = c.chassis.0, "vehicle constraint removed");
        }
    }

    fn add_wheel(&mut self, constraint: ConstraintId, mount: &WheelMount) -> usize {
        let Some(c) = self.constraints.get_mut(&constraint) else {
            return usize::MAX;
        };
        c.controller.add_wheel(
            mount.attach_point,
            mount.down,
            mount.axle,
            mount.rest_length,
            mount.radius,
            &RapierWheelTuning::default(),
        );
        c.wheels.push(WheelLink { object: mount.object, steering: mount.steering, roll_influence: 0.0 });
        c.wheels.len() - 1
    }

    fn set_wheel_tuning(&mut self, constraint: ConstraintId, wheel: usize, tuning: &WheelTuning) {
        if let Some(w) = self.wheel_mut(constraint, wheel) {
            w.friction_slip = tuning.friction;
            w.damping_relaxation = tuning.damping;
            w.damping_compression = tuning.compression;
            w.suspension_stiffness = tuning.stiffness;
        }
        if let Some(link) = self.constraints.get_mut(&constraint).and_then(|c| c.wheels.get_mut(wheel)) {
            link.roll_influence = tuning.roll_influence;
        }
    }

    fn apply_braking(&mut self, constraint: ConstraintId, wheel: usize, value: f32) {
        if let Some(w) = self.wheel_mut(constraint, wheel) {
            w.brake = value;
        }
    }

    fn apply_engine_force(&mut self, constraint: ConstraintId, wheel: usize, value: f32) {
        if let Some(w) = self.wheel_mut(constraint, wheel) {
            w.engine_force = value;
        }
    }

    fn set_steering_value(&mut self, constraint: ConstraintId, wheel: usize, value: f32) {
        if let Some(w) = self.wheel_mut(constraint, wheel) {
            w.steering = value;
        }
    }

    fn wheel_position(&self, constraint: ConstraintId, wheel: usize) -> Option<Point3<f32>> {
        self.constraints
            .get(&constraint)?
            .controller
            .wheels()
            .get(wheel)
            .map(|w| w.center())
    }

    fn suspend_dynamics(&mut self, body: ObjectId) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_linvel(Vector::zeros(), false);
            rb.set_angvel(Vector::zeros(), false);
            rb.set_body_type(RigidBodyType::KinematicPositionBased, true);
        }
    }

    fn restore_dynamics(&mut self, body: ObjectId) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_body_type(RigidBodyType::Dynamic, true);
        }
    }

    fn linear_velocity(&self, body: ObjectId) -> Vector3<f32> {
        self.body(body).map(|b| *b.linvel()).unwrap_or_else(Vector3::zeros)
    }

    fn angular_velocity(&self, body: ObjectId) -> Vector3<f32> {
        self.body(body).map(|b| *b.angvel()).unwrap_or_else(Vector3::zeros)
    }

    fn set_linear_velocity(&mut self, body: ObjectId, velocity: Vector3<f32>) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_linvel(velocity, true);
        }
    }

    fn set_angular_velocity(&mut self, body: ObjectId, velocity: Vector3<f32>) {
        if let Some(rb) = self.body_mut(body) {
            rb.set_angvel(velocity, true);
        }
    }
}

impl SpatialQuery for RapierHost {
    fn ray_cast(&self, from: Point3<f32>, to: Point3<f32>, exclude: &[ObjectId]) -> Option<RayHit> {
        let excluded: Vec<RigidBodyHandle> = exclude.iter().filter_map(|o| self.scene.body_of(*o)).collect();
        let (collider, point, normal) = self.physics.cast_segment(from, to, &excluded)?;

        let object = self
            .physics
            .colliders
            .get(collider)
            .and_then(|c| c.parent())
            .and_then(|b| self.scene.object_of(b))
            .unwrap_or(ObjectId(u32::MAX));

        Some(RayHit { object, point, normal })
    }
}

impl SceneGraph for RapierHost {
    fn children(&self, object: ObjectId) -> Vec<ObjectId> {
        self.scene.children(object)
    }

    fn property(&self, object: ObjectId, name: &str) -> Option<&Value> {
        self.scene.get(object)?.props.get(name)
    }

    fn parent(&self, object: ObjectId) -> Option<ObjectId> {
        self.scene.get(object)?.parent
    }

    fn set_parent(&mut self, object: ObjectId, parent: Option<ObjectId>) {
        if let Some(p) = parent {
            if self.scene.is_ancestor(object, p) {
                debug!(object = object.0, parent = p.0, "refusing cyclic parent");
                return;
            }
        }

        let world = self.world_of(object);
        let parent_world = parent.map(|p| self.world_of(p));
        if let Some(node) = self.scene.get_mut(object) {
            node.parent = parent;
            node.local = match parent_world {
                Some(pw) => pw.inverse() * world,
                None => world,
            };
        }
    }

    fn world_transform(&self, object: ObjectId) -> Isometry3<f32> {
        self.world_of(object)
    }

    fn set_world_transform(&mut self, object: ObjectId, transform: Isometry3<f32>) {
        let parent_world = self.scene.get(object).and_then(|n| n.parent).map(|p| self.world_of(p));
        let Some(node) = self.scene.get_mut(object) else { return };

        node.local = match parent_world {
            Some(pw) => pw.inverse() * transform,
            None => transform,
        };

        if let Some(rb) = node.body.and_then(|b| self.physics.bodies.get_mut(b)) {
            rb.set_position(transform, true);
        }
    }

    fn set_world_position(&mut self, object: ObjectId, position: Point3<f32>) {
        let mut world = self.world_of(object);
        world.translation = position.coords.into();
        self.set_world_transform(object, world);
    }

    fn local_transform(&self, object: ObjectId) -> Isometry3<f32> {
        match self.scene.get(object) {
            Some(node) if node.parent.is_none() => self.world_of(object),
            Some(node) => node.local,
            None => Isometry3::identity(),
        }
    }

    fn set_local_transform(&mut self, object: ObjectId, transform: Isometry3<f32>) {
        let parented = self.scene.get(object).is_some_and(|n| n.parent.is_some());
        if parented {
            if let Some(node) = self.scene.get_mut(object) {
                node.local = transform;
            }
            if let Some(handle) = self.scene.body_of(object) {
                let world = self.world_of(object);
                if let Some(rb) = self.physics.bodies.get_mut(handle) {
                    rb.set_position(world, true);
                }
            }
        } else {
            self.set_world_transform(object, transform);
        }
    }

    fn dimensions(&self, object: ObjectId) -> Vector3<f32> {
        self.scene.get(object).map(|n| n.dims).unwrap_or_else(Vector3::zeros)
    }

    fn local_scale(&self, object: ObjectId) -> Vector3<f32> {
        self.scene.get(object).map(|n| n.scale).unwrap_or_else(|| Vector3::repeat(1.0))
    }
}
