//! Capabilities the vehicle core consumes from the host engine.
//!
//! The core never talks to a physics library directly. It sees the world
//! through four narrow traits: rigid bodies + vehicle constraints, ray casts,
//! the scene graph, and (in `input`) logical input signals. `Engine` bundles
//! the first three so tick functions take a single `&mut impl Engine`.

use nalgebra::{Isometry3, Point3, Vector3};
use serde_json::Value;

/// Handle to a scene object. Objects that carry a rigid body use the same id
/// for body operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// Handle to an attached vehicle constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(pub u32);

/// Everything a constraint needs to register one wheel. Directions and the
/// attachment point are in chassis-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelMount {
    pub object: ObjectId,
    pub attach_point: Point3<f32>,
    pub down: Vector3<f32>,
    pub axle: Vector3<f32>,
    pub rest_length: f32,
    pub radius: f32,
    pub steering: bool,
}

/// Per-wheel suspension and tire parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelTuning {
    pub friction: f32,
    pub damping: f32,
    pub compression: f32,
    pub stiffness: f32,
    pub roll_influence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub object: ObjectId,
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
}

/// Rigid bodies and the raycast-vehicle constraint.
pub trait PhysicsBackend {
    fn create_vehicle_constraint(&mut self, chassis: ObjectId) -> ConstraintId;
    fn remove_vehicle_constraint(&mut self, constraint: ConstraintId);

    /// Registers a wheel and returns its index on the constraint.
    fn add_wheel(&mut self, constraint: ConstraintId, mount: &WheelMount) -> usize;
    fn set_wheel_tuning(&mut self, constraint: ConstraintId, wheel: usize, tuning: &WheelTuning);

    fn apply_braking(&mut self, constraint: ConstraintId, wheel: usize, value: f32);
    fn apply_engine_force(&mut self, constraint: ConstraintId, wheel: usize, value: f32);
    fn set_steering_value(&mut self, constraint: ConstraintId, wheel: usize, value: f32);

    /// Engine-computed world position of a wheel, if the wheel exists.
    fn wheel_position(&self, constraint: ConstraintId, wheel: usize) -> Option<Point3<f32>>;

    /// Stop simulating a body; it keeps colliding as a static proxy.
    fn suspend_dynamics(&mut self, body: ObjectId);
    fn restore_dynamics(&mut self, body: ObjectId);

    fn linear_velocity(&self, body: ObjectId) -> Vector3<f32>;
    fn angular_velocity(&self, body: ObjectId) -> Vector3<f32>;
    fn set_linear_velocity(&mut self, body: ObjectId, velocity: Vector3<f32>);
    fn set_angular_velocity(&mut self, body: ObjectId, velocity: Vector3<f32>);
}

pub trait SpatialQuery {
    /// Nearest hit on the segment `from -> to`, ignoring the listed objects.
    fn ray_cast(&self, from: Point3<f32>, to: Point3<f32>, exclude: &[ObjectId]) -> Option<RayHit>;
}

pub trait SceneGraph {
    fn children(&self, object: ObjectId) -> Vec<ObjectId>;
    /// Tag lookup on an object's property bag.
    fn property(&self, object: ObjectId, name: &str) -> Option<&Value>;

    fn parent(&self, object: ObjectId) -> Option<ObjectId>;
    /// Re-parent while keeping the current world transform. `None` detaches.
    fn set_parent(&mut self, object: ObjectId, parent: Option<ObjectId>);

    fn world_transform(&self, object: ObjectId) -> Isometry3<f32>;
    fn set_world_transform(&mut self, object: ObjectId, transform: Isometry3<f32>);
    fn set_world_position(&mut self, object: ObjectId, position: Point3<f32>);
    fn local_transform(&self, object: ObjectId) -> Isometry3<f32>;
    fn set_local_transform(&mut self, object: ObjectId, transform: Isometry3<f32>);

    /// Unscaled bounding box size.
    fn dimensions(&self, object: ObjectId) -> Vector3<f32>;
    fn local_scale(&self, object: ObjectId) -> Vector3<f32>;
}

pub trait Engine: PhysicsBackend + SpatialQuery + SceneGraph {}

impl<T: PhysicsBackend + SpatialQuery + SceneGraph> Engine for T {}

/// Bounding box size of an object after its local scale is applied.
pub fn scaled_dimensions<S: SceneGraph + ?Sized>(scene: &S, object: ObjectId) -> Vector3<f32> {
    scene.dimensions(object).component_mul(&scene.local_scale(object))
}
