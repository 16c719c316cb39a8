//! Recording mock engine for unit tests.
//!
//! Objects live in a flat table with parent links, constraints remember every
//! wheel registration and the last braking/engine/steering value per wheel,
//! and ray casts run against a ground plane plus axis-aligned walls.

use std::collections::{BTreeMap, HashMap, HashSet};

use nalgebra::{Isometry3, Point3, Translation3, Vector3};
use serde_json::{Value, json};

use crate::engine::{
    ConstraintId, ObjectId, PhysicsBackend, RayHit, SceneGraph, SpatialQuery, WheelMount,
    WheelTuning,
};
use crate::input::{InputQuery, Signal};
use crate::parts::{BODY_SENSOR_TAG, BRAND_TAG, DOOR_SENSOR_TAG, SEAT_TAG, STEERING_WHEEL_TAG, WHEEL_TAG};

pub(crate) const GROUND_ID: ObjectId = ObjectId(u32::MAX);
pub(crate) const WALL_ID: ObjectId = ObjectId(u32::MAX - 1);

#[derive(Debug, Clone)]
pub(crate) struct MockObject {
    pub parent: Option<ObjectId>,
    pub local: Isometry3<f32>,
    pub props: HashMap<String, Value>,
    pub dims: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub linvel: Vector3<f32>,
    pub angvel: Vector3<f32>,
    pub suspended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MockWheel {
    pub mount: WheelMount,
    pub tuning: WheelTuning,
    pub brake: f32,
    pub engine_force: f32,
    pub steering: f32,
}

#[derive(Debug, Clone)]
pub(crate) struct MockConstraint {
    pub chassis: ObjectId,
    pub wheels: Vec<MockWheel>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Wall {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

/// Ray-cast world: an optional infinite ground plane and box walls.
#[derive(Debug, Clone, Default)]
pub(crate) struct Obstacles {
    pub ground_z: Option<f32>,
    pub walls: Vec<Wall>,
    pub block_everything: bool,
}

impl Obstacles {
    pub fn ground(z: f32) -> Self {
        Self { ground_z: Some(z), ..Self::default() }
    }
}

impl SpatialQuery for Obstacles {
    fn ray_cast(&self, from: Point3<f32>, to: Point3<f32>, _exclude: &[ObjectId]) -> Option<RayHit> {
        let dir = to - from;
        let mut best: Option<(f32, RayHit)> = None;

        if self.block_everything {
            return Some(RayHit { object: WALL_ID, point: from, normal: -dir.normalize() });
        }

        if let Some(gz) = self.ground_z {
            if dir.z.abs() > 1e-6 {
                let t = (gz - from.z) / dir.z;
                if (0.0..=1.0).contains(&t) {
                    let hit = RayHit { object: GROUND_ID, point: from + dir * t, normal: Vector3::z() };
                    best = Some((t, hit));
                }
            }
        }

        for wall in &self.walls {
            if let Some(t) = segment_aabb(from, dir, wall) {
                if best.as_ref().map_or(true, |(bt, _)| t < *bt) {
                    let hit = RayHit { object: WALL_ID, point: from + dir * t, normal: -dir.normalize() };
                    best = Some((t, hit));
                }
            }
        }

        best.map(|(_, hit)| hit)
    }
}

fn segment_aabb(from: Point3<f32>, dir: Vector3<f32>, wall: &Wall) -> Option<f32> {
    let mut t0 = 0.0_f32;
    let mut t1 = 1.0_f32;
    for axis in 0..3 {
        if dir[axis].abs() < 1e-9 {
            if from[axis] < wall.min[axis] || from[axis] > wall.max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / dir[axis];
        let mut a = (wall.min[axis] - from[axis]) * inv;
        let mut b = (wall.max[axis] - from[axis]) * inv;
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        t0 = t0.max(a);
        t1 = t1.min(b);
        if t0 > t1 {
            return None;
        }
    }
    Some(t0)
}

#[derive(Debug, Default)]
pub(crate) struct MockEngine {
    pub objects: BTreeMap<ObjectId, MockObject>,
    pub constraints: HashMap<ConstraintId, MockConstraint>,
    pub removed_constraints: Vec<ConstraintId>,
    pub obstacles: Obstacles,
    next_object: u32,
    next_constraint: u32,
}

impl MockEngine {
    pub fn new() -> Self {
        Self { obstacles: Obstacles::ground(0.0), ..Self::default() }
    }

    pub fn spawn(&mut self, parent: Option<ObjectId>, at: Vector3<f32>, dims: Vector3<f32>) -> ObjectId {
        let id = ObjectId(self.next_object);
        self.next_object += 1;
        self.objects.insert(
            id,
            MockObject {
                parent,
                local: Isometry3::translation(at.x, at.y, at.z),
                props: HashMap::new(),
                dims,
                scale: Vector3::repeat(1.0),
                linvel: Vector3::zeros(),
                angvel: Vector3::zeros(),
                suspended: false,
            },
        );
        id
    }

    pub fn tag(&mut self, object: ObjectId, name: &str, value: Value) {
        self.obj_mut(object).props.insert(name.to_string(), value);
    }

    pub fn obj(&self, object: ObjectId) -> &MockObject {
        &self.objects[&object]
    }

    pub fn obj_mut(&mut self, object: ObjectId) -> &mut MockObject {
        self.objects.get_mut(&object).expect("unknown mock object")
    }

    /// Chassis at (0, 0, 1) with the full part hierarchy; the door sensor
    /// sits on the left flank.
    pub fn spawn_car(&mut self, brand: Option<&str>) -> ObjectId {
        let chassis = self.spawn(None, Vector3::new(0.0, 0.0, 1.0), Vector3::new(2.0, 4.0, 1.0));
        if let Some(brand) = brand {
            self.tag(chassis, BRAND_TAG, json!(brand));
        }

        let wheel_dims = Vector3::new(0.2, 0.6, 0.6);
        let offsets = [
            Vector3::new(-0.9, 1.3, -0.4),
            Vector3::new(0.9, 1.3, -0.4),
            Vector3::new(-0.9, -1.3, -0.4),
            Vector3::new(0.9, -1.3, -0.4),
        ];
        // Spawn out of order so classification has to sort by tag.
        for index in [2usize, 0, 3, 1] {
            let wheel = self.spawn(Some(chassis), offsets[index], wheel_dims);
            self.tag(wheel, WHEEL_TAG, json!(index));
        }

        let steering_wheel = self.spawn(Some(chassis), Vector3::new(-0.4, 0.4, 0.3), Vector3::new(0.4, 0.05, 0.4));
        self.tag(steering_wheel, STEERING_WHEEL_TAG, json!(true));
        let seat = self.spawn(Some(chassis), Vector3::new(-0.4, 0.0, 0.2), Vector3::new(0.5, 0.5, 0.5));
        self.tag(seat, SEAT_TAG, json!(true));
        let door = self.spawn(Some(chassis), Vector3::new(-1.5, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        self.tag(door, DOOR_SENSOR_TAG, json!(true));
        let body = self.spawn(Some(chassis), Vector3::zeros(), Vector3::new(2.4, 4.4, 1.2));
        self.tag(body, BODY_SENSOR_TAG, json!(true));

        chassis
    }

    /// A free-standing person-sized body.
    pub fn spawn_walker(&mut self, at: Vector3<f32>) -> ObjectId {
        self.spawn(None, at, Vector3::new(0.5, 0.5, 1.8))
    }

    pub fn constraint(&self, id: ConstraintId) -> &MockConstraint {
        &self.constraints[&id]
    }

    fn world_of(&self, object: ObjectId) -> Isometry3<f32> {
        let node = self.obj(object);
        match node.parent {
            Some(parent) => self.world_of(parent) * node.local,
            None => node.local,
        }
    }

    fn parent_world(&self, object: ObjectId) -> Isometry3<f32> {
        self.obj(object)
            .parent
            .map(|p| self.world_of(p))
            .unwrap_or_else(Isometry3::identity)
    }

    fn wheel_mut(&mut self, constraint: ConstraintId, wheel: usize) -> &mut MockWheel {
        &mut self.constraints.get_mut(&constraint).expect("unknown constraint").wheels[wheel]
    }
}

impl PhysicsBackend for MockEngine {
    fn create_vehicle_constraint(&mut self, chassis: ObjectId) -> ConstraintId {
        let id = ConstraintId(self.next_constraint);
        self.next_constraint += 1;
        self.constraints.insert(id, MockConstraint { chassis, wheels: Vec::new() });
        id
    }

    fn remove_vehicle_constraint(&mut self, constraint: ConstraintId) {
        self.constraints.remove(&constraint);
        self.removed_constraints.push(constraint);
    }

    fn add_wheel(&mut self, constraint: ConstraintId, mount: &WheelMount) -> usize {
        let c = self.constraints.get_mut(&constraint).expect("unknown constraint");
        c.wheels.push(MockWheel {
            mount: *mount,
            tuning: WheelTuning::default(),
            brake: 0.0,
            engine_force: 0.0,
            steering: 0.0,
        });
        c.wheels.len() - 1
    }

    fn set_wheel_tuning(&mut self, constraint: ConstraintId, wheel: usize, tuning: &WheelTuning) {
        self.wheel_mut(constraint, wheel).tuning = *tuning;
    }

    fn apply_braking(&mut self, constraint: ConstraintId, wheel: usize, value: f32) {
        self.wheel_mut(constraint, wheel).brake = value;
    }

    fn apply_engine_force(&mut self, constraint: ConstraintId, wheel: usize, value: f32) {
        self.wheel_mut(constraint, wheel).engine_force = value;
    }

    fn set_steering_value(&mut self, constraint: ConstraintId, wheel: usize, value: f32) {
        self.wheel_mut(constraint, wheel).steering = value;
    }

    fn wheel_position(&self, constraint: ConstraintId, wheel: usize) -> Option<Point3<f32>> {
        let c = self.constraints.get(&constraint)?;
        let w = c.wheels.get(wheel)?;
        let local = w.mount.attach_point + w.mount.down * w.mount.rest_length;
        Some(self.world_of(c.chassis) * local)
    }

    fn suspend_dynamics(&mut self, body: ObjectId) {
        self.obj_mut(body).suspended = true;
    }

    fn restore_dynamics(&mut self, body: ObjectId) {
        self.obj_mut(body).suspended = false;
    }

    fn linear_velocity(&self, body: ObjectId) -> Vector3<f32> {
        self.obj(body).linvel
    }

    fn angular_velocity(&self, body: ObjectId) -> Vector3<f32> {
        self.obj(body).angvel
    }

    fn set_linear_velocity(&mut self, body: ObjectId, velocity: Vector3<f32>) {
        self.obj_mut(body).linvel = velocity;
    }

    fn set_angular_velocity(&mut self, body: ObjectId, velocity: Vector3<f32>) {
        self.obj_mut(body).angvel = velocity;
    }
}

impl SpatialQuery for MockEngine {
    fn ray_cast(&self, from: Point3<f32>, to: Point3<f32>, exclude: &[ObjectId]) -> Option<RayHit> {
        self.obstacles.ray_cast(from, to, exclude)
    }
}

impl SceneGraph for MockEngine {
    fn children(&self, object: ObjectId) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, o)| o.parent == Some(object))
            .map(|(id, _)| *id)
            .collect()
    }

    fn property(&self, object: ObjectId, name: &str) -> Option<&Value> {
        self.obj(object).props.get(name)
    }

    fn parent(&self, object: ObjectId) -> Option<ObjectId> {
        self.obj(object).parent
    }

    fn set_parent(&mut self, object: ObjectId, parent: Option<ObjectId>) {
        let world = self.world_of(object);
        let parent_world = parent.map(|p| self.world_of(p)).unwrap_or_else(Isometry3::identity);
        let node = self.obj_mut(object);
        node.parent = parent;
        node.local = parent_world.inverse() * world;
    }

    fn world_transform(&self, object: ObjectId) -> Isometry3<f32> {
        self.world_of(object)
    }

    fn set_world_transform(&mut self, object: ObjectId, transform: Isometry3<f32>) {
        let parent_world = self.parent_world(object);
        self.obj_mut(object).local = parent_world.inverse() * transform;
    }

    fn set_world_position(&mut self, object: ObjectId, position: Point3<f32>) {
        let mut world = self.world_of(object);
        world.translation = Translation3::from(position.coords);
        self.set_world_transform(object, world);
    }

    fn local_transform(&self, object: ObjectId) -> Isometry3<f32> {
        self.obj(object).local
    }

    fn set_local_transform(&mut self, object: ObjectId, transform: Isometry3<f32>) {
        self.obj_mut(object).local = transform;
    }

    fn dimensions(&self, object: ObjectId) -> Vector3<f32> {
        self.obj(object).dims
    }

    fn local_scale(&self, object: ObjectId) -> Vector3<f32> {
        self.obj(object).scale
    }
}

/// Input with explicitly listed held / just-hit signals.
#[derive(Debug, Default, Clone)]
pub(crate) struct FixedInput {
    pub down: HashSet<Signal>,
    pub hit: HashSet<Signal>,
}

impl FixedInput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn holding(signals: &[Signal]) -> Self {
        Self { down: signals.iter().copied().collect(), hit: HashSet::new() }
    }

    pub fn hitting(signal: Signal) -> Self {
        Self { down: HashSet::new(), hit: [signal].into_iter().collect() }
    }
}

impl InputQuery for FixedInput {
    fn down(&self, signal: Signal) -> bool {
        self.down.contains(&signal)
    }

    fn hit(&self, signal: Signal) -> bool {
        self.hit.contains(&signal)
    }
}
