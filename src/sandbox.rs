// ==============================================================================
// sandbox.rs — PLAYABLE WORLD
// ------------------------------------------------------------------------------
// Ground plane, one car per configured brand and a single walker occupant.
//
// tick(held):
//   1. input edges from the held signal set
//   2. walker controller (walk / turn) while the walker is in control
//   3. door sensing: walker inside a door sensor  → DoorProximity
//   4. body sensing: driven car touching a parked → Nudged
//   5. garage tick, then the physics step
//
// Sensors are checked geometrically against oriented boxes; they have no
// colliders of their own.
// ==============================================================================

use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};
use rapier3d::prelude::*;
use serde_json::json;
use tracing::info;

use crate::config::SandboxConfig;
use crate::engine::{ObjectId, PhysicsBackend, SceneGraph, scaled_dimensions};
use crate::error::VehicleError;
use crate::garage::{Garage, VehicleId};
use crate::host::physics::{GROUP_CHASSIS, GROUP_GROUND, GROUP_WALKER};
use crate::host::{RapierHost, SceneNode};
use crate::input::{InputQuery, InputState, Signal};
use crate::occupant::{OccupantId, Occupants};
use crate::parts::{BODY_SENSOR_TAG, BRAND_TAG, DOOR_SENSOR_TAG, SEAT_TAG, STEERING_WHEEL_TAG, WHEEL_TAG};
use crate::profile::TuningTable;
use crate::state::{Snapshot, VehicleSnapshot, WalkerSnapshot};
use crate::vehicle::Vehicle;

pub const GROUND_HALF_EXTENT: f32 = 200.0;
pub const CAR_SPACING: f32 = 6.0;
pub const CHASSIS_MASS: f32 = 800.0;

pub const WALK_SPEED: f32 = 4.0;        // m/s forward
pub const WALK_BACK_SPEED: f32 = 2.0;   // m/s backward
pub const TURN_SPEED: f32 = 2.5;        // rad/s

const CHASSIS_DIMS: [f32; 3] = [2.0, 4.2, 0.6];
const WHEEL_DIMS: [f32; 3] = [0.3, 0.7, 0.7];
const WHEEL_OFFSETS: [[f32; 3]; 4] = [
    [-0.85,  1.4, -0.3],  // front left
    [ 0.85,  1.4, -0.3],  // front right
    [-0.85, -1.4, -0.3],  // rear left
    [ 0.85, -1.4, -0.3],  // rear right
];
const WALKER_DIMS: [f32; 3] = [0.5, 0.5, 1.8];

fn v(a: [f32; 3]) -> Vector3<f32> {
    Vector3::new(a[0], a[1], a[2])
}

fn child(host: &mut RapierHost, name: &str, parent: ObjectId, at: [f32; 3], dims: [f32; 3]) -> ObjectId {
    host.add_node(SceneNode::new(name, Some(parent), Isometry3::translation(at[0], at[1], at[2]), v(dims)))
}

/// Build a chassis with its full part hierarchy. The brand is only a tag here;
/// it is resolved when the vehicle is constructed.
pub fn spawn_car(host: &mut RapierHost, brand: &str, at: Vector3<f32>) -> ObjectId {
    let chassis = host.add_node(SceneNode::new(
        format!("chassis_{brand}"),
        None,
        Isometry3::translation(at.x, at.y, at.z),
        v(CHASSIS_DIMS),
    ));
    host.tag(chassis, BRAND_TAG, json!(brand));

    let [hx, hy, hz] = CHASSIS_DIMS.map(|d| d * 0.5);
    let collider = ColliderBuilder::cuboid(hx, hy, hz)
        .collision_groups(InteractionGroups::new(
            GROUP_CHASSIS,
            GROUP_GROUND | GROUP_CHASSIS | GROUP_WALKER,
        ))
        .mass(CHASSIS_MASS)
        .friction(0.5)
        .restitution(0.0)
        .build();
    host.attach_body(chassis, RigidBodyBuilder::dynamic().ccd_enabled(true), collider);

    for (index, offset) in WHEEL_OFFSETS.iter().enumerate() {
        let wheel = child(host, "wheel", chassis, *offset, WHEEL_DIMS);
        host.tag(wheel, WHEEL_TAG, json!(index));
    }

    let steering_wheel = child(host, "steering_wheel", chassis, [-0.4, 0.5, 0.35], [0.4, 0.05, 0.4]);
    host.tag(steering_wheel, STEERING_WHEEL_TAG, json!(true));
    let seat = child(host, "seat", chassis, [-0.45, -0.1, 0.1], [0.5, 0.5, 0.5]);
    host.tag(seat, SEAT_TAG, json!(true));
    let door = child(host, "door_sensor", chassis, [-1.6, 0.0, 0.0], [1.2, 1.5, 1.8]);
    host.tag(door, DOOR_SENSOR_TAG, json!(true));
    let body = child(host, "body_sensor", chassis, [0.0, 0.0, 0.0], [2.4, 4.6, 1.0]);
    host.tag(body, BODY_SENSOR_TAG, json!(true));

    chassis
}

/// Upright person-sized body that can only yaw.
pub fn spawn_walker(host: &mut RapierHost, at: Vector3<f32>) -> ObjectId {
    let walker = host.add_node(SceneNode::new(
        "walker",
        None,
        Isometry3::translation(at.x, at.y, at.z),
        v(WALKER_DIMS),
    ));

    let radius = WALKER_DIMS[0] * 0.5;
    let collider = ColliderBuilder::capsule_z(WALKER_DIMS[2] * 0.5 - radius, radius)
        .collision_groups(InteractionGroups::new(GROUP_WALKER, GROUP_GROUND | GROUP_CHASSIS))
        .friction(0.0)
        .build();
    host.attach_body(
        walker,
        RigidBodyBuilder::dynamic().enabled_rotations(false, false, true).angular_damping(4.0),
        collider,
    );
    walker
}

/// Whether `point` lies inside `object`'s scaled bounding box, grown by `margin`.
fn inside_box<S: SceneGraph + ?Sized>(scene: &S, object: ObjectId, point: Point3<f32>, margin: Vector3<f32>) -> bool {
    let local = scene.world_transform(object).inverse_transform_point(&point);
    let half = scaled_dimensions(scene, object) * 0.5 + margin;
    local.x.abs() <= half.x && local.y.abs() <= half.y && local.z.abs() <= half.z
}

fn quat(q: &UnitQuaternion<f32>) -> [f32; 4] {
    [q.i, q.j, q.k, q.w]
}

pub struct Sandbox {
    pub host: RapierHost,
    pub garage: Garage,
    pub occupants: Occupants,
    pub input: InputState,
    walker: OccupantId,
    walker_object: ObjectId,
    walker_seated: bool,
    dt: f32,
}

impl Sandbox {
    pub fn new(config: &SandboxConfig, table: &TuningTable) -> Result<Self, VehicleError> {
        let mut host = RapierHost::new();
        host.add_ground(GROUND_HALF_EXTENT);

        let chassis: Vec<ObjectId> = config
            .brands
            .iter()
            .enumerate()
            .map(|(i, brand)| spawn_car(&mut host, brand, Vector3::new(i as f32 * CAR_SPACING, 0.0, 0.8)))
            .collect();

        let walker_object = spawn_walker(&mut host, Vector3::new(-3.0, -4.0, 1.0));
        host.physics.refresh_queries();

        let mut garage = Garage::new();
        for object in chassis {
            let vehicle = Vehicle::spawn(&mut host, object, table)?;
            garage.add(vehicle);
        }

        let mut occupants = Occupants::new();
        let walker = occupants.insert(walker_object);

        info!(vehicles = garage.len(), "🏁 sandbox ready");

        Ok(Self {
            host,
            garage,
            occupants,
            input: InputState::new(),
            walker,
            walker_object,
            walker_seated: false,
            dt: config.dt(),
        })
    }

    pub fn walker(&self) -> OccupantId {
        self.walker
    }

    pub fn walker_object(&self) -> ObjectId {
        self.walker_object
    }

    pub fn tick<I: IntoIterator<Item = Signal>>(&mut self, held: I) {
        self.input.update(held);

        if self.occupants.is_active(self.walker) {
            self.drive_walker();
            self.sense_doors();
        }
        self.sense_contacts();

        self.garage.tick(&mut self.host, &self.input, &mut self.occupants);
        self.sync_walker_collision();

        self.host.step(self.dt);
    }

    /// Walk forward/backward along the walker's heading and turn in place.
    fn drive_walker(&mut self) {
        let object = self.walker_object;
        let held = |s: Signal| self.input.down(s) || self.input.hit(s);

        let heading = self.host.world_transform(object).rotation * Vector3::y();
        let planar = Vector3::new(heading.x, heading.y, 0.0);
        let forward = if planar.norm() > 1e-6 { planar.normalize() } else { Vector3::y() };

        let speed = if held(Signal::Backward) {
            -WALK_BACK_SPEED
        } else if held(Signal::Forward) {
            WALK_SPEED
        } else {
            0.0
        };
        let turn = f32::from(i8::from(held(Signal::TurnLeft)) - i8::from(held(Signal::TurnRight)));

        let current = self.host.linear_velocity(object);
        let velocity = forward * speed + Vector3::z() * current.z;
        self.host.set_linear_velocity(object, velocity);
        self.host.set_angular_velocity(object, Vector3::z() * (turn * TURN_SPEED));
    }

    fn sense_doors(&mut self) {
        let position: Point3<f32> = self.host.world_transform(self.walker_object).translation.vector.into();

        let near: Vec<VehicleId> = self
            .garage
            .iter()
            .filter(|(_, v)| inside_box(&self.host, v.parts().door_sensor, position, Vector3::zeros()))
            .map(|(id, _)| id)
            .collect();

        for id in near {
            self.garage.notify_door(id, self.walker);
        }
    }

    fn sense_contacts(&mut self) {
        let mut touching: Vec<(VehicleId, VehicleId)> = Vec::new();

        for (from, driven) in self.garage.iter().filter(|(_, v)| v.has_driver()) {
            for (to, parked) in self.garage.iter().filter(|(id, v)| *id != from && v.is_suspended()) {
                let chassis = parked.chassis();
                let center: Point3<f32> = self.host.world_transform(chassis).translation.vector.into();
                let half = scaled_dimensions(&self.host, chassis) * 0.5;
                let radius = half.x.max(half.y);
                let reach = Vector3::new(radius, radius, half.z);

                if inside_box(&self.host, driven.parts().body_sensor, center, reach) {
                    touching.push((from, to));
                }
            }
        }

        for (from, to) in touching {
            self.garage.report_contact(from, to);
        }
    }

    /// A seated walker must not push against its own car.
    fn sync_walker_collision(&mut self) {
        let seated = !self.occupants.is_active(self.walker);
        if seated != self.walker_seated {
            self.host.set_colliders_enabled(self.walker_object, !seated);
            self.walker_seated = seated;
        }
    }

    pub fn snapshot(&self, tick: u64) -> Snapshot {
        let vehicles = self
            .garage
            .iter()
            .map(|(id, v)| {
                let world = self.host.world_transform(v.chassis());
                VehicleSnapshot {
                    id,
                    brand: v.brand().to_string(),
                    state: v.state(),
                    position: world.translation.vector.into(),
                    rotation: quat(&world.rotation),
                    wheels: v
                        .parts()
                        .wheels
                        .iter()
                        .map(|w| self.host.world_transform(w.object).translation.vector.into())
                        .collect(),
                    steering: v.steering_angle(),
                    driver: v.driver().map(|d| d.0),
                    suspended: v.is_suspended(),
                    color: v.profile().color,
                }
            })
            .collect();

        let walker = self.host.world_transform(self.walker_object);

        Snapshot {
            kind: "snapshot",
            tick,
            vehicles,
            walker: WalkerSnapshot {
                position: walker.translation.vector.into(),
                rotation: quat(&walker.rotation),
                active: self.occupants.is_active(self.walker),
            },
        }
    }
}
