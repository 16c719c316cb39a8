// ==============================================================================
// rig.rs — WHEEL / CONSTRAINT ADAPTER
// ------------------------------------------------------------------------------
// Binds the four wheel slots of a chassis to a raycast-vehicle constraint and
// back again.
//
// attach():
//   creates the constraint, un-parents each wheel, registers it at its rest
//   offset raised by the axle's suspension rest length, tunes it from the
//   profile, then re-applies the carried steering angle to the front pair.
//
// detach():
//   re-parents each wheel to the chassis at the engine-reported wheel
//   position (front pair yawed by the steering angle) and destroys the
//   constraint.
//
// Both are no-ops when already in the requested state.
// ==============================================================================

use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};

use crate::engine::{ConstraintId, PhysicsBackend, SceneGraph, WheelMount, WheelTuning};
use crate::parts::{VehicleParts, WheelSlot};
use crate::profile::VehicleProfile;

pub const WHEELS_HAS_STEERING: [bool; 4] = [true, true, false, false];
pub const STEERED_WHEELS: [usize; 2] = [0, 1];

/// Suspension direction in chassis space.
pub fn wheels_down_dir() -> Vector3<f32> {
    -Vector3::z()
}

/// Wheel axle in chassis space.
pub fn wheels_axle_dir() -> Vector3<f32> {
    -Vector3::x()
}

pub fn wheel_mount(slot_index: usize, slot: &WheelSlot, profile: &VehicleProfile) -> WheelMount {
    let rest_length = profile.rest_length(slot_index);
    let mut attach_point: Point3<f32> = slot.rest.translation.vector.into();
    attach_point += Vector3::z() * rest_length;

    WheelMount {
        object: slot.object,
        attach_point,
        down: wheels_down_dir(),
        axle: wheels_axle_dir(),
        rest_length,
        radius: slot.radius,
        steering: WHEELS_HAS_STEERING[slot_index],
    }
}

pub fn wheel_tuning(profile: &VehicleProfile) -> WheelTuning {
    WheelTuning {
        friction: profile.friction,
        damping: profile.damping,
        compression: profile.compression,
        stiffness: profile.stiffness,
        roll_influence: profile.roll,
    }
}

#[derive(Debug, Default)]
pub struct VehicleRig {
    handle: Option<ConstraintId>,
}

impl VehicleRig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Option<ConstraintId> {
        self.handle
    }

    pub fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    /// Returns false if a constraint was already attached.
    pub fn attach<E>(&mut self, engine: &mut E, parts: &VehicleParts, profile: &VehicleProfile, steering: f32) -> bool
    where
        E: PhysicsBackend + SceneGraph + ?Sized,
    {
        if self.handle.is_some() {
            return false;
        }

        let constraint = engine.create_vehicle_constraint(parts.chassis);
        let tuning = wheel_tuning(profile);

        for (slot_index, slot) in parts.wheels.iter().enumerate() {
            engine.set_parent(slot.object, None);
            let mount = wheel_mount(slot_index, slot, profile);
            let wheel = engine.add_wheel(constraint, &mount);
            engine.set_wheel_tuning(constraint, wheel, &tuning);
        }

        for wheel in STEERED_WHEELS {
            engine.set_steering_value(constraint, wheel, steering);
        }

        self.handle = Some(constraint);
        true
    }

    /// Returns false if nothing was attached.
    pub fn detach<E>(&mut self, engine: &mut E, parts: &VehicleParts, steering: f32) -> bool
    where
        E: PhysicsBackend + SceneGraph + ?Sized,
    {
        let Some(constraint) = self.handle.take() else {
            return false;
        };

        for (slot_index, slot) in parts.wheels.iter().enumerate() {
            let position = engine
                .wheel_position(constraint, slot_index)
                .unwrap_or_else(|| engine.world_transform(slot.object).translation.vector.into());

            engine.set_parent(slot.object, Some(parts.chassis));

            let rotation = if WHEELS_HAS_STEERING[slot_index] {
                UnitQuaternion::from_axis_angle(&Vector3::z_axis(), steering) * slot.rest.rotation
            } else {
                slot.rest.rotation
            };
            engine.set_local_transform(slot.object, Isometry3::from_parts(slot.rest.translation, rotation));
            engine.set_world_position(slot.object, position);
        }

        engine.remove_vehicle_constraint(constraint);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{DEFAULT, HOTROD};
    use crate::testing::MockEngine;

    fn rigged(profile: &VehicleProfile) -> (MockEngine, VehicleParts, VehicleRig) {
        let mut engine = MockEngine::new();
        let chassis = engine.spawn_car(None);
        let parts = VehicleParts::classify(&engine, chassis).unwrap();
        let mut rig = VehicleRig::new();
        assert!(rig.attach(&mut engine, &parts, profile, 0.0));
        (engine, parts, rig)
    }

    #[test]
    fn every_wheel_is_tuned_from_the_profile() {
        for profile in [DEFAULT, HOTROD] {
            let (engine, _, rig) = rigged(&profile);
            let c = engine.constraint(rig.handle().unwrap());
            assert_eq!(c.wheels.len(), 4);
            for w in &c.wheels {
                assert_eq!(w.tuning.friction, profile.friction);
                assert_eq!(w.tuning.damping, profile.damping);
                assert_eq!(w.tuning.compression, profile.compression);
                assert_eq!(w.tuning.stiffness, profile.stiffness);
                assert_eq!(w.tuning.roll_influence, profile.roll);
            }
        }
    }

    #[test]
    fn mounts_are_raised_by_rest_length_and_only_front_steers() {
        let (engine, parts, rig) = rigged(&HOTROD);
        let c = engine.constraint(rig.handle().unwrap());

        for (i, w) in c.wheels.iter().enumerate() {
            let rest = parts.wheels[i].rest.translation.vector;
            assert!((w.mount.attach_point.z - (rest.z + 0.5)).abs() < 1e-6);
            assert_eq!(w.mount.down, Vector3::new(0.0, 0.0, -1.0));
            assert_eq!(w.mount.axle, Vector3::new(-1.0, 0.0, 0.0));
            assert_eq!(w.mount.steering, i < 2);
            assert!((w.mount.radius - 0.3).abs() < 1e-6);
        }
    }

    #[test]
    fn attach_unparents_wheels_and_detach_restores_them() {
        let (mut engine, parts, mut rig) = rigged(&DEFAULT);
        for slot in &parts.wheels {
            assert_eq!(engine.parent(slot.object), None);
        }

        assert!(rig.detach(&mut engine, &parts, 0.0));
        assert!(!rig.is_attached());
        for slot in &parts.wheels {
            assert_eq!(engine.parent(slot.object), Some(parts.chassis));
        }
    }

    #[test]
    fn redundant_attach_and_detach_are_no_ops() {
        let (mut engine, parts, mut rig) = rigged(&DEFAULT);
        let first = rig.handle();
        assert!(!rig.attach(&mut engine, &parts, &DEFAULT, 0.0));
        assert_eq!(rig.handle(), first);
        assert_eq!(engine.constraints.len(), 1);

        assert!(rig.detach(&mut engine, &parts, 0.0));
        assert!(!rig.detach(&mut engine, &parts, 0.0));
        assert_eq!(engine.removed_constraints.len(), 1);
    }

    #[test]
    fn round_trip_reproduces_registration_and_carries_steering() {
        let (mut engine, parts, mut rig) = rigged(&DEFAULT);
        let before: Vec<_> = engine
            .constraint(rig.handle().unwrap())
            .wheels
            .iter()
            .map(|w| (w.mount, w.tuning))
            .collect();

        let steering = 0.3;
        rig.detach(&mut engine, &parts, steering);
        rig.attach(&mut engine, &parts, &DEFAULT, steering);

        let c = engine.constraint(rig.handle().unwrap());
        let after: Vec<_> = c.wheels.iter().map(|w| (w.mount, w.tuning)).collect();
        assert_eq!(before, after);
        assert_eq!(c.wheels[0].steering, steering);
        assert_eq!(c.wheels[1].steering, steering);
        assert_eq!(c.wheels[2].steering, 0.0);
    }

    #[test]
    fn detach_yaws_front_wheels_by_steering_angle() {
        let (mut engine, parts, mut rig) = rigged(&DEFAULT);
        rig.detach(&mut engine, &parts, 0.4);

        let front = engine.local_transform(parts.wheels[0].object).rotation;
        let rear = engine.local_transform(parts.wheels[2].object).rotation;
        assert!((front.angle() - 0.4).abs() < 1e-5);
        assert!(rear.angle().abs() < 1e-5);
    }

    #[test]
    fn detach_places_wheels_at_constraint_positions() {
        let (mut engine, parts, mut rig) = rigged(&DEFAULT);
        let reported = engine.wheel_position(rig.handle().unwrap(), 3).unwrap();
        rig.detach(&mut engine, &parts, 0.0);

        let world = engine.world_transform(parts.wheels[3].object).translation.vector;
        assert!((world - reported.coords).norm() < 1e-5);
    }
}
