// ==============================================================================
// drive.rs — DRIVE CONTROLLER (INPUT → CONSTRAINT FORCES)
// ------------------------------------------------------------------------------
// Per-tick translation of the driver's signals into a DriveCommand:
//
//   brakes    hand brake → rear only; foot brake → both axles
//   engine    ±FORWARD/BACKWARD × drive-mode multiplier, cut at top speed
//   steering  stepped by WHEEL_TURN, clamped to ±π·WHEEL_TURN_FAC_MAX,
//             self-centers without overshoot when no turn input is held
//
// Sign convention: forward thrust is negative and left steering is positive,
// matching the constraint's axle direction (-1, 0, 0).
// ==============================================================================

use nalgebra::{UnitQuaternion, Vector3};

use crate::engine::{ConstraintId, PhysicsBackend};
use crate::input::{InputQuery, Signal};
use crate::profile::VehicleProfile;
use crate::rig::STEERED_WHEELS;

const FRONT_WHEELS: [usize; 2] = [0, 1];
const REAR_WHEELS: [usize; 2] = [2, 3];
const ALL_WHEELS: [usize; 4] = [0, 1, 2, 3];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveCommand {
    pub front_brake: f32,
    pub rear_brake: f32,
    pub engine_force: f32,   // per driven wheel
    pub steering: f32,       // radians, front pair
}

/// (front, rear) braking.
pub fn brake_split(profile: &VehicleProfile, brake: bool, hand_brake: bool) -> (f32, f32) {
    match (hand_brake, brake) {
        (true, false) => (0.0, profile.hand_brake),
        (true, true) => (profile.brake, profile.hand_brake),
        (false, true) => (profile.brake, profile.brake),
        (false, false) => (0.0, 0.0),
    }
}

/// Force for each driven wheel. No thrust at or above the profile's top speed.
pub fn engine_force(profile: &VehicleProfile, forward: bool, backward: bool, speed: f32) -> f32 {
    if speed >= profile.linear_velocity_max {
        return 0.0;
    }

    let mult = profile.drive_mode.force_multiplier();
    if backward {
        profile.backward * mult
    } else if forward {
        -profile.forward * mult
    } else {
        0.0
    }
}

/// Advance the steering angle by one tick. `turn` is +1 left, -1 right, 0 none.
pub fn step_steering(angle: f32, turn: i8, profile: &VehicleProfile) -> f32 {
    let step = profile.wheel_turn;
    let limit = profile.max_steering_angle();

    if turn != 0 {
        return (angle + f32::from(turn) * step).clamp(-limit, limit);
    }

    if angle > 0.0 {
        (angle - step).max(0.0)
    } else if angle < 0.0 {
        (angle + step).min(0.0)
    } else {
        0.0
    }
}

/// Steering-wheel prop rotation about the forward (Y) axis.
pub fn steering_wheel_rotation(angle: f32, ratio: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -angle * ratio)
}

impl DriveCommand {
    pub fn from_input<I: InputQuery + ?Sized>(input: &I, profile: &VehicleProfile, angle: f32, speed: f32) -> Self {
        let (front_brake, rear_brake) =
            brake_split(profile, input.down(Signal::Brake), input.down(Signal::HandBrake));

        let engine_force = engine_force(
            profile,
            input.down(Signal::Forward),
            input.down(Signal::Backward),
            speed,
        );

        let turn = i8::from(input.down(Signal::TurnLeft)) - i8::from(input.down(Signal::TurnRight));
        let steering = step_steering(angle, turn, profile);

        Self { front_brake, rear_brake, engine_force, steering }
    }

    /// Push the command onto the constraint. Engine force only reaches the
    /// drive mode's wheels.
    pub fn apply<P: PhysicsBackend + ?Sized>(&self, physics: &mut P, constraint: ConstraintId, profile: &VehicleProfile) {
        for wheel in FRONT_WHEELS {
            physics.apply_braking(constraint, wheel, self.front_brake);
        }
        for wheel in REAR_WHEELS {
            physics.apply_braking(constraint, wheel, self.rear_brake);
        }
        for &wheel in profile.drive_mode.driven_wheels() {
            physics.apply_engine_force(constraint, wheel, self.engine_force);
        }
        for wheel in STEERED_WHEELS {
            physics.set_steering_value(constraint, wheel, self.steering);
        }
    }
}

/// Cut the engine and brake every wheel.
pub fn apply_slowdown<P: PhysicsBackend + ?Sized>(physics: &mut P, constraint: ConstraintId, profile: &VehicleProfile) {
    for wheel in ALL_WHEELS {
        physics.apply_engine_force(constraint, wheel, 0.0);
        physics.apply_braking(constraint, wheel, profile.brake);
    }
}
