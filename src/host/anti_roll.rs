// ==============================================================================
// anti_roll.rs — ROLL INFLUENCE AS ANTI-ROLL IMPULSES
// ------------------------------------------------------------------------------
// The raycast-vehicle controller has no roll-influence knob, so the profile's
// ROLL value is expressed as an anti-roll bar per axle.
//
// For each axle pair (0,1) and (2,3) with both wheels in contact:
//   compression  c = rest_length - suspension_length
//   delta        = c_left - c_right
//   force        = roll · stiffness · delta · chassis_mass
//   impulse      = up · force · dt
//     +impulse at the more compressed wheel's contact point
//     -impulse at the other one
//
// No net vertical force is added; load only moves across the axle.
// ==============================================================================

use rapier3d::control::{DynamicRayCastVehicleController, Wheel};
use rapier3d::prelude::*;

pub const AXLES: [(usize, usize); 2] = [(0, 1), (2, 3)];

/// Below this compression difference the bar does nothing.
const DELTA_EPSILON: Real = 1e-4;

/// Grounded wheel: (compression, contact point).
pub type WheelLoad = (Real, Point<Real>);

pub fn wheel_load(wheel: &Wheel) -> Option<WheelLoad> {
    let info = wheel.raycast_info();
    if !info.is_in_contact {
        return None;
    }
    let compression = (wheel.suspension_rest_length - info.suspension_length).max(0.0);
    Some((compression, info.contact_point_ws))
}

/// Impulse pair for one axle, or `None` if a wheel is airborne or the axle is
/// level.
pub fn axle_impulses(
    left: Option<WheelLoad>,
    right: Option<WheelLoad>,
    roll: Real,
    stiffness: Real,
    mass: Real,
    up: Vector<Real>,
    dt: Real,
) -> Option<[(Vector<Real>, Point<Real>); 2]> {
    let ((cl, pl), (cr, pr)) = (left?, right?);

    let delta = cl - cr;
    if delta.abs() < DELTA_EPSILON || roll == 0.0 {
        return None;
    }

    let force = roll * stiffness * delta * mass;
    let impulse = up * (force * dt);

    Some([(impulse, pl), (-impulse, pr)])
}

/// Apply both axles' anti-roll impulses to the chassis.
pub fn apply(
    controller: &DynamicRayCastVehicleController,
    chassis: RigidBodyHandle,
    roll: &[Real],
    bodies: &mut RigidBodySet,
    dt: Real,
) {
    let Some(body) = bodies.get(chassis) else { return };
    let mass = body.mass();
    let up = body.position().rotation * Vector::z();
    let wheels = controller.wheels();

    // collect impulses here, apply later
    let mut impulses: Vec<(Vector<Real>, Point<Real>)> = Vec::new();

    for (l, r) in AXLES {
        let (Some(wl), Some(wr)) = (wheels.get(l), wheels.get(r)) else {
            continue;
        };
        let axle_roll = roll.get(l).copied().unwrap_or(0.0);

        if let Some(pair) = axle_impulses(
            wheel_load(wl),
            wheel_load(wr),
            axle_roll,
            wl.suspension_stiffness,
            mass,
            up,
            dt,
        ) {
            impulses.extend(pair);
        }
    }

    if let Some(body) = bodies.get_mut(chassis) {
        for (impulse, point) in impulses {
            body.apply_impulse_at_point(impulse, point, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_side_is_pushed_up_and_net_is_zero() {
        let up = Vector::z();
        let pair = axle_impulses(
            Some((0.2, point![-1.0, 0.0, 0.0])),
            Some((0.1, point![1.0, 0.0, 0.0])),
            0.5,
            10.0,
            800.0,
            up,
            0.1,
        )
        .unwrap();

        // 0.5 · 10 · 0.1 · 800 · 0.1
        assert!((pair[0].0.z - 40.0).abs() < 1e-3);
        assert!((pair[0].0 + pair[1].0).norm() < 1e-6);
        assert_eq!(pair[0].1, point![-1.0, 0.0, 0.0]);
    }

    #[test]
    fn airborne_or_level_axles_do_nothing() {
        let up = Vector::z();
        let grounded = Some((0.1, Point::origin()));
        assert!(axle_impulses(grounded, None, 0.5, 10.0, 800.0, up, 0.1).is_none());
        assert!(axle_impulses(grounded, grounded, 0.5, 10.0, 800.0, up, 0.1).is_none());

        let tilted = Some((0.3, Point::origin()));
        assert!(axle_impulses(tilted, grounded, 0.0, 10.0, 800.0, up, 0.1).is_none());
    }
}
