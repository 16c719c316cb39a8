// ==============================================================================
// exit.rs — EXIT PLACEMENT SOLVER
// ------------------------------------------------------------------------------
// Finds a clear, ground-aligned spot beside the door sensor to drop an exiting
// occupant.
//
// For each side (left = -1 first, then right = +1) along the sensor's right
// axis:
//   1. edge   = sensor ± (sensor_w + occupant_w) / 2
//      ray edge → occupant; any hit means the side is blocked.
//   2. center = sensor ± sensor_w / 2
//      vertical ray from occupant_h/2 above center down to
//      occupant_h/2 + GROUND_PROBE_MARGIN below it. Cast downward so the
//      first hit is the surface the occupant will stand on.
//   3. ground hit → placement = hit + up · occupant_h / 2.
//
// First side that succeeds wins. No side succeeding is a normal outcome, the
// caller retries next tick.
// ==============================================================================

use nalgebra::{Point3, Vector3};

use crate::engine::{ObjectId, SceneGraph, SpatialQuery, scaled_dimensions};

/// How far below the expected foot level the ground probe reaches.
pub const GROUND_PROBE_MARGIN: f32 = 0.5;

pub const EXIT_SIDES: [f32; 2] = [-1.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitProbe {
    pub occupant_position: Point3<f32>,
    pub occupant_width: f32,
    pub occupant_height: f32,
    pub sensor_position: Point3<f32>,
    pub sensor_width: f32,
    pub right: Vector3<f32>,   // sensor lateral axis, world space
    pub up: Vector3<f32>,      // world up
}

impl ExitProbe {
    /// Read positions and footprints from the scene.
    pub fn gather<S: SceneGraph + ?Sized>(scene: &S, occupant: ObjectId, sensor: ObjectId) -> Self {
        let occupant_world = scene.world_transform(occupant);
        let sensor_world = scene.world_transform(sensor);
        let occupant_dims = scaled_dimensions(scene, occupant);
        let sensor_dims = scaled_dimensions(scene, sensor);

        Self {
            occupant_position: occupant_world.translation.vector.into(),
            occupant_width: occupant_dims.x,
            occupant_height: occupant_dims.z,
            sensor_position: sensor_world.translation.vector.into(),
            sensor_width: sensor_dims.x,
            right: sensor_world.rotation * Vector3::x(),
            up: Vector3::z(),
        }
    }

    fn try_side<Q: SpatialQuery + ?Sized>(&self, side: f32, query: &Q, exclude: &[ObjectId]) -> Option<Point3<f32>> {
        let lateral = self.right * side;

        let edge = self.sensor_position + lateral * ((self.sensor_width + self.occupant_width) * 0.5);
        if query.ray_cast(edge, self.occupant_position, exclude).is_some() {
            return None;
        }

        let half_height = self.occupant_height * 0.5;
        let center = self.sensor_position + lateral * (self.sensor_width * 0.5);
        let top = center + self.up * half_height;
        let bottom = center - self.up * (half_height + GROUND_PROBE_MARGIN);

        let ground = query.ray_cast(top, bottom, exclude)?;
        Some(ground.point + self.up * half_height)
    }
}

/// Placement for the occupant, or `None` if both sides are blocked or have no
/// ground.
pub fn find_exit<Q: SpatialQuery + ?Sized>(probe: &ExitProbe, query: &Q, exclude: &[ObjectId]) -> Option<Point3<f32>> {
    EXIT_SIDES
        .iter()
        .find_map(|&side| probe.try_side(side, query, exclude))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Obstacles, Wall};

    fn probe() -> ExitProbe {
        ExitProbe {
            occupant_position: Point3::new(0.0, 0.0, 1.0),
            occupant_width: 0.5,
            occupant_height: 1.8,
            sensor_position: Point3::new(0.0, 0.0, 1.0),
            sensor_width: 1.0,
            right: Vector3::x(),
            up: Vector3::z(),
        }
    }

    #[test]
    fn open_ground_places_on_the_left_first() {
        let world = Obstacles::ground(1.0);
        let spot = find_exit(&probe(), &world, &[]).unwrap();

        assert!((spot.x + 0.5).abs() < 1e-6);
        assert!(spot.y.abs() < 1e-6);
        assert!((spot.z - (1.0 + 0.9)).abs() < 1e-6);
    }

    #[test]
    fn blocked_left_falls_back_to_right() {
        let mut world = Obstacles::ground(1.0);
        world.walls.push(Wall {
            min: Point3::new(-0.6, -1.0, 0.0),
            max: Point3::new(-0.4, 1.0, 3.0),
        });

        let spot = find_exit(&probe(), &world, &[]).unwrap();
        assert!((spot.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn ground_probe_lands_on_the_highest_surface_below_the_occupant() {
        // A low crate under the left candidate, clear of the edge ray.
        let mut world = Obstacles::ground(1.0);
        world.walls.push(Wall {
            min: Point3::new(-0.7, -0.3, 1.05),
            max: Point3::new(-0.3, 0.3, 1.3),
        });

        let spot = find_exit(&probe(), &world, &[]).unwrap();
        assert!((spot.x + 0.5).abs() < 1e-6);
        assert!((spot.z - (1.3 + 0.9)).abs() < 1e-5);
    }

    #[test]
    fn both_sides_blocked_fails() {
        let world = Obstacles { block_everything: true, ..Obstacles::ground(1.0) };
        assert_eq!(find_exit(&probe(), &world, &[]), None);
    }

    #[test]
    fn no_ground_in_reach_fails() {
        // Ground 2m below the sensor, out of the probe's reach.
        let world = Obstacles::ground(-1.0);
        assert_eq!(find_exit(&probe(), &world, &[]), None);
    }

    #[test]
    fn gather_reads_footprints_from_scene() {
        use crate::testing::MockEngine;

        let mut engine = MockEngine::new();
        let walker = engine.spawn_walker(Vector3::new(1.0, 2.0, 0.9));
        let sensor = engine.spawn(None, Vector3::new(-1.5, 0.0, 1.0), Vector3::new(1.0, 1.0, 1.0));
        engine.obj_mut(sensor).scale = Vector3::new(2.0, 1.0, 1.0);

        let probe = ExitProbe::gather(&engine, walker, sensor);
        assert_eq!(probe.occupant_width, 0.5);
        assert_eq!(probe.occupant_height, 1.8);
        assert_eq!(probe.sensor_width, 2.0);
        assert_eq!(probe.occupant_position, Point3::new(1.0, 2.0, 0.9));
        assert!((probe.right - Vector3::x()).norm() < 1e-6);
    }
}
