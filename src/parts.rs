//! One-time classification of a chassis' children into typed part handles.

use nalgebra::Isometry3;

use crate::engine::{ObjectId, SceneGraph, scaled_dimensions};
use crate::error::VehicleError;

pub const BRAND_TAG: &str = "BRAND";
pub const WHEEL_TAG: &str = "WHEEL";
pub const STEERING_WHEEL_TAG: &str = "STEERING_WHEEL";
pub const SEAT_TAG: &str = "SEAT";
pub const DOOR_SENSOR_TAG: &str = "DOOR_SENSOR";
pub const BODY_SENSOR_TAG: &str = "BODY_SENSOR";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelSlot {
    pub object: ObjectId,
    pub index: u32,               // value of the WHEEL tag
    pub rest: Isometry3<f32>,     // chassis-local transform at load time
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleParts {
    pub chassis: ObjectId,
    pub wheels: [WheelSlot; 4],
    pub steering_wheel: ObjectId,
    pub steering_wheel_rest: Isometry3<f32>,
    pub seat: ObjectId,
    pub door_sensor: ObjectId,
    pub body_sensor: ObjectId,
}

impl VehicleParts {
    /// Walk the chassis' direct children once and pick out every part the
    /// vehicle needs. Any missing part aborts construction.
    pub fn classify<S: SceneGraph + ?Sized>(scene: &S, chassis: ObjectId) -> Result<Self, VehicleError> {
        let mut wheels = Vec::new();
        let mut steering_wheel = None;
        let mut seat = None;
        let mut door_sensor = None;
        let mut body_sensor = None;

        for child in scene.children(chassis) {
            if let Some(tag) = scene.property(child, WHEEL_TAG) {
                let index = tag
                    .as_u64()
                    .and_then(|i| u32::try_from(i).ok())
                    .ok_or_else(|| VehicleError::InvalidTag {
                        tag: WHEEL_TAG,
                        value: tag.to_string(),
                    })?;
                let dims = scaled_dimensions(scene, child);
                wheels.push(WheelSlot {
                    object: child,
                    index,
                    rest: scene.local_transform(child),
                    radius: dims.z * 0.5,
                });
            } else if scene.property(child, STEERING_WHEEL_TAG).is_some() {
                steering_wheel = Some(child);
            } else if scene.property(child, SEAT_TAG).is_some() {
                seat = Some(child);
            } else if scene.property(child, DOOR_SENSOR_TAG).is_some() {
                door_sensor = Some(child);
            } else if scene.property(child, BODY_SENSOR_TAG).is_some() {
                body_sensor = Some(child);
            }
        }

        wheels.sort_by_key(|w| w.index);
        if let Some(pair) = wheels.windows(2).find(|pair| pair[0].index == pair[1].index) {
            return Err(VehicleError::DuplicateWheelIndex(pair[0].index));
        }
        let found = wheels.len();
        let wheels: [WheelSlot; 4] = wheels
            .try_into()
            .map_err(|_| VehicleError::WheelCount { found })?;

        let steering_wheel = steering_wheel.ok_or(VehicleError::MissingPart("steering wheel"))?;

        Ok(Self {
            chassis,
            wheels,
            steering_wheel,
            steering_wheel_rest: scene.local_transform(steering_wheel),
            seat: seat.ok_or(VehicleError::MissingPart("seat"))?,
            door_sensor: door_sensor.ok_or(VehicleError::MissingPart("door sensor"))?,
            body_sensor: body_sensor.ok_or(VehicleError::MissingPart("body sensor"))?,
        })
    }
}

/// The chassis' BRAND tag. `Ok(None)` when the tag is absent.
pub fn brand_tag<S: SceneGraph + ?Sized>(scene: &S, chassis: ObjectId) -> Result<Option<String>, VehicleError> {
    match scene.property(chassis, BRAND_TAG) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| VehicleError::InvalidTag { tag: BRAND_TAG, value: value.to_string() }),
    }
}
