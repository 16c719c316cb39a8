// ==============================================================================
// profile.rs — VEHICLE TUNING TABLE
// ------------------------------------------------------------------------------
// Per-brand suspension / friction / braking / drive / steering constants.
//
// - VehicleProfile: one brand's constants, immutable once looked up.
// - TuningTable: ordered brand list. A missing BRAND tag falls back to the
//   first entry; an unknown brand is a construction error.
// - TuningTable::from_json / load: replace the built-in table with a JSON
//   array of { "brand": ..., <profile fields> } entries.
//
// Units follow the raycast-vehicle convention: stiffness/damping are
// per-unit-mass, forces are engine units, angles are radians.
// ==============================================================================

use std::f32::consts::PI;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TuningError, VehicleError};

/// Which wheels receive engine force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    FrontWheel,
    RearWheel,
    FourWheel,
}

impl DriveMode {
    /// Wheel slots that receive engine force.
    pub fn driven_wheels(self) -> &'static [usize] {
        match self {
            DriveMode::FrontWheel => &[0, 1],
            DriveMode::RearWheel => &[2, 3],
            DriveMode::FourWheel => &[0, 1, 2, 3],
        }
    }

    /// Two-wheel modes get double force so total traction matches 4WD.
    pub fn force_multiplier(self) -> f32 {
        match self {
            DriveMode::FrontWheel | DriveMode::RearWheel => 2.0,
            DriveMode::FourWheel => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleProfile {
    pub susp_rest_len_front: f32,   // suspension rest length, slots 0-1
    pub susp_rest_len_rear: f32,    // suspension rest length, slots 2-3
    pub friction: f32,              // tire friction
    pub damping: f32,               // suspension damping (relaxation)
    pub compression: f32,           // suspension damping (compression)
    pub stiffness: f32,             // suspension spring
    pub roll: f32,                  // roll influence 0..1
    pub brake: f32,                 // foot brake per wheel
    pub hand_brake: f32,            // hand brake, rear wheels only
    pub forward: f32,               // engine force forward
    pub backward: f32,              // engine force reverse
    pub wheel_turn: f32,            // steering step per tick (rad)
    pub wheel_turn_fac_max: f32,    // max steering as a fraction of PI
    pub steering_wheel_turn_fac: f32, // visual steering wheel ratio
    pub linear_velocity_max: f32,   // engine cut-off speed
    pub drive_mode: DriveMode,
    pub color: [f32; 4],            // body RGBA
}

pub const DEFAULT: VehicleProfile = VehicleProfile {
    susp_rest_len_front: 0.2,
    susp_rest_len_rear: 0.2,
    friction: 1.0,
    damping: 5.0,
    compression: 5.0,
    stiffness: 50.0,
    roll: 0.5,
    brake: 10.0,
    hand_brake: 500.0,
    forward: 500.0,
    backward: 250.0,
    wheel_turn: 0.1,
    wheel_turn_fac_max: 0.25,
    steering_wheel_turn_fac: 2.0,
    linear_velocity_max: 18.0,
    drive_mode: DriveMode::FrontWheel,
    color: [0.8, 0.8, 0.8, 1.0],
};

pub const HOTROD: VehicleProfile = VehicleProfile {
    susp_rest_len_front: 0.5,
    susp_rest_len_rear: 0.5,
    friction: 1.0,
    damping: 2.5,
    compression: 2.5,
    stiffness: 10.0,
    roll: 0.75,
    brake: 15.0,
    hand_brake: 750.0,
    forward: 750.0,
    backward: 375.0,
    wheel_turn: 0.1,
    wheel_turn_fac_max: 0.25,
    steering_wheel_turn_fac: 1.0,
    linear_velocity_max: 20.0,
    drive_mode: DriveMode::RearWheel,
    color: [0.7, 0.1, 0.05, 1.0],
};

impl VehicleProfile {
    /// Steering limit in radians.
    pub fn max_steering_angle(&self) -> f32 {
        PI * self.wheel_turn_fac_max
    }

    /// Suspension rest length for a wheel slot.
    pub fn rest_length(&self, slot: usize) -> f32 {
        if slot < 2 {
            self.susp_rest_len_front
        } else {
            self.susp_rest_len_rear
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandEntry {
    pub brand: String,
    #[serde(flatten)]
    pub profile: VehicleProfile,
}

#[derive(Debug, Clone)]
pub struct TuningTable {
    entries: Vec<BrandEntry>,
}

impl Default for TuningTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TuningTable {
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                BrandEntry { brand: "DEFAULT".into(), profile: DEFAULT },
                BrandEntry { brand: "HOTROD".into(), profile: HOTROD },
            ],
        }
    }

    pub fn from_json(text: &str) -> Result<Self, TuningError> {
        let entries: Vec<BrandEntry> = serde_json::from_str(text)?;
        if entries.is_empty() {
            return Err(TuningError::Empty);
        }
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, TuningError> {
        let text = std::fs::read_to_string(path).map_err(|source| TuningError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Resolve a brand tag. `None` means the object carried no tag at all and
    /// resolves to the first brand in the table.
    pub fn lookup(&self, brand: Option<&str>) -> Result<(&str, &VehicleProfile), VehicleError> {
        let entry = match brand {
            None => self.entries.first(),
            Some(key) => self.entries.iter().find(|e| e.brand == key),
        };

        entry
            .map(|e| (e.brand.as_str(), &e.profile))
            .ok_or_else(|| VehicleError::UnknownBrand(brand.unwrap_or_default().to_string()))
    }

    pub fn brands(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.brand.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tag_falls_back_to_first_brand() {
        let table = TuningTable::builtin();
        let (name, profile) = table.lookup(None).unwrap();
        assert_eq!(name, "DEFAULT");
        assert_eq!(profile.drive_mode, DriveMode::FrontWheel);
    }

    #[test]
    fn unknown_brand_is_an_error() {
        let table = TuningTable::builtin();
        let err = table.lookup(Some("LIMO")).unwrap_err();
        assert!(matches!(err, VehicleError::UnknownBrand(ref b) if b == "LIMO"));
    }

    #[test]
    fn hotrod_is_rear_wheel_drive() {
        let table = TuningTable::builtin();
        let (_, profile) = table.lookup(Some("HOTROD")).unwrap();
        assert_eq!(profile.drive_mode, DriveMode::RearWheel);
        assert_eq!(profile.rest_length(0), 0.5);
        assert_eq!(profile.hand_brake, 750.0);
    }

    #[test]
    fn json_table_replaces_builtin_and_keeps_order() {
        let mut truck = DEFAULT;
        truck.drive_mode = DriveMode::FourWheel;
        truck.forward = 900.0;
        let text = serde_json::to_string(&vec![
            BrandEntry { brand: "TRUCK".into(), profile: truck },
            BrandEntry { brand: "DEFAULT".into(), profile: DEFAULT },
        ])
        .unwrap();

        let table = TuningTable::from_json(&text).unwrap();
        let (name, profile) = table.lookup(None).unwrap();
        assert_eq!(name, "TRUCK");
        assert_eq!(profile.drive_mode, DriveMode::FourWheel);
        assert_eq!(profile.forward, 900.0);
        assert!(table.lookup(Some("HOTROD")).is_err());
    }

    #[test]
    fn empty_json_table_is_rejected() {
        assert!(matches!(TuningTable::from_json("[]"), Err(TuningError::Empty)));
    }

    #[test]
    fn max_steering_angle_is_fraction_of_pi() {
        assert!((DEFAULT.max_steering_angle() - PI * 0.25).abs() < 1e-6);
    }
}
