//! All vehicles of one world, ticked in insertion order.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::engine::{Engine, ObjectId};
use crate::input::InputQuery;
use crate::occupant::{OccupantId, Occupants};
use crate::vehicle::{TickContext, Vehicle, VehicleEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VehicleId(pub u32);

#[derive(Debug, Default)]
pub struct Garage {
    vehicles: BTreeMap<VehicleId, Vehicle>,
    next_id: u32,
}

impl Garage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, vehicle: Vehicle) -> VehicleId {
        let id = VehicleId(self.next_id);
        self.next_id += 1;
        self.vehicles.insert(id, vehicle);
        id
    }

    pub fn get(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VehicleId, &Vehicle)> + '_ {
        self.vehicles.iter().map(|(id, v)| (*id, v))
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn by_chassis(&self, chassis: ObjectId) -> Option<VehicleId> {
        self.iter().find(|(_, v)| v.chassis() == chassis).map(|(id, _)| id)
    }

    pub fn vehicle_driven_by(&self, occupant: OccupantId) -> Option<VehicleId> {
        self.iter().find(|(_, v)| v.driver() == Some(occupant)).map(|(id, _)| id)
    }

    /// `from`'s body sensor touched `to`. Only a driverless `to` is nudged.
    pub fn report_contact(&mut self, from: VehicleId, to: VehicleId) -> bool {
        if from == to {
            return false;
        }
        match self.vehicles.get_mut(&to) {
            Some(target) if !target.has_driver() => {
                debug!(from = from.0, to = to.0, "nudge");
                target.push_event(VehicleEvent::Nudged);
                true
            }
            _ => false,
        }
    }

    pub fn notify_door(&mut self, vehicle: VehicleId, occupant: OccupantId) {
        if let Some(v) = self.vehicles.get_mut(&vehicle) {
            v.push_event(VehicleEvent::DoorProximity { occupant });
        }
    }

    pub fn tick<E, I>(&mut self, engine: &mut E, input: &I, occupants: &mut Occupants)
    where
        E: Engine + ?Sized,
        I: InputQuery + ?Sized,
    {
        let mut ctx = TickContext { engine, input, occupants };
        for vehicle in self.vehicles.values_mut() {
            vehicle.tick(&mut ctx);
        }
    }
}
