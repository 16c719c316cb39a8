//! Registry of entities that can ride in a vehicle.

use std::collections::HashMap;

use crate::engine::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OccupantId(pub u32);

/// Whether the occupant's own controller is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupant {
    pub object: ObjectId,
    pub control: Control,
}

#[derive(Debug, Default)]
pub struct Occupants {
    entries: HashMap<OccupantId, Occupant>,
    next_id: u32,
}

impl Occupants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a free, active occupant.
    pub fn insert(&mut self, object: ObjectId) -> OccupantId {
        let id = OccupantId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, Occupant { object, control: Control::Active });
        id
    }

    pub fn get(&self, id: OccupantId) -> Option<&Occupant> {
        self.entries.get(&id)
    }

    pub fn is_active(&self, id: OccupantId) -> bool {
        self.entries.get(&id).is_some_and(|o| o.control == Control::Active)
    }

    pub fn set_control(&mut self, id: OccupantId, control: Control) {
        if let Some(o) = self.entries.get_mut(&id) {
            o.control = control;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_occupants_start_active() {
        let mut occupants = Occupants::new();
        let a = occupants.insert(ObjectId(3));
        let b = occupants.insert(ObjectId(4));
        assert_ne!(a, b);
        assert!(occupants.is_active(a));

        occupants.set_control(a, Control::Inactive);
        assert!(!occupants.is_active(a));
        assert!(occupants.is_active(b));
        assert!(!occupants.is_active(OccupantId(99)));
    }
}
