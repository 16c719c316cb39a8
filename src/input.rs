//! Logical input signals and per-tick edge detection.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Forward,
    Backward,
    Brake,
    HandBrake,
    TurnLeft,
    TurnRight,
    Action,
}

/// Read-only view of this tick's input.
pub trait InputQuery {
    /// Held, and was already held last tick.
    fn down(&self, signal: Signal) -> bool;
    /// Went from released to held this tick.
    fn hit(&self, signal: Signal) -> bool;
}

/// Derives hit/down/up edges from the set of held signals, one update per tick.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    held: HashSet<Signal>,
    hit: HashSet<Signal>,
    down: HashSet<Signal>,
    up: HashSet<Signal>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update<I: IntoIterator<Item = Signal>>(&mut self, held: I) {
        let new_held: HashSet<Signal> = held.into_iter().collect();

        self.up = self.held.difference(&new_held).copied().collect();
        self.hit = new_held.difference(&self.held).copied().collect();
        self.down = new_held.difference(&self.hit).copied().collect();
        self.held = new_held;
    }

    /// Released this tick.
    pub fn up(&self, signal: Signal) -> bool {
        self.up.contains(&signal)
    }

    pub fn none(&self, signal: Signal) -> bool {
        !self.held.contains(&signal) && !self.up.contains(&signal)
    }
}

impl InputQuery for InputState {
    fn down(&self, signal: Signal) -> bool {
        self.down.contains(&signal)
    }

    fn hit(&self, signal: Signal) -> bool {
        self.hit.contains(&signal)
    }
}
