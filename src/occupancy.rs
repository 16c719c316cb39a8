//! Occupancy state table.
//!
//! `OccupancyState::step` is a pure function of the current state and what
//! the vehicle observed this tick. It names the next state and the single
//! effect the vehicle must carry out; the vehicle owns the side effects.

use serde::Serialize;

/// Ticks spent braking to rest before a driverless vehicle is suspended.
pub const SETTLE_TIME: u32 = 120;

/// Linear + angular speed under which a parked vehicle lets its driver out.
pub const PARK_VELOCITY_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OccupancyState {
    Idle,
    Settling { timer: u32 },
    Start,
    Drive,
    Park,
}

/// What the vehicle saw this tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickFacts {
    pub interact: bool,
    pub speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    Slowdown,
    Control,
    Suspend,
    Disembark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub next: OccupancyState,
    pub effect: Effect,
}

impl Step {
    fn to(next: OccupancyState, effect: Effect) -> Self {
        Self { next, effect }
    }
}

impl OccupancyState {
    /// Entry state after a driver leaves or a suspended vehicle is woken.
    pub const SETTLE: OccupancyState = OccupancyState::Settling { timer: 0 };

    pub fn step(self, facts: &TickFacts) -> Step {
        use OccupancyState::*;

        match self {
            Idle => Step::to(Idle, Effect::None),
            Settling { timer } => {
                let timer = timer + 1;
                if timer >= SETTLE_TIME {
                    Step::to(Idle, Effect::Suspend)
                } else {
                    Step::to(Settling { timer }, Effect::Slowdown)
                }
            }
            Start => Step::to(Drive, Effect::None),
            Drive if facts.interact => Step::to(Park, Effect::None),
            Drive => Step::to(Drive, Effect::Control),
            Park if facts.interact => Step::to(Drive, Effect::None),
            Park if facts.speed < PARK_VELOCITY_THRESHOLD => Step::to(Park, Effect::Disembark),
            Park => Step::to(Park, Effect::Slowdown),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OccupancyState::Idle => "idle",
            OccupancyState::Settling { .. } => "settling",
            OccupancyState::Start => "start",
            OccupancyState::Drive => "drive",
            OccupancyState::Park => "park",
        }
    }

    pub fn settle_timer(&self) -> u32 {
        match self {
            OccupancyState::Settling { timer } => *timer,
            _ => 0,
        }
    }

    /// States in which a new driver may climb in.
    pub fn accepts_driver(&self) -> bool {
        matches!(self, OccupancyState::Idle | OccupancyState::Settling { .. })
    }

    pub fn has_driver(&self) -> bool {
        matches!(self, OccupancyState::Start | OccupancyState::Drive | OccupancyState::Park)
    }
}
