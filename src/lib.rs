//! Drivable vehicles for a tick-driven game world.
//!
//! The core (`profile` through `garage`) is generic over the engine
//! capabilities in [`engine`]; `host` provides them on top of rapier3d and
//! `sandbox`, `state` and `net` turn that into a small websocket server.

pub mod config;
pub mod drive;
pub mod engine;
pub mod error;
pub mod exit;
pub mod garage;
pub mod host;
pub mod input;
pub mod net;
pub mod occupancy;
pub mod occupant;
pub mod parts;
pub mod profile;
pub mod rig;
pub mod sandbox;
pub mod state;
pub mod vehicle;

#[cfg(test)]
mod testing;
