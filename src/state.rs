use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;
use uuid::Uuid;

use crate::garage::VehicleId;
use crate::input::Signal;
use crate::occupancy::OccupancyState;

#[derive(Debug, Clone, Serialize)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub brand: String,
    #[serde(flatten)]
    pub state: OccupancyState,
    pub position: [f32; 3],
    pub rotation: [f32; 4], // quaternion i, j, k, w
    pub wheels: Vec<[f32; 3]>,
    pub steering: f32,
    pub driver: Option<u32>,
    pub suspended: bool,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, Serialize)]
pub struct WalkerSnapshot {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub tick: u64,
    pub vehicles: Vec<VehicleSnapshot>,
    pub walker: WalkerSnapshot,
}

/// State shared between the tick loop and websocket connections.
pub struct SharedState {
    pub tick: u64,
    pub clients: HashMap<Uuid, UnboundedSender<String>>,
    pub held: HashMap<Uuid, HashSet<Signal>>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            tick: 0,
            clients: HashMap::new(),
            held: HashMap::new(),
        }
    }

    pub fn register_client(&mut self, id: Uuid, tx: UnboundedSender<String>) {
        self.clients.insert(id, tx);
        self.held.insert(id, HashSet::new());
    }

    pub fn remove_client(&mut self, id: &Uuid) {
        self.clients.remove(id);
        self.held.remove(id);
    }

    /// Replace the signals a client is currently holding.
    pub fn update_input(&mut self, id: &Uuid, signals: impl IntoIterator<Item = Signal>) {
        if let Some(held) = self.held.get_mut(id) {
            *held = signals.into_iter().collect();
        }
    }

    /// Union of every client's held signals; all clients share one walker.
    pub fn held_signals(&self) -> HashSet<Signal> {
        self.held.values().flatten().copied().collect()
    }

    /// Serialize a snapshot once and send it to every client. Clients whose
    /// channel has closed are dropped.
    pub fn broadcast_snapshot(&mut self, snapshot: &Snapshot) {
        let json = match serde_json::to_string(snapshot) {
            Ok(json) => json,
            Err(err) => {
                warn!(%err, "failed to serialize snapshot");
                return;
            }
        };

        let closed: Vec<Uuid> = self
            .clients
            .iter()
            .filter(|(_, tx)| tx.send(json.clone()).is_err())
            .map(|(id, _)| *id)
            .collect();

        for id in closed {
            self.remove_client(&id);
        }
    }
}
