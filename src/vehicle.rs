// ==============================================================================
// vehicle.rs — VEHICLE ENTITY (OCCUPANCY EXECUTOR)
// ------------------------------------------------------------------------------
// Owns everything one car needs: classified parts, tuning profile, constraint
// rig, occupancy state, seated driver and the per-tick event queue.
//
// tick():
//   1. drain queued events (door proximity, nudges) in arrival order
//   2. evaluate OccupancyState::step() against this tick's facts
//   3. carry out the returned effect (control, slowdown, suspend, disembark)
//
// Invariants:
//   - driver.is_some() ⇒ rig attached
//   - suspended ⇔ rig detached
//   - suspend() is refused while a driver is seated
// ==============================================================================

use std::collections::VecDeque;

use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};
use tracing::{debug, info, warn};

use crate::drive::{DriveCommand, apply_slowdown, steering_wheel_rotation};
use crate::engine::{ConstraintId, Engine, ObjectId};
use crate::error::VehicleError;
use crate::exit::{ExitProbe, find_exit};
use crate::input::{InputQuery, Signal};
use crate::occupancy::{Effect, OccupancyState, TickFacts};
use crate::occupant::{Control, OccupantId, Occupants};
use crate::parts::{VehicleParts, brand_tag};
use crate::profile::{TuningTable, VehicleProfile};
use crate::rig::VehicleRig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleEvent {
    /// An occupant is standing in the door sensor.
    DoorProximity { occupant: OccupantId },
    /// Another vehicle's body sensor touched this one.
    Nudged,
}

/// Everything a tick handler may touch besides the vehicle itself.
pub struct TickContext<'a, E: ?Sized, I: ?Sized> {
    pub engine: &'a mut E,
    pub input: &'a I,
    pub occupants: &'a mut Occupants,
}

#[derive(Debug)]
pub struct Vehicle {
    brand: String,
    profile: VehicleProfile,
    parts: VehicleParts,
    rig: VehicleRig,
    state: OccupancyState,
    driver: Option<OccupantId>,
    steering: f32,
    suspended: bool,
    events: VecDeque<VehicleEvent>,
}

impl Vehicle {
    /// Build a vehicle from a chassis object. The chassis' children are
    /// classified once, the brand is resolved against `table`, and the
    /// constraint is attached so the car starts out settling.
    pub fn spawn<E: Engine + ?Sized>(engine: &mut E, chassis: ObjectId, table: &TuningTable) -> Result<Self, VehicleError> {
        let parts = VehicleParts::classify(&*engine, chassis)?;
        let tag = brand_tag(&*engine, chassis)?;
        let (brand, profile) = table.lookup(tag.as_deref())?;

        let mut vehicle = Self {
            brand: brand.to_string(),
            profile: *profile,
            parts,
            rig: VehicleRig::new(),
            state: OccupancyState::SETTLE,
            driver: None,
            steering: 0.0,
            suspended: false,
            events: VecDeque::new(),
        };
        vehicle.rig.attach(engine, &vehicle.parts, &vehicle.profile, vehicle.steering);

        info!(brand = %vehicle.brand, chassis = chassis.0, "🚗 vehicle spawned");
        Ok(vehicle)
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn profile(&self) -> &VehicleProfile {
        &self.profile
    }

    pub fn parts(&self) -> &VehicleParts {
        &self.parts
    }

    pub fn chassis(&self) -> ObjectId {
        self.parts.chassis
    }

    pub fn state(&self) -> OccupancyState {
        self.state
    }

    pub fn driver(&self) -> Option<OccupantId> {
        self.driver
    }

    pub fn has_driver(&self) -> bool {
        self.driver.is_some()
    }

    pub fn steering_angle(&self) -> f32 {
        self.steering
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn constraint(&self) -> Option<ConstraintId> {
        self.rig.handle()
    }

    pub fn push_event(&mut self, event: VehicleEvent) {
        self.events.push_back(event);
    }

    pub fn tick<E, I>(&mut self, ctx: &mut TickContext<'_, E, I>)
    where
        E: Engine + ?Sized,
        I: InputQuery + ?Sized,
    {
        // A driver seated this tick holds the vehicle in Start until the next one.
        if self.drain_events(ctx) {
            return;
        }

        let facts = TickFacts {
            interact: ctx.input.hit(Signal::Action),
            speed: self.speed(&*ctx.engine),
        };
        let step = self.state.step(&facts);
        let previous = self.state;
        self.state = step.next;

        match step.effect {
            Effect::None => {}
            Effect::Control => {
                let speed = ctx.engine.linear_velocity(self.parts.chassis).norm();
                self.control(&mut *ctx.engine, ctx.input, speed);
            }
            Effect::Slowdown => self.slowdown(&mut *ctx.engine),
            Effect::Suspend => {
                if !self.suspend(&mut *ctx.engine) {
                    self.state = OccupancyState::SETTLE;
                }
            }
            Effect::Disembark => {
                self.try_disembark(&mut *ctx.engine, ctx.occupants);
            }
        }

        if previous != self.state && !matches!(self.state, OccupancyState::Settling { .. }) {
            debug!(brand = %self.brand, from = previous.name(), to = self.state.name(), "vehicle state");
        }
    }

    /// Returns true when a driver boarded.
    fn drain_events<E, I>(&mut self, ctx: &mut TickContext<'_, E, I>) -> bool
    where
        E: Engine + ?Sized,
        I: InputQuery + ?Sized,
    {
        let mut boarded = false;
        while let Some(event) = self.events.pop_front() {
            match event {
                VehicleEvent::DoorProximity { occupant } => {
                    if ctx.input.hit(Signal::Action) {
                        boarded |= self.add_driver(&mut *ctx.engine, ctx.occupants, occupant);
                    }
                }
                VehicleEvent::Nudged => {
                    self.restore(&mut *ctx.engine);
                }
            }
        }
        boarded
    }

    fn speed<E: Engine + ?Sized>(&self, engine: &E) -> f32 {
        let chassis = self.parts.chassis;
        engine.linear_velocity(chassis).norm() + engine.angular_velocity(chassis).norm()
    }

    fn control<E, I>(&mut self, engine: &mut E, input: &I, speed: f32)
    where
        E: Engine + ?Sized,
        I: InputQuery + ?Sized,
    {
        let Some(constraint) = self.rig.handle() else {
            warn!(brand = %self.brand, "drive tick without a constraint");
            return;
        };

        let command = DriveCommand::from_input(input, &self.profile, self.steering, speed);
        command.apply(engine, constraint, &self.profile);
        self.steering = command.steering;

        let rest = self.parts.steering_wheel_rest;
        let turned = steering_wheel_rotation(self.steering, self.profile.steering_wheel_turn_fac);
        engine.set_local_transform(
            self.parts.steering_wheel,
            Isometry3::from_parts(rest.translation, rest.rotation * turned),
        );
    }

    fn slowdown<E: Engine + ?Sized>(&mut self, engine: &mut E) {
        if let Some(constraint) = self.rig.handle() {
            apply_slowdown(engine, constraint, &self.profile);
        }
    }

    fn try_disembark<E: Engine + ?Sized>(&mut self, engine: &mut E, occupants: &mut Occupants) -> bool {
        let Some(driver) = self.driver else {
            return false;
        };
        let Some(occupant) = occupants.get(driver).copied() else {
            return false;
        };

        let probe = ExitProbe::gather(&*engine, occupant.object, self.parts.door_sensor);
        let exclude = [self.parts.chassis, occupant.object];

        match find_exit(&probe, &*engine, &exclude) {
            Some(spot) => self.remove_driver(engine, occupants, spot),
            None => {
                debug!(brand = %self.brand, "no clear exit, staying parked");
                false
            }
        }
    }

    /// Seat `occupant`. Refused unless the seat is free, the vehicle is idle or
    /// settling and the occupant's own controller is active.
    pub fn add_driver<E: Engine + ?Sized>(&mut self, engine: &mut E, occupants: &mut Occupants, occupant: OccupantId) -> bool {
        if self.driver.is_some() || !self.state.accepts_driver() || !occupants.is_active(occupant) {
            return false;
        }
        let Some(object) = occupants.get(occupant).map(|o| o.object) else {
            return false;
        };

        if self.suspended {
            self.wake(engine);
        }

        engine.suspend_dynamics(object);
        engine.set_parent(object, Some(self.parts.seat));
        let seat = engine.world_transform(self.parts.seat);
        engine.set_world_transform(object, seat);

        occupants.set_control(occupant, Control::Inactive);
        self.driver = Some(occupant);
        self.state = OccupancyState::Start;

        info!(brand = %self.brand, occupant = occupant.0, "🧍 driver boarded");
        true
    }

    /// Drop the seated driver at `position` and start settling.
    pub fn remove_driver<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        occupants: &mut Occupants,
        position: Point3<f32>,
    ) -> bool {
        let Some(driver) = self.driver else {
            return false;
        };
        let Some(object) = occupants.get(driver).map(|o| o.object) else {
            return false;
        };

        engine.set_parent(object, None);
        engine.restore_dynamics(object);
        engine.set_linear_velocity(object, Vector3::zeros());
        engine.set_angular_velocity(object, Vector3::zeros());

        let world = engine.world_transform(object);
        let (_, _, yaw) = world.rotation.euler_angles();
        let level = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw);
        engine.set_world_transform(object, Isometry3::from_parts(position.coords.into(), level));

        occupants.set_control(driver, Control::Active);
        self.driver = None;
        self.state = OccupancyState::SETTLE;

        info!(brand = %self.brand, occupant = driver.0, ?position, "🚪 driver exited");
        true
    }

    /// Freeze the chassis into a static proxy. Refused while a driver is
    /// seated or when already suspended.
    pub fn suspend<E: Engine + ?Sized>(&mut self, engine: &mut E) -> bool {
        if self.driver.is_some() {
            debug!(brand = %self.brand, "suspend refused, driver seated");
            return false;
        }
        if self.suspended {
            return false;
        }

        let chassis = self.parts.chassis;
        engine.set_linear_velocity(chassis, Vector3::zeros());
        engine.set_angular_velocity(chassis, Vector3::zeros());
        self.rig.detach(engine, &self.parts, self.steering);
        engine.suspend_dynamics(chassis);
        self.suspended = true;

        info!(brand = %self.brand, "💤 vehicle suspended");
        true
    }

    /// Bring a suspended chassis back to life. Without a driver the vehicle
    /// settles again before it can be suspended.
    pub fn restore<E: Engine + ?Sized>(&mut self, engine: &mut E) -> bool {
        if !self.suspended {
            return false;
        }

        self.wake(engine);
        if self.driver.is_none() {
            self.state = OccupancyState::SETTLE;
        }

        info!(brand = %self.brand, "vehicle restored");
        true
    }

    fn wake<E: Engine + ?Sized>(&mut self, engine: &mut E) {
        engine.restore_dynamics(self.parts.chassis);
        self.rig.attach(engine, &self.parts, &self.profile, self.steering);
        self.suspended = false;
    }
}
