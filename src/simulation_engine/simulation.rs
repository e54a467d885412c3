// simulation.rs
//
// Startup sequence and collaborator surface of the position simulator:
// routes are loaded first, then the fleet is placed, then the clock is
// built. Consumers subscribe once and call `start`/`stop`.

use crate::communication::messages::UpdateMessage;
use crate::communication::update_channel::UpdateChannel;
use crate::config::SimulationConfig;
use crate::error::{Result, SimulationError};
use crate::simulation_engine::clock::{ClockConfig, ClockPhase, SimulationClock};
use crate::simulation_engine::fleet::Fleet;
use crate::simulation_engine::routes::RouteStore;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex, PoisonError};

pub struct Simulation {
    routes: Arc<RouteStore>,
    /// Handed to the clock on `start`.
    fleet: Mutex<Option<Fleet>>,
    vehicle_count: usize,
    channel: Arc<UpdateChannel>,
    clock: SimulationClock,
}

impl Simulation {
    /// Loads routes and places the fleet as described by `config`.
    pub fn new(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;
        let routes = RouteStore::load(&config.route_directory)?;

        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        let fleet = Fleet::create(config.total_vehicles, &routes, &mut rng)?;

        Self::from_parts(
            routes,
            fleet,
            ClockConfig {
                initial_delay: config.initial_delay(),
                interval: config.tick_interval(),
            },
        )
    }

    /// Assembles a simulation from an already loaded route set and fleet.
    pub fn from_parts(routes: RouteStore, fleet: Fleet, clock: ClockConfig) -> Result<Self> {
        let clock = SimulationClock::new(clock)?;
        Ok(Self {
            routes: Arc::new(routes),
            vehicle_count: fleet.len(),
            fleet: Mutex::new(Some(fleet)),
            channel: Arc::new(UpdateChannel::new()),
            clock,
        })
    }

    /// Registers the update listener. Only the first registration takes
    /// effect; returns whether this call registered.
    pub fn subscribe<F>(&self, listener: F) -> bool
    where
        F: Fn(UpdateMessage) + Send + Sync + 'static,
    {
        self.channel.subscribe(listener)
    }

    /// Starts the clock on the current tokio runtime.
    pub fn start(&self) -> Result<()> {
        if self.clock.phase() != ClockPhase::Idle {
            return Err(SimulationError::InvalidState("simulation has already been started"));
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(SimulationError::InvalidState(
                "simulation must be started inside a tokio runtime",
            ));
        }
        if !self.channel.has_listener() {
            log::warn!("Starting simulation without a listener; updates will be dropped");
        }

        let fleet = self
            .fleet
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(SimulationError::InvalidState("simulation has already been started"))?;
        self.clock
            .start(Arc::clone(&self.routes), fleet, Arc::clone(&self.channel))
    }

    pub fn stop(&self) {
        self.clock.stop();
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn ticks_elapsed(&self) -> u64 {
        self.clock.ticks()
    }

    pub fn route_count(&self) -> usize {
        self.routes.route_count()
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicle_count
    }
}
