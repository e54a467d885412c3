// clock.rs
//
// Periodic driver of the simulation. A single tokio task ticks at a fixed
// interval after an initial delay; every tick advances the whole fleet and
// publishes one update per vehicle. Ticks never overlap: a tick that runs
// late causes the missed ticks to be skipped rather than queued.
//
// Phase and tick count are atomics, readable at any time (listeners
// included). The fleet sits behind a mutex held for the whole tick, and the
// tick re-reads the phase before each publish. `stop` flips the phase and
// then waits on that mutex, so once it returns nothing more is published.
// A listener may call `stop` itself: the wait is skipped and the tick ends
// after the update being delivered.

use crate::communication::update_channel::UpdateChannel;
use crate::error::{Result, SimulationError};
use crate::simulation_engine::fleet::Fleet;
use crate::simulation_engine::routes::RouteStore;
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    pub initial_delay: Duration,
    pub interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClockPhase {
    Idle,
    Running,
    Stopped,
}

impl ClockPhase {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => ClockPhase::Idle,
            1 => ClockPhase::Running,
            _ => ClockPhase::Stopped,
        }
    }
}

thread_local! {
    // Address of the clock whose tick is executing on this thread, 0 if none.
    static TICKING: Cell<usize> = const { Cell::new(0) };
}

struct TickTarget {
    routes: Arc<RouteStore>,
    fleet: Fleet,
    sink: Arc<UpdateChannel>,
}

struct ClockShared {
    phase: AtomicU8,
    ticks: AtomicU64,
    target: Mutex<Option<TickTarget>>,
}

impl ClockShared {
    fn phase(&self) -> ClockPhase {
        ClockPhase::from_raw(self.phase.load(Ordering::Acquire))
    }

    fn is_running(&self) -> bool {
        self.phase() == ClockPhase::Running
    }

    /// Running -> Stopped. Returns `false` if the clock was not running.
    fn halt(&self) -> bool {
        self.phase
            .compare_exchange(
                ClockPhase::Running as u8,
                ClockPhase::Stopped as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    fn target(&self) -> MutexGuard<'_, Option<TickTarget>> {
        self.target.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(&self) -> usize {
        self as *const Self as usize
    }

    fn ticking_on_this_thread(&self) -> bool {
        TICKING.with(|ticking| ticking.get() == self.key())
    }
}

/// Marks the current thread as inside a tick of one clock until dropped.
struct TickMarker {
    previous: usize,
}

impl TickMarker {
    fn enter(shared: &ClockShared) -> Self {
        let previous = TICKING.with(|ticking| ticking.replace(shared.key()));
        Self { previous }
    }
}

impl Drop for TickMarker {
    fn drop(&mut self) {
        TICKING.with(|ticking| ticking.set(self.previous));
    }
}

pub struct SimulationClock {
    config: ClockConfig,
    shared: Arc<ClockShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SimulationClock {
    pub fn new(config: ClockConfig) -> Result<Self> {
        if config.interval.is_zero() {
            return Err(SimulationError::InvalidConfig(
                "tick interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            config,
            shared: Arc::new(ClockShared {
                phase: AtomicU8::new(ClockPhase::Idle as u8),
                ticks: AtomicU64::new(0),
                target: Mutex::new(None),
            }),
            task: Mutex::new(None),
        })
    }

    /// Begins ticking on the current tokio runtime. The clock takes ownership
    /// of the fleet; from here on only the tick task mutates it.
    pub fn start(
        &self,
        routes: Arc<RouteStore>,
        fleet: Fleet,
        sink: Arc<UpdateChannel>,
    ) -> Result<()> {
        let handle = Handle::try_current().map_err(|_| {
            SimulationError::InvalidState("clock must be started inside a tokio runtime")
        })?;

        if let Err(current) = self.shared.phase.compare_exchange(
            ClockPhase::Idle as u8,
            ClockPhase::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            return Err(match ClockPhase::from_raw(current) {
                ClockPhase::Running => SimulationError::InvalidState("clock is already running"),
                _ => SimulationError::InvalidState("a stopped clock cannot be restarted"),
            });
        }
        *self.shared.target() = Some(TickTarget {
            routes,
            fleet,
            sink,
        });

        log::info!(
            "Starting simulation clock: first tick in {:?}, then every {:?}",
            self.config.initial_delay,
            self.config.interval
        );
        let task = handle.spawn(run_ticks(Arc::clone(&self.shared), self.config));
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        Ok(())
    }

    /// Halts ticking. A no-op on a clock that never started or already stopped.
    ///
    /// From any other thread this waits for an in-flight tick to finish.
    /// Called from the listener during a tick, it returns at once and the
    /// tick publishes nothing after the current update.
    pub fn stop(&self) {
        if !self.shared.halt() {
            return;
        }
        log::info!("Simulation clock stopped after {} ticks", self.ticks());

        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        if !self.shared.ticking_on_this_thread() {
            // Blocks until a tick running elsewhere has released the fleet.
            drop(self.shared.target());
        }
    }

    pub fn phase(&self) -> ClockPhase {
        self.shared.phase()
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Number of ticks that ran to completion or were cut short by `stop`.
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Acquire)
    }

    pub fn config(&self) -> ClockConfig {
        self.config
    }
}

impl Drop for SimulationClock {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_ticks(shared: Arc<ClockShared>, config: ClockConfig) {
    let mut interval = interval_at(Instant::now() + config.initial_delay, config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        match fire(&shared) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                log::error!("Simulation tick failed, halting clock: {}", e);
                break;
            }
        }
    }
}

/// Runs one tick. Returns `Ok(false)` once the clock is no longer running.
/// A tick that fails or panics stops the clock.
fn fire(shared: &ClockShared) -> Result<bool> {
    let mut guard = shared.target();
    if !shared.is_running() {
        return Ok(false);
    }
    let Some(target) = guard.as_mut() else {
        shared.halt();
        return Err(SimulationError::InvalidState("running clock has nothing to tick"));
    };

    let outcome = {
        let _marker = TickMarker::enter(shared);
        panic::catch_unwind(AssertUnwindSafe(|| {
            target
                .fleet
                .advance_while(&target.routes, &target.sink, || shared.is_running())
        }))
    };

    match outcome {
        Ok(Ok(delivered)) => {
            let tick = shared.ticks.fetch_add(1, Ordering::AcqRel) + 1;
            log::trace!("Tick {} delivered {} updates", tick, delivered);
            Ok(shared.is_running())
        }
        Ok(Err(e)) => {
            shared.halt();
            Err(e)
        }
        Err(payload) => {
            shared.halt();
            Err(SimulationError::ListenerPanicked(panic_message(payload.as_ref())))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::messages::{Point, UpdateMessage};
    use crate::simulation_engine::routes::RouteId;
    use crate::simulation_engine::vehicles::{Vehicle, VehicleStatus};
    use std::sync::atomic::AtomicBool;
    use std::sync::Barrier;

    fn routes() -> Arc<RouteStore> {
        let line: Vec<Point> = (0..4).map(|i| Point::new(i as f64, 0.0)).collect();
        Arc::new(RouteStore::from_point_lists(vec![line]).unwrap())
    }

    fn fleet() -> Fleet {
        Fleet::from_vehicles(vec![
            Vehicle::new("VEH1", RouteId(1), 1, VehicleStatus::OnRoute),
            Vehicle::new("VEH2", RouteId(1), 2, VehicleStatus::OffDuty),
        ])
    }

    fn recording_channel() -> (Arc<UpdateChannel>, Arc<Mutex<Vec<UpdateMessage>>>) {
        let channel = Arc::new(UpdateChannel::new());
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        channel.subscribe(move |msg| sink.lock().unwrap().push(msg));
        (channel, received)
    }

    fn reference_config() -> ClockConfig {
        ClockConfig {
            initial_delay: Duration::from_millis(1000),
            interval: Duration::from_millis(20),
        }
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = SimulationClock::new(ClockConfig {
            initial_delay: Duration::ZERO,
            interval: Duration::ZERO,
        });
        assert!(matches!(result, Err(SimulationError::InvalidConfig(_))));
    }

    #[test]
    fn start_outside_runtime_is_invalid_state() {
        let clock = SimulationClock::new(reference_config()).unwrap();
        let (channel, _) = recording_channel();
        let result = clock.start(routes(), fleet(), channel);
        assert!(matches!(result, Err(SimulationError::InvalidState(_))));
        assert_eq!(clock.phase(), ClockPhase::Idle);
    }

    #[test]
    fn stop_before_start_is_a_no_op() {
        let clock = SimulationClock::new(reference_config()).unwrap();
        clock.stop();
        assert_eq!(clock.phase(), ClockPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_initial_delay_then_ticks_at_interval() {
        let clock = SimulationClock::new(reference_config()).unwrap();
        let (channel, received) = recording_channel();
        clock.start(routes(), fleet(), channel).unwrap();

        tokio::time::sleep(Duration::from_millis(990)).await;
        assert_eq!(clock.ticks(), 0);
        assert!(received.lock().unwrap().is_empty());

        // Ticks land at 1000, 1020 and 1040 ms.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(clock.ticks(), 3);
        assert_eq!(received.lock().unwrap().len(), 6);

        clock.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn each_tick_publishes_fleet_in_order() {
        let clock = SimulationClock::new(reference_config()).unwrap();
        let (channel, received) = recording_channel();
        clock.start(routes(), fleet(), channel).unwrap();

        tokio::time::sleep(Duration::from_millis(1030)).await;
        clock.stop();

        let received = received.lock().unwrap();
        let summary: Vec<(&str, f64)> = received
            .iter()
            .map(|m| (m.vehicle_id.as_str(), m.position.x))
            .collect();
        // Four points: positions run 1 -> 2 -> 3 -> 1, point 4 is never reached.
        assert_eq!(
            summary,
            vec![("VEH1", 1.0), ("VEH2", 2.0), ("VEH1", 2.0), ("VEH2", 0.0)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_published_after_stop() {
        let clock = SimulationClock::new(reference_config()).unwrap();
        let (channel, received) = recording_channel();
        clock.start(routes(), fleet(), channel).unwrap();

        tokio::time::sleep(Duration::from_millis(1050)).await;
        clock.stop();
        let published = received.lock().unwrap().len();
        assert!(published > 0);

        // Even if the scheduler fires again, a stopped clock stays silent.
        assert!(!fire(&clock.shared).unwrap());
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(received.lock().unwrap().len(), published);
        assert_eq!(clock.phase(), ClockPhase::Stopped);
    }

    #[tokio::test]
    async fn cannot_start_twice_or_restart() {
        let clock = SimulationClock::new(reference_config()).unwrap();
        let (channel, _) = recording_channel();
        clock.start(routes(), fleet(), Arc::clone(&channel)).unwrap();
        assert!(matches!(
            clock.start(routes(), fleet(), Arc::clone(&channel)),
            Err(SimulationError::InvalidState(_))
        ));

        clock.stop();
        assert!(matches!(
            clock.start(routes(), fleet(), channel),
            Err(SimulationError::InvalidState(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_tick_halts_the_clock() {
        let clock = SimulationClock::new(reference_config()).unwrap();
        let (channel, received) = recording_channel();
        let broken = Fleet::from_vehicles(vec![Vehicle::new(
            "VEH1",
            RouteId(7),
            1,
            VehicleStatus::Available,
        )]);
        clock.start(routes(), broken, channel).unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(clock.phase(), ClockPhase::Stopped);
        assert_eq!(clock.ticks(), 0);
        assert!(received.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn listener_can_stop_the_clock_mid_tick() {
        let clock = Arc::new(SimulationClock::new(reference_config()).unwrap());
        let channel = Arc::new(UpdateChannel::new());
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let handle = Arc::downgrade(&clock);
        channel.subscribe(move |msg| {
            sink.lock().unwrap().push(msg);
            if let Some(clock) = handle.upgrade() {
                clock.stop();
            }
        });
        clock.start(routes(), fleet(), channel).unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(received.lock().unwrap().len(), 1);
        assert_eq!(received.lock().unwrap()[0].vehicle_id, "VEH1");
        assert_eq!(clock.phase(), ClockPhase::Stopped);
        assert_eq!(clock.ticks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_listener_halts_the_clock() {
        let clock = SimulationClock::new(reference_config()).unwrap();
        let channel = Arc::new(UpdateChannel::new());
        channel.subscribe(|_| panic!("listener failure"));
        clock.start(routes(), fleet(), channel).unwrap();

        tokio::time::sleep(Duration::from_millis(1200)).await;

        assert!(!clock.is_running());
        assert_eq!(clock.phase(), ClockPhase::Stopped);
        assert_eq!(clock.ticks(), 0);
        clock.stop();
    }

    #[test]
    fn panic_payload_is_reported() {
        let payload = panic::catch_unwind(|| panic!("bad listener {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "bad listener 7");
        let payload = panic::catch_unwind(|| panic!("fixed text")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "fixed text");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn phase_and_ticks_are_readable_during_a_tick() {
        let clock = Arc::new(
            SimulationClock::new(ClockConfig {
                initial_delay: Duration::from_millis(10),
                interval: Duration::from_millis(10),
            })
            .unwrap(),
        );
        let gate = Arc::new(Barrier::new(2));
        let first = AtomicBool::new(true);
        let listener_gate = Arc::clone(&gate);
        let channel = Arc::new(UpdateChannel::new());
        channel.subscribe(move |_| {
            if first.swap(false, Ordering::SeqCst) {
                // Hold the first tick open until the observer has looked.
                listener_gate.wait();
                listener_gate.wait();
            }
        });
        clock.start(routes(), fleet(), channel).unwrap();

        let observer = Arc::clone(&clock);
        let observed = tokio::task::spawn_blocking(move || {
            gate.wait();
            let seen = (observer.is_running(), observer.ticks());
            gate.wait();
            seen
        });
        let seen = tokio::time::timeout(Duration::from_secs(5), observed)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(seen, (true, 0));
        clock.stop();
        assert_eq!(clock.phase(), ClockPhase::Stopped);
    }
}
