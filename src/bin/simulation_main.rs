// simulation_main.rs
use fleet_sim::monitoring::position_log::PositionLog;
use fleet_sim::monitoring::vehicle_tracker::VehicleTracker;
use fleet_sim::{Simulation, SimulationConfig};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("Simulation error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> fleet_sim::Result<()> {
    // Optional JSON config file as the first argument.
    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::default(),
    };

    let simulation = Simulation::new(&config)?;
    println!(
        "Simulating {} vehicles on {} routes (tick every {} ms)",
        simulation.vehicle_count(),
        simulation.route_count(),
        config.tick_interval_ms
    );

    let tracker = Arc::new(Mutex::new(VehicleTracker::new()));
    let trace = match &config.trace_path {
        Some(path) => Some(Arc::new(Mutex::new(PositionLog::create(
            path,
            simulation.vehicle_count(),
        )?))),
        None => None,
    };

    let listener_tracker = Arc::clone(&tracker);
    let listener_trace = trace.clone();
    simulation.subscribe(move |message| {
        if let Some(trace) = &listener_trace {
            let mut trace = trace.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = trace.record(&message) {
                log::warn!("Failed to record update for {}: {}", message.vehicle_id, e);
            }
        }
        listener_tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(message);
    });

    simulation.start()?;

    let deadline = sleep(
        config
            .run_seconds
            .map(Duration::from_secs)
            .unwrap_or(Duration::MAX),
    );
    tokio::pin!(deadline);
    let mut progress = interval(PROGRESS_INTERVAL);
    progress.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                log::info!("Run time elapsed");
                break;
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    log::error!("Unable to listen for shutdown signal: {}", e);
                }
                log::info!("Shutdown requested");
                break;
            }
            _ = progress.tick() => {
                let tracked = tracker.lock().unwrap_or_else(PoisonError::into_inner).len();
                log::info!(
                    "Tick {}: {} vehicles tracked",
                    simulation.ticks_elapsed(),
                    tracked
                );
            }
        }
    }

    simulation.stop();

    if let Some(trace) = &trace {
        let mut trace = trace.lock().unwrap_or_else(PoisonError::into_inner);
        trace.flush()?;
        println!("Wrote {} position records", trace.records());
    }

    let tracker = tracker.lock().unwrap_or_else(PoisonError::into_inner);
    println!(
        "Stopped after {} ticks; {} updates for {} vehicles",
        simulation.ticks_elapsed(),
        tracker.total_updates(),
        tracker.len()
    );
    for (status, count) in tracker.status_census() {
        println!(
            "  {:<15} {:>7}  marker #{:08X}",
            status.label(),
            count,
            status.marker_color()
        );
    }
    Ok(())
}
