use crate::communication::messages::UpdateMessage;
use crate::error::Result;
use crate::simulation_engine::vehicles::VehicleStatus;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One row of the position trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// 1-based tick that produced the update.
    pub tick: u64,
    pub vehicle_id: String,
    pub x: f64,
    pub y: f64,
    pub status: VehicleStatus,
}

/// Appends every update it is given to a CSV trace with a header row.
///
/// A tick publishes exactly one update per vehicle, so the tick number is
/// derived from the fleet size. The log must see every update from the
/// first tick onwards.
pub struct PositionLog<W: Write> {
    writer: csv::Writer<W>,
    vehicles_per_tick: u64,
    records: u64,
}

impl PositionLog<File> {
    /// Creates (or truncates) the trace file at `path`.
    pub fn create(path: impl AsRef<Path>, vehicles_per_tick: usize) -> Result<Self> {
        Ok(Self::from_csv_writer(
            csv::Writer::from_path(path)?,
            vehicles_per_tick,
        ))
    }
}

impl<W: Write> PositionLog<W> {
    pub fn from_writer(writer: W, vehicles_per_tick: usize) -> Self {
        Self::from_csv_writer(csv::Writer::from_writer(writer), vehicles_per_tick)
    }

    fn from_csv_writer(writer: csv::Writer<W>, vehicles_per_tick: usize) -> Self {
        Self {
            writer,
            vehicles_per_tick: vehicles_per_tick.max(1) as u64,
            records: 0,
        }
    }

    pub fn record(&mut self, message: &UpdateMessage) -> Result<()> {
        let tick = self.records / self.vehicles_per_tick + 1;
        self.records += 1;
        self.writer.serialize(PositionRecord {
            tick,
            vehicle_id: message.vehicle_id.clone(),
            x: message.position.x,
            y: message.position.y,
            status: message.status,
        })?;
        Ok(())
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}
