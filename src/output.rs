//! Persisted artifacts: collision log, snapshots and the setup record.
//!
//! Layout of an output directory:
//! - `setup.txt`: `"<particle_count> <L>"` followed by one `"<x1> <y1> <x2> <y2>"` per wall
//! - `events.txt`: one `"<time> <TYPE> <a> <b>"` line per resolved collision
//! - `steps/<n>.txt`: `"<x> <y> <vx> <vy>[ <radius>]"` per particle, state after log line `n`

use crate::core::{Collision, Particle, Wall};
use crate::error::Result;
use crate::input::SnapshotRow;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const EVENTS_FILE: &str = "events.txt";
pub const SETUP_FILE: &str = "setup.txt";
pub const STEPS_DIR: &str = "steps";

/// When to write a full particle snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotCadence {
    Never,
    /// After every `n`-th collision (log lines 0, n, 2n, ...).
    Every(u64),
    /// After the first collision at or past each multiple of this simulated-time interval.
    Interval(f64),
}

impl Default for SnapshotCadence {
    fn default() -> Self {
        SnapshotCadence::Every(1)
    }
}

/// Sink for the simulation's output stream.
///
/// Called by [`Simulation::run`](crate::core::Simulation::run) at most once per log index
/// for each method; a failed call is retried with the same index on the next run.
pub trait Recorder {
    fn record(&mut self, collision: &Collision) -> Result<()>;

    fn snapshot(&mut self, index: u64, particles: &[Particle]) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes `events.txt` and `steps/<n>.txt` under an output directory.
#[derive(Debug)]
pub struct FileRecorder {
    events: BufWriter<File>,
    steps_dir: PathBuf,
    with_radius: bool,
}

impl FileRecorder {
    /// Create the output directory, truncate the collision log and clear stale snapshots.
    pub fn create(out_dir: &Path, with_radius: bool) -> Result<Self> {
        fs::create_dir_all(out_dir)?;
        let steps_dir = out_dir.join(STEPS_DIR);
        prepare_dir(&steps_dir)?;
        let events = BufWriter::new(File::create(out_dir.join(EVENTS_FILE))?);
        Ok(Self {
            events,
            steps_dir,
            with_radius,
        })
    }
}

impl Recorder for FileRecorder {
    fn record(&mut self, collision: &Collision) -> Result<()> {
        writeln!(self.events, "{collision}")?;
        Ok(())
    }

    fn snapshot(&mut self, index: u64, particles: &[Particle]) -> Result<()> {
        let path = self.steps_dir.join(format!("{index}.txt"));
        let mut w = BufWriter::new(File::create(path)?);
        write_snapshot(&mut w, particles, self.with_radius)?;
        w.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.events.flush()?;
        Ok(())
    }
}

/// Keeps everything in memory; used by tests and the Python surface.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecorder {
    pub collisions: Vec<Collision>,
    pub snapshots: Vec<MemorySnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemorySnapshot {
    pub index: u64,
    pub rows: Vec<SnapshotRow>,
}

impl MemoryRecorder {
    /// The collision log exactly as [`FileRecorder`] would write it.
    pub fn log_text(&self) -> String {
        self.collisions.iter().map(|c| format!("{c}\n")).collect()
    }
}

impl Recorder for MemoryRecorder {
    fn record(&mut self, collision: &Collision) -> Result<()> {
        self.collisions.push(*collision);
        Ok(())
    }

    fn snapshot(&mut self, index: u64, particles: &[Particle]) -> Result<()> {
        self.snapshots.push(MemorySnapshot {
            index,
            rows: particles.iter().map(SnapshotRow::from).collect(),
        });
        Ok(())
    }
}

/// One line per particle in id order.
pub fn write_snapshot<W: Write>(w: &mut W, particles: &[Particle], with_radius: bool) -> Result<()> {
    for p in particles {
        if with_radius {
            writeln!(w, "{} {} {:.14}", p.r, p.v, p.radius)?;
        } else {
            writeln!(w, "{} {}", p.r, p.v)?;
        }
    }
    Ok(())
}

/// Setup record: `"<count> <L>"` then the walls.
pub fn write_setup<W: Write>(w: &mut W, count: usize, gap: f64, walls: &[Wall]) -> Result<()> {
    writeln!(w, "{count} {gap:.14}")?;
    for wall in walls {
        writeln!(w, "{wall}")?;
    }
    Ok(())
}

/// Create `dir` if missing, otherwise delete the regular files inside it.
fn prepare_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            fs::remove_file(path)?;
        }
    }
    Ok(())
}
