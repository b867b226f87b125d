//! Run configuration loaded from JSON.
//!
//! The enclosure comes either inline as `"walls": [[x1, y1, x2, y2], ...]` or from a setup
//! record via `"setup": "path/to/setup.txt"`. Every other key is optional.
//!
//! ```json
//! {
//!   "setup": "setup.txt",
//!   "particles": 200,
//!   "L": 0.05,              // opening of the connecting chamber
//!   "radius": 0.0015,
//!   "mass": 1.0,
//!   "velocity": 0.01,       // initial speed, random direction
//!   "steps": 50000,         // event budget
//!   "max_time": 120.0,      // simulated-time horizon
//!   "seed": 42,
//!   "spawn": [0.0, 0.0, 0.09, 0.09],
//!   "snapshot": { "every": 10 },
//!   "vertex_collisions": true,
//!   "snapshot_radius": false
//! }
//! ```
//!
//! `"initial": "steps/0.txt"` loads particles from a snapshot instead of placing them at
//! random; `spawn` restricts random placement to a rectangle. Relative paths are resolved
//! against the config file.

use crate::core::particle::{DEFAULT_MASS, DEFAULT_RADIUS};
use crate::core::{place_particles, Enclosure, Particle, Placement, RunOptions, Simulation, Vector};
use crate::error::{Error, Result};
use crate::input;
use crate::output::SnapshotCadence;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_particles() -> usize {
    200
}
fn default_gap() -> f64 {
    0.05
}
fn default_radius() -> f64 {
    DEFAULT_RADIUS
}
fn default_mass() -> f64 {
    DEFAULT_MASS
}
fn default_velocity() -> f64 {
    0.01
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    #[serde(default = "default_particles")]
    pub particles: usize,
    /// Opening of the connecting chamber, carried into the setup record.
    #[serde(rename = "L", default = "default_gap")]
    pub gap: f64,
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default = "default_mass")]
    pub mass: f64,
    /// Initial speed of every particle.
    #[serde(default = "default_velocity")]
    pub velocity: f64,
    /// Event budget.
    #[serde(default)]
    pub steps: Option<u64>,
    #[serde(default)]
    pub max_time: Option<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub walls: Option<Vec<[f64; 4]>>,
    #[serde(default)]
    pub setup: Option<PathBuf>,
    #[serde(default)]
    pub initial: Option<PathBuf>,
    /// `[x_min, y_min, x_max, y_max]`
    #[serde(default)]
    pub spawn: Option<[f64; 4]>,
    #[serde(default)]
    pub snapshot: SnapshotCadence,
    #[serde(default = "default_true")]
    pub vertex_collisions: bool,
    /// Append each particle's radius to snapshot lines.
    #[serde(default)]
    pub snapshot_radius: bool,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            particles: default_particles(),
            gap: default_gap(),
            radius: default_radius(),
            mass: default_mass(),
            velocity: default_velocity(),
            steps: None,
            max_time: None,
            seed: None,
            walls: None,
            setup: None,
            initial: None,
            spawn: None,
            snapshot: SnapshotCadence::default(),
            vertex_collisions: true,
            snapshot_radius: false,
            base_dir: None,
        }
    }
}

impl SimConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut cfg: SimConfig = serde_json::from_str(&text)?;
        cfg.base_dir = path.parent().map(Path::to_path_buf);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate; relative paths stay relative to the working directory.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let cfg: SimConfig = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64, name: &str| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(Error::Config(format!("{name} must be finite and > 0, got {v}")))
            }
        };
        positive(self.radius, "radius")?;
        positive(self.mass, "mass")?;
        if !self.velocity.is_finite() || self.velocity < 0.0 {
            return Err(Error::Config(format!(
                "velocity must be finite and >= 0, got {}",
                self.velocity
            )));
        }
        if let Some(t) = self.max_time {
            positive(t, "max_time")?;
        }
        if self.walls.is_some() && self.setup.is_some() {
            return Err(Error::Config("give either `walls` or `setup`, not both".into()));
        }
        if self.walls.is_none() && self.setup.is_none() {
            return Err(Error::Config("the enclosure needs either `walls` or `setup`".into()));
        }
        if self.walls.is_some() {
            positive(self.gap, "L")?;
        }
        match self.snapshot {
            SnapshotCadence::Every(0) => {
                return Err(Error::Config("snapshot.every must be >= 1".into()))
            }
            SnapshotCadence::Interval(dt) if !dt.is_finite() || dt <= 0.0 => {
                return Err(Error::Config("snapshot.interval must be finite and > 0".into()))
            }
            _ => {}
        }
        if let Some([x0, y0, x1, y1]) = self.spawn {
            if !(x0 < x1 && y0 < y1) {
                return Err(Error::Config("spawn must be [x_min, y_min, x_max, y_max] with positive area".into()));
            }
        }
        Ok(())
    }

    fn resolve_path(&self, p: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if p.is_relative() => base.join(p),
            _ => p.to_path_buf(),
        }
    }

    /// Wall segments and the opening `L` reported in the setup record.
    pub fn segments(&self) -> Result<(Vec<[f64; 4]>, f64)> {
        if let Some(walls) = &self.walls {
            return Ok((walls.clone(), self.gap));
        }
        let path = self
            .setup
            .as_ref()
            .ok_or_else(|| Error::Config("the enclosure needs either `walls` or `setup`".into()))?;
        let setup = input::read_setup_file(&self.resolve_path(path))?;
        if setup.count != self.particles && self.initial.is_none() {
            tracing::warn!(
                setup = setup.count,
                config = self.particles,
                "setup record particle count differs from config; using config"
            );
        }
        Ok((setup.walls, setup.gap))
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            max_events: self.steps,
            max_time: self.max_time,
            vertex_collisions: self.vertex_collisions,
        }
    }

    /// Initial particles: loaded from `initial` if set, otherwise placed at random.
    pub fn particles(&self, enclosure: &Enclosure) -> Result<Vec<Particle>> {
        if let Some(path) = &self.initial {
            let rows = input::read_snapshot_file(&self.resolve_path(path))?;
            return input::particles_from_rows(&rows, self.radius, self.mass);
        }
        let spawn = self
            .spawn
            .map(|[x0, y0, x1, y1]| (Vector::new(x0, y0), Vector::new(x1, y1)));
        place_particles(
            enclosure,
            &Placement {
                count: self.particles,
                radius: self.radius,
                mass: self.mass,
                speed: self.velocity,
                spawn,
                seed: self.seed,
            },
        )
    }

    /// Build the enclosure, the initial particles and a seeded simulation.
    pub fn build(&self) -> Result<Simulation> {
        self.build_with_gap().map(|(sim, _)| sim)
    }

    /// Like [`build`](Self::build), also returning the opening `L` for the setup record.
    /// The setup file is read once.
    pub fn build_with_gap(&self) -> Result<(Simulation, f64)> {
        let (segments, gap) = self.segments()?;
        let enclosure = Enclosure::from_segments(&segments)?;
        let particles = self.particles(&enclosure)?;
        let sim = Simulation::new(particles, enclosure, self.run_options())?;
        Ok((sim, gap))
    }
}
