use crate::core::predict::{self, Target};
use crate::core::queue::{EventQueue, QueueStats};
use crate::core::wall::Enclosure;
use crate::core::{resolve, Event, EventKind, Particle, Vector};
use crate::error::{Error, Result};
use crate::output::{Recorder, SnapshotCadence};
use std::fmt;

/// Small numeric tolerance for time checks.
const EPS_TIME: f64 = 1e-12;

/// Initial particles may touch but not interpenetrate by more than this.
const EPS_OVERLAP: f64 = 1e-12;

/// Termination limits and engine switches for a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    /// Stop after this many resolved collisions.
    pub max_events: Option<u64>,
    /// Simulated-time horizon. Predictions beyond it are never queued.
    pub max_time: Option<f64>,
    /// Schedule collisions with wall endpoints.
    pub vertex_collisions: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_events: None,
            max_time: None,
            vertex_collisions: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured event budget was used up.
    StepLimit,
    /// The next event lies beyond the simulated-time horizon.
    TimeHorizon,
    /// No future collision exists (informational early stop).
    QueueExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Seeding,
    Running,
    Done(StopReason),
}

/// One resolved collision: a line of the collision log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    /// 0-based position in the log.
    pub index: u64,
    pub time: f64,
    pub kind: EventKind,
}

/// Log line format: `<time> <TYPE> <a> <b>`.
impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.14} {}", self.time, self.kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub events: u64,
    pub time: f64,
    pub stop: StopReason,
    pub queue: QueueStats,
}

/// A collision whose emission failed and must be offered again before anything else.
#[derive(Debug, Clone, Copy)]
struct Pending {
    collision: Collision,
    recorded: bool,
    snapshot: bool,
}

/// Event-driven hard-disk simulation inside a static polygonal enclosure.
///
/// Owns the particles and the event queue exclusively. Stale queue entries are
/// detected through per-particle collision counters when popped.
#[derive(Debug)]
pub struct Simulation {
    time_now: f64,
    pub particles: Vec<Particle>,
    enclosure: Enclosure,
    pq: EventQueue,
    options: RunOptions,
    phase: Phase,
    processed: u64,
    next_snapshot: Option<f64>,
    pending: Option<Pending>,
}

impl Simulation {
    /// Create a simulation from explicit initial state and seed the event queue.
    ///
    /// Errors (`Error::Config`): particle ids that do not match their index, overlapping
    /// initial disks, disks cutting through a wall or lying outside a closed enclosure,
    /// or a non-positive time horizon.
    pub fn new(particles: Vec<Particle>, enclosure: Enclosure, options: RunOptions) -> Result<Self> {
        for (i, p) in particles.iter().enumerate() {
            if p.id as usize != i {
                return Err(Error::Config(format!(
                    "particle at index {i} has id {}; ids must equal their index",
                    p.id
                )));
            }
        }
        for i in 0..particles.len() {
            for j in (i + 1)..particles.len() {
                if particles[i].overlaps(&particles[j], EPS_OVERLAP) {
                    return Err(Error::Config(format!(
                        "particles {i} and {j} overlap in the initial state"
                    )));
                }
            }
        }
        let closed = enclosure.is_closed();
        for p in &particles {
            if closed && !enclosure.contains(p.r) {
                return Err(Error::Config(format!(
                    "particle {} at ({}) lies outside the enclosure",
                    p.id, p.r
                )));
            }
            if enclosure.clearance(p.r) + EPS_OVERLAP < p.radius {
                return Err(Error::Config(format!(
                    "particle {} at ({}) is closer than its radius to a wall",
                    p.id, p.r
                )));
            }
        }
        if let Some(h) = options.max_time {
            if !h.is_finite() || h <= 0.0 {
                return Err(Error::Config("max_time must be finite and > 0".into()));
            }
        }

        let mut sim = Self {
            time_now: 0.0,
            particles,
            enclosure,
            pq: EventQueue::new(),
            options,
            phase: Phase::Seeding,
            processed: 0,
            next_snapshot: None,
            pending: None,
        };
        sim.schedule_initial_events()?;
        sim.phase = Phase::Running;
        Ok(sim)
    }

    /// Returns current simulation time.
    pub fn time(&self) -> f64 {
        self.time_now
    }

    /// Number of particles.
    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    pub fn enclosure(&self) -> &Enclosure {
        &self.enclosure
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of collisions resolved so far.
    pub fn events_processed(&self) -> u64 {
        self.processed
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.pq.stats()
    }

    /// Compute total kinetic energy (diagnostic).
    pub fn kinetic_energy(&self) -> f64 {
        self.particles.iter().map(|p| p.kinetic_energy()).sum()
    }

    /// Total linear momentum (diagnostic).
    pub fn momentum(&self) -> Vector {
        self.particles
            .iter()
            .fold(Vector::ZERO, |acc, p| acc + p.momentum())
    }

    /// Rebuild the event queue from the current particle states.
    ///
    /// Must be called after externally modifying positions or velocities.
    pub fn rebuild_event_queue(&mut self) -> Result<()> {
        self.pq.clear();
        self.phase = Phase::Seeding;
        self.schedule_initial_events()?;
        self.phase = Phase::Running;
        Ok(())
    }

    /// Process exactly one valid event. Returns `None` once the run is done.
    pub fn step(&mut self) -> Result<Option<Collision>> {
        if let Phase::Done(_) = self.phase {
            return Ok(None);
        }
        if let Some(max) = self.options.max_events {
            if self.processed >= max {
                self.finish(StopReason::StepLimit);
                return Ok(None);
            }
        }
        let Some(ev) = self.pq.pop_valid(&self.particles)? else {
            // Predictions past the horizon are never queued, so with a horizon set an
            // empty queue means nothing else happens before it.
            match self.options.max_time {
                Some(h) => self.stop_at_horizon(h)?,
                None => self.finish(StopReason::QueueExhausted),
            }
            return Ok(None);
        };
        if let Some(h) = self.options.max_time {
            if ev.time_f64() > h {
                self.pq.requeue(ev);
                self.stop_at_horizon(h)?;
                return Ok(None);
            }
        }
        self.process(ev).map(Some)
    }

    /// Run until a termination condition, emitting every collision to `recorder` and
    /// snapshots according to `cadence`.
    ///
    /// If a previous call failed while emitting, the unfinished record is completed first
    /// and nothing already written is written again.
    pub fn run<R: Recorder + ?Sized>(
        &mut self,
        recorder: &mut R,
        cadence: SnapshotCadence,
    ) -> Result<RunSummary> {
        if let Some(pending) = self.pending.take() {
            self.emit(recorder, pending)?;
        }
        while let Some(collision) = self.step()? {
            let snapshot = self.snapshot_due(cadence, &collision);
            self.emit(
                recorder,
                Pending {
                    collision,
                    recorded: false,
                    snapshot,
                },
            )?;
        }
        recorder.flush()?;

        let stop = match self.phase {
            Phase::Done(reason) => reason,
            _ => StopReason::QueueExhausted,
        };
        let summary = RunSummary {
            events: self.processed,
            time: self.time_now,
            stop,
            queue: self.pq.stats(),
        };
        tracing::info!(
            events = summary.events,
            time = summary.time,
            stop = ?summary.stop,
            discarded = summary.queue.discarded,
            "simulation finished"
        );
        Ok(summary)
    }

    /// Advance the simulation to `target_time`, resolving every event up to it and then
    /// drifting all particles to exactly `target_time`.
    ///
    /// Returns the collisions resolved on the way.
    pub fn advance_to(&mut self, target_time: f64) -> Result<Vec<Collision>> {
        if !target_time.is_finite() {
            return Err(Error::InvalidParam("target_time must be finite".into()));
        }
        if target_time < self.time_now - EPS_TIME {
            return Err(Error::InvalidParam(
                "target_time cannot be earlier than current time".into(),
            ));
        }
        if let Some(h) = self.options.max_time {
            if target_time > h + EPS_TIME {
                return Err(Error::InvalidParam(format!(
                    "target_time {target_time} is beyond the time horizon {h}"
                )));
            }
        }

        let mut resolved = Vec::new();
        loop {
            if let Some(max) = self.options.max_events {
                if self.processed >= max {
                    break;
                }
            }
            let Some(ev) = self.pq.pop_valid(&self.particles)? else {
                break;
            };
            if ev.time_f64() > target_time {
                self.pq.requeue(ev);
                break;
            }
            resolved.push(self.process(ev)?);
        }
        self.drift_all(target_time)?;
        Ok(resolved)
    }

    // ============ Internal helpers ============

    fn finish(&mut self, reason: StopReason) {
        if reason == StopReason::QueueExhausted {
            tracing::info!(
                time = self.time_now,
                events = self.processed,
                "event queue exhausted; stopping early"
            );
        }
        self.phase = Phase::Done(reason);
    }

    /// Particles fly freely until the horizon; the run ends there.
    fn stop_at_horizon(&mut self, h: f64) -> Result<()> {
        self.drift_all(h)?;
        tracing::debug!(time = h, events = self.processed, "reached time horizon");
        self.finish(StopReason::TimeHorizon);
        Ok(())
    }

    /// Drift to the event, resolve it, and re-predict the particles it touched.
    fn process(&mut self, ev: Event) -> Result<Collision> {
        let t_ev = ev.time_f64();
        debug_assert!(t_ev >= self.time_now - EPS_TIME);
        self.drift_all(t_ev)?;
        self.resolve(&ev)?;

        match ev.kind {
            EventKind::Particle { a, b } => self.reschedule(&[a as usize, b as usize])?,
            EventKind::Wall { a, .. } | EventKind::Vertex { a, .. } => {
                self.reschedule(&[a as usize])?
            }
        }

        let collision = Collision {
            index: self.processed,
            time: t_ev,
            kind: ev.kind,
        };
        self.processed += 1;
        Ok(collision)
    }

    fn resolve(&mut self, ev: &Event) -> Result<()> {
        let unknown = |what: String| Error::UnknownParticipant {
            time: ev.time_f64(),
            event: format!("{} ({what})", ev.kind),
        };
        match ev.kind {
            EventKind::Particle { a, b } => {
                let (p, q) = pair_mut(&mut self.particles, a as usize, b as usize)
                    .ok_or_else(|| unknown(format!("particles {a} and {b}")))?;
                resolve::particles(p, q)
            }
            EventKind::Wall { a, wall } => {
                let w = self
                    .enclosure
                    .wall(wall)
                    .ok_or_else(|| unknown(format!("wall {wall} not in configuration")))?;
                let p = self
                    .particles
                    .get_mut(a as usize)
                    .ok_or_else(|| unknown(format!("particle {a} does not exist")))?;
                resolve::wall(p, w);
                Ok(())
            }
            EventKind::Vertex { a, vertex } => {
                let v = self
                    .enclosure
                    .vertex(vertex)
                    .ok_or_else(|| unknown(format!("vertex {vertex} not in configuration")))?;
                let p = self
                    .particles
                    .get_mut(a as usize)
                    .ok_or_else(|| unknown(format!("particle {a} does not exist")))?;
                resolve::vertex(p, v)
            }
        }
    }

    fn snapshot_due(&mut self, cadence: SnapshotCadence, c: &Collision) -> bool {
        match cadence {
            SnapshotCadence::Never => false,
            SnapshotCadence::Every(n) => n > 0 && c.index % n == 0,
            SnapshotCadence::Interval(dt) => {
                if !dt.is_finite() || dt <= 0.0 {
                    return false;
                }
                let boundary = *self.next_snapshot.get_or_insert(dt);
                if c.time >= boundary {
                    self.next_snapshot = Some(((c.time / dt).floor() + 1.0) * dt);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn emit<R: Recorder + ?Sized>(&mut self, recorder: &mut R, mut pending: Pending) -> Result<()> {
        if !pending.recorded {
            if let Err(e) = recorder.record(&pending.collision) {
                self.pending = Some(pending);
                return Err(e);
            }
            pending.recorded = true;
        }
        if pending.snapshot {
            if let Err(e) = recorder.snapshot(pending.collision.index, &self.particles) {
                self.pending = Some(pending);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Time left until the horizon, measured from now.
    fn horizon(&self) -> Option<f64> {
        self.options.max_time.map(|h| h - self.time_now)
    }

    fn schedule_initial_events(&mut self) -> Result<()> {
        let n = self.particles.len();
        for i in 0..n {
            for j in (i + 1)..n {
                self.schedule_pair(i, j)?;
            }
        }
        for i in 0..n {
            self.schedule_boundary(i)?;
        }
        tracing::debug!(
            particles = n,
            walls = self.enclosure.walls().len(),
            vertices = self.enclosure.vertices().len(),
            queued = self.pq.len(),
            "seeded event queue"
        );
        Ok(())
    }

    /// Re-predict every event involving `ids` (each pair only once).
    fn reschedule(&mut self, ids: &[usize]) -> Result<()> {
        let n = self.particles.len();
        for (k, &i) in ids.iter().enumerate() {
            self.schedule_boundary(i)?;
            for j in 0..n {
                if j == i || ids[..k].contains(&j) {
                    continue;
                }
                self.schedule_pair(i, j)?;
            }
        }
        Ok(())
    }

    fn schedule_pair(&mut self, i: usize, j: usize) -> Result<()> {
        let (pi, pj) = (&self.particles[i], &self.particles[j]);
        if let Some(dt) = predict::predict(pi, Target::Particle(pj), self.horizon()) {
            let (lo, hi) = if pi.id < pj.id { (pi, pj) } else { (pj, pi) };
            let ev = Event::new(
                self.time_now + dt,
                EventKind::particles(lo.id, hi.id),
                lo.collision_count,
                Some(hi.collision_count),
            )?;
            self.pq.push(ev);
        }
        Ok(())
    }

    /// Queue only the earliest wall or vertex contact of particle `i`; any later boundary
    /// event would be stale as soon as the earliest one is resolved.
    fn schedule_boundary(&mut self, i: usize) -> Result<()> {
        let p = &self.particles[i];
        let horizon = self.horizon();
        let mut best: Option<(f64, EventKind)> = None;

        for w in self.enclosure.walls() {
            if let Some(dt) = predict::predict(p, Target::Wall(w), horizon) {
                if best.map_or(true, |(t, _)| dt < t) {
                    best = Some((dt, EventKind::Wall { a: p.id, wall: w.id }));
                }
            }
        }
        if self.options.vertex_collisions {
            for v in self.enclosure.vertices() {
                if let Some(dt) = predict::predict(p, Target::Vertex(v), horizon) {
                    if best.map_or(true, |(t, _)| dt < t) {
                        best = Some((dt, EventKind::Vertex { a: p.id, vertex: v.id }));
                    }
                }
            }
        }

        if let Some((dt, kind)) = best {
            let ev = Event::new(self.time_now + dt, kind, p.collision_count, None)?;
            self.pq.push(ev);
        }
        Ok(())
    }

    /// Drift all particles to the specified absolute time by linear motion.
    fn drift_all(&mut self, to_time: f64) -> Result<()> {
        if to_time < self.time_now - EPS_TIME {
            return Err(Error::InvalidParam("cannot drift backwards in time".into()));
        }
        let dt = to_time - self.time_now;
        if dt > 0.0 {
            for p in &mut self.particles {
                p.advance(dt);
            }
        }
        self.time_now = self.time_now.max(to_time);
        Ok(())
    }
}

// ============ Utility helpers ============

fn pair_mut(ps: &mut [Particle], a: usize, b: usize) -> Option<(&mut Particle, &mut Particle)> {
    if a == b || a.max(b) >= ps.len() {
        return None;
    }
    if a < b {
        let (lo, hi) = ps.split_at_mut(b);
        Some((&mut lo[a], &mut hi[0]))
    } else {
        let (lo, hi) = ps.split_at_mut(a);
        Some((&mut hi[0], &mut lo[b]))
    }
}
