use crate::error::{Error, Result};
use ordered_float::NotNan;
use std::cmp::Ordering;
use std::fmt;

/// Kinds of events that can occur in the engine.
///
/// `a` is always a particle id. Particle–particle events are normalised so that `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Particle-to-particle collision between particles `a` and `b`.
    Particle { a: u32, b: u32 },
    /// Particle `a` hits the wall segment `wall`.
    Wall { a: u32, wall: u32 },
    /// Particle `a` hits the wall endpoint `vertex`.
    Vertex { a: u32, vertex: u32 },
}

impl EventKind {
    /// Particle–particle kind with participants in ascending order.
    pub fn particles(i: u32, j: u32) -> Self {
        if i <= j {
            EventKind::Particle { a: i, b: j }
        } else {
            EventKind::Particle { a: j, b: i }
        }
    }

    /// Tie-break key: ascending participant pair, then discriminant.
    #[inline]
    fn order_key(&self) -> (u32, u32, u8) {
        match *self {
            EventKind::Particle { a, b } => (a, b, 0),
            EventKind::Wall { a, wall } => (a, wall, 1),
            EventKind::Vertex { a, vertex } => (a, vertex, 2),
        }
    }

    /// Collision-log type token.
    pub fn token(&self) -> &'static str {
        match self {
            EventKind::Particle { .. } => "PARTICLE",
            EventKind::Wall { .. } => "WALL",
            EventKind::Vertex { .. } => "VERTEX",
        }
    }

    /// `(a, b)` as written to the collision log.
    #[inline]
    pub fn participants(&self) -> (u32, u32) {
        match *self {
            EventKind::Particle { a, b } => (a, b),
            EventKind::Wall { a, wall } => (a, wall),
            EventKind::Vertex { a, vertex } => (a, vertex),
        }
    }

    /// Second participant when it is a particle.
    #[inline]
    pub fn other_particle(&self) -> Option<u32> {
        match *self {
            EventKind::Particle { b, .. } => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b) = self.participants();
        write!(f, "{} {} {}", self.token(), a, b)
    }
}

/// A scheduled event in the priority queue with deterministic ordering.
///
/// - `time`: absolute event time (finite, non-NaN).
/// - `kind`: event kind and participants.
/// - `cc_a`, `cc_b`: collision-count snapshots taken when the event was predicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub time: NotNan<f64>,
    pub kind: EventKind,
    pub cc_a: u64,
    pub cc_b: Option<u64>,
}

impl Event {
    /// Create a new event, validating that time is finite and non-NaN.
    pub fn new(time: f64, kind: EventKind, cc_a: u64, cc_b: Option<u64>) -> Result<Self> {
        if !time.is_finite() {
            return Err(Error::InvalidParam(format!(
                "event time must be finite, got {time}"
            )));
        }
        let time = NotNan::new(time)
            .map_err(|_| Error::InvalidParam("event time cannot be NaN".into()))?;
        Ok(Self {
            time,
            kind,
            cc_a,
            cc_b,
        })
    }

    /// Returns the raw f64 event time.
    #[inline]
    pub fn time_f64(&self) -> f64 {
        self.time.into_inner()
    }

    /// Validate against current collision counts. Wall and vertex events pass `None`
    /// for `cc_b_now`.
    #[inline]
    pub fn is_valid(&self, cc_a_now: u64, cc_b_now: Option<u64>) -> bool {
        if self.cc_a != cc_a_now {
            return false;
        }
        match (self.cc_b, cc_b_now) {
            (Some(a), Some(b)) => a == b,
            (None, _) => true,
            (Some(_), None) => false,
        }
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.kind.order_key().cmp(&other.kind.order_key()))
            .then_with(|| {
                (self.cc_a, self.cc_b.unwrap_or(0)).cmp(&(other.cc_a, other.cc_b.unwrap_or(0)))
            })
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
