use crate::core::vector::Vector;
use crate::error::{Error, Result};
use std::fmt;

/// Relative tolerance (fraction of wall length) for classifying a wall as axis-aligned.
const ORIENTATION_TOL: f64 = 1e-9;

/// Endpoints closer than this are treated as the same vertex.
const VERTEX_MERGE_TOL: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
    Oblique,
}

/// An immutable wall segment of the enclosure.
///
/// `id` is the wall's index in the enclosure; downstream chamber bookkeeping keys on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Wall {
    pub id: u32,
    pub start: Vector,
    pub end: Vector,
    orientation: Orientation,
    length: f64,
}

impl Wall {
    /// Create a wall segment.
    ///
    /// Errors: `Error::Config` if an endpoint is not finite or the segment has zero length.
    pub fn new(id: u32, start: Vector, end: Vector) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(Error::Config(format!("wall {id}: endpoints must be finite")));
        }
        let d = end - start;
        let length = d.norm();
        if length <= VERTEX_MERGE_TOL {
            return Err(Error::Config(format!("wall {id}: zero-length segment")));
        }
        let orientation = if d.y.abs() <= ORIENTATION_TOL * length {
            Orientation::Horizontal
        } else if d.x.abs() <= ORIENTATION_TOL * length {
            Orientation::Vertical
        } else {
            Orientation::Oblique
        };
        Ok(Self {
            id,
            start,
            end,
            orientation,
            length,
        })
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Unit vector from `start` to `end`.
    #[inline]
    pub fn direction(&self) -> Vector {
        (self.end - self.start) * (1.0 / self.length)
    }

    /// Unit normal. Axis-aligned walls get an exact axis vector.
    pub fn normal(&self) -> Vector {
        match self.orientation {
            Orientation::Horizontal => Vector::new(0.0, 1.0),
            Orientation::Vertical => Vector::new(1.0, 0.0),
            Orientation::Oblique => self.direction().perp(),
        }
    }

    /// Euclidean distance from `p` to the closest point of the segment.
    pub fn distance_to(&self, p: Vector) -> f64 {
        let u = self.direction();
        let s = (p - self.start).dot(u).clamp(0.0, self.length);
        (p - (self.start + u * s)).norm()
    }
}

/// Setup-record format: `x1 y1 x2 y2`.
impl fmt::Display for Wall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.start, self.end)
    }
}

/// A wall endpoint. Acts as a zero-radius immovable obstacle so disks cannot clip
/// re-entrant corners such as the mouth of the connecting chamber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub id: u32,
    pub position: Vector,
}

/// The static boundary of the simulation: walls plus the distinct wall endpoints.
#[derive(Debug, Clone, Default)]
pub struct Enclosure {
    walls: Vec<Wall>,
    vertices: Vec<Vertex>,
}

impl Enclosure {
    /// Build an enclosure from walls whose ids equal their index.
    pub fn new(walls: Vec<Wall>) -> Result<Self> {
        for (i, w) in walls.iter().enumerate() {
            if w.id as usize != i {
                return Err(Error::Config(format!(
                    "wall at index {i} has id {}; ids must equal their index",
                    w.id
                )));
            }
        }

        let mut vertices: Vec<Vertex> = Vec::new();
        for w in &walls {
            for p in [w.start, w.end] {
                if !vertices
                    .iter()
                    .any(|v| (v.position - p).norm() <= VERTEX_MERGE_TOL)
                {
                    vertices.push(Vertex {
                        id: vertices.len() as u32,
                        position: p,
                    });
                }
            }
        }

        Ok(Self { walls, vertices })
    }

    /// Build from raw `[x1, y1, x2, y2]` segments, assigning ids in order.
    pub fn from_segments(segments: &[[f64; 4]]) -> Result<Self> {
        let walls = segments
            .iter()
            .enumerate()
            .map(|(i, s)| {
                Wall::new(
                    i as u32,
                    Vector::new(s[0], s[1]),
                    Vector::new(s[2], s[3]),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(walls)
    }

    #[inline]
    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn wall(&self, id: u32) -> Option<&Wall> {
        self.walls.get(id as usize)
    }

    #[inline]
    pub fn vertex(&self, id: u32) -> Option<&Vertex> {
        self.vertices.get(id as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.walls.is_empty()
    }

    /// Every wall endpoint is shared with another wall, so the walls bound a region.
    pub fn is_closed(&self) -> bool {
        if self.walls.is_empty() {
            return false;
        }
        let mut uses = vec![0usize; self.vertices.len()];
        for w in &self.walls {
            for p in [w.start, w.end] {
                if let Some(v) = self
                    .vertices
                    .iter()
                    .find(|v| (v.position - p).norm() <= VERTEX_MERGE_TOL)
                {
                    uses[v.id as usize] += 1;
                }
            }
        }
        uses.iter().all(|&n| n >= 2)
    }

    /// Even-odd ray cast against every wall. Only meaningful when the walls form
    /// closed polygon(s).
    pub fn contains(&self, p: Vector) -> bool {
        let mut inside = false;
        for w in &self.walls {
            let (a, b) = (w.start, w.end);
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Distance from `p` to the nearest wall (infinite when there are no walls).
    pub fn clearance(&self, p: Vector) -> f64 {
        self.walls
            .iter()
            .map(|w| w.distance_to(p))
            .fold(f64::INFINITY, f64::min)
    }

    /// Axis-aligned bounding box `(min, max)` of all wall endpoints.
    pub fn bounds(&self) -> Option<(Vector, Vector)> {
        let first = self.vertices.first()?.position;
        let (mut lo, mut hi) = (first, first);
        for v in &self.vertices {
            lo = Vector::new(lo.x.min(v.position.x), lo.y.min(v.position.y));
            hi = Vector::new(hi.x.max(v.position.x), hi.y.max(v.position.y));
        }
        Some((lo, hi))
    }
}
