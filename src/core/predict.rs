//! Collision-time prediction.
//!
//! Every function returns the time *from now* until first contact, assuming both
//! participants keep their current velocities, or `None` when they never touch.
//! Degenerate geometry (no relative motion, tangential grazing, separating pairs)
//! is reported as `None`, never as an error.

use crate::core::wall::{Orientation, Vertex, Wall};
use crate::core::{Particle, Vector};

/// Relative speeds below this are treated as no relative motion.
const EPS_SPEED: f64 = 1e-12;

/// Something a particle can collide with.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Particle(&'a Particle),
    Wall(&'a Wall),
    Vertex(&'a Vertex),
}

/// Time until `p` touches `target`, discarding contacts later than `horizon` (relative).
pub fn predict(p: &Particle, target: Target<'_>, horizon: Option<f64>) -> Option<f64> {
    let t = match target {
        Target::Particle(q) => particle_particle(p, q),
        Target::Wall(w) => particle_wall(p, w),
        Target::Vertex(v) => particle_vertex(p, v),
    }?;
    match horizon {
        Some(h) if t > h => None,
        _ => Some(t),
    }
}

/// Smallest non-negative root of |Δr + Δv t| = σ.
///
/// With `a = Δv·Δv`, `b = 2 Δr·Δv`, `c = Δr·Δr − σ²` there is no contact when
/// `b ≥ 0` (separating) or the discriminant is negative. A root slightly below zero
/// means rounding already put the centres inside σ while they still approach; that
/// contact happens now.
fn contact_time(dr: Vector, dv: Vector, sigma: f64) -> Option<f64> {
    let a = dv.dot(dv);
    if a <= EPS_SPEED * EPS_SPEED {
        return None;
    }
    let b = 2.0 * dr.dot(dv);
    if b >= 0.0 {
        return None;
    }
    let c = dr.dot(dr) - sigma * sigma;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / (2.0 * a);
    if !t.is_finite() {
        return None;
    }
    Some(t.max(0.0))
}

/// Particle–particle contact time.
pub fn particle_particle(p: &Particle, q: &Particle) -> Option<f64> {
    contact_time(q.r - p.r, q.v - p.v, p.radius + q.radius)
}

/// Particle–vertex contact time: a particle against a static zero-radius point.
pub fn particle_vertex(p: &Particle, v: &Vertex) -> Option<f64> {
    contact_time(v.position - p.r, -p.v, p.radius)
}

/// Particle–wall contact time.
///
/// The disk's leading edge reaches the wall's line when the signed distance of its
/// centre equals ±radius. The contact point (centre projected onto the line) must lie
/// within the segment; hits beyond an endpoint are left to [`particle_vertex`].
pub fn particle_wall(p: &Particle, w: &Wall) -> Option<f64> {
    let n = w.normal();
    let d = (p.r - w.start).dot(n);
    let vn = p.v.dot(n);

    // Distance left to travel along the normal before touching.
    let gap = if d >= 0.0 {
        if vn >= -EPS_SPEED {
            return None;
        }
        d - p.radius
    } else {
        if vn <= EPS_SPEED {
            return None;
        }
        -d - p.radius
    };
    let t = gap.max(0.0) / vn.abs();
    if !t.is_finite() {
        return None;
    }

    let contact = p.r + p.v * t;
    let inside = match w.orientation() {
        Orientation::Horizontal => within(contact.x, w.start.x, w.end.x),
        Orientation::Vertical => within(contact.y, w.start.y, w.end.y),
        Orientation::Oblique => {
            let s = (contact - w.start).dot(w.direction());
            (0.0..=w.length()).contains(&s)
        }
    };
    inside.then_some(t)
}

#[inline]
fn within(x: f64, a: f64, b: f64) -> bool {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    (lo..=hi).contains(&x)
}
