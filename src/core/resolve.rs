//! Elastic collision response.
//!
//! Resolvers update velocities and bump collision counters. Positions are never
//! touched: the caller has already drifted every particle to the contact time.

use crate::core::wall::{Orientation, Vertex, Wall};
use crate::core::{Particle, Vector};
use crate::error::{Error, Result};

/// Centre separations below this cannot define a contact normal.
const EPS_DIST: f64 = 1e-15;

/// Resolve an elastic collision between two disks of arbitrary mass.
///
/// With `n` the unit normal from `p` to `q` and `u = v_q − v_p`:
/// `v_p += 2 m_q/(m_p+m_q) (u·n) n`, `v_q −= 2 m_p/(m_p+m_q) (u·n) n`.
/// Equal masses exchange their normal components; tangential components are unchanged.
pub fn particles(p: &mut Particle, q: &mut Particle) -> Result<()> {
    let delta = q.r - p.r;
    let dist = delta.norm();
    if dist <= EPS_DIST {
        return Err(Error::MathError(format!(
            "degenerate contact normal between particles {} and {}",
            p.id, q.id
        )));
    }
    let n = delta * (1.0 / dist);
    let u_n = (q.v - p.v).dot(n);
    let total = p.mass + q.mass;

    p.v += n * (2.0 * q.mass / total * u_n);
    q.v -= n * (2.0 * p.mass / total * u_n);

    p.bump_collision_count();
    q.bump_collision_count();
    Ok(())
}

/// Specular reflection off a frictionless wall.
pub fn wall(p: &mut Particle, w: &Wall) {
    match w.orientation() {
        Orientation::Horizontal => p.v.y = -p.v.y,
        Orientation::Vertical => p.v.x = -p.v.x,
        Orientation::Oblique => p.v = reflect(p.v, w.normal()),
    }
    p.bump_collision_count();
}

/// Reflection off a wall endpoint, along the line from the vertex to the centre.
pub fn vertex(p: &mut Particle, v: &Vertex) -> Result<()> {
    let delta = p.r - v.position;
    let dist = delta.norm();
    if dist <= EPS_DIST {
        return Err(Error::MathError(format!(
            "particle {} centre coincides with vertex {}",
            p.id, v.id
        )));
    }
    p.v = reflect(p.v, delta * (1.0 / dist));
    p.bump_collision_count();
    Ok(())
}

#[inline]
fn reflect(v: Vector, n: Vector) -> Vector {
    v - n * (2.0 * v.dot(n))
}
