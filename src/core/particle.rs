use crate::core::vector::Vector;
use crate::error::{Error, Result};

/// Default hard-disk radius in distance units.
pub const DEFAULT_RADIUS: f64 = 1.5e-3;

/// Default particle mass.
pub const DEFAULT_MASS: f64 = 1.0;

/// A hard disk moving in free flight between collisions.
///
/// Fields:
/// - `id`: stable identifier, equal to the particle's index in the simulation
/// - `r`: position
/// - `v`: velocity
/// - `radius`: disk radius (> 0)
/// - `mass`: particle mass (> 0)
/// - `collision_count`: incremented each time the particle takes part in a resolved event
#[derive(Debug, Clone)]
pub struct Particle {
    /// Stable particle identifier.
    pub id: u32,
    /// Position (x, y).
    pub r: Vector,
    /// Velocity (vx, vy).
    pub v: Vector,
    /// Hard-disk radius (> 0).
    pub radius: f64,
    /// Mass (> 0).
    pub mass: f64,
    /// Collision participation counter (for event invalidation).
    pub collision_count: u64,
}

impl Particle {
    /// Create a new particle after validating invariants.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if `radius` or `mass` is non-positive or any component is NaN/inf.
    pub fn new(id: u32, r: Vector, v: Vector, radius: f64, mass: f64) -> Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(Error::InvalidParam("radius must be finite and > 0".into()));
        }
        if !mass.is_finite() || mass <= 0.0 {
            return Err(Error::InvalidParam("mass must be finite and > 0".into()));
        }
        if !r.is_finite() {
            return Err(Error::InvalidParam("position must be finite".into()));
        }
        if !v.is_finite() {
            return Err(Error::InvalidParam("velocity must be finite".into()));
        }
        Ok(Self {
            id,
            r,
            v,
            radius,
            mass,
            collision_count: 0,
        })
    }

    /// Increment the collision counter (used for event invalidation).
    #[inline]
    pub fn bump_collision_count(&mut self) {
        self.collision_count = self.collision_count.saturating_add(1);
    }

    /// Free flight: move along the current velocity for `dt`.
    #[inline]
    pub fn advance(&mut self, dt: f64) {
        self.r += self.v * dt;
    }

    /// Returns the particle's kinetic energy: 1/2 m |v|^2.
    #[inline]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.v.norm_sq()
    }

    #[inline]
    pub fn momentum(&self) -> Vector {
        self.v * self.mass
    }

    /// True if the two disks overlap by more than `tol`.
    pub fn overlaps(&self, other: &Particle, tol: f64) -> bool {
        let sigma = self.radius + other.radius;
        (other.r - self.r).norm() < sigma - tol
    }

    /// Set velocity (validated as finite).
    pub fn set_velocity(&mut self, v: Vector) -> Result<()> {
        if !v.is_finite() {
            return Err(Error::InvalidParam("velocity must be finite".into()));
        }
        self.v = v;
        Ok(())
    }
}
