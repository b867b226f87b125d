use crate::core::wall::Enclosure;
use crate::core::{Particle, Vector};
use crate::error::{Error, Result};
use rand::{rng, rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::TAU;

/// Give up on a single particle after this many rejected candidates.
const MAX_ATTEMPTS: usize = 1_000_000;

/// Parameters for random initial placement.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub count: usize,
    pub radius: f64,
    pub mass: f64,
    /// Initial speed; every particle gets this magnitude in a uniformly random direction.
    pub speed: f64,
    /// Sampling rectangle `(min, max)`; defaults to the enclosure's bounding box.
    pub spawn: Option<(Vector, Vector)>,
    /// RNG seed for reproducibility; `None` for nondeterministic.
    pub seed: Option<u64>,
}

/// Place `count` non-overlapping particles inside `enclosure` by rejection sampling.
///
/// A candidate centre is accepted when it lies inside the enclosure, at least one radius
/// away from every wall, and does not overlap any particle placed before it.
pub fn place_particles(enclosure: &Enclosure, placement: &Placement) -> Result<Vec<Particle>> {
    if !placement.radius.is_finite() || placement.radius <= 0.0 {
        return Err(Error::InvalidParam("radius must be finite and > 0".into()));
    }
    if !placement.speed.is_finite() || placement.speed < 0.0 {
        return Err(Error::InvalidParam("speed must be finite and >= 0".into()));
    }
    let (lo, hi) = placement
        .spawn
        .or_else(|| enclosure.bounds())
        .ok_or_else(|| Error::Config("no spawn region and no walls to derive one from".into()))?;
    if !(lo.x < hi.x && lo.y < hi.y) {
        return Err(Error::Config("spawn region must have positive area".into()));
    }

    let mut rng: StdRng = match placement.seed {
        Some(s) => SeedableRng::seed_from_u64(s),
        None => SeedableRng::seed_from_u64(rng().random()),
    };

    let mut particles: Vec<Particle> = Vec::with_capacity(placement.count);
    for id in 0..(placement.count as u32) {
        let mut attempts = 0usize;
        let r = loop {
            if attempts >= MAX_ATTEMPTS {
                return Err(Error::Config(format!(
                    "failed to place particle {id} without overlap; try fewer particles or a smaller radius"
                )));
            }
            attempts += 1;
            let r = Vector::new(rng.random_range(lo.x..hi.x), rng.random_range(lo.y..hi.y));
            if fits(enclosure, r, placement.radius) && !overlaps_existing(&particles, r, placement.radius) {
                break r;
            }
        };

        let theta = rng.random_range(0.0..TAU);
        let v = Vector::new(theta.cos(), theta.sin()) * placement.speed;
        particles.push(Particle::new(id, r, v, placement.radius, placement.mass)?);
    }

    tracing::debug!(count = particles.len(), "placed particles");
    Ok(particles)
}

fn fits(enclosure: &Enclosure, r: Vector, radius: f64) -> bool {
    enclosure.is_empty() || (enclosure.contains(r) && enclosure.clearance(r) > radius)
}

fn overlaps_existing(existing: &[Particle], r: Vector, radius: f64) -> bool {
    existing.iter().any(|p| {
        let min = p.radius + radius;
        (p.r - r).norm_sq() < min * min
    })
}
