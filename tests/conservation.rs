use diskgas::core::wall::{Vertex, Wall};
use diskgas::core::{resolve, Particle, Vector};
use proptest::prelude::*;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
}

prop_compose! {
    fn velocity()(vx in -10.0..10.0f64, vy in -10.0..10.0f64) -> Vector {
        Vector::new(vx, vy)
    }
}

proptest! {
    /// Any contact between two disks conserves kinetic energy and momentum.
    #[test]
    fn particle_collision_conserves(
        angle in 0.0..std::f64::consts::TAU,
        v1 in velocity(),
        v2 in velocity(),
        m1 in 0.1..10.0f64,
        m2 in 0.1..10.0f64,
    ) {
        let r = 0.5;
        let offset = Vector::new(angle.cos(), angle.sin()) * (2.0 * r);
        let mut p = Particle::new(0, Vector::ZERO, v1, r, m1).unwrap();
        let mut q = Particle::new(1, offset, v2, r, m2).unwrap();

        let ke0 = p.kinetic_energy() + q.kinetic_energy();
        let mom0 = p.momentum() + q.momentum();
        resolve::particles(&mut p, &mut q).unwrap();
        let ke1 = p.kinetic_energy() + q.kinetic_energy();
        let mom1 = p.momentum() + q.momentum();

        prop_assert!(close(ke0, ke1), "KE {ke0} -> {ke1}");
        prop_assert!(close(mom0.x, mom1.x) && close(mom0.y, mom1.y));
        prop_assert_eq!(p.collision_count, 1);
        prop_assert_eq!(q.collision_count, 1);

        // Tangential components are untouched.
        let t = offset.perp();
        prop_assert!(close(p.v.dot(t), v1.dot(t)));
        prop_assert!(close(q.v.dot(t), v2.dot(t)));
    }

    /// Wall and vertex reflections preserve speed.
    #[test]
    fn boundary_reflection_preserves_speed(
        v in velocity(),
        wx in -1.0..1.0f64,
        wy in -1.0..1.0f64,
        angle in 0.0..std::f64::consts::TAU,
    ) {
        prop_assume!(wx.abs() + wy.abs() > 1e-3);
        let wall = Wall::new(0, Vector::ZERO, Vector::new(wx, wy)).unwrap();
        let mut p = Particle::new(0, Vector::new(0.3, 0.3), v, 0.1, 1.0).unwrap();
        resolve::wall(&mut p, &wall);
        prop_assert!(close(p.v.norm(), v.norm()));
        prop_assert!(close(p.v.dot(wall.direction()), v.dot(wall.direction())));

        let vertex = Vertex { id: 0, position: Vector::ZERO };
        let mut p = Particle::new(0, Vector::new(angle.cos(), angle.sin()) * 0.1, v, 0.1, 1.0).unwrap();
        resolve::vertex(&mut p, &vertex).unwrap();
        prop_assert!(close(p.v.norm(), v.norm()));
    }
}
