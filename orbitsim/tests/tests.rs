use approx::assert_abs_diff_eq;

use orbitsim::simulation::forces::{gravitational_accelerations, AccelSet, NewtonianGravity};
use orbitsim::simulation::integrator::{verlet_step, VerletIntegrator};
use orbitsim::simulation::params::G_KM;
use orbitsim::simulation::states::{Body, System, NVec3};

/// Build a simple 2-body System separated along x-axis
pub fn two_body_system(dist: f64, m1: f64, m2: f64) -> System {
    let b1 = Body::new("a", m1, [-dist / 2.0, 0.0, 0.0].into(), [0.0, 0.0, 0.0].into());
    let b2 = Body::new("b", m2, [dist / 2.0, 0.0, 0.0].into(), [0.0, 0.0, 0.0].into());
    System::new(vec![b1, b2])
}

/// Build a gravity term + AccelSet
pub fn gravity_set() -> AccelSet {
    AccelSet::new().with(NewtonianGravity { G: G_KM })
}

fn accels(sys: &System) -> Vec<NVec3> {
    let mut acc = vec![NVec3::zeros(); sys.bodies.len()];
    gravity_set().accumulate_accels(sys.t, sys, &mut acc);
    acc
}

/// Earth at the origin, Moon on +x with its orbital speed
fn earth_moon() -> System {
    System::new(vec![
        Body::new("Earth", 5.972e24, NVec3::zeros(), NVec3::zeros()),
        Body::new("Moon", 7.34767309e22, NVec3::new(384400.0, 0.0, 0.0), NVec3::new(0.0, 1.022, 0.0)),
    ])
}

// ==================================================================================
// Gravity tests
// ==================================================================================

#[test]
fn gravity_newton_third_law() {
    let sys = two_body_system(1000.0, 2.0e20, 3.0e20);
    let acc = accels(&sys);

    let net = acc[0] * sys.bodies[0].m + acc[1] * sys.bodies[1].m;
    let scale = acc[0].norm() * sys.bodies[0].m;

    assert!(net.norm() < 1e-12 * scale, "Net momentum not zero: {:?}", net);
}

#[test]
fn gravity_points_toward_other_body() {
    let sys = two_body_system(2000.0, 1.0e20, 1.0e20);
    let acc = accels(&sys);

    let dx = sys.bodies[1].x - sys.bodies[0].x;
    assert!(acc[0].dot(&dx) > 0.0, "Acceleration is not toward second body");
    assert!(acc[1].dot(&dx) < 0.0, "Acceleration is not toward first body");
}

#[test]
fn gravity_inverse_square_law() {
    let acc_r = accels(&two_body_system(1000.0, 1.0e20, 1.0e20));
    let acc_2r = accels(&two_body_system(2000.0, 1.0e20, 1.0e20));

    let ratio = acc_r[0].norm() / acc_2r[0].norm();
    assert_abs_diff_eq!(ratio, 4.0, epsilon = 1e-9);
}

#[test]
fn gravity_matches_point_mass_formula() {
    let sys = earth_moon();
    let acc = accels(&sys);

    // |a_moon| = G M_earth / r^2, pointing at -x
    let expected = G_KM * 5.972e24 / (384400.0f64 * 384400.0);
    assert_abs_diff_eq!(acc[1].x, -expected, epsilon = 1e-15);
    assert_abs_diff_eq!(acc[1].y, 0.0);
    assert_abs_diff_eq!(acc[1].z, 0.0);
}

#[test]
fn single_body_feels_nothing() {
    let sys = System::new(vec![Body::new("lonely", 5.972e24, NVec3::new(1.0, 2.0, 3.0), NVec3::zeros())]);
    let acc = gravitational_accelerations(&sys, G_KM);
    assert_eq!(acc, vec![NVec3::zeros()]);
}

#[test]
fn coincident_bodies_contribute_nothing() {
    let mut sys = two_body_system(0.0, 1.0e24, 1.0e24);
    sys.bodies.push(Body::new("c", 1.0e24, NVec3::new(1000.0, 0.0, 0.0), NVec3::zeros()));
    let acc = accels(&sys);

    for a in &acc {
        assert!(a.iter().all(|c| c.is_finite()));
    }
    // the coincident pair only feels body c
    assert_abs_diff_eq!(acc[0], acc[1]);
    assert!(acc[0].x > 0.0);
}

#[test]
fn massless_body_exerts_no_force() {
    let sys = System::new(vec![
        Body::new("Earth", 5.972e24, NVec3::zeros(), NVec3::zeros()),
        Body::new("probe", 0.0, NVec3::new(7000.0, 0.0, 0.0), NVec3::zeros()),
    ]);
    let acc = accels(&sys);
    assert_eq!(acc[0], NVec3::zeros());
    assert!(acc[1].x < 0.0);
}

// ==================================================================================
// Integrator tests
// ==================================================================================

#[test]
fn verlet_is_time_reversible() {
    let mut sys = earth_moon();
    let start: Vec<NVec3> = sys.bodies.iter().map(|b| b.x).collect();
    let forces = gravity_set();

    verlet_step(&mut sys, &forces, 60.0);
    for b in sys.bodies.iter_mut() {
        b.v = -b.v;
    }
    verlet_step(&mut sys, &forces, 60.0);

    for (b, x0) in sys.bodies.iter().zip(start.iter()) {
        assert_abs_diff_eq!(b.x, *x0, epsilon = 1e-6);
    }
}

#[test]
fn verlet_many_steps_reverse_to_start() {
    let mut sys = earth_moon();
    let start = sys.clone();
    let forces = gravity_set();

    let mut integrator = VerletIntegrator::new(&sys, &forces);
    for _ in 0..500 {
        integrator.step(&mut sys, &forces, 60.0);
    }
    for b in sys.bodies.iter_mut() {
        b.v = -b.v;
    }
    let mut integrator = VerletIntegrator::new(&sys, &forces);
    for _ in 0..500 {
        integrator.step(&mut sys, &forces, 60.0);
    }

    for (b, b0) in sys.bodies.iter().zip(start.bodies.iter()) {
        assert_abs_diff_eq!(b.x, b0.x, epsilon = 1e-3);
        assert_abs_diff_eq!(b.v, -b0.v, epsilon = 1e-9);
    }
}

#[test]
fn verlet_advances_time_by_dt() {
    let mut sys = earth_moon();
    sys.t = 100.0;
    let forces = gravity_set();
    let mut integrator = VerletIntegrator::new(&sys, &forces);
    for _ in 0..10 {
        integrator.step(&mut sys, &forces, 60.0);
    }
    assert_abs_diff_eq!(sys.t, 700.0);
}

#[test]
fn verlet_single_step_matches_formula() {
    let mut sys = earth_moon();
    let dt = 60.0;
    let a0 = accels(&sys);
    let moon0 = sys.bodies[1].clone();

    verlet_step(&mut sys, &gravity_set(), dt);

    let x1 = moon0.x + moon0.v * dt + 0.5 * a0[1] * dt * dt;
    assert_abs_diff_eq!(sys.bodies[1].x, x1, epsilon = 1e-9);

    let a1 = accels(&sys);
    let v1 = moon0.v + 0.5 * (a0[1] + a1[1]) * dt;
    assert_abs_diff_eq!(sys.bodies[1].v, v1, epsilon = 1e-15);
}

#[test]
fn carried_accelerations_match_fresh_evaluation() {
    let mut sys = earth_moon();
    let forces = gravity_set();
    let mut integrator = VerletIntegrator::new(&sys, &forces);
    for _ in 0..25 {
        integrator.step(&mut sys, &forces, 60.0);
    }
    let fresh = accels(&sys);
    assert_eq!(integrator.accelerations(), fresh.as_slice());
}

#[test]
fn circular_orbit_keeps_radius() {
    // probe on a circular 7000 km orbit around a fixed-ish Earth
    let v = (G_KM * 5.972e24 / 7000.0f64).sqrt();
    let mut sys = System::new(vec![
        Body::new("Earth", 5.972e24, NVec3::zeros(), NVec3::zeros()),
        Body::new("probe", 0.0, NVec3::new(7000.0, 0.0, 0.0), NVec3::new(0.0, v, 0.0)),
    ]);
    let forces = gravity_set();
    let mut integrator = VerletIntegrator::new(&sys, &forces);
    // roughly one orbit
    for _ in 0..5828 {
        integrator.step(&mut sys, &forces, 1.0);
    }
    let r = sys.bodies[1].x.norm();
    assert!((r - 7000.0).abs() < 1.0, "radius drifted to {r}");
}
