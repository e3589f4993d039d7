//! Fixed-step velocity-Verlet integrator for the N-body system
//!
//! The acceleration set from the end of one step is carried into the next,
//! so each step costs exactly one fresh force evaluation after the first.

use super::forces::AccelSet;
use super::states::{System, NVec3};

/// Velocity-Verlet stepper holding the accelerations at the current
/// positions of `sys`.
///
/// Per step:
/// 1. x_n+1 = x_n + dt v_n + (dt^2 / 2) a_n
/// 2. a_n+1 from x_n+1
/// 3. v_n+1 = v_n + (dt / 2) (a_n + a_n+1)
///
/// The order matters: it is what makes the scheme symmetric in time.
pub struct VerletIntegrator {
    a_old: Vec<NVec3>, // a_n at the current positions
    a_new: Vec<NVec3>, // scratch for a_n+1
}

impl VerletIntegrator {
    /// Evaluate the starting accelerations for `sys`.
    pub fn new(sys: &System, forces: &AccelSet) -> Self {
        let n = sys.bodies.len();
        let mut a_old = vec![NVec3::zeros(); n];
        forces.accumulate_accels(sys.t, sys, &mut a_old);
        Self {
            a_old,
            a_new: vec![NVec3::zeros(); n],
        }
    }

    /// Accelerations at the current positions.
    pub fn accelerations(&self) -> &[NVec3] {
        &self.a_old
    }

    /// Advance `sys` by one step of `dt` seconds in place, including `sys.t`.
    pub fn step(&mut self, sys: &mut System, forces: &AccelSet, dt: f64) {
        if sys.bodies.is_empty() { // no bodies, only time moves
            sys.t += dt;
            return;
        }
        let half_dt2 = 0.5 * dt * dt;
        let half_dt = 0.5 * dt;

        // Drift with the start-of-step acceleration
        for (b, a) in sys.bodies.iter_mut().zip(self.a_old.iter()) {
            b.x += dt * b.v + half_dt2 * *a;
        }

        sys.t += dt;

        // a_n+1 at the new positions
        forces.accumulate_accels(sys.t, &*sys, &mut self.a_new);

        // Kick with the time-averaged acceleration
        for (b, (a0, a1)) in sys
            .bodies
            .iter_mut()
            .zip(self.a_old.iter().zip(self.a_new.iter()))
        {
            b.v += half_dt * (*a0 + *a1);
        }

        // a_n+1 becomes a_n for the next step
        std::mem::swap(&mut self.a_old, &mut self.a_new);
    }
}

/// Advance `sys` by a single step, evaluating the starting accelerations
/// from scratch.
pub fn verlet_step(sys: &mut System, forces: &AccelSet, dt: f64) {
    let mut integrator = VerletIntegrator::new(sys, forces);
    integrator.step(sys, forces, dt);
}
