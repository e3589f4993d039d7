//! Force / acceleration contributors for the n-body engine
//!
//! Defines the acceleration trait, the summing `AccelSet`, and direct
//! Newtonian gravity without softening

use crate::simulation::states::{System, NVec3};

/// Collection of acceleration terms (gravity, thrust, etc)
/// Each term implements [`Acceleration`] and their contributions are summed
/// into a single acceleration vector per body
pub struct AccelSet {
    terms: Vec<Box<dyn Acceleration + Send + Sync>>,
}

impl Default for AccelSet {
    fn default() -> Self {
        Self::new()
    }
}

impl AccelSet {
    /// Constructor
    pub fn new() -> Self {
        Self {
            terms: Vec::new(),
        }
    }

    /// Direct gravity only, the set every run uses
    #[allow(non_snake_case)]
    pub fn gravity(G: f64) -> Self {
        Self::new().with(NewtonianGravity { G })
    }

    /// Add an acceleration term
    pub fn with(mut self, term: impl Acceleration + Send + Sync + 'static) -> Self {
        self.terms.push(Box::new(term));
        self
    }

    /// Compute total accelerations at time `t` for all bodies in `sys`
    /// - `out[i]` will be set to the sum of contributions from all terms
    pub fn accumulate_accels(&self, t: f64, sys: &System, out: &mut [NVec3]) {
        // Zero buffer
        for a in out.iter_mut() {
            *a = NVec3::zeros();
        }
        // Iterate over all acceleration contributors
        for term in &self.terms {
            term.acceleration(t, sys, out);
        }
    }
}

/// Trait for acceleration sources operating on [`System`]
/// Implementations add their contribution into `out[i]` for each body
pub trait Acceleration {
    fn acceleration(&self, t: f64, sys: &System, out: &mut [NVec3]);
}

/// Newtonian gravity, direct n^2 sum, km / kg / s units.
///
/// Pairs at exactly zero separation contribute nothing. Coincident bodies
/// are not an error and no collision is modelled.
pub struct NewtonianGravity {
    #[allow(non_snake_case)]
    pub G: f64,
}

impl Acceleration for NewtonianGravity {
    fn acceleration(&self, _t: f64, sys: &System, out: &mut [NVec3]) {
        let n = sys.bodies.len();
        if n < 2 { // nothing pulls on a lone body
            return;
        }

        // Loop over each unordered pair (i, j) with i < j
        for i in 0..n {
            let bi = &sys.bodies[i];
            let xi = bi.x;
            let mi = bi.m;

            for j in (i + 1)..n {
                let bj = &sys.bodies[j];

                // r points from i to j: i is pulled along +r, j along -r
                let r = bj.x - xi;
                let d2 = r.dot(&r);
                if d2 == 0.0 {
                    continue;
                }

                // G / |r|^3
                let inv_r = d2.sqrt().recip();
                let coef = self.G * inv_r * inv_r * inv_r;

                // a_i +=  G * m_j * r / |r|^3
                // a_j += -G * m_i * r / |r|^3
                out[i] += coef * bj.m * r;
                out[j] -= coef * mi * r;
            }
        }
    }
}

/// Convenience wrapper: one acceleration per body from direct gravity.
#[allow(non_snake_case)]
pub fn gravitational_accelerations(sys: &System, G: f64) -> Vec<NVec3> {
    let mut out = vec![NVec3::zeros(); sys.bodies.len()];
    AccelSet::gravity(G).accumulate_accels(sys.t, sys, &mut out);
    out
}
