//! Snapshot sampling: which integration steps are written to a trajectory.
//!
//! Long runs take hundreds of thousands of steps, so only every k-th state
//! is kept. With the adaptive policy k is chosen per body so that each body
//! gets roughly the same number of samples per orbit around the central
//! (most massive) body.
//!
//! The initial state (step 0) and the final step are always recorded.

use std::f64::consts::PI;

use serde::Deserialize;

use super::error::SimError;
use super::params::{
    DEFAULT_FIXED_INTERVAL, DEFAULT_MAX_INTERVAL, DEFAULT_MIN_INTERVAL,
    DEFAULT_SNAPSHOTS_PER_ORBIT,
};
use super::states::System;

/// How snapshot intervals are chosen for a run.
///
/// YAML: `policy: "fixed"` with `interval`, or `policy: "adaptive"` with
/// `min_interval`, `max_interval` and `snapshots_per_orbit` (all optional).
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SnapshotPolicy {
    /// Record when `step % interval == 0`
    Fixed {
        #[serde(default = "default_fixed_interval")]
        interval: u64,
    },
    /// Per-body interval from an estimated orbital period, clamped
    Adaptive {
        #[serde(default = "default_min_interval")]
        min_interval: u64,
        #[serde(default = "default_max_interval")]
        max_interval: u64,
        #[serde(default = "default_snapshots_per_orbit")]
        snapshots_per_orbit: f64,
    },
}

fn default_fixed_interval() -> u64 {
    DEFAULT_FIXED_INTERVAL
}
fn default_min_interval() -> u64 {
    DEFAULT_MIN_INTERVAL
}
fn default_max_interval() -> u64 {
    DEFAULT_MAX_INTERVAL
}
fn default_snapshots_per_orbit() -> f64 {
    DEFAULT_SNAPSHOTS_PER_ORBIT
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        SnapshotPolicy::Fixed {
            interval: DEFAULT_FIXED_INTERVAL,
        }
    }
}

impl SnapshotPolicy {
    pub fn adaptive() -> Self {
        SnapshotPolicy::Adaptive {
            min_interval: DEFAULT_MIN_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            snapshots_per_orbit: DEFAULT_SNAPSHOTS_PER_ORBIT,
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        match *self {
            SnapshotPolicy::Fixed { interval } => {
                if interval == 0 {
                    return Err(SimError::InvalidInput(
                        "snapshot interval must be >= 1".into(),
                    ));
                }
            }
            SnapshotPolicy::Adaptive {
                min_interval,
                max_interval,
                snapshots_per_orbit,
            } => {
                if min_interval == 0 || min_interval > max_interval {
                    return Err(SimError::InvalidInput(format!(
                        "adaptive interval bounds must satisfy 1 <= min <= max, got [{min_interval}, {max_interval}]"
                    )));
                }
                if !snapshots_per_orbit.is_finite() || snapshots_per_orbit <= 0.0 {
                    return Err(SimError::InvalidInput(format!(
                        "snapshots_per_orbit must be > 0, got {snapshots_per_orbit}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Kepler's third law period estimate for a body at distance `r` (km) from
/// the origin around a central mass. `r` stands in for the semi-major axis.
///
/// Returns `f64::INFINITY` when the central body exerts no gravity.
pub fn orbital_period(r: f64, g: f64, central_mass: f64) -> f64 {
    let mu = g * central_mass;
    if mu <= 0.0 {
        return f64::INFINITY;
    }
    2.0 * PI * (r * r * r / mu).sqrt()
}

/// `floor(period / (snapshots_per_orbit * dt))` clamped to `[min, max]`.
///
/// Non-decreasing in `period`; infinite periods map to `max_interval`.
pub fn adaptive_interval(
    period: f64,
    dt: f64,
    snapshots_per_orbit: f64,
    min_interval: u64,
    max_interval: u64,
) -> u64 {
    let desired = (period / (snapshots_per_orbit * dt)).floor();
    if desired.is_nan() || desired <= min_interval as f64 {
        min_interval
    } else if desired >= max_interval as f64 {
        max_interval
    } else {
        desired as u64
    }
}

/// Per-run sampling decision, resolved once before the first step.
#[derive(Debug, Clone)]
pub struct SnapshotSampler {
    intervals: Vec<u64>, // one interval per body, same order as System::bodies
    step_count: u64,
}

impl SnapshotSampler {
    /// Resolve intervals for every body of `sys` under `policy`.
    #[allow(non_snake_case)]
    pub fn new(policy: &SnapshotPolicy, sys: &System, G: f64, dt: f64, step_count: u64) -> Self {
        let n = sys.bodies.len();
        let intervals = match *policy {
            SnapshotPolicy::Fixed { interval } => vec![interval; n],
            SnapshotPolicy::Adaptive {
                min_interval,
                max_interval,
                snapshots_per_orbit,
            } => {
                let central_mass = sys
                    .central_body_index()
                    .map(|i| sys.bodies[i].m)
                    .unwrap_or(0.0);
                sys.bodies
                    .iter()
                    .map(|b| {
                        let period = orbital_period(b.radius(), G, central_mass);
                        adaptive_interval(period, dt, snapshots_per_orbit, min_interval, max_interval)
                    })
                    .collect()
            }
        };
        Self {
            intervals,
            step_count,
        }
    }

    pub fn intervals(&self) -> &[u64] {
        &self.intervals
    }

    /// Whether body `i` is recorded after integration step `step`
    /// (step 0 is the initial state).
    pub fn should_record(&self, i: usize, step: u64) -> bool {
        if step == 0 || step == self.step_count {
            return true;
        }
        match self.intervals.get(i) {
            Some(&k) if k > 0 => step % k == 0,
            _ => false,
        }
    }
}
