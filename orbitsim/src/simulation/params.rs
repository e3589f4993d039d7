//! Numerical and physical parameters for one simulation run
//!
//! `Parameters` holds runtime settings:
//! - gravitational constant `G` in km^3 kg^-1 s^-2,
//! - fixed step size and step count,
//! - start time relative to the external reference epoch,
//! - the snapshot policy deciding what lands in the trajectory,
//! - whether the caller intends to persist the result
//!
//! Nothing here is global: two runs with different constants can coexist.

use super::error::SimError;
use super::sampler::SnapshotPolicy;

/// Gravitational constant in km^3 / (kg s^2)
pub const G_KM: f64 = 6.67430e-20;

/// One minute
pub const DEFAULT_TIME_STEP: f64 = 60.0;

pub const DEFAULT_FIXED_INTERVAL: u64 = 52;
pub const DEFAULT_MIN_INTERVAL: u64 = 5;
pub const DEFAULT_MAX_INTERVAL: u64 = 100;
pub const DEFAULT_SNAPSHOTS_PER_ORBIT: f64 = 100.0;

#[allow(non_snake_case)]
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub G: f64,                   // gravitational constant
    pub time_step: f64,           // fixed step dt (s)
    pub step_count: u64,          // number of steps in the run
    pub start_time: f64,          // time of the initial state (s)
    pub snapshot: SnapshotPolicy, // trajectory sampling
    pub persist_result: bool,     // caller keeps the final timeline
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            G: G_KM,
            time_step: DEFAULT_TIME_STEP,
            step_count: 1,
            start_time: 0.0,
            snapshot: SnapshotPolicy::default(),
            persist_result: true,
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> Result<(), SimError> {
        if !self.G.is_finite() || self.G < 0.0 {
            return Err(SimError::InvalidInput(format!(
                "G must be finite and >= 0, got {}",
                self.G
            )));
        }
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(SimError::InvalidInput(format!(
                "time_step must be > 0, got {}",
                self.time_step
            )));
        }
        if self.step_count == 0 {
            return Err(SimError::InvalidInput("step_count must be >= 1".into()));
        }
        if !self.start_time.is_finite() {
            return Err(SimError::InvalidInput(format!(
                "start_time must be finite, got {}",
                self.start_time
            )));
        }
        self.snapshot.validate()
    }

    /// Simulated span of the run in seconds.
    pub fn duration(&self) -> f64 {
        self.step_count as f64 * self.time_step
    }
}
