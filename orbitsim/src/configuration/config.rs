//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! simulation scenario. A scenario consists of:
//!
//! - [`ParametersConfig`]   – step size, step count, start time, constants
//! - [`SnapshotPolicy`]     – fixed or adaptive trajectory sampling
//! - [`ContinuationConfig`] – optional chunking of the run into quarters
//! - [`ManeuverConfig`]     – velocity changes applied before the run
//! - [`BodyConfig`]         – initial state for each body
//! - [`ScenarioConfig`]     – top-level wrapper used to load a scenario from YAML
//!
//! # YAML format
//! An Earth–Moon scenario matching these types:
//!
//! ```yaml
//! parameters:
//!   time_step: 60.0         # seconds
//!   step_count: 1000
//!   start_time: 0.0         # optional, absent = resume from stored live states
//!   G: 6.67430e-20          # optional, km^3 / (kg s^2)
//!   persist_result: true    # optional
//!
//! sampling:
//!   policy: "fixed"         # or "adaptive"
//!   interval: 52
//!
//! continuation:             # optional
//!   chunk_days: 90.0        # or chunk_steps
//!   chunk_count: 4
//!
//! history_policy: "overwrite_on_overlap"   # or "truncate_on_maneuver"
//!
//! maneuvers:
//!   - target: "Moon"
//!     time: 0.0             # optional, must equal start_time when both are set
//!     delta_v: [ 0.0, 0.01, 0.0 ]
//!
//! bodies:
//!   - name: "Earth"
//!     mass: 5.972e24
//!     position: [ 0.0, 0.0, 0.0 ]
//!     velocity: [ 0.0, 29.78, 0.0 ]
//!   - name: "Moon"
//!     mass: 7.34767309e22
//!     position: [ 384400.0, 0.0, 0.0 ]
//!     velocity: [ 0.0, 1.022, 0.0 ]
//! ```
//!
//! Vectors stay as `Vec<f64>` here; their length is checked when the
//! scenario is built.

use serde::Deserialize;

use crate::simulation::maneuver::HistoryPolicy;
use crate::simulation::params::{G_KM, DEFAULT_TIME_STEP};
use crate::simulation::sampler::SnapshotPolicy;

/// Global numerical and physical parameters for a scenario
#[allow(non_snake_case)]
#[derive(Deserialize, Debug, Clone)]
pub struct ParametersConfig {
    #[serde(default = "default_time_step")]
    pub time_step: f64,          // time step size (s)
    pub step_count: u64,         // steps per run, or per chunk when chunk size is absent
    #[serde(default)]
    pub start_time: Option<f64>, // seconds from the reference epoch
    #[serde(default = "default_g")]
    pub G: f64,                  // gravitational constant
    #[serde(default = "default_true")]
    pub persist_result: bool,    // store the merged timelines afterwards
}

fn default_time_step() -> f64 {
    DEFAULT_TIME_STEP
}

fn default_g() -> f64 {
    G_KM
}

fn default_true() -> bool {
    true
}

/// Splitting of the run into sequential chunks
#[derive(Deserialize, Debug, Clone)]
pub struct ContinuationConfig {
    pub chunk_steps: Option<u64>, // chunk size in steps
    pub chunk_days: Option<f64>,  // chunk size in days, used when `chunk_steps` is absent
    pub chunk_count: u64,         // number of chunks
}

/// A velocity change applied before the run starts
#[derive(Deserialize, Debug, Clone)]
pub struct ManeuverConfig {
    pub target: String,        // body name
    #[serde(default)]
    pub time: Option<f64>,     // application time (s); absent = live state
    pub delta_v: Vec<f64>,     // km/s
}

/// Configuration for a single body's initial state
#[derive(Deserialize, Debug, Clone)]
pub struct BodyConfig {
    pub name: String,       // unique body name
    pub mass: f64,          // kg
    pub position: Vec<f64>, // km
    pub velocity: Vec<f64>, // km/s
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioConfig {
    pub parameters: ParametersConfig,              // numerical and physical parameters
    #[serde(default)]
    pub sampling: SnapshotPolicy,                  // trajectory sampling policy
    #[serde(default)]
    pub continuation: Option<ContinuationConfig>,  // chunked execution
    #[serde(default)]
    pub history_policy: HistoryPolicy,             // stale history after maneuvers
    #[serde(default)]
    pub maneuvers: Vec<ManeuverConfig>,            // applied in order before running
    pub bodies: Vec<BodyConfig>,                   // initial state of the system
}

impl ScenarioConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }
}
