//! Core state types for the N-body simulation.
//!
//! - `Body`   a named point mass with position (km) and velocity (km/s)
//! - `System` the ordered body set plus the current simulation time `t` (s)
//!
//! Raw components arriving from outside (config files, callers) go through
//! [`Body::from_components`] so malformed vectors are rejected before any
//! integration step runs.

use std::collections::{BTreeMap, HashSet};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::error::SimError;

pub type NVec3 = Vector3<f64>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Body {
    pub name: String, // unique identifier
    #[serde(rename = "mass")]
    pub m: f64,       // mass (kg), zero-mass bodies feel gravity but exert none
    #[serde(rename = "position")]
    pub x: NVec3, // position (km)
    #[serde(rename = "velocity")]
    pub v: NVec3, // velocity (km/s)
}

impl Body {
    pub fn new(name: impl Into<String>, m: f64, x: NVec3, v: NVec3) -> Self {
        Self {
            name: name.into(),
            m,
            x,
            v,
        }
    }

    /// Build a body from untyped slices, checking each has exactly three
    /// finite components and that the mass is usable.
    pub fn from_components(
        name: impl Into<String>,
        m: f64,
        position: &[f64],
        velocity: &[f64],
    ) -> Result<Self, SimError> {
        let name = name.into();
        let x = vec3_from_slice(position)
            .map_err(|e| SimError::InvalidInput(format!("body {name:?} position: {e}")))?;
        let v = vec3_from_slice(velocity)
            .map_err(|e| SimError::InvalidInput(format!("body {name:?} velocity: {e}")))?;
        let body = Self { name, m, x, v };
        body.validate()?;
        Ok(body)
    }

    /// Live state of this body, stamped with `t`.
    pub fn state(&self, t: f64) -> BodyState {
        BodyState {
            t,
            position: self.x,
            velocity: self.v,
        }
    }

    /// Distance from the frame origin (km).
    pub fn radius(&self) -> f64 {
        self.x.norm()
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.name.is_empty() {
            return Err(SimError::InvalidInput("body name must not be empty".into()));
        }
        if !self.m.is_finite() || self.m < 0.0 {
            return Err(SimError::InvalidInput(format!(
                "body {:?} mass must be finite and >= 0, got {}",
                self.name, self.m
            )));
        }
        if !all_finite(&self.x) || !all_finite(&self.v) {
            return Err(SimError::InvalidInput(format!(
                "body {:?} has a non-finite position or velocity",
                self.name
            )));
        }
        Ok(())
    }
}

/// Convert a slice into a 3-vector, rejecting wrong lengths and NaN/inf.
pub fn vec3_from_slice(c: &[f64]) -> Result<NVec3, String> {
    let &[x, y, z] = c else {
        return Err(format!("expected 3 components, got {}", c.len()));
    };
    let v = NVec3::new(x, y, z);
    if !all_finite(&v) {
        return Err(format!("components must be finite, got {c:?}"));
    }
    Ok(v)
}

pub(crate) fn all_finite(v: &NVec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Position and velocity of one body at a known time, kept between runs so
/// a later run can continue from the exact end state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    pub t: f64,          // s
    pub position: NVec3, // km
    pub velocity: NVec3, // km/s
}

impl BodyState {
    pub fn validate(&self) -> Result<(), SimError> {
        if !self.t.is_finite() || !all_finite(&self.position) || !all_finite(&self.velocity) {
            return Err(SimError::InvalidInput(format!(
                "stored body state at t = {} has non-finite components",
                self.t
            )));
        }
        Ok(())
    }
}

/// Live states keyed by body name.
pub type LiveStates = BTreeMap<String, BodyState>;

#[derive(Debug, Clone, Default)]
pub struct System {
    pub bodies: Vec<Body>, // ordered body set
    pub t: f64,            // simulation time (s) since the external reference epoch
}

impl System {
    pub fn new(bodies: Vec<Body>) -> Self {
        Self { bodies, t: 0.0 }
    }

    pub fn body(&self, name: &str) -> Option<&Body> {
        self.bodies.iter().find(|b| b.name == name)
    }

    /// Every body's live state at the current time.
    pub fn live_states(&self) -> LiveStates {
        self.bodies
            .iter()
            .map(|b| (b.name.clone(), b.state(self.t)))
            .collect()
    }

    /// Index of the most massive body; the first one wins on ties.
    pub fn central_body_index(&self) -> Option<usize> {
        self.bodies
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, b)| match best {
                Some((_, m)) if m >= b.m => best,
                _ => Some((i, b.m)),
            })
            .map(|(i, _)| i)
    }

    /// Check every body and the uniqueness of names.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.bodies.is_empty() {
            return Err(SimError::InvalidInput("body set is empty".into()));
        }
        let mut seen = HashSet::with_capacity(self.bodies.len());
        for b in &self.bodies {
            b.validate()?;
            if !seen.insert(b.name.as_str()) {
                return Err(SimError::InvalidInput(format!(
                    "duplicate body name {:?}",
                    b.name
                )));
            }
        }
        Ok(())
    }
}
