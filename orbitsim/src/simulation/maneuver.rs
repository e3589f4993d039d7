//! Instantaneous velocity changes applied between runs.

use serde::Deserialize;

use super::error::SimError;
use super::states::{all_finite, vec3_from_slice, Body, NVec3};
use super::timeline::Trajectories;

/// A one-shot delta-v on a named body.
#[derive(Debug, Clone, PartialEq)]
pub struct Maneuver {
    pub target: String,
    /// `None` applies to the live state as it is now.
    pub application_time: Option<f64>,
    pub delta_v: NVec3, // km/s
}

impl Maneuver {
    pub fn new(target: impl Into<String>, application_time: Option<f64>, delta_v: NVec3) -> Self {
        Self {
            target: target.into(),
            application_time,
            delta_v,
        }
    }

    pub fn from_components(
        target: impl Into<String>,
        application_time: Option<f64>,
        delta_v: &[f64],
    ) -> Result<Self, SimError> {
        let target = target.into();
        let delta_v = vec3_from_slice(delta_v)
            .map_err(|e| SimError::InvalidInput(format!("maneuver on {target:?} delta_v: {e}")))?;
        let maneuver = Self::new(target, application_time, delta_v);
        maneuver.validate()?;
        Ok(maneuver)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if let Some(t) = self.application_time {
            if !t.is_finite() {
                return Err(SimError::InvalidInput(format!(
                    "maneuver on {:?} has non-finite time {t}",
                    self.target
                )));
            }
        }
        if !all_finite(&self.delta_v) {
            return Err(SimError::InvalidInput(format!(
                "maneuver on {:?} has a non-finite delta_v",
                self.target
            )));
        }
        Ok(())
    }
}

/// What happens to history recorded after a maneuver's application time.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicy {
    /// Keep it; the next run overwrites only the timestamps it re-records,
    /// so stale entries may remain between fresh samples.
    #[default]
    OverwriteOnOverlap,
    /// Drop every entry strictly after the application time.
    TruncateOnManeuver,
}

/// Apply `maneuver` to its target in `bodies`.
///
/// With an application time the body's live state is first replaced by the
/// (possibly interpolated) state its timeline holds for that time; a body
/// without history keeps its live state. The delta-v is then added to the
/// velocity.
pub fn apply_maneuver<'a>(
    bodies: &'a mut [Body],
    history: &mut Trajectories,
    maneuver: &Maneuver,
    policy: HistoryPolicy,
) -> Result<&'a Body, SimError> {
    let body = find_target(bodies, maneuver)?;
    if let Some(t) = maneuver.application_time {
        if let Some((x, v)) = history.get(&body.name).and_then(|tl| tl.state_at(t, body.v)) {
            body.x = x;
            body.v = v;
        }
    }
    prune_history(history, maneuver, policy);
    Ok(burn(body, maneuver))
}

/// Apply `maneuver` to a target whose live state already belongs to the
/// application time. Only the history policy and the delta-v take effect.
pub fn apply_maneuver_live<'a>(
    bodies: &'a mut [Body],
    history: &mut Trajectories,
    maneuver: &Maneuver,
    policy: HistoryPolicy,
) -> Result<&'a Body, SimError> {
    let body = find_target(bodies, maneuver)?;
    prune_history(history, maneuver, policy);
    Ok(burn(body, maneuver))
}

fn find_target<'a>(bodies: &'a mut [Body], maneuver: &Maneuver) -> Result<&'a mut Body, SimError> {
    maneuver.validate()?;
    bodies
        .iter_mut()
        .find(|b| b.name == maneuver.target)
        .ok_or_else(|| SimError::NotFound {
            name: maneuver.target.clone(),
        })
}

fn prune_history(history: &mut Trajectories, maneuver: &Maneuver, policy: HistoryPolicy) {
    if policy != HistoryPolicy::TruncateOnManeuver {
        return;
    }
    if let (Some(t), Some(timeline)) = (maneuver.application_time, history.get_mut(&maneuver.target)) {
        timeline.truncate_after(t);
    }
}

fn burn<'a>(body: &'a mut Body, maneuver: &Maneuver) -> &'a Body {
    body.v += maneuver.delta_v;
    log::info!(
        "maneuver on {} at {:?}: dv = [{:.6}, {:.6}, {:.6}] km/s",
        body.name,
        maneuver.application_time,
        maneuver.delta_v.x,
        maneuver.delta_v.y,
        maneuver.delta_v.z
    );
    body
}
