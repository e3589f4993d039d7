//! Build fully-initialized simulation scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces a runtime bundle
//! containing:
//! - system state (`System` with validated bodies)
//! - run parameters (`Parameters`)
//! - chunking (`ChunkPlan`) and where to start (`StartPoint`)
//! - maneuvers to apply before the run, and the history policy for them
//!
//! Storage stays outside: [`Scenario::restore_states`] takes the stored
//! live states, [`Scenario::execute`] takes the loaded history and hands
//! back the merged one.
//!
//! Body states from the configuration are the initial conditions at
//! `parameters.start_time`. Once live states are restored (or a run has
//! finished) they belong to that later time instead, and a run may only
//! start at a time for which every body's state is actually known.

use crate::configuration::config::{BodyConfig, ScenarioConfig};
use crate::simulation::continuation::{run_chunks, ChunkPlan, StartPoint};
use crate::simulation::error::SimError;
use crate::simulation::maneuver::{apply_maneuver_live, HistoryPolicy, Maneuver};
use crate::simulation::params::Parameters;
use crate::simulation::states::{Body, BodyState, LiveStates, System};
use crate::simulation::timeline::Trajectories;

/// Runtime bundle constructed from a [`ScenarioConfig`]
#[derive(Debug, Clone)]
pub struct Scenario {
    pub parameters: Parameters,
    pub system: System,
    pub plan: ChunkPlan,
    pub start_time: Option<f64>, // explicit start, if configured
    pub maneuvers: Vec<Maneuver>,
    pub history_policy: HistoryPolicy,
    /// Time the live body states belong to, once they are no longer the
    /// configured initial conditions.
    pub live_epoch: Option<f64>,
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> Result<Self, SimError> {
        // Bodies: map `BodyConfig` -> runtime `Body` using nalgebra vectors
        let bodies = cfg
            .bodies
            .iter()
            .map(|bc: &BodyConfig| Body::from_components(&bc.name, bc.mass, &bc.position, &bc.velocity))
            .collect::<Result<Vec<_>, _>>()?;
        let system = System::new(bodies);
        system.validate()?;

        // Parameters (runtime) from ParametersConfig
        let p_cfg = cfg.parameters;
        let parameters = Parameters {
            G: p_cfg.G,
            time_step: p_cfg.time_step,
            step_count: p_cfg.step_count,
            start_time: p_cfg.start_time.unwrap_or(0.0),
            snapshot: cfg.sampling,
            persist_result: p_cfg.persist_result,
        };
        parameters.validate()?;

        // Chunking: explicit steps, else days, else the whole run at once
        let plan = match cfg.continuation {
            None => ChunkPlan::single(parameters.step_count),
            Some(c) => match (c.chunk_steps, c.chunk_days) {
                (Some(steps), _) => ChunkPlan::new(steps, c.chunk_count),
                (None, Some(days)) => {
                    ChunkPlan::from_duration(days * 86_400.0, parameters.time_step, c.chunk_count)?
                }
                (None, None) => ChunkPlan::new(parameters.step_count, c.chunk_count),
            },
        };
        plan.validate()?;

        let maneuvers = cfg
            .maneuvers
            .iter()
            .map(|mc| Maneuver::from_components(&mc.target, mc.time, &mc.delta_v))
            .collect::<Result<Vec<_>, _>>()?;
        for m in &maneuvers {
            if system.body(&m.target).is_none() {
                return Err(SimError::NotFound {
                    name: m.target.clone(),
                });
            }
        }
        // every timed maneuver happens at the run start
        let anchor = p_cfg
            .start_time
            .or_else(|| maneuvers.iter().find_map(|m| m.application_time));
        if let Some(t0) = anchor {
            if let Some(m) = maneuvers
                .iter()
                .find(|m| m.application_time.is_some_and(|t| t != t0))
            {
                return Err(SimError::InvalidInput(format!(
                    "maneuver on {:?} at t = {:?} s does not match the run start t = {t0} s",
                    m.target, m.application_time
                )));
            }
        }

        Ok(Self {
            parameters,
            system,
            plan,
            start_time: p_cfg.start_time,
            maneuvers,
            history_policy: cfg.history_policy,
            live_epoch: None,
        })
    }

    /// Replace the configured body states with stored live states.
    ///
    /// Nothing happens when no body has a stored state. Otherwise every body
    /// needs one and all of them must share the same time.
    pub fn restore_states(&mut self, states: &LiveStates) -> Result<(), SimError> {
        let Some(t) = self
            .system
            .bodies
            .iter()
            .find_map(|b| states.get(&b.name))
            .map(|s| s.t)
        else {
            return Ok(());
        };

        let mut restored: Vec<BodyState> = Vec::with_capacity(self.system.bodies.len());
        for b in &self.system.bodies {
            let state = states.get(&b.name).ok_or_else(|| {
                SimError::InvalidInput(format!(
                    "no stored live state for {:?} while other bodies resume at t = {t} s",
                    b.name
                ))
            })?;
            state.validate()?;
            if state.t != t {
                return Err(SimError::InvalidInput(format!(
                    "stored live state of {:?} is at t = {} s, expected t = {t} s",
                    b.name, state.t
                )));
            }
            restored.push(*state);
        }

        for (b, s) in self.system.bodies.iter_mut().zip(restored) {
            b.x = s.position;
            b.v = s.velocity;
        }
        self.system.t = t;
        self.live_epoch = Some(t);
        log::info!("restored live states of {} bodies at t = {t} s", self.system.bodies.len());
        Ok(())
    }

    /// Explicit start time, else the maneuver time, else resume.
    pub fn start_point(&self) -> StartPoint {
        let maneuver_time = self.maneuvers.iter().find_map(|m| m.application_time);
        match self.start_time.or(maneuver_time) {
            Some(t) => StartPoint::Live(t),
            None => StartPoint::Resume,
        }
    }

    /// Align every body with the start time, apply maneuvers, run every chunk.
    ///
    /// Returns `history` with the new samples merged in; `self.system`
    /// holds the final live state afterwards.
    pub fn execute(&mut self, mut history: Trajectories) -> Result<Trajectories, SimError> {
        let t = match self.start_point() {
            StartPoint::Live(t) | StartPoint::At(t) => t,
            StartPoint::Resume => self.resume_time(&history)?,
        };
        self.align_to(&history, t)?;
        // bodies are already at `t`, the maneuvers must not rewind again
        for m in &self.maneuvers {
            apply_maneuver_live(&mut self.system.bodies, &mut history, m, self.history_policy)?;
        }
        let merged = run_chunks(&mut self.system, history, &self.parameters, self.plan, StartPoint::Live(t))?;
        self.live_epoch = Some(self.system.t);
        Ok(merged)
    }

    fn resume_time(&self, history: &Trajectories) -> Result<f64, SimError> {
        let latest = history.latest_time();
        match self.live_epoch {
            Some(epoch) => {
                if let Some(l) = latest.filter(|l| *l > epoch) {
                    log::warn!("history runs to t = {l} s, resuming from the live state at t = {epoch} s");
                }
                Ok(epoch)
            }
            None => match latest {
                Some(l) if l > self.parameters.start_time => Err(SimError::InvalidInput(format!(
                    "history runs to t = {l} s but no live state is stored; restore live states or set start_time"
                ))),
                _ => Ok(self.parameters.start_time),
            },
        }
    }

    /// Bring every body to its state at `t`: the live state when it already
    /// belongs to `t`, otherwise the recorded one.
    fn align_to(&mut self, history: &Trajectories, t: f64) -> Result<(), SimError> {
        if self.live_epoch == Some(t) {
            self.system.t = t;
            return Ok(());
        }
        let configured = self.live_epoch.is_none() && t == self.parameters.start_time;

        let mut aligned = Vec::with_capacity(self.system.bodies.len());
        for b in &self.system.bodies {
            let recorded = history
                .get(&b.name)
                .filter(|tl| tl.covers(t))
                .and_then(|tl| tl.state_at(t, b.v));
            match recorded {
                Some(state) => aligned.push(Some(state)),
                None if configured => aligned.push(None),
                None => {
                    return Err(SimError::InvalidInput(format!(
                        "no state for {:?} at t = {t} s: nothing recorded there and the live state is at t = {} s",
                        b.name,
                        self.live_epoch.unwrap_or(self.parameters.start_time)
                    )))
                }
            }
        }

        for (b, state) in self.system.bodies.iter_mut().zip(aligned) {
            if let Some((x, v)) = state {
                b.x = x;
                b.v = v;
            }
        }
        self.system.t = t;
        Ok(())
    }
}
