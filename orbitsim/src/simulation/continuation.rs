//! Chunked long-horizon runs ("quarters").
//!
//! A long horizon is cut into fixed-size chunks. Each chunk starts from the
//! live end state of the previous one and its samples are merged into the
//! cumulative history. Whole chunks are the only resumable unit.

use super::engine::simulate;
use super::error::SimError;
use super::params::Parameters;
use super::states::System;
use super::timeline::Trajectories;

/// Ninety days in seconds
pub const QUARTER_SECONDS: f64 = 90.0 * 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub chunk_steps: u64, // steps per chunk
    pub chunk_count: u64, // number of chunks
}

impl ChunkPlan {
    pub fn new(chunk_steps: u64, chunk_count: u64) -> Self {
        Self {
            chunk_steps,
            chunk_count,
        }
    }

    /// The whole run as one chunk.
    pub fn single(step_count: u64) -> Self {
        Self::new(step_count, 1)
    }

    /// Chunks of `seconds` each, rounded to whole steps of `time_step`.
    pub fn from_duration(seconds: f64, time_step: f64, chunk_count: u64) -> Result<Self, SimError> {
        if !(seconds.is_finite() && seconds > 0.0 && time_step.is_finite() && time_step > 0.0) {
            return Err(SimError::InvalidInput(format!(
                "chunk duration {seconds} s and time_step {time_step} s must be > 0"
            )));
        }
        let steps = (seconds / time_step).round().max(1.0) as u64;
        Ok(Self::new(steps, chunk_count))
    }

    /// 90-day chunks.
    pub fn quarters(time_step: f64, chunk_count: u64) -> Result<Self, SimError> {
        Self::from_duration(QUARTER_SECONDS, time_step, chunk_count)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.chunk_steps == 0 || self.chunk_count == 0 {
            return Err(SimError::InvalidInput(format!(
                "chunk plan needs >= 1 step and >= 1 chunk, got {} x {}",
                self.chunk_steps, self.chunk_count
            )));
        }
        Ok(())
    }

    pub fn total_steps(&self) -> u64 {
        self.chunk_steps.saturating_mul(self.chunk_count)
    }
}

/// Where the first chunk begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StartPoint {
    /// Latest recorded instant in the history, or `params.start_time` when
    /// the history is empty. Live states are used as they are.
    Resume,
    /// Explicit time; every body with history is first moved to its
    /// recorded state at that time via [`reconcile`].
    At(f64),
    /// Explicit time; live states are trusted as already matching it.
    Live(f64),
}

/// Replace each body's live state with the state its timeline holds at `t`.
/// Bodies without history are left alone.
pub fn reconcile(sys: &mut System, history: &Trajectories, t: f64) -> Result<(), SimError> {
    if !t.is_finite() {
        return Err(SimError::InvalidInput(format!("start time must be finite, got {t}")));
    }
    for b in sys.bodies.iter_mut() {
        if let Some((x, v)) = history.get(&b.name).and_then(|tl| tl.state_at(t, b.v)) {
            b.x = x;
            b.v = v;
        }
    }
    sys.t = t;
    Ok(())
}

/// Run `plan.chunk_count` chunks of `plan.chunk_steps` steps each and merge
/// every chunk's samples into `history`.
///
/// `params.step_count` and `params.start_time` are replaced per chunk; every
/// other parameter applies unchanged. Returns the fully merged history.
pub fn run_chunks(
    sys: &mut System,
    mut history: Trajectories,
    params: &Parameters,
    plan: ChunkPlan,
    start: StartPoint,
) -> Result<Trajectories, SimError> {
    plan.validate()?;
    let mut chunk_params = Parameters {
        step_count: plan.chunk_steps,
        ..params.clone()
    };
    chunk_params.validate()?;
    sys.validate()?;

    let mut current_time = match start {
        StartPoint::Resume => history.latest_time().unwrap_or(params.start_time),
        StartPoint::At(t) => {
            reconcile(sys, &history, t)?;
            t
        }
        StartPoint::Live(t) => t,
    };

    for chunk in 0..plan.chunk_count {
        chunk_params.start_time = current_time;
        let increment = simulate(sys, &chunk_params)?;
        current_time = increment.latest_time().unwrap_or(sys.t);
        history.merge(increment);
        log::info!(
            "chunk {}/{} done: t = {} s",
            chunk + 1,
            plan.chunk_count,
            current_time
        );
    }
    Ok(history)
}
