//! A single fixed-step run: integrate, sample, return the timeline increment.

use super::error::SimError;
use super::forces::AccelSet;
use super::integrator::VerletIntegrator;
use super::params::Parameters;
use super::sampler::SnapshotSampler;
use super::states::System;
use super::timeline::{Timeline, Trajectories};

/// Run `params.step_count` velocity-Verlet steps on `sys`, starting at
/// `params.start_time`.
///
/// `sys` is validated before anything changes; on success it holds the
/// final state and `sys.t` the final time. The returned trajectories contain
/// only what this run sampled, always including the initial and the final
/// state of every body.
pub fn simulate(sys: &mut System, params: &Parameters) -> Result<Trajectories, SimError> {
    params.validate()?;
    sys.validate()?;

    let dt = params.time_step;
    let steps = params.step_count;
    sys.t = params.start_time;

    let forces = AccelSet::gravity(params.G);
    let sampler = SnapshotSampler::new(&params.snapshot, sys, params.G, dt, steps);
    log::debug!(
        "simulate: {} bodies, {} steps of {} s from t = {}, intervals {:?}",
        sys.bodies.len(),
        steps,
        dt,
        sys.t,
        sampler.intervals()
    );

    let mut timelines = vec![Timeline::new(); sys.bodies.len()];
    record(sys, &sampler, 0, &mut timelines);

    let mut integrator = VerletIntegrator::new(sys, &forces);
    for step in 1..=steps {
        integrator.step(sys, &forces, dt);
        record(sys, &sampler, step, &mut timelines);
    }

    log::debug!("simulate: finished at t = {}", sys.t);
    Ok(sys
        .bodies
        .iter()
        .map(|b| b.name.clone())
        .zip(timelines)
        .collect())
}

fn record(sys: &System, sampler: &SnapshotSampler, step: u64, timelines: &mut [Timeline]) {
    for (i, (b, tl)) in sys.bodies.iter().zip(timelines.iter_mut()).enumerate() {
        if sampler.should_record(i, step) {
            tl.append(sys.t, b.x);
        }
    }
}
