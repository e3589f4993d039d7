use std::path::PathBuf;

use approx::assert_abs_diff_eq;

use orbitsim::configuration::config::ScenarioConfig;
use orbitsim::simulation::continuation::StartPoint;
use orbitsim::simulation::error::SimError;
use orbitsim::simulation::maneuver::HistoryPolicy;
use orbitsim::simulation::sampler::SnapshotPolicy;
use orbitsim::simulation::scenario::Scenario;
use orbitsim::simulation::states::{BodyState, LiveStates, NVec3};
use orbitsim::simulation::timeline::{Timeline, Trajectories};
use orbitsim::storage::store::{
    load_history, load_states, store_history, store_states, DirectoryStore, MemoryStore, StoreError, TimelineStore,
};

const EARTH_MOON: &str = r#"
parameters:
  time_step: 60.0
  step_count: 1000
  start_time: 0.0

sampling:
  policy: "fixed"
  interval: 52

bodies:
  - name: "Earth"
    mass: 5.972e24
    position: [ 0.0, 0.0, 0.0 ]
    velocity: [ 0.0, 29.78, 0.0 ]
  - name: "Moon"
    mass: 7.34767309e22
    position: [ 384400.0, 0.0, 0.0 ]
    velocity: [ 0.0, 1.022, 0.0 ]
"#;

fn build(yaml: &str) -> Result<Scenario, SimError> {
    Scenario::build_scenario(ScenarioConfig::from_yaml_str(yaml).unwrap())
}

/// Earth–Moon without a start time, so runs resume from the store
fn resumable() -> String {
    EARTH_MOON.replace("  start_time: 0.0\n", "")
}

/// Build from `yaml`, restore whatever `store` holds, run and persist
fn run_through_store(yaml: &str, store: &mut MemoryStore) -> Result<Trajectories, SimError> {
    let mut scenario = build(yaml)?;
    let names: Vec<String> = scenario.system.bodies.iter().map(|b| b.name.clone()).collect();
    let history = load_history(&*store, names.iter().map(String::as_str)).unwrap();
    let states = load_states(&*store, names.iter().map(String::as_str)).unwrap();
    scenario.restore_states(&states)?;
    let out = scenario.execute(history)?;
    store_history(store, &out).unwrap();
    store_states(store, &scenario.system).unwrap();
    Ok(out)
}

/// Fresh, empty directory under the system temp dir
fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("orbitsim-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

// ==================================================================================
// Configuration
// ==================================================================================

#[test]
fn yaml_defaults_fill_in() {
    let cfg = ScenarioConfig::from_yaml_str(
        r#"
parameters:
  step_count: 10
bodies:
  - { name: "Earth", mass: 5.972e24, position: [0, 0, 0], velocity: [0, 0, 0] }
"#,
    )
    .unwrap();
    assert_eq!(cfg.parameters.time_step, 60.0);
    assert_eq!(cfg.parameters.G, 6.67430e-20);
    assert!(cfg.parameters.persist_result);
    assert_eq!(cfg.parameters.start_time, None);
    assert_eq!(cfg.sampling, SnapshotPolicy::Fixed { interval: 52 });
    assert_eq!(cfg.history_policy, HistoryPolicy::OverwriteOnOverlap);
    assert!(cfg.maneuvers.is_empty());
}

#[test]
fn yaml_adaptive_policy_and_quarters() {
    let scenario = build(
        r#"
parameters:
  step_count: 10
sampling:
  policy: "adaptive"
  max_interval: 50
continuation:
  chunk_days: 90
  chunk_count: 4
history_policy: "truncate_on_maneuver"
bodies:
  - { name: "Earth", mass: 5.972e24, position: [0, 0, 0], velocity: [0, 0, 0] }
"#,
    )
    .unwrap();
    assert_eq!(
        scenario.parameters.snapshot,
        SnapshotPolicy::Adaptive {
            min_interval: 5,
            max_interval: 50,
            snapshots_per_orbit: 100.0
        }
    );
    assert_eq!(scenario.plan.chunk_steps, 129_600);
    assert_eq!(scenario.plan.chunk_count, 4);
    assert_eq!(scenario.history_policy, HistoryPolicy::TruncateOnManeuver);
    assert_eq!(scenario.start_point(), StartPoint::Resume);
}

#[test]
fn short_vectors_are_invalid_input() {
    let yaml = EARTH_MOON.replace("[ 384400.0, 0.0, 0.0 ]", "[ 384400.0, 0.0 ]");
    assert!(matches!(build(&yaml), Err(SimError::InvalidInput(_))));
}

#[test]
fn maneuver_target_must_exist() {
    let yaml = format!(
        "{EARTH_MOON}\nmaneuvers:\n  - {{ target: \"Mars\", delta_v: [0, 1, 0] }}\n"
    );
    assert_eq!(
        build(&yaml).unwrap_err(),
        SimError::NotFound { name: "Mars".into() }
    );
}

#[test]
fn latest_maneuver_time_sets_start_without_explicit_time() {
    let yaml = EARTH_MOON.replace("  start_time: 0.0\n", "")
        + "\nmaneuvers:\n  - { target: \"Moon\", time: 600.0, delta_v: [0, 0.1, 0] }\n  - { target: \"Earth\", delta_v: [0, 0, 0] }\n";
    let scenario = build(&yaml).unwrap();
    assert_eq!(scenario.start_point(), StartPoint::Live(600.0));
}

#[test]
fn maneuvers_at_different_times_are_rejected() {
    let yaml = resumable()
        + "\nmaneuvers:\n  - { target: \"Moon\", time: 3120.0, delta_v: [0, 0.1, 0] }\n  - { target: \"Earth\", time: 60000.0, delta_v: [0, 0, 0] }\n";
    assert!(matches!(build(&yaml), Err(SimError::InvalidInput(_))));

    let yaml = EARTH_MOON.to_owned() + "\nmaneuvers:\n  - { target: \"Moon\", time: 600.0, delta_v: [0, 0.1, 0] }\n";
    assert!(matches!(build(&yaml), Err(SimError::InvalidInput(_))));
}

// ==================================================================================
// Execution
// ==================================================================================

#[test]
fn execute_earth_moon_end_to_end() {
    let mut scenario = build(EARTH_MOON).unwrap();
    let out = scenario.execute(Trajectories::new()).unwrap();

    assert_eq!(scenario.system.t, 60000.0);
    for name in ["Earth", "Moon"] {
        let tl = out.get(name).unwrap();
        assert!(tl.get(0.0).is_some());
        assert!(tl.get(60000.0).is_some());
    }
}

#[test]
fn execute_with_maneuver_rewinds_and_reruns() {
    let mut first = build(EARTH_MOON).unwrap();
    let history = first.execute(Trajectories::new()).unwrap();
    let stale_count = history.get("Moon").unwrap().len();

    let yaml = EARTH_MOON
        .replace("start_time: 0.0", "start_time: 31200.0")
        .replace("step_count: 1000", "step_count: 100")
        + "\nhistory_policy: \"truncate_on_maneuver\"\nmaneuvers:\n  - { target: \"Moon\", time: 31200.0, delta_v: [0, 0.05, 0] }\n";
    let mut second = build(&yaml).unwrap();
    let merged = second.execute(history).unwrap();

    let moon = merged.get("Moon").unwrap();
    // 0..31200 kept (31200 = 52 * 600), later samples dropped, 31200..37200 re-simulated
    assert_eq!(moon.last().map(|(t, _)| t), Some(37200.0));
    assert!(moon.len() < stale_count);
    assert!(moon.get(60000.0).is_none());
}

#[test]
fn maneuver_start_keeps_recorded_samples_at_start() {
    let mut first = build(EARTH_MOON).unwrap();
    let history = first.execute(Trajectories::new()).unwrap();

    let yaml = resumable()
        + "\nmaneuvers:\n  - { target: \"Moon\", time: 31200.0, delta_v: [0, 0.05, 0] }\n  - { target: \"Earth\", delta_v: [0, 0, 0] }\n";
    let mut second = build(&yaml).unwrap();
    assert_eq!(second.start_point(), StartPoint::Live(31200.0));
    let merged = second.execute(history.clone()).unwrap();

    // the first new sample is the recorded state the run started from
    for name in ["Earth", "Moon"] {
        assert_eq!(merged.get(name).unwrap().get(31200.0), history.get(name).unwrap().get(31200.0));
    }
    assert_eq!(second.system.t, 31200.0 + 60000.0);
}

#[test]
fn timed_maneuver_without_recorded_state_is_rejected() {
    let yaml = resumable() + "\nmaneuvers:\n  - { target: \"Moon\", time: 30000.0, delta_v: [0, 0.05, 0] }\n";
    let mut scenario = build(&yaml).unwrap();
    let before = scenario.system.bodies.clone();
    assert!(matches!(scenario.execute(Trajectories::new()), Err(SimError::InvalidInput(_))));
    assert_eq!(scenario.system.bodies, before);
}

#[test]
fn resume_without_live_state_is_rejected() {
    let mut first = build(EARTH_MOON).unwrap();
    let history = first.execute(Trajectories::new()).unwrap();

    let mut second = build(&resumable()).unwrap();
    assert_eq!(second.start_point(), StartPoint::Resume);
    assert!(matches!(second.execute(history), Err(SimError::InvalidInput(_))));
}

#[test]
fn resumed_run_continues_from_stored_end_state() {
    let mut store = MemoryStore::new();
    let h1 = run_through_store(&resumable(), &mut store).unwrap();
    let h2 = run_through_store(&resumable(), &mut store).unwrap();

    let moon1 = h1.get("Moon").unwrap();
    let moon2 = h2.get("Moon").unwrap();
    assert_eq!(moon2.get(60000.0), moon1.get(60000.0));
    assert_eq!(moon2.get(3120.0), moon1.get(3120.0));
    assert_eq!(moon2.last().map(|(t, _)| t), Some(120000.0));

    // same end point as one uninterrupted run of twice the length
    let mut single = build(&resumable().replace("step_count: 1000", "step_count: 2000")).unwrap();
    let whole = single.execute(Trajectories::new()).unwrap();
    let end = whole.get("Moon").unwrap().get(120000.0).unwrap();
    assert_abs_diff_eq!(*moon2.get(120000.0).unwrap(), *end, epsilon = 1e-6);
}

#[test]
fn restore_requires_one_shared_time_for_every_body() {
    let moon = BodyState {
        t: 600.0,
        position: NVec3::new(384400.0, 600.0, 0.0),
        velocity: NVec3::new(0.0, 1.0, 0.0),
    };
    let mut scenario = build(EARTH_MOON).unwrap();

    let partial: LiveStates = [("Moon".to_owned(), moon)].into_iter().collect();
    assert!(matches!(scenario.restore_states(&partial), Err(SimError::InvalidInput(_))));

    let earth = BodyState { t: 660.0, ..moon };
    let mismatched: LiveStates = [("Moon".to_owned(), moon), ("Earth".to_owned(), earth)].into_iter().collect();
    assert!(matches!(scenario.restore_states(&mismatched), Err(SimError::InvalidInput(_))));
    assert_eq!(scenario.live_epoch, None);

    let earth = BodyState { t: 600.0, ..earth };
    let shared: LiveStates = [("Moon".to_owned(), moon), ("Earth".to_owned(), earth)].into_iter().collect();
    scenario.restore_states(&shared).unwrap();
    assert_eq!(scenario.live_epoch, Some(600.0));
    assert_eq!(scenario.system.t, 600.0);
    assert_eq!(scenario.system.body("Moon").unwrap().x, moon.position);

    scenario.restore_states(&LiveStates::new()).unwrap();
    assert_eq!(scenario.live_epoch, Some(600.0));
}

// ==================================================================================
// Storage
// ==================================================================================

#[test]
fn memory_store_round_trip() {
    let mut store = MemoryStore::new();
    let tl: Timeline = [(0.0, NVec3::new(1.0, 2.0, 3.0)), (60.0, NVec3::new(4.0, 5.0, 6.0))]
        .into_iter()
        .collect();
    store.store_timeline("Moon", &tl).unwrap();
    assert_eq!(store.blob("Moon"), Some(r#"{"0.0":[1.0,2.0,3.0],"60.0":[4.0,5.0,6.0]}"#));
    assert_eq!(store.load_timeline("Moon").unwrap(), Some(tl));
    assert_eq!(store.load_timeline("Earth").unwrap(), None);
}

#[test]
fn malformed_history_loads_as_empty() {
    let mut store = MemoryStore::new();
    store.put_blob("Moon", "{ definitely not json");
    assert!(matches!(store.load_timeline("Moon"), Err(StoreError::Malformed { .. })));

    let history = load_history(&store, ["Moon", "Earth"]).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.get("Moon").unwrap().is_empty());
    assert!(history.get("Earth").unwrap().is_empty());
}

#[test]
fn malformed_live_state_is_skipped() {
    let mut store = MemoryStore::new();
    store.put_state_blob("Moon", "{\"t\": 1.0}");
    assert!(matches!(store.load_state("Moon"), Err(StoreError::Malformed { .. })));
    assert!(load_states(&store, ["Moon", "Earth"]).unwrap().is_empty());
}

#[test]
fn directory_store_round_trip() {
    let dir = scratch_dir("roundtrip");
    let mut store = DirectoryStore::open(&dir).unwrap();

    let mut scenario = build(EARTH_MOON).unwrap();
    let out = scenario.execute(Trajectories::new()).unwrap();
    store_history(&mut store, &out).unwrap();

    store_states(&mut store, &scenario.system).unwrap();

    assert!(dir.join("Moon.json").is_file());
    assert!(dir.join("state").join("Moon.json").is_file());
    let reloaded = load_history(&store, ["Earth", "Moon"]).unwrap();
    assert_eq!(reloaded, out);
    let states = load_states(&store, ["Earth", "Moon"]).unwrap();
    assert_eq!(states, scenario.system.live_states());
    assert_eq!(states["Moon"].t, 60000.0);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn directory_store_rejects_path_like_names() {
    let dir = scratch_dir("names");
    let mut store = DirectoryStore::open(&dir).unwrap();
    let err = store.store_timeline("../escape", &Timeline::new()).unwrap_err();
    assert!(matches!(err, StoreError::InvalidName(_)));
    assert_eq!(store.load_timeline("Nobody").unwrap(), None);
    std::fs::remove_dir_all(&dir).unwrap();
}
