pub mod simulation;
pub mod configuration;
pub mod storage;

pub use simulation::error::SimError;
pub use simulation::states::{Body, BodyState, LiveStates, System, NVec3};
pub use simulation::params::{Parameters, G_KM};
pub use simulation::forces::{Acceleration, AccelSet, NewtonianGravity, gravitational_accelerations};
pub use simulation::integrator::{VerletIntegrator, verlet_step};
pub use simulation::sampler::{SnapshotPolicy, SnapshotSampler, orbital_period, adaptive_interval};
pub use simulation::timeline::{Timeline, Trajectories};
pub use simulation::engine::simulate;
pub use simulation::maneuver::{Maneuver, HistoryPolicy, apply_maneuver, apply_maneuver_live};
pub use simulation::continuation::{ChunkPlan, StartPoint, reconcile, run_chunks};
pub use simulation::scenario::Scenario;
pub use configuration::config::{ScenarioConfig, ParametersConfig, BodyConfig, ManeuverConfig, ContinuationConfig};
pub use storage::store::{TimelineStore, MemoryStore, DirectoryStore, StoreError, load_history, load_states, store_history, store_states};
