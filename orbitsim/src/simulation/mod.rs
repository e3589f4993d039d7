pub mod error;
pub mod states;
pub mod params;
pub mod forces;
pub mod integrator;
pub mod sampler;
pub mod timeline;
pub mod engine;
pub mod maneuver;
pub mod continuation;
pub mod scenario;
