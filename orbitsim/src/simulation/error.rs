//! Errors raised by the simulation core.
//!
//! Both kinds are raised before anything is mutated. Coincident bodies and
//! unreadable history are deliberately not errors (see `forces` and
//! `timeline`).

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("body {name:?} not found")]
    NotFound { name: String },
}
