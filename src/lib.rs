//! Satellite orbit determination from ground-based radar tracking
//!
//! Estimates a satellite's position and velocity from azimuth, elevation
//! and range observations using an extended Kalman filter over a
//! high-fidelity dynamics model.
//!
//! # Architecture
//!
//! - [`forces`] - harmonic gravity field plus point-mass third-body
//!   perturbations, assembled into a [`forces::DynamicsModel`]
//! - [`integrator`] - variable-order variable-step multistep propagation
//!   ([`integrator::ShampineGordon`])
//! - [`variational`] - state transition matrix via the variational
//!   equations, integrated as a 42-dim augmented state
//! - [`estimation`] - Kalman time and measurement updates
//! - [`observation`] - station geometry and the radar observables
//! - [`determination`] - the filter driver ([`determination::OrbitDeterminator`])
//! - [`providers`] - injection seams for Earth rotation and ephemerides
//!
//! Frame rotations and planetary positions are deliberately behind traits:
//! the built-in GMST rotation and empty ephemeris serve tests and the demo,
//! while production users plug in their own Earth-orientation and ephemeris
//! sources.

pub mod determination;
pub mod error;
pub mod estimation;
pub mod forces;
pub mod integrator;
pub mod linalg;
pub mod observation;
pub mod providers;
pub mod state;
pub mod variational;

pub use determination::{DeterminationResult, OrbitDeterminator};
pub use error::OdError;
pub use forces::{DynamicsModel, GravityField, PerturbationSettings};
pub use integrator::{IntegrationStatus, ShampineGordon};
pub use observation::{Observation, Station};
pub use state::OrbitalState;
