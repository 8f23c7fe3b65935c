//! Dynamics model for Earth-orbiting satellites
//!
//! Combines the harmonic gravity field with optional point-mass
//! perturbations from the Sun, Moon and planets. Frame rotations and body
//! ephemerides come in through the provider traits, so the model carries no
//! ambient state: everything a propagation needs is held by the
//! [`DynamicsModel`] value, which keeps concurrent runs fully isolated.

pub mod gravity;
pub mod third_body;

pub use gravity::GravityField;
pub use third_body::{point_mass_accel, PerturbingBody};

use crate::error::OdError;
use crate::providers::{EphemerisProvider, RotationProvider};
use crate::state::StateVector;
use nalgebra::{Matrix3, Vector3};

/// Which perturbations participate, and the gravity-field truncation.
#[derive(Debug, Clone, Copy)]
pub struct PerturbationSettings {
    /// Maximum gravity degree
    pub degree: usize,

    /// Maximum gravity order (order <= degree)
    pub order: usize,

    /// Include the solar point mass
    pub sun: bool,

    /// Include the lunar point mass
    pub moon: bool,

    /// Include the eight planetary point masses
    pub planets: bool,
}

impl Default for PerturbationSettings {
    fn default() -> Self {
        Self {
            degree: 20,
            order: 20,
            sun: true,
            moon: true,
            planets: true,
        }
    }
}

impl PerturbationSettings {
    /// Gravity field only, no third bodies.
    pub fn gravity_only(degree: usize, order: usize) -> Self {
        Self {
            degree,
            order,
            sun: false,
            moon: false,
            planets: false,
        }
    }
}

/// Complete acceleration model for one satellite.
pub struct DynamicsModel {
    gravity: GravityField,
    settings: PerturbationSettings,
    rotation: Box<dyn RotationProvider>,
    ephemeris: Box<dyn EphemerisProvider>,
}

impl DynamicsModel {
    /// Assemble a model; the requested truncation is validated against the
    /// loaded coefficient tables once, here.
    pub fn new(
        gravity: GravityField,
        settings: PerturbationSettings,
        rotation: Box<dyn RotationProvider>,
        ephemeris: Box<dyn EphemerisProvider>,
    ) -> Result<Self, OdError> {
        gravity.check_degree(settings.degree, settings.order)?;
        log::debug!(
            "dynamics model: {}x{} gravity, sun={} moon={} planets={}",
            settings.degree,
            settings.order,
            settings.sun,
            settings.moon,
            settings.planets
        );
        Ok(Self {
            gravity,
            settings,
            rotation,
            ephemeris,
        })
    }

    pub fn settings(&self) -> &PerturbationSettings {
        &self.settings
    }

    /// Inertial-to-body-fixed rotation at an epoch (forwarded from the
    /// provider; the orchestrator reuses it for station geometry).
    pub fn rotation(&self, mjd_utc: f64) -> Matrix3<f64> {
        self.rotation.rotation(mjd_utc)
    }

    /// Total acceleration [m/s^2] at `mjd_utc` for inertial position `r`.
    pub fn acceleration(&self, mjd_utc: f64, r: &Vector3<f64>) -> Vector3<f64> {
        let e = self.rotation.rotation(mjd_utc);
        let mut a =
            self.gravity
                .acceleration_unchecked(r, &e, self.settings.degree, self.settings.order);

        if self.settings.sun || self.settings.moon || self.settings.planets {
            let bodies = self.ephemeris.positions(mjd_utc);

            if self.settings.sun {
                a += point_mass_accel(r, &bodies.sun, PerturbingBody::Sun.gm());
            }
            if self.settings.moon {
                a += point_mass_accel(r, &bodies.moon, PerturbingBody::Moon.gm());
            }
            if self.settings.planets {
                for body in PerturbingBody::planets() {
                    a += point_mass_accel(r, &body.position(&bodies), body.gm());
                }
            }
        }

        a
    }

    /// Gravity-gradient matrix da/dr [1/s^2] at `mjd_utc`.
    ///
    /// Third-body contributions to the gradient are orders of magnitude
    /// below the harmonic terms over one measurement interval and are not
    /// differentiated.
    pub fn gradient(&self, mjd_utc: f64, r: &Vector3<f64>) -> Matrix3<f64> {
        let e = self.rotation.rotation(mjd_utc);
        self.gravity
            .gradient_unchecked(r, &e, self.settings.degree, self.settings.order)
    }

    /// Derivative of the 6-dim state: `[v, a(t, r)]`.
    pub fn state_derivative(&self, mjd_utc: f64, y: &StateVector) -> StateVector {
        let r = Vector3::new(y[0], y[1], y[2]);
        let a = self.acceleration(mjd_utc, &r);

        let mut dy = StateVector::zeros();
        dy[0] = y[3];
        dy[1] = y[4];
        dy[2] = y[5];
        dy[3] = a.x;
        dy[4] = a.y;
        dy[5] = a.z;
        dy
    }
}
