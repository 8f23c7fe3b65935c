//! External collaborator seams: reference-frame rotation and ephemerides
//!
//! The dynamics model needs two things it does not compute itself: the
//! inertial-to-body-fixed rotation at an epoch, and the geocentric positions
//! of the perturbing bodies. Both are injected behind traits so the core
//! stays independent of any particular Earth-orientation or ephemeris
//! implementation.
//!
//! The implementations supplied here are deliberately thin: an identity
//! rotation and a Greenwich-mean-sidereal-time spin for tests and the demo,
//! and a zero ephemeris for gravity-only runs. Full precession/nutation/
//! polar-motion chains and Chebyshev ephemerides plug in from outside.

use crate::linalg::rot_z;
use crate::state::{MJD_J2000, SECONDS_PER_DAY};
use nalgebra::{Matrix3, Vector3};

/// Inertial-to-body-fixed rotation at a given epoch.
pub trait RotationProvider: Send + Sync {
    /// 3x3 orthogonal matrix transforming inertial to body-fixed coordinates
    fn rotation(&self, mjd_utc: f64) -> Matrix3<f64>;
}

/// Geocentric positions [m] of the perturbing bodies at a given epoch.
#[derive(Debug, Clone, Default)]
pub struct BodyPositions {
    pub sun: Vector3<f64>,
    pub moon: Vector3<f64>,
    pub mercury: Vector3<f64>,
    pub venus: Vector3<f64>,
    pub mars: Vector3<f64>,
    pub jupiter: Vector3<f64>,
    pub saturn: Vector3<f64>,
    pub uranus: Vector3<f64>,
    pub neptune: Vector3<f64>,
    pub pluto: Vector3<f64>,
}

/// Planetary/lunar/solar position source.
pub trait EphemerisProvider: Send + Sync {
    fn positions(&self, mjd_utc: f64) -> BodyPositions;
}

/// Identity rotation: treats the inertial and body-fixed frames as aligned.
///
/// Useful for unit tests and for evaluating the gravity field in its own
/// body-fixed frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRotation;

impl RotationProvider for IdentityRotation {
    fn rotation(&self, _mjd_utc: f64) -> Matrix3<f64> {
        Matrix3::identity()
    }
}

/// Earth rotation by Greenwich mean sidereal time only.
///
/// Ignores precession, nutation and polar motion; adequate for the demo
/// scenario and for kilometer-level geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct GmstRotation;

impl RotationProvider for GmstRotation {
    fn rotation(&self, mjd_utc: f64) -> Matrix3<f64> {
        rot_z(gmst(mjd_utc))
    }
}

/// Zero ephemeris: every body sits at the geocenter.
///
/// Only valid with all point-mass perturbations disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBodies;

impl EphemerisProvider for NoBodies {
    fn positions(&self, _mjd_utc: f64) -> BodyPositions {
        BodyPositions::default()
    }
}

/// Greenwich mean sidereal time [rad], 0..2pi.
pub fn gmst(mjd_ut1: f64) -> f64 {
    let mjd_0 = mjd_ut1.floor();
    let ut1 = SECONDS_PER_DAY * (mjd_ut1 - mjd_0); // [s]
    let t0 = (mjd_0 - MJD_J2000) / 36525.0;
    let t = (mjd_ut1 - MJD_J2000) / 36525.0;

    let gmst_secs = 24110.54841
        + 8640184.812866 * t0
        + 1.002737909350795 * ut1
        + (0.093104 - 6.2e-6 * t) * t * t;

    let frac = (gmst_secs / SECONDS_PER_DAY).rem_euclid(1.0);
    2.0 * std::f64::consts::PI * frac
}
