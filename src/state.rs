//! State representations and physical constants
//!
//! The estimation state is an inertial Cartesian position/velocity pair in
//! meters and meters per second, kept as a single 6-vector so the integrator
//! and the estimator share one representation.

use nalgebra::{Vector3, Vector6};

/// Inertial position (m) and velocity (m/s), stacked position-first.
pub type StateVector = Vector6<f64>;

/// Orbital state tagged with its epoch.
#[derive(Debug, Clone)]
pub struct OrbitalState {
    /// Epoch as Modified Julian Date (UTC)
    pub epoch_mjd: f64,

    /// Position (m) and velocity (m/s) in the inertial frame
    pub y: StateVector,
}

impl OrbitalState {
    pub fn new(epoch_mjd: f64, y: StateVector) -> Self {
        Self { epoch_mjd, y }
    }

    /// Create a state from separate position and velocity vectors
    pub fn from_position_velocity(
        epoch_mjd: f64,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
    ) -> Self {
        let mut y = StateVector::zeros();
        y.fixed_rows_mut::<3>(0).copy_from(&position);
        y.fixed_rows_mut::<3>(3).copy_from(&velocity);
        Self { epoch_mjd, y }
    }

    /// Position component (m)
    pub fn position(&self) -> Vector3<f64> {
        self.y.fixed_rows::<3>(0).into()
    }

    /// Velocity component (m/s)
    pub fn velocity(&self) -> Vector3<f64> {
        self.y.fixed_rows::<3>(3).into()
    }

    /// Distance from the central body center (m)
    pub fn radius(&self) -> f64 {
        self.position().norm()
    }
}

// Physical constants (DE430 / GGM03S conventions of the reference models)

/// Modified Julian Date of the J2000 epoch
pub const MJD_J2000: f64 = 51544.5;

/// Seconds per day
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// Earth gravitational parameter [m^3/s^2] (GGM03S)
pub const GM_EARTH: f64 = 398600.4415e9;

/// Earth equatorial radius [m] (GGM03S)
pub const R_EARTH: f64 = 6378.1363e3;

/// Earth flattening (WGS-84)
pub const F_EARTH: f64 = 1.0 / 298.257223563;

/// Sun gravitational parameter [m^3/s^2] (DE430)
pub const GM_SUN: f64 = 132712440041.939400e9;

/// Moon gravitational parameter [m^3/s^2] (DE430)
pub const GM_MOON: f64 = GM_EARTH / 81.30056907419062;

/// Mercury gravitational parameter [m^3/s^2] (DE430)
pub const GM_MERCURY: f64 = 22031.780000e9;

/// Venus gravitational parameter [m^3/s^2] (DE430)
pub const GM_VENUS: f64 = 324858.592000e9;

/// Mars gravitational parameter [m^3/s^2] (DE430)
pub const GM_MARS: f64 = 42828.375214e9;

/// Jupiter gravitational parameter [m^3/s^2] (DE430)
pub const GM_JUPITER: f64 = 126712764.800000e9;

/// Saturn gravitational parameter [m^3/s^2] (DE430)
pub const GM_SATURN: f64 = 37940585.200000e9;

/// Uranus gravitational parameter [m^3/s^2] (DE430)
pub const GM_URANUS: f64 = 5794548.600000e9;

/// Neptune gravitational parameter [m^3/s^2] (DE430)
pub const GM_NEPTUNE: f64 = 6836527.100580e9;

/// Pluto gravitational parameter [m^3/s^2] (DE430)
pub const GM_PLUTO: f64 = 977.000000000000e9;
