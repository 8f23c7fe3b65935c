//! Point-mass perturbations from third bodies
//!
//! Each perturbing body contributes the classic direct-plus-indirect term:
//! the pull on the satellite minus the pull on the central body.

use crate::providers::BodyPositions;
use crate::state;
use nalgebra::Vector3;

/// Perturbational acceleration [m/s^2] due to a point mass.
///
/// `r` is the satellite position, `s` the body position relative to the
/// central body (both [m]), `gm` the body's gravitational parameter.
/// The second term removes the body's acceleration of the central body
/// itself (indirect term).
pub fn point_mass_accel(r: &Vector3<f64>, s: &Vector3<f64>, gm: f64) -> Vector3<f64> {
    let d = r - s;
    -gm * (d / d.norm().powi(3) + s / s.norm().powi(3))
}

/// A perturbing solar-system body with its DE430 gravitational parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerturbingBody {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
}

impl PerturbingBody {
    /// Gravitational parameter [m^3/s^2]
    pub fn gm(&self) -> f64 {
        match self {
            Self::Sun => state::GM_SUN,
            Self::Moon => state::GM_MOON,
            Self::Mercury => state::GM_MERCURY,
            Self::Venus => state::GM_VENUS,
            Self::Mars => state::GM_MARS,
            Self::Jupiter => state::GM_JUPITER,
            Self::Saturn => state::GM_SATURN,
            Self::Uranus => state::GM_URANUS,
            Self::Neptune => state::GM_NEPTUNE,
            Self::Pluto => state::GM_PLUTO,
        }
    }

    /// Geocentric position of this body out of an ephemeris lookup.
    pub fn position(&self, bodies: &BodyPositions) -> Vector3<f64> {
        match self {
            Self::Sun => bodies.sun,
            Self::Moon => bodies.moon,
            Self::Mercury => bodies.mercury,
            Self::Venus => bodies.venus,
            Self::Mars => bodies.mars,
            Self::Jupiter => bodies.jupiter,
            Self::Saturn => bodies.saturn,
            Self::Uranus => bodies.uranus,
            Self::Neptune => bodies.neptune,
            Self::Pluto => bodies.pluto,
        }
    }

    /// The eight planetary perturbers (everything except Sun and Moon).
    pub fn planets() -> &'static [PerturbingBody] {
        &[
            Self::Mercury,
            Self::Venus,
            Self::Mars,
            Self::Jupiter,
            Self::Saturn,
            Self::Uranus,
            Self::Neptune,
            Self::Pluto,
        ]
    }
}
