//! Ground-station observations and topocentric geometry
//!
//! A radar station measures azimuth, elevation and slant range to the
//! satellite. This module holds the observation record, the station model
//! (geodetic site plus per-channel noise), and the geometry pieces the
//! filter needs: the WGS-84 site position, the local east/north/zenith
//! basis, and the angle observables with their partials for the
//! measurement-update Jacobian.

use crate::error::OdError;
use crate::linalg::{rot_y, rot_z};
use crate::state::{F_EARTH, R_EARTH};
use nalgebra::{Matrix3, Vector3};
use std::f64::consts::PI;

/// One radar observation of the satellite.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    /// Observation epoch, MJD UTC
    pub mjd_utc: f64,

    /// Azimuth [rad], measured from north through east, 0..2pi
    pub azimuth: f64,

    /// Elevation above the local horizon [rad]
    pub elevation: f64,

    /// Slant range [m]
    pub range: f64,
}

/// A tracking station: geodetic site and measurement noise.
#[derive(Debug, Clone, Copy)]
pub struct Station {
    /// Geodetic longitude [rad], east positive
    pub lon: f64,

    /// Geodetic latitude [rad]
    pub lat: f64,

    /// Height above the ellipsoid [m]
    pub alt: f64,

    /// Azimuth noise, 1-sigma [rad]
    pub sigma_az: f64,

    /// Elevation noise, 1-sigma [rad]
    pub sigma_el: f64,

    /// Range noise, 1-sigma [m]
    pub sigma_range: f64,
}

impl Station {
    /// Build a station, validating the geodetic coordinates and sigmas.
    pub fn new(
        lon: f64,
        lat: f64,
        alt: f64,
        sigma_az: f64,
        sigma_el: f64,
        sigma_range: f64,
    ) -> Result<Self, OdError> {
        if !(-PI / 2.0..=PI / 2.0).contains(&lat) {
            return Err(OdError::InvalidArgument(format!(
                "latitude {} rad outside [-pi/2, pi/2]",
                lat
            )));
        }
        if sigma_az <= 0.0 || sigma_el <= 0.0 || sigma_range <= 0.0 {
            return Err(OdError::InvalidArgument(
                "measurement sigmas must be positive".into(),
            ));
        }
        Ok(Self {
            lon,
            lat,
            alt,
            sigma_az,
            sigma_el,
            sigma_range,
        })
    }

    /// Body-fixed Cartesian site position [m] on the WGS-84 ellipsoid.
    pub fn position_ecef(&self) -> Vector3<f64> {
        let e2 = F_EARTH * (2.0 - F_EARTH);
        let (sin_lat, cos_lat) = self.lat.sin_cos();
        let (sin_lon, cos_lon) = self.lon.sin_cos();

        // Radius of curvature in the prime vertical
        let n = R_EARTH / (1.0 - e2 * sin_lat * sin_lat).sqrt();

        Vector3::new(
            (n + self.alt) * cos_lat * cos_lon,
            (n + self.alt) * cos_lat * sin_lon,
            ((1.0 - e2) * n + self.alt) * sin_lat,
        )
    }

    /// Body-fixed to local-tangent rotation; rows are the east, north and
    /// zenith unit vectors at the site.
    pub fn enz_matrix(&self) -> Matrix3<f64> {
        let m = rot_y(-self.lat) * rot_z(self.lon);
        // Rows of m are (zenith, east, north); cycle them to (E, N, Z).
        Matrix3::from_rows(&[
            m.row(1).clone_owned(),
            m.row(2).clone_owned(),
            m.row(0).clone_owned(),
        ])
    }
}

/// Azimuth/elevation of a topocentric east/north/zenith vector `s`, with the
/// partials of both angles w.r.t. `s` for the measurement Jacobian.
///
/// Azimuth is wrapped to [0, 2pi). Exactly on the zenith axis the azimuth is
/// undefined; it is reported as 0 with zero partials for both angles, so a
/// zenith observation contributes nothing through the angle channels.
pub fn azimuth_elevation(s: &Vector3<f64>) -> (f64, f64, Vector3<f64>, Vector3<f64>) {
    let rho = s.x.hypot(s.y);
    if rho == 0.0 {
        let el = if s.z >= 0.0 { PI / 2.0 } else { -PI / 2.0 };
        return (0.0, el, Vector3::zeros(), Vector3::zeros());
    }

    let mut az = s.x.atan2(s.y);
    if az < 0.0 {
        az += 2.0 * PI;
    }
    let el = (s.z / rho).atan();

    let daz_ds = Vector3::new(s.y, -s.x, 0.0) / (rho * rho);
    let del_ds = Vector3::new(-s.x * s.z / rho, -s.y * s.z / rho, rho) / s.dot(s);

    (az, el, daz_ds, del_ds)
}
