//! Extended Kalman filter primitives
//!
//! Two small, dimension-checked building blocks: the covariance time update
//! through a state transition matrix, and the measurement update for a batch
//! of observations with independent noise. The orbit-determination driver
//! applies the measurement update one scalar component at a time, which
//! keeps the innovation covariance a 1x1 inversion in practice; the general
//! form here still supports vector measurements.

use crate::error::OdError;
use crate::linalg::gauss_jordan_inverse;
use nalgebra::{DMatrix, DVector};

/// Propagate the covariance across a time interval.
///
/// `P <- Phi P Phi^T + Q*dt` where `Phi` is the state transition matrix over
/// the interval and `q` the process-noise rate matrix. `q` may be `None` for
/// a purely deterministic model.
pub fn time_update(
    p: &DMatrix<f64>,
    phi: &DMatrix<f64>,
    q: Option<&DMatrix<f64>>,
    dt: f64,
) -> Result<DMatrix<f64>, OdError> {
    let n = p.nrows();
    if p.ncols() != n {
        return Err(OdError::DimensionMismatch {
            expected: (n, n),
            found: (p.nrows(), p.ncols()),
        });
    }
    if phi.nrows() != n || phi.ncols() != n {
        return Err(OdError::DimensionMismatch {
            expected: (n, n),
            found: (phi.nrows(), phi.ncols()),
        });
    }

    let mut p_new = phi * p * phi.transpose();
    if let Some(q) = q {
        if q.nrows() != n || q.ncols() != n {
            return Err(OdError::DimensionMismatch {
                expected: (n, n),
                found: (q.nrows(), q.ncols()),
            });
        }
        p_new += q * dt;
    }
    Ok(p_new)
}

/// Result of one measurement update: the gain that was applied.
#[derive(Debug, Clone)]
pub struct MeasurementUpdate {
    /// Kalman gain, n x m
    pub gain: DMatrix<f64>,

    /// Pre-update residual `z - g`
    pub innovation: DVector<f64>,
}

/// Incorporate a measurement batch into state and covariance, in place.
///
/// `z` is the measured value, `g` the value predicted from the current
/// state, `sigma` the per-component measurement standard deviations
/// (independent noise, so `R = diag(sigma^2)`), and `h` the m x n
/// measurement partials `dg/dx`.
///
/// The gain is `K = P H^T (R + H P H^T)^-1`; the state moves by `K (z - g)`
/// and the covariance becomes `(I - K H) P`. A non-invertible innovation
/// covariance is reported as a distinct error so the caller can tell a
/// geometry degeneracy from a generic singular matrix.
pub fn measurement_update(
    x: &mut DVector<f64>,
    z: &DVector<f64>,
    g: &DVector<f64>,
    sigma: &DVector<f64>,
    h: &DMatrix<f64>,
    p: &mut DMatrix<f64>,
) -> Result<MeasurementUpdate, OdError> {
    let n = x.len();
    let m = z.len();

    if g.len() != m || sigma.len() != m {
        return Err(OdError::DimensionMismatch {
            expected: (m, 1),
            found: (g.len().max(sigma.len()), 1),
        });
    }
    if h.nrows() != m || h.ncols() != n {
        return Err(OdError::DimensionMismatch {
            expected: (m, n),
            found: (h.nrows(), h.ncols()),
        });
    }
    if p.nrows() != n || p.ncols() != n {
        return Err(OdError::DimensionMismatch {
            expected: (n, n),
            found: (p.nrows(), p.ncols()),
        });
    }

    // R + H P H^T, with R diagonal from the supplied sigmas
    let mut s = h * &*p * h.transpose();
    for i in 0..m {
        s[(i, i)] += sigma[i] * sigma[i];
    }
    let s_inv = gauss_jordan_inverse(&s).map_err(|e| match e {
        OdError::SingularMatrix => OdError::SingularInnovationCovariance,
        other => other,
    })?;

    let gain = &*p * h.transpose() * s_inv;
    let innovation = z - g;

    *x += &gain * &innovation;
    let identity = DMatrix::identity(n, n);
    *p = (identity - &gain * h) * &*p;

    Ok(MeasurementUpdate { gain, innovation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_time_update_identity_transition() {
        let p = DMatrix::from_diagonal(&DVector::from_vec(vec![4.0, 9.0]));
        let phi = DMatrix::identity(2, 2);
        let q = DMatrix::identity(2, 2);

        let p_new = time_update(&p, &phi, Some(&q), 10.0).unwrap();
        assert_abs_diff_eq!(p_new[(0, 0)], 14.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p_new[(1, 1)], 19.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p_new[(0, 1)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_time_update_dimension_mismatch() {
        let p = DMatrix::identity(2, 2);
        let phi = DMatrix::identity(3, 3);
        assert!(matches!(
            time_update(&p, &phi, None, 1.0),
            Err(OdError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_scalar_gain_reference() {
        // P = 1, sigma = 0.1, direct observation: K = 1/(1 + 0.01)
        let mut x = DVector::from_vec(vec![0.0]);
        let z = DVector::from_vec(vec![1.0]);
        let g = DVector::from_vec(vec![0.0]);
        let sigma = DVector::from_vec(vec![0.1]);
        let h = DMatrix::from_vec(1, 1, vec![1.0]);
        let mut p = DMatrix::from_vec(1, 1, vec![1.0]);

        let upd = measurement_update(&mut x, &z, &g, &sigma, &h, &mut p).unwrap();
        assert_abs_diff_eq!(upd.gain[(0, 0)], 1.0 / 1.01, epsilon = 1e-12);
        assert_abs_diff_eq!(x[0], 1.0 / 1.01, epsilon = 1e-12);
        assert_abs_diff_eq!(p[(0, 0)], 0.01 / 1.01, epsilon = 1e-12);
    }

    #[test]
    fn test_update_never_inflates_observed_variance() {
        let mut x = DVector::zeros(2);
        let z = DVector::from_vec(vec![2.0]);
        let g = DVector::from_vec(vec![0.0]);
        let sigma = DVector::from_vec(vec![0.5]);
        let h = DMatrix::from_vec(1, 2, vec![1.0, 0.0]);
        let mut p = DMatrix::from_diagonal(&DVector::from_vec(vec![3.0, 7.0]));
        let p_before = p.clone();

        measurement_update(&mut x, &z, &g, &sigma, &h, &mut p).unwrap();
        assert!(p[(0, 0)] < p_before[(0, 0)]);
        // The unobserved component is untouched by this geometry.
        assert_abs_diff_eq!(p[(1, 1)], p_before[(1, 1)], epsilon = 1e-12);
    }

    #[test]
    fn test_singular_innovation_reported() {
        // Zero noise on a direction the covariance has collapsed to zero in:
        // the innovation covariance is exactly singular.
        let mut x = DVector::zeros(1);
        let z = DVector::from_vec(vec![1.0]);
        let g = DVector::from_vec(vec![0.0]);
        let sigma = DVector::from_vec(vec![0.0]);
        let h = DMatrix::from_vec(1, 1, vec![1.0]);
        let mut p = DMatrix::from_vec(1, 1, vec![0.0]);

        assert!(matches!(
            measurement_update(&mut x, &z, &g, &sigma, &h, &mut p),
            Err(OdError::SingularInnovationCovariance)
        ));
    }

    #[test]
    fn test_measurement_dimension_mismatch() {
        let mut x = DVector::zeros(2);
        let z = DVector::from_vec(vec![1.0]);
        let g = DVector::from_vec(vec![0.0]);
        let sigma = DVector::from_vec(vec![0.1]);
        let h = DMatrix::from_vec(1, 3, vec![1.0, 0.0, 0.0]); // wrong n
        let mut p = DMatrix::identity(2, 2);

        assert!(matches!(
            measurement_update(&mut x, &z, &g, &sigma, &h, &mut p),
            Err(OdError::DimensionMismatch { .. })
        ));
    }
}
