//! Harmonic gravity field of the central body
//!
//! Evaluates the acceleration from a normalized spherical-harmonic expansion
//! of Earth's gravity potential, and its 3x3 gradient by central finite
//! differences. Coefficient tables are loaded once by the caller and injected
//! here; the field itself is read-only for the lifetime of a run.

use crate::error::OdError;
use nalgebra::{DMatrix, Matrix3, Vector3};

/// Normalized spherical-harmonic gravity model.
///
/// `cnm`/`snm` are square (N+1)x(N+1) tables of normalized coefficients,
/// indexed `[degree, order]`.
pub struct GravityField {
    /// Gravitational parameter [m^3/s^2]
    gm: f64,

    /// Reference radius of the expansion [m]
    r_ref: f64,

    cnm: DMatrix<f64>,
    snm: DMatrix<f64>,
}

impl GravityField {
    /// Build a field from coefficient tables.
    ///
    /// The tables must be square and of equal size; entry `[n, m]` holds the
    /// normalized coefficient of degree n, order m.
    pub fn new(
        gm: f64,
        r_ref: f64,
        cnm: DMatrix<f64>,
        snm: DMatrix<f64>,
    ) -> Result<Self, OdError> {
        if cnm.nrows() != cnm.ncols() || snm.nrows() != snm.ncols() {
            return Err(OdError::InvalidArgument(
                "gravity coefficient tables must be square".into(),
            ));
        }
        if cnm.shape() != snm.shape() {
            return Err(OdError::DimensionMismatch {
                expected: cnm.shape(),
                found: snm.shape(),
            });
        }
        if cnm.nrows() == 0 {
            return Err(OdError::InvalidArgument(
                "gravity coefficient tables are empty".into(),
            ));
        }
        Ok(Self {
            gm,
            r_ref,
            cnm,
            snm,
        })
    }

    /// Pure point-mass field (degree/order 0).
    pub fn point_mass(gm: f64, r_ref: f64) -> Self {
        let mut cnm = DMatrix::zeros(1, 1);
        cnm[(0, 0)] = 1.0;
        Self {
            gm,
            r_ref,
            cnm,
            snm: DMatrix::zeros(1, 1),
        }
    }

    /// Highest degree the loaded tables support.
    pub fn max_degree(&self) -> usize {
        self.cnm.nrows() - 1
    }

    /// Highest order the loaded tables support.
    pub fn max_order(&self) -> usize {
        self.cnm.ncols() - 1
    }

    /// Check a requested truncation against the loaded tables.
    pub fn check_degree(&self, n_max: usize, m_max: usize) -> Result<(), OdError> {
        if n_max > self.max_degree() || m_max > self.max_order() || m_max > n_max {
            return Err(OdError::UnsupportedDegree {
                requested: (n_max, m_max),
                available: (self.max_degree(), self.max_order()),
            });
        }
        Ok(())
    }

    /// Acceleration [m/s^2] in the inertial frame.
    ///
    /// `r` is the inertial satellite position [m] and `e` the inertial to
    /// body-fixed rotation at the evaluation epoch. The expansion is
    /// truncated at degree `n_max`, order `m_max`.
    pub fn acceleration(
        &self,
        r: &Vector3<f64>,
        e: &Matrix3<f64>,
        n_max: usize,
        m_max: usize,
    ) -> Result<Vector3<f64>, OdError> {
        self.check_degree(n_max, m_max)?;
        Ok(self.acceleration_unchecked(r, e, n_max, m_max))
    }

    /// Acceleration with the degree/order check hoisted out (the dynamics
    /// model validates once at construction).
    pub(crate) fn acceleration_unchecked(
        &self,
        r: &Vector3<f64>,
        e: &Matrix3<f64>,
        n_max: usize,
        m_max: usize,
    ) -> Vector3<f64> {
        // Body-fixed position and geocentric spherical coordinates
        let r_bf = e * r;
        let d = r_bf.norm();
        let latgc = (r_bf.z / d).asin();
        let lon = r_bf.y.atan2(r_bf.x);

        let (pnm, dpnm) = legendre(n_max, m_max, latgc);

        // Partial derivatives of the potential w.r.t. radius, latitude and
        // longitude, accumulated over degree and order.
        let mut du_dr = 0.0;
        let mut du_dlat = 0.0;
        let mut du_dlon = 0.0;

        for n in 0..=n_max {
            let scale = (self.r_ref / d).powi(n as i32);
            let b1 = -self.gm / (d * d) * scale * (n as f64 + 1.0);
            let b2 = self.gm / d * scale;

            let mut q1 = 0.0;
            let mut q2 = 0.0;
            let mut q3 = 0.0;
            for m in 0..=m_max.min(n) {
                let (sm, cm) = (m as f64 * lon).sin_cos();
                let c = self.cnm[(n, m)];
                let s = self.snm[(n, m)];
                q1 += pnm[(n, m)] * (c * cm + s * sm);
                q2 += dpnm[(n, m)] * (c * cm + s * sm);
                q3 += m as f64 * pnm[(n, m)] * (s * cm - c * sm);
            }
            du_dr += q1 * b1;
            du_dlat += q2 * b2;
            du_dlon += q3 * b2;
        }

        // Spherical-to-Cartesian chain rule in the body-fixed frame
        let r2xy = r_bf.x * r_bf.x + r_bf.y * r_bf.y;
        let rho = r2xy.sqrt();

        let radial = du_dr / d - r_bf.z / (d * d * rho) * du_dlat;
        let ax = radial * r_bf.x - du_dlon / r2xy * r_bf.y;
        let ay = radial * r_bf.y + du_dlon / r2xy * r_bf.x;
        let az = du_dr / d * r_bf.z + rho / (d * d) * du_dlat;

        // Back to the inertial frame
        e.transpose() * Vector3::new(ax, ay, az)
    }

    /// 3x3 gradient da/dr [1/s^2] of the harmonic acceleration, by central
    /// differences with a 1 m offset along each axis.
    ///
    /// Finite differencing is deliberate: six acceleration evaluations per
    /// call in exchange for not maintaining an analytic Jacobian of the
    /// full expansion.
    pub fn gradient(
        &self,
        r: &Vector3<f64>,
        e: &Matrix3<f64>,
        n_max: usize,
        m_max: usize,
    ) -> Result<Matrix3<f64>, OdError> {
        self.check_degree(n_max, m_max)?;
        Ok(self.gradient_unchecked(r, e, n_max, m_max))
    }

    pub(crate) fn gradient_unchecked(
        &self,
        r: &Vector3<f64>,
        e: &Matrix3<f64>,
        n_max: usize,
        m_max: usize,
    ) -> Matrix3<f64> {
        const D: f64 = 1.0; // position increment [m]

        let mut g = Matrix3::zeros();
        for i in 0..3 {
            let mut dr = Vector3::zeros();
            dr[i] = D;
            let da1 = self.acceleration_unchecked(&(r + dr), e, n_max, m_max);
            let da2 = self.acceleration_unchecked(&(r - dr), e, n_max, m_max);
            let column = (da1 - da2) / (2.0 * D);
            g.set_column(i, &column);
        }
        g
    }

    /// GGM03S truncated to degree/order 4, embedded for tests and the demo.
    pub fn ggm03s_4x4() -> Self {
        let mut cnm = DMatrix::zeros(5, 5);
        let mut snm = DMatrix::zeros(5, 5);

        cnm[(0, 0)] = 1.0;

        cnm[(2, 0)] = -4.841651437908150e-4;
        cnm[(2, 1)] = -2.066155090741760e-10;
        cnm[(2, 2)] = 2.439383573283130e-6;
        snm[(2, 1)] = 1.384413891379790e-9;
        snm[(2, 2)] = -1.400273703859340e-6;

        cnm[(3, 0)] = 9.571612070934730e-7;
        cnm[(3, 1)] = 2.030462010478640e-6;
        cnm[(3, 2)] = 9.047878948095280e-7;
        cnm[(3, 3)] = 7.213217571215680e-7;
        snm[(3, 1)] = 2.482004158568720e-7;
        snm[(3, 2)] = -6.190054751776180e-7;
        snm[(3, 3)] = 1.414349261929410e-6;

        cnm[(4, 0)] = 5.399658666389910e-7;
        cnm[(4, 1)] = -5.361573893888670e-7;
        cnm[(4, 2)] = 3.505016239626490e-7;
        cnm[(4, 3)] = 9.908567666723210e-7;
        cnm[(4, 4)] = -1.885196330230330e-7;
        snm[(4, 1)] = -4.735673465180860e-7;
        snm[(4, 2)] = 6.624800262758290e-7;
        snm[(4, 3)] = -2.009567235674520e-7;
        snm[(4, 4)] = 3.088038821491940e-7;

        Self {
            gm: crate::state::GM_EARTH,
            r_ref: crate::state::R_EARTH,
            cnm,
            snm,
        }
    }
}

/// Normalized associated Legendre functions and their latitude derivatives.
///
/// Returns dense (n_max+1)x(n_max+1) tables filled by the standard
/// recurrences: sectoral (diagonal) terms, the first off-diagonal band, then
/// the general two-term recurrence, each with closed-form normalization.
pub fn legendre(n_max: usize, m_max: usize, fi: f64) -> (DMatrix<f64>, DMatrix<f64>) {
    let size = n_max + 1;
    let mut pnm = DMatrix::zeros(size, size);
    let mut dpnm = DMatrix::zeros(size, size);

    let (sf, cf) = fi.sin_cos();

    pnm[(0, 0)] = 1.0;
    dpnm[(0, 0)] = 0.0;
    if n_max >= 1 {
        pnm[(1, 1)] = 3.0_f64.sqrt() * cf;
        dpnm[(1, 1)] = -(3.0_f64.sqrt()) * sf;
    }

    // Sectoral (diagonal) terms
    for i in 2..=n_max {
        let f = ((2.0 * i as f64 + 1.0) / (2.0 * i as f64)).sqrt();
        pnm[(i, i)] = f * cf * pnm[(i - 1, i - 1)];
        dpnm[(i, i)] = f * (cf * dpnm[(i - 1, i - 1)] - sf * pnm[(i - 1, i - 1)]);
    }

    // First off-diagonal band
    for i in 1..=n_max {
        let f = (2.0 * i as f64 + 1.0).sqrt();
        pnm[(i, i - 1)] = f * sf * pnm[(i - 1, i - 1)];
        dpnm[(i, i - 1)] = f * (cf * pnm[(i - 1, i - 1)] + sf * dpnm[(i - 1, i - 1)]);
    }

    // General recurrence down each order column
    for j in 0..=m_max.min(n_max) {
        for i in (j + 2)..=n_max {
            let fi_ = i as f64;
            let fj = j as f64;
            let norm = ((2.0 * fi_ + 1.0) / ((fi_ - fj) * (fi_ + fj))).sqrt();
            let a = (2.0 * fi_ - 1.0).sqrt();
            let b = (((fi_ + fj - 1.0) * (fi_ - fj - 1.0)) / (2.0 * fi_ - 3.0)).sqrt();

            pnm[(i, j)] = norm * (a * sf * pnm[(i - 1, j)] - b * pnm[(i - 2, j)]);
            dpnm[(i, j)] =
                norm * (a * sf * dpnm[(i - 1, j)] + a * cf * pnm[(i - 1, j)] - b * dpnm[(i - 2, j)]);
        }
    }

    (pnm, dpnm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{GM_EARTH, R_EARTH};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_legendre_low_degrees() {
        let fi = 0.4_f64;
        let (pnm, _) = legendre(3, 3, fi);

        // Normalized P10 = sqrt(3) sin(fi), P20 = sqrt(5)/2 (3 sin^2 - 1)
        assert_abs_diff_eq!(pnm[(1, 0)], 3.0_f64.sqrt() * fi.sin(), epsilon = 1e-14);
        let p20 = 5.0_f64.sqrt() * 0.5 * (3.0 * fi.sin() * fi.sin() - 1.0);
        assert_abs_diff_eq!(pnm[(2, 0)], p20, epsilon = 1e-13);
    }

    #[test]
    fn test_legendre_derivative_consistency() {
        // Central-difference check of dP/dfi for a sample of entries.
        let fi = 0.7_f64;
        let h = 1e-6;
        let (_, dpnm) = legendre(4, 4, fi);
        let (p_plus, _) = legendre(4, 4, fi + h);
        let (p_minus, _) = legendre(4, 4, fi - h);

        for &(n, m) in &[(1usize, 0usize), (2, 1), (3, 2), (4, 4)] {
            let numeric = (p_plus[(n, m)] - p_minus[(n, m)]) / (2.0 * h);
            assert_abs_diff_eq!(dpnm[(n, m)], numeric, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_point_mass_limit() {
        // Degree/order 0 with C00 = 1 must reduce to -GM/r^3 * r.
        let field = GravityField::point_mass(GM_EARTH, R_EARTH);
        let r = nalgebra::Vector3::new(7000.0e3, -1200.0e3, 3400.0e3);
        let a = field
            .acceleration(&r, &Matrix3::identity(), 0, 0)
            .unwrap();
        let expected = -GM_EARTH / r.norm().powi(3) * r;
        assert_abs_diff_eq!(a, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_acceleration_4x4_reference() {
        // 4x4 GGM03S field at (7000 km, 0, 0), identity rotation: the
        // radial component tightens from the point-mass 8.1347 to about
        // 8.1457 m/s^2, the transverse components stay tiny.
        let field = GravityField::ggm03s_4x4();
        let r = nalgebra::Vector3::new(7000.0e3, 0.0, 0.0);
        let a = field
            .acceleration(&r, &Matrix3::identity(), 4, 4)
            .unwrap();

        assert_abs_diff_eq!(a.x, -8.1457, epsilon = 1e-3);
        assert!(a.y.abs() < 1e-3);
        assert!(a.z.abs() < 1e-3);
    }

    #[test]
    fn test_gradient_symmetry() {
        // The gravity-gradient tensor is symmetric and traceless (Laplace)
        // away from the body; finite differencing should preserve that to
        // good accuracy.
        let field = GravityField::ggm03s_4x4();
        let r = nalgebra::Vector3::new(6800.0e3, 2100.0e3, -1500.0e3);
        let g = field.gradient(&r, &Matrix3::identity(), 4, 4).unwrap();

        assert_abs_diff_eq!(g, g.transpose(), epsilon = 1e-9);
        assert_abs_diff_eq!(g.trace(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_gradient_matches_point_mass_jacobian() {
        // Analytic Jacobian of -GM r / |r|^3 is GM (3 r r^T / |r|^5 - I/|r|^3).
        let field = GravityField::point_mass(GM_EARTH, R_EARTH);
        let r = nalgebra::Vector3::new(7000.0e3, 100.0e3, -200.0e3);
        let g = field.gradient(&r, &Matrix3::identity(), 0, 0).unwrap();

        let d = r.norm();
        let analytic = GM_EARTH * (3.0 * r * r.transpose() / d.powi(5) - Matrix3::identity() / d.powi(3));
        assert_abs_diff_eq!(g, analytic, epsilon = 1e-10);
    }

    #[test]
    fn test_unsupported_degree() {
        let field = GravityField::ggm03s_4x4();
        let r = nalgebra::Vector3::new(7000.0e3, 0.0, 0.0);
        let result = field.acceleration(&r, &Matrix3::identity(), 8, 8);
        assert!(matches!(result, Err(OdError::UnsupportedDegree { .. })));
    }
}
