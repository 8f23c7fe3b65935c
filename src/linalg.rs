//! Dense linear-algebra helpers on top of nalgebra
//!
//! nalgebra covers construction, arithmetic, transpose and identity; this
//! module adds the two pieces the estimator and geometry code need with
//! explicit error semantics: a Gauss-Jordan inverse that detects singular
//! pivots, and the elementary axis rotations.

use crate::error::OdError;
use nalgebra::{DMatrix, Matrix3};

/// Pivot magnitudes below this are treated as singular.
const PIVOT_EPS: f64 = 1e-12;

/// Invert a square matrix by Gauss-Jordan elimination with partial pivoting.
///
/// Each elimination step swaps the row with the largest-magnitude pivot
/// element onto the diagonal. A pivot below the singularity threshold
/// returns `SingularMatrix` instead of dividing through near-zero.
pub fn gauss_jordan_inverse(m: &DMatrix<f64>) -> Result<DMatrix<f64>, OdError> {
    let n = m.nrows();
    if n != m.ncols() {
        return Err(OdError::InvalidArgument(format!(
            "inverse requires a square matrix, got {}x{}",
            m.nrows(),
            m.ncols()
        )));
    }

    // Augment [A | I] and reduce A to I in place.
    let mut a = m.clone();
    let mut inv = DMatrix::<f64>::identity(n, n);

    for col in 0..n {
        // Partial pivoting: bring the largest remaining pivot up.
        let mut pivot_row = col;
        let mut pivot_mag = a[(col, col)].abs();
        for row in (col + 1)..n {
            let mag = a[(row, col)].abs();
            if mag > pivot_mag {
                pivot_row = row;
                pivot_mag = mag;
            }
        }
        if pivot_mag < PIVOT_EPS {
            return Err(OdError::SingularMatrix);
        }
        if pivot_row != col {
            a.swap_rows(pivot_row, col);
            inv.swap_rows(pivot_row, col);
        }

        let pivot = a[(col, col)];
        for j in 0..n {
            a[(col, j)] /= pivot;
            inv[(col, j)] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[(row, col)];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[(row, j)] -= factor * a[(col, j)];
                inv[(row, j)] -= factor * inv[(col, j)];
            }
        }
    }

    Ok(inv)
}

/// Rotation about the x-axis by `angle` [rad].
pub fn rot_x(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, c, s, //
        0.0, -s, c,
    )
}

/// Rotation about the y-axis by `angle` [rad].
pub fn rot_y(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, 0.0, -s, //
        0.0, 1.0, 0.0, //
        s, 0.0, c,
    )
}

/// Rotation about the z-axis by `angle` [rad].
pub fn rot_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, s, 0.0, //
        -s, c, 0.0, //
        0.0, 0.0, 1.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rotations_orthogonal() {
        for &angle in &[0.0, 0.3, -1.2, std::f64::consts::PI, 5.9] {
            for rot in [rot_x, rot_y, rot_z] {
                let r = rot(angle);
                let should_be_identity = r * r.transpose();
                assert_abs_diff_eq!(should_be_identity, Matrix3::identity(), epsilon = 1e-13);

                // R(theta) * R(-theta) = I
                let round_trip = r * rot(-angle);
                assert_abs_diff_eq!(round_trip, Matrix3::identity(), epsilon = 1e-13);
            }
        }
    }

    #[test]
    fn test_inverse_round_trip() {
        let a = DMatrix::from_row_slice(
            3,
            3,
            &[4.0, 1.0, -2.0, 1.0, 6.0, 0.5, -2.0, 0.5, 5.0],
        );
        let a_inv = gauss_jordan_inverse(&a).unwrap();
        let product = &a * &a_inv;
        assert_abs_diff_eq!(product, DMatrix::identity(3, 3), epsilon = 1e-10);
    }

    #[test]
    fn test_inverse_requires_pivoting() {
        // Zero on the first diagonal entry forces a row swap.
        let a = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let a_inv = gauss_jordan_inverse(&a).unwrap();
        assert_abs_diff_eq!(&a * &a_inv, DMatrix::identity(2, 2), epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_singular() {
        // Second row is a multiple of the first.
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert_eq!(gauss_jordan_inverse(&a), Err(OdError::SingularMatrix));
    }

    #[test]
    fn test_inverse_rejects_non_square() {
        let a = DMatrix::zeros(2, 3);
        assert!(matches!(
            gauss_jordan_inverse(&a),
            Err(OdError::InvalidArgument(_))
        ));
    }
}
