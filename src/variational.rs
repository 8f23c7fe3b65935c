//! Variational equations for the state transition matrix
//!
//! The filter needs the sensitivity of the propagated state to its initial
//! value. Rather than differencing whole propagations, the 6x6 transition
//! matrix is integrated alongside the trajectory: the 6-dim state and the 36
//! matrix entries form one 42-dim augmented vector whose derivative couples
//! the transition matrix to the gravity gradient,
//!
//! ```text
//!   dPhi/dt = J(t, r) * Phi,      J = | 0  I |
//!                                     | G  0 |
//! ```
//!
//! where `G = da/dr` is the 3x3 gravity-gradient block. Matrix columns are
//! laid out contiguously after the state (column-major).

use crate::forces::DynamicsModel;
use crate::state::StateVector;
use nalgebra::{DVector, Matrix6, Vector3};

/// Length of the augmented state: 6 state components plus a 6x6 matrix.
pub const AUG_DIM: usize = 42;

/// Pack a state and a transition matrix into one augmented vector.
pub fn pack(y: &StateVector, phi: &Matrix6<f64>) -> DVector<f64> {
    let mut yphi = DVector::zeros(AUG_DIM);
    for i in 0..6 {
        yphi[i] = y[i];
    }
    for j in 0..6 {
        for i in 0..6 {
            yphi[6 * j + i + 6] = phi[(i, j)];
        }
    }
    yphi
}

/// Split an augmented vector back into state and transition matrix.
pub fn unpack(yphi: &DVector<f64>) -> (StateVector, Matrix6<f64>) {
    let mut y = StateVector::zeros();
    for i in 0..6 {
        y[i] = yphi[i];
    }
    let mut phi = Matrix6::zeros();
    for j in 0..6 {
        for i in 0..6 {
            phi[(i, j)] = yphi[6 * j + i + 6];
        }
    }
    (y, phi)
}

/// Augmented vector at the start of an arc: the state itself with the
/// transition matrix at identity.
pub fn initial_augmented(y: &StateVector) -> DVector<f64> {
    pack(y, &Matrix6::identity())
}

/// Derivative of the augmented vector at `mjd_utc`.
///
/// The trajectory part is the ordinary equation of motion; each transition
/// matrix column is propagated through the Jacobian built from the gravity
/// gradient at the current position.
pub fn variational_derivative(
    dynamics: &DynamicsModel,
    mjd_utc: f64,
    yphi: &DVector<f64>,
) -> DVector<f64> {
    let r = Vector3::new(yphi[0], yphi[1], yphi[2]);
    let a = dynamics.acceleration(mjd_utc, &r);
    let grad = dynamics.gradient(mjd_utc, &r);

    let mut dyphi = DVector::zeros(AUG_DIM);

    // Trajectory: dr/dt = v, dv/dt = a
    dyphi[0] = yphi[3];
    dyphi[1] = yphi[4];
    dyphi[2] = yphi[5];
    dyphi[3] = a.x;
    dyphi[4] = a.y;
    dyphi[5] = a.z;

    // Each column c of Phi: d(c)/dt = J * c with J = [[0, I], [G, 0]]
    for j in 0..6 {
        let col = 6 * j + 6;
        for i in 0..3 {
            dyphi[col + i] = yphi[col + i + 3];
            let mut s = 0.0;
            for m in 0..3 {
                s += grad[(i, m)] * yphi[col + m];
            }
            dyphi[col + i + 3] = s;
        }
    }

    dyphi
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forces::{GravityField, PerturbationSettings};
    use crate::integrator::{IntegrationStatus, ShampineGordon};
    use crate::providers::{IdentityRotation, NoBodies};
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector6;

    fn point_mass_model() -> DynamicsModel {
        DynamicsModel::new(
            GravityField::point_mass(crate::state::GM_EARTH, crate::state::R_EARTH),
            PerturbationSettings::gravity_only(0, 0),
            Box::new(IdentityRotation),
            Box::new(NoBodies),
        )
        .unwrap()
    }

    #[test]
    fn test_pack_unpack_round_trip() {
        let y = Vector6::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        let mut phi = Matrix6::identity();
        phi[(2, 4)] = 7.5;
        phi[(5, 0)] = -3.25;

        let yphi = pack(&y, &phi);
        let (y2, phi2) = unpack(&yphi);
        assert_eq!(y, y2);
        assert_eq!(phi, phi2);
    }

    #[test]
    fn test_initial_transition_is_identity() {
        let y = Vector6::new(7000.0e3, 0.0, 0.0, 0.0, 7500.0, 0.0);
        let (_, phi) = unpack(&initial_augmented(&y));
        assert_eq!(phi, Matrix6::identity());
    }

    #[test]
    fn test_trajectory_part_matches_state_derivative() {
        let model = point_mass_model();
        let y = Vector6::new(7000.0e3, 100.0e3, -50.0e3, 10.0, 7500.0, -20.0);
        let mjd = 58849.0;

        let dyphi = variational_derivative(&model, mjd, &initial_augmented(&y));
        let dy = model.state_derivative(mjd, &y);
        for i in 0..6 {
            assert_abs_diff_eq!(dyphi[i], dy[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_transition_matrix_matches_finite_differences() {
        // Propagate the augmented vector for 60 s, then check each column
        // of Phi against a centrally differenced propagation of the state.
        let model = point_mass_model();
        let mjd0 = 58849.0;
        let dt = 60.0;
        let y0 = Vector6::new(7000.0e3, 0.0, 0.0, 0.0, 7500.0, 100.0);

        let sg = ShampineGordon::new(1e-13, 1e-10);
        let out = sg
            .integrate(
                |t, yphi| variational_derivative(&model, mjd0 + t / 86400.0, yphi),
                0.0,
                dt,
                &initial_augmented(&y0),
            )
            .unwrap();
        assert_eq!(out.status, IntegrationStatus::Done);
        let (_, phi) = unpack(&out.y);

        let propagate = |y: &Vector6<f64>| -> Vector6<f64> {
            let out = sg
                .integrate(
                    |t, yv| {
                        let y6 = Vector6::from_column_slice(yv.as_slice());
                        let dy = model.state_derivative(mjd0 + t / 86400.0, &y6);
                        DVector::from_column_slice(dy.as_slice())
                    },
                    0.0,
                    dt,
                    &DVector::from_column_slice(y.as_slice()),
                )
                .unwrap();
            Vector6::from_column_slice(out.y.as_slice())
        };

        for j in 0..6 {
            // meter/mm-per-second scale offsets
            let delta = if j < 3 { 1.0 } else { 1e-3 };
            let mut yp = y0;
            let mut ym = y0;
            yp[j] += delta;
            ym[j] -= delta;
            let col = (propagate(&yp) - propagate(&ym)) / (2.0 * delta);
            for i in 0..6 {
                let scale = phi[(i, j)].abs().max(1.0);
                assert_abs_diff_eq!(phi[(i, j)], col[i], epsilon = 1e-5 * scale);
            }
        }
    }
}
