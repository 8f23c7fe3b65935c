//! Variable-order, variable-step multistep ODE integration
//!
//! Implements the Shampine-Gordon predictor-corrector family (orders 1-12)
//! for non-stiff initial value problems: a table of modified divided
//! differences of the derivative is maintained, each step is predicted,
//! evaluated and corrected, local truncation error is estimated at orders
//! k-2..k+1, and both the order and the step size adapt to hold the local
//! error inside `max(rel_tol * |y|, abs_tol)` componentwise. Output at the
//! requested time is produced by interpolating the difference table, never
//! by stepping exactly onto it.
//!
//! Reference: Shampine, Gordon, "Computer Solution of Ordinary Differential
//! Equations", Freeman (1975).
//!
//! Soft failures (tolerances below attainable accuracy, step budget
//! exhausted, suspected stiffness) return the best available state with a
//! status flag rather than an error; only structurally invalid input is an
//! error.

use crate::error::OdError;
use nalgebra::{DMatrix, DVector};

/// Maximum integration order.
const MAX_ORDER: usize = 12;

/// Powers of two, index 1..=13 (index 0 unused).
const TWO: [f64; 14] = [
    0.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0, 256.0, 512.0, 1024.0, 2048.0, 4096.0, 8192.0,
];

/// Error-constant ratios gamma*(k), index 1..=13 (index 0 unused).
const GSTR: [f64; 14] = [
    0.0, 0.5, 0.0833, 0.0417, 0.0264, 0.0188, 0.0143, 0.0114, 0.00936, 0.00789, 0.00679, 0.00592,
    0.00524, 0.00468,
];

/// Terminal status of one integration call.
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrationStatus {
    /// Reached the requested output time within tolerance
    Done,

    /// The requested tolerances were below what machine precision allows;
    /// they were relaxed to the reported values and integration continued.
    AccuracyNotAchieved { rel_tol: f64, abs_tol: f64 },

    /// The step budget ran out before the output time
    TooManySteps,

    /// The step budget ran out and the order stayed at four or below for 50
    /// consecutive steps, which points at a stiff problem
    StiffnessSuspected,
}

/// Result of one integration call: best available state plus status.
#[derive(Debug, Clone)]
pub struct IntegrationOutput {
    /// Solution at the output time (or at the last reached time for the
    /// step-budget statuses)
    pub y: DVector<f64>,

    /// How the run ended
    pub status: IntegrationStatus,

    /// Accepted steps taken
    pub steps: usize,
}

impl IntegrationOutput {
    /// True for `Done` and the degraded-accuracy outcome, i.e. whenever the
    /// requested output time was reached.
    pub fn reached_output(&self) -> bool {
        matches!(
            self.status,
            IntegrationStatus::Done | IntegrationStatus::AccuracyNotAchieved { .. }
        )
    }
}

/// Shampine-Gordon integrator configuration.
#[derive(Debug, Clone)]
pub struct ShampineGordon {
    /// Relative error tolerance
    pub rel_tol: f64,

    /// Absolute error tolerance
    pub abs_tol: f64,

    /// Accepted-step budget for a single call
    pub max_steps: usize,
}

impl Default for ShampineGordon {
    fn default() -> Self {
        Self {
            rel_tol: 1e-10,
            abs_tol: 1e-6,
            max_steps: 100_000,
        }
    }
}

impl ShampineGordon {
    pub fn new(rel_tol: f64, abs_tol: f64) -> Self {
        Self {
            rel_tol,
            abs_tol,
            ..Self::default()
        }
    }

    /// Settings used for orbit propagation in the reference scenario.
    pub fn high_precision() -> Self {
        Self {
            rel_tol: 1e-13,
            abs_tol: 1e-6,
            max_steps: 100_000,
        }
    }

    /// Integrate `dy/dt = f(t, y)` from `t0` to `tout`.
    ///
    /// Integration may run in either time direction. The solver steps past
    /// `tout` and interpolates the difference table back to it exactly.
    pub fn integrate<F>(
        &self,
        mut f: F,
        t0: f64,
        tout: f64,
        y0: &DVector<f64>,
    ) -> Result<IntegrationOutput, OdError>
    where
        F: FnMut(f64, &DVector<f64>) -> DVector<f64>,
    {
        if y0.is_empty() {
            return Err(OdError::InvalidParameters("empty state vector".into()));
        }
        let mut eps = self.rel_tol.max(self.abs_tol);
        if self.rel_tol < 0.0 || self.abs_tol < 0.0 || eps <= 0.0 {
            return Err(OdError::InvalidParameters(format!(
                "tolerances must be non-negative with a positive maximum \
                 (rel_tol={}, abs_tol={})",
                self.rel_tol, self.abs_tol
            )));
        }

        if t0 == tout {
            return Ok(IntegrationOutput {
                y: y0.clone(),
                status: IntegrationStatus::Done,
                steps: 0,
            });
        }

        let fouru = 4.0 * f64::EPSILON;

        // Fixed weighting split between relative and absolute parts; eps may
        // be relaxed but the split is preserved.
        let releps = self.rel_tol / eps;
        let abseps = self.abs_tol / eps;

        let del = tout - t0;
        let absdel = del.abs();
        let tend = t0 + 10.0 * del;

        let mut ws = Workspace::new(y0);
        ws.x = t0;
        ws.h = sign((fouru * ws.x.abs()).max((tout - ws.x).abs()), del);

        let mut nostep = 0usize;
        let mut kle4 = 0usize;
        let mut stiff = false;
        let mut relaxed = false;
        let mut crashes = 0usize;

        loop {
            // Past the output point: interpolate and return.
            if (ws.x - t0).abs() >= absdel {
                let y = ws.interpolate(tout);
                let status = if relaxed {
                    IntegrationStatus::AccuracyNotAchieved {
                        rel_tol: eps * releps,
                        abs_tol: eps * abseps,
                    }
                } else {
                    IntegrationStatus::Done
                };
                return Ok(IntegrationOutput {
                    y,
                    status,
                    steps: nostep,
                });
            }

            // Step budget exhausted: weak failure, report the last state.
            if nostep >= self.max_steps {
                let status = if stiff {
                    IntegrationStatus::StiffnessSuspected
                } else {
                    IntegrationStatus::TooManySteps
                };
                log::warn!(
                    "integration stopped after {} steps at t={} (target {}): {:?}",
                    nostep,
                    ws.x,
                    tout,
                    status
                );
                return Ok(IntegrationOutput {
                    y: ws.yy.clone(),
                    status,
                    steps: nostep,
                });
            }

            // Limit the step and set the error weight vector.
            ws.h = sign(ws.h.abs().min((tend - ws.x).abs()), ws.h);
            for l in 0..ws.n {
                ws.wt[l] = releps * ws.yy[l].abs() + abseps;
            }

            let crash = ws.step(&mut f, &mut eps);

            if crash {
                // The step routine has already relaxed eps (or repaired a
                // step size below machine precision); retry with the
                // adjusted tolerance instead of giving up.
                relaxed = true;
                crashes += 1;
                log::warn!(
                    "tolerance unattainable at t={}, relaxed to rel={:.3e} abs={:.3e}",
                    ws.x,
                    eps * releps,
                    eps * abseps
                );
                if crashes > 64 {
                    return Ok(IntegrationOutput {
                        y: ws.yy.clone(),
                        status: IntegrationStatus::AccuracyNotAchieved {
                            rel_tol: eps * releps,
                            abs_tol: eps * abseps,
                        },
                        steps: nostep,
                    });
                }
                continue;
            }

            nostep += 1;

            // Stiffness heuristic: count consecutive low-order steps.
            kle4 += 1;
            if ws.kold > 4 {
                kle4 = 0;
            }
            if kle4 >= 50 && !stiff {
                stiff = true;
                log::warn!("order has stayed <= 4 for 50 steps; problem may be stiff");
            }
        }
    }
}

/// Transfer `direction`'s sign onto `magnitude`.
fn sign(magnitude: f64, direction: f64) -> f64 {
    if direction < 0.0 {
        -magnitude.abs()
    } else {
        magnitude.abs()
    }
}

/// Per-call integrator state: the difference table and the step/order
/// history. Created fresh for every `integrate` call, never shared.
///
/// Coefficient arrays are order-indexed from 1 to match the method's
/// formulation; slot 0 is unused.
struct Workspace {
    n: usize,
    x: f64,
    /// Current solution at `x`
    yy: DVector<f64>,
    wt: DVector<f64>,
    p: DVector<f64>,
    yp: DVector<f64>,
    /// Modified divided differences; columns 1..=k+2 hold the table,
    /// columns 15/16 carry the extra-precision rounding terms
    phi: DMatrix<f64>,
    psi: [f64; 13],
    alpha: [f64; 13],
    beta: [f64; 13],
    v: [f64; 13],
    w: [f64; 13],
    sig: [f64; 14],
    g: [f64; 14],
    h: f64,
    hold: f64,
    k: usize,
    kold: usize,
    ns: usize,
    start: bool,
    phase1: bool,
    nornd: bool,
}

impl Workspace {
    fn new(y0: &DVector<f64>) -> Self {
        let n = y0.len();
        Self {
            n,
            x: 0.0,
            yy: y0.clone(),
            wt: DVector::zeros(n),
            p: DVector::zeros(n),
            yp: DVector::zeros(n),
            phi: DMatrix::zeros(n, 17),
            psi: [0.0; 13],
            alpha: [0.0; 13],
            beta: [0.0; 13],
            v: [0.0; 13],
            w: [0.0; 13],
            sig: [0.0; 14],
            g: [0.0; 14],
            h: 0.0,
            hold: 0.0,
            k: 1,
            kold: 0,
            ns: 0,
            start: true,
            phase1: true,
            nornd: true,
        }
    }

    /// Take one step of the predictor-corrector, adapting order and step
    /// size. Advances `x` and `yy` on success. Returns `true` (crash) when
    /// the step size or tolerance hit the machine-precision floor; in that
    /// case `eps` and/or `h` have been adjusted and the caller may retry.
    fn step<F>(&mut self, f: &mut F, eps: &mut f64) -> bool
    where
        F: FnMut(f64, &DVector<f64>) -> DVector<f64>,
    {
        let twou = 2.0 * f64::EPSILON;
        let fouru = 4.0 * f64::EPSILON;
        let n = self.n;

        // Block 0: machine-precision guards and first-step initialization.
        if self.h.abs() < fouru * self.x.abs() {
            self.h = sign(fouru * self.x.abs(), self.h);
            return true;
        }

        let mut p5eps = 0.5 * *eps;

        self.g[1] = 1.0;
        self.g[2] = 0.5;
        self.sig[1] = 1.0;

        // If the tolerance is below the rounding level of the solution,
        // raise it to an acceptable value and report the crash.
        let mut round = 0.0;
        for l in 0..n {
            round += (self.yy[l] / self.wt[l]).powi(2);
        }
        round = twou * round.sqrt();
        if p5eps < round {
            *eps = 2.0 * round * (1.0 + fouru);
            return true;
        }

        if self.start {
            // Initialize the difference table and pick a first step size
            // small enough for the order-1 error estimate.
            self.yp = f(self.x, &self.yy);
            let mut sum = 0.0;
            for l in 0..n {
                self.phi[(l, 1)] = self.yp[l];
                self.phi[(l, 2)] = 0.0;
                sum += (self.yp[l] / self.wt[l]).powi(2);
            }
            sum = sum.sqrt();
            let mut absh = self.h.abs();
            if *eps < 16.0 * sum * self.h * self.h {
                absh = 0.25 * (*eps / sum).sqrt();
            }
            self.h = sign(absh.max(fouru * self.x.abs()), self.h);
            self.hold = 0.0;
            self.k = 1;
            self.kold = 0;
            self.start = false;
            self.phase1 = true;
            self.nornd = true;
            if p5eps <= 100.0 * round {
                self.nornd = false;
                for l in 0..n {
                    self.phi[(l, 15)] = 0.0;
                }
            }
        }

        let mut ifail = 0usize;
        let mut knew;
        let mut erk;
        let mut erkm1;
        let mut absh;

        // Blocks 1-3 repeat until a step is accepted.
        loop {
            let k = self.k;
            let kp1 = k + 1;
            let kp2 = k + 2;
            let km1 = k.saturating_sub(1);

            // Block 1: compute the coefficients for this step. ns counts the
            // steps taken at the current size h; coefficients beyond ns are
            // unchanged when neither h nor k changed.
            if self.h != self.hold {
                self.ns = 0;
            }
            if self.ns <= self.kold {
                self.ns += 1;
            }
            let ns = self.ns;
            let nsp1 = ns + 1;

            if k >= ns {
                self.beta[ns] = 1.0;
                let realns = ns as f64;
                self.alpha[ns] = 1.0 / realns;
                let mut temp1 = self.h * realns;
                self.sig[nsp1] = 1.0;
                for i in nsp1..=k {
                    let im1 = i - 1;
                    let temp2 = self.psi[im1];
                    self.psi[im1] = temp1;
                    self.beta[i] = self.beta[im1] * self.psi[im1] / temp2;
                    temp1 = temp2 + self.h;
                    self.alpha[i] = self.h / temp1;
                    self.sig[i + 1] = i as f64 * self.alpha[i] * self.sig[i];
                }
                self.psi[k] = temp1;

                // Coefficients g[*] through the work vectors v[*], w[*]
                if ns <= 1 {
                    for iq in 1..=k {
                        let temp3 = (iq * (iq + 1)) as f64;
                        self.v[iq] = 1.0 / temp3;
                        self.w[iq] = self.v[iq];
                    }
                } else {
                    // Order raised: update the diagonal part of v[*]
                    if k > self.kold {
                        let temp4 = (k * kp1) as f64;
                        self.v[k] = 1.0 / temp4;
                        if ns >= 3 {
                            for j in 1..=(ns - 2) {
                                let i = k - j;
                                self.v[i] -= self.alpha[j + 1] * self.v[i + 1];
                            }
                        }
                    }
                    let limit1 = kp1 - ns;
                    let temp5 = self.alpha[ns];
                    for iq in 1..=limit1 {
                        self.v[iq] -= temp5 * self.v[iq + 1];
                        self.w[iq] = self.v[iq];
                    }
                    self.g[nsp1] = self.w[1];
                }

                let nsp2 = ns + 2;
                for i in nsp2..=kp1 {
                    let limit2 = kp2 - i;
                    let temp6 = self.alpha[i - 1];
                    for iq in 1..=limit2 {
                        self.w[iq] -= temp6 * self.w[iq + 1];
                    }
                    self.g[i] = self.w[1];
                }
            }

            // Block 2: predict, evaluate, and estimate the local error at
            // orders k, k-1, k-2 as if the step size were constant.
            for i in nsp1..=k {
                let temp1 = self.beta[i];
                for l in 0..n {
                    self.phi[(l, i)] *= temp1;
                }
            }
            for l in 0..n {
                self.phi[(l, kp2)] = self.phi[(l, kp1)];
                self.phi[(l, kp1)] = 0.0;
                self.p[l] = 0.0;
            }
            for j in 1..=k {
                let i = kp1 - j;
                let temp2 = self.g[i];
                for l in 0..n {
                    self.p[l] += temp2 * self.phi[(l, i)];
                    self.phi[(l, i)] += self.phi[(l, i + 1)];
                }
            }
            if self.nornd {
                for l in 0..n {
                    self.p[l] = self.yy[l] + self.h * self.p[l];
                }
            } else {
                for l in 0..n {
                    let tau = self.h * self.p[l] - self.phi[(l, 15)];
                    self.p[l] = self.yy[l] + tau;
                    self.phi[(l, 16)] = (self.p[l] - self.yy[l]) - tau;
                }
            }
            let xold = self.x;
            self.x += self.h;
            absh = self.h.abs();
            self.yp = f(self.x, &self.p);

            let mut erkm2 = 0.0;
            erkm1 = 0.0;
            erk = 0.0;
            for l in 0..n {
                let temp3 = 1.0 / self.wt[l];
                let temp4 = self.yp[l] - self.phi[(l, 1)];
                if k >= 3 {
                    erkm2 += ((self.phi[(l, km1)] + temp4) * temp3).powi(2);
                }
                if k >= 2 {
                    erkm1 += ((self.phi[(l, k)] + temp4) * temp3).powi(2);
                }
                erk += (temp4 * temp3).powi(2);
            }
            if k >= 3 {
                erkm2 = absh * self.sig[km1] * GSTR[k - 2] * erkm2.sqrt();
            }
            if k >= 2 {
                erkm1 = absh * self.sig[k] * GSTR[km1] * erkm1.sqrt();
            }
            let temp5 = absh * erk.sqrt();
            let err = temp5 * (self.g[k] - self.g[kp1]);
            erk = temp5 * self.sig[kp1] * GSTR[k];

            knew = k;
            // Lower the order when the lower-order estimates are no worse
            if k >= 3 {
                if erkm1.max(erkm2) <= erk {
                    knew = km1;
                }
            } else if k == 2 && erkm1 <= 0.5 * erk {
                knew = km1;
            }

            if err <= *eps {
                break; // step accepted
            }

            // Block 3: the step failed. Restore x and the difference table,
            // halve the step (optimal step after three failures), and force
            // order one on repeated failures.
            self.phase1 = false;
            self.x = xold;
            for i in 1..=k {
                let temp1 = 1.0 / self.beta[i];
                for l in 0..n {
                    self.phi[(l, i)] = temp1 * (self.phi[(l, i)] - self.phi[(l, i + 1)]);
                }
            }
            for i in 2..=k {
                self.psi[i - 1] = self.psi[i] - self.h;
            }

            ifail += 1;
            let mut temp2 = 0.5;
            if ifail > 3 && p5eps < 0.25 * erk {
                temp2 = (p5eps / erk).sqrt();
            }
            if ifail >= 3 {
                knew = 1;
            }
            self.h *= temp2;
            self.k = knew;
            if self.h.abs() < fouru * self.x.abs() {
                // Step size at machine precision: relax the tolerance and
                // let the caller retry.
                self.h = sign(fouru * self.x.abs(), self.h);
                *eps += *eps;
                return true;
            }
        }

        // Block 4: the step succeeded. Correct the solution, update the
        // difference table, then pick order and step size for the next step.
        let k = self.k;
        let kp1 = k + 1;
        let kp2 = k + 2;
        let km1 = k.saturating_sub(1);

        self.kold = k;
        self.hold = self.h;

        let temp1 = self.h * self.g[kp1];
        if self.nornd {
            for l in 0..n {
                self.yy[l] = self.p[l] + temp1 * (self.yp[l] - self.phi[(l, 1)]);
            }
        } else {
            for l in 0..n {
                let rho = temp1 * (self.yp[l] - self.phi[(l, 1)]) - self.phi[(l, 16)];
                self.yy[l] = self.p[l] + rho;
                self.phi[(l, 15)] = (self.yy[l] - self.p[l]) - rho;
            }
        }
        self.yp = f(self.x, &self.yy);

        for l in 0..n {
            self.phi[(l, kp1)] = self.yp[l] - self.phi[(l, 1)];
            self.phi[(l, kp2)] = self.phi[(l, kp1)] - self.phi[(l, kp2)];
        }
        for i in 1..=k {
            for l in 0..n {
                self.phi[(l, i)] += self.phi[(l, kp1)];
            }
        }

        // Estimate the error at order k+1 unless: still in the first phase
        // (always raise), already decided to lower, or the step size has not
        // been constant long enough for the estimate to be reliable.
        let mut erkp1 = 0.0;
        if knew == km1 || k == MAX_ORDER {
            self.phase1 = false;
        }

        enum OrderMove {
            Raise,
            Keep,
            Lower,
        }

        let mv = if self.phase1 {
            OrderMove::Raise
        } else if knew == km1 {
            OrderMove::Lower
        } else if kp1 > self.ns {
            OrderMove::Keep
        } else {
            for l in 0..n {
                erkp1 += (self.phi[(l, kp2)] / self.wt[l]).powi(2);
            }
            erkp1 = absh * GSTR[kp1] * erkp1.sqrt();

            if k == 1 {
                if erkp1 < 0.5 * erk {
                    OrderMove::Raise
                } else {
                    OrderMove::Keep
                }
            } else if erkm1 <= erk.min(erkp1) {
                OrderMove::Lower
            } else if erkp1 < erk && k != MAX_ORDER {
                OrderMove::Raise
            } else {
                OrderMove::Keep
            }
        };

        match mv {
            OrderMove::Raise => {
                self.k = kp1;
                erk = erkp1;
            }
            OrderMove::Lower => {
                self.k = km1;
                erk = erkm1;
            }
            OrderMove::Keep => {}
        }

        // With the new order, pick the next step size.
        p5eps = 0.5 * *eps;
        let mut hnew = self.h + self.h;
        if !self.phase1 && p5eps < erk * TWO[self.k + 1] {
            hnew = self.h;
            if p5eps < erk {
                let exponent = 1.0 / (self.k as f64 + 1.0);
                let r = (p5eps / erk).powf(exponent);
                hnew = absh * 0.5f64.max(0.9f64.min(r));
                hnew = sign(hnew.max(fouru * self.x.abs()), self.h);
            }
        }
        self.h = hnew;

        false
    }

    /// Interpolate the solution at `xout` from the difference table, without
    /// taking a step past it (the table is valid over the last step).
    fn interpolate(&self, xout: f64) -> DVector<f64> {
        let n = self.n;
        let hi = xout - self.x;
        let ki = self.kold + 1;

        let mut g = [0.0; 14];
        let mut w = [0.0; 14];
        let mut rho = [0.0; 14];
        g[1] = 1.0;
        rho[1] = 1.0;

        for i in 1..=ki {
            w[i] = 1.0 / i as f64;
        }

        let mut term = 0.0;
        for j in 2..=ki {
            let psijm1 = self.psi[j - 1];
            let gamma = (hi + term) / psijm1;
            let eta = hi / psijm1;
            for i in 1..=(ki + 1 - j) {
                w[i] = gamma * w[i] - eta * w[i + 1];
            }
            g[j] = w[1];
            rho[j] = gamma * rho[j - 1];
            term = psijm1;
        }

        let mut yout = DVector::zeros(n);
        for j in 1..=ki {
            let i = ki + 1 - j;
            let temp2 = g[i];
            for l in 0..n {
                yout[l] += temp2 * self.phi[(l, i)];
            }
        }
        for l in 0..n {
            yout[l] = self.yy[l] + hi * yout[l];
        }
        yout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::DVector;

    #[test]
    fn test_invalid_tolerances() {
        let bad = ShampineGordon::new(0.0, 0.0);
        let y0 = DVector::from_element(1, 1.0);
        let result = bad.integrate(|_, y| -y.clone(), 0.0, 1.0, &y0);
        assert!(matches!(result, Err(OdError::InvalidParameters(_))));

        let negative = ShampineGordon::new(-1e-6, 1e-6);
        let result = negative.integrate(|_, y| -y.clone(), 0.0, 1.0, &y0);
        assert!(matches!(result, Err(OdError::InvalidParameters(_))));
    }

    #[test]
    fn test_zero_interval() {
        let sg = ShampineGordon::default();
        let y0 = DVector::from_element(2, 3.0);
        let out = sg.integrate(|_, y| y.clone(), 5.0, 5.0, &y0).unwrap();
        assert_eq!(out.status, IntegrationStatus::Done);
        assert_eq!(out.steps, 0);
        assert_eq!(out.y, y0);
    }

    #[test]
    fn test_exponential_decay() {
        // y' = -y, y(0) = 1  =>  y(2) = exp(-2)
        let sg = ShampineGordon::new(1e-12, 1e-12);
        let y0 = DVector::from_element(1, 1.0);
        let out = sg.integrate(|_, y| -y.clone(), 0.0, 2.0, &y0).unwrap();
        assert_eq!(out.status, IntegrationStatus::Done);
        assert_abs_diff_eq!(out.y[0], (-2.0_f64).exp(), epsilon = 1e-10);
    }

    #[test]
    fn test_harmonic_oscillator() {
        // y'' = -y integrated over one full period returns to the start.
        let sg = ShampineGordon::new(1e-12, 1e-12);
        let y0 = DVector::from_vec(vec![1.0, 0.0]);
        let period = 2.0 * std::f64::consts::PI;
        let out = sg
            .integrate(
                |_, y| DVector::from_vec(vec![y[1], -y[0]]),
                0.0,
                period,
                &y0,
            )
            .unwrap();
        assert_eq!(out.status, IntegrationStatus::Done);
        assert_abs_diff_eq!(out.y[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(out.y[1], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_backward_round_trip() {
        // Forward then backward with the same tolerances recovers the
        // initial condition to within the relative tolerance scale.
        let rel = 1e-11;
        let sg = ShampineGordon::new(rel, 1e-11);
        let y0 = DVector::from_vec(vec![1.0, 0.5]);
        let f = |_t: f64, y: &DVector<f64>| DVector::from_vec(vec![y[1], -1.5 * y[0]]);

        let forward = sg.integrate(f, 0.0, 3.0, &y0).unwrap();
        assert_eq!(forward.status, IntegrationStatus::Done);
        let back = sg.integrate(f, 3.0, 0.0, &forward.y).unwrap();
        assert_eq!(back.status, IntegrationStatus::Done);

        assert_abs_diff_eq!(back.y[0], y0[0], epsilon = 1e4 * rel);
        assert_abs_diff_eq!(back.y[1], y0[1], epsilon = 1e4 * rel);
    }

    #[test]
    fn test_step_count_decreases_with_relaxed_tolerance() {
        // For a smooth non-stiff problem the accepted-step count must fall
        // monotonically as the tolerance is relaxed by orders of magnitude.
        let y0 = DVector::from_element(1, 1.0);
        let mut previous = usize::MAX;
        for &tol in &[1e-13, 1e-11, 1e-9, 1e-7, 1e-5] {
            let sg = ShampineGordon::new(tol, tol);
            let out = sg.integrate(|_, y| -y.clone(), 0.0, 10.0, &y0).unwrap();
            assert!(out.reached_output());
            assert!(
                out.steps <= previous,
                "steps grew from {} to {} at tol {}",
                previous,
                out.steps,
                tol
            );
            previous = out.steps;
        }
    }

    #[test]
    fn test_too_many_steps() {
        let sg = ShampineGordon {
            rel_tol: 1e-12,
            abs_tol: 1e-12,
            max_steps: 3,
        };
        let y0 = DVector::from_element(1, 1.0);
        let out = sg
            .integrate(|t: f64, _: &DVector<f64>| DVector::from_element(1, t.cos()), 0.0, 50.0, &y0)
            .unwrap();
        assert!(matches!(
            out.status,
            IntegrationStatus::TooManySteps | IntegrationStatus::StiffnessSuspected
        ));
        assert_eq!(out.steps, 3);
    }

    #[test]
    fn test_interpolated_output_accuracy() {
        // Ask for an output time that cannot coincide with a step boundary;
        // the result must come from interpolation, not truncation.
        let sg = ShampineGordon::new(1e-12, 1e-12);
        let y0 = DVector::from_element(1, 1.0);
        let tout = 0.7853981633974483; // pi/4
        let out = sg
            .integrate(|t: f64, _: &DVector<f64>| DVector::from_element(1, t.cos()), 0.0, tout, &y0)
            .unwrap();
        assert_eq!(out.status, IntegrationStatus::Done);
        assert_abs_diff_eq!(out.y[0], 1.0 + tout.sin(), epsilon = 1e-10);
    }
}
