//! Cyclic coordinate descent for
//!
//! ```text
//! L(β) = (1/2n) ||y - Xβ||²  +  λ1 ||β||₁  +  λ2 ||Tβ||²
//! ```
//!
//! The network term is quadratic, so it is folded into the smooth part of the
//! objective together with the squared loss. Along coordinate `j` the smooth part has
//! curvature `a_j = ||X_j||²/n + 2λ2 ||T_j||²`, and the exact coordinate minimiser is
//! a soft threshold of
//!
//! ```text
//! ρ_j = X_jᵀr/n + (||X_j||²/n) β_j - 2λ2 (T_jᵀs - ||T_j||² β_j)
//! ```
//!
//! divided by `a_j`, where `r = y - Xβ` and `s = Tβ` are kept current after every
//! coordinate move. This is the same minimiser as an ordinary Lasso on the stacked
//! system `[X; sqrt(2nλ2) T]`, `[y; 0]`, without ever forming the stacked matrix.

use crate::design::DesignMatrix;
use crate::incidence::IncidenceOperator;
use ndarray::{Array1, ArrayView1};

/// `sign(z) * max(|z| - threshold, 0)`. A zero threshold returns `z` unchanged.
#[inline]
pub fn soft_threshold(z: f64, threshold: f64) -> f64 {
    if z > threshold {
        z - threshold
    } else if z < -threshold {
        z + threshold
    } else {
        0.0
    }
}

/// Evaluates `L(β)` directly from the data.
pub fn objective<X: DesignMatrix + ?Sized>(
    x: &X,
    y: ArrayView1<f64>,
    operator: &IncidenceOperator,
    beta: ArrayView1<f64>,
    lambda1: f64,
    lambda2: f64,
) -> f64 {
    let residual = &y - &x.product(beta);
    let network = operator.product(beta);
    objective_from_parts(
        x.n_samples(),
        residual.view(),
        network.view(),
        beta,
        lambda1,
        lambda2,
    )
}

fn objective_from_parts(
    n_samples: usize,
    residual: ArrayView1<f64>,
    network: ArrayView1<f64>,
    beta: ArrayView1<f64>,
    lambda1: f64,
    lambda2: f64,
) -> f64 {
    let loss = residual.dot(&residual) / (2.0 * n_samples as f64);
    let l1: f64 = beta.iter().map(|b| b.abs()).sum();
    loss + lambda1 * l1 + lambda2 * network.dot(&network)
}

/// Result of one coordinate-descent run.
#[derive(Debug, Clone)]
pub struct CoordinateResult {
    pub beta: Array1<f64>,
    pub iterations: usize,
    pub converged: bool,
    pub relative_change: f64,
    pub objective: f64,
}

/// A fixed problem instance: data, operator, and penalty strengths.
///
/// Dimensions are assumed to be consistent; the estimator checks them at its
/// public boundary before building one of these.
pub struct CoordinateDescent<'a, X: DesignMatrix + ?Sized> {
    x: &'a X,
    y: ArrayView1<'a, f64>,
    operator: &'a IncidenceOperator,
    lambda1: f64,
    lambda2: f64,
    // ||X_j||² / n
    loss_curvature: Vec<f64>,
    // ||X_j||² / n + 2 λ2 ||T_j||²
    curvature: Vec<f64>,
}

impl<'a, X: DesignMatrix + ?Sized> CoordinateDescent<'a, X> {
    pub fn new(
        x: &'a X,
        y: ArrayView1<'a, f64>,
        operator: &'a IncidenceOperator,
        lambda1: f64,
        lambda2: f64,
    ) -> Self {
        debug_assert_eq!(x.n_samples(), y.len());
        debug_assert_eq!(x.n_features(), operator.num_features());

        let inv_n = 1.0 / x.n_samples() as f64;
        let loss_curvature: Vec<f64> = (0..x.n_features())
            .map(|j| x.column_sq_norm(j) * inv_n)
            .collect();
        let curvature = loss_curvature
            .iter()
            .enumerate()
            .map(|(j, &a)| a + 2.0 * lambda2 * operator.column_sq_norm(j))
            .collect();

        Self {
            x,
            y,
            operator,
            lambda1,
            lambda2,
            loss_curvature,
            curvature,
        }
    }

    /// Runs sweeps from `beta` until the largest coefficient move in a sweep is at
    /// most `tolerance` times the largest coefficient, or `max_iterations` sweeps
    /// have been made.
    pub fn run(&self, mut beta: Array1<f64>, tolerance: f64, max_iterations: usize) -> CoordinateResult {
        let n = self.x.n_samples();
        let inv_n = 1.0 / n as f64;

        let mut residual = &self.y - &self.x.product(beta.view());
        let mut network = self.operator.product(beta.view());

        let mut iterations = 0;
        let mut relative_change = f64::INFINITY;
        let mut converged = false;

        while iterations < max_iterations {
            iterations += 1;
            let mut max_delta = 0.0f64;
            let mut max_beta = 0.0f64;

            for j in 0..beta.len() {
                let old = beta[j];
                let a = self.curvature[j];

                // a zero-curvature coordinate only sees the L1 term, whose minimiser is zero.
                let updated = if a > 0.0 {
                    let loss_part = self.x.column_dot(j, residual.view()) * inv_n
                        + self.loss_curvature[j] * old;
                    let network_part = if self.lambda2 > 0.0 {
                        let ts: f64 = self
                            .operator
                            .column(j)
                            .iter()
                            .map(|&(row, value)| value * network[row])
                            .sum();
                        2.0 * self.lambda2 * (ts - self.operator.column_sq_norm(j) * old)
                    } else {
                        0.0
                    };
                    soft_threshold(loss_part - network_part, self.lambda1) / a
                } else {
                    0.0
                };

                let delta = updated - old;
                if delta != 0.0 {
                    self.x.column_axpy(j, -delta, &mut residual);
                    for &(row, value) in self.operator.column(j) {
                        network[row] += value * delta;
                    }
                    beta[j] = updated;
                }
                max_delta = max_delta.max(delta.abs());
                max_beta = max_beta.max(updated.abs());
            }

            relative_change = if max_delta == 0.0 {
                0.0
            } else {
                max_delta / max_beta.max(f64::EPSILON)
            };

            if log::log_enabled!(log::Level::Trace) {
                let current = objective_from_parts(
                    n,
                    residual.view(),
                    network.view(),
                    beta.view(),
                    self.lambda1,
                    self.lambda2,
                );
                log::trace!(
                    "sweep {iterations}: objective {current:.10e}, relative change {relative_change:.3e}"
                );
            }

            if relative_change <= tolerance {
                converged = true;
                break;
            }
        }

        let objective = objective_from_parts(
            n,
            residual.view(),
            network.view(),
            beta.view(),
            self.lambda1,
            self.lambda2,
        );

        CoordinateResult {
            beta,
            iterations,
            converged,
            relative_change,
            objective,
        }
    }
}
