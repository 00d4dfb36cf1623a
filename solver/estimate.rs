//! # Network-Constrained Lasso Estimation
//!
//! [`NcLasso`] is a stateful estimator. It owns its coefficient vector and a shared,
//! read-only handle to the incidence operator of the feature network, and moves
//! through three states:
//!
//! ```text
//! Unfit ──fit──▶ Fitting ──▶ Fitted ──fit──▶ Fitting ──▶ Fitted ...
//! ```
//!
//! A fit always overwrites the previous coefficients; nothing from earlier fits is
//! retained except as a warm start when `warm_start` is configured.
//!
//! Independent estimators never share mutable state, so one estimator per phenotype
//! (or per resampling fold) can be fitted in parallel against the same operator.
//! [`fit_phenotypes`] does exactly that with `rayon`.

use crate::coordinate::{self, CoordinateDescent};
use crate::design::DesignMatrix;
use crate::incidence::IncidenceOperator;
use crate::model::{FitReport, FitStatus, ModelError, NcLassoConfig};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rayon::prelude::*;
use std::sync::Arc;
use thiserror::Error;

/// A comprehensive error type for fitting and applying the estimator.
#[derive(Error, Debug)]
pub enum EstimationError {
    #[error("Dimension mismatch for {what}: expected {expected}, found {found}.")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("The design matrix has no samples; at least one row is required to fit.")]
    EmptyDesign,

    #[error("The estimator has not been fitted. Call `fit` before requesting predictions.")]
    NotFitted,

    #[error(transparent)]
    InvalidConfig(#[from] ModelError),

    #[error(
        "The objective became non-finite ({0}). The design matrix or target likely contains NaN or infinite values."
    )]
    NonFiniteObjective(f64),
}

/// Lifecycle of an [`NcLasso`] estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitState {
    Unfit,
    Fitting,
    Fitted,
}

/// Network-constrained Lasso minimising
/// `(1/2n) ||y - Xβ||² + λ1 ||β||₁ + λ2 ||Tβ||²`.
#[derive(Debug, Clone)]
pub struct NcLasso {
    operator: Arc<IncidenceOperator>,
    config: NcLassoConfig,
    coefficients: Array1<f64>,
    state: FitState,
    report: Option<FitReport>,
}

impl NcLasso {
    /// Creates an unfitted estimator. The configuration is validated here, so a
    /// constructed estimator always carries admissible penalties and stopping rules.
    pub fn new(
        operator: impl Into<Arc<IncidenceOperator>>,
        config: NcLassoConfig,
    ) -> Result<Self, EstimationError> {
        config.validate()?;
        let operator = operator.into();
        let coefficients = Array1::zeros(operator.num_features());
        Ok(Self {
            operator,
            config,
            coefficients,
            state: FitState::Unfit,
            report: None,
        })
    }

    pub fn config(&self) -> &NcLassoConfig {
        &self.config
    }

    pub fn operator(&self) -> &Arc<IncidenceOperator> {
        &self.operator
    }

    pub fn state(&self) -> FitState {
        self.state
    }

    /// Number of features `p` the estimator was built for.
    pub fn num_features(&self) -> usize {
        self.operator.num_features()
    }

    /// Diagnostics of the last successful fit.
    pub fn report(&self) -> Option<&FitReport> {
        self.report.as_ref()
    }

    /// The fitted coefficient vector; all zeros before the first fit.
    pub fn coefficients(&self) -> ArrayView1<'_, f64> {
        self.coefficients.view()
    }

    /// Fits the coefficients to `(x, y)`.
    ///
    /// Reaching the iteration ceiling is not an error: the best iterate is kept, the
    /// returned report carries [`FitStatus::MaxIterationsReached`], and a warning is
    /// logged.
    pub fn fit<X: DesignMatrix + ?Sized>(
        &mut self,
        x: &X,
        y: ArrayView1<f64>,
    ) -> Result<FitReport, EstimationError> {
        check_dimension("target length", x.n_samples(), y.len())?;
        check_dimension(
            "design matrix columns",
            self.operator.num_features(),
            x.n_features(),
        )?;
        if x.n_samples() == 0 {
            return Err(EstimationError::EmptyDesign);
        }

        log::info!(
            "Starting ncLasso fit: {} samples, {} features, {} network edges, lambda1={}, lambda2={}",
            x.n_samples(),
            x.n_features(),
            self.operator.num_edges(),
            self.config.lambda1,
            self.config.lambda2
        );

        let start = if self.config.warm_start {
            self.coefficients.clone()
        } else {
            Array1::zeros(self.operator.num_features())
        };
        self.state = FitState::Fitting;

        let solver = CoordinateDescent::new(
            x,
            y.view(),
            &self.operator,
            self.config.lambda1,
            self.config.lambda2,
        );
        let result = solver.run(start, self.config.tolerance, self.config.max_iterations);

        if !result.objective.is_finite() {
            self.coefficients.fill(0.0);
            self.report = None;
            self.state = FitState::Unfit;
            return Err(EstimationError::NonFiniteObjective(result.objective));
        }

        let status = if result.converged {
            FitStatus::Converged
        } else {
            log::warn!(
                "ncLasso did not converge within {} sweeps (last relative change {:.3e} > tolerance {:.1e}). Returning the last iterate.",
                result.iterations,
                result.relative_change,
                self.config.tolerance
            );
            FitStatus::MaxIterationsReached
        };

        let threshold = self.config.selection_threshold;
        let report = FitReport {
            status,
            iterations: result.iterations,
            objective: result.objective,
            relative_change: result.relative_change,
            num_selected: result.beta.iter().filter(|b| b.abs() > threshold).count(),
        };

        log::info!(
            "ncLasso finished after {} sweeps: objective {:.6e}, {} of {} features selected",
            report.iterations,
            report.objective,
            report.num_selected,
            result.beta.len()
        );

        self.coefficients = result.beta;
        self.report = Some(report.clone());
        self.state = FitState::Fitted;
        Ok(report)
    }

    /// Computes `X_new · β` for a fitted estimator.
    pub fn predict<X: DesignMatrix + ?Sized>(
        &self,
        x_new: &X,
    ) -> Result<Array1<f64>, EstimationError> {
        self.ensure_fitted()?;
        check_dimension(
            "prediction matrix columns",
            self.coefficients.len(),
            x_new.n_features(),
        )?;
        Ok(x_new.product(self.coefficients.view()))
    }

    /// Indices of features whose coefficient magnitude exceeds the selection threshold.
    pub fn selected_features(&self) -> Result<Vec<usize>, EstimationError> {
        self.ensure_fitted()?;
        let threshold = self.config.selection_threshold;
        Ok(self
            .coefficients
            .iter()
            .enumerate()
            .filter(|(_, b)| b.abs() > threshold)
            .map(|(j, _)| j)
            .collect())
    }

    /// `L(β)` on `(x, y)` at the current coefficients.
    pub fn objective<X: DesignMatrix + ?Sized>(
        &self,
        x: &X,
        y: ArrayView1<f64>,
    ) -> Result<f64, EstimationError> {
        check_dimension("target length", x.n_samples(), y.len())?;
        check_dimension(
            "design matrix columns",
            self.coefficients.len(),
            x.n_features(),
        )?;
        if x.n_samples() == 0 {
            return Err(EstimationError::EmptyDesign);
        }
        Ok(coordinate::objective(
            x,
            y,
            &self.operator,
            self.coefficients.view(),
            self.config.lambda1,
            self.config.lambda2,
        ))
    }

    fn ensure_fitted(&self) -> Result<(), EstimationError> {
        match self.state {
            FitState::Fitted => Ok(()),
            FitState::Unfit | FitState::Fitting => Err(EstimationError::NotFitted),
        }
    }
}

fn check_dimension(what: &'static str, expected: usize, found: usize) -> Result<(), EstimationError> {
    if expected == found {
        Ok(())
    } else {
        Err(EstimationError::DimensionMismatch {
            what,
            expected,
            found,
        })
    }
}

/// Fits one independent estimator per column of `ys` in parallel.
///
/// Every estimator shares `operator` read-only and owns its own coefficients.
/// Results are returned in column order.
pub fn fit_phenotypes<X>(
    operator: &Arc<IncidenceOperator>,
    config: &NcLassoConfig,
    x: &X,
    ys: ArrayView2<f64>,
) -> Result<Vec<NcLasso>, EstimationError>
where
    X: DesignMatrix + Sync + ?Sized,
{
    check_dimension("phenotype matrix rows", x.n_samples(), ys.nrows())?;
    config.validate()?;

    log::info!(
        "Fitting {} phenotypes in parallel against a shared network of {} edges",
        ys.ncols(),
        operator.num_edges()
    );

    (0..ys.ncols())
        .into_par_iter()
        .map(|k| -> Result<NcLasso, EstimationError> {
            let mut model = NcLasso::new(Arc::clone(operator), config.clone())?;
            model.fit(x, ys.column(k))?;
            Ok(model)
        })
        .collect()
}
