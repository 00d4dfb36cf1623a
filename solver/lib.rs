#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

//! Network-constrained sparse linear regression ("ncLasso") for genotype matrices.
//!
//! The crate fits
//!
//! ```text
//! L(β) = (1/2n) ||y - Xβ||²  +  λ1 ||β||₁  +  λ2 ||Tβ||²
//! ```
//!
//! where `T` is the incidence operator of a weighted feature network. The pieces are:
//!
//! - [`graph`]: the undirected weighted feature graph and its degree accounting.
//! - [`incidence`]: the sparse incidence operator built from the graph.
//! - [`design`]: dense and sparse design matrices behind one column-access trait.
//! - [`model`]: solver configuration and fit reports.
//! - [`estimate`]: the stateful `NcLasso` estimator.

pub mod coordinate;
pub mod design;
pub mod estimate;
pub mod graph;
pub mod incidence;
pub mod model;

pub use design::{DesignMatrix, SparseGenotypeMatrix};
pub use estimate::{EstimationError, FitState, NcLasso, fit_phenotypes};
pub use graph::{Edge, FeatureGraph, GraphError};
pub use incidence::{IncidenceOperator, IncidenceRow};
pub use model::{FitReport, FitStatus, ModelError, NcLassoConfig};
