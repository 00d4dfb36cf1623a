//! # Incidence Operator
//!
//! Converts a [`FeatureGraph`] into the sparse linear operator `T` used by the
//! network penalty `λ2 ||Tβ||²`. The operator has one row per edge, in edge-list
//! order, and exactly two nonzero entries per row:
//!
//! ```text
//! T[i, u] = +sqrt(w / degree(u))
//! T[i, v] = -sqrt(w / degree(v))
//! ```
//!
//! so `||Tβ||²` sums the degree-normalised squared differences between the
//! coefficients of connected features.
//!
//! Storage is row-wise (one [`IncidenceRow`] per edge) plus a column index built
//! once at construction, which the coordinate-descent kernel uses to touch only the
//! edges incident to the feature being updated. The operator is never mutated after
//! construction and is meant to be shared read-only, e.g. behind an `Arc`.

use crate::graph::{FeatureGraph, GraphError};
use ndarray::{Array1, Array2, ArrayView1};

/// One row of the incidence operator, i.e. one edge of the feature graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncidenceRow {
    pub u: usize,
    pub v: usize,
    /// Entry at column `u`; always non-negative.
    pub value_u: f64,
    /// Entry at column `v`; always non-positive.
    pub value_v: f64,
}

/// A single nonzero of a column: `(row index, value)`.
type ColumnEntry = (usize, f64);

#[derive(Debug, Clone)]
pub struct IncidenceOperator {
    num_features: usize,
    rows: Vec<IncidenceRow>,
    degrees: Vec<f64>,
    // Compressed column index into the same nonzeros as `rows`.
    column_offsets: Vec<usize>,
    column_entries: Vec<ColumnEntry>,
    column_sq_norms: Vec<f64>,
}

impl IncidenceOperator {
    /// Builds the operator for `graph`.
    ///
    /// Fails with [`GraphError::DegenerateGraph`] if an endpoint of some edge has a
    /// zero accumulated degree, which can only happen when every edge touching that
    /// vertex carries zero weight.
    pub fn from_graph(graph: &FeatureGraph) -> Result<Self, GraphError> {
        let num_features = graph.num_vertices();
        let degrees = graph.degrees();

        let mut rows = Vec::with_capacity(graph.num_edges());
        for (index, edge) in graph.edges().iter().enumerate() {
            for vertex in [edge.u, edge.v] {
                if degrees[vertex] <= 0.0 {
                    return Err(GraphError::DegenerateGraph {
                        vertex,
                        edge: index,
                    });
                }
            }
            rows.push(IncidenceRow {
                u: edge.u,
                v: edge.v,
                value_u: (edge.weight / degrees[edge.u]).sqrt(),
                value_v: -(edge.weight / degrees[edge.v]).sqrt(),
            });
        }

        let (column_offsets, column_entries) = build_column_index(num_features, &rows);
        let column_sq_norms: Vec<f64> = (0..num_features)
            .map(|j| {
                column_entries[column_offsets[j]..column_offsets[j + 1]]
                    .iter()
                    .map(|&(_, value)| value * value)
                    .sum::<f64>()
            })
            .collect();

        log::debug!(
            "Built incidence operator: {} edges over {} features",
            rows.len(),
            num_features
        );

        Ok(Self {
            num_features,
            rows,
            degrees,
            column_offsets,
            column_entries,
            column_sq_norms,
        })
    }

    /// Validates `(u, v, weight)` triples into a graph and builds its operator.
    pub fn from_edges<I>(num_features: usize, edges: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let graph = FeatureGraph::from_edges(num_features, edges)?;
        Self::from_graph(&graph)
    }

    /// An operator with no rows. With it the solver reduces to a plain Lasso.
    pub fn empty(num_features: usize) -> Self {
        Self {
            num_features,
            rows: Vec::new(),
            degrees: vec![0.0; num_features],
            column_offsets: vec![0; num_features + 1],
            column_entries: Vec::new(),
            column_sq_norms: vec![0.0; num_features],
        }
    }

    /// Number of rows (edges).
    pub fn num_edges(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns (features).
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Vertex degrees used for normalisation.
    pub fn degrees(&self) -> &[f64] {
        &self.degrees
    }

    pub fn rows(&self) -> &[IncidenceRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&IncidenceRow> {
        self.rows.get(index)
    }

    /// Nonzeros of column `j` as `(row, value)` pairs.
    pub fn column(&self, j: usize) -> &[(usize, f64)] {
        &self.column_entries[self.column_offsets[j]..self.column_offsets[j + 1]]
    }

    /// `||T_j||²` for column `j`.
    pub fn column_sq_norm(&self, j: usize) -> f64 {
        self.column_sq_norms[j]
    }

    /// Computes `Tβ`, failing with [`GraphError::LengthMismatch`] unless
    /// `beta.len() == self.num_features()`.
    pub fn apply(&self, beta: ArrayView1<f64>) -> Result<Array1<f64>, GraphError> {
        check_length("coefficient vector", self.num_features, beta.len())?;
        Ok(self.product(beta))
    }

    /// Computes `Tᵀs`, failing with [`GraphError::LengthMismatch`] unless
    /// `s.len() == self.num_edges()`.
    pub fn apply_transpose(&self, s: ArrayView1<f64>) -> Result<Array1<f64>, GraphError> {
        check_length("edge vector", self.rows.len(), s.len())?;
        let mut out = Array1::zeros(self.num_features);
        for (row, &value) in self.rows.iter().zip(s.iter()) {
            out[row.u] += row.value_u * value;
            out[row.v] += row.value_v * value;
        }
        Ok(out)
    }

    /// The network penalty `||Tβ||²` without the `λ2` factor.
    pub fn penalty(&self, beta: ArrayView1<f64>) -> Result<f64, GraphError> {
        Ok(self.apply(beta)?.iter().map(|t| t * t).sum())
    }

    // Unchecked `Tβ` for callers that have already validated the length.
    pub(crate) fn product(&self, beta: ArrayView1<f64>) -> Array1<f64> {
        debug_assert_eq!(beta.len(), self.num_features);
        self.rows
            .iter()
            .map(|row| row.value_u * beta[row.u] + row.value_v * beta[row.v])
            .collect()
    }

    /// Materialises the operator as a dense `(num_edges, num_features)` matrix.
    ///
    /// Intended for inspecting small graphs only.
    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.rows.len(), self.num_features));
        for (i, row) in self.rows.iter().enumerate() {
            dense[[i, row.u]] += row.value_u;
            dense[[i, row.v]] += row.value_v;
        }
        dense
    }
}

fn check_length(what: &'static str, expected: usize, found: usize) -> Result<(), GraphError> {
    if expected == found {
        Ok(())
    } else {
        Err(GraphError::LengthMismatch {
            what,
            expected,
            found,
        })
    }
}

fn build_column_index(num_features: usize, rows: &[IncidenceRow]) -> (Vec<usize>, Vec<ColumnEntry>) {
    let mut counts = vec![0usize; num_features + 1];
    for row in rows {
        counts[row.u + 1] += 1;
        counts[row.v + 1] += 1;
    }
    for j in 0..num_features {
        counts[j + 1] += counts[j];
    }
    let offsets = counts;

    let mut cursor = offsets.clone();
    let mut entries = vec![(0usize, 0.0f64); 2 * rows.len()];
    for (i, row) in rows.iter().enumerate() {
        entries[cursor[row.u]] = (i, row.value_u);
        cursor[row.u] += 1;
        entries[cursor[row.v]] = (i, row.value_v);
        cursor[row.v] += 1;
    }
    (offsets, entries)
}
