//! # Feature Network
//!
//! An undirected, weighted graph over the `p` features of a design matrix (genes,
//! regions, SNPs). The graph is stored as an explicit edge list in coordinate
//! form; gene networks routinely carry millions of edges over tens of thousands of
//! vertices, so nothing here ever materialises a `p × p` array.
//!
//! Degree accounting follows one fixed rule: every edge `(u, v, w)` adds the full
//! weight `w` to the degree of `u` and the full weight `w` to the degree of `v`.
//! The incidence operator normalises by these degrees, so this rule sets the scale
//! of the network penalty and must not be altered to split weights between endpoints.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while assembling a feature graph or deriving operators from it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Edge ({u}, {v}) references vertex {vertex}, but the graph only has {num_vertices} vertices.")]
    VertexOutOfRange {
        u: usize,
        v: usize,
        vertex: usize,
        num_vertices: usize,
    },

    #[error("Edge ({vertex}, {vertex}) is a self loop. Feature graphs must not connect a vertex to itself.")]
    SelfLoop { vertex: usize },

    #[error("Edge ({u}, {v}) has weight {weight}, but edge weights must be finite and non-negative.")]
    InvalidWeight { u: usize, v: usize, weight: f64 },

    #[error(
        "Vertex {vertex} participates in edge {edge} but has zero accumulated degree. The graph is degenerate."
    )]
    DegenerateGraph { vertex: usize, edge: usize },

    #[error("Length mismatch for {what}: expected {expected}, found {found}.")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}

/// A single undirected weighted edge between two distinct features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub u: usize,
    pub v: usize,
    pub weight: f64,
}

/// An undirected weighted graph over the vertex set `{0..num_vertices}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureGraph {
    num_vertices: usize,
    edges: Vec<Edge>,
}

impl FeatureGraph {
    /// Creates an edgeless graph over `num_vertices` features.
    pub fn new(num_vertices: usize) -> Self {
        Self {
            num_vertices,
            edges: Vec::new(),
        }
    }

    /// Builds a graph from `(u, v, weight)` triples, validating each one.
    ///
    /// Edge order is preserved; it determines which operator row belongs to which edge.
    pub fn from_edges<I>(num_vertices: usize, edges: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let iter = edges.into_iter();
        let mut graph = Self {
            num_vertices,
            edges: Vec::with_capacity(iter.size_hint().0),
        };
        for (u, v, weight) in iter {
            graph.add_edge(u, v, weight)?;
        }
        Ok(graph)
    }

    /// Appends one undirected edge.
    ///
    /// Rejects out-of-range endpoints, self loops and weights that are negative or
    /// non-finite.
    ///
    /// Zero weights are accepted, which is looser than a strict `weight > 0` edge
    /// model. A zero-weight edge contributes nothing to either degree. If that leaves
    /// an endpoint with degree zero, [`IncidenceOperator::from_graph`] rejects the
    /// graph with [`GraphError::DegenerateGraph`]; otherwise the edge becomes an
    /// all-zero operator row that adds nothing to the penalty.
    ///
    /// [`IncidenceOperator::from_graph`]: crate::IncidenceOperator::from_graph
    pub fn add_edge(&mut self, u: usize, v: usize, weight: f64) -> Result<(), GraphError> {
        for vertex in [u, v] {
            if vertex >= self.num_vertices {
                return Err(GraphError::VertexOutOfRange {
                    u,
                    v,
                    vertex,
                    num_vertices: self.num_vertices,
                });
            }
        }
        if u == v {
            return Err(GraphError::SelfLoop { vertex: u });
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(GraphError::InvalidWeight { u, v, weight });
        }
        self.edges.push(Edge { u, v, weight });
        Ok(())
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Accumulated degree of every vertex, indexed by vertex id.
    ///
    /// Each edge contributes its full weight to both endpoints. Isolated vertices
    /// have degree zero.
    pub fn degrees(&self) -> Vec<f64> {
        let mut degree = vec![0.0; self.num_vertices];
        for edge in &self.edges {
            degree[edge.u] += edge.weight;
            degree[edge.v] += edge.weight;
        }
        degree
    }
}
