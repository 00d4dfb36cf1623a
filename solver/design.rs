//! # Design Matrices
//!
//! The solver only ever needs a design matrix column by column: an inner product
//! with the residual, a scaled update of the residual, and the column's squared
//! norm. [`DesignMatrix`] captures exactly that access pattern so that a dense
//! `ndarray` matrix and a column-compressed genotype matrix can be fitted by the
//! same code.
//!
//! Genotype calls (0/1/2 alternate-allele counts) are mostly zero for rare
//! variants, which is what [`SparseGenotypeMatrix`] is for.

use ndarray::{Array1, ArrayBase, ArrayView1, ArrayView2, Data, Ix2};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DesignError {
    #[error(
        "Entry ({row}, {col}) lies outside a design matrix of shape ({n_samples}, {n_features})."
    )]
    EntryOutOfRange {
        row: usize,
        col: usize,
        n_samples: usize,
        n_features: usize,
    },
    #[error("Entry ({row}, {col}) has non-finite value {value}. Genotype values must be finite.")]
    NonFiniteValue { row: usize, col: usize, value: f64 },
}

/// Column-wise access to an `n_samples × n_features` design matrix.
pub trait DesignMatrix {
    fn n_samples(&self) -> usize;
    fn n_features(&self) -> usize;

    /// `X_jᵀ v` for column `j`.
    fn column_dot(&self, j: usize, v: ArrayView1<f64>) -> f64;

    /// `out += alpha * X_j` for column `j`.
    fn column_axpy(&self, j: usize, alpha: f64, out: &mut Array1<f64>);

    /// `||X_j||²` for column `j`.
    fn column_sq_norm(&self, j: usize) -> f64;

    /// `Xβ`.
    fn product(&self, beta: ArrayView1<f64>) -> Array1<f64> {
        let mut out = Array1::zeros(self.n_samples());
        for (j, &b) in beta.iter().enumerate() {
            if b != 0.0 {
                self.column_axpy(j, b, &mut out);
            }
        }
        out
    }
}

impl<S> DesignMatrix for ArrayBase<S, Ix2>
where
    S: Data<Elem = f64>,
{
    fn n_samples(&self) -> usize {
        self.nrows()
    }

    fn n_features(&self) -> usize {
        self.ncols()
    }

    fn column_dot(&self, j: usize, v: ArrayView1<f64>) -> f64 {
        self.column(j).dot(&v)
    }

    fn column_axpy(&self, j: usize, alpha: f64, out: &mut Array1<f64>) {
        out.scaled_add(alpha, &self.column(j));
    }

    fn column_sq_norm(&self, j: usize) -> f64 {
        let column = self.column(j);
        column.dot(&column)
    }

    fn product(&self, beta: ArrayView1<f64>) -> Array1<f64> {
        self.dot(&beta)
    }
}

/// A genotype matrix in compressed sparse column form.
///
/// Only nonzero calls are stored. Within a column, row indices are strictly
/// increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseGenotypeMatrix {
    n_samples: usize,
    n_features: usize,
    col_offsets: Vec<usize>,
    row_indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseGenotypeMatrix {
    /// Compresses a dense matrix, dropping exact zeros.
    pub fn from_dense(dense: ArrayView2<f64>) -> Result<Self, DesignError> {
        let (n_samples, n_features) = dense.dim();
        let mut col_offsets = Vec::with_capacity(n_features + 1);
        let mut row_indices = Vec::new();
        let mut values = Vec::new();
        col_offsets.push(0);
        for (col, column) in dense.columns().into_iter().enumerate() {
            for (row, &value) in column.iter().enumerate() {
                if !value.is_finite() {
                    return Err(DesignError::NonFiniteValue { row, col, value });
                }
                if value != 0.0 {
                    row_indices.push(row);
                    values.push(value);
                }
            }
            col_offsets.push(row_indices.len());
        }
        Ok(Self {
            n_samples,
            n_features,
            col_offsets,
            row_indices,
            values,
        })
    }

    /// Assembles a matrix from `(row, col, value)` triples in any order.
    ///
    /// Repeated coordinates are summed. Zeros, including sums that cancel, are dropped.
    pub fn from_triplets<I>(
        n_samples: usize,
        n_features: usize,
        triplets: I,
    ) -> Result<Self, DesignError>
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut columns: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n_features];
        for (row, col, value) in triplets {
            if row >= n_samples || col >= n_features {
                return Err(DesignError::EntryOutOfRange {
                    row,
                    col,
                    n_samples,
                    n_features,
                });
            }
            if !value.is_finite() {
                return Err(DesignError::NonFiniteValue { row, col, value });
            }
            columns[col].push((row, value));
        }

        let mut col_offsets = Vec::with_capacity(n_features + 1);
        let mut row_indices = Vec::new();
        let mut values = Vec::new();
        col_offsets.push(0);
        for mut column in columns {
            column.sort_by_key(|&(row, _)| row);
            let mut iter = column.into_iter().peekable();
            while let Some((row, mut value)) = iter.next() {
                while let Some(&(next_row, next_value)) = iter.peek() {
                    if next_row != row {
                        break;
                    }
                    value += next_value;
                    iter.next();
                }
                if value != 0.0 {
                    row_indices.push(row);
                    values.push(value);
                }
            }
            col_offsets.push(row_indices.len());
        }

        Ok(Self {
            n_samples,
            n_features,
            col_offsets,
            row_indices,
            values,
        })
    }

    /// Number of stored nonzeros.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    fn column_range(&self, j: usize) -> std::ops::Range<usize> {
        self.col_offsets[j]..self.col_offsets[j + 1]
    }
}

impl DesignMatrix for SparseGenotypeMatrix {
    fn n_samples(&self) -> usize {
        self.n_samples
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn column_dot(&self, j: usize, v: ArrayView1<f64>) -> f64 {
        let range = self.column_range(j);
        self.row_indices[range.clone()]
            .iter()
            .zip(&self.values[range])
            .map(|(&row, &value)| value * v[row])
            .sum()
    }

    fn column_axpy(&self, j: usize, alpha: f64, out: &mut Array1<f64>) {
        let range = self.column_range(j);
        for (&row, &value) in self.row_indices[range.clone()]
            .iter()
            .zip(&self.values[range])
        {
            out[row] += alpha * value;
        }
    }

    fn column_sq_norm(&self, j: usize) -> f64 {
        self.values[self.column_range(j)]
            .iter()
            .map(|value| value * value)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn genotypes() -> ndarray::Array2<f64> {
        array![
            [0.0, 2.0, 1.0],
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 2.0],
            [2.0, 1.0, 0.0],
        ]
    }

    #[test]
    fn sparse_and_dense_column_access_agree() {
        let dense = genotypes();
        let sparse = SparseGenotypeMatrix::from_dense(dense.view()).unwrap();
        assert_eq!(sparse.nnz(), 6);
        assert_eq!(sparse.n_samples(), 4);
        assert_eq!(sparse.n_features(), 3);

        let v = array![0.5, -1.0, 2.0, 0.25];
        for j in 0..3 {
            assert_abs_diff_eq!(
                sparse.column_dot(j, v.view()),
                dense.column_dot(j, v.view()),
                epsilon = 1e-12
            );
            assert_abs_diff_eq!(
                sparse.column_sq_norm(j),
                DesignMatrix::column_sq_norm(&dense, j),
                epsilon = 1e-12
            );

            let mut from_sparse = Array1::zeros(4);
            let mut from_dense = Array1::zeros(4);
            sparse.column_axpy(j, 1.5, &mut from_sparse);
            dense.column_axpy(j, 1.5, &mut from_dense);
            assert_abs_diff_eq!(from_sparse, from_dense, epsilon = 1e-12);
        }

        let beta = array![1.0, -0.5, 0.25];
        assert_abs_diff_eq!(
            sparse.product(beta.view()),
            dense.dot(&beta),
            epsilon = 1e-12
        );
    }

    #[test]
    fn triplets_sum_duplicates_and_drop_cancellations() {
        let sparse = SparseGenotypeMatrix::from_triplets(
            3,
            2,
            [(2, 0, 1.0), (0, 0, 2.0), (2, 0, 1.0), (1, 1, 1.0), (1, 1, -1.0)],
        )
        .unwrap();
        assert_eq!(sparse.nnz(), 2);
        let expected = SparseGenotypeMatrix::from_dense(array![[2.0, 0.0], [0.0, 0.0], [2.0, 0.0]].view())
            .unwrap();
        assert_eq!(sparse, expected);
    }

    #[test]
    fn triplets_reject_bad_entries() {
        assert!(matches!(
            SparseGenotypeMatrix::from_triplets(2, 2, [(2, 0, 1.0)]),
            Err(DesignError::EntryOutOfRange { row: 2, .. })
        ));
        assert!(matches!(
            SparseGenotypeMatrix::from_triplets(2, 2, [(0, 1, f64::INFINITY)]),
            Err(DesignError::NonFiniteValue { col: 1, .. })
        ));
    }
}
