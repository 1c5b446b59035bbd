//! Checked features × samples matrix.
//!
//! Rows are features, columns are samples. The matrix is supplied once per
//! pipeline run and never mutated afterwards; every consumer borrows views.

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

/// A features × samples grid of finite reals.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataMatrix {
    values: Array2<f64>,
}

impl DataMatrix {
    /// Wrap an owned array, rejecting empty shapes and non-finite entries.
    pub fn new(values: Array2<f64>) -> Result<Self> {
        if values.nrows() == 0 || values.ncols() == 0 {
            return Err(Error::EmptyInput);
        }
        if let Some(((r, c), v)) = values.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::invalid_matrix(format!(
                "non-finite value {v} at feature {r}, sample {c}"
            )));
        }
        Ok(Self { values })
    }

    /// Build from row vectors (one per feature).
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::EmptyInput);
        }
        let n = rows[0].len();
        let mut flat = Vec::with_capacity(rows.len() * n);
        for row in rows {
            if row.len() != n {
                return Err(Error::DimensionMismatch {
                    expected: n,
                    found: row.len(),
                });
            }
            flat.extend_from_slice(row);
        }
        let values = Array2::from_shape_vec((rows.len(), n), flat).map_err(|e| {
            Error::ShapeMismatch {
                expected: format!("{} x {}", rows.len(), n),
                actual: e.to_string(),
            }
        })?;
        Self::new(values)
    }

    /// Number of features (rows).
    pub fn n_features(&self) -> usize {
        self.values.nrows()
    }

    /// Number of samples (columns).
    pub fn n_samples(&self) -> usize {
        self.values.ncols()
    }

    /// Borrow the underlying array.
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Borrow one feature row.
    pub fn row(&self, feature: usize) -> ArrayView1<'_, f64> {
        self.values.row(feature)
    }

    /// Copy of the columns at `indices`, in that order.
    pub fn select_samples(&self, indices: &[usize]) -> Array2<f64> {
        self.values.select(Axis(1), indices)
    }

    /// Check the matrix is usable for non-negative factorization.
    ///
    /// Rejects negative entries and rows with no spread, which carry no
    /// information and make the factor rows collapse to the floor.
    pub fn validate_non_negative(&self) -> Result<()> {
        if let Some(((r, c), v)) = self.values.indexed_iter().find(|(_, v)| **v < 0.0) {
            return Err(Error::invalid_matrix(format!(
                "negative value {v} at feature {r}, sample {c}"
            )));
        }
        for (r, row) in self.values.outer_iter().enumerate() {
            let first = row[0];
            if row.iter().all(|&v| v == first) {
                return Err(Error::invalid_matrix(format!(
                    "feature {r} is constant ({first})"
                )));
            }
        }
        Ok(())
    }

    /// Consume into the owned array.
    pub fn into_inner(self) -> Array2<f64> {
        self.values
    }
}

impl TryFrom<Array2<f64>> for DataMatrix {
    type Error = Error;

    fn try_from(values: Array2<f64>) -> Result<Self> {
        Self::new(values)
    }
}
