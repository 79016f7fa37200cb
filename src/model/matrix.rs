use itertools::Itertools;
use crate::error::{HeuristicError, HeuristicResult};

/// Compressed storage of one orientation of a sparse matrix.
/// Line `i` owns the entries `starts[i]..starts[i + 1]`.
#[derive(Clone, Debug, Default)]
pub struct SparseLines {
    starts: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseLines {
    /// `entries` must be sorted by line
    fn from_sorted(num_lines: usize, entries: &[(usize, usize, f64)]) -> Self {
        let mut starts = vec![0; num_lines + 1];
        for (line, _, _) in entries {
            starts[line + 1] += 1;
        }
        for i in 0..num_lines {
            starts[i + 1] += starts[i];
        }

        SparseLines {
            starts,
            indices: entries.iter().map(|e| e.1).collect(),
            values: entries.iter().map(|e| e.2).collect(),
        }
    }

    pub fn num_lines(&self) -> usize {
        self.starts.len().saturating_sub(1)
    }

    pub fn line_len(&self, line: usize) -> usize {
        self.starts[line + 1] - self.starts[line]
    }

    /// (index, value) pairs of one line
    pub fn line(&self, line: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.starts[line]..self.starts[line + 1];
        self.indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }
}

/// Constraint matrix kept both by column and by row,
/// built once per problem and shared read-only afterwards
#[derive(Clone, Debug, Default)]
pub struct PackedMatrix {
    num_rows: usize,
    num_cols: usize,
    by_col: SparseLines,
    by_row: SparseLines,
}

impl PackedMatrix {
    /// Build from (row, column, value) triplets.
    /// Duplicate entries are summed, explicit zeros dropped.
    pub fn from_triplets(num_rows: usize, num_cols: usize, triplets: &[(usize, usize, f64)]) -> HeuristicResult<Self> {
        if let Some(&(row, col, _)) = triplets.iter().find(|(r, c, _)| *r >= num_rows || *c >= num_cols) {
            return Err(HeuristicError::MatrixIndex { row, col });
        }

        let merged: Vec<(usize, usize, f64)> = triplets
            .iter()
            .copied()
            .sorted_by_key(|&(r, c, _)| (r, c))
            .coalesce(|a, b| {
                if (a.0, a.1) == (b.0, b.1) {
                    Ok((a.0, a.1, a.2 + b.2))
                } else {
                    Err((a, b))
                }
            })
            .filter(|e| e.2 != 0.0)
            .collect();

        let by_row = SparseLines::from_sorted(num_rows, &merged);

        let transposed: Vec<(usize, usize, f64)> = merged
            .iter()
            .map(|&(r, c, v)| (c, r, v))
            .sorted_by_key(|&(c, r, _)| (c, r))
            .collect();
        let by_col = SparseLines::from_sorted(num_cols, &transposed);

        Ok(PackedMatrix {
            num_rows,
            num_cols,
            by_col,
            by_row,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn num_elements(&self) -> usize {
        self.by_row.indices.len()
    }

    pub fn by_col(&self) -> &SparseLines {
        &self.by_col
    }

    pub fn by_row(&self) -> &SparseLines {
        &self.by_row
    }

    /// (row, value) entries of a column
    pub fn column(&self, col: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.by_col.line(col)
    }

    /// (column, value) entries of a row
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.by_row.line(row)
    }

    /// Row activities `A x`
    pub fn activities(&self, x: &[f64]) -> Vec<f64> {
        (0..self.num_rows)
            .map(|r| self.row(r).map(|(c, v)| v * x[c]).sum())
            .collect()
    }
}
