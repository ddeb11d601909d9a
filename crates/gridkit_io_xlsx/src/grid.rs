//! Grid backend abstraction and the in-memory sparse grid.
//!
//! The kernel never owns a grid: every operation borrows one supplied by the
//! caller. Backends decide their own addressable limits.

use std::collections::BTreeMap;

use crate::conf::{N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX};
use crate::spec::{EnumCellValue, GridError, SpecCellRef};

/// Two-dimensional sparse store addressed by [`SpecCellRef`].
pub trait Grid {
    /// Value at `cell`, or [`EnumCellValue::None`] if unset.
    fn get(&self, cell: &SpecCellRef) -> Result<EnumCellValue, GridError>;

    /// Overwrite `cell`; writing `None` or `""` clears it.
    fn set(&mut self, cell: &SpecCellRef, value: EnumCellValue) -> Result<(), GridError>;

    /// Last addressable column (1-based).
    fn n_cols_max(&self) -> u32 {
        N_NCOLS_EXCEL_MAX
    }

    /// Last addressable row (1-based).
    fn n_rows_max(&self) -> u32 {
        N_NROWS_EXCEL_MAX
    }

    /// Used extent `(max_row, max_col)`, when the backend knows it.
    fn dimensions(&self) -> Option<(u32, u32)> {
        None
    }
}

/// Sparse in-memory grid keyed by `(row, col)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryGrid {
    dict_cells: BTreeMap<(u32, u32), EnumCellValue>,
    n_rows_max: u32,
    n_cols_max: u32,
}

impl Default for MemoryGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGrid {
    /// Empty grid with Excel limits.
    pub fn new() -> Self {
        Self::with_limits(N_NROWS_EXCEL_MAX, N_NCOLS_EXCEL_MAX)
    }

    /// Empty grid with custom limits.
    pub fn with_limits(n_rows_max: u32, n_cols_max: u32) -> Self {
        Self {
            dict_cells: BTreeMap::new(),
            n_rows_max,
            n_cols_max,
        }
    }

    /// Build from row-major values starting at `A1`; `None` entries stay unset.
    pub fn from_rows<R, V>(rows: R) -> Result<Self, GridError>
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = V>,
        V: Into<EnumCellValue>,
    {
        let mut grid = Self::new();
        for (idx_row, row) in rows.into_iter().enumerate() {
            for (idx_col, value) in row.into_iter().enumerate() {
                let cell = SpecCellRef::new(cast_index(idx_col)?, cast_index(idx_row)?)?;
                grid.set(&cell, value.into())?;
            }
        }
        Ok(grid)
    }

    /// Number of non-empty cells.
    pub fn len(&self) -> usize {
        self.dict_cells.len()
    }

    /// Whether no cell is set.
    pub fn is_empty(&self) -> bool {
        self.dict_cells.is_empty()
    }

    /// Iterate non-empty cells in row-major order as `((row, col), value)`.
    pub fn iter(&self) -> impl Iterator<Item = (&(u32, u32), &EnumCellValue)> {
        self.dict_cells.iter()
    }

    fn validate_limits(&self, cell: &SpecCellRef) -> Result<(), GridError> {
        if cell.col() > self.n_cols_max {
            return Err(GridError::Backend(format!(
                "Column {} of {cell} exceeds the grid limit of {} columns.",
                cell.col_label(),
                self.n_cols_max
            )));
        }
        if cell.row() > self.n_rows_max {
            return Err(GridError::Backend(format!(
                "Row {} of {cell} exceeds the grid limit of {} rows.",
                cell.row(),
                self.n_rows_max
            )));
        }
        Ok(())
    }
}

impl Grid for MemoryGrid {
    fn get(&self, cell: &SpecCellRef) -> Result<EnumCellValue, GridError> {
        self.validate_limits(cell)?;
        Ok(self
            .dict_cells
            .get(&(cell.row(), cell.col()))
            .cloned()
            .unwrap_or_default())
    }

    fn set(&mut self, cell: &SpecCellRef, value: EnumCellValue) -> Result<(), GridError> {
        self.validate_limits(cell)?;
        let key = (cell.row(), cell.col());
        if value.is_empty() {
            self.dict_cells.remove(&key);
        } else {
            self.dict_cells.insert(key, value);
        }
        Ok(())
    }

    fn n_cols_max(&self) -> u32 {
        self.n_cols_max
    }

    fn n_rows_max(&self) -> u32 {
        self.n_rows_max
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        let n_row_max = self.dict_cells.keys().map(|(row, _)| *row).max()?;
        let n_col_max = self.dict_cells.keys().map(|(_, col)| *col).max()?;
        Some((n_row_max, n_col_max))
    }
}

fn cast_index(idx_zero_based: usize) -> Result<u32, GridError> {
    u32::try_from(idx_zero_based + 1)
        .map_err(|_| GridError::Backend(format!("index overflow: {idx_zero_based}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_cells_read_as_none() {
        let grid = MemoryGrid::new();
        let cell = SpecCellRef::parse("C3").expect("C3");
        assert_eq!(grid.get(&cell).expect("get"), EnumCellValue::None);
        assert_eq!(grid.dimensions(), None);
    }

    #[test]
    fn writing_none_clears_cell() {
        let mut grid = MemoryGrid::new();
        let cell = SpecCellRef::parse("B2").expect("B2");
        grid.set(&cell, EnumCellValue::from("x")).expect("set");
        assert_eq!(grid.len(), 1);
        grid.set(&cell, EnumCellValue::None).expect("clear");
        assert!(grid.is_empty());

        grid.set(&cell, EnumCellValue::from("x")).expect("set");
        grid.set(&cell, EnumCellValue::from("")).expect("clear with empty text");
        assert!(grid.is_empty());
        assert_eq!(grid.get(&cell).expect("get"), EnumCellValue::None);
    }

    #[test]
    fn limits_are_backend_errors() {
        let mut grid = MemoryGrid::with_limits(10, 3);
        let cell = SpecCellRef::parse("D1").expect("D1");
        assert!(matches!(grid.get(&cell), Err(GridError::Backend(_))));
        assert!(matches!(
            grid.set(&cell, EnumCellValue::Number(1.0)),
            Err(GridError::Backend(_))
        ));
        let cell = SpecCellRef::parse("A11").expect("A11");
        assert!(matches!(grid.get(&cell), Err(GridError::Backend(_))));
    }

    #[test]
    fn from_rows_skips_none_and_tracks_dimensions() {
        let grid = MemoryGrid::from_rows(vec![
            vec![Some(1.0), None, Some(3.0)],
            vec![None, Some(5.0)],
        ])
        .expect("grid");
        assert_eq!(grid.len(), 3);
        assert_eq!(grid.dimensions(), Some((2, 3)));
    }
}
