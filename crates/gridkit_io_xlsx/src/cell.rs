//! Single-cell accessor with the read-side coercion policy.

use crate::grid::Grid;
use crate::spec::{EnumCellValue, GridError, SpecCellReadPolicy, SpecCellRef};
use crate::util::coerce_cell_value;

/// Read one cell; empty cells come back as [`EnumCellValue::None`].
///
/// Numeric-looking text is normalized by `policy` (see
/// [`coerce_cell_value`]); the token `inf` reads as the finite sentinel.
pub fn read_cell<G: Grid + ?Sized>(
    grid: &G,
    cell: &SpecCellRef,
    policy: &SpecCellReadPolicy,
) -> Result<EnumCellValue, GridError> {
    let value = grid.get(cell)?;
    Ok(coerce_cell_value(value, policy))
}

/// [`read_cell`] addressed by column label and row number.
pub fn read_cell_at<G: Grid + ?Sized>(
    grid: &G,
    col_label: &str,
    row: u32,
    policy: &SpecCellReadPolicy,
) -> Result<EnumCellValue, GridError> {
    read_cell(grid, &SpecCellRef::from_label(col_label, row)?, policy)
}

/// Overwrite one cell, creating it if absent.
pub fn write_cell<G: Grid + ?Sized>(
    grid: &mut G,
    cell: &SpecCellRef,
    value: impl Into<EnumCellValue>,
) -> Result<(), GridError> {
    grid.set(cell, value.into())
}

/// [`write_cell`] addressed by column label and row number.
pub fn write_cell_at<G: Grid + ?Sized>(
    grid: &mut G,
    col_label: &str,
    row: u32,
    value: impl Into<EnumCellValue>,
) -> Result<(), GridError> {
    write_cell(grid, &SpecCellRef::from_label(col_label, row)?, value)
}

/// Whether the cell holds anything at all (the scan presence test).
///
/// An empty string is absent, whatever the backend stores.
pub fn is_cell_present<G: Grid + ?Sized>(grid: &G, cell: &SpecCellRef) -> Result<bool, GridError> {
    Ok(!grid.get(cell)?.is_empty())
}
