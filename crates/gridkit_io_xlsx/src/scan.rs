//! Range/matrix scanners, lookups and bulk writers.
//!
//! Scans terminate on content, not on length: the first empty presence cell
//! ends the run. Data that legitimately contains blank gaps is truncated at
//! the first gap.

use crate::cell::{is_cell_present, read_cell};
use crate::grid::Grid;
use crate::report::{ReportScan, ReportScanBuilder};
use crate::spec::{
    EnumCellValue, GridError, SpecCellReadPolicy, SpecCellRef, SpecMatrixScan,
    SpecScanRowOptions, SpecWriteRowOptions,
};
use crate::util::{decode_column_label, encode_column_label, is_cell_value_match};

////////////////////////////////////////////////////////////////////////////////
// #region RangeScanner

/// Read `column` downwards from `start_row` until the first empty cell.
///
/// Returns an empty vector when the starting cell itself is empty. Backend
/// errors propagate.
pub fn scan_column<G: Grid + ?Sized>(
    grid: &G,
    column: &str,
    start_row: u32,
    policy: &SpecCellReadPolicy,
) -> Result<Vec<EnumCellValue>, GridError> {
    let n_col = decode_column_label(column)?;
    SpecCellRef::new(n_col, start_row)?;

    let n_rows_max = grid.n_rows_max();
    let mut l_values = Vec::new();
    let mut n_row = start_row;
    while n_row <= n_rows_max {
        let value = read_cell(grid, &SpecCellRef::new(n_col, n_row)?, policy)?;
        if value.is_empty() {
            break;
        }
        l_values.push(value);

        let Some(n_row_next) = n_row.checked_add(1) else {
            break;
        };
        n_row = n_row_next;
    }
    Ok(l_values)
}

/// Read `row` rightwards from `start_column` while the presence cell is set.
///
/// The presence cell of column `c` is `(c, options.test_row)`, which defaults
/// to `row` itself. With a separate marker row the scan walks across blank
/// cells of `row`; those are returned as [`EnumCellValue::None`]. The scan
/// also stops after `options.column_end` (default: the grid's last column).
pub fn scan_row<G: Grid + ?Sized>(
    grid: &G,
    row: u32,
    start_column: &str,
    options: &SpecScanRowOptions,
) -> Result<Vec<EnumCellValue>, GridError> {
    if options.column_step == 0 {
        return Err(GridError::InvalidArgument(
            "column_step must be >= 1.".to_string(),
        ));
    }
    let n_col_start = decode_column_label(start_column)?;
    let n_col_end = match &options.column_end {
        Some(c_label) => decode_column_label(c_label)?,
        None => grid.n_cols_max(),
    };
    let n_row_test = options.test_row.unwrap_or(row);
    SpecCellRef::new(n_col_start, row)?;
    SpecCellRef::new(n_col_start, n_row_test)?;

    let mut l_values = Vec::new();
    let mut n_col = n_col_start;
    while n_col <= n_col_end {
        if !is_cell_present(grid, &SpecCellRef::new(n_col, n_row_test)?)? {
            break;
        }
        l_values.push(read_cell(
            grid,
            &SpecCellRef::new(n_col, row)?,
            &options.policy,
        )?);

        let Some(n_col_next) = n_col.checked_add(options.column_step) else {
            break;
        };
        n_col = n_col_next;
    }
    Ok(l_values)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MatrixScanner

/// Scan rows from `start_row` while `(start_column, row)` is set.
///
/// Each row is a [`scan_row`] from `start_column`, so rows may be ragged;
/// callers needing a rectangle pad themselves. `options.test_row` is ignored
/// here: every row is its own presence marker.
///
/// A backend failure inside one row skips that row and is recorded in the
/// returned report; a failure of the presence test ends the scan, also
/// recorded. Invalid arguments propagate.
pub fn scan_matrix<G: Grid + ?Sized>(
    grid: &G,
    start_column: &str,
    start_row: u32,
    options: &SpecScanRowOptions,
) -> Result<SpecMatrixScan, GridError> {
    let n_col = decode_column_label(start_column)?;
    SpecCellRef::new(n_col, start_row)?;
    log::debug!("scanning matrix from {start_column}{start_row}");

    let options_row = SpecScanRowOptions {
        test_row: None,
        ..options.clone()
    };

    let mut builder = ReportScanBuilder::default();
    let mut l_rows = Vec::new();
    let n_rows_max = grid.n_rows_max();
    let mut n_row = start_row;
    while n_row <= n_rows_max {
        match is_cell_present(grid, &SpecCellRef::new(n_col, n_row)?) {
            Ok(true) => {}
            Ok(false) => break,
            Err(GridError::Backend(msg)) => {
                builder.add_row_error(n_row, format!("presence test failed: {msg}"));
                break;
            }
            Err(err) => return Err(err),
        }

        builder.add_row_scanned();
        match scan_row(grid, n_row, start_column, &options_row) {
            Ok(l_values) => {
                builder.add_cells_read(l_values.len() as u64);
                l_rows.push(l_values);
            }
            Err(GridError::Backend(msg)) => builder.add_row_error(n_row, msg),
            Err(err) => return Err(err),
        }

        let Some(n_row_next) = n_row.checked_add(1) else {
            break;
        };
        n_row = n_row_next;
    }

    Ok(SpecMatrixScan {
        rows: l_rows,
        report: builder.build(),
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Lookups

/// First row in `1..=n_row_max` whose `column` cell matches `value`.
///
/// Matching is case-insensitive on display text. Without `n_row_max` the
/// grid's used extent (or its row limit) bounds the search; an explicit bound
/// is clamped to the row limit.
pub fn lookup_value_in_column<G: Grid + ?Sized>(
    grid: &G,
    column: &str,
    value: &EnumCellValue,
    n_row_max: Option<u32>,
) -> Result<Option<u32>, GridError> {
    let n_col = decode_column_label(column)?;
    let n_row_bound = resolve_bound(
        n_row_max,
        grid.dimensions().map(|(n_row, _)| n_row),
        grid.n_rows_max(),
    )?;

    for n_row in 1..=n_row_bound {
        if is_cell_value_match(&grid.get(&SpecCellRef::new(n_col, n_row)?)?, value) {
            return Ok(Some(n_row));
        }
    }
    Ok(None)
}

/// Label of the first column in `1..=n_col_max` whose `row` cell matches `value`.
pub fn lookup_value_in_row<G: Grid + ?Sized>(
    grid: &G,
    row: u32,
    value: &EnumCellValue,
    n_col_max: Option<u32>,
) -> Result<Option<String>, GridError> {
    SpecCellRef::new(1, row)?;
    let n_col_bound = resolve_bound(
        n_col_max,
        grid.dimensions().map(|(_, n_col)| n_col),
        grid.n_cols_max(),
    )?;

    for n_col in 1..=n_col_bound {
        if is_cell_value_match(&grid.get(&SpecCellRef::new(n_col, row)?)?, value) {
            return Ok(Some(encode_column_label(n_col)?));
        }
    }
    Ok(None)
}

fn resolve_bound(
    n_explicit: Option<u32>,
    n_used: Option<u32>,
    n_limit: u32,
) -> Result<u32, GridError> {
    match n_explicit {
        Some(0) => Err(GridError::InvalidArgument(
            "Lookup bound must be >= 1.".to_string(),
        )),
        Some(n) => Ok(n.min(n_limit)),
        None => Ok(n_used.unwrap_or(n_limit).min(n_limit)),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region BulkAccess

/// Write `values` downwards from `(column, start_row)`.
///
/// A backend rejection of one cell is recorded as a warning and writing
/// continues with the next value.
pub fn write_column<G, I>(
    grid: &mut G,
    column: &str,
    start_row: u32,
    values: I,
) -> Result<ReportScan, GridError>
where
    G: Grid + ?Sized,
    I: IntoIterator,
    I::Item: Into<EnumCellValue>,
{
    let n_col = decode_column_label(column)?;
    SpecCellRef::new(n_col, start_row)?;
    log::info!("writing column data starting at {column}{start_row}");

    let mut builder = ReportScanBuilder::default();
    let mut n_row = start_row;
    for value in values {
        let cell = SpecCellRef::new(n_col, n_row)?;
        match grid.set(&cell, value.into()) {
            Ok(()) => builder.add_cell_written(),
            Err(GridError::Backend(msg)) => {
                builder.add_warning(format!("Could not write column entry at {cell}: {msg}"));
            }
            Err(err) => return Err(err),
        }

        let Some(n_row_next) = n_row.checked_add(1) else {
            builder.add_warning(format!("Row overflow after {cell}; remaining values dropped."));
            break;
        };
        n_row = n_row_next;
    }
    Ok(builder.build())
}

/// Write `values` rightwards from `(start_column, row)` every `column_step` columns.
///
/// Values that would land after `options.column_end` are dropped with a
/// warning.
pub fn write_row<G, I>(
    grid: &mut G,
    row: u32,
    start_column: &str,
    values: I,
    options: &SpecWriteRowOptions,
) -> Result<ReportScan, GridError>
where
    G: Grid + ?Sized,
    I: IntoIterator,
    I::Item: Into<EnumCellValue>,
{
    if options.column_step == 0 {
        return Err(GridError::InvalidArgument(
            "column_step must be >= 1.".to_string(),
        ));
    }
    let n_col_start = decode_column_label(start_column)?;
    let n_col_end = match &options.column_end {
        Some(c_label) => decode_column_label(c_label)?,
        None => grid.n_cols_max(),
    };
    SpecCellRef::new(n_col_start, row)?;
    log::info!("writing row data starting at {start_column}{row}");

    let l_values: Vec<EnumCellValue> = values.into_iter().map(Into::into).collect();
    let n_values_total = l_values.len();

    let mut builder = ReportScanBuilder::default();
    let mut n_col = Some(n_col_start);
    for (idx_value, value) in l_values.into_iter().enumerate() {
        let Some(n_col_curr) = n_col.filter(|n| *n <= n_col_end) else {
            builder.add_warning(format!(
                "Row {row}: {} value(s) dropped past the last writable column.",
                n_values_total - idx_value
            ));
            break;
        };

        let cell = SpecCellRef::new(n_col_curr, row)?;
        match grid.set(&cell, value) {
            Ok(()) => builder.add_cell_written(),
            Err(GridError::Backend(msg)) => {
                builder.add_warning(format!("Could not write row entry at {cell}: {msg}"));
            }
            Err(err) => return Err(err),
        }
        n_col = n_col_curr.checked_add(options.column_step);
    }
    Ok(builder.build())
}

/// Values of `columns` for every row in `start_row..=n_row_end`, row-major.
///
/// Without `n_row_end` the grid's used extent bounds the read; an empty grid
/// yields nothing.
pub fn read_columns<G: Grid + ?Sized>(
    grid: &G,
    columns: &[&str],
    start_row: u32,
    n_row_end: Option<u32>,
    policy: &SpecCellReadPolicy,
) -> Result<Vec<EnumCellValue>, GridError> {
    let l_cols = columns
        .iter()
        .map(|c_label| decode_column_label(c_label))
        .collect::<Result<Vec<_>, _>>()?;
    SpecCellRef::new(1, start_row)?;

    let n_row_end = match n_row_end {
        Some(n) => n,
        None => grid.dimensions().map_or(0, |(n_row, _)| n_row),
    };

    let mut l_values = Vec::new();
    for n_row in start_row..=n_row_end {
        for n_col in &l_cols {
            l_values.push(read_cell(grid, &SpecCellRef::new(*n_col, n_row)?, policy)?);
        }
    }
    Ok(l_values)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
