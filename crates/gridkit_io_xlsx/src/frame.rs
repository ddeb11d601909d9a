//! Polars interchange for scanned matrices.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;

use polars::prelude::{AnyValue, Column, DataFrame, IpcReader, IpcWriter, SerReader, SerWriter};

use crate::grid::Grid;
use crate::report::{ReportScan, ReportScanBuilder};
use crate::spec::{EnumCellValue, GridError, SpecCellRef};
use crate::util::{decode_column_label, encode_column_label};

/// Build a `DataFrame` from a (possibly ragged) matrix.
///
/// Short rows are padded with nulls. A column whose non-null cells are all
/// numbers becomes `Float64`; any text makes it a `String` column holding
/// display text. Without `column_names` columns are named `A`, `B`, ...
pub fn derive_dataframe_from_matrix(
    rows: &[Vec<EnumCellValue>],
    column_names: Option<&[String]>,
) -> Result<DataFrame, GridError> {
    let n_width = rows.iter().map(Vec::len).max().unwrap_or(0);

    let l_names = match column_names {
        Some(names) => {
            if names.len() != n_width {
                return Err(GridError::InvalidArgument(format!(
                    "Got {} column name(s) for a matrix {n_width} column(s) wide.",
                    names.len()
                )));
            }
            names.to_vec()
        }
        None => (1..=n_width)
            .map(|n_col| {
                u32::try_from(n_col)
                    .map_err(|_| GridError::InvalidArgument(format!("too many columns: {n_col}")))
                    .and_then(encode_column_label)
            })
            .collect::<Result<Vec<_>, _>>()?,
    };
    validate_unique_columns(&l_names)?;

    let mut l_columns = Vec::with_capacity(n_width);
    for (idx_col, c_name) in l_names.iter().enumerate() {
        let if_numeric = rows.iter().all(|row| {
            matches!(
                row.get(idx_col),
                None | Some(EnumCellValue::None) | Some(EnumCellValue::Number(_))
            )
        });

        let column = if if_numeric {
            let l_vals: Vec<Option<f64>> = rows
                .iter()
                .map(|row| row.get(idx_col).and_then(EnumCellValue::as_number))
                .collect();
            Column::new(c_name.as_str().into(), l_vals)
        } else {
            let l_vals: Vec<Option<String>> = rows
                .iter()
                .map(|row| match row.get(idx_col) {
                    None | Some(EnumCellValue::None) => None,
                    Some(value) => Some(value.to_string()),
                })
                .collect();
            Column::new(c_name.as_str().into(), l_vals)
        };
        l_columns.push(column);
    }

    DataFrame::new(l_columns)
        .map_err(|err| GridError::Backend(format!("Failed to build DataFrame: {err}")))
}

/// Write `df` into `grid` with its top-left corner at `(start_column, start_row)`.
///
/// With `if_write_header` the column names occupy the first row. Nulls clear
/// their cells. Backend rejections of single cells become warnings.
pub fn write_dataframe<G: Grid + ?Sized>(
    grid: &mut G,
    df: &DataFrame,
    start_column: &str,
    start_row: u32,
    if_write_header: bool,
) -> Result<ReportScan, GridError> {
    let n_col_start = decode_column_label(start_column)?;
    SpecCellRef::new(n_col_start, start_row)?;
    log::info!(
        "writing {}x{} dataframe starting at {start_column}{start_row}",
        df.height(),
        df.width()
    );

    let mut builder = ReportScanBuilder::default();
    let mut n_row_body = start_row;

    if if_write_header {
        for (idx_col, c_name) in df.get_column_names_str().into_iter().enumerate() {
            let cell = SpecCellRef::new(offset_index(n_col_start, idx_col)?, start_row)?;
            set_cell_tolerant(grid, &cell, EnumCellValue::from(c_name), &mut builder)?;
        }
        n_row_body = offset_index(start_row, 1)?;
    }

    let l_cols = df.get_columns();
    for idx_row in 0..df.height() {
        let n_row = offset_index(n_row_body, idx_row)?;
        for (idx_col, column) in l_cols.iter().enumerate() {
            let value = column
                .get(idx_row)
                .map_err(|err| GridError::Backend(format!("Failed to read DataFrame cell: {err}")))?;
            let cell = SpecCellRef::new(offset_index(n_col_start, idx_col)?, n_row)?;
            set_cell_tolerant(grid, &cell, derive_cell_value_from_any_value(value), &mut builder)?;
        }
        builder.add_row_scanned();
    }

    Ok(builder.build())
}

/// Serialize `df` as Arrow IPC file bytes.
pub fn derive_ipc_bytes_from_dataframe(df: &mut DataFrame) -> Result<Vec<u8>, GridError> {
    let mut v_buf = Vec::new();
    IpcWriter::new(&mut v_buf)
        .finish(df)
        .map_err(|err| GridError::Backend(format!("Failed to write IPC DataFrame bytes: {err}")))?;
    Ok(v_buf)
}

/// Deserialize Arrow IPC file bytes into a `DataFrame`.
pub fn derive_dataframe_from_ipc_bytes(v_ipc_df: &[u8]) -> Result<DataFrame, GridError> {
    IpcReader::new(Cursor::new(v_ipc_df))
        .finish()
        .map_err(|err| GridError::Backend(format!("Failed to read IPC DataFrame bytes: {err}")))
}

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), GridError> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter(|(_, l_pos)| l_pos.len() > 1)
        .map(|(c_name, l_pos)| format!("{c_name:?} x{} at indices {l_pos:?}", l_pos.len()))
        .collect::<Vec<_>>()
        .join("; ");

    Err(GridError::InvalidArgument(format!(
        "Duplicate column names detected: {c_msg}"
    )))
}

fn set_cell_tolerant<G: Grid + ?Sized>(
    grid: &mut G,
    cell: &SpecCellRef,
    value: EnumCellValue,
    builder: &mut ReportScanBuilder,
) -> Result<(), GridError> {
    match grid.set(cell, value) {
        Ok(()) => builder.add_cell_written(),
        Err(GridError::Backend(msg)) => {
            builder.add_warning(format!("Could not write DataFrame value at {cell}: {msg}"));
        }
        Err(err) => return Err(err),
    }
    Ok(())
}

fn offset_index(base: u32, offset: usize) -> Result<u32, GridError> {
    u32::try_from(offset)
        .ok()
        .and_then(|n| base.checked_add(n))
        .ok_or_else(|| GridError::Backend(format!("index overflow: {base} + {offset}")))
}

fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => {
            EnumCellValue::String(if val { "True" } else { "False" }.to_string())
        }
        AnyValue::UInt8(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt16(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int8(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int16(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int128(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        _ => EnumCellValue::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::grid::MemoryGrid;
    use crate::scan::scan_matrix;
    use crate::spec::SpecScanRowOptions;

    fn num(n: f64) -> EnumCellValue {
        EnumCellValue::Number(n)
    }

    #[test]
    fn ragged_matrix_is_padded_with_nulls() {
        let rows = vec![
            vec![num(1.0), num(2.0), num(3.0)],
            vec![num(4.0), num(5.0)],
            vec![num(7.0), EnumCellValue::from("x"), num(9.0)],
        ];

        let df = derive_dataframe_from_matrix(&rows, None).expect("dataframe");
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 3);
        assert_eq!(df.get_column_names_str(), vec!["A", "B", "C"]);

        let col_c = df.column("C").expect("column C");
        assert_eq!(col_c.null_count(), 1);
        assert_eq!(col_c.get(0).expect("C1"), AnyValue::Float64(3.0));

        let col_b = df.column("B").expect("column B");
        assert_eq!(col_b.get(2).expect("B3"), AnyValue::String("x"));
        assert_eq!(col_b.get(0).expect("B1"), AnyValue::String("2"));
    }

    #[test]
    fn explicit_column_names_must_match_and_be_unique() {
        let rows = vec![vec![num(1.0), num(2.0)]];
        let names = vec!["a".to_string()];
        assert!(matches!(
            derive_dataframe_from_matrix(&rows, Some(&names)),
            Err(GridError::InvalidArgument(_))
        ));

        let names = vec!["a".to_string(), "a".to_string()];
        assert!(matches!(
            derive_dataframe_from_matrix(&rows, Some(&names)),
            Err(GridError::InvalidArgument(_))
        ));
    }

    #[test]
    fn write_dataframe_then_scan_matrix() {
        let rows = vec![vec![num(1.0), EnumCellValue::from("a")], vec![num(2.0)]];
        let names = vec!["id".to_string(), "tag".to_string()];
        let df = derive_dataframe_from_matrix(&rows, Some(&names)).expect("dataframe");

        let mut grid = MemoryGrid::new();
        let report = write_dataframe(&mut grid, &df, "B", 2, true).expect("write");
        assert_eq!(report.cnt_rows_scanned, 2);

        let scan = scan_matrix(&grid, "B", 2, &SpecScanRowOptions::default()).expect("scan");
        assert_eq!(
            scan.rows,
            vec![
                vec![EnumCellValue::from("id"), EnumCellValue::from("tag")],
                vec![num(1.0), EnumCellValue::from("a")],
                vec![num(2.0)],
            ]
        );
    }

    #[test]
    fn ipc_bytes_restore_the_frame() {
        let rows = vec![vec![num(1.0), EnumCellValue::from("a")]];
        let mut df = derive_dataframe_from_matrix(&rows, None).expect("dataframe");
        let v_bytes = derive_ipc_bytes_from_dataframe(&mut df).expect("ipc");
        let df_back = derive_dataframe_from_ipc_bytes(&v_bytes).expect("read ipc");
        assert!(df.equals_missing(&df_back));
    }
}
