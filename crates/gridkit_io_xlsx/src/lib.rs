//! `gridkit_io_xlsx` v1:
//! Spreadsheet coordinate and range kernel.
//!
//! Module map:
//! - `conf`     : constants and default presets
//! - `spec`     : values/coordinates/options/errors
//! - `report`   : per-call diagnostics
//! - `util`     : column codec, A1 parsing, coercion policy
//! - `grid`     : backend trait + in-memory grid
//! - `cell`     : single-cell accessor
//! - `scan`     : column/row/matrix scanners, lookups, bulk writers
//! - `workbook` : XLSX-backed grid
//! - `frame`    : polars interchange
pub mod cell;
pub mod conf;
pub mod frame;
pub mod grid;
pub mod report;
pub mod scan;
pub mod spec;
pub mod util;
pub mod workbook;

pub use cell::{read_cell, read_cell_at, write_cell, write_cell_at};
pub use conf::{
    C_COL_LABEL_MAX, F_INF_SENTINEL, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX,
};
pub use frame::{
    derive_dataframe_from_ipc_bytes, derive_dataframe_from_matrix, derive_ipc_bytes_from_dataframe,
    write_dataframe,
};
pub use grid::{Grid, MemoryGrid};
pub use report::{ReportScan, ReportScanBuilder};
pub use scan::{
    lookup_value_in_column, lookup_value_in_row, read_columns, scan_column, scan_matrix,
    scan_row, write_column, write_row,
};
pub use spec::{
    EnumCellValue, EnumMissingSheetStrategy, EnumNumericCoerceMode, GridError,
    SpecCellReadPolicy, SpecCellRef, SpecMatrixScan, SpecScanError, SpecScanRowOptions,
    SpecWorkbookOpenOptions, SpecWriteRowOptions,
};
pub use util::{
    coerce_cell_value, decode_column_label, encode_column_label, parse_cell_ref,
    shift_column_label,
};
pub use workbook::{SpecSheet, XlsxWorkbook};
