//! Grid constants and default preset factories.

use crate::spec::{
    EnumMissingSheetStrategy, SpecCellReadPolicy, SpecScanRowOptions, SpecWorkbookOpenOptions,
    SpecWriteRowOptions,
};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: u32 = 1_048_576;
/// Excel worksheet maximum column count (label `XFD`).
pub const N_NCOLS_EXCEL_MAX: u32 = 16_384;
/// Label of the last addressable Excel column.
pub const C_COL_LABEL_MAX: &str = "XFD";
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];
/// Sheet name used for fresh workbooks.
pub const C_SHEET_NAME_DEFAULT: &str = "Sheet1";

/// Finite stand-in for the text token `inf`. Keep this value stable.
pub const F_INF_SENTINEL: f64 = 10_000_000_000.0;
/// Text token (case-insensitive) mapped to [`F_INF_SENTINEL`].
pub const C_INF_TOKEN: &str = "inf";

/// Number of letters in the column alphabet.
pub const N_COL_RADIX: u32 = 26;

/// Build the default cell read policy (numeric-text coercion on).
pub fn derive_default_cell_read_policy() -> SpecCellReadPolicy {
    SpecCellReadPolicy::default()
}

/// Build default row-scan options.
pub fn derive_default_scan_row_options() -> SpecScanRowOptions {
    SpecScanRowOptions::default()
}

/// Build default row-write options.
pub fn derive_default_write_row_options() -> SpecWriteRowOptions {
    SpecWriteRowOptions::default()
}

/// Build row-scan options from loose caller arguments.
///
/// A `col_skip` of 0 means every column, like 1.
pub fn derive_scan_row_options(
    col_skip: u32,
    column_end: Option<String>,
    test_row: Option<u32>,
) -> SpecScanRowOptions {
    SpecScanRowOptions {
        column_step: col_skip.max(1),
        column_end,
        test_row,
        ..derive_default_scan_row_options()
    }
}

/// Build row-write options from loose caller arguments (`col_skip` 0 means 1).
pub fn derive_write_row_options(col_skip: u32, column_end: Option<String>) -> SpecWriteRowOptions {
    SpecWriteRowOptions {
        column_step: col_skip.max(1),
        column_end,
    }
}

/// Build default workbook open options.
///
/// Falls back to the first sheet when the requested index is missing, and
/// refuses to invent a workbook for a missing file.
pub fn derive_default_workbook_open_options() -> SpecWorkbookOpenOptions {
    SpecWorkbookOpenOptions {
        sheet_index: 0,
        if_create_missing: false,
        rule_missing_sheet: EnumMissingSheetStrategy::FirstSheet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_col_skip_means_every_column() {
        let options = derive_scan_row_options(0, None, Some(2));
        assert_eq!(options.column_step, 1);
        assert_eq!(options.test_row, Some(2));
        assert_eq!(options.policy, derive_default_cell_read_policy());

        let options = derive_write_row_options(0, Some("D".to_string()));
        assert_eq!(options.column_step, 1);
        assert_eq!(options.column_end.as_deref(), Some("D"));

        assert_eq!(derive_scan_row_options(3, None, None).column_step, 3);
        assert_eq!(
            derive_write_row_options(2, None),
            SpecWriteRowOptions {
                column_step: 2,
                column_end: None,
            }
        );
    }
}
