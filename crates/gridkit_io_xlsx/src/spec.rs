//! Grid specification models, options and top-level error type.

use std::fmt;

use crate::conf::F_INF_SENTINEL;
use crate::report::ReportScan;
use crate::util::{decode_column_label, parse_cell_ref, push_column_label};

////////////////////////////////////////////////////////////////////////////////
// #region CellValue

/// Normalized cell value read from or written to a grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
}

impl EnumCellValue {
    /// Whether the cell counts as empty: `None` or the empty string.
    ///
    /// XLSX storage cannot keep an empty string, so grids treat it as blank.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::String(s) => s.is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Numeric payload, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Display text: empty for `None`, integral numbers without a fraction.
impl fmt::Display for EnumCellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::String(s) => write!(f, "{s}"),
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for EnumCellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for EnumCellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl<T: Into<EnumCellValue>> From<Option<T>> for EnumCellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Coordinate

/// One cell coordinate; both indices are 1-based and never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecCellRef {
    col: u32,
    row: u32,
}

impl SpecCellRef {
    /// Build from 1-based numeric indices.
    pub fn new(col: u32, row: u32) -> Result<Self, GridError> {
        if col == 0 {
            return Err(GridError::InvalidArgument(
                "Column index must be >= 1.".to_string(),
            ));
        }
        if row == 0 {
            return Err(GridError::InvalidArgument(format!(
                "Row number must be >= 1 (got 0 for column {col})."
            )));
        }
        Ok(Self { col, row })
    }

    /// Build from a column label (e.g. `"AB"`) and a 1-based row.
    pub fn from_label(col_label: &str, row: u32) -> Result<Self, GridError> {
        Self::new(decode_column_label(col_label)?, row)
    }

    /// Parse an A1-style reference such as `"B12"` (case-insensitive).
    pub fn parse(a1: &str) -> Result<Self, GridError> {
        parse_cell_ref(a1)
    }

    /// 1-based column index.
    pub fn col(&self) -> u32 {
        self.col
    }

    /// 1-based row number.
    pub fn row(&self) -> u32 {
        self.row
    }

    /// Canonical uppercase column label.
    pub fn col_label(&self) -> String {
        let mut c_label = String::new();
        push_column_label(self.col, &mut c_label);
        c_label
    }
}

impl fmt::Display for SpecCellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.col_label(), self.row)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReadWriteOptions

/// Numeric-text normalization applied at the read boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumNumericCoerceMode {
    /// Return stored values unchanged.
    Keep,
    /// Convert numeric-looking text (and the `inf` token) to numbers.
    #[default]
    NumericText,
}

/// Value coercion policy for cell reads.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecCellReadPolicy {
    /// Coercion mode.
    pub rule_coerce: EnumNumericCoerceMode,
    /// Number returned for the text token `inf`.
    pub inf_sentinel: f64,
}

impl Default for SpecCellReadPolicy {
    fn default() -> Self {
        Self {
            rule_coerce: EnumNumericCoerceMode::NumericText,
            inf_sentinel: F_INF_SENTINEL,
        }
    }
}

impl SpecCellReadPolicy {
    /// Policy returning raw stored values.
    pub fn keep() -> Self {
        Self {
            rule_coerce: EnumNumericCoerceMode::Keep,
            ..Default::default()
        }
    }
}

/// Options for a row-wise scan.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecScanRowOptions {
    /// Column increment between reads; must be >= 1.
    pub column_step: u32,
    /// Last column label (inclusive); defaults to the grid's last column.
    pub column_end: Option<String>,
    /// Row holding the presence marker; defaults to the scanned row.
    pub test_row: Option<u32>,
    /// Coercion applied to every value read.
    pub policy: SpecCellReadPolicy,
}

impl Default for SpecScanRowOptions {
    fn default() -> Self {
        Self {
            column_step: 1,
            column_end: None,
            test_row: None,
            policy: SpecCellReadPolicy::default(),
        }
    }
}

/// Options for a row-wise bulk write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecWriteRowOptions {
    /// Column increment between writes; must be >= 1.
    pub column_step: u32,
    /// Last writable column label (inclusive); defaults to the grid's last column.
    pub column_end: Option<String>,
}

impl Default for SpecWriteRowOptions {
    fn default() -> Self {
        Self {
            column_step: 1,
            column_end: None,
        }
    }
}

/// Behavior when the requested sheet index does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumMissingSheetStrategy {
    /// Select sheet 0 and record a warning.
    #[default]
    FirstSheet,
    /// Fail with [`GridError::InvalidArgument`].
    Error,
}

/// Options for [`crate::workbook::XlsxWorkbook::open`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecWorkbookOpenOptions {
    /// Zero-based sheet index to activate.
    pub sheet_index: usize,
    /// Create an empty workbook when the file does not exist.
    pub if_create_missing: bool,
    /// Missing sheet behavior.
    pub rule_missing_sheet: EnumMissingSheetStrategy,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ResultsAndErrors

/// Ragged matrix produced by [`crate::scan::scan_matrix`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecMatrixScan {
    /// Scanned rows; lengths may differ.
    pub rows: Vec<Vec<EnumCellValue>>,
    /// Diagnostics for skipped rows.
    pub report: ReportScan,
}

/// One row-scoped failure recorded during a tolerant scan or write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecScanError {
    /// 1-based row number that failed.
    pub row: u32,
    /// User-facing error text.
    pub exception: String,
}

/// Kernel error taxonomy. Empty cells are never errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// Malformed label, zero index, zero step or similar caller mistake.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The grid backend failed (limit exceeded, IO, parse/write failure).
    #[error("grid backend error: {0}")]
    Backend(String),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_value_display_drops_integral_fraction() {
        assert_eq!(EnumCellValue::Number(3.0).to_string(), "3");
        assert_eq!(EnumCellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(EnumCellValue::from("x").to_string(), "x");
        assert_eq!(EnumCellValue::None.to_string(), "");
    }

    #[test]
    fn cell_ref_rejects_zero_indices() {
        assert!(matches!(
            SpecCellRef::new(0, 1),
            Err(GridError::InvalidArgument(_))
        ));
        assert!(matches!(
            SpecCellRef::from_label("A", 0),
            Err(GridError::InvalidArgument(_))
        ));
    }

    #[test]
    fn cell_ref_from_label_and_display() {
        let cell = SpecCellRef::from_label("ab", 7).expect("valid ref");
        assert_eq!(cell.col(), 28);
        assert_eq!(cell.row(), 7);
        assert_eq!(cell.to_string(), "AB7");
    }

    #[test]
    fn empty_string_counts_as_empty() {
        assert!(EnumCellValue::None.is_empty());
        assert!(EnumCellValue::from("").is_empty());
        assert!(!EnumCellValue::from(" ").is_empty());
        assert!(!EnumCellValue::Number(0.0).is_empty());
    }

    #[test]
    fn option_converts_to_cell_value() {
        assert_eq!(EnumCellValue::from(None::<f64>), EnumCellValue::None);
        assert_eq!(EnumCellValue::from(Some(1.5)), EnumCellValue::Number(1.5));
    }
}
