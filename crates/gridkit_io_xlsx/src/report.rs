//! Scan/write report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

use crate::spec::SpecScanError;

/// Aggregate counters and diagnostics for one scan or bulk write call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReportScan {
    /// Rows visited (matrix scans) or lines touched (bulk writes).
    pub cnt_rows_scanned: u64,
    /// Rows dropped because a backend read failed.
    pub cnt_rows_skipped: u64,
    /// Cells read successfully.
    pub cnt_cells_read: u64,
    /// Cells written successfully.
    pub cnt_cells_written: u64,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
    /// Per-row failures.
    pub errors: Vec<SpecScanError>,
}

impl ReportScan {
    /// Number of collected row failures.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_rows_scanned".to_string(), self.cnt_rows_scanned);
        dict_counts.insert("cnt_rows_skipped".to_string(), self.cnt_rows_skipped);
        dict_counts.insert("cnt_cells_read".to_string(), self.cnt_cells_read);
        dict_counts.insert("cnt_cells_written".to_string(), self.cnt_cells_written);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} rows={} skipped={} read={} written={} errors={} warnings={}",
            self.cnt_rows_scanned,
            self.cnt_rows_skipped,
            self.cnt_cells_read,
            self.cnt_cells_written,
            self.error_count(),
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[SCAN]"))
    }
}

/// Mutable accumulator for scan statistics, scoped to one call.
#[derive(Debug, Default, Clone)]
pub struct ReportScanBuilder {
    /// See [`ReportScan::cnt_rows_scanned`].
    pub cnt_rows_scanned: u64,
    /// See [`ReportScan::cnt_rows_skipped`].
    pub cnt_rows_skipped: u64,
    /// See [`ReportScan::cnt_cells_read`].
    pub cnt_cells_read: u64,
    /// See [`ReportScan::cnt_cells_written`].
    pub cnt_cells_written: u64,
    /// See [`ReportScan::errors`].
    pub errors: Vec<SpecScanError>,
    /// See [`ReportScan::warnings`].
    pub warnings: Vec<String>,
}

impl ReportScanBuilder {
    /// Increment rows-scanned by one.
    pub fn add_row_scanned(&mut self) {
        self.cnt_rows_scanned += 1;
    }

    /// Increment cells-read by `value`.
    pub fn add_cells_read(&mut self, value: u64) {
        self.cnt_cells_read += value;
    }

    /// Increment cells-written by one.
    pub fn add_cell_written(&mut self) {
        self.cnt_cells_written += 1;
    }

    /// Add warning message (also forwarded to the `log` facade).
    pub fn add_warning(&mut self, warning: String) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Record a failed row and count it as skipped.
    pub fn add_row_error(&mut self, row: u32, exception: String) {
        log::warn!("row {row} skipped: {exception}");
        self.cnt_rows_skipped += 1;
        self.errors.push(SpecScanError { row, exception });
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportScan {
        ReportScan {
            cnt_rows_scanned: self.cnt_rows_scanned,
            cnt_rows_skipped: self.cnt_rows_skipped,
            cnt_cells_read: self.cnt_cells_read,
            cnt_cells_written: self.cnt_cells_written,
            warnings: self.warnings,
            errors: self.errors,
        }
    }
}
