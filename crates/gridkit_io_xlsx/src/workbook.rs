//! XLSX-backed grid: every sheet is loaded into a sparse in-memory grid,
//! scanned/edited through [`Grid`], and written back on [`XlsxWorkbook::save`].

use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

use crate::conf::C_SHEET_NAME_DEFAULT;
use crate::grid::{Grid, MemoryGrid};
use crate::report::{ReportScan, ReportScanBuilder};
use crate::spec::{
    EnumCellValue, EnumMissingSheetStrategy, GridError, SpecCellRef, SpecWorkbookOpenOptions,
};
use crate::util::{derive_unique_sheet_name, sanitize_sheet_name};

/// One named worksheet held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecSheet {
    /// Worksheet name.
    pub name: String,
    /// Cell contents.
    pub cells: MemoryGrid,
}

/// Stateful workbook with one active sheet.
///
/// Always holds at least one sheet; the active index is always valid.
#[derive(Debug, Clone)]
pub struct XlsxWorkbook {
    path_file: Option<PathBuf>,
    l_sheets: Vec<SpecSheet>,
    idx_sheet_active: usize,
}

impl Default for XlsxWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

impl XlsxWorkbook {
    /// Fresh workbook with a single empty sheet.
    pub fn new() -> Self {
        Self {
            path_file: None,
            l_sheets: vec![SpecSheet {
                name: C_SHEET_NAME_DEFAULT.to_string(),
                cells: MemoryGrid::new(),
            }],
            idx_sheet_active: 0,
        }
    }

    /// Load every sheet of the workbook at `path` and activate
    /// `options.sheet_index`.
    ///
    /// Fallbacks (missing file, missing sheet) are opt-in through `options`
    /// and reported as warnings.
    pub fn open(
        path: impl AsRef<Path>,
        options: &SpecWorkbookOpenOptions,
    ) -> Result<(Self, ReportScan), GridError> {
        let path = path.as_ref();
        let mut builder = ReportScanBuilder::default();

        let mut workbook = if path.exists() {
            Self::load(path, &mut builder)?
        } else if options.if_create_missing {
            builder.add_warning(format!(
                "Workbook {} not found; created a new workbook.",
                path.display()
            ));
            Self::new()
        } else {
            return Err(GridError::Backend(format!(
                "Workbook not found: {}",
                path.display()
            )));
        };
        workbook.path_file = Some(path.to_path_buf());

        if options.sheet_index >= workbook.l_sheets.len() {
            match options.rule_missing_sheet {
                EnumMissingSheetStrategy::FirstSheet => {
                    builder.add_warning(format!(
                        "Worksheet index {} not available; using sheet 0 ({}).",
                        options.sheet_index, workbook.l_sheets[0].name
                    ));
                }
                EnumMissingSheetStrategy::Error => {
                    return Err(GridError::InvalidArgument(format!(
                        "Worksheet index {} out of range (workbook has {} sheet(s)).",
                        options.sheet_index,
                        workbook.l_sheets.len()
                    )));
                }
            }
        } else {
            workbook.idx_sheet_active = options.sheet_index;
        }

        Ok((workbook, builder.build()))
    }

    fn load(path: &Path, builder: &mut ReportScanBuilder) -> Result<Self, GridError> {
        let mut reader = open_workbook_auto(path).map_err(|err| {
            GridError::Backend(format!("Failed to open {}: {err}", path.display()))
        })?;

        let mut l_sheets = Vec::new();
        for sheet_name in reader.sheet_names() {
            let range = reader.worksheet_range(&sheet_name).map_err(|err| {
                GridError::Backend(format!("Failed to read worksheet {sheet_name:?}: {err}"))
            })?;

            let mut cells = MemoryGrid::new();
            let (n_row_offset, n_col_offset) = range.start().unwrap_or((0, 0));
            for (idx_row, idx_col, data) in range.cells() {
                let value = derive_cell_value_from_data(data);
                if value.is_empty() {
                    continue;
                }
                let cell = SpecCellRef::new(
                    cast_grid_index(n_col_offset, idx_col)?,
                    cast_grid_index(n_row_offset, idx_row)?,
                )?;
                cells.set(&cell, value)?;
                builder.add_cells_read(1);
            }
            l_sheets.push(SpecSheet {
                name: sheet_name,
                cells,
            });
        }

        if l_sheets.is_empty() {
            builder.add_warning(format!(
                "No worksheet available in {}; added an empty sheet.",
                path.display()
            ));
            return Ok(Self::new());
        }

        log::debug!("loaded {} sheet(s) from {}", l_sheets.len(), path.display());
        Ok(Self {
            path_file: None,
            l_sheets,
            idx_sheet_active: 0,
        })
    }

    /// Path the workbook was opened from or last saved to.
    pub fn path(&self) -> Option<&Path> {
        self.path_file.as_deref()
    }

    /// Worksheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.l_sheets.iter().map(|sheet| sheet.name.clone()).collect()
    }

    /// Name of the sheet [`Grid`] calls address.
    pub fn active_sheet_name(&self) -> &str {
        &self.l_sheets[self.idx_sheet_active].name
    }

    /// Activate the zero-based sheet `index`.
    pub fn select_sheet(&mut self, index: usize) -> Result<(), GridError> {
        if index >= self.l_sheets.len() {
            return Err(GridError::InvalidArgument(format!(
                "Worksheet index {index} out of range (workbook has {} sheet(s)).",
                self.l_sheets.len()
            )));
        }
        self.idx_sheet_active = index;
        Ok(())
    }

    /// Append an empty sheet and return its final (sanitized, unique) name.
    pub fn add_sheet(&mut self, name: &str) -> String {
        let c_name = derive_unique_sheet_name(&sanitize_sheet_name(name, "_"), &self.sheet_names());
        self.l_sheets.push(SpecSheet {
            name: c_name.clone(),
            cells: MemoryGrid::new(),
        });
        c_name
    }

    /// Write every sheet to `path` as XLSX.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), GridError> {
        let path = path.as_ref();
        log::info!("saving workbook as {}", path.display());

        let mut workbook = Workbook::new();
        for sheet in &self.l_sheets {
            let worksheet = workbook.add_worksheet();
            worksheet
                .set_name(&sheet.name)
                .map_err(derive_xlsx_error)?;
            for ((n_row, n_col), value) in sheet.cells.iter() {
                write_cell_value(worksheet, *n_row, *n_col, value)?;
            }
        }
        workbook.save(path).map_err(derive_xlsx_error)?;

        self.path_file = Some(path.to_path_buf());
        Ok(())
    }
}

impl Grid for XlsxWorkbook {
    fn get(&self, cell: &SpecCellRef) -> Result<EnumCellValue, GridError> {
        self.l_sheets[self.idx_sheet_active].cells.get(cell)
    }

    fn set(&mut self, cell: &SpecCellRef, value: EnumCellValue) -> Result<(), GridError> {
        self.l_sheets[self.idx_sheet_active].cells.set(cell, value)
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.l_sheets[self.idx_sheet_active].cells.dimensions()
    }
}

fn derive_cell_value_from_data(value: &Data) -> EnumCellValue {
    match value {
        Data::Empty => EnumCellValue::None,
        Data::String(val) => EnumCellValue::String(val.clone()),
        Data::Float(val) => EnumCellValue::Number(*val),
        Data::Int(val) => EnumCellValue::Number(*val as f64),
        Data::Bool(val) => EnumCellValue::String(if *val { "True" } else { "False" }.to_string()),
        Data::DateTime(val) => EnumCellValue::Number(val.as_f64()),
        other => EnumCellValue::String(other.to_string()),
    }
}

fn write_cell_value(
    worksheet: &mut Worksheet,
    n_row: u32,
    n_col: u32,
    value: &EnumCellValue,
) -> Result<(), GridError> {
    let n_row_xlsx = cast_row_num(n_row)?;
    let n_col_xlsx = cast_col_num(n_col)?;
    match value {
        EnumCellValue::None => {}
        EnumCellValue::String(val) => {
            worksheet
                .write_string(n_row_xlsx, n_col_xlsx, val)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::Number(val) => {
            worksheet
                .write_number(n_row_xlsx, n_col_xlsx, *val)
                .map_err(derive_xlsx_error)?;
        }
    }
    Ok(())
}

fn cast_grid_index(offset: u32, idx: usize) -> Result<u32, GridError> {
    u32::try_from(idx)
        .ok()
        .and_then(|n| n.checked_add(offset))
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| GridError::Backend(format!("cell index overflow: {idx}")))
}

/// 1-based grid row to 0-based XLSX row.
fn cast_row_num(value: u32) -> Result<u32, GridError> {
    value
        .checked_sub(1)
        .ok_or_else(|| GridError::Backend(format!("row index underflow: {value}")))
}

/// 1-based grid column to 0-based XLSX column.
fn cast_col_num(value: u32) -> Result<u16, GridError> {
    value
        .checked_sub(1)
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| GridError::Backend(format!("column index overflow: {value}")))
}

fn derive_xlsx_error(err: XlsxError) -> GridError {
    GridError::Backend(format!("xlsx write error: {err}"))
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;
    use crate::cell::{read_cell_at, write_cell_at};
    use crate::conf::{F_INF_SENTINEL, derive_default_workbook_open_options};
    use crate::scan::{scan_column, write_column};
    use crate::spec::SpecCellReadPolicy;

    struct TestDir {
        path: PathBuf,
    }

    impl TestDir {
        fn new(tag: &str) -> Self {
            let n = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos();
            let path = std::env::temp_dir().join(format!("gridkit_xlsx_test_{tag}_{n}"));
            std::fs::create_dir_all(&path).expect("create test dir");
            Self { path }
        }

        fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Drop for TestDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn save_and_reopen_round_trips_values() {
        let tmp = TestDir::new("roundtrip");
        let path_file = tmp.path().join("book.xlsx");

        let mut workbook = XlsxWorkbook::new();
        write_cell_at(&mut workbook, "A", 1, "name").expect("write");
        write_cell_at(&mut workbook, "A", 2, 1.5).expect("write");
        write_cell_at(&mut workbook, "A", 3, "inf").expect("write");
        write_cell_at(&mut workbook, "C", 7, 42.0).expect("write");
        workbook.save(&path_file).expect("save");
        assert_eq!(workbook.path(), Some(path_file.as_path()));

        let (reopened, report) =
            XlsxWorkbook::open(&path_file, &derive_default_workbook_open_options())
                .expect("open");
        assert_eq!(report.warning_count(), 0);
        assert_eq!(reopened.sheet_names(), vec!["Sheet1".to_string()]);

        let policy = SpecCellReadPolicy::default();
        assert_eq!(
            scan_column(&reopened, "A", 1, &policy).expect("scan"),
            vec![
                EnumCellValue::from("name"),
                EnumCellValue::Number(1.5),
                EnumCellValue::Number(F_INF_SENTINEL),
            ]
        );
        assert_eq!(
            read_cell_at(&reopened, "C", 7, &policy).expect("read"),
            EnumCellValue::Number(42.0)
        );
        assert_eq!(reopened.dimensions(), Some((7, 3)));
    }

    #[test]
    fn empty_text_scans_the_same_before_and_after_save() {
        let tmp = TestDir::new("empty_text");
        let path_file = tmp.path().join("gap.xlsx");

        let mut workbook = XlsxWorkbook::new();
        let l_values = vec![
            EnumCellValue::Number(1.0),
            EnumCellValue::from(""),
            EnumCellValue::Number(3.0),
        ];
        write_column(&mut workbook, "A", 1, l_values).expect("write column");

        let policy = SpecCellReadPolicy::default();
        let l_before = scan_column(&workbook, "A", 1, &policy).expect("scan before save");
        workbook.save(&path_file).expect("save");

        let (reopened, _) =
            XlsxWorkbook::open(&path_file, &derive_default_workbook_open_options())
                .expect("open");
        let l_after = scan_column(&reopened, "A", 1, &policy).expect("scan after reopen");

        assert_eq!(l_before, vec![EnumCellValue::Number(1.0)]);
        assert_eq!(l_before, l_after);
    }

    #[test]
    fn open_missing_file_requires_opt_in() {
        let tmp = TestDir::new("missing");
        let path_file = tmp.path().join("absent.xlsx");

        let err = XlsxWorkbook::open(&path_file, &SpecWorkbookOpenOptions::default())
            .expect_err("missing file");
        assert!(matches!(err, GridError::Backend(_)));

        let options = SpecWorkbookOpenOptions {
            if_create_missing: true,
            ..Default::default()
        };
        let (workbook, report) = XlsxWorkbook::open(&path_file, &options).expect("create");
        assert_eq!(report.warning_count(), 1);
        assert_eq!(workbook.active_sheet_name(), "Sheet1");
        assert_eq!(workbook.path(), Some(path_file.as_path()));
    }

    #[test]
    fn missing_sheet_index_follows_strategy() {
        let tmp = TestDir::new("sheets");
        let path_file = tmp.path().join("two.xlsx");

        let mut workbook = XlsxWorkbook::new();
        let c_name = workbook.add_sheet("Data/2024");
        assert_eq!(c_name, "Data_2024");
        workbook.select_sheet(1).expect("select");
        write_cell_at(&mut workbook, "B", 2, "second").expect("write");
        workbook.save(&path_file).expect("save");

        let options = SpecWorkbookOpenOptions {
            sheet_index: 1,
            ..Default::default()
        };
        let (reopened, _) = XlsxWorkbook::open(&path_file, &options).expect("open");
        assert_eq!(reopened.active_sheet_name(), "Data_2024");
        assert_eq!(
            read_cell_at(&reopened, "B", 2, &SpecCellReadPolicy::default()).expect("read"),
            EnumCellValue::from("second")
        );

        let options = SpecWorkbookOpenOptions {
            sheet_index: 5,
            ..Default::default()
        };
        let (fallback, report) = XlsxWorkbook::open(&path_file, &options).expect("open");
        assert_eq!(fallback.active_sheet_name(), "Sheet1");
        assert_eq!(report.warning_count(), 1);

        let options = SpecWorkbookOpenOptions {
            sheet_index: 5,
            rule_missing_sheet: EnumMissingSheetStrategy::Error,
            ..Default::default()
        };
        assert!(matches!(
            XlsxWorkbook::open(&path_file, &options),
            Err(GridError::InvalidArgument(_))
        ));
    }

    #[test]
    fn add_sheet_names_are_unique_and_select_checks_range() {
        let mut workbook = XlsxWorkbook::new();
        assert_eq!(workbook.add_sheet("Sheet1"), "Sheet1__2");
        assert!(matches!(
            workbook.select_sheet(9),
            Err(GridError::InvalidArgument(_))
        ));
    }

    #[test]
    fn excel_limits_are_backend_errors() {
        let mut workbook = XlsxWorkbook::new();
        assert!(matches!(
            write_cell_at(&mut workbook, "XFE", 1, 1.0),
            Err(GridError::Backend(_))
        ));
        assert!(write_cell_at(&mut workbook, "XFD", 1, 1.0).is_ok());
        assert!(matches!(
            write_cell_at(&mut workbook, "A", 1_048_577, 1.0),
            Err(GridError::Backend(_))
        ));
    }
}
