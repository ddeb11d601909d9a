use std::collections::BTreeMap;

use gridkit_io_xlsx::conf::{
    derive_default_cell_read_policy, derive_default_scan_row_options,
    derive_default_workbook_open_options, derive_scan_row_options, derive_write_row_options,
};
use gridkit_io_xlsx::util::split_column_letters;
use gridkit_io_xlsx::{
    C_COL_LABEL_MAX, EnumCellValue, EnumMissingSheetStrategy, GridError, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX, ReportScan, SpecCellReadPolicy, SpecScanError, XlsxWorkbook,
    decode_column_label, derive_dataframe_from_ipc_bytes, derive_dataframe_from_matrix,
    derive_ipc_bytes_from_dataframe, encode_column_label, lookup_value_in_column,
    lookup_value_in_row, read_cell_at, read_columns, scan_column, scan_matrix, scan_row,
    shift_column_label, write_cell_at, write_column, write_dataframe, write_row,
};
use pyo3::exceptions::{PyOSError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyBytes};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "gridkit.xlsx.grid.v1";
const C_BRIDGE_TRANSPORT: &str = "arrow_ipc_bytes";
const C_COLUMNS_DEFAULT: &str = "ABC";

#[pyclass(name = "SpecScanError")]
#[derive(Debug, Clone)]
struct PySpecScanError {
    #[pyo3(get)]
    row: u32,
    #[pyo3(get)]
    exception: String,
}

impl From<SpecScanError> for PySpecScanError {
    fn from(spec_error: SpecScanError) -> Self {
        Self {
            row: spec_error.row,
            exception: spec_error.exception,
        }
    }
}

#[pyclass(name = "ReportScan")]
#[derive(Debug, Clone, Default)]
struct PyReportScan {
    #[pyo3(get)]
    cnt_rows_scanned: u64,
    #[pyo3(get)]
    cnt_rows_skipped: u64,
    #[pyo3(get)]
    cnt_cells_read: u64,
    #[pyo3(get)]
    cnt_cells_written: u64,
    #[pyo3(get)]
    warnings: Vec<String>,
    #[pyo3(get)]
    errors: Vec<PySpecScanError>,
}

impl From<ReportScan> for PyReportScan {
    fn from(report_scan: ReportScan) -> Self {
        Self {
            cnt_rows_scanned: report_scan.cnt_rows_scanned,
            cnt_rows_skipped: report_scan.cnt_rows_skipped,
            cnt_cells_read: report_scan.cnt_cells_read,
            cnt_cells_written: report_scan.cnt_cells_written,
            warnings: report_scan.warnings,
            errors: report_scan
                .errors
                .into_iter()
                .map(PySpecScanError::from)
                .collect(),
        }
    }
}

#[pymethods]
impl PyReportScan {
    #[getter]
    fn error_count(&self) -> usize {
        self.errors.len()
    }

    #[getter]
    fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_rows_scanned".to_string(), self.cnt_rows_scanned);
        dict_counts.insert("cnt_rows_skipped".to_string(), self.cnt_rows_skipped);
        dict_counts.insert("cnt_cells_read".to_string(), self.cnt_cells_read);
        dict_counts.insert("cnt_cells_written".to_string(), self.cnt_cells_written);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    #[pyo3(signature = (prefix = "[SCAN]"))]
    fn format(&self, prefix: &str) -> String {
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

    fn __str__(&self) -> String {
        self.format("[SCAN]")
    }
}

#[pyclass(name = "Workbook")]
struct PyWorkbook {
    inner: XlsxWorkbook,
    #[pyo3(get)]
    report_open: PyReportScan,
}

#[pymethods]
impl PyWorkbook {
    #[new]
    #[pyo3(signature = (
        file = None,
        sheet_index = 0,
        if_create_missing = false,
        rule_missing_sheet = "first_sheet"
    ))]
    fn new(
        file: Option<String>,
        sheet_index: usize,
        if_create_missing: bool,
        rule_missing_sheet: &str,
    ) -> PyResult<Self> {
        let Some(file) = file else {
            return Ok(Self {
                inner: XlsxWorkbook::new(),
                report_open: PyReportScan::default(),
            });
        };

        let mut cfg_open_options = derive_default_workbook_open_options();
        cfg_open_options.sheet_index = sheet_index;
        cfg_open_options.if_create_missing = if_create_missing;
        cfg_open_options.rule_missing_sheet = parse_rule_missing_sheet(rule_missing_sheet)?;

        let (inner, report) =
            XlsxWorkbook::open(&file, &cfg_open_options).map_err(map_grid_error)?;
        Ok(Self {
            inner,
            report_open: PyReportScan::from(report),
        })
    }

    #[getter]
    fn file(&self) -> Option<String> {
        self.inner
            .path()
            .map(|path| path.to_string_lossy().to_string())
    }

    #[getter]
    fn active_sheet_name(&self) -> String {
        self.inner.active_sheet_name().to_string()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names()
    }

    fn select_sheet(&mut self, index: usize) -> PyResult<()> {
        self.inner.select_sheet(index).map_err(map_grid_error)
    }

    fn add_sheet(&mut self, name: &str) -> String {
        self.inner.add_sheet(name)
    }

    #[pyo3(signature = (column, row, coerce = true))]
    fn read_cell(&self, py: Python<'_>, column: &str, row: u32, coerce: bool) -> PyResult<PyObject> {
        let value = read_cell_at(&self.inner, column, row, &derive_read_policy(coerce))
            .map_err(map_grid_error)?;
        derive_py_value(py, &value)
    }

    fn write_cell(&mut self, column: &str, row: u32, value: &Bound<'_, PyAny>) -> PyResult<()> {
        let value = parse_cell_value(value)?;
        write_cell_at(&mut self.inner, column, row, value).map_err(map_grid_error)
    }

    fn read_one_column(&self, py: Python<'_>, column: &str, start_row: u32) -> PyResult<Vec<PyObject>> {
        let l_values = scan_column(&self.inner, column, start_row, &derive_default_cell_read_policy())
            .map_err(map_grid_error)?;
        derive_py_values(py, &l_values)
    }

    /// Row scan; `col_skip=0` reads every column, `end_col` defaults to `XFD`.
    #[pyo3(signature = (row, start_col, col_skip = 1, end_col = None, if_row = None))]
    fn read_row(
        &self,
        py: Python<'_>,
        row: u32,
        start_col: &str,
        col_skip: u32,
        end_col: Option<String>,
        if_row: Option<u32>,
    ) -> PyResult<Vec<PyObject>> {
        let cfg_scan_options = derive_scan_row_options(col_skip, end_col, if_row);
        let l_values =
            scan_row(&self.inner, row, start_col, &cfg_scan_options).map_err(map_grid_error)?;
        derive_py_values(py, &l_values)
    }

    fn read_matrix(
        &self,
        py: Python<'_>,
        start_col: &str,
        start_row: u32,
    ) -> PyResult<(Vec<Vec<PyObject>>, PyReportScan)> {
        let scan = scan_matrix(
            &self.inner,
            start_col,
            start_row,
            &derive_default_scan_row_options(),
        )
        .map_err(map_grid_error)?;

        let mut l_rows = Vec::with_capacity(scan.rows.len());
        for row in &scan.rows {
            l_rows.push(derive_py_values(py, row)?);
        }
        Ok((l_rows, PyReportScan::from(scan.report)))
    }

    /// Scan a matrix and return it as Arrow IPC bytes (`polars.read_ipc`).
    #[pyo3(signature = (start_col, start_row, column_names = None))]
    fn read_matrix_ipc<'py>(
        &self,
        py: Python<'py>,
        start_col: &str,
        start_row: u32,
        column_names: Option<Vec<String>>,
    ) -> PyResult<Bound<'py, PyBytes>> {
        let scan = scan_matrix(
            &self.inner,
            start_col,
            start_row,
            &derive_default_scan_row_options(),
        )
        .map_err(map_grid_error)?;
        let mut df = derive_dataframe_from_matrix(&scan.rows, column_names.as_deref())
            .map_err(map_grid_error)?;
        let v_bytes = derive_ipc_bytes_from_dataframe(&mut df).map_err(map_grid_error)?;
        Ok(PyBytes::new(py, &v_bytes))
    }

    #[pyo3(signature = (data, start_col, start_row, if_write_header = true))]
    fn write_dataframe_ipc(
        &mut self,
        data: &[u8],
        start_col: &str,
        start_row: u32,
        if_write_header: bool,
    ) -> PyResult<PyReportScan> {
        let df = derive_dataframe_from_ipc_bytes(data).map_err(map_grid_error)?;
        let report = write_dataframe(&mut self.inner, &df, start_col, start_row, if_write_header)
            .map_err(map_grid_error)?;
        Ok(PyReportScan::from(report))
    }

    /// `columns` is a list of labels or a string of single-letter labels
    /// (`"ABC"`, the default).
    #[pyo3(signature = (columns = None, start_row = 1, end_row = None))]
    fn read_multiple_columns(
        &self,
        py: Python<'_>,
        columns: Option<&Bound<'_, PyAny>>,
        start_row: u32,
        end_row: Option<u32>,
    ) -> PyResult<Vec<PyObject>> {
        let l_labels = match columns {
            None => split_column_letters(C_COLUMNS_DEFAULT),
            Some(obj) => parse_column_labels(obj)?,
        };
        let l_columns: Vec<&str> = l_labels.iter().map(String::as_str).collect();
        let l_values = read_columns(
            &self.inner,
            &l_columns,
            start_row,
            end_row,
            &derive_default_cell_read_policy(),
        )
        .map_err(map_grid_error)?;
        derive_py_values(py, &l_values)
    }

    #[pyo3(signature = (column, value, max_row = None))]
    fn lookup_value_in_column(
        &self,
        column: &str,
        value: &Bound<'_, PyAny>,
        max_row: Option<u32>,
    ) -> PyResult<Option<u32>> {
        let value = parse_cell_value(value)?;
        lookup_value_in_column(&self.inner, column, &value, max_row).map_err(map_grid_error)
    }

    #[pyo3(signature = (row, value, max_col = None))]
    fn lookup_value_in_row(
        &self,
        row: u32,
        value: &Bound<'_, PyAny>,
        max_col: Option<u32>,
    ) -> PyResult<Option<String>> {
        let value = parse_cell_value(value)?;
        lookup_value_in_row(&self.inner, row, &value, max_col).map_err(map_grid_error)
    }

    fn write_column(
        &mut self,
        column: &str,
        start_row: u32,
        values: Vec<Bound<'_, PyAny>>,
    ) -> PyResult<PyReportScan> {
        let l_values = parse_cell_values(&values)?;
        let report =
            write_column(&mut self.inner, column, start_row, l_values).map_err(map_grid_error)?;
        Ok(PyReportScan::from(report))
    }

    /// Row write; `col_skip=0` writes every column, values past `end_col` are dropped.
    #[pyo3(signature = (row_no, start_col, values, col_skip = 1, end_col = None))]
    fn write_row(
        &mut self,
        row_no: u32,
        start_col: &str,
        values: Vec<Bound<'_, PyAny>>,
        col_skip: u32,
        end_col: Option<String>,
    ) -> PyResult<PyReportScan> {
        let l_values = parse_cell_values(&values)?;
        let cfg_write_options = derive_write_row_options(col_skip, end_col);
        let report = write_row(&mut self.inner, row_no, start_col, l_values, &cfg_write_options)
            .map_err(map_grid_error)?;
        Ok(PyReportScan::from(report))
    }

    fn save(&mut self, file: &str) -> PyResult<()> {
        self.inner.save(file).map_err(map_grid_error)
    }
}

#[pyfunction]
fn col_num_to_name(col_int: u32) -> PyResult<String> {
    encode_column_label(col_int).map_err(map_grid_error)
}

#[pyfunction]
fn col_name_to_num(letters: &str) -> PyResult<u32> {
    decode_column_label(letters).map_err(map_grid_error)
}

#[pyfunction]
#[pyo3(signature = (letters, step = 1))]
fn col_increase_letter(letters: &str, step: i64) -> PyResult<String> {
    shift_column_label(letters, step).map_err(map_grid_error)
}

fn parse_rule_missing_sheet(value: &str) -> PyResult<EnumMissingSheetStrategy> {
    match value {
        "first_sheet" => Ok(EnumMissingSheetStrategy::FirstSheet),
        "error" => Ok(EnumMissingSheetStrategy::Error),
        _ => Err(PyValueError::new_err(format!(
            "Invalid missing sheet strategy: `{value}`. Expected one of: ['first_sheet', 'error']"
        ))),
    }
}

fn parse_column_labels(columns: &Bound<'_, PyAny>) -> PyResult<Vec<String>> {
    if let Ok(letters) = columns.extract::<String>() {
        return Ok(split_column_letters(&letters));
    }
    columns.extract::<Vec<String>>()
}

fn derive_read_policy(coerce: bool) -> SpecCellReadPolicy {
    if coerce {
        derive_default_cell_read_policy()
    } else {
        SpecCellReadPolicy::keep()
    }
}

fn parse_cell_value(value: &Bound<'_, PyAny>) -> PyResult<EnumCellValue> {
    if value.is_none() {
        return Ok(EnumCellValue::None);
    }
    if let Ok(val) = value.downcast::<PyBool>() {
        let c_text = if val.is_true() { "True" } else { "False" };
        return Ok(EnumCellValue::from(c_text));
    }
    if let Ok(val) = value.extract::<f64>() {
        return Ok(EnumCellValue::Number(val));
    }
    if let Ok(val) = value.extract::<String>() {
        return Ok(EnumCellValue::String(val));
    }
    Ok(EnumCellValue::String(value.str()?.to_string()))
}

fn parse_cell_values(values: &[Bound<'_, PyAny>]) -> PyResult<Vec<EnumCellValue>> {
    values.iter().map(parse_cell_value).collect()
}

fn derive_py_value(py: Python<'_>, value: &EnumCellValue) -> PyResult<PyObject> {
    Ok(match value {
        EnumCellValue::None => py.None(),
        EnumCellValue::String(val) => val.into_pyobject(py)?.into_any().unbind(),
        EnumCellValue::Number(val) => val.into_pyobject(py)?.into_any().unbind(),
    })
}

fn derive_py_values(py: Python<'_>, values: &[EnumCellValue]) -> PyResult<Vec<PyObject>> {
    values.iter().map(|value| derive_py_value(py, value)).collect()
}

fn map_grid_error(exception: GridError) -> PyErr {
    match exception {
        GridError::InvalidArgument(message) => PyValueError::new_err(message),
        GridError::Backend(message) => PyOSError::new_err(message),
    }
}

#[pymodule]
fn _gridkit_io_xlsx_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PySpecScanError>()?;
    module.add_class::<PyReportScan>()?;
    module.add_class::<PyWorkbook>()?;
    module.add_function(wrap_pyfunction!(col_num_to_name, module)?)?;
    module.add_function(wrap_pyfunction!(col_name_to_num, module)?)?;
    module.add_function(wrap_pyfunction!(col_increase_letter, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    module.add("N_NROWS_EXCEL_MAX", N_NROWS_EXCEL_MAX)?;
    module.add("N_NCOLS_EXCEL_MAX", N_NCOLS_EXCEL_MAX)?;
    module.add("C_COL_LABEL_MAX", C_COL_LABEL_MAX)?;
    Ok(())
}

