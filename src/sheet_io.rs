// src/sheet_io.rs
//! Workbook front end: reads the registry and the monthly timesheets into
//! engine types and writes the redistributed sheets back out. Excel workbooks
//! go through `xlsx_io`; a directory of CSV sheets is the plain-text variant.

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::cell::CellValue;
use crate::config::AppConfig;
use crate::diagnostics::DiagnosticSink;
use crate::error::SheetError;
use crate::monthly_aggregator::{DailyRecord, MonthPeriod, MonthReport, MonthSheet};
use crate::project_registry::RawProjectRow;
use crate::xlsx_io;

pub const MONTH_MARKER: char = '月';
pub const OUTPUT_PREFIX: &str = "TimeResults_";
const MIN_YEAR: i32 = 1900;
const CSV_EXTENSION: &str = "csv";
const XLSX_EXTENSION: &str = "xlsx";

static YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(\d{4})").expect("valid regex"));
static MONTH_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\s*月").expect("valid regex"));

/// One sheet as rows of cells, whatever container it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    /// Tab name for spreadsheets, file stem for CSV.
    pub name: String,
    /// Row 0 is the first line of the sheet.
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetGrid {
    pub fn cell(&self, row: usize, col: usize) -> CellValue {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .cloned()
            .unwrap_or_default()
    }

    fn text(&self, row: usize, col: usize) -> String {
        self.cell(row, col).into_text().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    /// An Excel (or other calamine-readable) workbook, one tab per month.
    Xlsx,
    /// A directory holding one CSV file per month.
    CsvDirectory,
}

impl WorkbookFormat {
    pub fn of(path: &Path) -> Self {
        if path.is_dir() {
            WorkbookFormat::CsvDirectory
        } else {
            WorkbookFormat::Xlsx
        }
    }
}

/// All monthly sheets of one timesheet workbook, in month order.
#[derive(Debug, Clone)]
pub struct Workbook {
    /// File stem (or directory name); carries the year.
    pub name: String,
    pub year: i32,
    pub format: WorkbookFormat,
    pub sheets: Vec<MonthSheet>,
}

// --- Naming Conventions ---

/// Year carried by a workbook name, e.g. `产研平台工时数据-202101-08` -> 2021.
pub fn workbook_year(name: &str) -> Result<i32, SheetError> {
    let missing = || SheetError::MissingYear {
        name: name.to_string(),
    };
    let year: i32 = YEAR_TOKEN
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(missing)?;
    if year < MIN_YEAR {
        return Err(SheetError::InvalidYear { year });
    }
    Ok(year)
}

/// Month number of a sheet label such as `3月` or `2021年03月`.
pub fn sheet_month(label: &str) -> Result<u32, SheetError> {
    if !label.contains(MONTH_MARKER) {
        return Err(SheetError::MissingMonthMarker {
            label: label.to_string(),
        });
    }
    let invalid = || SheetError::InvalidMonth {
        label: label.to_string(),
    };
    let month: u32 = MONTH_LABEL
        .captures(label)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(invalid)?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok(month)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// --- CSV Plumbing ---

fn csv_error(path: &str) -> impl Fn(csv::Error) -> SheetError + '_ {
    move |source| SheetError::Csv {
        path: path.to_string(),
        source,
    }
}

fn io_error(path: &Path) -> impl Fn(std::io::Error) -> SheetError + '_ {
    move |source| SheetError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn read_records<R: Read>(reader: R, source_name: &str) -> Result<Vec<StringRecord>, SheetError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    csv_reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_error(source_name))
}

/// Reads a CSV sheet into a grid of text cells. A leading BOM is dropped.
pub fn read_csv_grid<R: Read>(reader: R, name: &str) -> Result<SheetGrid, SheetError> {
    let rows = read_records(reader, name)?
        .iter()
        .map(|record| {
            record
                .iter()
                .enumerate()
                .map(|(idx, raw)| {
                    let raw = if idx == 0 {
                        raw.trim_start_matches('\u{feff}')
                    } else {
                        raw
                    };
                    CellValue::text(raw)
                })
                .collect()
        })
        .collect();
    Ok(SheetGrid {
        name: name.to_string(),
        rows,
    })
}

// --- Registry ---

/// Extracts project rows from a registry sheet. `title` is the sheet's
/// identity: the tab name of a spreadsheet or the first cell of a CSV file.
/// Rows without members are skipped.
pub fn registry_rows(
    grid: &SheetGrid,
    title: &str,
    source_name: &str,
    config: &AppConfig,
) -> Result<Vec<RawProjectRow>, SheetError> {
    let found = title.trim();
    if !config.registry_title.is_empty() && found != config.registry_title {
        return Err(SheetError::WrongSheetIdentity {
            source_name: source_name.to_string(),
            expected: config.registry_title.clone(),
            found: found.to_string(),
        });
    }

    let mut rows = Vec::new();
    for idx in config.registry_header_rows..grid.rows.len() {
        let line = idx + 1;
        let members = grid.cell(idx, 4).into_text();
        if members.is_empty() {
            debug!("Registry line {} has no members, skipped", line);
            continue;
        }
        rows.push(RawProjectRow {
            line,
            name: grid.cell(idx, 0).into_text(),
            start: grid.cell(idx, 1).into_text(),
            end: grid.cell(idx, 2).into_text(),
            weight: grid.cell(idx, 3).into_number(),
            members,
        });
    }
    Ok(rows)
}

/// Reads a CSV registry, whose first cell is the sheet title.
pub fn read_registry<R: Read>(
    reader: R,
    source_name: &str,
    config: &AppConfig,
) -> Result<Vec<RawProjectRow>, SheetError> {
    let grid = read_csv_grid(reader, source_name)?;
    let title = grid.text(0, 0);
    registry_rows(&grid, &title, source_name, config)
}

/// Reads the registry from a `.csv` file or from the first sheet of a
/// spreadsheet workbook.
pub fn read_registry_file(path: &Path, config: &AppConfig) -> Result<Vec<RawProjectRow>, SheetError> {
    info!("Reading project membership sheet [{}] ...", path.display());
    let source_name = path.display().to_string();
    if has_extension(path, CSV_EXTENSION) {
        let file = File::open(path).map_err(io_error(path))?;
        return read_registry(file, &source_name, config);
    }
    let grid = xlsx_io::read_first_sheet(path)?.ok_or_else(|| SheetError::EmptyWorkbook {
        name: source_name.clone(),
    })?;
    registry_rows(&grid, &grid.name, &source_name, config)
}

// --- Monthly Sheets ---

/// Turns one monthly sheet into records. The grid name is the sheet label;
/// the first row with an id is the header.
pub fn month_sheet(
    grid: &SheetGrid,
    year: i32,
    config: &AppConfig,
    sink: &dyn DiagnosticSink,
) -> Result<MonthSheet, SheetError> {
    let label = grid.name.as_str();
    let month = sheet_month(label)?;
    let period = MonthPeriod::new(year, month).ok_or_else(|| SheetError::InvalidMonth {
        label: label.to_string(),
    })?;

    let first_day = config.first_day_column();
    let identity_columns = config.identity_columns;

    let mut header: Option<Vec<String>> = None;
    let mut records = Vec::new();
    let mut widest = 0;
    for (idx, row) in grid.rows.iter().enumerate() {
        let line = idx + 1;
        if grid.text(idx, 0).trim().is_empty() {
            if config.strict {
                sink.warn(&format!(
                    "Sheet [{}] line {} is empty or incomplete: {:?}",
                    label,
                    line,
                    row.iter().map(ToString::to_string).collect::<Vec<_>>()
                ));
            }
            continue;
        }
        widest = widest.max(row.len());

        if header.is_none() {
            header = Some((0..row.len()).map(|c| grid.text(idx, c)).collect());
            continue;
        }
        records.push(DailyRecord {
            line,
            identity: (0..identity_columns).map(|c| grid.text(idx, c)).collect(),
            days: (first_day..row.len())
                .map(|c| grid.cell(idx, c).into_number())
                .collect(),
        });
    }

    let header = header.unwrap_or_default();
    let available_days = widest.saturating_sub(first_day);
    debug!(
        "Sheet [{}]: {} rows, {} day columns",
        label,
        records.len(),
        available_days
    );
    Ok(MonthSheet {
        label: label.to_string(),
        period,
        header,
        records,
        available_days,
    })
}

/// Reads one CSV monthly sheet labelled `label`.
pub fn read_month_sheet<R: Read>(
    reader: R,
    label: &str,
    year: i32,
    config: &AppConfig,
    sink: &dyn DiagnosticSink,
) -> Result<MonthSheet, SheetError> {
    let grid = read_csv_grid(reader, label)?;
    month_sheet(&grid, year, config, sink)
}

fn read_csv_directory(dir: &Path) -> Result<Vec<SheetGrid>, SheetError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_error(dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| has_extension(path, CSV_EXTENSION))
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            let file = File::open(path).map_err(io_error(path))?;
            read_csv_grid(file, &stem(path))
        })
        .collect()
}

/// Reads every monthly sheet of a workbook: an Excel file, or a directory
/// of `*.csv` sheets.
pub fn read_workbook(
    path: &Path,
    year_override: Option<i32>,
    config: &AppConfig,
    sink: &dyn DiagnosticSink,
) -> Result<Workbook, SheetError> {
    let format = WorkbookFormat::of(path);
    let name = match format {
        WorkbookFormat::CsvDirectory => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        WorkbookFormat::Xlsx => stem(path),
    };
    let year = match year_override {
        Some(year) if year >= MIN_YEAR => year,
        Some(year) => return Err(SheetError::InvalidYear { year }),
        None => workbook_year(&name)?,
    };

    sink.info(&format!("Reading timesheet workbook [{}] for {} ...", name, year));
    let grids = match format {
        WorkbookFormat::CsvDirectory => read_csv_directory(path)?,
        WorkbookFormat::Xlsx => xlsx_io::read_sheets(path)?,
    };

    let mut sheets = Vec::with_capacity(grids.len());
    for grid in &grids {
        sink.info(&format!("Reading {}-{} ...", year, grid.name));
        sheets.push(month_sheet(grid, year, config, sink)?);
    }
    if sheets.is_empty() {
        return Err(SheetError::EmptyWorkbook { name });
    }
    sheets.sort_by_key(|sheet| sheet.period);

    Ok(Workbook {
        name,
        year,
        format,
        sheets,
    })
}

// --- Writers ---

/// Writes the header and one line per (employee, project).
pub fn write_month_report<W: Write>(writer: W, report: &MonthReport) -> Result<(), SheetError> {
    let to_err = csv_error(&report.label);
    let mut csv_writer = WriterBuilder::new().flexible(true).from_writer(writer);
    csv_writer.write_record(&report.header).map_err(&to_err)?;
    for row in report.project_rows() {
        let mut line: Vec<String> = row.identity;
        line.push(row.project);
        line.push(format!("{:.2}", row.total));
        line.extend(row.days.iter().map(|h| format!("{:.2}", h)));
        csv_writer.write_record(&line).map_err(&to_err)?;
    }
    csv_writer.flush().map_err(|source| SheetError::Io {
        path: report.label.clone(),
        source,
    })?;
    Ok(())
}

/// Writes every report under `output_dir` in the workbook's own format:
/// `TimeResults_<name>.xlsx`, or a `TimeResults_<name>/` directory holding
/// `<label>.csv` files. Returns the path written.
pub fn write_workbook(
    output_dir: &Path,
    workbook_name: &str,
    format: WorkbookFormat,
    reports: &[MonthReport],
) -> Result<PathBuf, SheetError> {
    if reports.is_empty() {
        warn!("No monthly reports to write for {}", workbook_name);
    }
    let base = format!("{}{}", OUTPUT_PREFIX, workbook_name);
    match format {
        WorkbookFormat::Xlsx => {
            fs::create_dir_all(output_dir).map_err(io_error(output_dir))?;
            let target = output_dir.join(format!("{}.{}", base, XLSX_EXTENSION));
            xlsx_io::write_reports(&target, reports)?;
            Ok(target)
        }
        WorkbookFormat::CsvDirectory => {
            let target = output_dir.join(base);
            fs::create_dir_all(&target).map_err(io_error(&target))?;
            for report in reports {
                let path = target.join(format!("{}.{}", report.label, CSV_EXTENSION));
                let file = File::create(&path).map_err(io_error(&path))?;
                write_month_report(file, report)?;
                debug!("Wrote {}", path.display());
            }
            Ok(target)
        }
    }
}
