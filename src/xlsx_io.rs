// src/xlsx_io.rs
//! Excel workbooks: sheets are read with calamine and results are written
//! with rust_xlsxwriter.

use calamine::{open_workbook_auto, Data, Range, Reader};
use rust_decimal::prelude::*;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::path::Path;
use tracing::debug;

use crate::cell::CellValue;
use crate::error::SheetError;
use crate::monthly_aggregator::MonthReport;
use crate::project_registry::{DATE_FORMAT, DATE_LEN};
use crate::sheet_io::SheetGrid;

const HOURS_FORMAT: &str = "0.00";
const DAY_COLUMN_WIDTH: f64 = 5.0;

fn read_error(path: &Path) -> impl Fn(calamine::Error) -> SheetError + '_ {
    move |source| SheetError::Xlsx {
        path: path.display().to_string(),
        source,
    }
}

fn write_error(path: &Path) -> impl Fn(XlsxError) -> SheetError + '_ {
    move |source| SheetError::XlsxWrite {
        path: path.display().to_string(),
        source,
    }
}

// --- Reading ---

fn number_or_text(value: f64) -> CellValue {
    Decimal::from_f64(value)
        .map(CellValue::Number)
        .unwrap_or_else(|| CellValue::Text(value.to_string()))
}

/// Converts one spreadsheet cell. Date cells become `YYYY-MM-DD` text, the
/// shape registry dates are validated against.
pub fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s),
        Data::Int(i) => CellValue::Number(Decimal::from(*i)),
        Data::Float(f) => number_or_text(*f),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => CellValue::Text(datetime.format(DATE_FORMAT).to_string()),
            None => number_or_text(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::text(s.get(..DATE_LEN).unwrap_or(s)),
        Data::DurationIso(s) => CellValue::text(s),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

/// Lays a used range out on absolute positions, so row and column indices
/// match the sheet even when the range does not start at `A1`.
pub fn grid_from_range(name: &str, range: &Range<Data>) -> SheetGrid {
    let (first_row, first_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); first_row as usize];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; first_col as usize];
        cells.extend(row.iter().map(cell_value));
        rows.push(cells);
    }
    SheetGrid {
        name: name.to_string(),
        rows,
    }
}

/// Reads every sheet, in workbook order.
pub fn read_sheets(path: &Path) -> Result<Vec<SheetGrid>, SheetError> {
    let mut workbook = open_workbook_auto(path).map_err(read_error(path))?;
    let names = workbook.sheet_names();
    debug!("Workbook {} has sheets {:?}", path.display(), names);
    names
        .iter()
        .map(|name| {
            let range = workbook.worksheet_range(name).map_err(read_error(path))?;
            Ok(grid_from_range(name, &range))
        })
        .collect()
}

/// Reads the first sheet, `None` for a workbook without sheets.
pub fn read_first_sheet(path: &Path) -> Result<Option<SheetGrid>, SheetError> {
    let mut workbook = open_workbook_auto(path).map_err(read_error(path))?;
    let Some(name) = workbook.sheet_names().into_iter().next() else {
        return Ok(None);
    };
    let range = workbook.worksheet_range(&name).map_err(read_error(path))?;
    Ok(Some(grid_from_range(&name, &range)))
}

// --- Writing ---

fn write_report(sheet: &mut Worksheet, report: &MonthReport, hours: &Format) -> Result<(), XlsxError> {
    let first_day = report.header.len().saturating_sub(report.day_count);
    for (col, title) in report.header.iter().enumerate() {
        let col = col as u16;
        sheet.write_string(0, col, title)?;
        if col as usize >= first_day {
            sheet.set_column_width(col, DAY_COLUMN_WIDTH)?;
        }
    }

    for (idx, row) in report.project_rows().enumerate() {
        let line = idx as u32 + 1;
        for (col, field) in row.identity.iter().enumerate() {
            if !field.is_empty() {
                sheet.write_string(line, col as u16, field)?;
            }
        }
        let mut col = row.identity.len() as u16;
        sheet.write_string(line, col, &row.project)?;
        for value in std::iter::once(row.total).chain(row.days.iter().copied()) {
            col += 1;
            sheet.write_number_with_format(line, col, value.to_f64().unwrap_or_default(), hours)?;
        }
    }
    Ok(())
}

/// Writes one sheet per report, named after the input sheet.
pub fn write_reports(path: &Path, reports: &[MonthReport]) -> Result<(), SheetError> {
    let to_err = write_error(path);
    let hours = Format::new().set_num_format(HOURS_FORMAT);
    let mut workbook = Workbook::new();
    for report in reports {
        let sheet = workbook.add_worksheet();
        sheet.set_name(&report.label).map_err(&to_err)?;
        write_report(sheet, report, &hours).map_err(&to_err)?;
    }
    workbook.save(path).map_err(&to_err)?;
    debug!("Wrote {}", path.display());
    Ok(())
}
