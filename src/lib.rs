// src/lib.rs
//! Redistributes per-employee daily hours across the projects each employee
//! was assigned to, proportionally to project weight.

pub mod allocation;
pub mod cell;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod monthly_aggregator;
pub mod project_registry;
pub mod sheet_io;
pub mod xlsx_io;

#[cfg(test)]
mod allocation_tests;
#[cfg(test)]
mod sheet_io_tests;

pub use allocation::{round_hours, split_by_weight, AllocationCalculator, EmployeeRef};
pub use cell::CellValue;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AppConfig;
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, Severity, TracingSink};
pub use error::{SheetError, ValidationError, ValidationErrorReason};
pub use monthly_aggregator::{
    aggregate_sheet, DailyRecord, EmployeeMonth, MonthPeriod, MonthReport, MonthSheet,
    MonthlyAggregator, ProjectRow,
};
pub use project_registry::{
    EmployeeId, MonthProjects, Project, ProjectRegistry, RawProjectRow, RegistryBuilder,
};
pub use sheet_io::{SheetGrid, Workbook, WorkbookFormat};
