// src/monthly_aggregator.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use crate::allocation::{round_hours, AllocationCalculator, EmployeeRef};
use crate::cell::CellValue;
use crate::diagnostics::DiagnosticSink;
use crate::project_registry::{EmployeeId, MonthProjects, ProjectRegistry};

/// Header cell inserted in front of the project column.
pub const PROJECT_HEADER: &str = "项目";

// --- Periods and Input Rows ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthPeriod {
    year: i32,
    month: u32,
}

impl MonthPeriod {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn days(&self) -> u32 {
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1);
        let next = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
        };
        match (first, next) {
            (Some(first), Some(next)) => (next - first).num_days() as u32,
            _ => 0,
        }
    }

    pub fn date(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }
}

impl std::fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// One employee's raw row for a month.
#[derive(Debug, Clone, Default)]
pub struct DailyRecord {
    pub line: usize,
    /// Identifying fields carried to every output row; id first, name second.
    pub identity: Vec<String>,
    /// Reported hours, day 1 first.
    pub days: Vec<CellValue>,
}

impl DailyRecord {
    pub fn raw_id(&self) -> &str {
        self.identity.first().map(String::as_str).unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.identity.get(1).map(String::as_str).unwrap_or_default()
    }
}

/// A monthly sheet after extraction: header, rows, and how many day
/// columns are usable.
#[derive(Debug, Clone)]
pub struct MonthSheet {
    pub label: String,
    pub period: MonthPeriod,
    pub header: Vec<String>,
    pub records: Vec<DailyRecord>,
    pub available_days: usize,
}

// --- Output ---

#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeMonth {
    pub employee_id: EmployeeId,
    pub identity: Vec<String>,
    pub projects: Vec<String>,
    pub monthly_totals: Vec<Decimal>,
    /// One vector per day, aligned with `projects`.
    pub daily: Vec<Vec<Decimal>>,
}

/// One physical output line: an (employee, project) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRow {
    pub identity: Vec<String>,
    pub project: String,
    pub total: Decimal,
    pub days: Vec<Decimal>,
}

impl EmployeeMonth {
    /// Transposes the per-day matrix into one row per project.
    pub fn project_rows(&self) -> Vec<ProjectRow> {
        self.projects
            .iter()
            .enumerate()
            .map(|(idx, project)| ProjectRow {
                identity: self.identity.clone(),
                project: project.clone(),
                total: self.monthly_totals[idx],
                days: self.daily.iter().map(|day| day[idx]).collect(),
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct MonthReport {
    pub label: String,
    pub period: MonthPeriod,
    pub header: Vec<String>,
    /// Number of day columns at the end of `header` and of every row.
    pub day_count: usize,
    pub employees: Vec<EmployeeMonth>,
}

impl MonthReport {
    pub fn project_rows(&self) -> impl Iterator<Item = ProjectRow> + '_ {
        self.employees.iter().flat_map(EmployeeMonth::project_rows)
    }
}

// --- Aggregator ---

pub struct MonthlyAggregator<'a> {
    registry: &'a ProjectRegistry,
    sink: &'a dyn DiagnosticSink,
    strict: bool,
    period: MonthPeriod,
    day_count: usize,
}

impl<'a> MonthlyAggregator<'a> {
    /// `available_days` is how many day columns the sheet provides; the
    /// aggregator never goes past the calendar length of the month.
    pub fn new(
        registry: &'a ProjectRegistry,
        sink: &'a dyn DiagnosticSink,
        strict: bool,
        period: MonthPeriod,
        available_days: usize,
    ) -> Self {
        let day_count = (period.days() as usize).min(available_days);
        Self {
            registry,
            sink,
            strict,
            period,
            day_count,
        }
    }

    pub fn day_count(&self) -> usize {
        self.day_count
    }

    /// Allocates one employee's month. `None` when the employee is not in the
    /// membership index.
    pub fn process(&self, record: &DailyRecord) -> Option<EmployeeMonth> {
        let employee_id = EmployeeId::normalize(record.raw_id());
        let projects = match self.registry.active_projects_for_month(
            &employee_id,
            self.period.year(),
            self.period.month(),
        ) {
            MonthProjects::Projects(projects) => projects,
            MonthProjects::UnknownEmployee => {
                if self.strict {
                    self.sink.warn(&format!(
                        "Employee {}{} has no record in the project membership sheet",
                        record.raw_id(),
                        record.name()
                    ));
                }
                return None;
            }
        };

        let calculator = AllocationCalculator::new(self.registry, self.sink, self.strict);
        let employee = EmployeeRef {
            id: &employee_id,
            name: record.name(),
        };

        let mut monthly_totals = vec![dec!(0.00); projects.len()];
        let mut daily = Vec::with_capacity(self.day_count);
        let empty = CellValue::Empty;
        for day in 1..=self.day_count {
            let Some(date) = self.period.date(day as u32) else {
                break;
            };
            let reported = record.days.get(day - 1).unwrap_or(&empty);
            let allocation = calculator.allocate_day(employee, reported, &projects, date);
            let folded: Option<Vec<Decimal>> = monthly_totals
                .iter()
                .zip(&allocation)
                .map(|(total, hours)| total.checked_add(*hours).map(round_hours))
                .collect();
            match folded {
                Some(totals) => {
                    monthly_totals = totals;
                    daily.push(allocation);
                }
                None => {
                    if self.strict {
                        self.sink.warn(&format!(
                            "Employee {}{} on {}: hour value {} overflows the monthly total",
                            employee_id,
                            record.name(),
                            date,
                            reported
                        ));
                    }
                    daily.push(vec![dec!(0.00); projects.len()]);
                }
            }
        }

        debug!(
            "Employee {} in {}: {} projects, totals {:?}",
            employee_id,
            self.period,
            projects.len(),
            monthly_totals
        );
        Some(EmployeeMonth {
            employee_id: employee_id.clone(),
            identity: record.identity.clone(),
            projects: projects.iter().map(|p| p.name.clone()).collect(),
            monthly_totals,
            daily,
        })
    }

    /// Output header: identifying headers, the project column, then the
    /// input header from its total column through the last processed day.
    pub fn output_header(&self, header: &[String], identity_columns: usize) -> Vec<String> {
        let end = (identity_columns + 1 + self.day_count).min(header.len());
        let split = identity_columns.min(end);
        let mut out: Vec<String> = header[..split].to_vec();
        out.resize(identity_columns, String::new());
        out.push(PROJECT_HEADER.to_string());
        out.extend_from_slice(&header[split..end]);
        out
    }
}

/// Runs every record of a sheet through the aggregator.
pub fn aggregate_sheet(
    sheet: &MonthSheet,
    registry: &ProjectRegistry,
    sink: &dyn DiagnosticSink,
    strict: bool,
    identity_columns: usize,
) -> MonthReport {
    let aggregator = MonthlyAggregator::new(
        registry,
        sink,
        strict,
        sheet.period,
        sheet.available_days,
    );
    sink.info(&format!(
        "Processing {}-{} ({} days, {} employee rows) ...",
        sheet.period.year(),
        sheet.label,
        aggregator.day_count(),
        sheet.records.len()
    ));

    let employees: Vec<EmployeeMonth> = sheet
        .records
        .iter()
        .filter_map(|record| aggregator.process(record))
        .collect();

    info!(
        "Sheet {} ({}): {} of {} employees allocated",
        sheet.label,
        sheet.period,
        employees.len(),
        sheet.records.len()
    );
    MonthReport {
        label: sheet.label.clone(),
        period: sheet.period,
        header: aggregator.output_header(&sheet.header, identity_columns),
        day_count: aggregator.day_count(),
        employees,
    }
}
