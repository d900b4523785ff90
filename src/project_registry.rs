// src/project_registry.rs
use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::cell::CellValue;
use crate::clock::Clock;
use crate::error::{ValidationError, ValidationErrorReason};

pub const EMPLOYEE_ID_LEN: usize = 8;
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const DATE_LEN: usize = 10;
const MEMBER_DELIMITERS: [char; 2] = [',', '，'];

// --- Core Data Structures ---

/// Eight-character employee code shared by the registry and the timesheets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmployeeId(String);

impl EmployeeId {
    /// Parses a membership token: at least 8 characters, truncated to 8.
    pub fn from_member_token(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.chars().count() < EMPLOYEE_ID_LEN {
            return None;
        }
        Some(Self(token.chars().take(EMPLOYEE_ID_LEN).collect()))
    }

    /// Normalizes an id read from a timesheet row the same way, without
    /// rejecting short values (they simply never match a member).
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().chars().take(EMPLOYEE_ID_LEN).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate, // inclusive
    pub weight: u32,
}

impl Project {
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// True when the project window touches any day of `year`-`month`.
    pub fn overlaps_month(&self, year: i32, month: u32) -> bool {
        let target = (year, month);
        (self.start.year(), self.start.month()) <= target
            && target <= (self.end.year(), self.end.month())
    }
}

/// One row of the project/membership sheet, as extracted by the reader.
#[derive(Debug, Clone, Default)]
pub struct RawProjectRow {
    pub line: usize,
    pub name: CellValue,
    pub start: CellValue,
    pub end: CellValue,
    pub weight: CellValue,
    pub members: CellValue,
}

/// Result of asking which projects an employee works on in a month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonthProjects<'a> {
    UnknownEmployee,
    Projects(Vec<&'a Project>),
}

// --- Registry ---

/// Projects and memberships, frozen once built.
#[derive(Debug, Clone, Default)]
pub struct ProjectRegistry {
    projects: HashMap<String, Project>,
    members: HashMap<EmployeeId, Vec<String>>, // project names in discovery order
}

impl ProjectRegistry {
    pub fn builder(clock: &dyn Clock) -> RegistryBuilder<'_> {
        RegistryBuilder {
            clock,
            registry: ProjectRegistry::default(),
        }
    }

    /// Builds the registry from every row, stopping at the first invalid one.
    pub fn from_rows<I>(rows: I, clock: &dyn Clock) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = RawProjectRow>,
    {
        let mut builder = Self::builder(clock);
        for row in rows {
            builder.register(&row)?;
        }
        let registry = builder.build();
        info!(
            "Project registry built: {} projects, {} members",
            registry.project_count(),
            registry.member_count()
        );
        Ok(registry)
    }

    pub fn project(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn projects_of(&self, employee: &EmployeeId) -> Option<&[String]> {
        self.members.get(employee).map(Vec::as_slice)
    }

    /// Projects of `employee` whose window overlaps the month, in the order
    /// they were registered for that employee.
    pub fn active_projects_for_month(
        &self,
        employee: &EmployeeId,
        year: i32,
        month: u32,
    ) -> MonthProjects<'_> {
        let Some(names) = self.members.get(employee) else {
            return MonthProjects::UnknownEmployee;
        };
        let projects = names
            .iter()
            .filter_map(|name| self.projects.get(name))
            .filter(|project| project.overlaps_month(year, month))
            .collect();
        MonthProjects::Projects(projects)
    }

    /// Exact-day check. Unknown projects are never active.
    pub fn is_active_on_day(&self, project_name: &str, date: NaiveDate) -> bool {
        self.projects
            .get(project_name)
            .is_some_and(|project| project.is_active_on(date))
    }
}

pub struct RegistryBuilder<'c> {
    clock: &'c dyn Clock,
    registry: ProjectRegistry,
}

impl<'c> RegistryBuilder<'c> {
    /// Validates one row and commits its project and memberships together.
    /// A failing row leaves the builder unchanged.
    pub fn register(&mut self, row: &RawProjectRow) -> Result<(), ValidationError> {
        let fail = |reason: ValidationErrorReason| ValidationError::new(row.line, reason);

        let project = self.validate_project(row).map_err(fail)?;
        if self.registry.projects.contains_key(&project.name) {
            return Err(fail(ValidationErrorReason::DuplicateProject {
                project: project.name,
            }));
        }
        let raw_members = row.members.as_text().unwrap_or_default();
        let member_ids = parse_member_list(&project.name, &raw_members).map_err(fail)?;

        debug!(
            "Registering project '{}' ({} .. {}, weight {}) with {} members",
            project.name,
            project.start,
            project.end,
            project.weight,
            member_ids.len()
        );
        for member in member_ids {
            let projects = self.registry.members.entry(member).or_default();
            if !projects.contains(&project.name) {
                projects.push(project.name.clone());
            }
        }
        self.registry.projects.insert(project.name.clone(), project);
        Ok(())
    }

    pub fn build(self) -> ProjectRegistry {
        self.registry
    }

    fn validate_project(&self, row: &RawProjectRow) -> Result<Project, ValidationErrorReason> {
        let name = row
            .name
            .as_text()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or(ValidationErrorReason::MissingProjectName)?;

        let start_text = row
            .start
            .as_text()
            .ok_or_else(|| ValidationErrorReason::MissingStartDate {
                project: name.clone(),
            })?;
        let start = parse_date(&name, &start_text)?;

        let end = match row.end.as_text() {
            Some(end_text) => parse_date(&name, &end_text)?,
            None => self.clock.today(),
        };

        if start > end {
            return Err(ValidationErrorReason::StartAfterEnd {
                project: name,
                start: start.format(DATE_FORMAT).to_string(),
                end: end.format(DATE_FORMAT).to_string(),
            });
        }

        let weight = parse_weight(&name, &row.weight)?;

        Ok(Project {
            name,
            start,
            end,
            weight,
        })
    }
}

// --- Parsing Helpers ---

fn parse_date(project: &str, raw: &str) -> Result<NaiveDate, ValidationErrorReason> {
    let value = raw.trim();
    let invalid = || ValidationErrorReason::InvalidDateFormat {
        project: project.to_string(),
        value: value.to_string(),
    };
    if value.chars().count() != DATE_LEN {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| invalid())
}

fn parse_weight(project: &str, cell: &CellValue) -> Result<u32, ValidationErrorReason> {
    let invalid = || ValidationErrorReason::InvalidWeight {
        project: project.to_string(),
        value: cell.to_string(),
    };
    match cell {
        CellValue::Empty => Ok(1),
        CellValue::Number(n) if n.fract().is_zero() => {
            n.to_u32().filter(|w| *w > 0).ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

/// Splits a raw member cell into employee ids, dropping repeats while
/// keeping first-seen order.
///
/// Each line is a `,`/`，` separated list that may end with one delimiter;
/// blank lines are ignored. Any other empty token is a member id that is too
/// short.
pub fn parse_member_list(
    project: &str,
    raw: &str,
) -> Result<Vec<EmployeeId>, ValidationErrorReason> {
    let is_delimiter = |c: char| MEMBER_DELIMITERS.contains(&c);

    let mut ids: Vec<EmployeeId> = Vec::new();
    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let line = line.strip_suffix(is_delimiter).unwrap_or(line);
        for token in line.split(is_delimiter).map(str::trim) {
            let id = EmployeeId::from_member_token(token).ok_or_else(|| {
                ValidationErrorReason::MemberIdTooShort {
                    project: project.to_string(),
                    token: token.to_string(),
                }
            })?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    Ok(ids)
}
