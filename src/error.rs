// src/error.rs
use thiserror::Error;

// --- Registry Validation Errors ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorReason {
    #[error("Project name is empty")]
    MissingProjectName,
    #[error("Start date of project '{project}' is empty")]
    MissingStartDate { project: String },
    #[error("Invalid date '{value}' for project '{project}', expected YYYY-MM-DD")]
    InvalidDateFormat { project: String, value: String },
    #[error("Project '{project}' starts on {start}, after its end date {end}")]
    StartAfterEnd {
        project: String,
        start: String,
        end: String,
    },
    #[error("Weight '{value}' of project '{project}' must be a positive integer")]
    InvalidWeight { project: String, value: String },
    #[error("[{project}] member id '{token}' is shorter than 8 characters")]
    MemberIdTooShort { project: String, token: String },
    #[error("Project '{project}' is registered more than once")]
    DuplicateProject { project: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Registry row {line} rejected: {reason}")]
pub struct ValidationError {
    pub line: usize, // 1-based line in the registry sheet
    pub reason: ValidationErrorReason,
}

impl ValidationError {
    pub fn new(line: usize, reason: ValidationErrorReason) -> Self {
        Self { line, reason }
    }
}

// --- Sheet Structure Errors ---

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Sheet '{source_name}' is not a project registry: expected title '{expected}', found '{found}'")]
    WrongSheetIdentity {
        source_name: String,
        expected: String,
        found: String,
    },
    #[error("Sheet label '{label}' has no month marker (e.g. '3月')")]
    MissingMonthMarker { label: String },
    #[error("Sheet label '{label}' names an invalid month")]
    InvalidMonth { label: String },
    #[error("Workbook name '{name}' must carry a 4-digit year after '-', e.g. '工时数据-202101-08'")]
    MissingYear { name: String },
    #[error("Year {year} is out of range")]
    InvalidYear { year: i32 },
    #[error("Workbook '{name}' contains no monthly sheets")]
    EmptyWorkbook { name: String },
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("Cannot read spreadsheet '{path}': {source}")]
    Xlsx {
        path: String,
        #[source]
        source: calamine::Error,
    },
    #[error("Cannot write workbook '{path}': {source}")]
    XlsxWrite {
        path: String,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
