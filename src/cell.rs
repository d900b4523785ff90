// src/cell.rs
use rust_decimal::Decimal;
use std::str::FromStr;

/// A spreadsheet cell as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(Decimal),
    Text(String),
}

impl CellValue {
    /// Classifies raw cell text. Whitespace-only text is `Empty`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        match Decimal::from_str(trimmed) {
            Ok(value) => CellValue::Number(value),
            Err(_) => CellValue::Text(trimmed.to_string()),
        }
    }

    /// Wraps a cell that is always read as text (names, dates, id lists),
    /// so codes such as `00123456` keep their leading zeros.
    pub fn text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    /// Reads the cell as text: numbers print without trailing zeros, so a
    /// numeric id cell `12345678` and a text one compare the same.
    pub fn into_text(self) -> Self {
        match self {
            CellValue::Number(n) => CellValue::Text(n.normalize().to_string()),
            other => other,
        }
    }

    /// Reads the cell as a number where its text allows it.
    pub fn into_number(self) -> Self {
        match self {
            CellValue::Text(t) => CellValue::parse(&t),
            other => other,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Cell content as text, `None` when empty.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Text(t) => Some(t.clone()),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(t) => write!(f, "{}", t),
        }
    }
}
