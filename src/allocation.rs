// src/allocation.rs
use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::cell::CellValue;
use crate::diagnostics::DiagnosticSink;
use crate::project_registry::{EmployeeId, Project, ProjectRegistry};

/// Rounds hours to two decimals, halves away from zero.
pub fn round_hours(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Splits `hours` proportionally to `weights`.
///
/// Every share except the last is rounded independently; the last one gets
/// whatever is left, so the shares always add back up to `hours` (rounded).
/// Returns an empty vector when `weights` is empty or sums to zero, and
/// `None` when the arithmetic leaves the `Decimal` range.
pub fn split_by_weight(hours: Decimal, weights: &[u32]) -> Option<Vec<Decimal>> {
    let total_weight: u64 = weights.iter().map(|w| u64::from(*w)).sum();
    if weights.is_empty() || total_weight == 0 {
        return Some(Vec::new());
    }
    let total_weight = Decimal::from(total_weight);

    let mut shares = Vec::with_capacity(weights.len());
    let mut allocated = dec!(0);
    let last = weights.len() - 1;
    for (idx, weight) in weights.iter().enumerate() {
        let share = if idx == last {
            hours.checked_sub(allocated)?
        } else {
            Decimal::from(*weight)
                .checked_div(total_weight)?
                .checked_mul(hours)?
        };
        let share = round_hours(share);
        allocated = allocated.checked_add(share)?;
        shares.push(share);
    }
    Some(shares)
}

/// Who a day's allocation belongs to; only used in diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct EmployeeRef<'a> {
    pub id: &'a EmployeeId,
    pub name: &'a str,
}

/// Splits one reported hour value across the projects active that day.
pub struct AllocationCalculator<'a> {
    registry: &'a ProjectRegistry,
    sink: &'a dyn DiagnosticSink,
    strict: bool,
}

impl<'a> AllocationCalculator<'a> {
    pub fn new(registry: &'a ProjectRegistry, sink: &'a dyn DiagnosticSink, strict: bool) -> Self {
        Self {
            registry,
            sink,
            strict,
        }
    }

    /// Returns one value per entry of `month_projects`, in the same order.
    ///
    /// Missing, zero, non-numeric or out-of-range input and days outside
    /// every project window all yield zeros; everything but missing and zero
    /// input is reported in strict mode.
    pub fn allocate_day(
        &self,
        employee: EmployeeRef<'_>,
        reported: &CellValue,
        month_projects: &[&Project],
        date: NaiveDate,
    ) -> Vec<Decimal> {
        let zeros = vec![dec!(0.00); month_projects.len()];

        let hours = match reported {
            CellValue::Empty => return zeros,
            CellValue::Number(n) if n.is_zero() => return zeros,
            CellValue::Number(n) => *n,
            CellValue::Text(text) => {
                if self.strict {
                    self.sink.warn(&format!(
                        "Employee {}{} on {}: hour value '{}' must be an integer or decimal number",
                        employee.id, employee.name, date, text
                    ));
                }
                return zeros;
            }
        };

        let day_active: Vec<usize> = month_projects
            .iter()
            .enumerate()
            .filter(|(_, project)| self.registry.is_active_on_day(&project.name, date))
            .map(|(idx, _)| idx)
            .collect();

        if day_active.is_empty() {
            if self.strict {
                self.sink.warn(&format!(
                    "Employee {}{} on {} falls between projects; {} hours cannot be allocated",
                    employee.id, employee.name, date, hours
                ));
            }
            return zeros;
        }

        let weights: Vec<u32> = day_active
            .iter()
            .map(|idx| month_projects[*idx].weight)
            .collect();
        let Some(shares) = split_by_weight(hours, &weights) else {
            if self.strict {
                self.sink.warn(&format!(
                    "Employee {}{} on {}: hour value {} is out of range",
                    employee.id, employee.name, date, hours
                ));
            }
            return zeros;
        };

        let mut allocation = zeros;
        for (idx, share) in day_active.into_iter().zip(shares) {
            allocation[idx] = share;
        }
        debug!(
            "Allocated {} hours for {} on {}: {:?}",
            hours, employee.id, date, allocation
        );
        allocation
    }
}
