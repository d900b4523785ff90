// src/allocation_tests.rs

#[cfg(test)]
mod tests {
    use crate::allocation::*;
    use crate::cell::CellValue;
    use crate::clock::FixedClock;
    use crate::diagnostics::{CollectingSink, Severity};
    use crate::project_registry::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    // (name, start, end, weight) all enrolling employee 12345678
    fn registry(projects: &[(&str, &str, &str, u32)]) -> ProjectRegistry {
        let rows = projects
            .iter()
            .enumerate()
            .map(|(idx, (name, start, end, weight))| RawProjectRow {
                line: idx + 3,
                name: CellValue::text(name),
                start: CellValue::text(start),
                end: CellValue::text(end),
                weight: CellValue::Number(Decimal::from(*weight)),
                members: CellValue::text("12345678AB"),
            })
            .collect::<Vec<_>>();
        ProjectRegistry::from_rows(rows, &FixedClock::new(d("2021-12-31"))).unwrap()
    }

    fn employee() -> EmployeeId {
        EmployeeId::normalize("12345678AB")
    }

    fn month_projects<'a>(registry: &'a ProjectRegistry, names: &[&str]) -> Vec<&'a Project> {
        names
            .iter()
            .map(|name| registry.project(name).expect("project registered"))
            .collect()
    }

    fn allocate(
        registry: &ProjectRegistry,
        sink: &CollectingSink,
        strict: bool,
        order: &[&str],
        reported: CellValue,
        date: &str,
    ) -> Vec<Decimal> {
        let id = employee();
        let calculator = AllocationCalculator::new(registry, sink, strict);
        calculator.allocate_day(
            EmployeeRef {
                id: &id,
                name: "张三",
            },
            &reported,
            &month_projects(registry, order),
            d(date),
        )
    }

    // --- split_by_weight ---

    #[test]
    fn test_split_even_weights() {
        assert_eq!(split_by_weight(dec!(1.00), &[1, 1]), Some(vec![dec!(0.50), dec!(0.50)]));
    }

    #[test]
    fn test_split_odd_total_rounds_first_and_corrects_last() {
        assert_eq!(split_by_weight(dec!(1.01), &[1, 1]), Some(vec![dec!(0.51), dec!(0.50)]));
    }

    #[test]
    fn test_split_thirds_absorb_remainder_in_last() {
        let shares = split_by_weight(dec!(1), &[1, 1, 1]).unwrap();
        assert_eq!(shares, vec![dec!(0.33), dec!(0.33), dec!(0.34)]);
    }

    #[test]
    fn test_split_single_project_takes_everything() {
        assert_eq!(split_by_weight(dec!(7.5), &[4]), Some(vec![dec!(7.50)]));
    }

    #[test]
    fn test_split_empty_or_zero_weights() {
        assert_eq!(split_by_weight(dec!(8), &[]), Some(Vec::new()));
        assert_eq!(split_by_weight(dec!(8), &[0, 0]), Some(Vec::new()));
    }

    #[test]
    fn test_split_conserves_hours_for_many_shapes() {
        let weight_sets: [&[u32]; 6] = [&[1], &[1, 2], &[3, 3, 3], &[1, 2, 3, 4], &[7, 1, 1, 1, 1], &[5, 9, 2]];
        let hour_values = [dec!(0.01), dec!(1), dec!(1.01), dec!(3.33), dec!(7.5), dec!(8), dec!(11.99)];
        for weights in weight_sets {
            for hours in hour_values {
                let shares = split_by_weight(hours, weights).expect("hours stay in range");
                assert_eq!(shares.len(), weights.len());
                let total: Decimal = shares.iter().copied().sum();
                assert_eq!(
                    round_hours(total),
                    round_hours(hours),
                    "Shares {:?} of {} over weights {:?} do not add up",
                    shares,
                    hours,
                    weights
                );
                assert!(shares.iter().all(|s| s.scale() <= 2));
            }
        }
    }

    #[test]
    fn test_split_of_huge_hours_stays_in_range() {
        let hours = Decimal::MAX;
        let shares = split_by_weight(hours, &[1, 1]).expect("halves of MAX fit");
        assert_eq!(shares.iter().copied().sum::<Decimal>(), hours);
    }

    #[test]
    fn test_round_hours_is_half_away_from_zero() {
        assert_eq!(round_hours(dec!(0.505)), dec!(0.51));
        assert_eq!(round_hours(dec!(0.515)), dec!(0.52));
        assert_eq!(round_hours(dec!(-0.505)), dec!(-0.51));
    }

    // --- AllocationCalculator ---

    #[test]
    fn test_weighted_split_end_to_end_scenario() {
        let registry = registry(&[
            ("P1", "2021-01-01", "2021-01-31", 2),
            ("P2", "2021-01-01", "2021-01-31", 1),
        ]);
        let sink = CollectingSink::new();
        let result = allocate(&registry, &sink, true, &["P1", "P2"], CellValue::Number(dec!(3)), "2021-01-05");
        assert_eq!(result, vec![dec!(2.00), dec!(1.00)]);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_order_decides_remainder_owner() {
        let registry = registry(&[
            ("A", "2021-01-01", "2021-01-31", 1),
            ("B", "2021-01-01", "2021-01-31", 1),
        ]);
        let sink = CollectingSink::new();
        let ab = allocate(&registry, &sink, false, &["A", "B"], CellValue::Number(dec!(1.01)), "2021-01-05");
        let ba = allocate(&registry, &sink, false, &["B", "A"], CellValue::Number(dec!(1.01)), "2021-01-05");
        // A listed first gets the rounded share, B the remainder; and the reverse.
        assert_eq!(ab, vec![dec!(0.51), dec!(0.50)]);
        assert_eq!(ba, vec![dec!(0.51), dec!(0.50)]);

        let even = allocate(&registry, &sink, false, &["A", "B"], CellValue::Number(dec!(1.00)), "2021-01-05");
        assert_eq!(even, vec![dec!(0.50), dec!(0.50)]);
    }

    #[test]
    fn test_zero_and_empty_input_allocate_nothing() {
        let registry = registry(&[("P1", "2021-01-01", "2021-01-31", 1)]);
        let sink = CollectingSink::new();
        for reported in [CellValue::Empty, CellValue::Number(dec!(0)), CellValue::Number(dec!(0.00))] {
            let result = allocate(&registry, &sink, true, &["P1"], reported, "2021-01-05");
            assert_eq!(result, vec![dec!(0)]);
        }
        assert!(sink.is_empty(), "Zero input is not a warning");
    }

    #[test]
    fn test_fractional_hour_below_one_is_allocated() {
        let registry = registry(&[("P1", "2021-01-01", "2021-01-31", 1)]);
        let sink = CollectingSink::new();
        let result = allocate(&registry, &sink, true, &["P1"], CellValue::Number(dec!(0.5)), "2021-01-05");
        assert_eq!(result, vec![dec!(0.50)]);
    }

    #[test]
    fn test_text_input_is_zero_and_warned_in_strict_mode() {
        let registry = registry(&[
            ("P1", "2021-01-01", "2021-01-31", 1),
            ("P2", "2021-01-01", "2021-01-31", 1),
        ]);
        let sink = CollectingSink::new();
        let result = allocate(&registry, &sink, true, &["P1", "P2"], CellValue::Text("请假".into()), "2021-01-05");
        assert_eq!(result, vec![dec!(0), dec!(0)]);
        assert_eq!(sink.count(Severity::Warn), 1);
        let message = &sink.diagnostics()[0].message;
        assert!(message.contains("12345678"), "{}", message);
        assert!(message.contains("2021-01-05"), "{}", message);
        assert!(message.contains("请假"), "{}", message);
    }

    #[test]
    fn test_text_input_is_silent_without_strict_mode() {
        let registry = registry(&[("P1", "2021-01-01", "2021-01-31", 1)]);
        let sink = CollectingSink::new();
        let result = allocate(&registry, &sink, false, &["P1"], CellValue::Text("n/a".into()), "2021-01-05");
        assert_eq!(result, vec![dec!(0)]);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_gap_day_allocates_nothing() {
        let registry = registry(&[
            ("Early", "2021-01-01", "2021-01-10", 1),
            ("Late", "2021-01-20", "2021-01-31", 1),
        ]);
        let sink = CollectingSink::new();
        let result = allocate(&registry, &sink, true, &["Early", "Late"], CellValue::Number(dec!(8)), "2021-01-15");
        assert_eq!(result, vec![dec!(0), dec!(0)]);
        assert_eq!(sink.count(Severity::Warn), 1);
    }

    #[test]
    fn test_empty_project_set_is_a_gap() {
        let registry = registry(&[("P1", "2021-01-01", "2021-01-31", 1)]);
        let sink = CollectingSink::new();
        let result = allocate(&registry, &sink, true, &[], CellValue::Number(dec!(8)), "2021-02-01");
        assert!(result.is_empty());
        assert_eq!(sink.count(Severity::Warn), 1);
    }

    #[test]
    fn test_only_day_active_projects_share_hours() {
        let registry = registry(&[
            ("Whole", "2021-01-01", "2021-01-31", 1),
            ("Ended", "2021-01-01", "2021-01-10", 5),
            ("Half", "2021-01-15", "2021-01-31", 1),
        ]);
        let sink = CollectingSink::new();
        let order = ["Whole", "Ended", "Half"];

        let early = allocate(&registry, &sink, true, &order, CellValue::Number(dec!(6)), "2021-01-05");
        assert_eq!(early, vec![dec!(1.00), dec!(5.00), dec!(0)]);

        let late = allocate(&registry, &sink, true, &order, CellValue::Number(dec!(5)), "2021-01-20");
        assert_eq!(late, vec![dec!(2.50), dec!(0), dec!(2.50)]);

        assert!(sink.is_empty());
    }

    #[test]
    fn test_remainder_goes_to_last_day_active_project() {
        let registry = registry(&[
            ("A", "2021-01-01", "2021-01-31", 1),
            ("B", "2021-01-01", "2021-01-31", 1),
            ("Gone", "2021-01-01", "2021-01-02", 1),
        ]);
        let sink = CollectingSink::new();
        let result = allocate(&registry, &sink, false, &["A", "B", "Gone"], CellValue::Number(dec!(1.01)), "2021-01-05");
        assert_eq!(result, vec![dec!(0.51), dec!(0.50), dec!(0)]);
    }
}
