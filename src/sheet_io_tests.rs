// src/sheet_io_tests.rs

#[cfg(test)]
mod tests {
    use crate::cell::CellValue;
    use crate::clock::FixedClock;
    use crate::config::AppConfig;
    use crate::diagnostics::{CollectingSink, Severity};
    use crate::error::SheetError;
    use crate::monthly_aggregator::aggregate_sheet;
    use crate::project_registry::ProjectRegistry;
    use crate::sheet_io::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    const REGISTRY_CSV: &str = "\u{feff}项目及成员管理,,,,\n\
        二级项目,开始时间,结束时间,权重,成员\n\
        P1,2021-01-01,2021-01-31,2,\"12345678张三，87654321李四\"\n\
        Idle,2021-01-01,2021-01-31,1,\n\
        P2,2021-01-01,2021-01-31,,\"12345678张三\n\"\n";

    fn strict_config() -> AppConfig {
        AppConfig {
            strict: true,
            ..AppConfig::default()
        }
    }

    fn month_csv(rows: &[&str]) -> String {
        let mut header = String::from("工号,姓名,部门,小组,岗位,类型,合计");
        for day in 1..=31 {
            header.push_str(&format!(",{}", day));
        }
        let mut out = header;
        out.push('\n');
        for row in rows {
            out.push_str(row);
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_workbook_year_from_name() {
        assert_eq!(workbook_year("产研平台工时数据-202101-08(XXX)").unwrap(), 2021);
        assert_eq!(workbook_year("timesheet-2020").unwrap(), 2020);
        assert!(matches!(
            workbook_year("timesheet2021"),
            Err(SheetError::MissingYear { .. })
        ));
        assert!(matches!(
            workbook_year("data-0042"),
            Err(SheetError::InvalidYear { year: 42 })
        ));
    }

    #[test]
    fn test_sheet_month_from_label() {
        assert_eq!(sheet_month("1月").unwrap(), 1);
        assert_eq!(sheet_month("12月").unwrap(), 12);
        assert_eq!(sheet_month("2021年03月").unwrap(), 3);
        assert!(matches!(sheet_month("Sheet1"), Err(SheetError::MissingMonthMarker { .. })));
        assert!(matches!(sheet_month("13月"), Err(SheetError::InvalidMonth { .. })));
        assert!(matches!(sheet_month("月报"), Err(SheetError::InvalidMonth { .. })));
    }

    #[test]
    fn test_read_registry_skips_header_and_memberless_rows() {
        let rows = read_registry(REGISTRY_CSV.as_bytes(), "registry.csv", &AppConfig::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 3);
        assert_eq!(rows[0].name, CellValue::Text("P1".into()));
        assert_eq!(rows[0].weight, CellValue::Number(dec!(2)));
        assert_eq!(rows[1].line, 5);
        assert_eq!(rows[1].weight, CellValue::Empty);

        let clock = FixedClock::new(NaiveDate::from_ymd_opt(2021, 9, 19).unwrap());
        let registry = ProjectRegistry::from_rows(rows, &clock).unwrap();
        assert_eq!(registry.project_count(), 2);
        assert_eq!(registry.member_count(), 2);
    }

    #[test]
    fn test_read_registry_rejects_wrong_sheet() {
        let csv = "工时数据,,,,\n,,,,\nP1,2021-01-01,2021-01-31,1,12345678\n";
        let result = read_registry(csv.as_bytes(), "wrong.csv", &AppConfig::default());
        assert!(matches!(result, Err(SheetError::WrongSheetIdentity { .. })));

        let unchecked = AppConfig {
            registry_title: String::new(),
            ..AppConfig::default()
        };
        assert_eq!(read_registry(csv.as_bytes(), "wrong.csv", &unchecked).unwrap().len(), 1);
    }

    #[test]
    fn test_member_ids_keep_leading_zeros() {
        let csv = "项目及成员管理\nheader\nP1,2021-01-01,2021-01-31,1,00123456\n";
        let rows = read_registry(csv.as_bytes(), "r.csv", &AppConfig::default()).unwrap();
        assert_eq!(rows[0].members, CellValue::Text("00123456".into()));
    }

    #[test]
    fn test_read_month_sheet_rows_and_days() {
        let csv = month_csv(&[
            ",,,,,,,,",
            "12345678,张三,研发,平台,工程师,正式,16,8,8",
            "87654321,李四,研发,平台,工程师,正式,,,x",
        ]);
        let sink = CollectingSink::new();
        let sheet = read_month_sheet(csv.as_bytes(), "2月", 2021, &strict_config(), &sink).unwrap();

        assert_eq!(sheet.period.month(), 2);
        assert_eq!(sheet.header[0], "工号");
        assert_eq!(sheet.records.len(), 2);
        assert_eq!(sheet.records[0].line, 3);
        assert_eq!(sheet.records[0].raw_id(), "12345678");
        assert_eq!(sheet.records[0].name(), "张三");
        assert_eq!(sheet.records[0].days, vec![CellValue::Number(dec!(8)), CellValue::Number(dec!(8))]);
        assert_eq!(sheet.records[1].days[1], CellValue::Text("x".into()));
        assert_eq!(sheet.available_days, 31);
        assert_eq!(sink.count(Severity::Warn), 1, "The blank line is reported");
    }

    #[test]
    fn test_read_month_sheet_requires_month_marker() {
        let csv = month_csv(&[]);
        let sink = CollectingSink::new();
        let result = read_month_sheet(csv.as_bytes(), "Sheet1", 2021, &AppConfig::default(), &sink);
        assert!(matches!(result, Err(SheetError::MissingMonthMarker { .. })));
    }

    #[test]
    fn test_write_month_report_transposes_rows() {
        let clock = FixedClock::new(NaiveDate::from_ymd_opt(2021, 9, 19).unwrap());
        let registry = ProjectRegistry::from_rows(
            read_registry(REGISTRY_CSV.as_bytes(), "registry.csv", &AppConfig::default()).unwrap(),
            &clock,
        )
        .unwrap();

        let csv = month_csv(&["12345678,张三,研发,平台,工程师,正式,,3"]);
        let sink = CollectingSink::new();
        let config = AppConfig::default();
        let sheet = read_month_sheet(csv.as_bytes(), "1月", 2021, &config, &sink).unwrap();
        let report = aggregate_sheet(&sheet, &registry, &sink, config.strict, config.identity_columns);

        let mut buffer = Vec::new();
        write_month_report(&mut buffer, &report).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("工号,姓名,部门,小组,岗位,类型,项目,合计,1,2,3"));
        assert!(lines[1].starts_with("12345678,张三,研发,平台,工程师,正式,P1,2.00,2.00,0.00"));
        assert!(lines[2].starts_with("12345678,张三,研发,平台,工程师,正式,P2,1.00,1.00,0.00"));
        assert_eq!(lines[1].split(',').count(), 6 + 1 + 1 + 31);
    }
}
