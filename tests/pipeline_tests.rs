//! End-to-end pipeline tests on CSV files.

use ofi_analysis::config::{OfiConfig, PipelineConfig};
use ofi_analysis::prelude::*;
use ofi_analysis::{visualize_ofi_vs_returns, BookValidator};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Write a `levels`-level book CSV with `rows` minute bars, rows out of order.
fn write_book_csv(path: &Path, rows: usize, levels: usize) {
    let mut csv = String::from("system_time,midpoint");
    for level in 0..levels {
        write!(
            csv,
            ",bids_distance_{level},bids_notional_{level},asks_distance_{level},asks_notional_{level}"
        )
        .unwrap();
    }
    csv.push('\n');

    // Reverse order so the loader has to sort
    for r in (0..rows).rev() {
        let minute = r % 60;
        let hour = 11 + r / 60;
        let mid = 56_000.0 + ((r * 7) % 13) as f64 - 6.0;
        write!(csv, "2021-04-07 {hour:02}:{minute:02}:00.000000+00:00,{mid}").unwrap();
        for level in 0..levels {
            let d = 0.5 + level as f64 + ((r + level) % 3) as f64 * 0.5;
            let bid_n = 1_000.0 + ((r * 31 + level) % 50) as f64 * 20.0;
            let ask_n = 1_100.0 + ((r * 17 + level) % 40) as f64 * 20.0;
            write!(csv, ",{},{bid_n},{d},{ask_n}", -d).unwrap();
        }
        csv.push('\n');
    }

    fs::write(path, csv).unwrap();
}

#[test]
fn test_default_style_run_on_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("BTC_1min.csv");
    write_book_csv(&path, 120, 5);

    let pipeline = PipelineBuilder::new().data_path(&path).build().unwrap();
    let output = pipeline.run().unwrap();

    assert_eq!(output.rows_loaded, 120);
    assert_eq!(output.rows_dropped, 0);
    assert_eq!(output.rows_analyzed, 119);
    assert_eq!(output.regression.horizon, 1);
    assert_eq!(output.regression.fit.n_samples, 119);

    let r2 = output.regression.r_squared();
    assert!(r2.is_nan() || (0.0..=1.0 + 1e-12).contains(&r2));

    let text = output.regression.to_string();
    assert!(text.starts_with("Regression results for horizon=1:\n  Coefficient: "));
    assert!(text.contains("\n  Intercept: "));
    assert!(text.contains("\n  R^2: "));

    // Sorted ascending after load
    let ts = output.table.timestamps();
    assert!(ts.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_incomplete_rows_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.csv");
    write_book_csv(&path, 30, 2);

    let mut lines: Vec<String> = fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    let mut fields: Vec<&str> = lines[5].split(',').collect();
    fields[1] = "NaN";
    lines[5] = fields.join(",");
    fs::write(&path, lines.join("\n")).unwrap();

    let pipeline = PipelineBuilder::new()
        .data_path(&path)
        .max_levels(2)
        .without_plot()
        .build()
        .unwrap();
    let output = pipeline.run().unwrap();

    assert_eq!(output.rows_dropped, 1);
    assert_eq!(output.rows_loaded, 29);
    assert_eq!(output.rows_analyzed, 28);
}

#[test]
fn test_run_from_toml_config() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("eth.csv");
    write_book_csv(&data, 50, 3);

    let config = PipelineConfig::default()
        .with_data_path(&data)
        .with_ofi(OfiConfig {
            max_levels: 3,
            method: AggregationMethod::Avg,
            expanding_min_periods: None,
        })
        .with_horizon(4);
    let config_path = dir.path().join("run.toml");
    config.save_toml(&config_path).unwrap();

    let loaded = PipelineConfig::load_toml(&config_path).unwrap();
    let output = Pipeline::from_config(loaded).unwrap().run().unwrap();

    assert_eq!(output.rows_analyzed, 46);
    assert!(output.table.has_column("future_ret_4"));
    assert!(!output.table.has_column("OFI_level_3"));
}

#[test]
fn test_every_method_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.csv");
    write_book_csv(&path, 80, 4);

    for method in [AggregationMethod::Sum, AggregationMethod::Avg, AggregationMethod::Pca] {
        let output = PipelineBuilder::new()
            .data_path(&path)
            .max_levels(4)
            .method(method)
            .build()
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(output.aggregated_ofi().len(), 79, "{method}");
    }

    let output = PipelineBuilder::new()
        .data_path(&path)
        .max_levels(4)
        .expanding_pca(20)
        .build()
        .unwrap()
        .run()
        .unwrap();
    assert!(output.aggregated_ofi()[..20].iter().all(|&v| v == 0.0));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = PipelineBuilder::new()
        .data_path(dir.path().join("absent.csv"))
        .build()
        .unwrap()
        .run()
        .unwrap_err();
    assert!(matches!(err, OfiError::Io(_)));
}

#[test]
fn test_requesting_more_levels_than_file_has() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.csv");
    write_book_csv(&path, 10, 2);

    let err = PipelineBuilder::new()
        .data_path(&path)
        .build()
        .unwrap()
        .run()
        .unwrap_err();
    assert!(err.is_data_format(), "{err}");
    assert!(err.to_string().contains("bids_distance_2"), "{err}");

    let err = PipelineBuilder::new()
        .data_path(&path)
        .data_levels(5)
        .max_levels(5)
        .build()
        .unwrap()
        .run()
        .unwrap_err();
    assert!(err.is_data_format());

    // In-memory tables keep the parameter error
    let table = load_and_preprocess_data(&path).unwrap();
    assert!(compute_multi_level_ofi(table, 5)
        .unwrap_err()
        .is_invalid_parameter());
}

#[test]
fn test_extra_file_levels_are_left_unused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.csv");
    write_book_csv(&path, 20, 4);

    let output = PipelineBuilder::new()
        .data_path(&path)
        .max_levels(2)
        .without_plot()
        .build()
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(output.table.levels(), 2);
    assert!(!output.table.has_column("OFI_level_2"));
}

#[test]
fn test_stage_by_stage_matches_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.csv");
    write_book_csv(&path, 40, 3);

    let table = load_and_preprocess_data(&path).unwrap();
    assert!(BookValidator::new().validate_book(&table).is_valid());

    let table = compute_multi_level_ofi(table, 3).unwrap();
    let table = integrate_multi_level_ofi(table, 3, AggregationMethod::Sum).unwrap();
    let table = compute_short_term_returns(table, 2).unwrap();
    let report = run_regression_ofi_vs_returns(&table, 2).unwrap();
    visualize_ofi_vs_returns(&table, 2, Some(&report.fit)).unwrap();

    let output = PipelineBuilder::new()
        .data_path(&path)
        .max_levels(3)
        .horizon(2)
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(output.regression.fit, report.fit);
    assert_eq!(output.table.len(), table.len());
}
