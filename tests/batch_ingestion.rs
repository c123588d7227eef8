use psychro_pipeline::batch::derive_batch;
use psychro_pipeline::config::{PipelineConfig, RowErrorPolicy};
use psychro_pipeline::errors::{PipelineError, RowError};
use psychro_pipeline::file_processor::process_file;
use psychro_pipeline::output::output_path;
use psychro_pipeline::parallel::{expand_inputs, InputFile, ParallelProcessor};
use psychro_pipeline::parsers::hourly_csv::parse_hourly_csv;
use std::fs;
use std::path::{Path, PathBuf};

fn hourly_export(bad_row: Option<usize>) -> String {
    let mut text = String::from("Station 466920 hourly observations,,,,,\n");
    text.push_str("觀測時間(hour),測站氣壓(hPa),氣溫(℃),相對溼度(%),風速(m/s),全天空日射量(MJ/㎡)\n");
    for hour in 0..10 {
        let temperature = if Some(hour) == bad_row {
            "abc".to_string()
        } else {
            format!("{:.1}", 24.0 + hour as f64 * 0.5)
        };
        text.push_str(&format!(
            "2024-07-01 {:02}:00,1008.{},{},{},1.{},0.{}\n",
            hour,
            hour,
            temperature,
            60 + hour,
            hour,
            hour
        ));
    }
    text
}

fn write_export(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn non_numeric_temperature_skips_only_that_row() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_export(dir.path(), "466920-2024-07.csv", &hourly_export(Some(4)));
    let config = PipelineConfig::default();

    let parsed = parse_hourly_csv(&config, &input).unwrap();
    assert_eq!(parsed.rows.len(), 10);

    let outcome = derive_batch(&parsed.rows, &config).unwrap();
    assert_eq!(outcome.records.len(), 9);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].row_number, 7);
    assert!(matches!(
        &outcome.failures[0].error,
        RowError::Parse { value, .. } if value == "abc"
    ));
    assert!(outcome.records.iter().all(|r| r.record.row_number != 7));
}

#[test]
fn process_file_writes_derived_csv() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_export(dir.path(), "466920-2024-07.csv", &hourly_export(Some(0)));
    let out_dir = dir.path().join("derived");
    let config = PipelineConfig::default();

    let target = output_path(Path::new("466920-2024-07.csv"), &out_dir, &config.output_suffix);
    assert_eq!(target, out_dir.join("466920-2024-07_derived.csv"));

    let outcome = process_file(&input, &config, Some(&target)).unwrap();
    assert_eq!(outcome.rows_read, 10);
    assert_eq!(outcome.batch.records.len(), 9);

    let written = outcome.output_path.unwrap();
    assert_eq!(written, target);

    let text = fs::read_to_string(&written).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("Time,Temp,RH,Solar,Wind,VPD,DewPoint,Enthalpy,HumidityRatio")
    );
    let first = lines.next().unwrap();
    assert!(first.starts_with("2024-07-01 01:00:00,24.5,61.0,0.1,1.1,"));
    assert_eq!(lines.count(), 8);
}

#[test]
fn abort_policy_fails_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_export(dir.path(), "466920-2024-07.csv", &hourly_export(Some(2)));
    let config = PipelineConfig {
        on_row_error: RowErrorPolicy::Abort,
        ..Default::default()
    };

    let err = process_file(&input, &config, None).unwrap_err();
    assert!(matches!(err, PipelineError::RowAborted { row: 5, .. }));
}

#[test]
fn one_bad_file_does_not_stop_the_others() {
    let dir = tempfile::tempdir().unwrap();
    let good_a = write_export(dir.path(), "a.csv", &hourly_export(None));
    let good_b = write_export(dir.path(), "b.csv", &hourly_export(Some(9)));
    let no_time = write_export(dir.path(), "c.csv", "title\nTemp,RH\n20,50\n");
    let out_dir = dir.path().join("out");

    let processor = ParallelProcessor::with_workers(2).without_progress();
    let results = processor.process_files(
        &[InputFile::from(good_a), InputFile::from(good_b), InputFile::from(no_time)],
        &PipelineConfig::default(),
        Some(&out_dir),
    );

    assert_eq!(results.len(), 3);
    let derived: Vec<Option<usize>> = results
        .iter()
        .map(|r| r.result.as_ref().ok().map(|o| o.batch.records.len()))
        .collect();
    assert_eq!(derived, vec![Some(10), Some(9), None]);
    assert!(matches!(results[2].result, Err(PipelineError::Parse(..))));
    assert!(out_dir.join("a_derived.csv").exists());
    assert!(out_dir.join("b_derived.csv").exists());
    assert!(!out_dir.join("c_derived.csv").exists());
}

#[test]
fn same_named_exports_in_subdirectories_keep_separate_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("stations");
    for year in ["2023", "2024"] {
        fs::create_dir_all(root.join(year)).unwrap();
    }
    write_export(&root.join("2023"), "C0A520.csv", &hourly_export(None));
    write_export(&root.join("2024"), "C0A520.csv", &hourly_export(Some(3)));
    let out_dir = dir.path().join("out");

    let inputs = expand_inputs(&[root.to_string_lossy().to_string()]);
    assert_eq!(inputs.len(), 2);

    let results = ParallelProcessor::with_workers(2)
        .without_progress()
        .process_files(&inputs, &PipelineConfig::default(), Some(&out_dir));

    let outputs: Vec<PathBuf> = results
        .iter()
        .map(|r| r.result.as_ref().unwrap().output_path.clone().unwrap())
        .collect();
    assert_eq!(
        outputs,
        vec![
            out_dir.join("2023").join("C0A520_derived.csv"),
            out_dir.join("2024").join("C0A520_derived.csv"),
        ]
    );
    // 10 and 9 derived rows plus the header.
    assert_eq!(fs::read_to_string(&outputs[0]).unwrap().lines().count(), 11);
    assert_eq!(fs::read_to_string(&outputs[1]).unwrap().lines().count(), 10);
}

#[test]
fn inputs_sharing_an_output_file_fail_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    for station_dir in ["north", "south"] {
        fs::create_dir(dir.path().join(station_dir)).unwrap();
    }
    let north = write_export(&dir.path().join("north"), "C0A520.csv", &hourly_export(None));
    let south = write_export(&dir.path().join("south"), "C0A520.csv", &hourly_export(None));
    let other = write_export(dir.path(), "C0A530.csv", &hourly_export(None));
    let out_dir = dir.path().join("out");

    let inputs = vec![InputFile::new(&north), InputFile::new(&south), InputFile::new(&other)];
    let results = ParallelProcessor::with_workers(2)
        .without_progress()
        .process_files(&inputs, &PipelineConfig::default(), Some(&out_dir));

    for result in &results[..2] {
        match &result.result {
            Err(PipelineError::OutputCollision { output, inputs }) => {
                assert_eq!(output, &out_dir.join("C0A520_derived.csv"));
                assert_eq!(inputs, &vec![north.clone(), south.clone()]);
            }
            other => panic!("Expected OutputCollision, got {:?}", other),
        }
    }
    assert!(!out_dir.join("C0A520_derived.csv").exists());
    assert!(results[2].result.is_ok());
    assert!(out_dir.join("C0A530_derived.csv").exists());
}
