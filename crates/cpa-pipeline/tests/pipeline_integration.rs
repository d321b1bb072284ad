// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use chrono::{TimeZone, Utc};
use cpa_core::{validate, AlgorithmConfig, AlgorithmId, ChangeKind, ParamValue, Series};
use cpa_pipeline::{
    export, filter_results, run, ExportFormat, FilterMode, RunRequest,
};
use std::collections::BTreeMap;

fn fixed_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0)
        .single()
        .expect("fixed timestamp should be valid")
}

#[test]
fn cusum_reference_scenario_from_ingest_to_filtered_view() {
    // "x,y" header, one malformed line, a clean mean shift at index 3.
    let series = Series::parse_delimited("x,y\n0,10\n1,10\n2,10\nbad,row\n3,50\n4,50\n5,50")
        .expect("ingestion should skip the malformed line");
    assert_eq!(series.len(), 6);

    let mut params = BTreeMap::new();
    params.insert("threshold".to_string(), ParamValue::number(5.0));
    params.insert("drift".to_string(), ParamValue::number(1.0));
    params.insert("direction".to_string(), ParamValue::choice("both"));
    let config = validate(AlgorithmId::Cusum, &params).expect("params should validate");

    let request = RunRequest {
        series,
        configs: vec![config],
    };
    let results = run(&request).expect("run should succeed");
    assert_eq!(results.len(), 1);

    let cps = &results[0].change_points;
    assert_eq!(cps.len(), 1);
    assert_eq!(cps[0].index, 3);
    assert!(cps[0].confidence > 0.5);
    assert_eq!(cps[0].kind, ChangeKind::Mean);

    let view = filter_results(&results, FilterMode::All, 0.5).expect("filter should succeed");
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].algorithm, AlgorithmId::Cusum);
}

#[test]
fn csv_export_round_trips_the_full_result_set() {
    let mut values = vec![1.0; 30];
    values.extend(vec![9.0; 30]);
    values.extend(vec![2.0; 30]);
    let request = RunRequest {
        series: Series::from_values(&values).expect("series should build"),
        configs: AlgorithmId::ALL
            .iter()
            .map(|&id| AlgorithmConfig::with_defaults(id))
            .collect(),
    };

    let results = run(&request).expect("run should succeed");
    assert_eq!(results.len(), 4);

    let bytes = export("roundtrip", &results, ExportFormat::Csv, fixed_time())
        .expect("csv export should succeed");

    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    assert_eq!(
        reader
            .headers()
            .expect("csv should have headers")
            .iter()
            .collect::<Vec<_>>(),
        vec!["algorithm", "index", "confidence", "type", "value"]
    );

    let mut parsed: Vec<(AlgorithmId, usize, f64, ChangeKind, f64)> = Vec::new();
    for record in reader.records() {
        let record = record.expect("csv row should parse");
        parsed.push((
            AlgorithmId::parse(&record[0]).expect("algorithm name should parse"),
            record[1].parse().expect("index should parse"),
            record[2].parse().expect("confidence should parse"),
            ChangeKind::parse(&record[3]).expect("kind should parse"),
            record[4].parse().expect("value should parse"),
        ));
    }

    let expected: Vec<(AlgorithmId, usize, f64, ChangeKind, f64)> = results
        .iter()
        .flat_map(|result| {
            result.change_points.iter().map(move |cp| {
                (
                    result.algorithm,
                    cp.index,
                    (cp.confidence * 1000.0).round() / 1000.0,
                    cp.kind,
                    (cp.value * 1000.0).round() / 1000.0,
                )
            })
        })
        .collect();
    assert_eq!(parsed, expected);
    assert!(!parsed.is_empty());
}

#[test]
fn json_export_covers_every_enabled_algorithm() {
    let mut values = vec![0.0; 40];
    values.extend(vec![15.0; 40]);
    let request = RunRequest {
        series: Series::from_values(&values).expect("series should build"),
        configs: vec![
            AlgorithmConfig::with_defaults(AlgorithmId::Pelt),
            AlgorithmConfig::with_defaults(AlgorithmId::BinarySegmentation),
            AlgorithmConfig::with_defaults(AlgorithmId::Cusum).disabled(),
        ],
    };

    let results = run(&request).expect("run should succeed");
    let bytes = export("coverage", &results, ExportFormat::Json, fixed_time())
        .expect("json export should succeed");
    let document: serde_json::Value = serde_json::from_slice(&bytes).expect("json should parse");

    let algorithms: Vec<&str> = document["results"]
        .as_array()
        .expect("results array")
        .iter()
        .map(|entry| entry["algorithm"].as_str().expect("algorithm name"))
        .collect();
    assert_eq!(algorithms, vec!["PELT", "BinarySegmentation"]);
}

#[test]
fn single_algorithm_view_matches_its_result() {
    let mut values = vec![0.0; 30];
    values.extend(vec![20.0; 30]);
    let request = RunRequest {
        series: Series::from_values(&values).expect("series should build"),
        configs: vec![
            AlgorithmConfig::with_defaults(AlgorithmId::Pelt),
            AlgorithmConfig::with_defaults(AlgorithmId::Cusum),
        ],
    };

    let results = run(&request).expect("run should succeed");
    let view = filter_results(&results, FilterMode::Only(AlgorithmId::Pelt), 0.0)
        .expect("filter should succeed");
    assert!(!view.is_empty());
    assert!(view.iter().all(|s| s.algorithm == AlgorithmId::Pelt));
    assert_eq!(view.len(), results[0].change_points.len());
}
