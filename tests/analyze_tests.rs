use assert_fs::prelude::*;
use plant_aep::test_support::{on_datetime, SyntheticPlant};
use predicates::prelude::*;

fn write_plant(temp: &assert_fs::TempDir, days: i64) -> (String, String) {
    let plant = SyntheticPlant::new(on_datetime(2022, 1, 1, 0, 0), days, 60, 2024);
    let telemetry = temp.child("scada.csv");
    telemetry.write_str(&plant.telemetry_csv()).unwrap();
    let meter = temp.child("meter.csv");
    meter.write_str(&plant.meter_csv()).unwrap();
    (
        telemetry.path().to_str().unwrap().to_string(),
        meter.path().to_str().unwrap().to_string(),
    )
}

fn as_f64(value: &serde_yaml::Value) -> f64 {
    value.as_f64().unwrap()
}

#[test]
fn analyze_hourly_plant_over_378_days() {
    let temp = assert_fs::TempDir::new().unwrap();
    let (telemetry, meter) = write_plant(&temp, 378);
    let output = temp.child("report.yaml");
    let output_arg = output.path().to_str().unwrap();

    let mut cmd = assert_cmd::cargo_bin_cmd!("plant-aep");
    cmd.args([
        "analyze", "-t", telemetry.as_str(), "-m", meter.as_str(), "-o", output_arg, "-r", "2000", "-n", "1000", "-s",
        "11",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("AEP Report"))
        .stdout(predicate::str::contains("P50 |"))
        .stdout(predicate::str::contains(format!(
            "Analysis report written to {output_arg}"
        )));

    let report: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(output_arg).unwrap()).unwrap();

    assert_eq!(report["window"]["buffer_days"].as_i64(), Some(1));
    assert_eq!(report["window"]["total_duration_days"].as_i64(), Some(377));

    let p50 = as_f64(&report["aep"]["p50"]);
    let p90 = as_f64(&report["aep"]["p90"]);
    assert!(p90 > 0.0);
    assert!(p90 < p50);
    assert_eq!(report["aep"]["units"].as_str(), Some("MWh/yr"));
    assert_eq!(report["aep"]["samples"].as_sequence().unwrap().len(), 1000);

    let counts = report["aep"]["histogram"]["counts"].as_sequence().unwrap();
    assert_eq!(counts.len(), 20);
    let total: u64 = counts.iter().map(|c| c.as_u64().unwrap()).sum();
    assert_eq!(total, 1000);

    let capacity_factor = as_f64(&report["capacity_factor"]["fraction"]);
    assert!((0.0..=1.0).contains(&capacity_factor));
    assert_eq!(report["seed"].as_u64(), Some(11));
    assert!(!report["monthly_energy"].as_sequence().unwrap().is_empty());
    assert!(report["power_curve"]["bins"].as_sequence().unwrap().len() <= 30);
}

#[test]
fn analyze_writes_json_when_requested() {
    let temp = assert_fs::TempDir::new().unwrap();
    let (telemetry, meter) = write_plant(&temp, 366);
    let output = temp.child("report.json");
    let output_arg = output.path().to_str().unwrap();

    let mut cmd = assert_cmd::cargo_bin_cmd!("plant-aep");
    cmd.args(["analyze", "-t", telemetry.as_str(), "-m", meter.as_str(), "-o", output_arg, "-n", "100", "-s", "3"]);
    cmd.assert().success();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output_arg).unwrap()).unwrap();
    assert_eq!(report["config"]["iterations"].as_u64(), Some(100));
    assert!(report["aep"]["p90"].as_f64().unwrap() <= report["aep"]["p50"].as_f64().unwrap());
}

#[test]
fn same_seed_reproduces_the_same_samples() {
    let temp = assert_fs::TempDir::new().unwrap();
    let (telemetry, meter) = write_plant(&temp, 370);
    let first = temp.child("first.yaml");
    let second = temp.child("second.yaml");

    for output in [&first, &second] {
        let mut cmd = assert_cmd::cargo_bin_cmd!("plant-aep");
        cmd.args([
            "analyze",
            "-t",
            telemetry.as_str(),
            "-m",
            meter.as_str(),
            "-o",
            output.path().to_str().unwrap(),
            "-n",
            "200",
            "-s",
            "99",
        ]);
        cmd.assert().success();
    }

    let samples = |path: &std::path::Path| {
        let report: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        report["aep"]["samples"].clone()
    };
    assert_eq!(samples(first.path()), samples(second.path()));
}

#[test]
fn config_file_is_applied_and_flags_override_it() {
    let temp = assert_fs::TempDir::new().unwrap();
    let (telemetry, meter) = write_plant(&temp, 366);
    let config = temp.child("config.yaml");
    config
        .write_str(
            "rated_capacity_kw: 4000\n\
             iterations: 60\n\
             seed: 5\n\
             resampling:\n  scheme: meter_perturbation\n  relative_sigma: 0.1\n",
        )
        .unwrap();
    let output = temp.child("report.yaml");
    let output_arg = output.path().to_str().unwrap();

    let mut cmd = assert_cmd::cargo_bin_cmd!("plant-aep");
    cmd.args([
        "analyze",
        "-t",
        telemetry.as_str(),
        "-m",
        meter.as_str(),
        "-o",
        output_arg,
        "-c",
        config.path().to_str().unwrap(),
        "-n",
        "80",
    ]);
    cmd.assert().success();

    let report: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(output_arg).unwrap()).unwrap();
    assert_eq!(report["config"]["iterations"].as_u64(), Some(80));
    assert_eq!(as_f64(&report["config"]["rated_capacity_kw"]), 4000.0);
    assert_eq!(report["config"]["resampling"]["scheme"].as_str(), Some("meter_perturbation"));
    assert_eq!(report["seed"].as_u64(), Some(5));
}

#[test]
fn short_overlap_fails_with_insufficient_data_report() {
    let temp = assert_fs::TempDir::new().unwrap();
    let (telemetry, meter) = write_plant(&temp, 200);
    let output = temp.child("report.yaml");

    let mut cmd = assert_cmd::cargo_bin_cmd!("plant-aep");
    cmd.args([
        "analyze",
        "-t",
        telemetry.as_str(),
        "-m",
        meter.as_str(),
        "-o",
        output.path().to_str().unwrap(),
    ]);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("at least 365 days are required"));
    output.assert(predicate::str::contains("kind: insufficient_data"));
    output.assert(predicate::str::contains("total_duration_days: 200"));
}

#[test]
fn missing_column_fails_with_schema_report() {
    let temp = assert_fs::TempDir::new().unwrap();
    let (_, meter) = write_plant(&temp, 366);
    let telemetry = temp.child("bad.csv");
    telemetry
        .write_str("time,power_kw,wind_direction_deg\n2022-01-01 00:00:00,100,180\n")
        .unwrap();
    let output = temp.child("report.yaml");

    let mut cmd = assert_cmd::cargo_bin_cmd!("plant-aep");
    cmd.args([
        "analyze",
        "-t",
        telemetry.path().to_str().unwrap(),
        "-m",
        meter.as_str(),
        "-o",
        output.path().to_str().unwrap(),
    ]);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("wind_speed_ms"));
    output.assert(predicate::str::contains("kind: schema"));
    output.assert(predicate::str::contains("column: wind_speed_ms"));
}
