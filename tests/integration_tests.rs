use branch_transit_rater::analyzers::accessibility::compute_accessibility;
use branch_transit_rater::analyzers::analyzer::{Pipeline, analyze};
use branch_transit_rater::analyzers::gaps::find_gaps;
use branch_transit_rater::analyzers::overlap::compute_overlap;
use branch_transit_rater::analyzers::types::AccessibilityLevel;
use branch_transit_rater::config::AnalysisConfig;
use branch_transit_rater::geo::{GeoPoint, distance_meters};
use branch_transit_rater::model::{Branch, Stop, partition_by_owner};
use branch_transit_rater::parser::{Dataset, LoadReport, load_branches};
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn load_fixture_dataset() -> Dataset {
    Dataset::load(
        &fixture("combined.csv"),
        &fixture("stops.json"),
        &fixture("routes.json"),
    )
    .expect("Failed to load fixture dataset")
}

fn pt(lat: f64, lon: f64) -> GeoPoint {
    GeoPoint::new(lat, lon).unwrap()
}

#[test]
fn test_fixture_loading() {
    let dataset = load_fixture_dataset();

    assert_eq!(dataset.branches.len(), 2);
    assert_eq!(dataset.stops.len(), 2);
    // one branch and one stop without coordinates, one mistyped stop record
    assert_eq!(
        dataset.report,
        LoadReport {
            accepted: 4,
            dropped: 3
        }
    );

    let stop1 = dataset.stops.iter().find(|s| s.id.0 == "1").unwrap();
    let stop2 = dataset.stops.iter().find(|s| s.id.0 == "2").unwrap();
    assert_eq!(stop1.route_count, 5);
    assert!(stop1.is_hub);
    assert_eq!(stop2.route_count, 2);
}

#[test]
fn test_end_to_end_accessibility() {
    let dataset = load_fixture_dataset();
    let records = compute_accessibility(&dataset.branches, &dataset.stops, 400.0).unwrap();

    let a = records.iter().find(|r| r.owner == "A").unwrap();
    assert_eq!(a.nearby_stop_count, 1);
    assert_eq!(a.nearby_route_count, 5);
    assert_eq!(a.level, AccessibilityLevel::Medium);

    let b = records.iter().find(|r| r.owner == "B").unwrap();
    assert_eq!(b.nearby_stop_count, 0);
    assert_eq!(b.nearby_route_count, 0);
    let expected = distance_meters(pt(40.41, 49.86), pt(40.401, 49.851));
    let nearest = b.nearest_stop_distance_meters.unwrap();
    assert!((nearest - expected).abs() < 1e-6);
    assert!(nearest > 1_000.0 && nearest < 1_500.0);
    assert_eq!(b.level, AccessibilityLevel::Low);
}

#[test]
fn test_directory_of_bank_files() {
    let (branches, report) = load_branches(&fixture("branches")).unwrap();

    assert_eq!(report.dropped, 0);
    assert_eq!(branches.len(), 3);
    assert_eq!(branches[0].owner, "kb");
    assert!(branches[1..].iter().all(|b| b.owner == "PASHA Bank"));
}

#[test]
fn test_pipeline_writes_outputs() {
    let dataset = load_fixture_dataset();
    let config = AnalysisConfig::load(fixture("config.json").to_str().unwrap()).unwrap();
    let output_dir = std::env::temp_dir().join("branch_transit_rater_pipeline_test");
    let _ = fs::remove_dir_all(&output_dir);

    let output = analyze(&dataset, &config, &output_dir).unwrap();

    assert_eq!(output.report.total_branches, 2);
    assert_eq!(output.report.zones["Center"].len(), 2);
    assert_eq!(output.owners["A"].median_nearest_stop_distance.map(f64::round), Some(140.0));

    let competitive = output.competitive.as_ref().unwrap();
    assert_eq!(competitive.home_owner, "A");
    assert_eq!(competitive.overlap.len(), 1);
    assert!(competitive.overlap[0].competitor_counts.is_empty());
    assert!(competitive.gaps.is_empty());

    for file in [
        "accessibility.csv",
        "owner_summary.json",
        "report.json",
        "overlap.csv",
        "overlap_summary.json",
        "gaps.csv",
    ] {
        assert!(output_dir.join(file).exists(), "{file} missing");
    }

    let accessibility = fs::read_to_string(output_dir.join("accessibility.csv")).unwrap();
    assert_eq!(accessibility.lines().count(), 3);

    fs::remove_dir_all(&output_dir).unwrap();
}

#[test]
fn test_pipeline_without_home_owner_skips_competition() {
    let dataset = load_fixture_dataset();
    let output = Pipeline::new(&AnalysisConfig::default())
        .unwrap()
        .run(&dataset);

    assert!(output.competitive.is_none());
    assert_eq!(output.accessibility.len(), 2);
}

#[test]
fn test_run_without_home_owner_clears_competitive_outputs() {
    let dataset = load_fixture_dataset();
    let output_dir = std::env::temp_dir().join("branch_transit_rater_stale_outputs");
    let _ = fs::remove_dir_all(&output_dir);

    let mut config = AnalysisConfig::default();
    config.home_owner = Some("A".to_string());
    analyze(&dataset, &config, &output_dir).unwrap();
    assert!(output_dir.join("gaps.csv").exists());

    config.home_owner = None;
    analyze(&dataset, &config, &output_dir).unwrap();
    for file in ["overlap.csv", "overlap_summary.json", "gaps.csv"] {
        assert!(!output_dir.join(file).exists(), "{file} left over");
    }
    assert!(output_dir.join("accessibility.csv").exists());
    assert!(output_dir.join("report.json").exists());

    fs::remove_dir_all(&output_dir).unwrap();
}

#[test]
fn test_invalid_config_fails_before_processing() {
    let mut config = AnalysisConfig::default();
    config.gap_radius_meters = -10.0;
    assert!(Pipeline::new(&config).is_err());

    let output_dir = std::env::temp_dir().join("branch_transit_rater_never_written");
    let _ = fs::remove_dir_all(&output_dir);
    assert!(analyze(&load_fixture_dataset(), &config, &output_dir).is_err());
    assert!(!output_dir.exists());
}

#[test]
fn test_market_scenario_overlap_and_gaps() {
    let branches = vec![
        Branch::new("Home", pt(40.3700, 49.8400)),
        Branch::new("Rival", pt(40.3710, 49.8405)),
        Branch::new("Rival", pt(40.4095, 49.8670)),
        Branch::new("Other", pt(40.4100, 49.8675)),
        Branch::new("Other", pt(40.3780, 49.8900)),
    ];
    let stops = vec![
        Stop::new("near-home", pt(40.3702, 49.8401)).with_route_count(40),
        Stop::new("ganjlik", pt(40.4098, 49.8672)).with_route_count(25),
        Stop::new("quiet", pt(40.3782, 49.8902)).with_route_count(3),
        Stop::new("28may", pt(40.3785, 49.8898)).with_route_count(25).hub(),
    ];
    let (home, competitors) = partition_by_owner(&branches, "Home");

    let overlap = compute_overlap(&home, &branches, 500.0).unwrap();
    assert_eq!(overlap.len(), 1);
    assert_eq!(overlap[0].competitor_counts.len(), 1);
    assert_eq!(overlap[0].competitor_counts["Rival"], 1);

    let gaps = find_gaps(&stops, &home, &competitors, 10, 600.0).unwrap();
    let ids: Vec<&str> = gaps.iter().map(|g| g.stop.id.0.as_str()).collect();
    assert_eq!(ids, vec!["ganjlik", "28may"]);
    assert_eq!(gaps[0].competitors_nearby, 2);
    assert_eq!(gaps[1].competitors_nearby, 1);
    assert!(gaps[1].stop.is_hub);
}
