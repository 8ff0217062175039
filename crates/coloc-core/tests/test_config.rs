use std::path::PathBuf;

use tempfile::TempDir;

use coloc_core::error::ErrorKind;
use coloc_core::pipeline::config::{AnalysisMode, ColocConfig};
use coloc_core::pipeline::params::ParamRecord;
use coloc_core::preprocess::{NormalizeScope, Threshold};

#[test]
fn test_defaults() {
    let config = ColocConfig::new("stack.tif", "out");
    assert_eq!(config.threshold, Threshold::Cutoff(0.5));
    assert_eq!(config.channels, [0, 1]);
    assert_eq!(config.normalize_scope, NormalizeScope::PerFrame);
    assert_eq!(config.kmeans.num_clusters, 10);
    assert_eq!(config.kmeans.max_dist, 20.0);
    assert_eq!(config.ica_top_k(), 10);
    assert_eq!(config.mode().unwrap(), AnalysisMode::Both);
    assert!(config.validate().is_ok());
}

#[test]
fn test_mode_display() {
    assert_eq!(format!("{}", AnalysisMode::Ica), "Intensity Correlation");
    assert_eq!(format!("{}", AnalysisMode::KMeans), "K-Means Matching");
}

#[test]
fn test_no_analysis_is_configuration_error() {
    let mut config = ColocConfig::new("stack.tif", "out");
    config.ica.enabled = false;
    config.kmeans.enabled = false;
    assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Configuration);
}

#[test]
fn test_boundary_thresholds_rejected() {
    for v in [0.0, 1.0] {
        let mut config = ColocConfig::new("stack.tif", "out");
        config.threshold = Threshold::Cutoff(v);
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Configuration);
    }
}

#[test]
fn test_same_channel_twice_rejected() {
    let mut config = ColocConfig::new("stack.tif", "out");
    config.channels = [1, 1];
    assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_micron_distance_conversion() {
    let mut config = ColocConfig::new("stack.tif", "out");
    config.kmeans.max_dist_microns = Some(3.0);
    assert_eq!(
        config.kmeans.effective_max_dist().unwrap_err().kind(),
        ErrorKind::Configuration
    );
    config.kmeans.pixel_size_microns = Some(0.25);
    assert_eq!(config.kmeans.effective_max_dist().unwrap(), 12.0);
    config.kmeans.pixel_size_microns = Some(0.0);
    assert!(config.validate().is_err());
}

#[test]
fn test_missing_paths_rejected() {
    let dir = TempDir::new().unwrap();
    let config = ColocConfig::new(dir.path().join("absent.tif"), dir.path());
    assert_eq!(config.validate_paths().unwrap_err().kind(), ErrorKind::InvalidInput);

    let input = dir.path().join("stack.tif");
    std::fs::write(&input, b"").unwrap();
    let config = ColocConfig::new(&input, dir.path().join("nowhere"));
    assert_eq!(config.validate_paths().unwrap_err().kind(), ErrorKind::InvalidInput);

    let config = ColocConfig::new(&input, dir.path());
    assert!(config.validate_paths().is_ok());
}

#[test]
fn test_config_from_toml() {
    let text = r#"
input = "data/cells.tif"
output = "results"
threshold = false
normalize_scope = "PerChannel"
channels = [1, 2]

[ica]
top_k = 25

[kmeans]
enabled = false
num_clusters = 4

[kmeans.fit]
seed = 9
"#;
    let config: ColocConfig = toml::from_str(text).unwrap();
    assert_eq!(config.input, PathBuf::from("data/cells.tif"));
    assert_eq!(config.threshold, Threshold::Off);
    assert_eq!(config.normalize_scope, NormalizeScope::PerChannel);
    assert_eq!(config.channels, [1, 2]);
    assert_eq!(config.ica_top_k(), 25);
    assert!(!config.kmeans.enabled);
    assert_eq!(config.kmeans.max_dist, 20.0);
    assert_eq!(config.kmeans.fit.seed, Some(9));
    assert_eq!(config.kmeans.fit.n_init, 10);
    assert_eq!(config.mode().unwrap(), AnalysisMode::Ica);
}

#[test]
fn test_config_rejects_out_of_range_threshold() {
    let text = "input = \"a.tif\"\noutput = \"out\"\nthreshold = 1.0\n";
    assert!(toml::from_str::<ColocConfig>(text).is_err());
}

#[test]
fn test_config_roundtrips_through_toml() {
    let mut config = ColocConfig::new("a.tif", "out");
    config.threshold = Threshold::Off;
    let text = toml::to_string_pretty(&config).unwrap();
    let back: ColocConfig = toml::from_str(&text).unwrap();
    assert_eq!(back.threshold, Threshold::Off);
    assert_eq!(back.channels, config.channels);
}

#[test]
fn test_param_record_conversion() {
    let text = r#"
in_path = "cells.tif"
out_path = "out"
threshold = 0.3
channels = [0, 2]
num_clusts = 5
min_dist = 12.5
"Run Intensity Correlation Analysis" = "Y"
"Run KMeans" = "n"
"#;
    let record: ParamRecord = toml::from_str(text).unwrap();
    let config = ColocConfig::try_from(record).unwrap();
    assert_eq!(config.threshold, Threshold::Cutoff(0.3));
    assert_eq!(config.channels, [0, 2]);
    assert_eq!(config.kmeans.num_clusters, 5);
    assert_eq!(config.kmeans.max_dist, 12.5);
    assert!(config.ica.enabled);
    assert!(!config.kmeans.enabled);
}

#[test]
fn test_param_record_text_threshold() {
    let text = r#"
in_path = "cells.tif"
out_path = "out"
threshold = "iamnotafloat"
"Run Intensity Correlation Analysis" = "Y"
"Run KMeans" = "Y"
"#;
    let record: ParamRecord = toml::from_str(text).unwrap();
    let err = ColocConfig::try_from(record).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
}

#[test]
fn test_param_record_bad_flag() {
    let text = r#"
in_path = "cells.tif"
out_path = "out"
"Run Intensity Correlation Analysis" = "yes"
"Run KMeans" = "Y"
"#;
    let record: ParamRecord = toml::from_str(text).unwrap();
    let err = ColocConfig::try_from(record).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_param_record_missing_flag() {
    let text = "in_path = \"cells.tif\"\nout_path = \"out\"\n\"Run KMeans\" = \"Y\"\n";
    let record: ParamRecord = toml::from_str(text).unwrap();
    let err = ColocConfig::try_from(record).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_param_record_wrong_channel_count() {
    let text = r#"
in_path = "cells.tif"
out_path = "out"
channels = [0, 1, 2]
"Run Intensity Correlation Analysis" = "Y"
"Run KMeans" = "Y"
"#;
    let record: ParamRecord = toml::from_str(text).unwrap();
    let err = ColocConfig::try_from(record).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}
