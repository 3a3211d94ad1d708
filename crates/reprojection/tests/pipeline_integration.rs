//! End-to-end tests: fixture archives through the batch driver and back.

use std::fs;
use std::path::Path;

use landcover_common::{keys, CrsCode, SPATIAL_REF_VAR};
use reprojection::{
    load_dataset, verify_output, BatchDriver, FileOutcome, PipelineConfig, PipelineError,
    ResamplingMethod,
};
use test_utils::{
    assert_approx_eq, c3s_filename, esa_cci_filename, temp_test_dir, write_corrupt_file,
    LandCoverFixture,
};

fn config_for(root: &Path) -> PipelineConfig {
    let config = PipelineConfig {
        input_dir: root.join("raw"),
        output_dir: root.join("reprojected"),
        ..Default::default()
    };
    fs::create_dir_all(&config.input_dir).unwrap();
    config
}

#[test]
fn test_batch_isolates_corrupt_file() {
    let dir = temp_test_dir();
    let config = config_for(dir.path());

    let names = [esa_cci_filename(1995), esa_cci_filename(1996), c3s_filename(2001)];
    LandCoverFixture::new(20, 10)
        .write(config.input_dir.join(&names[0]))
        .unwrap();
    write_corrupt_file(config.input_dir.join(&names[1])).unwrap();
    LandCoverFixture::new(20, 10)
        .without_time()
        .write(config.input_dir.join(&names[2]))
        .unwrap();

    let summary = BatchDriver::new(config.clone()).unwrap().run().unwrap();

    assert_eq!(summary.outcomes.len(), 3);
    assert_eq!(summary.succeeded_count(), 2);
    let failed: Vec<_> = summary.failed().map(|(input, _)| input.to_path_buf()).collect();
    assert_eq!(failed, vec![config.input_dir.join(&names[1])]);
    let failure = summary.outcomes.iter().find(|o| !o.is_success()).unwrap();
    match failure {
        FileOutcome::Failed { error, .. } => {
            assert!(matches!(error, PipelineError::UnreadableInput { .. }))
        }
        other => panic!("expected failure, got {:?}", other),
    }

    let mut written: Vec<String> = fs::read_dir(&config.output_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    written.sort();
    assert_eq!(
        written,
        vec![
            format!("reprojected_3035_{}", names[2]),
            format!("reprojected_3035_{}", names[0]),
        ]
    );

    let report = summary.verification.expect("verification report");
    assert!(report.is_consistent(), "{:?}", report);
}

#[test]
fn test_output_georeferencing() {
    let dir = temp_test_dir();
    let config = config_for(dir.path());
    let input = config.input_dir.join(esa_cci_filename(2000));
    LandCoverFixture::new(20, 10).write(&input).unwrap();

    let driver = BatchDriver::new(config.clone()).unwrap();
    let output = driver.process_file(&input).unwrap();

    let report = verify_output(&output, &config.variable);
    assert_eq!(report.crs, Some(CrsCode::Epsg3035));
    assert_eq!(report.grid_mapping.as_deref(), Some(SPATIAL_REF_VAR));
    assert!(report.spatial_ref_keys.iter().any(|k| k == keys::CRS_WKT));

    // Output spacing equals the configured resolution on both axes
    let loaded = load_dataset(&output, &config.variable).unwrap();
    assert_approx_eq!(loaded.grid.x.spacing().unwrap(), 300.0, 1e-6);
    assert_approx_eq!(loaded.grid.y.spacing().unwrap(), -300.0, 1e-6);

    let time = loaded.grid.time.expect("time coordinate");
    assert_eq!(time.value, 9131.0);

    let globals = &loaded.global_attrs;
    assert_eq!(globals.text(keys::SPATIAL_REF), Some("EPSG:3035"));
    assert_eq!(globals.text(keys::SPATIAL_RESOLUTION), Some("300m"));
    assert_eq!(
        globals.text(keys::HISTORY),
        Some("amorgos-4,0, lccs-1.0; Reprojected to EPSG:3035 with nearest resampling")
    );
}

#[test]
fn test_classes_preserved_and_fill_replaced() {
    let dir = temp_test_dir();
    let mut config = config_for(dir.path());
    config.resampling = ResamplingMethod::Mode;
    let input = config.input_dir.join(c3s_filename(2005));
    let fixture = LandCoverFixture::new(24, 12);
    fixture.write(&input).unwrap();

    let output = BatchDriver::new(config.clone())
        .unwrap()
        .process_file(&input)
        .unwrap();
    let grid = load_dataset(&output, &config.variable).unwrap().grid;

    // ESA CCI flag_values include 0, so the sentinel is 255
    let mut allowed: Vec<u8> = fixture.data.clone();
    allowed.push(255);
    for code in grid.class_codes() {
        assert!(allowed.contains(&code), "unexpected class {}", code);
    }
    assert!(grid.class_codes().contains(&255));

    // The on-disk fill is the new sentinel, not the input's 0
    assert_eq!(
        grid.attrs.get(keys::FILL_VALUE).and_then(|v| v.as_f64()),
        Some(255.0)
    );
}

#[test]
fn test_fill_zero_without_flag_values() {
    let dir = temp_test_dir();
    let config = config_for(dir.path());
    let input = config.input_dir.join("plain.nc");
    LandCoverFixture::new(12, 12)
        .with_flag_values(None)
        .write(&input)
        .unwrap();

    let output = BatchDriver::new(config.clone())
        .unwrap()
        .process_file(&input)
        .unwrap();
    let grid = load_dataset(&output, &config.variable).unwrap().grid;
    assert_eq!(
        grid.attrs.get(keys::FILL_VALUE).and_then(|v| v.as_f64()),
        Some(0.0)
    );
}

#[test]
fn test_missing_variable_recorded_as_failure() {
    let dir = temp_test_dir();
    let config = config_for(dir.path());
    LandCoverFixture::new(4, 4)
        .with_variable("other_class")
        .write(config.input_dir.join("a.nc"))
        .unwrap();

    let summary = BatchDriver::new(config).unwrap().run().unwrap();
    assert_eq!(summary.failed_count(), 1);
    assert!(!summary.all_succeeded());
    assert!(summary.verification.is_none());
}
