//! End-to-end round trips through the public `specio_spc` API

use specio_core::{DetectorAnalysis, DetectorAnalysisResult, EnergyCalibration, Measurement, SpecFile};
use specio_spc::{read_spc, write_spc};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn channel_data_calibration_and_times_round_trip() {
    let file = SpecFile::new();
    let mut m = Measurement::new("Aa1");
    m.gamma_counts = (0..16).map(|i| i as f64 * 2.0).collect();
    m.real_time = Duration::from_secs_f64(12.0);
    m.live_time = Duration::from_secs_f64(11.0);
    m.energy_calibration = Arc::new(EnergyCalibration::polynomial(vec![0.0, 2.0], vec![], 16).unwrap());
    file.push_measurement(m);

    let mut buffer = Vec::new();
    write_spc(&file, std::io::Cursor::new(&mut buffer)).unwrap();

    let roundtrip = SpecFile::new();
    read_spc(std::io::Cursor::new(&buffer), &roundtrip).unwrap();
    let measurements = roundtrip.measurements();
    assert_eq!(measurements.len(), 1);
    assert!((measurements[0].energy_for_channel(1.0) - 2.0).abs() < 1e-3);
    assert_eq!(measurements[0].real_time, Duration::from_secs_f64(12.0));
}

#[test]
fn found_suspect_and_dose_rate_results_round_trip_as_distinct_entries() {
    let file = SpecFile::new();
    let mut m = Measurement::new("Aa1");
    m.gamma_counts = vec![0.0, 5.0, 10.0, 0.0];
    m.neutron_counts = vec![42.0];
    m.real_time = Duration::from_secs_f64(8.0);
    m.live_time = Duration::from_secs_f64(7.5);
    m.energy_calibration = Arc::new(EnergyCalibration::polynomial(vec![0.0, 1.0], vec![], 4).unwrap());
    file.push_measurement(m);
    file.set_analysis(DetectorAnalysis {
        algorithm_name: None,
        results: vec![
            DetectorAnalysisResult {
                nuclide: "Co60".into(),
                nuclide_type: Some("Found".into()),
                id_confidence: None,
                dose_rate: None,
                remark: None,
            },
            DetectorAnalysisResult {
                nuclide: "Ba133".into(),
                nuclide_type: Some("Suspect".into()),
                id_confidence: None,
                dose_rate: None,
                remark: None,
            },
            DetectorAnalysisResult {
                nuclide: String::new(),
                nuclide_type: None,
                id_confidence: None,
                dose_rate: Some(0.07),
                remark: Some("Gamma Dose Rate".into()),
            },
        ],
    });

    let mut buffer = Vec::new();
    write_spc(&file, &mut buffer).unwrap();

    let roundtrip = SpecFile::new();
    read_spc(std::io::Cursor::new(&buffer), &roundtrip).unwrap();

    assert_eq!(roundtrip.measurements()[0].neutron_sum(), 42.0);
    let analysis = roundtrip.analysis().unwrap();
    assert!(analysis.results.iter().any(|r| r.nuclide == "Co60" && r.nuclide_type.as_deref() == Some("Found")));
    assert!(analysis.results.iter().any(|r| r.nuclide == "Ba133" && r.nuclide_type.as_deref() == Some("Suspect")));
    assert!(analysis.results.iter().any(|r| r.dose_rate == Some(0.07)));
}
