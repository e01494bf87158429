//! End-to-end round trips through the public `specio_pcf` API

use specio_core::{DeviationPair, EnergyCalibration, Measurement, SpecFile};
use specio_pcf::{read_pcf, write_pcf};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

fn measurement_with_deviations(name: &str, tag: char, scale: f64, neutron: f64) -> Measurement {
    let mut m = Measurement::new(name);
    m.gamma_counts = (0..128).map(|i| i as f64 * scale).collect();
    m.real_time = Duration::from_secs_f64(10.0);
    m.live_time = Duration::from_secs_f64(9.5);
    m.pcf_tag = Some(tag);
    m.neutron_counts = vec![neutron];
    let pairs: Vec<DeviationPair> = (0..20).map(|i| DeviationPair::new(i as f64 * 50.0, i as f64)).collect();
    m.energy_calibration = Arc::new(EnergyCalibration::polynomial(vec![0.0, scale], pairs, 128).unwrap());
    m
}

#[test]
fn four_detector_file_round_trips_tags_deviations_and_neutrons() {
    let file = SpecFile::new();
    file.push_measurement(measurement_with_deviations("Ba1", 'T', 1.0, 100.0));
    file.push_measurement(measurement_with_deviations("Aa2", 'K', 2.0, 101.0));
    file.push_measurement(measurement_with_deviations("Bc3", '-', 3.0, 102.0));
    file.push_measurement(measurement_with_deviations("Cb4", '<', 4.0, 103.0));

    let mut buffer = Vec::new();
    write_pcf(&file, Cursor::new(&mut buffer)).unwrap();

    let roundtrip = SpecFile::new();
    read_pcf(Cursor::new(&buffer), &roundtrip).unwrap();
    let measurements = roundtrip.measurements();
    assert_eq!(measurements.len(), 4);

    let expected: &[(&str, char, f64)] = &[("Ba1", 'T', 100.0), ("Aa2", 'K', 101.0), ("Bc3", '-', 102.0), ("Cb4", '<', 103.0)];
    for (name, tag, neutron) in expected {
        let m = measurements.iter().find(|m| m.detector_name == *name).unwrap();
        assert_eq!(m.pcf_tag, Some(*tag));
        assert_eq!(m.neutron_sum(), *neutron);
        assert!(m.contained_neutron);
        match m.energy_calibration.as_ref() {
            EnergyCalibration::Polynomial { deviation_pairs, .. } => assert_eq!(deviation_pairs.len(), 20),
            other => panic!("expected polynomial calibration, got {other:?}"),
        }
    }
}

#[test]
fn zero_neutron_total_survives_as_an_empty_but_contained_sequence() {
    let file = SpecFile::new();
    let mut m = Measurement::new("Aa1");
    m.gamma_counts = vec![1.0, 2.0, 3.0];
    m.contained_neutron = true;
    m.energy_calibration = Arc::new(EnergyCalibration::polynomial(vec![0.0, 1.0], vec![], 3).unwrap());
    file.push_measurement(m);

    let mut buffer = Vec::new();
    write_pcf(&file, Cursor::new(&mut buffer)).unwrap();

    let roundtrip = SpecFile::new();
    read_pcf(Cursor::new(&buffer), &roundtrip).unwrap();
    let measurements = roundtrip.measurements();
    assert!(measurements[0].contained_neutron);
    assert_eq!(measurements[0].neutron_sum(), 0.0);
}
