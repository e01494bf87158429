//! End-to-end round trips through the public `specio_spe` API

use specio_core::{EnergyCalibration, Measurement, SpecFile};
use specio_spe::{read_spe, write_spe};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn channel_data_calibration_and_deviation_pairs_round_trip() {
    let file = SpecFile::new();
    let mut m = Measurement::new("Aa1");
    m.gamma_counts = vec![1.0, 2.0, 3.0, 4.0];
    m.live_time = Duration::from_secs_f64(9.0);
    m.real_time = Duration::from_secs_f64(10.0);
    m.energy_calibration = Arc::new(EnergyCalibration::polynomial(vec![0.0, 3.0], vec![], 4).unwrap());
    file.push_measurement(m);

    let mut buffer = Vec::new();
    write_spe(&file, &mut buffer).unwrap();

    let roundtrip = SpecFile::new();
    read_spe(buffer.as_slice(), &roundtrip).unwrap();
    let measurements = roundtrip.measurements();
    assert_eq!(measurements.len(), 1);
    assert_eq!(measurements[0].gamma_counts, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(measurements[0].energy_for_channel(1.0), 3.0);
    assert_eq!(measurements[0].live_time, Duration::from_secs_f64(9.0));
}

#[test]
fn multiple_endrecord_blocks_in_one_stream_each_become_a_measurement() {
    let text = "$DATA:\r\n0 1\r\n1 2\r\n$ENDRECORD:\r\n$DATA:\r\n0 1\r\n3 4\r\n$ENDRECORD:\r\n";
    let file = SpecFile::new();
    read_spe(text.as_bytes(), &file).unwrap();
    assert_eq!(file.len(), 2);
    assert_eq!(file.measurements()[0].gamma_counts, vec![1.0, 2.0]);
    assert_eq!(file.measurements()[1].gamma_counts, vec![3.0, 4.0]);
}

#[test]
fn neutron_cps_round_trips_back_through_counts() {
    let text = "$MEAS_TIM:\r\n10.0 10.0\r\n$NEUTRON_CPS:\r\n2.5\r\n$DATA:\r\n0 1\r\n1 1\r\n$ENDRECORD:\r\n";
    let file = SpecFile::new();
    read_spe(text.as_bytes(), &file).unwrap();
    assert_eq!(file.measurements()[0].neutron_counts, vec![25.0]);

    let mut buffer = Vec::new();
    write_spe(&file, &mut buffer).unwrap();
    let roundtrip = SpecFile::new();
    read_spe(buffer.as_slice(), &roundtrip).unwrap();
    assert_eq!(roundtrip.measurements()[0].neutron_sum(), 25.0);
}
