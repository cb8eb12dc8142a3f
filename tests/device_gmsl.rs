//! Driver integration tests for the GMSL-attached path: serdes ordering,
//! failure isolation, and link lifecycle.

mod common;

use common::{MockLink, MockPower};
use imx_gmsl::link::{
    BusId, CsiLaneMode, CsiPort, GmslLink, LinkConfig, Max96792, Max96793, SerdesLink,
    SerdesRegistry, StreamDataType,
};
use imx_gmsl::profiles::IMX678;
use imx_gmsl::regio::mock::MockRegisterIo;
use imx_gmsl::{ControlId, Error, SensorDevice};
use std::sync::Arc;

fn link_config() -> LinkConfig {
    LinkConfig {
        bus: BusId(2),
        sensor_addr: 0x1A,
        sensor_default_addr: 0x34,
        serializer_addr: 0x40,
        src_csi_port: CsiPort::B,
        dst_csi_port: CsiPort::A,
        csi_mode: CsiLaneMode::OneX4,
        serdes_link: SerdesLink::A,
        num_lanes: 4,
        stream_vc: 0,
        dst_vc: 0,
        streams: vec![StreamDataType::Raw12, StreamDataType::Embedded],
    }
}

fn probe_with_mock_link(
    sensor: &MockRegisterIo,
    link: &MockLink,
) -> SensorDevice<MockRegisterIo> {
    SensorDevice::probe(
        &IMX678,
        sensor.clone(),
        Box::new(MockPower::new()),
        Some(Box::new(link.clone())),
    )
    .unwrap()
}

#[test]
fn probe_registers_then_configures_the_link() {
    let sensor = MockRegisterIo::new();
    let link = MockLink::new();
    let _dev = probe_with_mock_link(&sensor, &link);

    assert_eq!(link.calls(), vec!["register", "setup_link", "power_on"]);
}

#[test]
fn link_frequency_reports_gmsl_class() {
    let sensor = MockRegisterIo::new();
    let link = MockLink::new();
    let dev = probe_with_mock_link(&sensor, &link);

    let link_freq = dev.control(ControlId::LinkFrequency).unwrap();
    assert_eq!(link_freq.value, 1_500_000_000 / 2);
}

#[test]
fn start_runs_serdes_before_sensor_registers() {
    let sensor = MockRegisterIo::new();
    let link = MockLink::new();
    let dev = probe_with_mock_link(&sensor, &link);

    link.clear_calls();
    sensor.clear_log();
    dev.start_streaming().unwrap();

    assert_eq!(link.calls(), vec!["setup_streaming", "start_streaming"]);
    // Sensor-side sequence still begins with the common table.
    assert_eq!(sensor.writes()[0], (0x3014, 0x04));
}

#[test]
fn serializer_setup_failure_aborts_before_sensor_writes() {
    let sensor = MockRegisterIo::new();
    let link = MockLink::new();
    let dev = probe_with_mock_link(&sensor, &link);

    link.fail_setup_streaming();
    link.clear_calls();
    sensor.clear_log();

    let err = dev.start_streaming().unwrap_err();
    assert!(matches!(err, Error::Link(_)));
    assert!(!dev.is_streaming());

    // Aborted at stream setup; the deserializer never started and the
    // sensor saw zero register traffic.
    assert_eq!(link.calls(), vec!["setup_streaming"]);
    assert!(sensor.writes().is_empty());
}

#[test]
fn stop_tears_the_link_down_best_effort() {
    let sensor = MockRegisterIo::new();
    let link = MockLink::new();
    let dev = probe_with_mock_link(&sensor, &link);

    dev.start_streaming().unwrap();
    link.clear_calls();

    dev.stop_streaming().unwrap();
    assert_eq!(link.calls(), vec!["stop_streaming"]);
    assert!(!dev.is_streaming());
}

#[test]
fn teardown_unregisters_before_link_reset() {
    let sensor = MockRegisterIo::new();
    let link = MockLink::new();
    let dev = probe_with_mock_link(&sensor, &link);

    link.clear_calls();
    dev.teardown();
    assert_eq!(
        link.calls(),
        vec!["unregister", "reset_link", "power_off"]
    );
}

#[test]
fn power_hooks_route_through_the_link() {
    let sensor = MockRegisterIo::new();
    let link = MockLink::new();
    let dev = probe_with_mock_link(&sensor, &link);

    link.clear_calls();
    dev.power_off().unwrap();
    dev.power_on().unwrap();
    assert_eq!(link.calls(), vec!["power_off", "power_on"]);
}

#[test]
fn gmsl_pair_streams_twelve_bit_end_to_end() {
    let sensor = MockRegisterIo::new();
    let ser_io = MockRegisterIo::new();
    let des_io = MockRegisterIo::new();

    let registry = Arc::new(SerdesRegistry::new());
    let ctx = Arc::new(link_config().build().unwrap());

    let ser = Max96793::new_primary(ser_io.clone(), Arc::clone(&registry), BusId(2), 0x40).unwrap();
    let des = Max96792::new(des_io.clone(), BusId(2));
    let link = GmslLink::new(ser, des, ctx);

    let dev = SensorDevice::probe(
        &IMX678,
        sensor.clone(),
        Box::new(MockPower::new()),
        Some(Box::new(link)),
    )
    .unwrap();

    // Control-channel setup took its registry reference at probe.
    assert_eq!(registry.ref_count(BusId(2)), 1);

    dev.start_streaming().unwrap();

    // Serializer pipe carries 12-bit payload; deserializer CSI output open.
    assert_eq!(ser_io.last_write(0x031E), Some(0x2C));
    assert_eq!(des_io.last_write(0x0313), Some(0x02));

    dev.stop_streaming().unwrap();
    // Bypass clock dropped on the serializer, CSI output closed.
    assert_eq!(ser_io.last_write(0x0110), Some(0x28));
    assert_eq!(des_io.last_write(0x0313), Some(0x00));

    dev.teardown();
    assert_eq!(registry.ref_count(BusId(2)), 0);
}
