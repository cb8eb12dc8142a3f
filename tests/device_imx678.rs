//! Driver integration tests against a mock register transport, IMX678
//! profile, direct CSI-2 attach (no serdes link).

mod common;

use common::MockPower;
use imx_gmsl::profiles::IMX678;
use imx_gmsl::regio::mock::MockRegisterIo;
use imx_gmsl::{ControlId, Error, PixelFormat, SensorDevice};

const STANDBY: u16 = 0x3000;
const REGHOLD: u16 = 0x3001;
const XMSTA: u16 = 0x3002;
const VMAX: u16 = 0x3028;
const SHR0: u16 = 0x3050;
const GAIN: u16 = 0x3070;
const BLKLEVEL: u16 = 0x30DC;

fn probe(mock: &MockRegisterIo) -> SensorDevice<MockRegisterIo> {
    common::init_tracing();
    SensorDevice::probe(&IMX678, mock.clone(), Box::new(MockPower::new()), None).unwrap()
}

#[test]
fn probe_defaults_to_twelve_bit_all_pixel() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    let fmt = dev.format();
    assert_eq!(fmt.code, PixelFormat::RAW12);
    assert_eq!((fmt.width, fmt.height), (3856, 2180));

    // hmax 0x44C at 74.25 MHz: 14814 ns lines, 2250 total lines.
    assert_eq!(dev.derived_timing(), (14_814, 2250));

    let vblank = dev.control(ControlId::Vblank).unwrap();
    assert_eq!(vblank.value, 70);
    assert_eq!((vblank.range.min, vblank.range.max), (70, 70));

    let rate = dev.control(ControlId::FrameRate).unwrap();
    assert_eq!(rate.range.min, 1_000_000);
    assert_eq!(rate.range.max, 30_001_650);
    assert_eq!(rate.value, 30_001_650);

    // exposure_max = vblank + height - min_shutter = 70 + 2180 - 3
    let exposure = dev.control(ControlId::Exposure).unwrap();
    assert_eq!(exposure.range.max, 2247);

    let black = dev.control(ControlId::BlackLevel).unwrap();
    assert_eq!((black.range.min, black.range.max), (0, 4095));
    assert_eq!(black.value, 200);

    let pixel_rate = dev.control(ControlId::PixelRate).unwrap();
    assert_eq!(pixel_rate.value, 260_280_000);
    assert!(pixel_rate.read_only);

    let link_freq = dev.control(ControlId::LinkFrequency).unwrap();
    assert_eq!(link_freq.value, 1_188_000_000 / 2);
}

#[test]
fn set_format_negotiates_nearest_mode() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    // Request close to the 2608x1964 crop; get its exact geometry back.
    let fmt = dev.set_format(PixelFormat::RAW12, 2600, 1900).unwrap();
    assert_eq!((fmt.width, fmt.height), (2608, 1964));

    let read_back = dev.format();
    assert_eq!((read_back.width, read_back.height), (2608, 1964));

    let crop = dev.crop();
    assert_eq!((crop.left, crop.top), (628, 108));
    assert_eq!((crop.width, crop.height), (2608, 1964));
}

#[test]
fn unknown_code_falls_back_to_default() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    // Y8 is not in the catalog; negotiation lands on the default code.
    let fmt = dev.set_format(PixelFormat::Y8, 1920, 1080).unwrap();
    assert_eq!(fmt.code, PixelFormat::RAW12);
    assert_eq!((fmt.width, fmt.height), (1920, 1080));
}

#[test]
fn enumerate_surfaces() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    assert_eq!(
        dev.enumerate_codes(),
        vec![PixelFormat::RAW12, PixelFormat::RAW10]
    );
    let sizes = dev.enumerate_sizes(PixelFormat::RAW10).unwrap();
    assert_eq!(sizes, vec![(3856, 2180), (2608, 1964), (1920, 1080)]);
    assert!(matches!(
        dev.enumerate_sizes(PixelFormat::Y12),
        Err(Error::UnsupportedFormat(_))
    ));

    assert_eq!(dev.native_size(), (3856, 2180));
    let bounds = dev.pixel_array_bounds();
    assert_eq!((bounds.width, bounds.height), (3856, 2180));
}

#[test]
fn black_level_range_switches_with_bit_depth() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    dev.set_format(PixelFormat::RAW10, 3856, 2180).unwrap();
    let black = dev.control(ControlId::BlackLevel).unwrap();
    assert_eq!((black.range.min, black.range.max), (0, 1023));
    assert_eq!(black.value, 50);

    dev.set_format(PixelFormat::RAW12, 3856, 2180).unwrap();
    let black = dev.control(ControlId::BlackLevel).unwrap();
    assert_eq!((black.range.min, black.range.max), (0, 4095));
    assert_eq!(black.value, 200);
}

#[test]
fn frame_rate_change_pins_vblank_and_bounds_exposure() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    dev.set_control(ControlId::FrameRate, 25_000_000).unwrap();
    assert_eq!(dev.derived_timing().1, 2700);

    let vblank = dev.control(ControlId::Vblank).unwrap();
    assert_eq!(vblank.value, 520);
    assert_eq!((vblank.range.min, vblank.range.max), (520, 520));

    let exposure = dev.control(ControlId::Exposure).unwrap();
    assert_eq!(exposure.range.max, 520 + 2180 - 3);
}

#[test]
fn raising_frame_rate_clamps_exposure() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    dev.set_control(ControlId::FrameRate, 25_000_000).unwrap();
    dev.set_control(ControlId::Exposure, 2697).unwrap();

    dev.set_control(ControlId::FrameRate, 30_001_650).unwrap();
    let exposure = dev.control(ControlId::Exposure).unwrap();
    assert_eq!(exposure.range.max, 2247);
    assert_eq!(exposure.value, 2247);
}

#[test]
fn out_of_range_frame_rates_are_rejected() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    assert!(matches!(
        dev.set_control(ControlId::FrameRate, 31_000_000),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        dev.set_control(ControlId::FrameRate, 0),
        Err(Error::InvalidParameter(_))
    ));
    // The rejected requests left the derived state untouched.
    assert_eq!(dev.derived_timing(), (14_814, 2250));
}

#[test]
fn read_only_controls_are_not_settable() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    assert!(matches!(
        dev.set_control(ControlId::PixelRate, 1),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        dev.set_control(ControlId::Hblank, 1),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn powered_exposure_write_uses_hold_register() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);
    mock.clear_log();

    dev.set_control(ControlId::Exposure, 1000).unwrap();

    // shutter = vblank + height - exposure = 70 + 2180 - 1000
    assert_eq!(
        mock.writes(),
        vec![(REGHOLD, 0x01), (SHR0, 1250), (REGHOLD, 0x00)]
    );
}

#[test]
fn unpowered_control_changes_are_state_only_and_replayed() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    dev.power_off().unwrap();
    mock.clear_log();

    dev.set_control(ControlId::Gain, 120).unwrap();
    dev.set_control(ControlId::BlackLevel, 300).unwrap();
    assert!(mock.writes().is_empty(), "unpowered setter reached hardware");

    dev.start_streaming().unwrap();
    assert_eq!(mock.last_write(GAIN), Some(120));
    // 12-bit black level scales by 4 into the register.
    assert_eq!(mock.last_write(BLKLEVEL), Some(300 >> 2));
}

#[test]
fn start_issues_tables_in_fixed_order_before_control_replay() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);
    mock.clear_log();

    dev.start_streaming().unwrap();
    assert!(dev.is_streaming());

    let writes = mock.writes();
    let pos = |addr: u16, val: u32| {
        writes
            .iter()
            .position(|w| *w == (addr, val))
            .unwrap_or_else(|| panic!("write 0x{addr:04X}={val:#X} missing"))
    };

    // Common table leads.
    assert_eq!(writes[0], (0x3014, 0x04));

    let common = pos(0x3014, 0x04);
    let mode_table = pos(0x30A4, 0xAA);
    let format_table = pos(0x401C, 0x2C);
    let hmax = pos(0x302C, 0x44C);
    let data_rate = pos(0x3015, 0x04);
    let gain_replay = pos(GAIN, 0);
    let stream_on = pos(STANDBY, 0x00);
    let master_start = pos(XMSTA, 0x00);

    assert!(common < mode_table);
    assert!(mode_table < format_table);
    assert!(format_table < hmax);
    assert!(hmax < data_rate);
    assert!(data_rate < gain_replay, "control replay ran before timing setup");
    assert!(gain_replay < stream_on);
    assert!(stream_on < master_start);
    assert_eq!(writes.last(), Some(&(XMSTA, 0x00)));
}

#[test]
fn double_start_performs_hardware_writes_once() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);
    mock.clear_log();

    dev.start_streaming().unwrap();
    let writes_after_first = mock.writes().len();
    assert_eq!(mock.writes_to(STANDBY), 1);

    dev.start_streaming().unwrap();
    assert_eq!(mock.writes().len(), writes_after_first);
    assert_eq!(mock.writes_to(STANDBY), 1);
}

#[test]
fn stop_enters_standby_and_is_idempotent() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    dev.start_streaming().unwrap();
    mock.clear_log();

    dev.stop_streaming().unwrap();
    assert!(!dev.is_streaming());
    assert_eq!(mock.last_write(XMSTA), Some(0x01));
    assert_eq!(mock.last_write(STANDBY), Some(0x01));

    mock.clear_log();
    dev.stop_streaming().unwrap();
    assert!(mock.writes().is_empty());
}

#[test]
fn stop_is_best_effort_on_register_failures() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);
    dev.start_streaming().unwrap();

    mock.fail_writes_to(XMSTA);
    mock.fail_writes_to(STANDBY);

    // Shutdown must not wedge on a dead bus.
    dev.stop_streaming().unwrap();
    assert!(!dev.is_streaming());
}

#[test]
fn flips_and_mode_controls_lock_while_streaming() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    dev.start_streaming().unwrap();
    assert!(matches!(
        dev.set_control(ControlId::HFlip, 1),
        Err(Error::Busy(ControlId::HFlip))
    ));
    assert!(matches!(
        dev.set_control(ControlId::OperationMode, 1),
        Err(Error::Busy(_))
    ));
    // Exposure stays live during streaming.
    dev.set_control(ControlId::Exposure, 500).unwrap();

    dev.stop_streaming().unwrap();
    dev.set_control(ControlId::HFlip, 1).unwrap();
}

#[test]
fn format_change_is_rejected_while_streaming() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    dev.start_streaming().unwrap();
    assert!(dev.set_format(PixelFormat::RAW10, 1920, 1080).is_err());
}

#[test]
fn failed_start_leaves_standby() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    // Abort mid-sequence at the mode table.
    mock.fail_writes_to(0x30A4);
    let err = dev.start_streaming().unwrap_err();
    assert!(matches!(err, Error::Transport { addr: 0x30A4, .. }));
    assert!(!dev.is_streaming());
}

#[test]
fn suspend_retains_streaming_intent_for_resume() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    dev.start_streaming().unwrap();
    dev.suspend().unwrap();
    assert_eq!(mock.last_write(STANDBY), Some(0x01));
    // Still logically streaming; resume restarts the sensor.
    assert!(dev.is_streaming());

    mock.clear_log();
    dev.resume().unwrap();
    assert_eq!(mock.last_write(STANDBY), Some(0x00));
    assert!(dev.is_streaming());
}

#[test]
fn failed_resume_forces_standby() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    dev.start_streaming().unwrap();
    dev.suspend().unwrap();

    mock.fail_writes_to(0x3014);
    assert!(dev.resume().is_err());
    assert!(!dev.is_streaming());
}

#[test]
fn ten_bit_black_level_register_is_unscaled() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);
    dev.set_format(PixelFormat::RAW10, 3856, 2180).unwrap();
    mock.clear_log();

    dev.set_control(ControlId::BlackLevel, 123).unwrap();
    assert_eq!(mock.last_write(BLKLEVEL), Some(123));
}

#[test]
fn vmax_write_tracks_frame_rate_when_powered() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);
    mock.clear_log();

    dev.set_control(ControlId::FrameRate, 25_000_000).unwrap();
    assert_eq!(mock.last_write(VMAX), Some(2700));
}

#[test]
fn binned_mode_accounts_for_double_rate_readout() {
    let mock = MockRegisterIo::new();
    let dev = probe(&mock);

    // 1928x1090 H2V2 mode reads out at 2x line rate.
    let fmt = dev.set_format(PixelFormat::RAW12, 1928, 1090).unwrap();
    assert_eq!((fmt.width, fmt.height), (1928, 1090));

    let (_, frame_length) = dev.derived_timing();
    let vblank = dev.control(ControlId::Vblank).unwrap().value as u32;
    assert_eq!(frame_length, 1090 * 2 + vblank);
}
