//! IMX678 profile: 8.3 MP rolling-shutter sensor, 10/12-bit readout.

use crate::controls::{ControlRange, OperationMode, ShutterMode, SyncMode};
use crate::error::{Error, Result};
use crate::mode::{
    BitDepth, Chromaticity, CropRect, Mode, ModeCatalog, ModeTag, PixelFormat,
};
use crate::profile::{
    BlackLevelSpec, LinkFreq, ModeConstants, SensorProfile, SensorRegisters, TriggerPlan,
};
use crate::regio::{RegSeq, RegWrite};
use crate::timing::FrameLengthParity;
use std::time::Duration;

const STANDBY: u16 = 0x3000;
const REGHOLD: u16 = 0x3001;
const XMSTA: u16 = 0x3002;
const DATARATE_SEL: u16 = 0x3015;
const HREVERSE: u16 = 0x3020;
const VREVERSE: u16 = 0x3021;
const VMAX_LOW: u16 = 0x3028;
const HMAX_LOW: u16 = 0x302C;
const SHR0_LOW: u16 = 0x3050;
const GAIN_LOW: u16 = 0x3070;
const XVS_XHS_DRV: u16 = 0x30A6;
const EXTMODE: u16 = 0x30CE;
const BLKLEVEL_LOW: u16 = 0x30DC;
const TPG_EN_DUOUT: u16 = 0x30E0;
const TPG_PATSEL_DUOUT: u16 = 0x30E2;
const TPG_COLORWIDTH: u16 = 0x30E4;

const NATIVE_WIDTH: u32 = 3856;
const NATIVE_HEIGHT: u32 = 2180;

const MIN_SHR0_LENGTH: u32 = 3;
const MIN_FRAME_LENGTH_DELTA: u32 = 70;
const MIN_FPS_UFPS: u64 = 1_000_000;

const TAG_ALLPIXEL_12: ModeTag = ModeTag(0);
const TAG_CROP_2608_12: ModeTag = ModeTag(1);
const TAG_CROP_1920_12: ModeTag = ModeTag(2);
const TAG_BINNING_12: ModeTag = ModeTag(3);
const TAG_ALLPIXEL_10: ModeTag = ModeTag(4);
const TAG_CROP_2608_10: ModeTag = ModeTag(5);
const TAG_CROP_1920_10: ModeTag = ModeTag(6);

static REGISTERS: SensorRegisters = SensorRegisters {
    standby: STANDBY,
    xmsta: XMSTA,
    reghold: REGHOLD,
    vmax: VMAX_LOW,
    hmax: HMAX_LOW,
    shutter: SHR0_LOW,
    gain: GAIN_LOW,
    black_level: BLKLEVEL_LOW,
    hreverse: Some(HREVERSE),
    vreverse: Some(VREVERSE),
    extmode: Some(EXTMODE),
    xvs_xhs_drv: Some(XVS_XHS_DRV),
};

/// Startup defaults shared by every mode.
static MODE_COMMON: &RegSeq = &[
    RegWrite::new(0x3014, 0x04),
    RegWrite::new(0x301A, 0x00),
    RegWrite::new(0x3069, 0x00),
    RegWrite::new(0x3074, 0x64),
    RegWrite::new(0x30D5, 0x04),
    RegWrite::new(0x32C8, 0x01),
    RegWrite::new(0x3A50, 0x62),
    RegWrite::new(0x3A52, 0x19),
    RegWrite::new(0x3E10, 0x10),
    RegWrite::new(0x4004, 0xC0),
    RegWrite::new(0x4005, 0x06),
];

static MODE_3856X2180: &RegSeq = &[
    RegWrite::new(0x301B, 0x00),
    RegWrite::new(0x3022, 0x02),
    RegWrite::new(0x3023, 0x01),
    RegWrite::new(0x30A4, 0xAA),
    RegWrite::new(0x30A8, 0x04),
    RegWrite::new(0x30AC, 0x04),
    RegWrite::new(0x3D6C, 0x00),
];

static MODE_CROP_2608X1964: &RegSeq = &[
    RegWrite::new(0x301B, 0x00),
    RegWrite::new(0x3022, 0x02),
    RegWrite::new(0x3023, 0x01),
    RegWrite::new(0x303C, 0x74),
    RegWrite::new(0x303D, 0x02),
    RegWrite::new(0x303E, 0x30),
    RegWrite::new(0x303F, 0x0A),
    RegWrite::new(0x3044, 0x6C),
    RegWrite::new(0x3045, 0x00),
    RegWrite::new(0x3046, 0xAC),
    RegWrite::new(0x3047, 0x07),
];

static MODE_CROP_1920X1080: &RegSeq = &[
    RegWrite::new(0x301B, 0x00),
    RegWrite::new(0x3022, 0x02),
    RegWrite::new(0x3023, 0x01),
    RegWrite::new(0x303C, 0x24),
    RegWrite::new(0x303D, 0x02),
    RegWrite::new(0x303E, 0x80),
    RegWrite::new(0x303F, 0x07),
    RegWrite::new(0x3044, 0x24),
    RegWrite::new(0x3045, 0x02),
    RegWrite::new(0x3046, 0x38),
    RegWrite::new(0x3047, 0x04),
];

static MODE_H2V2_BINNING: &RegSeq = &[
    RegWrite::new(0x301B, 0x01),
    RegWrite::new(0x3022, 0x01),
    RegWrite::new(0x3023, 0x01),
    RegWrite::new(0x30D5, 0x02),
    RegWrite::new(0x3A50, 0x50),
    RegWrite::new(0x3A52, 0x00),
];

static RAW12_FRAMEFMT: &RegSeq = &[
    RegWrite::new(0x3031, 0x01),
    RegWrite::new(0x3032, 0x01),
    RegWrite::new(0x401C, 0x2C),
    RegWrite::new(0x401D, 0x2C),
];

static RAW10_FRAMEFMT: &RegSeq = &[
    RegWrite::new(0x3031, 0x00),
    RegWrite::new(0x3032, 0x00),
    RegWrite::new(0x401C, 0x2B),
    RegWrite::new(0x401D, 0x2B),
];

static RAW12_H2V2_FRAMEFMT: &RegSeq = &[
    RegWrite::new(0x3031, 0x01),
    RegWrite::new(0x3032, 0x01),
    RegWrite::new(0x401C, 0x2C),
    RegWrite::new(0x401D, 0x2C),
    RegWrite::new(0x4074, 0x01),
];

static DATARATE_1440: &RegSeq = &[RegWrite::new(DATARATE_SEL, 0x03)];
static DATARATE_1188: &RegSeq = &[RegWrite::new(DATARATE_SEL, 0x04)];
static DATARATE_891: &RegSeq = &[RegWrite::new(DATARATE_SEL, 0x05)];

static TPG_ENABLE: &RegSeq = &[
    RegWrite::new(TPG_EN_DUOUT, 0x01),
    RegWrite::new(TPG_COLORWIDTH, 0x00),
    RegWrite::new(0x30E6, 0x00),
    RegWrite::new(0x30E8, 0x01),
];

static TPG_DISABLE: &RegSeq = &[
    RegWrite::new(TPG_EN_DUOUT, 0x00),
    RegWrite::new(0x30E8, 0x00),
];

static MODES_12BIT: [Mode; 4] = [
    // All pixel
    Mode {
        width: NATIVE_WIDTH,
        height: NATIVE_HEIGHT,
        binning: 1,
        min_framerate_ufps: MIN_FPS_UFPS,
        crop: CropRect::new(0, 0, NATIVE_WIDTH, NATIVE_HEIGHT),
        tag: TAG_ALLPIXEL_12,
        mode_table: MODE_3856X2180,
        format_table: RAW12_FRAMEFMT,
    },
    // Crop
    Mode {
        width: 2608,
        height: 1964,
        binning: 1,
        min_framerate_ufps: MIN_FPS_UFPS,
        crop: CropRect::new(628, 108, 2608, 1964),
        tag: TAG_CROP_2608_12,
        mode_table: MODE_CROP_2608X1964,
        format_table: RAW12_FRAMEFMT,
    },
    // Crop
    Mode {
        width: 1920,
        height: 1080,
        binning: 1,
        min_framerate_ufps: MIN_FPS_UFPS,
        crop: CropRect::new(972, 548, 1920, 1080),
        tag: TAG_CROP_1920_12,
        mode_table: MODE_CROP_1920X1080,
        format_table: RAW12_FRAMEFMT,
    },
    // H2V2 binning, reads out at 2x line rate
    Mode {
        width: 1928,
        height: 1090,
        binning: 2,
        min_framerate_ufps: MIN_FPS_UFPS,
        crop: CropRect::new(0, 0, NATIVE_WIDTH, NATIVE_HEIGHT),
        tag: TAG_BINNING_12,
        mode_table: MODE_H2V2_BINNING,
        format_table: RAW12_H2V2_FRAMEFMT,
    },
];

static MODES_10BIT: [Mode; 3] = [
    Mode {
        width: NATIVE_WIDTH,
        height: NATIVE_HEIGHT,
        binning: 1,
        min_framerate_ufps: MIN_FPS_UFPS,
        crop: CropRect::new(0, 0, NATIVE_WIDTH, NATIVE_HEIGHT),
        tag: TAG_ALLPIXEL_10,
        mode_table: MODE_3856X2180,
        format_table: RAW10_FRAMEFMT,
    },
    Mode {
        width: 2608,
        height: 1964,
        binning: 1,
        min_framerate_ufps: MIN_FPS_UFPS,
        crop: CropRect::new(628, 108, 2608, 1964),
        tag: TAG_CROP_2608_10,
        mode_table: MODE_CROP_2608X1964,
        format_table: RAW10_FRAMEFMT,
    },
    Mode {
        width: 1920,
        height: 1080,
        binning: 1,
        min_framerate_ufps: MIN_FPS_UFPS,
        crop: CropRect::new(972, 548, 1920, 1080),
        tag: TAG_CROP_1920_10,
        mode_table: MODE_CROP_1920X1080,
        format_table: RAW10_FRAMEFMT,
    },
];

static CATALOG: ModeCatalog = ModeCatalog {
    entries: &[
        (PixelFormat::RAW12, &MODES_12BIT),
        (PixelFormat::RAW10, &MODES_10BIT),
    ],
};

pub struct Imx678;

pub static IMX678: Imx678 = Imx678;

impl SensorProfile for Imx678 {
    fn name(&self) -> &'static str {
        "imx678"
    }

    fn native_size(&self) -> (u32, u32) {
        (NATIVE_WIDTH, NATIVE_HEIGHT)
    }

    fn pixel_array(&self) -> CropRect {
        CropRect::new(0, 0, NATIVE_WIDTH, NATIVE_HEIGHT)
    }

    fn registers(&self) -> &'static SensorRegisters {
        &REGISTERS
    }

    fn frame_length_parity(&self) -> FrameLengthParity {
        FrameLengthParity::Even
    }

    fn gain_range(&self) -> ControlRange {
        ControlRange::new(0, 240, 1, 0)
    }

    fn black_level(&self, depth: BitDepth) -> BlackLevelSpec {
        match depth {
            BitDepth::Eight => BlackLevelSpec {
                range: ControlRange::new(0, 255, 1, 15),
                shift: 0,
            },
            BitDepth::Ten => BlackLevelSpec {
                range: ControlRange::new(0, 1023, 1, 50),
                shift: 0,
            },
            BitDepth::Twelve => BlackLevelSpec {
                range: ControlRange::new(0, 4095, 1, 200),
                shift: 2,
            },
        }
    }

    fn catalog(&self, _chroma: Chromaticity) -> &'static ModeCatalog {
        &CATALOG
    }

    fn constants(&self, tag: ModeTag, _chroma: Chromaticity) -> ModeConstants {
        let (hmax, pixel_rate, link_freq) = match tag {
            TAG_ALLPIXEL_12 => (0x44C, 260_280_000, LinkFreq::Mbps1188),
            TAG_CROP_2608_12 => (0x294, 293_400_000, LinkFreq::Mbps1440),
            TAG_CROP_1920_12 => (0x294, 216_000_000, LinkFreq::Mbps1440),
            TAG_BINNING_12 => (0x226, 260_280_000, LinkFreq::Mbps1440),
            TAG_ALLPIXEL_10 => (0x44C, 260_280_000, LinkFreq::Mbps891),
            TAG_CROP_2608_10 => (0x294, 293_400_000, LinkFreq::Mbps1440),
            TAG_CROP_1920_10 => (0x226, 259_200_000, LinkFreq::Mbps1440),
            other => panic!("unknown imx678 mode tag {other:?}"),
        };
        ModeConstants {
            hmax,
            min_shutter_length: MIN_SHR0_LENGTH,
            min_frame_length_delta: MIN_FRAME_LENGTH_DELTA,
            pixel_rate,
            link_freq,
        }
    }

    fn common_table(&self) -> &'static RegSeq {
        MODE_COMMON
    }

    fn data_rate_table(&self, link_freq: LinkFreq) -> Result<&'static RegSeq> {
        match link_freq {
            LinkFreq::Mbps1440 => Ok(DATARATE_1440),
            LinkFreq::Mbps1188 => Ok(DATARATE_1188),
            LinkFreq::Mbps891 => Ok(DATARATE_891),
            other => Err(Error::InvalidParameter(format!(
                "imx678 has no data rate setup for {other:?}"
            ))),
        }
    }

    fn test_pattern_count(&self) -> u32 {
        13
    }

    fn test_pattern_writes(&self, pattern: u32) -> Vec<RegWrite> {
        if pattern > 0 {
            let mut writes: Vec<RegWrite> = TPG_ENABLE.to_vec();
            writes.push(RegWrite::new(TPG_PATSEL_DUOUT, (pattern - 1) as u8));
            writes
        } else {
            TPG_DISABLE.to_vec()
        }
    }

    fn trigger_writes(
        &self,
        op: OperationMode,
        sync: SyncMode,
        _shutter: ShutterMode,
        _tag: ModeTag,
        _chroma: Chromaticity,
    ) -> Result<TriggerPlan> {
        // XVS/XHS pins drive only in internal-sync master mode; every other
        // combination leaves them high impedance.
        let xvs_xhs_drv = match (op, sync) {
            (OperationMode::Master, SyncMode::Internal) => 0x0,
            _ => 0xF,
        };
        Ok(TriggerPlan {
            writes: vec![RegWrite::new(XVS_XHS_DRV, xvs_xhs_drv)],
            corrected_shutter: None,
        })
    }

    fn has_sync_mode(&self) -> bool {
        true
    }

    fn has_shutter_mode(&self) -> bool {
        false
    }

    fn has_flip(&self) -> bool {
        true
    }

    fn stream_start_settle(&self) -> Duration {
        Duration::from_millis(30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_code_is_raw12_all_pixel() {
        let catalog = IMX678.catalog(Chromaticity::Color);
        assert_eq!(catalog.default_code(), PixelFormat::RAW12);
        let modes = catalog.lookup(PixelFormat::RAW12).unwrap();
        assert_eq!((modes[0].width, modes[0].height), (3856, 2180));
    }

    #[test]
    fn binning_mode_doubles_effective_height() {
        let modes = IMX678
            .catalog(Chromaticity::Color)
            .lookup(PixelFormat::RAW12)
            .unwrap();
        let binned = &modes[3];
        assert_eq!(binned.binning, 2);
        assert_eq!(binned.effective_height(), 2180);
        // Binned readout still crops the full array.
        assert_eq!(binned.crop.width, 3856);
    }

    #[test]
    fn all_pixel_constants() {
        let c = IMX678.constants(TAG_ALLPIXEL_12, Chromaticity::Color);
        assert_eq!(c.hmax, 0x44C);
        assert_eq!(c.link_freq, LinkFreq::Mbps1188);
        assert_eq!(c.min_frame_length_delta, 70);
    }

    #[test]
    fn data_rate_selection_tracks_link_class() {
        assert_eq!(
            IMX678.data_rate_table(LinkFreq::Mbps1188).unwrap(),
            &[RegWrite::new(DATARATE_SEL, 0x04)]
        );
        assert!(IMX678.data_rate_table(LinkFreq::Mbps594).is_err());
    }

    #[test]
    fn test_pattern_zero_disables_generator() {
        let writes = IMX678.test_pattern_writes(0);
        assert_eq!(writes[0], RegWrite::new(TPG_EN_DUOUT, 0x00));

        let writes = IMX678.test_pattern_writes(5);
        assert_eq!(*writes.last().unwrap(), RegWrite::new(TPG_PATSEL_DUOUT, 4));
    }

    #[test]
    fn xvs_xhs_only_driven_in_internal_sync_master() {
        let plan = IMX678
            .trigger_writes(
                OperationMode::Master,
                SyncMode::Internal,
                ShutterMode::Normal,
                TAG_ALLPIXEL_12,
                Chromaticity::Color,
            )
            .unwrap();
        assert_eq!(plan.writes, vec![RegWrite::new(XVS_XHS_DRV, 0x0)]);

        let plan = IMX678
            .trigger_writes(
                OperationMode::Slave,
                SyncMode::Internal,
                ShutterMode::Normal,
                TAG_ALLPIXEL_12,
                Chromaticity::Color,
            )
            .unwrap();
        assert_eq!(plan.writes, vec![RegWrite::new(XVS_XHS_DRV, 0xF)]);
    }
}
