//! IMX676 profile: 12.4 MP square-format sensor, 10/12-bit readout.
//!
//! Shares the register layout of the IMX678 but adds a binned crop mode and
//! a wider set of link frequency classes.

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

const NATIVE_WIDTH: u32 = 3552;
const NATIVE_HEIGHT: u32 = 3556;

const MIN_SHR0_LENGTH: u32 = 8;
const MIN_FRAME_LENGTH_DELTA: u32 = 45;
const MIN_FPS_UFPS: u64 = 1_000_000;

const TAG_ALLPIXEL_12: ModeTag = ModeTag(0);
const TAG_CROP_2160_12: ModeTag = ModeTag(1);
const TAG_BINNING_12: ModeTag = ModeTag(2);
const TAG_BIN_CROP_12: ModeTag = ModeTag(3);
const TAG_ALLPIXEL_10: ModeTag = ModeTag(4);
const TAG_CROP_2160_10: ModeTag = ModeTag(5);

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

static MODE_COMMON: &RegSeq = &[
    RegWrite::new(0x3014, 0x04),
    RegWrite::new(0x301A, 0x00),
    RegWrite::new(0x3069, 0x00),
    RegWrite::new(0x3074, 0x64),
    RegWrite::new(0x30D5, 0x04),
    RegWrite::new(0x32C8, 0x01),
    RegWrite::new(0x3A50, 0x6C),
    RegWrite::new(0x3A52, 0x1D),
    RegWrite::new(0x3E10, 0x10),
    RegWrite::new(0x4004, 0xC0),
    RegWrite::new(0x4005, 0x06),
];

static MODE_3552X3556: &RegSeq = &[
    RegWrite::new(0x301B, 0x00),
    RegWrite::new(0x3022, 0x02),
    RegWrite::new(0x3023, 0x01),
    RegWrite::new(0x30A4, 0xAA),
    RegWrite::new(0x30A8, 0x04),
    RegWrite::new(0x3D6C, 0x00),
];

static MODE_CROP_3552X2160: &RegSeq = &[
    RegWrite::new(0x301B, 0x00),
    RegWrite::new(0x3022, 0x02),
    RegWrite::new(0x3023, 0x01),
    RegWrite::new(0x303C, 0x00),
    RegWrite::new(0x303D, 0x00),
    RegWrite::new(0x303E, 0xE0),
    RegWrite::new(0x303F, 0x0D),
    RegWrite::new(0x3044, 0xBA),
    RegWrite::new(0x3045, 0x02),
    RegWrite::new(0x3046, 0x70),
    RegWrite::new(0x3047, 0x08),
];

static MODE_H2V2_BINNING: &RegSeq = &[
    RegWrite::new(0x301B, 0x01),
    RegWrite::new(0x3022, 0x01),
    RegWrite::new(0x3023, 0x01),
    RegWrite::new(0x30D5, 0x02),
    RegWrite::new(0x3A50, 0x50),
    RegWrite::new(0x3A52, 0x00),
];

static MODE_CROP_1768X1080: &RegSeq = &[
    RegWrite::new(0x301B, 0x01),
    RegWrite::new(0x3022, 0x01),
    RegWrite::new(0x3023, 0x01),
    RegWrite::new(0x303C, 0x08),
    RegWrite::new(0x303D, 0x00),
    RegWrite::new(0x303E, 0xD0),
    RegWrite::new(0x303F, 0x0D),
    RegWrite::new(0x30D5, 0x02),
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

static DATARATE_1440: &RegSeq = &[RegWrite::new(DATARATE_SEL, 0x03)];
static DATARATE_891: &RegSeq = &[RegWrite::new(DATARATE_SEL, 0x05)];
static DATARATE_720: &RegSeq = &[RegWrite::new(DATARATE_SEL, 0x06)];
static DATARATE_594: &RegSeq = &[RegWrite::new(DATARATE_SEL, 0x07)];

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
        mode_table: MODE_3552X3556,
        format_table: RAW12_FRAMEFMT,
    },
    // Crop
    Mode {
        width: 3552,
        height: 2160,
        binning: 1,
        min_framerate_ufps: MIN_FPS_UFPS,
        crop: CropRect::new(0, 698, 3552, 2160),
        tag: TAG_CROP_2160_12,
        mode_table: MODE_CROP_3552X2160,
        format_table: RAW12_FRAMEFMT,
    },
    // H2V2 binning
    Mode {
        width: 1776,
        height: 1778,
        binning: 2,
        min_framerate_ufps: MIN_FPS_UFPS,
        crop: CropRect::new(0, 0, NATIVE_WIDTH, NATIVE_HEIGHT),
        tag: TAG_BINNING_12,
        mode_table: MODE_H2V2_BINNING,
        format_table: RAW12_FRAMEFMT,
    },
    // Binned crop
    Mode {
        width: 1768,
        height: 1080,
        binning: 2,
        min_framerate_ufps: MIN_FPS_UFPS,
        crop: CropRect::new(0, 698, 3536, 2160),
        tag: TAG_BIN_CROP_12,
        mode_table: MODE_CROP_1768X1080,
        format_table: RAW12_FRAMEFMT,
    },
];

static MODES_10BIT: [Mode; 2] = [
    Mode {
        width: NATIVE_WIDTH,
        height: NATIVE_HEIGHT,
        binning: 1,
        min_framerate_ufps: MIN_FPS_UFPS,
        crop: CropRect::new(0, 0, NATIVE_WIDTH, NATIVE_HEIGHT),
        tag: TAG_ALLPIXEL_10,
        mode_table: MODE_3552X3556,
        format_table: RAW10_FRAMEFMT,
    },
    Mode {
        width: 3552,
        height: 2160,
        binning: 1,
        min_framerate_ufps: MIN_FPS_UFPS,
        crop: CropRect::new(0, 698, 3552, 2160),
        tag: TAG_CROP_2160_10,
        mode_table: MODE_CROP_3552X2160,
        format_table: RAW10_FRAMEFMT,
    },
];

static CATALOG: ModeCatalog = ModeCatalog {
    entries: &[
        (PixelFormat::RAW12, &MODES_12BIT),
        (PixelFormat::RAW10, &MODES_10BIT),
    ],
};

pub struct Imx676;

pub static IMX676: Imx676 = Imx676;

impl SensorProfile for Imx676 {
    fn name(&self) -> &'static str {
        "imx676"
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
            TAG_ALLPIXEL_12 => (0x4E8, 209_980_891, LinkFreq::Mbps720),
            TAG_CROP_2160_12 => (0x4E8, 209_980_891, LinkFreq::Mbps720),
            TAG_BINNING_12 => (0x274, 209_980_891, LinkFreq::Mbps891),
            TAG_BIN_CROP_12 => (0x274, 209_035_031, LinkFreq::Mbps1440),
            TAG_ALLPIXEL_10 => (0x4E8, 209_980_891, LinkFreq::Mbps594),
            TAG_CROP_2160_10 => (0x4E8, 209_980_891, LinkFreq::Mbps594),
            other => panic!("unknown imx676 mode tag {other:?}"),
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
            LinkFreq::Mbps891 => Ok(DATARATE_891),
            LinkFreq::Mbps720 => Ok(DATARATE_720),
            LinkFreq::Mbps594 => Ok(DATARATE_594),
            other => Err(Error::InvalidParameter(format!(
                "imx676 has no data rate setup for {other:?}"
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
