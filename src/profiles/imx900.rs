//! IMX900 profile: 3.2 MP global-shutter sensor, 8/10/12-bit readout.
//!
//! The part ships in color and monochrome populations sharing one part
//! number; chromaticity is read from an information register at probe time,
//! and the subsampled/binned readout modes map the same mode key to two
//! different constant sets depending on it.

use crate::controls::{ControlRange, OperationMode, ShutterMode, SyncMode};
use crate::error::{Error, Result};
use crate::mode::{
    BitDepth, Chromaticity, CropRect, Mode, ModeCatalog, ModeTag, PixelFormat,
};
use crate::profile::{
    BlackLevelSpec, ChromaticityProbe, LinkFreq, ModeConstants, SensorProfile, SensorRegisters,
    TriggerPlan,
};
use crate::regio::{RegSeq, RegWrite};
use crate::timing::FrameLengthParity;
use std::time::Duration;

const STANDBY: u16 = 0x3000;
const XMSTA: u16 = 0x3010;
const VMAX_LOW: u16 = 0x30D4;
const HMAX_LOW: u16 = 0x30D8;
const REGHOLD: u16 = 0x30F8;
const ADBIT_MONOSEL: u16 = 0x3200;
const VINT_EN: u16 = 0x323E;
const SHS_LOW: u16 = 0x3240;
const TRIGMODE: u16 = 0x3400;
const GAIN_LOW: u16 = 0x3514;
const TPG_CTRL: u16 = 0x3550;
const TPG_PATSEL: u16 = 0x3551;
const BLKLEVEL_LOW: u16 = 0x35B4;
const CHROMACITY: u16 = 0x3817;

const NATIVE_WIDTH: u32 = 2064;
const NATIVE_HEIGHT: u32 = 1552;

const MIN_FPS_UFPS: u64 = 1_000_000;

/// Readout structure of a mode, independent of bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readout {
    AllPixel,
    Roi,
    Sub2,
    Sub10,
    BinCrop,
}

const fn tag(readout: Readout, depth: BitDepth) -> ModeTag {
    let d = match depth {
        BitDepth::Twelve => 0,
        BitDepth::Ten => 1,
        BitDepth::Eight => 2,
    };
    let r = readout as u16;
    ModeTag(d * 5 + r)
}

fn split_tag(t: ModeTag) -> (Readout, BitDepth) {
    let depth = match t.0 / 5 {
        0 => BitDepth::Twelve,
        1 => BitDepth::Ten,
        _ => BitDepth::Eight,
    };
    let readout = match t.0 % 5 {
        0 => Readout::AllPixel,
        1 => Readout::Roi,
        2 => Readout::Sub2,
        3 => Readout::Sub10,
        _ => Readout::BinCrop,
    };
    (readout, depth)
}

static REGISTERS: SensorRegisters = SensorRegisters {
    standby: STANDBY,
    xmsta: XMSTA,
    reghold: REGHOLD,
    vmax: VMAX_LOW,
    hmax: HMAX_LOW,
    shutter: SHS_LOW,
    gain: GAIN_LOW,
    black_level: BLKLEVEL_LOW,
    hreverse: None,
    vreverse: None,
    extmode: None,
    xvs_xhs_drv: None,
};

static MODE_COMMON: &RegSeq = &[
    RegWrite::new(0x3014, 0x2D),
    RegWrite::new(0x3015, 0x19),
    RegWrite::new(0x3016, 0x06),
    RegWrite::new(0x301C, 0x91),
    RegWrite::new(0x303A, 0x02),
    RegWrite::new(0x30E2, 0x05),
    RegWrite::new(0x30E3, 0x05),
    RegWrite::new(0x36A8, 0x00),
    RegWrite::new(0x36E2, 0x00),
];

static MODE_2064X1552: &RegSeq = &[
    RegWrite::new(0x3100, 0x00),
    RegWrite::new(0x3104, 0x00),
    RegWrite::new(0x303C, 0x00),
];

static MODE_1920X1080: &RegSeq = &[
    RegWrite::new(0x3100, 0x01),
    RegWrite::new(0x3104, 0x01),
    RegWrite::new(0x3120, 0x48),
    RegWrite::new(0x3121, 0x00),
    RegWrite::new(0x3122, 0xF0),
    RegWrite::new(0x3123, 0x00),
    RegWrite::new(0x3124, 0x80),
    RegWrite::new(0x3125, 0x07),
    RegWrite::new(0x3126, 0x38),
    RegWrite::new(0x3127, 0x04),
];

static MODE_1032X776: &RegSeq = &[
    RegWrite::new(0x3100, 0x00),
    RegWrite::new(0x3104, 0x00),
    RegWrite::new(0x303C, 0x11),
];

static MODE_2064X154: &RegSeq = &[
    RegWrite::new(0x3100, 0x00),
    RegWrite::new(0x3104, 0x00),
    RegWrite::new(0x303C, 0x22),
];

static MODE_1024X720: &RegSeq = &[
    RegWrite::new(0x3100, 0x01),
    RegWrite::new(0x3104, 0x01),
    RegWrite::new(0x303C, 0x11),
    RegWrite::new(0x3124, 0x00),
    RegWrite::new(0x3125, 0x04),
    RegWrite::new(0x3126, 0xD0),
    RegWrite::new(0x3127, 0x02),
];

static RAW12_FRAMEFMT: &RegSeq = &[RegWrite::new(0x3430, 0x02)];
static RAW10_FRAMEFMT: &RegSeq = &[RegWrite::new(0x3430, 0x01)];
static RAW8_FRAMEFMT: &RegSeq = &[RegWrite::new(0x3430, 0x00)];

/// Readout-structure tuning written after the format table.
static EXTRA_ALLPIXEL_ROI: &RegSeq = &[
    RegWrite::new(0x36A8, 0x00),
    RegWrite::new(0x36A9, 0x00),
];
static EXTRA_SUBG2_COLOR: &RegSeq = &[
    RegWrite::new(0x36A8, 0x11),
    RegWrite::new(0x36A9, 0x04),
];
static EXTRA_SUB2_BINNING_MONO: &RegSeq = &[
    RegWrite::new(0x36A8, 0x12),
    RegWrite::new(0x36A9, 0x08),
];
static EXTRA_SUB10: &RegSeq = &[
    RegWrite::new(0x36A8, 0x1A),
    RegWrite::new(0x36A9, 0x04),
];

/// Link-rate dependent PLL/PHY setup.
static DATARATE_1485: &RegSeq = &[
    RegWrite::new(0x3904, 0x03),
    RegWrite::new(0x3910, 0x00),
    RegWrite::new(0x3911, 0x5A),
];
static DATARATE_1188: &RegSeq = &[
    RegWrite::new(0x3904, 0x03),
    RegWrite::new(0x3910, 0x01),
    RegWrite::new(0x3911, 0x48),
];
static DATARATE_891: &RegSeq = &[
    RegWrite::new(0x3904, 0x03),
    RegWrite::new(0x3910, 0x02),
    RegWrite::new(0x3911, 0x36),
];

/// Rate/structure dependent register sets written after the extras.
static DEP_ALLPIX_ROI_SUB10_1485_12: &RegSeq = &[
    RegWrite::new(0x3930, 0x66),
    RegWrite::new(0x3931, 0x03),
];
static DEP_SUB2_COLOR_1485_12: &RegSeq = &[
    RegWrite::new(0x3930, 0x66),
    RegWrite::new(0x3931, 0x13),
];
static DEP_SUB2_BIN_MONO_1485_12: &RegSeq = &[
    RegWrite::new(0x3930, 0x66),
    RegWrite::new(0x3931, 0x23),
];
static DEP_ALLPIX_ROI_SUB10_891_10: &RegSeq = &[
    RegWrite::new(0x3930, 0x45),
    RegWrite::new(0x3931, 0x02),
];
static DEP_ALLPIX_ROI_SUB10_1188_10: &RegSeq = &[
    RegWrite::new(0x3930, 0x45),
    RegWrite::new(0x3931, 0x12),
];
static DEP_SUB2_COLOR_1485_10: &RegSeq = &[
    RegWrite::new(0x3930, 0x45),
    RegWrite::new(0x3931, 0x22),
];
static DEP_SUB2_BIN_MONO_1188_10: &RegSeq = &[
    RegWrite::new(0x3930, 0x45),
    RegWrite::new(0x3931, 0x32),
];
static DEP_ALLPIX_ROI_SUB10_891_8: &RegSeq = &[
    RegWrite::new(0x3930, 0x24),
    RegWrite::new(0x3931, 0x01),
];
static DEP_SUB2_COLOR_1485_8: &RegSeq = &[
    RegWrite::new(0x3930, 0x24),
    RegWrite::new(0x3931, 0x21),
];
static DEP_SUB2_BIN_MONO_891_8: &RegSeq = &[
    RegWrite::new(0x3930, 0x24),
    RegWrite::new(0x3931, 0x31),
];

const fn mode(
    width: u32,
    height: u32,
    crop: CropRect,
    readout: Readout,
    depth: BitDepth,
    format_table: &'static RegSeq,
    mode_table: &'static RegSeq,
) -> Mode {
    Mode {
        width,
        height,
        binning: 1,
        min_framerate_ufps: MIN_FPS_UFPS,
        crop,
        tag: tag(readout, depth),
        mode_table,
        format_table,
    }
}

const FULL: CropRect = CropRect::new(0, 0, NATIVE_WIDTH, NATIVE_HEIGHT);
const ROI_CROP: CropRect = CropRect::new(72, 240, 1920, 1080);
const SUB2_CROP: CropRect = CropRect::new(0, 0, 1032, 776);
const SUB10_CROP: CropRect = CropRect::new(0, 0, 2064, 154);
const BINCROP_CROP: CropRect = CropRect::new(0, 0, 1024, 720);

macro_rules! depth_modes {
    ($name:ident, $depth:expr, $fmt:expr) => {
        static $name: [Mode; 5] = [
            mode(2064, 1552, FULL, Readout::AllPixel, $depth, $fmt, MODE_2064X1552),
            mode(1920, 1080, ROI_CROP, Readout::Roi, $depth, $fmt, MODE_1920X1080),
            mode(1032, 776, SUB2_CROP, Readout::Sub2, $depth, $fmt, MODE_1032X776),
            mode(2064, 154, SUB10_CROP, Readout::Sub10, $depth, $fmt, MODE_2064X154),
            mode(1024, 720, BINCROP_CROP, Readout::BinCrop, $depth, $fmt, MODE_1024X720),
        ];
    };
}

depth_modes!(MODES_12BIT, BitDepth::Twelve, RAW12_FRAMEFMT);
depth_modes!(MODES_10BIT, BitDepth::Ten, RAW10_FRAMEFMT);
depth_modes!(MODES_8BIT, BitDepth::Eight, RAW8_FRAMEFMT);

static CATALOG_COLOR: ModeCatalog = ModeCatalog {
    entries: &[
        (PixelFormat::RAW12, &MODES_12BIT),
        (PixelFormat::RAW10, &MODES_10BIT),
        (PixelFormat::RAW8, &MODES_8BIT),
    ],
};

static CATALOG_MONO: ModeCatalog = ModeCatalog {
    entries: &[
        (PixelFormat::Y12, &MODES_12BIT),
        (PixelFormat::Y10, &MODES_10BIT),
        (PixelFormat::Y8, &MODES_8BIT),
    ],
};

pub struct Imx900;

pub static IMX900: Imx900 = Imx900;

impl SensorProfile for Imx900 {
    fn name(&self) -> &'static str {
        "imx900"
    }

    fn native_size(&self) -> (u32, u32) {
        (NATIVE_WIDTH, NATIVE_HEIGHT)
    }

    fn pixel_array(&self) -> CropRect {
        FULL
    }

    fn registers(&self) -> &'static SensorRegisters {
        &REGISTERS
    }

    fn frame_length_parity(&self) -> FrameLengthParity {
        FrameLengthParity::Any
    }

    fn gain_range(&self) -> ControlRange {
        ControlRange::new(0, 480, 1, 0)
    }

    fn black_level(&self, depth: BitDepth) -> BlackLevelSpec {
        let range = match depth {
            BitDepth::Eight => ControlRange::new(0, 255, 1, 15),
            BitDepth::Ten => ControlRange::new(0, 1023, 1, 60),
            BitDepth::Twelve => ControlRange::new(0, 4095, 1, 240),
        };
        BlackLevelSpec { range, shift: 0 }
    }

    fn catalog(&self, chroma: Chromaticity) -> &'static ModeCatalog {
        match chroma {
            Chromaticity::Color => &CATALOG_COLOR,
            Chromaticity::Mono => &CATALOG_MONO,
        }
    }

    fn constants(&self, t: ModeTag, chroma: Chromaticity) -> ModeConstants {
        use BitDepth::*;
        use Chromaticity::*;
        use Readout::*;

        let (readout, depth) = split_tag(t);

        let hmax = match (depth, readout, chroma) {
            (Twelve, AllPixel | Roi | Sub10, _) => 0x262,
            (Twelve, Sub2 | BinCrop, Color) => 0x262,
            (Twelve, Sub2 | BinCrop, Mono) => 0x131,
            (Ten, AllPixel | Sub10, _) => 0x1F3,
            (Ten, Roi, _) => 0x17A,
            (Ten, Sub2 | BinCrop, Color) => 0x16C,
            (Ten, Sub2 | BinCrop, Mono) => 0xD8,
            (Eight, AllPixel | Roi | Sub10, _) => 0x19C,
            (Eight, Sub2 | BinCrop, Color) => 0x152,
            (Eight, Sub2 | BinCrop, Mono) => 0xF0,
        };

        let min_shutter_length = match (depth, readout, chroma) {
            (Twelve, AllPixel | Roi | Sub10, _) => 51,
            (Twelve, Sub2 | BinCrop, Color) => 51,
            (Twelve, Sub2 | BinCrop, Mono) => 102,
            (Ten, AllPixel | Sub10, _) => 62,
            (Ten, Roi, _) => 82,
            (Ten, Sub2 | BinCrop, Color) => 85,
            (Ten, Sub2 | BinCrop, Mono) => 142,
            (Eight, AllPixel | Roi | Sub10, _) => 75,
            (Eight, Sub2 | BinCrop, Color) => 92,
            (Eight, Sub2 | BinCrop, Mono) => 128,
        };

        let min_frame_length_delta = match (depth, readout, chroma) {
            (Twelve, AllPixel | Roi, _) => 137,
            (Twelve, Sub2 | BinCrop, Color) => 115,
            (Twelve, Sub2 | BinCrop, Mono) => 200,
            (Twelve, Sub10, _) => 115,
            (Ten, AllPixel, _) => 155,
            (Ten, Roi, _) => 186,
            (Ten, Sub2 | BinCrop, Color) => 169,
            (Ten, Sub2 | BinCrop, Mono) => 264,
            (Ten, Sub10, _) => 133,
            (Eight, AllPixel | Roi, _) => 175,
            (Eight, Sub2 | BinCrop, Color) => 181,
            (Eight, Sub2 | BinCrop, Mono) => 242,
            (Eight, Sub10, _) => 153,
        };

        let pixel_rate = match (depth, readout, chroma) {
            (Twelve, AllPixel | Sub10, _) => 251_232_786,
            (Twelve, Roi, _) => 233_704_918,
            (Twelve, Sub2, Color) => 125_616_393,
            (Twelve, Sub2, Mono) => 251_232_787,
            (Twelve, BinCrop, _) => 249_285_246,
            (Ten, AllPixel | Sub10, _) => 307_118_236,
            (Ten, Roi, _) => 377_142_857,
            (Ten, Sub2, Color) => 210_510_989,
            (Ten, Sub2, Mono) => 354_750_000,
            (Ten, BinCrop, _) => 352_000_000,
            (Eight, AllPixel | Sub10, _) => 371_970_874,
            (Eight, Roi, _) => 346_019_417,
            (Eight, Sub2, Color) => 226_704_142,
            (Eight, Sub2, Mono) => 319_275_000,
            (Eight, BinCrop, _) => 316_800_000,
        };

        let link_freq = match (depth, readout, chroma) {
            (Twelve, _, _) => LinkFreq::Mbps1485,
            (Ten, Roi | BinCrop, _) => LinkFreq::Mbps1188,
            (Ten, Sub2, Color) => LinkFreq::Mbps1485,
            (Ten, Sub2, Mono) => LinkFreq::Mbps1188,
            (Ten, AllPixel | Sub10, _) => LinkFreq::Mbps891,
            (Eight, Sub2, Color) => LinkFreq::Mbps1485,
            (Eight, _, _) => LinkFreq::Mbps891,
        };

        ModeConstants {
            hmax,
            min_shutter_length,
            min_frame_length_delta,
            pixel_rate,
            link_freq,
        }
    }

    fn common_table(&self) -> &'static RegSeq {
        MODE_COMMON
    }

    fn data_rate_table(&self, link_freq: LinkFreq) -> Result<&'static RegSeq> {
        match link_freq {
            LinkFreq::Mbps1485 => Ok(DATARATE_1485),
            LinkFreq::Mbps1188 => Ok(DATARATE_1188),
            LinkFreq::Mbps891 => Ok(DATARATE_891),
            other => Err(Error::InvalidParameter(format!(
                "imx900 has no data rate setup for {other:?}"
            ))),
        }
    }

    fn mode_extra_tables(&self, t: ModeTag, chroma: Chromaticity) -> Vec<&'static RegSeq> {
        use BitDepth::*;
        use Chromaticity::*;
        use Readout::*;

        let (readout, depth) = split_tag(t);

        let structure = match (readout, chroma) {
            (AllPixel | Roi, _) => EXTRA_ALLPIXEL_ROI,
            (Sub2 | BinCrop, Color) => EXTRA_SUBG2_COLOR,
            (Sub2 | BinCrop, Mono) => EXTRA_SUB2_BINNING_MONO,
            (Sub10, _) => EXTRA_SUB10,
        };

        let dep = match (depth, readout, chroma) {
            (Twelve, AllPixel | Roi | Sub10, _) => DEP_ALLPIX_ROI_SUB10_1485_12,
            (Twelve, Sub2 | BinCrop, Color) => DEP_SUB2_COLOR_1485_12,
            (Twelve, Sub2 | BinCrop, Mono) => DEP_SUB2_BIN_MONO_1485_12,
            (Ten, AllPixel | Sub10, _) => DEP_ALLPIX_ROI_SUB10_891_10,
            (Ten, Roi, _) => DEP_ALLPIX_ROI_SUB10_1188_10,
            (Ten, Sub2 | BinCrop, Color) => DEP_SUB2_COLOR_1485_10,
            (Ten, Sub2 | BinCrop, Mono) => DEP_SUB2_BIN_MONO_1188_10,
            (Eight, AllPixel | Roi | Sub10, _) => DEP_ALLPIX_ROI_SUB10_891_8,
            (Eight, Sub2 | BinCrop, Color) => DEP_SUB2_COLOR_1485_8,
            (Eight, Sub2 | BinCrop, Mono) => DEP_SUB2_BIN_MONO_891_8,
        };

        vec![structure, dep]
    }

    fn pixel_format_write(
        &self,
        format: PixelFormat,
        chroma: Chromaticity,
    ) -> Result<Option<RegWrite>> {
        let adbit_monosel = match (format.depth, chroma) {
            (BitDepth::Eight, Chromaticity::Color) => 0x21,
            (BitDepth::Eight, Chromaticity::Mono) => 0x25,
            (BitDepth::Ten, Chromaticity::Color) => 0x01,
            (BitDepth::Ten, Chromaticity::Mono) => 0x05,
            (BitDepth::Twelve, Chromaticity::Color) => 0x11,
            (BitDepth::Twelve, Chromaticity::Mono) => 0x15,
        };
        Ok(Some(RegWrite::new(ADBIT_MONOSEL, adbit_monosel)))
    }

    fn test_pattern_count(&self) -> u32 {
        12
    }

    fn test_pattern_writes(&self, pattern: u32) -> Vec<RegWrite> {
        if pattern > 0 {
            // Patterns 4 and 5 select the combined gradient generators.
            let patsel = match pattern {
                4 => 0x0A,
                5 => 0x0B,
                other => other as u8,
            };
            vec![
                RegWrite::new(TPG_CTRL, 0x07),
                RegWrite::new(TPG_PATSEL, patsel),
            ]
        } else {
            vec![RegWrite::new(TPG_CTRL, 0x06)]
        }
    }

    fn trigger_writes(
        &self,
        op: OperationMode,
        _sync: SyncMode,
        shutter: ShutterMode,
        t: ModeTag,
        chroma: Chromaticity,
    ) -> Result<TriggerPlan> {
        use Readout::*;

        let mut corrected_shutter = None;
        let (trigen, vint_base) = match (op, shutter) {
            (OperationMode::Master, ShutterMode::Normal) => (0u8, 2u8),
            (OperationMode::Master, ShutterMode::FastTrigger) => (10, 0),
            (OperationMode::Master, ShutterMode::SequentialTrigger) => {
                tracing::warn!("sequential trigger unsupported in master mode, using normal");
                corrected_shutter = Some(ShutterMode::Normal);
                (0, 2)
            }
            (OperationMode::Slave, ShutterMode::Normal) => (0, 2),
            (OperationMode::Slave, ShutterMode::SequentialTrigger) => (9, 1),
            (OperationMode::Slave, ShutterMode::FastTrigger) => {
                tracing::warn!("fast trigger unsupported in slave mode, using normal");
                corrected_shutter = Some(ShutterMode::Normal);
                (0, 2)
            }
        };

        let (readout, _) = split_tag(t);
        let vint_mode = match (readout, chroma) {
            (AllPixel | Roi, _) => 0x1C,
            (Sub2, Chromaticity::Color) => 0x14,
            (Sub2, Chromaticity::Mono) => 0x18,
            (Sub10, _) => 0x14,
            (BinCrop, _) => 0x18,
        };

        Ok(TriggerPlan {
            writes: vec![
                RegWrite::new(TRIGMODE, trigen),
                RegWrite::new(VINT_EN, vint_base | vint_mode),
            ],
            corrected_shutter,
        })
    }

    fn has_sync_mode(&self) -> bool {
        false
    }

    fn has_shutter_mode(&self) -> bool {
        true
    }

    fn has_flip(&self) -> bool {
        false
    }

    fn chromaticity_probe(&self) -> Option<ChromaticityProbe> {
        Some(ChromaticityProbe {
            register: CHROMACITY,
            settle: Duration::from_millis(15),
        })
    }

    fn stream_start_settle(&self) -> Duration {
        Duration::from_millis(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub2_constants_split_by_chromaticity() {
        let t = tag(Readout::Sub2, BitDepth::Twelve);
        let color = IMX900.constants(t, Chromaticity::Color);
        let mono = IMX900.constants(t, Chromaticity::Mono);

        assert_eq!(color.hmax, 0x262);
        assert_eq!(mono.hmax, 0x131);
        assert_eq!(color.min_shutter_length, 51);
        assert_eq!(mono.min_shutter_length, 102);
        assert_eq!(color.link_freq, LinkFreq::Mbps1485);
        assert_eq!(mono.link_freq, LinkFreq::Mbps1485);
    }

    #[test]
    fn all_pixel_constants_ignore_chromaticity() {
        let t = tag(Readout::AllPixel, BitDepth::Ten);
        assert_eq!(
            IMX900.constants(t, Chromaticity::Color),
            IMX900.constants(t, Chromaticity::Mono)
        );
    }

    #[test]
    fn catalogs_mirror_by_chromaticity() {
        let color = IMX900.catalog(Chromaticity::Color);
        let mono = IMX900.catalog(Chromaticity::Mono);
        assert_eq!(color.default_code(), PixelFormat::RAW12);
        assert_eq!(mono.default_code(), PixelFormat::Y12);
        assert_eq!(
            color.lookup(PixelFormat::RAW12).unwrap().len(),
            mono.lookup(PixelFormat::Y12).unwrap().len()
        );
    }

    #[test]
    fn adbit_monosel_tracks_depth_and_chromaticity() {
        let w = IMX900
            .pixel_format_write(PixelFormat::RAW12, Chromaticity::Color)
            .unwrap()
            .unwrap();
        assert_eq!(w, RegWrite::new(ADBIT_MONOSEL, 0x11));

        let w = IMX900
            .pixel_format_write(PixelFormat::Y8, Chromaticity::Mono)
            .unwrap()
            .unwrap();
        assert_eq!(w, RegWrite::new(ADBIT_MONOSEL, 0x25));
    }

    #[test]
    fn sequential_trigger_falls_back_in_master_mode() {
        let plan = IMX900
            .trigger_writes(
                OperationMode::Master,
                SyncMode::NoSync,
                ShutterMode::SequentialTrigger,
                tag(Readout::AllPixel, BitDepth::Twelve),
                Chromaticity::Color,
            )
            .unwrap();
        assert_eq!(plan.corrected_shutter, Some(ShutterMode::Normal));
        assert_eq!(plan.writes[0], RegWrite::new(TRIGMODE, 0));
        assert_eq!(plan.writes[1], RegWrite::new(VINT_EN, 2 | 0x1C));
    }

    #[test]
    fn slave_sequential_trigger_is_native() {
        let plan = IMX900
            .trigger_writes(
                OperationMode::Slave,
                SyncMode::NoSync,
                ShutterMode::SequentialTrigger,
                tag(Readout::BinCrop, BitDepth::Ten),
                Chromaticity::Mono,
            )
            .unwrap();
        assert!(plan.corrected_shutter.is_none());
        assert_eq!(plan.writes[0], RegWrite::new(TRIGMODE, 9));
        assert_eq!(plan.writes[1], RegWrite::new(VINT_EN, 1 | 0x18));
    }

    #[test]
    fn test_pattern_quirk_values() {
        assert_eq!(
            IMX900.test_pattern_writes(4)[1],
            RegWrite::new(TPG_PATSEL, 0x0A)
        );
        assert_eq!(
            IMX900.test_pattern_writes(5)[1],
            RegWrite::new(TPG_PATSEL, 0x0B)
        );
        assert_eq!(
            IMX900.test_pattern_writes(3)[1],
            RegWrite::new(TPG_PATSEL, 0x03)
        );
        assert_eq!(IMX900.test_pattern_writes(0)[0], RegWrite::new(TPG_CTRL, 0x06));
    }
}
