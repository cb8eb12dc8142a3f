//! The sensor profile capability.
//!
//! Everything chip-specific lives behind [`SensorProfile`]: mode catalogs,
//! timing constants, register addresses, control quirks, and the per-mode
//! register data. The driver in [`crate::device`] is written once against
//! this trait; one profile per supported sensor variant implements it.

use crate::controls::{ControlRange, OperationMode, ShutterMode, SyncMode};
use crate::error::Result;
use crate::mode::{BitDepth, Chromaticity, CropRect, ModeCatalog, ModeTag, PixelFormat};
use crate::regio::{RegSeq, RegWrite};
use crate::timing::FrameLengthParity;
use std::time::Duration;

/// Link frequency class of a mode, selecting the data-rate register setup.
/// Values are lane rates halved (DDR clocking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkFreq {
    /// Fixed GMSL3 forward-channel rate when a serdes link carries the
    /// stream, regardless of the sensor-side mode class.
    Gmsl1500,
    Mbps1485,
    Mbps1440,
    Mbps1188,
    Mbps891,
    Mbps720,
    Mbps594,
}

impl LinkFreq {
    pub fn hz(self) -> u64 {
        match self {
            LinkFreq::Gmsl1500 => 1_500_000_000 / 2,
            LinkFreq::Mbps1485 => 1_485_000_000 / 2,
            LinkFreq::Mbps1440 => 1_440_000_000 / 2,
            LinkFreq::Mbps1188 => 1_188_000_000 / 2,
            LinkFreq::Mbps891 => 891_000_000 / 2,
            LinkFreq::Mbps720 => 720_000_000 / 2,
            LinkFreq::Mbps594 => 594_000_000 / 2,
        }
    }
}

/// Per-mode constants resolved from the profile's mode table.
///
/// On variants with runtime-detected chromaticity the same mode tag maps to
/// two different constant sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeConstants {
    pub hmax: u32,
    /// Minimum shutter register value; bounds the exposure range from above.
    pub min_shutter_length: u32,
    /// Minimum vblank, and the default blanking applied on mode entry.
    pub min_frame_length_delta: u32,
    pub pixel_rate: u64,
    pub link_freq: LinkFreq,
}

/// Addresses of the registers the generic driver writes directly.
/// Optional entries do not exist on every variant.
#[derive(Debug, Clone, Copy)]
pub struct SensorRegisters {
    pub standby: u16,
    pub xmsta: u16,
    pub reghold: u16,
    /// Frame length, 3 bytes, held write.
    pub vmax: u16,
    /// Line length, 2 bytes, held write.
    pub hmax: u16,
    /// Shutter (SHR0/SHS), 3 bytes, held write.
    pub shutter: u16,
    /// Analog gain, 2 bytes, held write.
    pub gain: u16,
    /// Black level, 2 bytes, held write.
    pub black_level: u16,
    pub hreverse: Option<u16>,
    pub vreverse: Option<u16>,
    /// External sync enable; present on variants with a sync-mode control.
    pub extmode: Option<u16>,
    /// XVS/XHS pin driver; written Hi-Z on power-off where present.
    pub xvs_xhs_drv: Option<u16>,
}

/// Black level range plus the right-shift applied when forming the register
/// value (the register is scaled for the deepest format on some variants).
#[derive(Debug, Clone, Copy)]
pub struct BlackLevelSpec {
    pub range: ControlRange,
    pub shift: u8,
}

/// How to read the chromaticity information register at probe time.
#[derive(Debug, Clone, Copy)]
pub struct ChromaticityProbe {
    pub register: u16,
    /// Settle time between standby-cancel and the read.
    pub settle: Duration,
}

/// Triggering/sync pin writes for the active operation mode, plus the
/// corrected shutter mode when the requested combination is unsupported and
/// falls back to the default.
#[derive(Debug, Default)]
pub struct TriggerPlan {
    pub writes: Vec<RegWrite>,
    pub corrected_shutter: Option<ShutterMode>,
}

pub trait SensorProfile: Send + Sync {
    fn name(&self) -> &'static str;

    /// Input clock feeding the timing formulas.
    fn xclk_hz(&self) -> u64 {
        74_250_000
    }

    fn native_size(&self) -> (u32, u32);

    fn pixel_array(&self) -> CropRect;

    fn registers(&self) -> &'static SensorRegisters;

    fn min_integration_lines(&self) -> u32 {
        1
    }

    fn frame_length_parity(&self) -> FrameLengthParity;

    fn gain_range(&self) -> ControlRange;

    fn black_level(&self, depth: BitDepth) -> BlackLevelSpec;

    /// Mode catalog for the given chromaticity. Variants without runtime
    /// chromaticity ignore the argument.
    fn catalog(&self, chroma: Chromaticity) -> &'static ModeCatalog;

    fn constants(&self, tag: ModeTag, chroma: Chromaticity) -> ModeConstants;

    /// Common register table written before the per-mode tables.
    fn common_table(&self) -> &'static RegSeq;

    /// Data-rate register setup for a link frequency class.
    fn data_rate_table(&self, link_freq: LinkFreq) -> Result<&'static RegSeq>;

    /// Additional per-mode tables written after the format table (readout
    /// structure and rate-dependent tuning on variants that need them).
    fn mode_extra_tables(&self, _tag: ModeTag, _chroma: Chromaticity) -> Vec<&'static RegSeq> {
        Vec::new()
    }

    /// AD conversion / mono select write for the active pixel format, on
    /// variants that require it.
    fn pixel_format_write(
        &self,
        _format: PixelFormat,
        _chroma: Chromaticity,
    ) -> Result<Option<RegWrite>> {
        Ok(None)
    }

    /// Number of selectable test patterns, including "disabled".
    fn test_pattern_count(&self) -> u32;

    fn test_pattern_writes(&self, pattern: u32) -> Vec<RegWrite>;

    /// Triggering/sync pin configuration for the current operation mode and
    /// sync/shutter mode controls.
    fn trigger_writes(
        &self,
        op: OperationMode,
        sync: SyncMode,
        shutter: ShutterMode,
        tag: ModeTag,
        chroma: Chromaticity,
    ) -> Result<TriggerPlan>;

    /// Whether the variant exposes a sync-mode control.
    fn has_sync_mode(&self) -> bool;

    /// Whether the variant exposes a shutter-mode control.
    fn has_shutter_mode(&self) -> bool;

    fn has_flip(&self) -> bool;

    /// Present on variants whose chromaticity is read from hardware at
    /// probe time.
    fn chromaticity_probe(&self) -> Option<ChromaticityProbe> {
        None
    }

    fn default_chromaticity(&self) -> Chromaticity {
        Chromaticity::Color
    }

    /// Settle delay after writing the streaming-enable register.
    fn stream_start_settle(&self) -> Duration;

    /// Settle delay after releasing reset on power-on.
    fn power_on_settle(&self) -> Duration {
        Duration::from_millis(30)
    }
}
