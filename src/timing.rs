//! Derived timing and rate formulas.
//!
//! All arithmetic is integer with truncation toward zero; the same
//! truncation direction is used in every dependent computation so values
//! survive a round trip through their inverse formulas.
//!
//! Units: line time in nanoseconds, frame length and vblank in lines,
//! frame rates in micro-frames-per-second (µfps).

use crate::error::{Error, Result};
use std::time::Duration;

pub const K_FACTOR: u64 = 1_000;
pub const M_FACTOR: u64 = 1_000_000;
pub const G_FACTOR: u64 = 1_000_000_000;

/// Frame length parity constraint.
///
/// Some sensor variants require an even total line count; the rule is a
/// per-profile property, not a universal constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLengthParity {
    Any,
    Even,
}

impl FrameLengthParity {
    fn apply(self, frame_length: u64) -> u64 {
        match self {
            FrameLengthParity::Any => frame_length,
            FrameLengthParity::Even => {
                if frame_length % 2 == 1 {
                    frame_length + 1
                } else {
                    frame_length
                }
            }
        }
    }
}

/// Nanoseconds per readout line: `hmax * 1e9 / xclk_hz`.
pub fn line_time_ns(hmax: u32, xclk_hz: u64) -> Result<u64> {
    if hmax == 0 || xclk_hz == 0 {
        return Err(Error::InvalidParameter(format!(
            "line time needs nonzero hmax and xclk (hmax={hmax}, xclk={xclk_hz})"
        )));
    }
    Ok(hmax as u64 * G_FACTOR / xclk_hz)
}

/// Total frame length in lines for a requested frame rate.
///
/// `frame_length = 1e6 * 1e9 / (rate_ufps * line_time_ns)`, rounded up to
/// the profile's parity constraint. A zero rate is rejected before the
/// division.
pub fn frame_length_for_rate(
    rate_ufps: u64,
    line_time_ns: u64,
    parity: FrameLengthParity,
) -> Result<u32> {
    if rate_ufps == 0 {
        return Err(Error::InvalidParameter(
            "frame rate must be nonzero".to_string(),
        ));
    }
    if line_time_ns == 0 {
        return Err(Error::InvalidParameter(
            "line time must be nonzero".to_string(),
        ));
    }
    let frame_length = (M_FACTOR * G_FACTOR) / (rate_ufps * line_time_ns);
    Ok(parity.apply(frame_length) as u32)
}

/// Vertical blanking in lines: `frame_length - effective_height`.
///
/// A frame length shorter than the readout height is a contradiction and is
/// rejected rather than clamped to a negative value.
pub fn vblank(frame_length: u32, effective_height: u32) -> Result<u32> {
    frame_length.checked_sub(effective_height).ok_or_else(|| {
        Error::InvalidParameter(format!(
            "frame length {frame_length} below readout height {effective_height}"
        ))
    })
}

/// Maximum reachable frame rate in µfps for a frame length.
pub fn max_framerate_ufps(frame_length: u32, line_time_ns: u64) -> Result<u64> {
    if frame_length == 0 || line_time_ns == 0 {
        return Err(Error::InvalidParameter(
            "frame geometry must be nonzero".to_string(),
        ));
    }
    Ok((G_FACTOR * M_FACTOR) / (frame_length as u64 * line_time_ns))
}

/// Upper exposure bound in lines: `vblank + height - min_shutter_length`.
///
/// Inputs that would drive the bound below the minimum integration time are
/// rejected, never silently clamped.
pub fn exposure_max(
    vblank: u32,
    height: u32,
    min_shutter_length: u32,
    min_integration_lines: u32,
) -> Result<u32> {
    let bound = (vblank as i64 + height as i64) - min_shutter_length as i64;
    if bound < min_integration_lines as i64 {
        return Err(Error::InvalidParameter(format!(
            "exposure bound {bound} below minimum integration {min_integration_lines}"
        )));
    }
    Ok(bound as u32)
}

/// Shutter register value (SHR/SHS) for an exposure in lines.
///
/// The register counts from the frame start, so longer exposures produce
/// smaller values: `shr = vblank + height - exposure`.
pub fn shutter_from_exposure(vblank: u32, height: u32, exposure_lines: u32) -> u32 {
    (vblank + height).saturating_sub(exposure_lines)
}

/// Duration of one full frame readout.
pub fn frame_period(frame_length: u32, line_time_ns: u64) -> Duration {
    Duration::from_nanos(frame_length as u64 * line_time_ns)
}
