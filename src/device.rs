//! Generic sensor device driver.
//!
//! One driver, parameterized over a [`SensorProfile`] and a register
//! transport, covers every supported sensor variant. All shared state sits
//! behind a single exclusive lock per device instance: format/mode changes,
//! control updates, stream transitions, and the power hooks invoked by the
//! host runtime all serialize through it. Register I/O is synchronous and
//! may block while the lock is held; the host framework already serializes
//! calls into the driver per device, so nothing else contends.

use crate::controls::{
    Control, ControlId, ControlRange, ControlSet, OperationMode, ShutterMode, SyncMode,
    REPLAY_ORDER,
};
use crate::error::{Error, Result};
use crate::link::LinkController;
use crate::mode::{Chromaticity, CropRect, Mode, ModeCatalog, PixelFormat};
use crate::profile::{LinkFreq, ModeConstants, SensorProfile};
use crate::regio::{read_reg, write_held, write_reg, write_table, RegisterIo};
use crate::timing;
use std::sync::Mutex;
use std::thread;

const SENSOR_STREAMING: u32 = 0x00;
const SENSOR_STANDBY: u32 = 0x01;
const XMSTA_START: u32 = 0x00;
const XMSTA_STOP: u32 = 0x01;
const XVS_XHS_HIZ: u32 = 0xF;

/// Reset and master-pin control, owned by the platform glue.
pub trait PowerControl: Send {
    /// Drive the sensor reset pin.
    fn set_reset(&mut self, asserted: bool);

    /// Drive the XMASTER pin selecting master/slave operation.
    fn set_master_pin(&mut self, level: bool);
}

/// Outcome of format negotiation: the nearest catalog mode's actual
/// geometry, never the raw request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub code: PixelFormat,
    pub width: u32,
    pub height: u32,
}

struct DeviceState<IO> {
    io: IO,
    power: Box<dyn PowerControl>,
    link: Option<Box<dyn LinkController>>,
    chroma: Chromaticity,
    mode: &'static Mode,
    format: PixelFormat,
    consts: ModeConstants,
    line_time_ns: u64,
    frame_length: u32,
    controls: ControlSet,
    streaming: bool,
    powered: bool,
}

pub struct SensorDevice<IO: RegisterIo> {
    profile: &'static dyn SensorProfile,
    inner: Mutex<DeviceState<IO>>,
}

impl<IO: RegisterIo> SensorDevice<IO> {
    /// Bring up a sensor instance: register and configure the serdes link
    /// when present, power the sensor, verify communication, detect
    /// chromaticity where the variant supports it, and compute the initial
    /// mode limits.
    pub fn probe(
        profile: &'static dyn SensorProfile,
        io: IO,
        power: Box<dyn PowerControl>,
        link: Option<Box<dyn LinkController>>,
    ) -> Result<Self> {
        let chroma = profile.default_chromaticity();
        let catalog = profile.catalog(chroma);
        let format = catalog.default_code();
        let mode = &catalog.lookup(format)?[0];

        let mut state = DeviceState {
            io,
            power,
            link,
            chroma,
            mode,
            format,
            consts: profile.constants(mode.tag, chroma),
            line_time_ns: 0,
            frame_length: 0,
            controls: ControlSet::new(),
            streaming: false,
            powered: false,
        };

        if let Some(link) = state.link.as_mut() {
            link.register()?;
            link.setup_link()?;
        }

        power_on_locked(profile, &mut state)?;

        communication_verify(profile, &mut state)?;

        detect_chromaticity(profile, &mut state)?;

        // Chromaticity selects the catalog on variants that detect it.
        let catalog = profile.catalog(state.chroma);
        state.format = catalog.default_code();
        state.mode = &catalog.lookup(state.format)?[0];

        init_controls(profile, &mut state);
        set_limits(profile, &mut state)?;

        Ok(Self {
            profile,
            inner: Mutex::new(state),
        })
    }

    pub fn name(&self) -> &'static str {
        self.profile.name()
    }

    /// Format codes in catalog declaration order.
    pub fn enumerate_codes(&self) -> Vec<PixelFormat> {
        let state = self.inner.lock().unwrap();
        self.profile.catalog(state.chroma).codes().collect()
    }

    /// Supported frame sizes for a format code.
    pub fn enumerate_sizes(&self, code: PixelFormat) -> Result<Vec<(u32, u32)>> {
        let state = self.inner.lock().unwrap();
        let modes = self.profile.catalog(state.chroma).lookup(code)?;
        Ok(modes.iter().map(|m| (m.width, m.height)).collect())
    }

    /// Current negotiated format.
    pub fn format(&self) -> NegotiatedFormat {
        let state = self.inner.lock().unwrap();
        NegotiatedFormat {
            code: state.format,
            width: state.mode.width,
            height: state.mode.height,
        }
    }

    /// Negotiate a format. An unrecognized code falls back to the catalog's
    /// default code; the returned geometry is the nearest supported mode's.
    /// Mode-dependent control ranges are recomputed when the mode changes.
    pub fn set_format(
        &self,
        code: PixelFormat,
        width: u32,
        height: u32,
    ) -> Result<NegotiatedFormat> {
        let mut state = self.inner.lock().unwrap();
        if state.streaming {
            return Err(Error::InvalidParameter(
                "format change while streaming".to_string(),
            ));
        }

        let catalog = self.profile.catalog(state.chroma);
        let code = catalog.resolve_code(code);
        let modes = catalog.lookup(code)?;
        let mode = ModeCatalog::nearest(modes, width, height);

        if mode.tag != state.mode.tag || code != state.format {
            state.mode = mode;
            state.format = code;
            set_limits(self.profile, &mut state)?;
        }

        Ok(NegotiatedFormat {
            code,
            width: mode.width,
            height: mode.height,
        })
    }

    /// Snapshot of one control.
    pub fn control(&self, id: ControlId) -> Result<Control> {
        let state = self.inner.lock().unwrap();
        state
            .controls
            .get(id)
            .copied()
            .ok_or(Error::UnknownControl(id))
    }

    /// Set a control value.
    ///
    /// Dependent ranges update first (frame rate pins vblank, vblank bounds
    /// exposure), then the value reaches hardware only while the device is
    /// powered; otherwise the new state is replayed on the next stream
    /// start and the call still succeeds.
    pub fn set_control(&self, id: ControlId, value: i64) -> Result<()> {
        let mut state = self.inner.lock().unwrap();

        let ctrl = *state.controls.get(id).ok_or(Error::UnknownControl(id))?;
        if ctrl.read_only {
            return Err(Error::InvalidParameter(format!(
                "control {id:?} is read-only"
            )));
        }
        if ctrl.grab_on_stream && state.streaming {
            return Err(Error::Busy(id));
        }
        if !ctrl.range.contains(value) {
            return Err(Error::InvalidParameter(format!(
                "control {id:?} value {value} outside {}..={}",
                ctrl.range.min, ctrl.range.max
            )));
        }

        state.controls.set_value(id, value);

        match id {
            ControlId::FrameRate => {
                update_frame_rate(self.profile, &mut state)?;
                adjust_exposure_range(self.profile, &mut state)?;
            }
            ControlId::Vblank => {
                adjust_exposure_range(self.profile, &mut state)?;
            }
            _ => {}
        }

        if !state.powered {
            return Ok(());
        }

        apply_control_hw(self.profile, &mut state, id)
    }

    pub fn is_streaming(&self) -> bool {
        self.inner.lock().unwrap().streaming
    }

    /// Enter streaming. A no-op success when already streaming. Any failure
    /// leaves the state machine in standby; hardware may be mid-sequence
    /// (no rollback) and the caller decides whether to retry or power off.
    pub fn start_streaming(&self) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        if state.streaming {
            return Ok(());
        }

        power_on_locked(self.profile, &mut state)?;
        start_locked(self.profile, &mut state)?;
        state.streaming = true;
        Ok(())
    }

    /// Leave streaming. A no-op success when already stopped. Teardown is
    /// best-effort: register failures are logged and the device is still
    /// marked stopped.
    pub fn stop_streaming(&self) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        if !state.streaming {
            return Ok(());
        }

        stop_locked(self.profile, &mut state);
        state.streaming = false;
        Ok(())
    }

    /// Host runtime power-on hook.
    pub fn power_on(&self) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        power_on_locked(self.profile, &mut state)
    }

    /// Host runtime power-off hook.
    pub fn power_off(&self) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        power_off_locked(self.profile, &mut state);
        Ok(())
    }

    /// Stop streaming synchronously ahead of system suspend. The streaming
    /// intent is retained for [`SensorDevice::resume`].
    pub fn suspend(&self) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        if state.streaming {
            stop_locked(self.profile, &mut state);
        }
        Ok(())
    }

    /// Re-run the full start sequence after resume. On failure the device
    /// is forced back to standby and the streaming intent cleared; there is
    /// no retry.
    pub fn resume(&self) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        if !state.streaming {
            return Ok(());
        }
        if let Err(e) = start_locked(self.profile, &mut state) {
            stop_locked(self.profile, &mut state);
            state.streaming = false;
            return Err(e);
        }
        Ok(())
    }

    /// Device removal: tear the serdes link down (unregister before reset,
    /// so the context outlives its registrations) and power off.
    pub fn teardown(&self) {
        let mut state = self.inner.lock().unwrap();
        if let Some(link) = state.link.as_mut() {
            if let Err(e) = link.unregister() {
                tracing::warn!("link unregister failed: {e}");
            }
            if let Err(e) = link.reset_link() {
                tracing::warn!("link reset failed: {e}");
            }
        }
        power_off_locked(self.profile, &mut state);
    }

    pub fn native_size(&self) -> (u32, u32) {
        self.profile.native_size()
    }

    pub fn pixel_array_bounds(&self) -> CropRect {
        self.profile.pixel_array()
    }

    /// Active mode's crop rectangle.
    pub fn crop(&self) -> CropRect {
        self.inner.lock().unwrap().mode.crop
    }

    pub fn chromaticity(&self) -> Chromaticity {
        self.inner.lock().unwrap().chroma
    }

    /// Current derived timing: (line time in ns, frame length in lines).
    pub fn derived_timing(&self) -> (u64, u32) {
        let state = self.inner.lock().unwrap();
        (state.line_time_ns, state.frame_length)
    }
}

fn communication_verify<IO: RegisterIo>(
    profile: &dyn SensorProfile,
    state: &mut DeviceState<IO>,
) -> Result<()> {
    let regs = profile.registers();
    read_reg(&mut state.io, regs.vmax, 3)?;
    tracing::info!("detected {} sensor", profile.name());
    Ok(())
}

/// Read the chromaticity information register on variants that have one.
/// The sensor must leave standby briefly for the register to be valid.
fn detect_chromaticity<IO: RegisterIo>(
    profile: &dyn SensorProfile,
    state: &mut DeviceState<IO>,
) -> Result<()> {
    let Some(probe) = profile.chromaticity_probe() else {
        return Ok(());
    };
    let regs = profile.registers();

    write_reg(&mut state.io, regs.standby, 1, SENSOR_STREAMING)?;
    thread::sleep(probe.settle);
    let raw = read_reg(&mut state.io, probe.register, 1)?;
    write_reg(&mut state.io, regs.standby, 1, SENSOR_STANDBY)?;

    state.chroma = if (raw >> 7) & 1 == 1 {
        Chromaticity::Mono
    } else {
        Chromaticity::Color
    };
    tracing::debug!("sensor chromaticity: {:?}", state.chroma);
    Ok(())
}

fn init_controls<IO>(profile: &dyn SensorProfile, state: &mut DeviceState<IO>) {
    let controls = &mut state.controls;

    controls.insert(
        ControlId::PixelRate,
        Control::read_only(ControlRange::fixed(0)),
    );
    controls.insert(
        ControlId::LinkFrequency,
        Control::read_only(ControlRange::fixed(0)),
    );
    controls.insert(ControlId::Vblank, Control::new(ControlRange::fixed(0)));
    controls.insert(ControlId::Hblank, Control::read_only(ControlRange::fixed(0)));
    controls.insert(
        ControlId::Exposure,
        Control::new(ControlRange::new(
            profile.min_integration_lines() as i64,
            0xFF,
            1,
            0xFF,
        )),
    );
    controls.insert(
        ControlId::FrameRate,
        Control::new(ControlRange::new(1, 0xFFFF, 1, 0xFFFF)),
    );
    controls.insert(
        ControlId::OperationMode,
        Control::grabbed_on_stream(ControlRange::new(0, 1, 1, OperationMode::Master as i64)),
    );
    if profile.has_sync_mode() {
        controls.insert(
            ControlId::SyncMode,
            Control::grabbed_on_stream(ControlRange::new(0, 2, 1, SyncMode::NoSync as i64)),
        );
    }
    if profile.has_shutter_mode() {
        controls.insert(
            ControlId::ShutterMode,
            Control::grabbed_on_stream(ControlRange::new(0, 2, 1, ShutterMode::Normal as i64)),
        );
    }
    controls.insert(
        ControlId::BlackLevel,
        Control::new(ControlRange::new(0, 0xFF, 1, 0xFF)),
    );
    controls.insert(ControlId::Gain, Control::new(profile.gain_range()));
    if profile.has_flip() {
        controls.insert(
            ControlId::HFlip,
            Control::grabbed_on_stream(ControlRange::new(0, 1, 1, 0)),
        );
        controls.insert(
            ControlId::VFlip,
            Control::grabbed_on_stream(ControlRange::new(0, 1, 1, 0)),
        );
    }
    controls.insert(
        ControlId::TestPattern,
        Control::new(ControlRange::new(
            0,
            profile.test_pattern_count() as i64 - 1,
            1,
            0,
        )),
    );
}

/// Recompute every mode-dependent limit after a mode or format change, then
/// cascade: frame rate resets to the mode's maximum, which pins vblank and
/// bounds exposure.
fn set_limits<IO: RegisterIo>(
    profile: &dyn SensorProfile,
    state: &mut DeviceState<IO>,
) -> Result<()> {
    let consts = profile.constants(state.mode.tag, state.chroma);
    state.consts = consts;

    tracing::debug!(
        "mode {}x{}: hmax 0x{:X}",
        state.mode.width,
        state.mode.height,
        consts.hmax
    );

    state.line_time_ns = timing::line_time_ns(consts.hmax, profile.xclk_hz())?;

    let vblank = consts.min_frame_length_delta;
    state.controls.pin(ControlId::Vblank, vblank as i64);

    state
        .controls
        .modify_range(ControlId::PixelRate, ControlRange::fixed(consts.pixel_rate as i64));

    let link_freq = if state.link.is_some() {
        LinkFreq::Gmsl1500
    } else {
        consts.link_freq
    };
    state
        .controls
        .modify_range(ControlId::LinkFrequency, ControlRange::fixed(link_freq.hz() as i64));

    state.frame_length = state.mode.effective_height() + vblank;

    let max_rate = timing::max_framerate_ufps(state.frame_length, state.line_time_ns)?;
    state.controls.modify_range(
        ControlId::FrameRate,
        ControlRange::new(
            state.mode.min_framerate_ufps as i64,
            max_rate as i64,
            1,
            max_rate as i64,
        ),
    );
    tracing::debug!(
        "line time {} ns, frame length {}, max framerate {} ufps",
        state.line_time_ns,
        state.frame_length,
        max_rate
    );

    let black = profile.black_level(state.format.depth);
    state.controls.reset_to_default(ControlId::BlackLevel, black.range);

    // Select the maximum rate and cascade the dependent ranges.
    state.controls.set_value(ControlId::FrameRate, max_rate as i64);
    update_frame_rate(profile, state)?;
    adjust_exposure_range(profile, state)?;

    Ok(())
}

/// Derive the frame length from the requested frame rate and pin the vblank
/// control to the single resulting value. Vblank is not independently
/// adjustable on these sensors.
fn update_frame_rate<IO>(profile: &dyn SensorProfile, state: &mut DeviceState<IO>) -> Result<()> {
    let rate = state.controls.value(ControlId::FrameRate) as u64;
    let frame_length =
        timing::frame_length_for_rate(rate, state.line_time_ns, profile.frame_length_parity())?;
    state.frame_length = frame_length;

    let vblank = timing::vblank(frame_length, state.mode.effective_height())?;
    state.controls.pin(ControlId::Vblank, vblank as i64);
    Ok(())
}

/// Recompute the exposure range from current blanking; the current value is
/// clamped when it exceeds the new maximum.
fn adjust_exposure_range<IO>(
    profile: &dyn SensorProfile,
    state: &mut DeviceState<IO>,
) -> Result<()> {
    let vblank = state.controls.value(ControlId::Vblank) as u32;
    let max = timing::exposure_max(
        vblank,
        state.mode.height,
        state.consts.min_shutter_length,
        profile.min_integration_lines(),
    )?;
    state.controls.modify_range(
        ControlId::Exposure,
        ControlRange::new(profile.min_integration_lines() as i64, max as i64, 1, max as i64),
    );
    Ok(())
}

/// Write one control's current value to hardware. Controls without a direct
/// register (vblank, shutter mode, the read-only rates) are no-ops here;
/// their effect lands through other registers.
fn apply_control_hw<IO: RegisterIo>(
    profile: &dyn SensorProfile,
    state: &mut DeviceState<IO>,
    id: ControlId,
) -> Result<()> {
    let regs = profile.registers();
    let value = state.controls.value(id);

    match id {
        ControlId::Gain => write_held(&mut state.io, regs.reghold, regs.gain, 2, value as u32),
        ControlId::Exposure => {
            let vblank = state.controls.value(ControlId::Vblank) as u32;
            let shutter =
                timing::shutter_from_exposure(vblank, state.mode.height, value as u32);
            write_held(&mut state.io, regs.reghold, regs.shutter, 3, shutter)
        }
        ControlId::FrameRate => write_held(
            &mut state.io,
            regs.reghold,
            regs.vmax,
            3,
            state.frame_length,
        ),
        ControlId::BlackLevel => {
            let spec = profile.black_level(state.format.depth);
            let reg_value = (value as u32) >> spec.shift;
            write_held(&mut state.io, regs.reghold, regs.black_level, 2, reg_value)
        }
        ControlId::HFlip => match regs.hreverse {
            Some(addr) => write_reg(&mut state.io, addr, 1, value as u32),
            None => Ok(()),
        },
        ControlId::VFlip => match regs.vreverse {
            Some(addr) => write_reg(&mut state.io, addr, 1, value as u32),
            None => Ok(()),
        },
        ControlId::TestPattern => {
            for w in profile.test_pattern_writes(value as u32) {
                write_reg(&mut state.io, w.addr, 1, w.val as u32)?;
            }
            Ok(())
        }
        ControlId::OperationMode => {
            state.power.set_master_pin(value == OperationMode::Slave as i64);
            Ok(())
        }
        ControlId::SyncMode => match regs.extmode {
            Some(addr) => {
                let extmode = (value == SyncMode::External as i64) as u32;
                write_reg(&mut state.io, addr, 1, extmode)
            }
            None => Ok(()),
        },
        ControlId::ShutterMode
        | ControlId::Vblank
        | ControlId::Hblank
        | ControlId::PixelRate
        | ControlId::LinkFrequency => Ok(()),
    }
}

fn current_op_mode<IO>(state: &DeviceState<IO>) -> OperationMode {
    OperationMode::from_value(state.controls.value(ControlId::OperationMode))
        .unwrap_or(OperationMode::Master)
}

fn current_sync_mode<IO>(state: &DeviceState<IO>) -> SyncMode {
    if state.controls.contains(ControlId::SyncMode) {
        SyncMode::from_value(state.controls.value(ControlId::SyncMode)).unwrap_or(SyncMode::NoSync)
    } else {
        SyncMode::NoSync
    }
}

fn current_shutter_mode<IO>(state: &DeviceState<IO>) -> ShutterMode {
    if state.controls.contains(ControlId::ShutterMode) {
        ShutterMode::from_value(state.controls.value(ControlId::ShutterMode))
            .unwrap_or(ShutterMode::Normal)
    } else {
        ShutterMode::Normal
    }
}

/// Apply the active mode to hardware: common, mode, and format tables in
/// that fixed order (later tables may overwrite earlier fields), then the
/// derived timing registers and the triggering pin setup.
fn apply_mode_to_hw<IO: RegisterIo>(
    profile: &dyn SensorProfile,
    state: &mut DeviceState<IO>,
) -> Result<()> {
    let regs = profile.registers();

    write_table(&mut state.io, profile.common_table())?;
    write_table(&mut state.io, state.mode.mode_table)?;
    write_table(&mut state.io, state.mode.format_table)?;

    write_held(&mut state.io, regs.reghold, regs.hmax, 2, state.consts.hmax)?;

    let data_rate = profile.data_rate_table(state.consts.link_freq)?;
    write_table(&mut state.io, data_rate)?;

    for table in profile.mode_extra_tables(state.mode.tag, state.chroma) {
        write_table(&mut state.io, table)?;
    }

    if let Some(w) = profile.pixel_format_write(state.format, state.chroma)? {
        write_reg(&mut state.io, w.addr, 1, w.val as u32)?;
    }

    let plan = profile.trigger_writes(
        current_op_mode(state),
        current_sync_mode(state),
        current_shutter_mode(state),
        state.mode.tag,
        state.chroma,
    )?;
    if let Some(corrected) = plan.corrected_shutter {
        state
            .controls
            .set_value(ControlId::ShutterMode, corrected as i64);
    }
    for w in &plan.writes {
        write_reg(&mut state.io, w.addr, 1, w.val as u32)?;
    }

    Ok(())
}

/// Replay the full control set to hardware so changes made while powered
/// down take effect.
fn replay_controls<IO: RegisterIo>(
    profile: &dyn SensorProfile,
    state: &mut DeviceState<IO>,
) -> Result<()> {
    for &id in REPLAY_ORDER {
        if state.controls.contains(id) {
            apply_control_hw(profile, state, id)?;
        }
    }
    Ok(())
}

fn start_locked<IO: RegisterIo>(
    profile: &dyn SensorProfile,
    state: &mut DeviceState<IO>,
) -> Result<()> {
    let regs = profile.registers();

    // Serdes first: serializer stream setup, deserializer stream setup,
    // deserializer start. Abort before touching the sensor on any failure.
    if let Some(link) = state.link.as_mut() {
        link.setup_streaming(state.format)?;
        link.start_streaming()?;
    }

    apply_mode_to_hw(profile, state)?;

    replay_controls(profile, state)?;

    write_reg(&mut state.io, regs.standby, 1, SENSOR_STREAMING)?;
    thread::sleep(profile.stream_start_settle());

    let xmsta = match current_op_mode(state) {
        OperationMode::Master => XMSTA_START,
        OperationMode::Slave => XMSTA_STOP,
    };
    write_reg(&mut state.io, regs.xmsta, 1, xmsta)?;

    tracing::info!("{} streaming started", profile.name());
    Ok(())
}

/// Best-effort stream teardown, then wait one frame period so in-flight
/// readout completes before the caller may power down.
fn stop_locked<IO: RegisterIo>(profile: &dyn SensorProfile, state: &mut DeviceState<IO>) {
    let regs = profile.registers();

    if let Some(link) = state.link.as_mut() {
        link.stop_streaming();
    }

    if let Err(e) = write_reg(&mut state.io, regs.xmsta, 1, XMSTA_STOP) {
        tracing::warn!("failed to deassert master start: {e}");
    }
    if let Err(e) = write_reg(&mut state.io, regs.standby, 1, SENSOR_STANDBY) {
        tracing::warn!("failed to enter standby: {e}");
    }

    thread::sleep(timing::frame_period(state.frame_length, state.line_time_ns));
    tracing::info!("{} streaming stopped", profile.name());
}

fn power_on_locked<IO: RegisterIo>(
    profile: &dyn SensorProfile,
    state: &mut DeviceState<IO>,
) -> Result<()> {
    if state.powered {
        return Ok(());
    }

    match state.link.as_mut() {
        Some(link) => link.power_on()?,
        None => {
            state.power.set_reset(false);
            thread::sleep(profile.power_on_settle());
        }
    }

    state.powered = true;
    Ok(())
}

fn power_off_locked<IO: RegisterIo>(profile: &dyn SensorProfile, state: &mut DeviceState<IO>) {
    if !state.powered {
        return;
    }
    let regs = profile.registers();

    if let Some(addr) = regs.xvs_xhs_drv {
        if let Err(e) = write_reg(&mut state.io, addr, 1, XVS_XHS_HIZ) {
            tracing::warn!("failed to set XVS/XHS pins to Hi-Z: {e}");
        }
    }

    match state.link.as_mut() {
        Some(link) => link.power_off(),
        None => state.power.set_reset(true),
    }

    state.powered = false;
}
