//! MAX96792 GMSL deserializer register driver.
//!
//! The deserializer terminates up to two forward-channel links and bridges
//! them onto local CSI-2 output ports. Stream teardown and power-off are
//! best-effort by contract; the sensor driver logs their failures and keeps
//! shutting down.

use super::{BusId, CsiLaneMode, LinkContext, LinkError, SerdesLink};
use crate::error::TransportError;
use crate::regio::RegisterIo;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const CTRL0: u16 = 0x0010;
const PWDN_CTRL: u16 = 0x0006;
const VIDEO_PIPE_EN: u16 = 0x0160;
const VIDEO_PIPE_SEL: u16 = 0x0161;
const MIPI_TX_CTRL: u16 = 0x0313;
const BACKTOP_EN: u16 = 0x0400;
const MIPI_PHY_CFG: u16 = 0x08A0;
const MIPI_PHY_LANE_MAP: u16 = 0x08A3;
const MIPI_TX_LANE_CNT: u16 = 0x090A;
const PIPE_VC_REMAP: u16 = 0x090B;

const RESET_ALL: u8 = 0x80;

const WRITE_RETRY_LIMIT: u32 = 5;
const WRITE_RETRY_DELAY: Duration = Duration::from_millis(1);
const LINK_SETTLE: Duration = Duration::from_millis(100);

/// Registered sensor links; the part terminates two forward channels.
const MAX_REGISTERED: usize = 2;

pub struct Max96792<IO: RegisterIo> {
    io: IO,
    bus: BusId,
    contexts: Vec<Arc<LinkContext>>,
    streaming: bool,
}

impl<IO: RegisterIo> Max96792<IO> {
    pub fn new(io: IO, bus: BusId) -> Self {
        Self {
            io,
            bus,
            contexts: Vec::new(),
            streaming: false,
        }
    }

    pub fn bus(&self) -> BusId {
        self.bus
    }

    fn write_reg(&mut self, addr: u16, val: u8) -> Result<(), LinkError> {
        let mut last = TransportError::Nack;
        for attempt in 0..WRITE_RETRY_LIMIT {
            match self.io.write(addr, 1, val as u32) {
                Ok(()) => {
                    if attempt > 0 {
                        tracing::warn!(
                            "deserializer write to 0x{addr:04X} passed after {attempt} retries"
                        );
                    }
                    return Ok(());
                }
                Err(e) => {
                    last = e;
                    thread::sleep(WRITE_RETRY_DELAY);
                }
            }
        }
        tracing::error!("deserializer write to 0x{addr:04X} failed: {last}");
        Err(LinkError::Transport { addr, source: last })
    }

    fn primary_ctx(&self) -> Result<Arc<LinkContext>, LinkError> {
        self.contexts.first().cloned().ok_or(LinkError::NotPaired)
    }

    /// Register a sensor's link context.
    pub fn register(&mut self, ctx: Arc<LinkContext>) -> Result<(), LinkError> {
        if self.contexts.len() >= MAX_REGISTERED {
            return Err(LinkError::AlreadyPaired);
        }
        if self
            .contexts
            .iter()
            .any(|c| c.serdes_link() == ctx.serdes_link())
        {
            return Err(LinkError::AlreadyPaired);
        }
        self.contexts.push(ctx);
        Ok(())
    }

    pub fn unregister(&mut self) -> Result<(), LinkError> {
        if self.contexts.pop().is_none() {
            return Err(LinkError::NotPaired);
        }
        Ok(())
    }

    /// Forward-channel rate setup for GMSL3 operation.
    pub fn gmsl3_setup(&mut self) -> Result<(), LinkError> {
        self.write_reg(0x0577, 0x6F)?;
        self.write_reg(0x14D1, 0x19)?;
        self.write_reg(0x0006, 0x11)?;
        self.write_reg(0x0028, 0x62)?;
        thread::sleep(LINK_SETTLE);

        self.write_reg(CTRL0, 0x31)?;
        thread::sleep(LINK_SETTLE);
        Ok(())
    }

    /// Select and one-shot reset the forward-channel link carrying the
    /// registered sensor.
    pub fn setup_link(&mut self) -> Result<(), LinkError> {
        let ctx = self.primary_ctx()?;
        let link_cfg = match ctx.serdes_link() {
            SerdesLink::A => 0x21,
            SerdesLink::B => 0x22,
        };
        self.write_reg(CTRL0, link_cfg)?;
        thread::sleep(LINK_SETTLE);
        tracing::debug!("deserializer link {:?} selected", ctx.serdes_link());
        Ok(())
    }

    /// Control-channel and CSI output setup for the registered topology.
    pub fn setup_control(&mut self) -> Result<(), LinkError> {
        let ctx = self.primary_ctx()?;

        let phy_cfg = match ctx.csi_mode() {
            CsiLaneMode::OneX4 => 0x04,
            CsiLaneMode::TwoX4 => 0x44,
            CsiLaneMode::TwoX2 => 0x22,
        };
        self.write_reg(MIPI_PHY_CFG, phy_cfg)?;
        self.write_reg(MIPI_PHY_LANE_MAP, 0x4E)?;
        self.write_reg(MIPI_TX_LANE_CNT, ((ctx.num_lanes() - 1) << 6) | 0x10)?;

        // Map the sensor's source virtual channel onto the output channel.
        let remap = (ctx.stream_vc() << 4) | (ctx.dst_vc() & 0x0F);
        self.write_reg(PIPE_VC_REMAP, remap)?;

        self.write_reg(BACKTOP_EN, 0x01)?;
        tracing::debug!("deserializer control setup done");
        Ok(())
    }

    /// Route the video pipe for the registered streams.
    pub fn setup_streaming(&mut self) -> Result<(), LinkError> {
        let ctx = self.primary_ctx()?;

        let pipe_sel = match ctx.serdes_link() {
            SerdesLink::A => 0x00,
            SerdesLink::B => 0x02,
        };
        self.write_reg(VIDEO_PIPE_SEL, pipe_sel)?;
        self.write_reg(VIDEO_PIPE_EN, 0x01)?;
        Ok(())
    }

    /// Open the CSI output.
    pub fn start_streaming(&mut self) -> Result<(), LinkError> {
        self.write_reg(MIPI_TX_CTRL, 0x02)?;
        self.streaming = true;
        Ok(())
    }

    /// Close the CSI output.
    pub fn stop_streaming(&mut self) -> Result<(), LinkError> {
        self.streaming = false;
        self.write_reg(MIPI_TX_CTRL, 0x00)
    }

    /// Wake the device and enable the control-channel backpath.
    pub fn power_on(&mut self) -> Result<(), LinkError> {
        self.write_reg(PWDN_CTRL, 0x01)?;
        thread::sleep(LINK_SETTLE);
        Ok(())
    }

    /// Best-effort power-down.
    pub fn power_off(&mut self) {
        if let Err(e) = self.write_reg(PWDN_CTRL, 0x00) {
            tracing::warn!("deserializer power-down write failed: {e}");
        }
    }

    /// Full device reset.
    pub fn reset_control(&mut self) -> Result<(), LinkError> {
        self.streaming = false;
        self.write_reg(CTRL0, RESET_ALL)?;
        thread::sleep(LINK_SETTLE);
        Ok(())
    }
}
