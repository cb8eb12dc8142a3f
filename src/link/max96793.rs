//! MAX96793 GMSL serializer register driver.

use super::{BusId, LinkContext, LinkError, SerdesLink, SerdesRegistry};
use crate::error::TransportError;
use crate::mode::BitDepth;
use crate::regio::RegisterIo;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const DEV_ADDR: u16 = 0x0000;
const ENABLE_PORTBZ: u16 = 0x0002;
const CTRL0: u16 = 0x0010;
const I2C_SPEED: u16 = 0x0040;
const PIPE_Z_VC: u16 = 0x005B;
const VID_TX_Z: u16 = 0x0110;
const BPP_OVERRIDE: u16 = 0x0111;
const TX_STREAM_ID: u16 = 0x0112;
const GPIO0_A: u16 = 0x02BE;
const GPIO0_C: u16 = 0x02C0;
const GPIO6_A: u16 = 0x02D0;
const GPIO8_A: u16 = 0x02D6;
const CSI_PORT_SEL: u16 = 0x0308;
const START_PORTBZ: u16 = 0x0311;
const PIPE_EN_Z: u16 = 0x0312;
const PIPE_Z_DT: u16 = 0x031E;
const MIPI_RX0: u16 = 0x0330;
const MIPI_RX1: u16 = 0x0331;
const MIPI_RX2: u16 = 0x0332;
const MIPI_RX3: u16 = 0x0333;
const TUN_EN: u16 = 0x0383;

const CSI_1X4_LANE_MAP1: u8 = 0xE0;
const CSI_1X4_LANE_MAP2: u8 = 0x04;
const RESET_ALL: u8 = 0x80;

const GPIO_RX_EN: u8 = 0x04;

/// The serdes control channel tolerates transient NAKs while the forward
/// channel locks; writes retry a bounded number of times before failing.
const WRITE_RETRY_LIMIT: u32 = 5;
const WRITE_RETRY_DELAY: Duration = Duration::from_millis(1);

const LINK_SETTLE: Duration = Duration::from_millis(100);

pub struct Max96793<IO: RegisterIo> {
    io: IO,
    registry: Arc<SerdesRegistry>,
    bus: BusId,
    ctx: Option<Arc<LinkContext>>,
    stream_setup_done: bool,
}

impl<IO: RegisterIo> Max96793<IO> {
    pub fn new(io: IO, registry: Arc<SerdesRegistry>, bus: BusId) -> Self {
        Self {
            io,
            registry,
            bus,
            ctx: None,
            stream_setup_done: false,
        }
    }

    /// Construct the bus's primary serializer, recording its power-on
    /// default address for shared-bus address arbitration.
    pub fn new_primary(
        io: IO,
        registry: Arc<SerdesRegistry>,
        bus: BusId,
        default_addr: u16,
    ) -> Result<Self, LinkError> {
        registry.claim_primary(bus, default_addr)?;
        Ok(Self::new(io, registry, bus))
    }

    fn write_reg(&mut self, addr: u16, val: u8) -> Result<(), LinkError> {
        let mut last = TransportError::Nack;
        for attempt in 0..WRITE_RETRY_LIMIT {
            match self.io.write(addr, 1, val as u32) {
                Ok(()) => {
                    if attempt > 0 {
                        tracing::warn!(
                            "serializer write to 0x{addr:04X} passed after {attempt} retries"
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
        tracing::error!("serializer write to 0x{addr:04X} failed: {last}");
        Err(LinkError::Transport { addr, source: last })
    }

    fn ctx(&self) -> Result<Arc<LinkContext>, LinkError> {
        self.ctx.clone().ok_or(LinkError::NotPaired)
    }

    /// Attach the sensor's link context. One sensor per serializer.
    pub fn pair(&mut self, ctx: Arc<LinkContext>) -> Result<(), LinkError> {
        if self.ctx.is_some() {
            return Err(LinkError::AlreadyPaired);
        }
        self.stream_setup_done = false;
        self.ctx = Some(ctx);
        Ok(())
    }

    pub fn unpair(&mut self) -> Result<(), LinkError> {
        if self.ctx.is_none() {
            return Err(LinkError::NotPaired);
        }
        self.ctx = None;
        self.stream_setup_done = false;
        Ok(())
    }

    /// Forward-channel rate setup for GMSL3 operation.
    pub fn gmsl3_setup(&mut self) -> Result<(), LinkError> {
        self.write_reg(0x0577, 0x7F)?;
        self.write_reg(0x14CE, 0x19)?;
        self.write_reg(0x0001, 0x0C)?;
        self.write_reg(0x0006, 0x11)?;
        self.write_reg(0x0028, 0x62)?;
        thread::sleep(LINK_SETTLE);

        self.write_reg(CTRL0, 0x21)?;
        thread::sleep(LINK_SETTLE);
        Ok(())
    }

    /// Control-channel setup: one-shot link reset, bus speed, and MFP pin
    /// routing for the frame sync input.
    pub fn setup_control(&mut self) -> Result<(), LinkError> {
        let ctx = self.ctx()?;

        let one_shot = match ctx.serdes_link() {
            SerdesLink::A => 0x21,
            SerdesLink::B => 0x22,
        };
        self.write_reg(CTRL0, one_shot)?;
        thread::sleep(LINK_SETTLE);

        if let Err(e) = self.write_reg(I2C_SPEED, 0x16) {
            tracing::error!("serializer i2c speed config failed: {e}");
        }

        self.registry.acquire(self.bus)?;

        self.write_reg(GPIO0_A, 0x80 | GPIO_RX_EN)?;
        self.write_reg(GPIO0_C, 0x4F)?;
        tracing::debug!("serializer MFP0 config done");

        self.write_reg(GPIO8_A, 0x80 | 0x10)?;
        tracing::debug!("serializer PW_EN0 config done");

        Ok(())
    }

    /// Route the GPIO10/XTRIG1 pin for a CSI-2 sensor.
    pub fn gpio10_xtrig1_setup(&mut self) -> Result<(), LinkError> {
        self.write_reg(GPIO6_A, 0x80)?;
        tracing::debug!("serializer gpio10/xtrig1 config done");
        Ok(())
    }

    /// Configure the video pipe for the sensor's bit depth and the link's
    /// lane/stream topology.
    pub fn setup_streaming(&mut self, depth: BitDepth) -> Result<(), LinkError> {
        let ctx = self.ctx()?;

        // Toggle the PHY out of standby before lane mapping.
        self.write_reg(MIPI_RX0, 0x08)?;
        self.write_reg(MIPI_RX0, 0x00)?;

        let rx1_lanes = ctx.num_lanes() - 1;
        let port = (rx1_lanes << 4) & 0xF0;
        self.write_reg(MIPI_RX1, port | 0x40)?;
        self.write_reg(MIPI_RX2, CSI_1X4_LANE_MAP1)?;
        self.write_reg(MIPI_RX3, CSI_1X4_LANE_MAP2)?;

        match depth {
            BitDepth::Eight => {
                self.write_reg(PIPE_Z_DT, 0x2A)?;
                self.write_reg(BPP_OVERRIDE, 0x48)?;
            }
            BitDepth::Ten => {
                self.write_reg(PIPE_Z_DT, 0x2A)?;
                self.write_reg(BPP_OVERRIDE, 0x4A)?;
            }
            BitDepth::Twelve => {
                self.write_reg(PIPE_Z_DT, 0x2C)?;
                self.write_reg(BPP_OVERRIDE, 0x4C)?;
            }
        }

        self.write_reg(PIPE_EN_Z, 0x04)?;
        self.write_reg(VID_TX_Z, 0x2C)?;
        self.write_reg(TX_STREAM_ID, 0x0A)?;

        let vc = if ctx.dst_vc() == 1 { 0x02 } else { 0x01 };
        self.write_reg(PIPE_Z_VC, vc)?;

        self.write_reg(TUN_EN, 0x80)?;

        self.write_reg(START_PORTBZ, 0x40)?;
        self.write_reg(CSI_PORT_SEL, 0x64)?;
        self.write_reg(ENABLE_PORTBZ, 0x43)?;

        self.stream_setup_done = true;
        Ok(())
    }

    /// Drop the bypass pixel clock ahead of sensor standby.
    pub fn bypass_pclk_disable(&mut self) -> Result<(), LinkError> {
        self.write_reg(VID_TX_Z, 0x28)
    }

    /// Return the device to its power-on address and reset it.
    pub fn reset_control(&mut self) -> Result<(), LinkError> {
        if self.ctx.is_none() {
            return Err(LinkError::NotPaired);
        }

        let default_addr = self.registry.release(self.bus)?;
        self.stream_setup_done = false;

        self.write_reg(DEV_ADDR, (default_addr << 1) as u8)?;
        self.write_reg(CTRL0, RESET_ALL)?;
        thread::sleep(LINK_SETTLE);
        Ok(())
    }
}
