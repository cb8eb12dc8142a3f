//! GMSL serializer/deserializer link control.
//!
//! A sensor may sit behind a MAX96793 serializer paired with a MAX96792
//! deserializer, bridging its CSI-2 output over a single coax link. The
//! driver core drives that path through the [`LinkController`] trait:
//! serializer configured first, deserializer second, deserializer started
//! last; teardown is the reverse.

mod max96792;
mod max96793;

pub use max96792::Max96792;
pub use max96793::Max96793;

use crate::error::TransportError;
use crate::mode::PixelFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Maximum logical data streams multiplexed over one link.
pub const MAX_DATA_STREAMS: usize = 4;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("serdes register transport error at 0x{addr:04X}: {source}")]
    Transport {
        addr: u16,
        #[source]
        source: TransportError,
    },

    #[error("no sensor paired with this serdes device")]
    NotPaired,

    #[error("serdes device already paired")]
    AlreadyPaired,

    #[error("no primary serializer registered for {0}")]
    NoPrimary(BusId),

    #[error("primary serializer already registered for {0}")]
    PrimaryExists(BusId),

    #[error("invalid link configuration: {0}")]
    InvalidConfig(String),
}

/// Identifier of the shared command bus a serializer pair lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusId(pub u32);

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsiPort {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CsiLaneMode {
    #[serde(rename = "1x4")]
    OneX4,
    #[serde(rename = "2x4")]
    TwoX4,
    #[serde(rename = "2x2")]
    TwoX2,
}

/// Which forward-channel link of the pair carries this sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerdesLink {
    A,
    B,
}

/// CSI-2 data type tag of one logical stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamDataType {
    Raw12,
    Embedded,
    UedU1,
}

impl StreamDataType {
    pub fn data_type(self) -> u8 {
        match self {
            StreamDataType::Raw12 => 0x2C,
            StreamDataType::Embedded => 0x12,
            StreamDataType::UedU1 => 0x30,
        }
    }
}

/// Deserialized link description, typically loaded from deployment
/// configuration. Validated into a [`LinkContext`] before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub bus: BusId,
    /// Sensor address on the shared bus after reassignment.
    pub sensor_addr: u16,
    /// Sensor power-on default address.
    pub sensor_default_addr: u16,
    pub serializer_addr: u16,
    pub src_csi_port: CsiPort,
    pub dst_csi_port: CsiPort,
    pub csi_mode: CsiLaneMode,
    pub serdes_link: SerdesLink,
    pub num_lanes: u8,
    /// Virtual channel the sensor emits on.
    pub stream_vc: u8,
    /// Virtual channel the deserializer outputs on.
    pub dst_vc: u8,
    pub streams: Vec<StreamDataType>,
}

impl LinkConfig {
    /// Validate into an immutable context.
    pub fn build(self) -> Result<LinkContext, LinkError> {
        if !(1..=4).contains(&self.num_lanes) {
            return Err(LinkError::InvalidConfig(format!(
                "lane count {} out of range 1..=4",
                self.num_lanes
            )));
        }
        if self.streams.is_empty() || self.streams.len() > MAX_DATA_STREAMS {
            return Err(LinkError::InvalidConfig(format!(
                "stream count {} out of range 1..={MAX_DATA_STREAMS}",
                self.streams.len()
            )));
        }
        Ok(LinkContext { config: self })
    }
}

/// Immutable GMSL topology shared by reference with the serdes drivers.
///
/// The context must outlive both serializer and deserializer registrations;
/// unregistration happens before the last reference is dropped.
#[derive(Debug)]
pub struct LinkContext {
    config: LinkConfig,
}

impl LinkContext {
    pub fn bus(&self) -> BusId {
        self.config.bus
    }

    pub fn sensor_addr(&self) -> u16 {
        self.config.sensor_addr
    }

    pub fn sensor_default_addr(&self) -> u16 {
        self.config.sensor_default_addr
    }

    pub fn serializer_addr(&self) -> u16 {
        self.config.serializer_addr
    }

    pub fn src_csi_port(&self) -> CsiPort {
        self.config.src_csi_port
    }

    pub fn dst_csi_port(&self) -> CsiPort {
        self.config.dst_csi_port
    }

    pub fn csi_mode(&self) -> CsiLaneMode {
        self.config.csi_mode
    }

    pub fn serdes_link(&self) -> SerdesLink {
        self.config.serdes_link
    }

    pub fn num_lanes(&self) -> u8 {
        self.config.num_lanes
    }

    pub fn stream_vc(&self) -> u8 {
        self.config.stream_vc
    }

    pub fn dst_vc(&self) -> u8 {
        self.config.dst_vc
    }

    pub fn streams(&self) -> &[StreamDataType] {
        &self.config.streams
    }
}

/// Registry of the primary serializer per command bus.
///
/// Serializers on a shared bus coordinate address reassignment through the
/// primary device's power-on default address. The registry is an explicit
/// arena keyed by bus id and passed by reference to whoever needs it.
#[derive(Default)]
pub struct SerdesRegistry {
    inner: Mutex<HashMap<BusId, PrimaryEntry>>,
}

struct PrimaryEntry {
    default_addr: u16,
    refs: u32,
}

impl SerdesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the primary serializer for a bus. At most one per bus.
    pub fn claim_primary(&self, bus: BusId, default_addr: u16) -> Result<(), LinkError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.contains_key(&bus) {
            return Err(LinkError::PrimaryExists(bus));
        }
        inner.insert(
            bus,
            PrimaryEntry {
                default_addr,
                refs: 0,
            },
        );
        Ok(())
    }

    /// Take a reference on the bus's primary serializer, returning its
    /// power-on default address.
    pub fn acquire(&self, bus: BusId) -> Result<u16, LinkError> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.get_mut(&bus).ok_or(LinkError::NoPrimary(bus))?;
        entry.refs += 1;
        Ok(entry.default_addr)
    }

    /// Drop a reference taken with [`SerdesRegistry::acquire`].
    pub fn release(&self, bus: BusId) -> Result<u16, LinkError> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.get_mut(&bus).ok_or(LinkError::NoPrimary(bus))?;
        entry.refs = entry.refs.saturating_sub(1);
        Ok(entry.default_addr)
    }

    pub fn ref_count(&self, bus: BusId) -> u32 {
        self.inner
            .lock()
            .unwrap()
            .get(&bus)
            .map(|e| e.refs)
            .unwrap_or(0)
    }
}

/// Serdes lifecycle contract consumed by the sensor driver.
///
/// `register` and `setup_link` must run before any streaming operation;
/// `unregister` and `reset_link` run in that order at teardown. Stream
/// teardown is best-effort so shutdown never wedges on a dead link.
pub trait LinkController: Send {
    /// Attach the link context to both serdes devices.
    fn register(&mut self) -> Result<(), LinkError>;

    fn unregister(&mut self) -> Result<(), LinkError>;

    /// Run the ordered bring-up pipeline: deserializer reset and rate setup,
    /// serializer rate setup, link selection, then control-channel setup on
    /// serializer and deserializer.
    fn setup_link(&mut self) -> Result<(), LinkError>;

    /// Reverse of [`LinkController::setup_link`]; also powers the link down.
    fn reset_link(&mut self) -> Result<(), LinkError>;

    fn power_on(&mut self) -> Result<(), LinkError>;

    fn power_off(&mut self);

    /// Configure both devices for the sensor's active pixel format:
    /// serializer first, then deserializer.
    fn setup_streaming(&mut self, format: PixelFormat) -> Result<(), LinkError>;

    /// Open the deserializer's CSI output.
    fn start_streaming(&mut self) -> Result<(), LinkError>;

    /// Best-effort stream teardown; failures are logged, never returned.
    fn stop_streaming(&mut self);
}

/// A MAX96793/MAX96792 pair implementing [`LinkController`].
pub struct GmslLink<SIO, DIO>
where
    SIO: crate::regio::RegisterIo,
    DIO: crate::regio::RegisterIo,
{
    ser: Max96793<SIO>,
    des: Max96792<DIO>,
    ctx: Arc<LinkContext>,
}

impl<SIO, DIO> GmslLink<SIO, DIO>
where
    SIO: crate::regio::RegisterIo,
    DIO: crate::regio::RegisterIo,
{
    pub fn new(ser: Max96793<SIO>, des: Max96792<DIO>, ctx: Arc<LinkContext>) -> Self {
        Self { ser, des, ctx }
    }
}

impl<SIO, DIO> LinkController for GmslLink<SIO, DIO>
where
    SIO: crate::regio::RegisterIo,
    DIO: crate::regio::RegisterIo,
{
    fn register(&mut self) -> Result<(), LinkError> {
        self.ser.pair(Arc::clone(&self.ctx))?;
        self.des.register(Arc::clone(&self.ctx))?;
        Ok(())
    }

    // The serializer stays paired here: reset_link still needs its context
    // to restore the power-on address. unpair happens at the end of reset.
    fn unregister(&mut self) -> Result<(), LinkError> {
        self.des.unregister()
    }

    fn setup_link(&mut self) -> Result<(), LinkError> {
        if let Err(e) = self.des.reset_control() {
            tracing::warn!("deserializer reset before setup failed: {e}");
        }
        self.des.gmsl3_setup()?;
        self.ser.gmsl3_setup()?;
        self.des.setup_link()?;

        // Control-channel setup errors on either side are reported but do
        // not abort the pipeline; the devices renegotiate on stream setup.
        if let Err(e) = self.ser.setup_control() {
            tracing::error!("serializer control setup failed: {e}");
        }
        self.ser.gpio10_xtrig1_setup()?;
        if let Err(e) = self.des.setup_control() {
            tracing::error!("deserializer control setup failed: {e}");
        }
        Ok(())
    }

    fn reset_link(&mut self) -> Result<(), LinkError> {
        if let Err(e) = self.ser.reset_control() {
            tracing::warn!("serializer reset failed: {e}");
        }
        if let Err(e) = self.des.reset_control() {
            tracing::warn!("deserializer reset failed: {e}");
        }
        self.des.power_off();
        let _ = self.ser.unpair();
        Ok(())
    }

    fn power_on(&mut self) -> Result<(), LinkError> {
        self.des.power_on()
    }

    fn power_off(&mut self) {
        self.des.power_off();
    }

    fn setup_streaming(&mut self, format: PixelFormat) -> Result<(), LinkError> {
        self.ser.setup_streaming(format.depth)?;
        self.des.setup_streaming()?;
        Ok(())
    }

    fn start_streaming(&mut self) -> Result<(), LinkError> {
        self.des.start_streaming()
    }

    fn stop_streaming(&mut self) {
        if let Err(e) = self.ser.bypass_pclk_disable() {
            tracing::warn!("serializer bypass clock disable failed: {e}");
        }
        if let Err(e) = self.des.stop_streaming() {
            tracing::warn!("deserializer stream stop failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LinkConfig {
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

    #[test]
    fn config_validates_lane_count() {
        let mut cfg = config();
        cfg.num_lanes = 5;
        assert!(matches!(cfg.build(), Err(LinkError::InvalidConfig(_))));
    }

    #[test]
    fn config_requires_streams() {
        let mut cfg = config();
        cfg.streams.clear();
        assert!(matches!(cfg.build(), Err(LinkError::InvalidConfig(_))));
    }

    #[test]
    fn registry_rejects_second_primary_on_same_bus() {
        let registry = SerdesRegistry::new();
        registry.claim_primary(BusId(2), 0x40).unwrap();
        assert!(matches!(
            registry.claim_primary(BusId(2), 0x42),
            Err(LinkError::PrimaryExists(_))
        ));
        // A different bus is fine.
        registry.claim_primary(BusId(3), 0x40).unwrap();
    }

    #[test]
    fn registry_reference_counts_balance() {
        let registry = SerdesRegistry::new();
        registry.claim_primary(BusId(1), 0x40).unwrap();

        assert_eq!(registry.acquire(BusId(1)).unwrap(), 0x40);
        assert_eq!(registry.acquire(BusId(1)).unwrap(), 0x40);
        assert_eq!(registry.ref_count(BusId(1)), 2);

        registry.release(BusId(1)).unwrap();
        registry.release(BusId(1)).unwrap();
        assert_eq!(registry.ref_count(BusId(1)), 0);
    }

    #[test]
    fn registry_acquire_without_primary_fails() {
        let registry = SerdesRegistry::new();
        assert!(matches!(
            registry.acquire(BusId(9)),
            Err(LinkError::NoPrimary(_))
        ));
    }

    #[test]
    fn stream_data_type_tags() {
        assert_eq!(StreamDataType::Raw12.data_type(), 0x2C);
        assert_eq!(StreamDataType::Embedded.data_type(), 0x12);
        assert_eq!(StreamDataType::UedU1.data_type(), 0x30);
    }

    #[test]
    fn link_config_round_trips_through_serde() {
        let cfg = config();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: LinkConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.num_lanes, 4);
        assert_eq!(back.serdes_link, SerdesLink::A);
        assert_eq!(back.streams, cfg.streams);
    }
}
