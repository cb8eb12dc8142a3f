//! Control-plane driver core for a family of Sony IMX CSI-2 image sensors
//! (IMX678, IMX676, IMX900) with optional MAX96792/MAX96793 GMSL
//! serializer/deserializer links.
//!
//! The crate owns the sensor mode/timing/control state machine: mode
//! selection from a per-format catalog, derivation of line time, frame
//! length, blanking and exposure bounds from sensor-specific formulas, the
//! control dependency graph, and the standby/streaming register sequencing
//! including serdes link bring-up. Hardware access goes through three
//! traits supplied by the platform: [`regio::RegisterIo`] for the register
//! transport, [`device::PowerControl`] for the reset/master pins, and
//! [`link::LinkController`] for the serdes pair.
//!
//! One generic driver, [`device::SensorDevice`], serves every variant;
//! chip differences live in [`profile::SensorProfile`] implementations
//! under [`profiles`].

pub mod controls;
pub mod device;
pub mod error;
pub mod link;
pub mod mode;
pub mod profile;
pub mod profiles;
pub mod regio;
pub mod timing;

pub use controls::{Control, ControlId, ControlRange, OperationMode, ShutterMode, SyncMode};
pub use device::{NegotiatedFormat, PowerControl, SensorDevice};
pub use error::{Error, Result, TransportError};
pub use link::{GmslLink, LinkConfig, LinkContext, LinkController, LinkError, SerdesRegistry};
pub use mode::{BitDepth, Chromaticity, CropRect, Mode, ModeCatalog, PixelFormat};
pub use profile::{LinkFreq, ModeConstants, SensorProfile};
