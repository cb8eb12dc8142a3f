use crate::controls::ControlId;
use crate::link::LinkError;
use crate::mode::PixelFormat;
use thiserror::Error;

/// Error type for the register transport boundary.
///
/// Implementations of [`crate::regio::RegisterIo`] map their bus-level
/// failures into this type; the core attaches the failing register address
/// when it propagates one.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("bus I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("device did not acknowledge")]
    Nack,

    #[error("{0}")]
    Other(String),
}

/// Error type for sensor driver operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Register read or write failed. Carries the failing address so a
    /// partial table write can be located.
    #[error("register transport error at 0x{addr:04X}: {source}")]
    Transport {
        addr: u16,
        #[source]
        source: TransportError,
    },

    /// Out-of-range or zero-divisor input.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Format negotiation miss: the catalog has no mode list for this code.
    #[error("unsupported format {0}")]
    UnsupportedFormat(PixelFormat),

    /// Format negotiation miss: no mode matches the request.
    #[error("unsupported mode {width}x{height}")]
    UnsupportedMode { width: u32, height: u32 },

    /// Serializer/deserializer sequencing failure.
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// Control cannot be written in the current stream state.
    #[error("control {0:?} is locked while streaming")]
    Busy(ControlId),

    /// No such control on this sensor variant.
    #[error("unknown control {0:?}")]
    UnknownControl(ControlId),
}

pub type Result<T> = std::result::Result<T, Error>;
