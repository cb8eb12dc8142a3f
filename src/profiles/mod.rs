//! Per-variant sensor profiles.

pub mod imx676;
pub mod imx678;
pub mod imx900;

pub use imx676::{Imx676, IMX676};
pub use imx678::{Imx678, IMX678};
pub use imx900::{Imx900, IMX900};
