//! Shared test doubles for driver integration tests.
#![allow(dead_code)]

use imx_gmsl::link::{LinkController, LinkError};
use imx_gmsl::mode::PixelFormat;
use imx_gmsl::{PowerControl, TransportError};
use std::sync::{Arc, Mutex, Once};

static TRACING: Once = Once::new();

/// Route driver tracing to the captured test output.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Pin-level power control double recording the last driven levels.
#[derive(Clone, Default)]
pub struct MockPower {
    inner: Arc<Mutex<PinState>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PinState {
    pub reset_asserted: bool,
    pub master_pin: bool,
}

impl MockPower {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pins(&self) -> PinState {
        *self.inner.lock().unwrap()
    }
}

impl PowerControl for MockPower {
    fn set_reset(&mut self, asserted: bool) {
        self.inner.lock().unwrap().reset_asserted = asserted;
    }

    fn set_master_pin(&mut self, level: bool) {
        self.inner.lock().unwrap().master_pin = level;
    }
}

/// Scripted link controller recording the call sequence.
#[derive(Clone, Default)]
pub struct MockLink {
    inner: Arc<Mutex<MockLinkState>>,
}

#[derive(Default)]
struct MockLinkState {
    calls: Vec<&'static str>,
    fail_setup_streaming: bool,
    fail_start_streaming: bool,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_setup_streaming(&self) {
        self.inner.lock().unwrap().fail_setup_streaming = true;
    }

    pub fn fail_start_streaming(&self) {
        self.inner.lock().unwrap().fail_start_streaming = true;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    fn record(&self, call: &'static str) {
        self.inner.lock().unwrap().calls.push(call);
    }

    fn link_failure() -> LinkError {
        LinkError::Transport {
            addr: 0x0330,
            source: TransportError::Nack,
        }
    }
}

impl LinkController for MockLink {
    fn register(&mut self) -> Result<(), LinkError> {
        self.record("register");
        Ok(())
    }

    fn unregister(&mut self) -> Result<(), LinkError> {
        self.record("unregister");
        Ok(())
    }

    fn setup_link(&mut self) -> Result<(), LinkError> {
        self.record("setup_link");
        Ok(())
    }

    fn reset_link(&mut self) -> Result<(), LinkError> {
        self.record("reset_link");
        Ok(())
    }

    fn power_on(&mut self) -> Result<(), LinkError> {
        self.record("power_on");
        Ok(())
    }

    fn power_off(&mut self) {
        self.record("power_off");
    }

    fn setup_streaming(&mut self, _format: PixelFormat) -> Result<(), LinkError> {
        self.record("setup_streaming");
        if self.inner.lock().unwrap().fail_setup_streaming {
            return Err(Self::link_failure());
        }
        Ok(())
    }

    fn start_streaming(&mut self) -> Result<(), LinkError> {
        self.record("start_streaming");
        if self.inner.lock().unwrap().fail_start_streaming {
            return Err(Self::link_failure());
        }
        Ok(())
    }

    fn stop_streaming(&mut self) {
        self.record("stop_streaming");
    }
}
