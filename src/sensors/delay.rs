//! `DelayNs` providers for targets without a hardware timer driver.

use std::{thread, time::Duration};

use embedded_hal::delay::DelayNs;

/// Blocks the calling thread, for running the sensor on a host.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}

/// Returns immediately and counts the requested time.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDelay {
    elapsed_ns: u64,
}

impl NoopDelay {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += ns as u64;
    }
}
