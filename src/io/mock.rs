//! Mock GPIO for host tests and the simulator
//!
//! A `MockPin` reads and writes a `MockLevel` owned by the test, so the test
//! can both observe outputs and drive inputs while the pin itself is owned by
//! a task. The level also counts rising edges, which catches a line that was
//! driven high and low again between two samples.

use core::cell::Cell;
use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};

/// Electrical level of one line plus the number of low-to-high transitions.
#[derive(Debug, Default)]
pub struct MockLevel {
    level: Cell<bool>,
    rises: Cell<u32>,
}

impl MockLevel {
    pub const fn new(high: bool) -> Self {
        Self {
            level: Cell::new(high),
            rises: Cell::new(0),
        }
    }

    /// `true` is electrically high.
    pub fn get(&self) -> bool {
        self.level.get()
    }

    pub fn set(&self, high: bool) {
        if high && !self.level.get() {
            self.rises.set(self.rises.get() + 1);
        }
        self.level.set(high);
    }

    /// Rising edges seen since creation.
    pub fn rises(&self) -> u32 {
        self.rises.get()
    }
}

/// Pin backed by a shared `MockLevel`.
#[derive(Debug, Clone, Copy)]
pub struct MockPin<'a> {
    level: &'a MockLevel,
}

impl<'a> MockPin<'a> {
    pub fn new(level: &'a MockLevel) -> Self {
        Self { level }
    }
}

impl ErrorType for MockPin<'_> {
    type Error = Infallible;
}

impl OutputPin for MockPin<'_> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level.set(true);
        Ok(())
    }
}

impl StatefulOutputPin for MockPin<'_> {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level.get())
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level.get())
    }
}

impl InputPin for MockPin<'_> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_counts_rising_edges_only() {
        let level = MockLevel::new(false);
        let mut pin = MockPin::new(&level);

        pin.set_high().unwrap();
        pin.set_high().unwrap();
        pin.set_low().unwrap();
        pin.set_low().unwrap();
        assert_eq!(level.rises(), 1);

        pin.set_high().unwrap();
        assert!(level.get());
        assert_eq!(level.rises(), 2);
    }

    #[test]
    fn test_initially_high_is_not_an_edge() {
        let level = MockLevel::new(true);
        assert_eq!(level.rises(), 0);
        level.set(true);
        assert_eq!(level.rises(), 0);
    }
}
