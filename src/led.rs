//! # LED task
//!
//! Cycles an RGB LED through red, green and blue, holding each color for
//! `LED_HOLD_MS`.

use core::convert::Infallible;

use embedded_hal::digital::StatefulOutputPin;

use crate::config::LED_HOLD_MS;
use crate::io::{Color, RgbLed};
use crate::task::{PeriodicTask, TaskControl};

/// Body of the LED task.
///
/// The color index is the task's only state. It is not touched by suspend
/// or resume: after a resume the next activation shows the color that was
/// due when the task was stopped.
pub struct CycleController<'a, P> {
    led: &'a RgbLed<P>,
    index: usize,
}

impl<'a, P> CycleController<'a, P>
where
    P: StatefulOutputPin<Error = Infallible>,
{
    pub fn new(led: &'a RgbLed<P>) -> Self {
        Self { led, index: 0 }
    }

    /// Index into `Color::CYCLE` of the color the next activation shows.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Color the next activation shows.
    pub fn next_color(&self) -> Color {
        Color::CYCLE[self.index]
    }
}

impl<P> PeriodicTask for CycleController<'_, P>
where
    P: StatefulOutputPin<Error = Infallible>,
{
    fn activate(&mut self, _control: &mut dyn TaskControl) -> u32 {
        let color = self.next_color();
        self.led.all_off();
        self.led.light(color);
        self.index = (self.index + 1) % Color::CYCLE.len();
        LED_HOLD_MS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::mock::{MockLevel, MockPin};
    use crate::task::TaskHandle;
    use crate::error::Result;

    struct NoControl;

    impl TaskControl for NoControl {
        fn suspend(&mut self, _task: TaskHandle) -> Result<()> {
            unreachable!("the LED task never controls other tasks")
        }

        fn resume(&mut self, _task: TaskHandle) -> Result<()> {
            unreachable!("the LED task never controls other tasks")
        }
    }

    #[test]
    fn test_cycle_order_and_hold() {
        let (r, g, b) = (MockLevel::new(false), MockLevel::new(false), MockLevel::new(false));
        let led = RgbLed::new(MockPin::new(&r), MockPin::new(&g), MockPin::new(&b));
        let mut task = CycleController::new(&led);

        let expected = [
            [true, false, false],
            [false, true, false],
            [false, false, true],
            [true, false, false],
        ];
        for lit in expected {
            assert_eq!(task.activate(&mut NoControl), LED_HOLD_MS);
            assert_eq!(led.lit(), lit);
        }
        assert_eq!(task.index(), 1);
    }

    #[test]
    fn test_activation_clears_stray_lines() {
        // Initial pin levels are unspecified; every activation starts all-off.
        let (r, g, b) = (MockLevel::new(true), MockLevel::new(true), MockLevel::new(true));
        let led = RgbLed::new(MockPin::new(&r), MockPin::new(&g), MockPin::new(&b));
        let mut task = CycleController::new(&led);

        task.activate(&mut NoControl);
        assert_eq!(led.lit(), [true, false, false]);
    }

    #[test]
    fn test_external_quiesce_keeps_index() {
        use crate::io::Quiesce;

        let (r, g, b) = (MockLevel::new(false), MockLevel::new(false), MockLevel::new(false));
        let led = RgbLed::new(MockPin::new(&r), MockPin::new(&g), MockPin::new(&b));
        let mut task = CycleController::new(&led);

        task.activate(&mut NoControl);
        task.activate(&mut NoControl);
        led.quiesce();
        assert!(led.is_dark());
        assert_eq!(task.next_color(), Color::Blue);

        task.activate(&mut NoControl);
        assert_eq!(led.lit(), [false, false, true]);
    }
}
