//! # Digital I/O
//!
//! Thin layer over the `embedded-hal` digital traits. Pins are configured
//! (direction, pull-up) by the board bring-up through the HAL's typed pin
//! modes; this module only reads and writes them.
//!
//! Output lines are shared: the task that drives a line holds a `&'static`
//! reference to it, and so does the input monitor, which forces the line off
//! right after suspending that task. The pin lives in a
//! `critical_section::Mutex<RefCell<_>>` so both references are sound; the
//! suspend/resume protocol guarantees only one of them writes at a time.

use core::cell::RefCell;
use core::convert::Infallible;

use critical_section::Mutex;
use embedded_hal::digital::{InputPin, PinState, StatefulOutputPin};

use crate::sync;

#[cfg(not(target_os = "none"))]
pub mod mock;

/// Unwrap a HAL result whose error type is uninhabited.
#[inline]
fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// An output group that can be forced into its safe (off) state.
pub trait Quiesce {
    /// Drive every line of the group low.
    fn quiesce(&self);
}

// ---------------------------------------------------------------------------
// Output line
// ---------------------------------------------------------------------------

/// A single push-pull output, active-high.
pub struct OutputLine<P> {
    pin: Mutex<RefCell<P>>,
}

impl<P> OutputLine<P>
where
    P: StatefulOutputPin<Error = Infallible>,
{
    pub fn new(pin: P) -> Self {
        Self {
            pin: Mutex::new(RefCell::new(pin)),
        }
    }

    /// Drive the line high (`true`) or low (`false`).
    pub fn write(&self, high: bool) {
        sync::critical_section(|cs| {
            let mut pin = self.pin.borrow_ref_mut(cs);
            infallible(pin.set_state(PinState::from(high)));
        });
    }

    #[inline]
    pub fn set_low(&self) {
        self.write(false);
    }

    /// Level the line is currently driven to.
    pub fn is_high(&self) -> bool {
        sync::critical_section(|cs| infallible(self.pin.borrow_ref_mut(cs).is_set_high()))
    }
}

impl<P> Quiesce for OutputLine<P>
where
    P: StatefulOutputPin<Error = Infallible>,
{
    fn quiesce(&self) {
        self.set_low();
    }
}

// ---------------------------------------------------------------------------
// RGB LED
// ---------------------------------------------------------------------------

/// One of the three LED color lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Blue,
}

impl Color {
    /// Order in which the LED task cycles through the colors.
    pub const CYCLE: [Color; 3] = [Color::Red, Color::Green, Color::Blue];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
        }
    }
}

/// Three independent color lines of a common-cathode RGB LED.
pub struct RgbLed<P> {
    red: OutputLine<P>,
    green: OutputLine<P>,
    blue: OutputLine<P>,
}

impl<P> RgbLed<P>
where
    P: StatefulOutputPin<Error = Infallible>,
{
    pub fn new(red: P, green: P, blue: P) -> Self {
        Self {
            red: OutputLine::new(red),
            green: OutputLine::new(green),
            blue: OutputLine::new(blue),
        }
    }

    pub fn line(&self, color: Color) -> &OutputLine<P> {
        match color {
            Color::Red => &self.red,
            Color::Green => &self.green,
            Color::Blue => &self.blue,
        }
    }

    pub fn all_off(&self) {
        self.red.set_low();
        self.green.set_low();
        self.blue.set_low();
    }

    /// Drive one color line high. The other lines are left as they are.
    pub fn light(&self, color: Color) {
        self.line(color).write(true);
    }

    /// Colors currently driven high, in `Color::CYCLE` order.
    pub fn lit(&self) -> [bool; 3] {
        Color::CYCLE.map(|color| self.line(color).is_high())
    }

    /// `true` when no color line is driven high.
    pub fn is_dark(&self) -> bool {
        self.lit() == [false; 3]
    }
}

impl<P> Quiesce for RgbLed<P>
where
    P: StatefulOutputPin<Error = Infallible>,
{
    fn quiesce(&self) {
        self.all_off();
    }
}

// ---------------------------------------------------------------------------
// Button
// ---------------------------------------------------------------------------

/// A momentary push button wired to ground with a pull-up: electrically low
/// means pressed.
pub struct Button<P> {
    pin: P,
}

impl<P> Button<P>
where
    P: InputPin<Error = Infallible>,
{
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn is_pressed(&mut self) -> bool {
        infallible(self.pin.is_low())
    }
}
