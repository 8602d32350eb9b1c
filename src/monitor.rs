//! # Button task
//!
//! Polls two buttons every `BUTTON_POLL_MS` and gates one task per button:
//! holding the button suspends the task, releasing it resumes the task.
//!
//! ## Gate state machine (per button)
//!
//! ```text
//!                 pressed / suspend + quiesce outputs
//!   ┌────────┐ ─────────────────────────────────────► ┌───────────┐
//!   │ Active │                                        │ Suspended │
//!   └────────┘ ◄───────────────────────────────────── └───────────┘
//!                 released / resume
//! ```
//!
//! Every other (state, reading) pair is a self-loop, so a held button
//! produces one suspend request, not one per poll. The gate only moves after
//! the scheduler accepted the request, which keeps "gate is `Suspended`" and
//! "task is `Suspended`" in lockstep.
//!
//! Outputs are forced off right after a suspend because the task may have
//! been stopped with a line still high. Nothing is re-asserted on resume: the
//! task drives its outputs again on its own next activation.

use core::convert::Infallible;

use embedded_hal::digital::InputPin;

use crate::config::BUTTON_POLL_MS;
use crate::io::{Button, Quiesce};
use crate::task::{PeriodicTask, TaskControl, TaskHandle};
use crate::{log_info, log_warn};

/// Run-state of a gated task as tracked by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Active,
    Suspended,
}

/// Request a gate issues for one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Suspend,
    Resume,
}

impl Transition {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Transition::Suspend => "suspend",
            Transition::Resume => "resume",
        }
    }
}

/// Edge-detecting state machine for one button.
#[derive(Debug, Clone, Copy)]
pub struct Gate {
    task: TaskHandle,
    state: GateState,
}

impl Gate {
    pub const fn new(task: TaskHandle) -> Self {
        Self {
            task,
            state: GateState::Active,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn task(&self) -> TaskHandle {
        self.task
    }

    /// Transition due for a button reading, if any.
    pub fn transition(&self, pressed: bool) -> Option<Transition> {
        match (self.state, pressed) {
            (GateState::Active, true) => Some(Transition::Suspend),
            (GateState::Suspended, false) => Some(Transition::Resume),
            _ => None,
        }
    }

    /// Record that the scheduler carried out `transition`.
    fn commit(&mut self, transition: Transition) {
        self.state = match transition {
            Transition::Suspend => GateState::Suspended,
            Transition::Resume => GateState::Active,
        };
    }
}

/// A button, the task it gates and the outputs that task drives.
pub struct GatedTask<'a, I, Q: ?Sized> {
    name: &'static str,
    button: Button<I>,
    gate: Gate,
    outputs: &'a Q,
}

impl<'a, I, Q> GatedTask<'a, I, Q>
where
    I: InputPin<Error = Infallible>,
    Q: Quiesce + ?Sized,
{
    pub fn new(name: &'static str, button: Button<I>, task: TaskHandle, outputs: &'a Q) -> Self {
        Self {
            name,
            button,
            gate: Gate::new(task),
            outputs,
        }
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Read the button and apply the resulting transition, if any.
    ///
    /// Returns the transition the scheduler accepted. A rejected request
    /// leaves the gate where it was.
    pub fn poll(&mut self, control: &mut dyn TaskControl) -> Option<Transition> {
        let pressed = self.button.is_pressed();
        let transition = self.gate.transition(pressed)?;
        let task = self.gate.task();

        let request = match transition {
            Transition::Suspend => control.suspend(task),
            Transition::Resume => control.resume(task),
        };
        if let Err(err) = request {
            log_warn!(
                "{}: {} request rejected: {}",
                self.name,
                transition.as_str(),
                err.as_str()
            );
            return None;
        }

        self.gate.commit(transition);
        if transition == Transition::Suspend {
            self.outputs.quiesce();
        }
        log_info!("{}: {}", self.name, transition.as_str());
        Some(transition)
    }
}

/// Body of the button task: button A gates the LED task, button B the
/// buzzer task.
pub struct InputMonitor<'a, I, L: ?Sized, Z: ?Sized> {
    led: GatedTask<'a, I, L>,
    buzzer: GatedTask<'a, I, Z>,
}

impl<'a, I, L, Z> InputMonitor<'a, I, L, Z>
where
    I: InputPin<Error = Infallible>,
    L: Quiesce + ?Sized,
    Z: Quiesce + ?Sized,
{
    pub fn new(led: GatedTask<'a, I, L>, buzzer: GatedTask<'a, I, Z>) -> Self {
        Self { led, buzzer }
    }

    pub fn led_gate(&self) -> GateState {
        self.led.gate().state()
    }

    pub fn buzzer_gate(&self) -> GateState {
        self.buzzer.gate().state()
    }
}

impl<I, L, Z> PeriodicTask for InputMonitor<'_, I, L, Z>
where
    I: InputPin<Error = Infallible>,
    L: Quiesce + ?Sized,
    Z: Quiesce + ?Sized,
{
    fn activate(&mut self, control: &mut dyn TaskControl) -> u32 {
        self.led.poll(control);
        self.buzzer.poll(control);
        BUTTON_POLL_MS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TASK_STACK_WORDS;
    use crate::error::{KernelError, Result};
    use crate::io::mock::{MockLevel, MockPin};
    use crate::io::{OutputLine, RgbLed};
    use crate::scheduler::Scheduler;
    use crate::task::{TaskConfig, TaskState};

    /// Records every request; optionally rejects them all.
    #[derive(Default)]
    struct Recorder {
        suspends: Vec<TaskHandle>,
        resumes: Vec<TaskHandle>,
        reject: bool,
    }

    impl TaskControl for Recorder {
        fn suspend(&mut self, task: TaskHandle) -> Result<()> {
            if self.reject {
                return Err(KernelError::InvalidHandle);
            }
            self.suspends.push(task);
            Ok(())
        }

        fn resume(&mut self, task: TaskHandle) -> Result<()> {
            if self.reject {
                return Err(KernelError::InvalidHandle);
            }
            self.resumes.push(task);
            Ok(())
        }
    }

    struct Pins {
        rgb: [MockLevel; 3],
        buzzer: MockLevel,
        button_a: MockLevel,
        button_b: MockLevel,
    }

    impl Pins {
        fn new() -> Self {
            Self {
                rgb: [MockLevel::new(false), MockLevel::new(false), MockLevel::new(false)],
                buzzer: MockLevel::new(false),
                // Pull-ups: released buttons read high
                button_a: MockLevel::new(true),
                button_b: MockLevel::new(true),
            }
        }
    }

    const LED_TASK: TaskHandle = TaskHandle::new(1);
    const BUZZER_TASK: TaskHandle = TaskHandle::new(2);

    fn monitor<'a>(
        pins: &'a Pins,
        led: &'a RgbLed<MockPin<'a>>,
        buzzer: &'a OutputLine<MockPin<'a>>,
    ) -> InputMonitor<'a, MockPin<'a>, RgbLed<MockPin<'a>>, OutputLine<MockPin<'a>>> {
        InputMonitor::new(
            GatedTask::new("led", Button::new(MockPin::new(&pins.button_a)), LED_TASK, led),
            GatedTask::new(
                "buzzer",
                Button::new(MockPin::new(&pins.button_b)),
                BUZZER_TASK,
                buzzer,
            ),
        )
    }

    fn outputs(pins: &Pins) -> (RgbLed<MockPin<'_>>, OutputLine<MockPin<'_>>) {
        let [r, g, b] = &pins.rgb;
        (
            RgbLed::new(MockPin::new(r), MockPin::new(g), MockPin::new(b)),
            OutputLine::new(MockPin::new(&pins.buzzer)),
        )
    }

    #[test]
    fn test_gate_transition_table() {
        let mut gate = Gate::new(LED_TASK);
        assert_eq!(gate.state(), GateState::Active);
        assert_eq!(gate.transition(false), None);
        assert_eq!(gate.transition(true), Some(Transition::Suspend));

        gate.commit(Transition::Suspend);
        assert_eq!(gate.transition(true), None);
        assert_eq!(gate.transition(false), Some(Transition::Resume));

        gate.commit(Transition::Resume);
        assert_eq!(gate.state(), GateState::Active);
    }

    #[test]
    fn test_idle_buttons_issue_no_requests() {
        let pins = Pins::new();
        let (led, buzzer) = outputs(&pins);
        let mut m = monitor(&pins, &led, &buzzer);
        let mut control = Recorder::default();

        for _ in 0..50 {
            assert_eq!(m.activate(&mut control), BUTTON_POLL_MS);
        }
        assert!(control.suspends.is_empty());
        assert!(control.resumes.is_empty());
    }

    #[test]
    fn test_held_button_suspends_once() {
        let pins = Pins::new();
        let (led, buzzer) = outputs(&pins);
        let mut m = monitor(&pins, &led, &buzzer);
        let mut control = Recorder::default();

        pins.button_a.set(false);
        for _ in 0..20 {
            m.activate(&mut control);
        }
        assert_eq!(control.suspends, vec![LED_TASK]);
        assert!(control.resumes.is_empty());
        assert_eq!(m.led_gate(), GateState::Suspended);
        assert_eq!(m.buzzer_gate(), GateState::Active);
    }

    #[test]
    fn test_release_resumes_once() {
        let pins = Pins::new();
        let (led, buzzer) = outputs(&pins);
        let mut m = monitor(&pins, &led, &buzzer);
        let mut control = Recorder::default();

        pins.button_b.set(false);
        m.activate(&mut control);
        pins.button_b.set(true);
        for _ in 0..20 {
            m.activate(&mut control);
        }
        assert_eq!(control.suspends, vec![BUZZER_TASK]);
        assert_eq!(control.resumes, vec![BUZZER_TASK]);
        assert_eq!(m.buzzer_gate(), GateState::Active);
    }

    #[test]
    fn test_suspend_forces_led_dark() {
        let pins = Pins::new();
        let (led, buzzer) = outputs(&pins);
        let mut m = monitor(&pins, &led, &buzzer);
        let mut control = Recorder::default();

        led.light(crate::io::Color::Green);
        buzzer.write(true);
        pins.button_a.set(false);
        m.activate(&mut control);

        assert!(led.is_dark());
        // The buzzer is not gated by button A
        assert!(buzzer.is_high());
    }

    #[test]
    fn test_suspend_forces_buzzer_low_and_resume_leaves_it() {
        let pins = Pins::new();
        let (led, buzzer) = outputs(&pins);
        let mut m = monitor(&pins, &led, &buzzer);
        let mut control = Recorder::default();

        buzzer.write(true);
        pins.button_b.set(false);
        m.activate(&mut control);
        assert!(!pins.buzzer.get());

        pins.button_b.set(true);
        m.activate(&mut control);
        assert_eq!(control.resumes, vec![BUZZER_TASK]);
        assert!(!pins.buzzer.get());
    }

    #[test]
    fn test_rejected_request_keeps_gate_and_outputs() {
        let pins = Pins::new();
        let (led, buzzer) = outputs(&pins);
        let mut m = monitor(&pins, &led, &buzzer);
        let mut control = Recorder {
            reject: true,
            ..Recorder::default()
        };

        led.light(crate::io::Color::Red);
        pins.button_a.set(false);
        m.activate(&mut control);

        assert_eq!(m.led_gate(), GateState::Active);
        assert_eq!(led.lit(), [true, false, false]);
    }

    #[test]
    fn test_gates_track_scheduler_state() {
        extern "C" fn dummy_task(_arg: usize) -> ! {
            loop {
                core::hint::spin_loop();
            }
        }

        let pins = Pins::new();
        let (led, buzzer) = outputs(&pins);
        let mut scheduler = Scheduler::new();
        let led_task = scheduler
            .create_task(dummy_task, 0, TaskConfig::new("led", 1, TASK_STACK_WORDS))
            .unwrap();
        let buzzer_task = scheduler
            .create_task(dummy_task, 0, TaskConfig::new("buzzer", 1, TASK_STACK_WORDS))
            .unwrap();
        assert_eq!((led_task, buzzer_task), (LED_TASK, BUZZER_TASK));
        let mut m = monitor(&pins, &led, &buzzer);

        // (button A pressed, button B pressed) per poll
        let script = [
            (false, false),
            (true, false),
            (true, true),
            (true, true),
            (false, true),
            (false, false),
            (true, false),
            (false, false),
        ];
        for (a, b) in script {
            pins.button_a.set(!a);
            pins.button_b.set(!b);
            m.activate(&mut scheduler);

            let expect = |gate: GateState| match gate {
                GateState::Active => TaskState::Ready,
                GateState::Suspended => TaskState::Suspended,
            };
            assert_eq!(scheduler.state(LED_TASK), Some(expect(m.led_gate())));
            assert_eq!(scheduler.state(BUZZER_TASK), Some(expect(m.buzzer_gate())));
            assert_eq!(m.led_gate() == GateState::Suspended, a);
            assert_eq!(m.buzzer_gate() == GateState::Suspended, b);
        }
    }
}
