//! # Buzzer task
//!
//! Beeps for `BUZZER_ON_MS` once every `BUZZER_ON_MS + BUZZER_OFF_MS`.

use core::convert::Infallible;

use embedded_hal::digital::StatefulOutputPin;

use crate::config::{BUZZER_OFF_MS, BUZZER_ON_MS};
use crate::io::OutputLine;
use crate::task::{PeriodicTask, TaskControl};

/// Which half of the duty cycle the next activation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    On,
    Off,
}

/// Body of the buzzer task: drive high and hold, drive low and hold, repeat.
pub struct PulseController<'a, P> {
    line: &'a OutputLine<P>,
    phase: Phase,
}

impl<'a, P> PulseController<'a, P>
where
    P: StatefulOutputPin<Error = Infallible>,
{
    pub fn new(line: &'a OutputLine<P>) -> Self {
        Self {
            line,
            phase: Phase::On,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }
}

impl<P> PeriodicTask for PulseController<'_, P>
where
    P: StatefulOutputPin<Error = Infallible>,
{
    fn activate(&mut self, _control: &mut dyn TaskControl) -> u32 {
        match self.phase {
            Phase::On => {
                self.line.write(true);
                self.phase = Phase::Off;
                BUZZER_ON_MS
            }
            Phase::Off => {
                self.line.set_low();
                self.phase = Phase::On;
                BUZZER_OFF_MS
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::io::mock::{MockLevel, MockPin};
    use crate::task::TaskHandle;

    struct NoControl;

    impl TaskControl for NoControl {
        fn suspend(&mut self, _task: TaskHandle) -> Result<()> {
            Ok(())
        }

        fn resume(&mut self, _task: TaskHandle) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_duty_cycle() {
        let level = MockLevel::new(false);
        let line = OutputLine::new(MockPin::new(&level));
        let mut task = PulseController::new(&line);

        assert_eq!(task.activate(&mut NoControl), BUZZER_ON_MS);
        assert!(level.get());
        assert_eq!(task.activate(&mut NoControl), BUZZER_OFF_MS);
        assert!(!level.get());
        assert_eq!(task.phase(), Phase::On);
        assert_eq!(BUZZER_ON_MS * 10, BUZZER_ON_MS + BUZZER_OFF_MS);
    }

    #[test]
    fn test_phase_survives_forced_off() {
        let level = MockLevel::new(false);
        let line = OutputLine::new(MockPin::new(&level));
        let mut task = PulseController::new(&line);

        task.activate(&mut NoControl);
        line.set_low();
        assert_eq!(task.phase(), Phase::Off);

        // Finishing the interrupted pulse keeps the line low.
        assert_eq!(task.activate(&mut NoControl), BUZZER_OFF_MS);
        assert!(!level.get());
    }
}
