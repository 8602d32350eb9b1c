//! # GateOS Firmware
//!
//! Wires the three tasks to the board and starts the scheduler.
//!
//! | Task | Body | Gated by |
//! |------|------|----------|
//! | `LED_Task` | RGB cycle | button A |
//! | `Buzzer_Task` | 100 ms beep per second | button B |
//! | `Button_Task` | polls both buttons every 100 ms | |
//!
//! ## Wiring (micro:bit v2)
//!
//! | Signal | nRF52833 pin | Where |
//! |--------|--------------|-------|
//! | Red | P0.02 | edge pad 0, external LED |
//! | Green | P0.03 | edge pad 1, external LED |
//! | Blue | P0.04 | edge pad 2, external LED |
//! | Buzzer | P1.02 | edge pin 16, external active buzzer |
//! | Button A | P0.14 | onboard |
//! | Button B | P0.23 | onboard |
//!
//! The RGB LED (common cathode) and the active buzzer have to be wired to the
//! edge connector; the buttons are the board's own. The onboard buttons are
//! active-low with external pull-ups, the internal pull-up is enabled as
//! well.
//!
//! Built for the host, the binary instead replays a scripted button
//! sequence through the simulator and prints what the outputs do.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod firmware {
    use cortex_m_rt::entry;
    use defmt_rtt as _;
    use panic_halt as _;

    use microbit::hal::gpio::{p0, p1, Input, Level, Output, Pin, PullUp, PushPull};

    use gateos::buzzer::PulseController;
    use gateos::config::{TASK_PRIORITY, TASK_STACK_WORDS};
    use gateos::io::{Button, OutputLine, RgbLed};
    use gateos::kernel;
    use gateos::led::CycleController;
    use gateos::monitor::{GatedTask, InputMonitor};
    use gateos::task::TaskConfig;

    type OutPin = Pin<Output<PushPull>>;
    type InPin = Pin<Input<PullUp>>;
    type Monitor = InputMonitor<'static, InPin, RgbLed<OutPin>, OutputLine<OutPin>>;

    /// Firmware entry point. Initializes the kernel, creates tasks, and
    /// starts the scheduler. Does not return.
    #[entry]
    fn main() -> ! {
        let cp = cortex_m::Peripherals::take().unwrap();
        let dp = microbit::pac::Peripherals::take().unwrap();
        let port0 = p0::Parts::new(dp.P0);
        let port1 = p1::Parts::new(dp.P1);

        // --- Pins ---

        let red = port0.p0_02.into_push_pull_output(Level::Low).degrade();
        let green = port0.p0_03.into_push_pull_output(Level::Low).degrade();
        let blue = port0.p0_04.into_push_pull_output(Level::Low).degrade();
        let buzzer = port1.p1_02.into_push_pull_output(Level::Low).degrade();
        let button_a = port0.p0_14.into_pullup_input().degrade();
        let button_b = port0.p0_23.into_pullup_input().degrade();

        let rgb: &'static RgbLed<OutPin> =
            cortex_m::singleton!(: RgbLed<OutPin> = RgbLed::new(red, green, blue)).unwrap();
        let line: &'static OutputLine<OutPin> =
            cortex_m::singleton!(: OutputLine<OutPin> = OutputLine::new(buzzer)).unwrap();

        kernel::init();

        // --- Create tasks ---

        let led_task = kernel::spawn(
            cortex_m::singleton!(: CycleController<'static, OutPin> = CycleController::new(rgb))
                .unwrap(),
            TaskConfig::new("LED_Task", TASK_PRIORITY, TASK_STACK_WORDS),
        )
        .expect("Failed to create LED_Task");

        let buzzer_task = kernel::spawn(
            cortex_m::singleton!(: PulseController<'static, OutPin> = PulseController::new(line))
                .unwrap(),
            TaskConfig::new("Buzzer_Task", TASK_PRIORITY, TASK_STACK_WORDS),
        )
        .expect("Failed to create Buzzer_Task");

        let monitor = InputMonitor::new(
            GatedTask::new("LED_Task", Button::new(button_a), led_task, rgb),
            GatedTask::new("Buzzer_Task", Button::new(button_b), buzzer_task, line),
        );
        kernel::spawn(
            cortex_m::singleton!(: Monitor = monitor).unwrap(),
            TaskConfig::new("Button_Task", TASK_PRIORITY, TASK_STACK_WORDS),
        )
        .expect("Failed to create Button_Task");

        // Start the scheduler. Does not return.
        kernel::start(cp)
    }
}

#[cfg(not(target_os = "none"))]
mod host {
    use gateos::buzzer::PulseController;
    use gateos::config::{TASK_PRIORITY, TASK_STACK_WORDS};
    use gateos::io::mock::{MockLevel, MockPin};
    use gateos::io::{Button, Color, OutputLine, RgbLed};
    use gateos::led::CycleController;
    use gateos::monitor::{GatedTask, InputMonitor};
    use gateos::sim::Simulation;
    use gateos::task::{TaskConfig, TaskState};

    const RUN_MS: u64 = 4000;
    /// Button hold windows, `(start, end)` in milliseconds.
    const HOLD_A: (u64, u64) = (1200, 2150);
    const HOLD_B: (u64, u64) = (2500, 3300);

    fn held((start, end): (u64, u64), now: u64) -> bool {
        (start..end).contains(&now)
    }

    fn color_name(rgb: &RgbLed<MockPin<'_>>) -> &'static str {
        Color::CYCLE
            .into_iter()
            .find(|&c| rgb.line(c).is_high())
            .map_or("off", |c| c.as_str())
    }

    fn state_name(state: Option<TaskState>) -> &'static str {
        state.map_or("?", |s| s.as_str())
    }

    pub fn run() {
        let rgb_levels = [MockLevel::new(false), MockLevel::new(false), MockLevel::new(false)];
        let buzzer_level = MockLevel::new(false);
        let button_a_level = MockLevel::new(true);
        let button_b_level = MockLevel::new(true);

        let [r, g, b] = &rgb_levels;
        let rgb = RgbLed::new(MockPin::new(r), MockPin::new(g), MockPin::new(b));
        let line = OutputLine::new(MockPin::new(&buzzer_level));

        let mut led = CycleController::new(&rgb);
        let mut buzzer = PulseController::new(&line);
        let mut sim = Simulation::new();
        let config = |name: &'static str| TaskConfig::new(name, TASK_PRIORITY, TASK_STACK_WORDS);
        let led_task = sim.spawn(&mut led, config("LED_Task")).expect("spawn LED_Task");
        let buzzer_task = sim
            .spawn(&mut buzzer, config("Buzzer_Task"))
            .expect("spawn Buzzer_Task");
        let mut monitor = InputMonitor::new(
            GatedTask::new("LED_Task", Button::new(MockPin::new(&button_a_level)), led_task, &rgb),
            GatedTask::new(
                "Buzzer_Task",
                Button::new(MockPin::new(&button_b_level)),
                buzzer_task,
                &line,
            ),
        );
        sim.spawn(&mut monitor, config("Button_Task"))
            .expect("spawn Button_Task");

        println!("button A held {:?} ms, button B held {:?} ms", HOLD_A, HOLD_B);
        println!("{:>6}  {:<6} {:<7} {:<10} {:<10}", "t(ms)", "led", "buzzer", "LED_Task", "Buzzer_Task");

        sim.start();
        let mut last = String::new();
        while sim.now_ms() < RUN_MS {
            let now = sim.now_ms();
            button_a_level.set(!held(HOLD_A, now));
            button_b_level.set(!held(HOLD_B, now));

            let row = format!(
                "{:<6} {:<7} {:<10} {:<10}",
                color_name(&rgb),
                if line.is_high() { "on" } else { "off" },
                state_name(sim.state(led_task)),
                state_name(sim.state(buzzer_task)),
            );
            if row != last {
                println!("{:>6}  {}", now, row);
                last = row;
            }
            sim.advance(1);
        }
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    host::run();
}
