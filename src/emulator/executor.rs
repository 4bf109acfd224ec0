use super::basics::KEY_COUNT;
use super::error::Result;
use super::vm::{Machine, Step};
use crate::config::Config;
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};

/// Counts how many whole I/O periods have passed. Leftover time carries into
/// the next call; it can never go below zero.
#[derive(Clone, Debug)]
pub struct IoClock {
    period: Duration,
    accumulated: Duration,
}

impl IoClock {
    pub fn new(period: Duration) -> IoClock {
        IoClock {
            period,
            accumulated: Duration::ZERO,
        }
    }

    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulated += elapsed;
        let mut ticks = 0;
        while self.accumulated >= self.period {
            self.accumulated -= self.period;
            ticks += 1;
        }
        ticks
    }

    pub fn pending(&self) -> Duration {
        self.accumulated
    }
}

#[derive(Debug, Default)]
struct Controls {
    keys: [bool; KEY_COUNT],
    reset_requested: bool,
    stop_requested: bool,
    cpu_period: Option<Option<Duration>>,
}

/// The presentation side's way into a running executor. Every request is
/// picked up between two opcodes, never in the middle of one.
#[derive(Clone, Debug, Default)]
pub struct ControlHandle(Arc<Mutex<Controls>>);

impl ControlHandle {
    fn lock(&self) -> MutexGuard<'_, Controls> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_key(&self, key: u8, down: bool) {
        match self.lock().keys.get_mut(key as usize) {
            Some(state) => *state = down,
            None => warn!("ignoring out of range key {:#X}", key),
        }
    }

    pub fn release_all(&self) {
        self.lock().keys = [false; KEY_COUNT];
    }

    pub fn request_reset(&self) {
        let mut controls = self.lock();
        controls.reset_requested = true;
        controls.keys = [false; KEY_COUNT];
    }

    pub fn stop(&self) {
        self.lock().stop_requested = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stop_requested
    }

    /// `None` removes the throttle entirely.
    pub fn set_cpu_frequency(&self, hz: Option<u32>) {
        self.lock().cpu_period = Some(hz.map(|hz| Duration::from_secs(1) / hz.max(1)));
    }
}

/// Why `Executor::run` returned.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Exit {
    Stopped,
    Halted,
}

/// Drives a machine at two rates: opcodes as fast as the CPU period allows,
/// timers and redraws at the fixed I/O period.
pub struct Executor {
    machine: Machine,
    cpu_period: Option<Duration>,
    clock: IoClock,
    controls: ControlHandle,
}

impl Executor {
    pub fn new(machine: Machine, config: &Config) -> Executor {
        Executor {
            machine,
            cpu_period: config.cpu_period(),
            clock: IoClock::new(config.io_period()),
            controls: ControlHandle::default(),
        }
    }

    pub fn controls(&self) -> ControlHandle {
        self.controls.clone()
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn into_machine(self) -> Machine {
        self.machine
    }

    /// Applies queued requests. Returns false once a stop was requested.
    fn sync_controls(&mut self) -> bool {
        let mut controls = self.controls.lock();
        if controls.stop_requested {
            return false;
        }
        if controls.reset_requested {
            controls.reset_requested = false;
            self.machine.reset();
        }
        for (key, down) in controls.keys.iter().enumerate() {
            self.machine.set_key(key as u8, *down);
        }
        if let Some(period) = controls.cpu_period.take() {
            debug!("cpu period now {:?}", period);
            self.cpu_period = period;
        }
        true
    }

    /// Runs one opcode, then as many I/O ticks as `elapsed` makes due.
    pub fn cycle(&mut self, elapsed: Duration) -> Result<Step> {
        let step = self.machine.step()?;
        for _ in 0..self.clock.advance(elapsed) {
            self.machine.io_tick();
        }
        Ok(step)
    }

    /// Runs until the program halts, a stop is requested, or the machine
    /// reports an error.
    pub fn run(&mut self) -> Result<Exit> {
        info!("executor started");
        let mut last = Instant::now();
        let exit = loop {
            if !self.sync_controls() {
                break Exit::Stopped;
            }
            let now = Instant::now();
            let step = match self.cycle(now - last) {
                Ok(step) => step,
                Err(err) => {
                    info!("executor stopped: {}", err);
                    return Err(err);
                }
            };
            last = now;
            if step == Step::Halted {
                break Exit::Halted;
            }
            if let Some(period) = self.cpu_period {
                thread::sleep(period);
            }
        };
        info!("executor stopped: {:?}", exit);
        Ok(exit)
    }

    /// Moves the executor onto its own thread. The machine comes back with
    /// the result so callers can inspect its final state.
    pub fn spawn(mut self) -> JoinHandle<(Result<Exit>, Machine)> {
        thread::spawn(move || {
            let result = self.run();
            (result, self.machine)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::display::SharedFrame;
    use crate::emulator::error::MachineError;
    use rand::rngs::mock::StepRng;

    fn executor(program: &[u16]) -> Executor {
        let bytes: Vec<u8> = program.iter().flat_map(|op| op.to_be_bytes()).collect();
        let mut machine = Machine::new(Box::new(StepRng::new(0, 1)));
        machine.load_program(&bytes).unwrap();
        let config = Config {
            cpu_frequency: None,
            ..Config::default()
        };
        Executor::new(machine, &config)
    }

    #[test]
    fn test_io_clock_carries_remainder() {
        let mut clock = IoClock::new(Duration::from_millis(10));
        assert_eq!(clock.advance(Duration::from_millis(4)), 0);
        assert_eq!(clock.advance(Duration::from_millis(7)), 1);
        assert_eq!(clock.pending(), Duration::from_millis(1));
        assert_eq!(clock.advance(Duration::from_millis(35)), 3);
        assert_eq!(clock.pending(), Duration::from_millis(6));
        assert_eq!(clock.advance(Duration::ZERO), 0);
    }

    #[test]
    fn test_io_clock_exact_period_fires() {
        let mut clock = IoClock::new(Duration::from_millis(10));
        assert_eq!(clock.advance(Duration::from_millis(10)), 1);
        assert_eq!(clock.pending(), Duration::ZERO);
    }

    #[test]
    fn test_cycle_runs_due_ticks() {
        // Delay timer = 5, then spin.
        let mut exec = executor(&[0x6005, 0xF015, 0x1204]);
        let period = Duration::from_secs(1) / 60;
        exec.cycle(Duration::ZERO).unwrap();
        exec.cycle(Duration::ZERO).unwrap();
        assert_eq!(exec.machine().delay_timer(), 5);
        exec.cycle(period * 3).unwrap();
        assert_eq!(exec.machine().delay_timer(), 2);
        exec.cycle(period / 2).unwrap();
        assert_eq!(exec.machine().delay_timer(), 2);
        exec.cycle(period).unwrap();
        assert_eq!(exec.machine().delay_timer(), 1);
    }

    #[test]
    fn test_run_until_halt() {
        let mut exec = executor(&[0x6001, 0x00FD]);
        assert_eq!(exec.run(), Ok(Exit::Halted));
        assert_eq!(exec.machine().register(0), 1);
    }

    #[test]
    fn test_run_reports_stack_errors() {
        let mut exec = executor(&[0x00EE]);
        assert_eq!(exec.run(), Err(MachineError::StackUnderflow { pc: 0x200 }));
    }

    #[test]
    fn test_stop_from_another_thread() {
        let exec = executor(&[0x1200]);
        let controls = exec.controls();
        let handle = exec.spawn();
        thread::sleep(Duration::from_millis(20));
        controls.stop();
        let (result, machine) = handle.join().unwrap();
        assert_eq!(result, Ok(Exit::Stopped));
        assert_eq!(machine.cpu().program_counter().0, 0x200);
    }

    #[test]
    fn test_keys_and_reset_are_delivered() {
        // Wait for a key into V5, then spin.
        let mut exec = executor(&[0xF50A, 0x1202]);
        let controls = exec.controls();
        assert!(exec.sync_controls());
        exec.cycle(Duration::ZERO).unwrap();
        assert_eq!(exec.machine().cpu().program_counter().0, 0x200);

        controls.set_key(0x9, true);
        assert!(exec.sync_controls());
        exec.cycle(Duration::ZERO).unwrap();
        assert_eq!(exec.machine().register(5), 0x9);

        controls.request_reset();
        assert!(exec.sync_controls());
        assert_eq!(exec.machine().register(5), 0);
        assert_eq!(exec.machine().cpu().program_counter().0, 0x200);

        controls.stop();
        assert!(!exec.sync_controls());
        assert!(controls.is_stopped());
    }

    #[test]
    fn test_frames_reach_shared_display() {
        let frame = SharedFrame::new();
        let bytes = [0xA0, 0x00, 0xD0, 0x05, 0x12, 0x04];
        let mut machine =
            Machine::new(Box::new(StepRng::new(0, 1))).with_display(Box::new(frame.clone()));
        machine.load_program(&bytes).unwrap();
        let mut exec = Executor::new(machine, &Config::default());
        exec.cycle(Duration::ZERO).unwrap();
        exec.cycle(Duration::ZERO).unwrap();
        assert_eq!(frame.generation(), 0);
        exec.cycle(Duration::from_millis(17)).unwrap();
        assert_eq!(frame.generation(), 1);
        assert_ne!(frame.snapshot().pixels[0], 0);
    }

    #[test]
    fn test_out_of_range_key_is_ignored() {
        let controls = ControlHandle::default();
        controls.set_key(0x3, true);
        controls.set_key(KEY_COUNT as u8, true);
        let mut expected = [false; KEY_COUNT];
        expected[0x3] = true;
        assert_eq!(controls.lock().keys, expected);
    }

    #[test]
    fn test_speed_change_is_picked_up() {
        let mut exec = executor(&[0x1200]);
        exec.controls().set_cpu_frequency(Some(500));
        exec.sync_controls();
        assert_eq!(exec.cpu_period, Some(Duration::from_millis(2)));
        exec.controls().set_cpu_frequency(None);
        exec.sync_controls();
        assert_eq!(exec.cpu_period, None);
    }
}
