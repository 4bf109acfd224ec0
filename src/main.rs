use anyhow::{anyhow, bail, Context};
use clap::Parser;
use schip8::config::DEFAULT_CPU_FREQUENCY;
use schip8::emulator::ascii_display;
use schip8::emulator::sound::Bell;
use schip8::{Config, Executor, Exit, KeyLayout, Machine, SharedFrame};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "schip8", about = "Run a CHIP-8 / SUPER-CHIP program")]
struct Cli {
    /// Program image, loaded at 0x200
    rom: PathBuf,

    /// Opcodes executed per second
    #[arg(long, default_value_t = DEFAULT_CPU_FREQUENCY)]
    speed: u32,

    /// Execute opcodes as fast as the host allows
    #[arg(long)]
    unthrottled: bool,

    /// Seed for the random number opcode
    #[arg(long)]
    seed: Option<u64>,

    /// Keyboard layout for the hex keypad
    #[arg(long, value_enum, default_value_t = KeyLayout::Qwerty)]
    layout: KeyLayout,

    /// Run without a window for this many seconds, then print the screen
    #[arg(long, value_name = "SECONDS")]
    headless: Option<f64>,

    /// Keys held down for the whole headless run
    #[arg(long, default_value = "")]
    hold: String,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            cpu_frequency: if self.unthrottled {
                None
            } else {
                Some(self.speed)
            },
            seed: self.seed,
            layout: self.layout,
            ..Config::default()
        }
    }
}

fn run_headless(
    executor: Executor,
    layout: KeyLayout,
    hold: &str,
    duration: Duration,
) -> anyhow::Result<()> {
    let controls = executor.controls();
    for c in hold.chars() {
        match layout.key_for(c) {
            Some(key) => controls.set_key(key, true),
            None => bail!("'{}' is not a key in the {:?} layout", c, layout),
        }
    }

    let handle = executor.spawn();
    let deadline = Instant::now() + duration;
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    controls.stop();

    let (result, machine) = handle
        .join()
        .map_err(|_| anyhow!("executor thread panicked"))?;
    let exit = result?;
    println!("{}", ascii_display::render_framebuffer(machine.framebuffer()));
    match exit {
        Exit::Halted => info!("program exited"),
        Exit::Stopped => info!("stopped after {:?}", duration),
    }
    Ok(())
}

#[cfg(feature = "visualizer")]
fn run_windowed(executor: Executor, frame: SharedFrame, config: Config) -> anyhow::Result<()> {
    let controls = executor.controls();
    let handle = executor.spawn();
    schip8::visualizer::Visualizer::new(frame, controls.clone(), config).run();
    controls.stop();

    let (result, _machine) = handle
        .join()
        .map_err(|_| anyhow!("executor thread panicked"))?;
    if result? == Exit::Halted {
        info!("program exited");
    }
    Ok(())
}

#[cfg(not(feature = "visualizer"))]
fn run_windowed(_executor: Executor, _frame: SharedFrame, _config: Config) -> anyhow::Result<()> {
    bail!("built without the `visualizer` feature, pass --headless <SECONDS>")
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("schip8=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    let program = std::fs::read(&cli.rom)
        .with_context(|| format!("failed to read {}", cli.rom.display()))?;
    let frame = SharedFrame::new();
    let mut machine = Machine::from_config(&config)
        .with_display(Box::new(frame.clone()))
        .with_audio(Box::new(Bell));
    machine
        .load_program(&program)
        .with_context(|| format!("failed to load {}", cli.rom.display()))?;
    info!("loaded {} ({} bytes)", cli.rom.display(), program.len());

    let executor = Executor::new(machine, &config);
    match cli.headless {
        Some(seconds) => run_headless(
            executor,
            config.layout,
            &cli.hold,
            Duration::from_secs_f64(seconds.max(0.0)),
        ),
        None => run_windowed(executor, frame, config),
    }
}
