//! A CHIP-8 / SUPER-CHIP virtual machine.
//!
//! [`Machine`] executes programs one opcode at a time; [`Executor`] drives it
//! against a real clock with 60 Hz timers and redraws. Rendering, audio and
//! input stay outside: frames go to a [`Display`], tones to an [`Audio`], and
//! key state comes in through [`Machine::set_key`] or a [`ControlHandle`].

pub mod config;
pub mod emulator;
#[cfg(feature = "visualizer")]
pub mod visualizer;

pub use config::{Config, KeyLayout};
pub use emulator::display::{Display, Frame, SharedFrame};
pub use emulator::error::{MachineError, Result};
pub use emulator::executor::{ControlHandle, Executor, Exit};
pub use emulator::framebuffer::Resolution;
pub use emulator::sound::Audio;
pub use emulator::vm::{Machine, Step};
