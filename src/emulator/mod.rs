pub mod ascii_display;
pub mod basics;
pub mod cpu;
pub mod display;
pub mod error;
pub mod executor;
pub mod framebuffer;
pub mod program;
pub mod sound;
pub mod vm;
