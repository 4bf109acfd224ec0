use super::basics::{
    Address, Register, Value, FONT_OFFSET, FONT_SET, HIGH_FONT_OFFSET, HIGH_FONT_SET, KEY_COUNT,
    MAX_PROGRAM_SIZE, MEMORY_SIZE, PROGRAM_START,
};
use super::cpu::CpuState;
use super::display::{Display, NullDisplay};
use super::error::{MachineError, Result};
use super::framebuffer::{Framebuffer, Resolution};
use super::program::Instruction;
use super::sound::{Audio, Mute};
use crate::config::Config;
use rand::{Rng, RngCore};
use tracing::{debug, trace, warn};

/// What a single `step` did.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Step {
    Continue,
    Halted,
}

/// Holds the logic of a virtual machine in action: memory, registers,
/// timers, keys and the framebuffer, plus the collaborators frames and tones
/// are delivered to.
pub struct Machine {
    memory: [u8; MEMORY_SIZE],
    cpu: CpuState,
    framebuffer: Framebuffer,
    keys: [bool; KEY_COUNT],
    delay_timer: Value,
    sound_timer: Value,
    running: bool,
    rng: Box<dyn RngCore + Send>,
    display: Box<dyn Display + Send>,
    audio: Box<dyn Audio + Send>,
}

impl Machine {
    /// Creates a machine with fonts loaded, no program, and no frontend.
    pub fn new(rng: Box<dyn RngCore + Send>) -> Machine {
        let mut vm = Machine {
            memory: [0; MEMORY_SIZE],
            cpu: CpuState::new(),
            framebuffer: Framebuffer::new(),
            keys: [false; KEY_COUNT],
            delay_timer: Value(0),
            sound_timer: Value(0),
            running: true,
            rng,
            display: Box::new(NullDisplay),
            audio: Box::new(Mute),
        };
        vm.load_fonts();
        vm
    }

    fn load_fonts(&mut self) {
        let low = FONT_OFFSET as usize;
        self.memory[low..low + FONT_SET.len()].copy_from_slice(&FONT_SET);
        let high = HIGH_FONT_OFFSET as usize;
        self.memory[high..high + HIGH_FONT_SET.len()].copy_from_slice(&HIGH_FONT_SET);
    }

    pub fn from_config(config: &Config) -> Machine {
        Machine::new(config.rng())
    }

    pub fn with_display(mut self, display: Box<dyn Display + Send>) -> Machine {
        self.display = display;
        self
    }

    pub fn with_audio(mut self, audio: Box<dyn Audio + Send>) -> Machine {
        self.audio = audio;
        self
    }

    /// Copies a program to 0x200. Programs that do not fit are rejected
    /// before anything is written.
    pub fn load_program(&mut self, program: &[u8]) -> Result<()> {
        if program.len() > MAX_PROGRAM_SIZE {
            return Err(MachineError::ProgramTooLarge {
                size: program.len(),
                max_size: MAX_PROGRAM_SIZE,
            });
        }
        let start = PROGRAM_START as usize;
        self.memory[start..start + program.len()].copy_from_slice(program);
        debug!("loaded {} byte program", program.len());
        Ok(())
    }

    /// Restarts the program already in memory. Both font sets are written
    /// again, everything from 0x200 up is left alone.
    pub fn reset(&mut self) {
        self.load_fonts();
        self.cpu.reset();
        self.framebuffer.clear();
        self.keys = [false; KEY_COUNT];
        self.running = true;
        debug!("machine reset");
    }

    pub fn set_key(&mut self, key: u8, down: bool) {
        match self.keys.get_mut(key as usize) {
            Some(state) => *state = down,
            None => warn!("ignoring out of range key {:#X}", key),
        }
    }

    pub fn cpu(&self) -> &CpuState {
        &self.cpu
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn register(&self, index: u8) -> u8 {
        self.cpu.register(Register(index)).0
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer.0
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer.0
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Fetches, decodes and executes one instruction.
    pub fn step(&mut self) -> Result<Step> {
        if !self.running {
            return Ok(Step::Halted);
        }
        let pc = self.cpu.program_counter();
        let instruction =
            Instruction::from_16bit(self.memory[pc.index()], self.memory[pc.offset(1).index()]);
        self.cpu.advance();
        trace!("{:03X}: {:?}", pc.0, instruction);
        self.execute_instruction(instruction)?;
        Ok(if self.running {
            Step::Continue
        } else {
            Step::Halted
        })
    }

    /// One 60 Hz tick: count both timers down and deliver the frame if it
    /// changed.
    pub fn io_tick(&mut self) {
        if self.delay_timer.0 > 0 {
            self.delay_timer.0 -= 1;
        }
        if self.sound_timer.0 > 0 {
            self.sound_timer.0 -= 1;
            if self.sound_timer.0 == 0 {
                self.audio.tone();
            }
        }
        self.framebuffer.flush(self.display.as_mut());
    }

    fn reg(&self, reg: Register) -> u8 {
        self.cpu.register(reg).0
    }

    fn set_reg(&mut self, reg: Register, value: u8) {
        self.cpu.set_register(reg, Value(value));
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.cpu.advance();
        }
    }

    /// Stores the result, then the flag, so VF as a destination ends up
    /// holding the flag.
    fn set_with_flag(&mut self, reg: Register, value: u8, flag: bool) {
        self.set_reg(reg, value);
        self.cpu.set_vf(flag as u8);
    }

    fn key_down(&self, reg: Register) -> bool {
        self.keys[(self.reg(reg) & 0xF) as usize]
    }

    fn draw_sprite(&mut self, vx: Register, vy: Register, n: Value) {
        let x0 = self.reg(vx) as usize;
        let y0 = self.reg(vy) as usize;
        let base = self.cpu.register_i();
        let (width, height) = if n.0 == 0 && self.framebuffer.is_high_res() {
            (16, 16)
        } else {
            (8, n.0 as usize)
        };

        self.cpu.set_vf(0);
        let mut collision = false;
        for dy in 0..height {
            let row = if width == 8 {
                (self.memory[base.offset(dy as u16).index()] as u16) << 8
            } else {
                let at = base.offset(2 * dy as u16);
                u16::from_be_bytes([self.memory[at.index()], self.memory[at.offset(1).index()]])
            };
            for dx in 0..width {
                if row & (0x8000u16 >> dx) != 0 && !self.framebuffer.toggle(x0 + dx, y0 + dy) {
                    collision = true;
                }
            }
        }
        if collision {
            self.cpu.set_vf(1);
        }
    }

    /// Executes a single, already decoded instruction. The program counter
    /// must already point past it.
    pub fn execute_instruction(&mut self, instruction: Instruction) -> Result<()> {
        match instruction {
            // Flow control
            Instruction::Jump(addr) => self.cpu.jump(addr),
            Instruction::JumpOffset(addr) => {
                let target = addr.0 + self.reg(Register(0)) as u16;
                self.cpu.jump(Address(target));
            }
            Instruction::CallSubroutine(addr) => self.cpu.call(addr)?,
            Instruction::ReturnSubroutine => self.cpu.ret()?,
            Instruction::Exit => {
                debug!("program requested exit");
                self.running = false;
            }

            // Conditionals
            Instruction::SkipEqualConst(vx, n) => self.skip_if(self.reg(vx) == n.0),
            Instruction::SkipNotEqualConst(vx, n) => self.skip_if(self.reg(vx) != n.0),
            Instruction::SkipEqual(vx, vy) => self.skip_if(self.reg(vx) == self.reg(vy)),
            Instruction::SkipNotEqual(vx, vy) => self.skip_if(self.reg(vx) != self.reg(vy)),

            // Register arithmetic
            Instruction::SetConst(vx, n) => self.set_reg(vx, n.0),
            Instruction::AddConst(vx, n) => self.set_reg(vx, self.reg(vx).wrapping_add(n.0)),
            Instruction::Set(vx, vy) => self.set_reg(vx, self.reg(vy)),
            Instruction::Or(vx, vy) => self.set_reg(vx, self.reg(vx) | self.reg(vy)),
            Instruction::And(vx, vy) => self.set_reg(vx, self.reg(vx) & self.reg(vy)),
            Instruction::Xor(vx, vy) => self.set_reg(vx, self.reg(vx) ^ self.reg(vy)),
            Instruction::Add(vx, vy) => {
                let (sum, carry) = self.reg(vx).overflowing_add(self.reg(vy));
                self.set_with_flag(vx, sum, carry);
            }
            Instruction::Sub(vx, vy) => {
                let (a, b) = (self.reg(vx), self.reg(vy));
                self.set_with_flag(vx, a.wrapping_sub(b), a >= b);
            }
            Instruction::NegSub(vx, vy) => {
                let (a, b) = (self.reg(vx), self.reg(vy));
                self.set_with_flag(vx, b.wrapping_sub(a), b >= a);
            }
            // Both shifts read Vy, never Vx.
            Instruction::RightShift(vx, vy) => {
                let value = self.reg(vy);
                self.cpu.set_vf(value & 1);
                self.set_reg(vx, value >> 1);
            }
            Instruction::LeftShift(vx, vy) => {
                let value = self.reg(vy);
                self.cpu.set_vf(value >> 7);
                self.set_reg(vx, value << 1);
            }
            Instruction::Rand(vx, n) => {
                let random: u8 = self.rng.gen();
                self.set_reg(vx, random & n.0);
            }

            // Keys
            Instruction::SkipKey(vx) => self.skip_if(self.key_down(vx)),
            Instruction::SkipNotKey(vx) => self.skip_if(!self.key_down(vx)),
            Instruction::WaitKey(vx) => match self.keys.iter().position(|down| *down) {
                Some(key) => self.set_reg(vx, key as u8),
                None => self.cpu.rewind(),
            },

            // Graphics
            Instruction::ClearDisplay => self.framebuffer.clear(),
            Instruction::Draw(vx, vy, n) => self.draw_sprite(vx, vy, n),
            Instruction::ScrollDown(n) => self.framebuffer.scroll_down(n.0 as usize),
            Instruction::ScrollRight => self.framebuffer.scroll_right(4),
            Instruction::ScrollLeft => self.framebuffer.scroll_left(4),
            Instruction::LowResolution => {
                if self.framebuffer.set_resolution(Resolution::Low, self.display.as_mut()) {
                    debug!("switched to low resolution");
                }
            }
            Instruction::HighResolution => {
                if self.framebuffer.set_resolution(Resolution::High, self.display.as_mut()) {
                    debug!("switched to high resolution");
                }
            }
            Instruction::SpriteAddr(vx) => {
                let digit = self.reg(vx) as u16;
                self.cpu.set_register_i(Address(FONT_OFFSET + digit * 5));
            }
            Instruction::HighSpriteAddr(vx) => {
                let digit = self.reg(vx) as u16;
                self.cpu.set_register_i(Address(HIGH_FONT_OFFSET + digit * 10));
            }

            // Timers
            Instruction::GetDelayTimer(vx) => self.set_reg(vx, self.delay_timer.0),
            Instruction::SetDelayTimer(vx) => self.delay_timer = self.cpu.register(vx),
            Instruction::SetSoundTimer(vx) => self.sound_timer = self.cpu.register(vx),

            // I register and memory
            Instruction::SetI(addr) => self.cpu.set_register_i(addr),
            Instruction::AddToI(vx) => {
                let sum = self.cpu.register_i().0 as u32 + self.reg(vx) as u32;
                self.cpu.set_register_i(Address(sum as u16));
                self.cpu.set_vf((sum > 0xFFF) as u8);
            }
            Instruction::Decimal(vx) => {
                let value = self.reg(vx);
                let i = self.cpu.register_i();
                self.memory[i.index()] = value / 100;
                self.memory[i.offset(1).index()] = value / 10 % 10;
                self.memory[i.offset(2).index()] = value % 10;
            }
            Instruction::StoreRegisters(vx) => {
                for r in 0..=vx.0 {
                    let i = self.cpu.register_i();
                    self.memory[i.index()] = self.reg(Register(r));
                    self.cpu.set_register_i(Address(i.0.wrapping_add(1)));
                }
            }
            Instruction::LoadRegisters(vx) => {
                for r in 0..=vx.0 {
                    let i = self.cpu.register_i();
                    self.set_reg(Register(r), self.memory[i.index()]);
                    self.cpu.set_register_i(Address(i.0.wrapping_add(1)));
                }
            }
            Instruction::SaveFlags(vx) => {
                for r in 0..=vx.0 {
                    self.cpu.set_user_flag(r as usize, self.cpu.register(Register(r)));
                }
            }
            Instruction::RestoreFlags(vx) => {
                for r in 0..=vx.0 {
                    self.cpu.set_register(Register(r), self.cpu.user_flag(r as usize));
                }
            }

            Instruction::Unknown(opcode) => {
                warn!(
                    "unknown opcode {:04X} at {:03X}, skipping",
                    opcode,
                    self.cpu.program_counter().0.wrapping_sub(2) & 0xFFF
                );
            }
        }
        Ok(())
    }
}
