use super::basics::{
    Address, Register, Value, FLAG_REGISTER, PROGRAM_START, REGISTER_COUNT, STACK_DEPTH,
    USER_FLAG_COUNT,
};
use super::error::{MachineError, Result};
use arrayvec::ArrayVec;

/// The register file: V0-VF, I, the program counter, the call stack and the
/// persistent user flags.
#[derive(Clone, Debug)]
pub struct CpuState {
    registers: [Value; REGISTER_COUNT],
    register_i: Address,
    program_counter: Address,
    stack: ArrayVec<Address, STACK_DEPTH>,
    user_flags: [Value; USER_FLAG_COUNT],
}

impl Default for CpuState {
    fn default() -> Self {
        CpuState::new()
    }
}

impl CpuState {
    pub fn new() -> CpuState {
        CpuState {
            registers: [Value(0); REGISTER_COUNT],
            register_i: Address(0),
            program_counter: Address(PROGRAM_START),
            stack: ArrayVec::new(),
            user_flags: [Value(0); USER_FLAG_COUNT],
        }
    }

    /// Puts everything back to power-on state except the user flags.
    pub fn reset(&mut self) {
        let user_flags = self.user_flags;
        *self = CpuState::new();
        self.user_flags = user_flags;
    }

    pub fn program_counter(&self) -> Address {
        self.program_counter
    }

    pub fn register_i(&self) -> Address {
        self.register_i
    }

    pub fn set_register_i(&mut self, addr: Address) {
        self.register_i = addr;
    }

    pub fn register(&self, reg: Register) -> Value {
        self.registers[(reg.0 & 0xF) as usize]
    }

    pub fn set_register(&mut self, reg: Register, value: Value) {
        self.registers[(reg.0 & 0xF) as usize] = value;
    }

    pub fn set_vf(&mut self, value: u8) {
        self.set_register(FLAG_REGISTER, Value(value));
    }

    pub fn user_flag(&self, index: usize) -> Value {
        self.user_flags[index]
    }

    pub fn set_user_flag(&mut self, index: usize, value: Value) {
        self.user_flags[index] = value;
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn advance(&mut self) {
        self.program_counter = self.program_counter.offset(2);
    }

    /// Steps back over the instruction just fetched so it runs again.
    pub fn rewind(&mut self) {
        self.program_counter = Address(self.program_counter.0.wrapping_sub(2)).masked();
    }

    pub fn jump(&mut self, addr: Address) {
        self.program_counter = addr.masked();
    }

    /// Pushes the return address and jumps. Must be called after `advance()`
    /// for the call instruction, so the pushed address is the one after it.
    pub fn call(&mut self, addr: Address) -> Result<()> {
        if self.stack.try_push(self.program_counter).is_err() {
            return Err(MachineError::StackOverflow {
                pc: self.current_instruction().0,
            });
        }
        self.jump(addr);
        Ok(())
    }

    pub fn ret(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(addr) => {
                self.jump(addr);
                Ok(())
            }
            None => Err(MachineError::StackUnderflow {
                pc: self.current_instruction().0,
            }),
        }
    }

    fn current_instruction(&self) -> Address {
        Address(self.program_counter.0.wrapping_sub(2)).masked()
    }
}
