use thiserror::Error;

pub type Result<T> = std::result::Result<T, MachineError>;

/// Failures surfaced to whoever embeds the machine. Unknown opcodes are not
/// part of this: they are logged and skipped.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum MachineError {
    #[error("program is too large ({size} bytes), at most {max_size} bytes fit in memory")]
    ProgramTooLarge { size: usize, max_size: usize },

    /// `pc` is the address of the call that would have nested too deep.
    #[error("call stack overflow at {pc:#05X}")]
    StackOverflow { pc: u16 },

    /// `pc` is the address of the return that found the stack empty.
    #[error("return with empty call stack at {pc:#05X}")]
    StackUnderflow { pc: u16 },
}
