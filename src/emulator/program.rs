use super::basics::{Address, Register, Value};

/// One decoded instruction word. Everything the machine can execute has a
/// variant here; words that decode to nothing known end up in `Unknown`.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Instruction {
    ClearDisplay,
    ReturnSubroutine,
    ScrollDown(Value),
    ScrollRight,
    ScrollLeft,
    Exit,
    LowResolution,
    HighResolution,
    Jump(Address),
    CallSubroutine(Address),
    SkipEqualConst(Register, Value),
    SkipNotEqualConst(Register, Value),
    SkipEqual(Register, Register),
    SkipNotEqual(Register, Register),
    SetConst(Register, Value),
    AddConst(Register, Value),
    Set(Register, Register),
    Or(Register, Register),
    And(Register, Register),
    Xor(Register, Register),
    Add(Register, Register),
    Sub(Register, Register),
    RightShift(Register, Register),
    NegSub(Register, Register),
    LeftShift(Register, Register),
    SetI(Address),
    JumpOffset(Address),
    Rand(Register, Value),
    Draw(Register, Register, Value),
    SkipKey(Register),
    SkipNotKey(Register),
    GetDelayTimer(Register),
    WaitKey(Register),
    SetDelayTimer(Register),
    SetSoundTimer(Register),
    AddToI(Register),
    SpriteAddr(Register),
    HighSpriteAddr(Register),
    Decimal(Register),
    StoreRegisters(Register),
    LoadRegisters(Register),
    SaveFlags(Register),
    RestoreFlags(Register),
    Unknown(u16),
}

macro_rules! NNN {
    ($x:expr) => {
        Address(($x.1 as u16) << 8 | ($x.2 as u16) << 4 | ($x.3 as u16))
    };
}

macro_rules! NN {
    ($x:expr) => {
        Value($x.2 << 4 | $x.3)
    };
}

macro_rules! N {
    ($x:expr) => {
        Value($x.3)
    };
}

macro_rules! X {
    ($x:expr) => {
        Register($x.1)
    };
}

macro_rules! Y {
    ($x:expr) => {
        Register($x.2)
    };
}

impl Instruction {
    pub fn from_16bit(a: u8, b: u8) -> Instruction {
        let nibbles = (a >> 4 & 0x0F, a & 0x0F, b >> 4 & 0x0F, b & 0x0F);
        match nibbles {
            // The system group is keyed on the low byte alone.
            (0, _, 0xC, _) => Instruction::ScrollDown(N!(nibbles)),
            (0, _, 0xE, 0x0) => Instruction::ClearDisplay,
            (0, _, 0xE, 0xE) => Instruction::ReturnSubroutine,
            (0, _, 0xF, 0xB) => Instruction::ScrollRight,
            (0, _, 0xF, 0xC) => Instruction::ScrollLeft,
            (0, _, 0xF, 0xD) => Instruction::Exit,
            (0, _, 0xF, 0xE) => Instruction::LowResolution,
            (0, _, 0xF, 0xF) => Instruction::HighResolution,
            (0x1, _, _, _) => Instruction::Jump(NNN!(nibbles)),
            (0x2, _, _, _) => Instruction::CallSubroutine(NNN!(nibbles)),
            (0x3, _, _, _) => Instruction::SkipEqualConst(X!(nibbles), NN!(nibbles)),
            (0x4, _, _, _) => Instruction::SkipNotEqualConst(X!(nibbles), NN!(nibbles)),
            (0x5, _, _, _) => Instruction::SkipEqual(X!(nibbles), Y!(nibbles)),
            (0x6, _, _, _) => Instruction::SetConst(X!(nibbles), NN!(nibbles)),
            (0x7, _, _, _) => Instruction::AddConst(X!(nibbles), NN!(nibbles)),
            (0x8, _, _, 0x0) => Instruction::Set(X!(nibbles), Y!(nibbles)),
            (0x8, _, _, 0x1) => Instruction::Or(X!(nibbles), Y!(nibbles)),
            (0x8, _, _, 0x2) => Instruction::And(X!(nibbles), Y!(nibbles)),
            (0x8, _, _, 0x3) => Instruction::Xor(X!(nibbles), Y!(nibbles)),
            (0x8, _, _, 0x4) => Instruction::Add(X!(nibbles), Y!(nibbles)),
            (0x8, _, _, 0x5) => Instruction::Sub(X!(nibbles), Y!(nibbles)),
            (0x8, _, _, 0x6) => Instruction::RightShift(X!(nibbles), Y!(nibbles)),
            (0x8, _, _, 0x7) => Instruction::NegSub(X!(nibbles), Y!(nibbles)),
            (0x8, _, _, 0xE) => Instruction::LeftShift(X!(nibbles), Y!(nibbles)),
            (0x9, _, _, _) => Instruction::SkipNotEqual(X!(nibbles), Y!(nibbles)),
            (0xA, _, _, _) => Instruction::SetI(NNN!(nibbles)),
            (0xB, _, _, _) => Instruction::JumpOffset(NNN!(nibbles)),
            (0xC, _, _, _) => Instruction::Rand(X!(nibbles), NN!(nibbles)),
            (0xD, _, _, _) => Instruction::Draw(X!(nibbles), Y!(nibbles), N!(nibbles)),
            (0xE, _, 0x9, 0xE) => Instruction::SkipKey(X!(nibbles)),
            (0xE, _, 0xA, 0x1) => Instruction::SkipNotKey(X!(nibbles)),
            (0xF, _, 0x0, 0x7) => Instruction::GetDelayTimer(X!(nibbles)),
            (0xF, _, 0x0, 0xA) => Instruction::WaitKey(X!(nibbles)),
            (0xF, _, 0x1, 0x5) => Instruction::SetDelayTimer(X!(nibbles)),
            (0xF, _, 0x1, 0x8) => Instruction::SetSoundTimer(X!(nibbles)),
            (0xF, _, 0x1, 0xE) => Instruction::AddToI(X!(nibbles)),
            (0xF, _, 0x2, 0x9) => Instruction::SpriteAddr(X!(nibbles)),
            (0xF, _, 0x3, 0x0) => Instruction::HighSpriteAddr(X!(nibbles)),
            (0xF, _, 0x3, 0x3) => Instruction::Decimal(X!(nibbles)),
            (0xF, _, 0x5, 0x5) => Instruction::StoreRegisters(X!(nibbles)),
            (0xF, _, 0x6, 0x5) => Instruction::LoadRegisters(X!(nibbles)),
            (0xF, _, 0x7, 0x5) => Instruction::SaveFlags(X!(nibbles)),
            (0xF, _, 0x8, 0x5) => Instruction::RestoreFlags(X!(nibbles)),
            _ => Instruction::Unknown(u16::from_be_bytes([a, b])),
        }
    }

    pub fn decode(word: u16) -> Instruction {
        let [a, b] = word.to_be_bytes();
        Instruction::from_16bit(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_system_group() {
        assert_eq!(Instruction::decode(0x00E0), Instruction::ClearDisplay);
        assert_eq!(Instruction::decode(0x00EE), Instruction::ReturnSubroutine);
        assert_eq!(Instruction::decode(0x00C7), Instruction::ScrollDown(Value(7)));
        assert_eq!(Instruction::decode(0x00FB), Instruction::ScrollRight);
        assert_eq!(Instruction::decode(0x00FC), Instruction::ScrollLeft);
        assert_eq!(Instruction::decode(0x00FD), Instruction::Exit);
        assert_eq!(Instruction::decode(0x00FE), Instruction::LowResolution);
        assert_eq!(Instruction::decode(0x00FF), Instruction::HighResolution);
        assert_eq!(Instruction::decode(0x0000), Instruction::Unknown(0x0000));
        assert_eq!(Instruction::decode(0x0123), Instruction::Unknown(0x0123));
    }

    #[test]
    fn test_decode_operand_fields() {
        assert_eq!(Instruction::decode(0x1ABC), Instruction::Jump(Address(0xABC)));
        assert_eq!(
            Instruction::decode(0x3A42),
            Instruction::SkipEqualConst(Register(0xA), Value(0x42))
        );
        assert_eq!(
            Instruction::decode(0x8126),
            Instruction::RightShift(Register(1), Register(2))
        );
        assert_eq!(
            Instruction::decode(0xD12F),
            Instruction::Draw(Register(1), Register(2), Value(0xF))
        );
        assert_eq!(Instruction::decode(0xF730), Instruction::HighSpriteAddr(Register(7)));
    }

    #[test]
    fn test_decode_misses_inside_known_groups() {
        assert_eq!(Instruction::decode(0x8008), Instruction::Unknown(0x8008));
        assert_eq!(Instruction::decode(0xE1A2), Instruction::Unknown(0xE1A2));
        assert_eq!(Instruction::decode(0xF1FF), Instruction::Unknown(0xF1FF));
    }
}
