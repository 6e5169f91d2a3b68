#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// Represents a single instruction of the stack machine.
///
/// Operand-bearing variants carry their operand inline. `Push` holds the raw
/// 8 byte pattern, which is either a two's complement integer or the bits of an
/// IEEE double.
pub enum Instruction {
    Nop,
    /// Pushes an 8 byte immediate.
    Push(u64),
    Pop,
    /// Pops the given number of slots.
    PopN(u32),
    Dup,
    /// Pushes the address of a local slot of the current frame.
    LocA(u32),
    /// Pushes the address of an argument slot of the current frame.
    ArgA(u32),
    /// Pushes the address of a global variable.
    GlobA(u32),
    Load8,
    Load16,
    Load32,
    Load64,
    Store8,
    Store16,
    Store32,
    Store64,
    Alloc,
    Free,
    /// Reserves the given number of slots on the stack.
    StackAlloc(u32),
    AddI,
    SubI,
    MulI,
    DivI,
    AddF,
    SubF,
    MulF,
    DivF,
    DivU,
    Shl,
    Shr,
    And,
    Or,
    Xor,
    Not,
    Inv,
    /// Compares two integers, pushing -1, 0 or 1.
    CmpI,
    CmpU,
    /// Compares two doubles, pushing -1, 0 or 1.
    CmpF,
    NegI,
    NegF,
    IToF,
    FToI,
    ShrL,
    SetLt,
    SetGt,
    /// Unconditional branch. The offset is relative to the next instruction.
    Br(i32),
    /// Branches when the top of the stack is zero.
    BrFalse(i32),
    /// Branches when the top of the stack is not zero.
    BrTrue(i32),
    /// Calls the function at the given global address.
    Call(u32),
    Ret,
    /// Calls the library function named by the global at the given address.
    CallName(u32),
    ScanI,
    ScanC,
    ScanF,
    PrintI,
    PrintC,
    PrintF,
    PrintS,
    PrintLn,
    Panic,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// The operand of an instruction together with its encoded width.
pub enum Operand {
    /// A 4 byte count, offset or address.
    U32(u32),
    /// A 4 byte signed branch offset.
    I32(i32),
    /// An 8 byte immediate.
    U64(u64),
}

impl Operand {
    /// The number of bytes the operand occupies when encoded.
    pub fn width(self) -> u8 {
        match self {
            Operand::U32(_) | Operand::I32(_) => 4,
            Operand::U64(_) => 8,
        }
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::U32(x) => write!(f, "{x}"),
            Operand::I32(x) => write!(f, "{x}"),
            Operand::U64(x) => write!(f, "{}", *x as i64),
        }
    }
}

/// Every instruction without an operand, used to build the decoding table.
const NULLARY: &[Instruction] = &[
    Instruction::Nop,
    Instruction::Pop,
    Instruction::Dup,
    Instruction::Load8,
    Instruction::Load16,
    Instruction::Load32,
    Instruction::Load64,
    Instruction::Store8,
    Instruction::Store16,
    Instruction::Store32,
    Instruction::Store64,
    Instruction::Alloc,
    Instruction::Free,
    Instruction::AddI,
    Instruction::SubI,
    Instruction::MulI,
    Instruction::DivI,
    Instruction::AddF,
    Instruction::SubF,
    Instruction::MulF,
    Instruction::DivF,
    Instruction::DivU,
    Instruction::Shl,
    Instruction::Shr,
    Instruction::And,
    Instruction::Or,
    Instruction::Xor,
    Instruction::Not,
    Instruction::Inv,
    Instruction::CmpI,
    Instruction::CmpU,
    Instruction::CmpF,
    Instruction::NegI,
    Instruction::NegF,
    Instruction::IToF,
    Instruction::FToI,
    Instruction::ShrL,
    Instruction::SetLt,
    Instruction::SetGt,
    Instruction::Ret,
    Instruction::ScanI,
    Instruction::ScanC,
    Instruction::ScanF,
    Instruction::PrintI,
    Instruction::PrintC,
    Instruction::PrintF,
    Instruction::PrintS,
    Instruction::PrintLn,
    Instruction::Panic,
];

impl Instruction {
    /// Creates a push of an integer immediate.
    pub fn push_int(x: i64) -> Instruction {
        Instruction::Push(x as u64)
    }

    /// Creates a push of a double immediate.
    pub fn push_double(x: f64) -> Instruction {
        Instruction::Push(x.to_bits())
    }

    /// Returns the assembly mnemonic of the instruction.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Instruction::Nop => "nop",
            Instruction::Push(_) => "push",
            Instruction::Pop => "pop",
            Instruction::PopN(_) => "popn",
            Instruction::Dup => "dup",
            Instruction::LocA(_) => "loca",
            Instruction::ArgA(_) => "arga",
            Instruction::GlobA(_) => "globa",
            Instruction::Load8 => "load_8",
            Instruction::Load16 => "load_16",
            Instruction::Load32 => "load_32",
            Instruction::Load64 => "load_64",
            Instruction::Store8 => "store_8",
            Instruction::Store16 => "store_16",
            Instruction::Store32 => "store_32",
            Instruction::Store64 => "store_64",
            Instruction::Alloc => "alloc",
            Instruction::Free => "free",
            Instruction::StackAlloc(_) => "stackalloc",
            Instruction::AddI => "add_i",
            Instruction::SubI => "sub_i",
            Instruction::MulI => "mul_i",
            Instruction::DivI => "div_i",
            Instruction::AddF => "add_f",
            Instruction::SubF => "sub_f",
            Instruction::MulF => "mul_f",
            Instruction::DivF => "div_f",
            Instruction::DivU => "div_u",
            Instruction::Shl => "shl",
            Instruction::Shr => "shr",
            Instruction::And => "and",
            Instruction::Or => "or",
            Instruction::Xor => "xor",
            Instruction::Not => "not",
            Instruction::Inv => "inv",
            Instruction::CmpI => "cmp_i",
            Instruction::CmpU => "cmp_u",
            Instruction::CmpF => "cmp_f",
            Instruction::NegI => "neg_i",
            Instruction::NegF => "neg_f",
            Instruction::IToF => "itof",
            Instruction::FToI => "ftoi",
            Instruction::ShrL => "shrl",
            Instruction::SetLt => "set_lt",
            Instruction::SetGt => "set_gt",
            Instruction::Br(_) => "br",
            Instruction::BrFalse(_) => "br_false",
            Instruction::BrTrue(_) => "br_true",
            Instruction::Call(_) => "call",
            Instruction::Ret => "ret",
            Instruction::CallName(_) => "callname",
            Instruction::ScanI => "scan_i",
            Instruction::ScanC => "scan_c",
            Instruction::ScanF => "scan_f",
            Instruction::PrintI => "print_i",
            Instruction::PrintC => "print_c",
            Instruction::PrintF => "print_f",
            Instruction::PrintS => "print_s",
            Instruction::PrintLn => "println",
            Instruction::Panic => "panic",
        }
    }

    /// Returns the opcode byte of the instruction in the binary encoding.
    pub fn opcode(self) -> u8 {
        match self {
            Instruction::Nop => 0x00,
            Instruction::Push(_) => 0x01,
            Instruction::Pop => 0x02,
            Instruction::PopN(_) => 0x03,
            Instruction::Dup => 0x04,
            Instruction::LocA(_) => 0x0a,
            Instruction::ArgA(_) => 0x0b,
            Instruction::GlobA(_) => 0x0c,
            Instruction::Load8 => 0x10,
            Instruction::Load16 => 0x11,
            Instruction::Load32 => 0x12,
            Instruction::Load64 => 0x13,
            Instruction::Store8 => 0x14,
            Instruction::Store16 => 0x15,
            Instruction::Store32 => 0x16,
            Instruction::Store64 => 0x17,
            Instruction::Alloc => 0x18,
            Instruction::Free => 0x19,
            Instruction::StackAlloc(_) => 0x1a,
            Instruction::AddI => 0x20,
            Instruction::SubI => 0x21,
            Instruction::MulI => 0x22,
            Instruction::DivI => 0x23,
            Instruction::AddF => 0x24,
            Instruction::SubF => 0x25,
            Instruction::MulF => 0x26,
            Instruction::DivF => 0x27,
            Instruction::DivU => 0x28,
            Instruction::Shl => 0x29,
            Instruction::Shr => 0x2a,
            Instruction::And => 0x2b,
            Instruction::Or => 0x2c,
            Instruction::Xor => 0x2d,
            Instruction::Not => 0x2e,
            Instruction::Inv => 0x2f,
            Instruction::CmpI => 0x30,
            Instruction::CmpU => 0x31,
            Instruction::CmpF => 0x32,
            Instruction::NegI => 0x34,
            Instruction::NegF => 0x35,
            Instruction::IToF => 0x36,
            Instruction::FToI => 0x37,
            Instruction::ShrL => 0x38,
            Instruction::SetLt => 0x39,
            Instruction::SetGt => 0x3a,
            Instruction::Br(_) => 0x41,
            Instruction::BrFalse(_) => 0x42,
            Instruction::BrTrue(_) => 0x43,
            Instruction::Call(_) => 0x48,
            Instruction::Ret => 0x49,
            Instruction::CallName(_) => 0x4a,
            Instruction::ScanI => 0x50,
            Instruction::ScanC => 0x51,
            Instruction::ScanF => 0x52,
            Instruction::PrintI => 0x54,
            Instruction::PrintC => 0x55,
            Instruction::PrintF => 0x56,
            Instruction::PrintS => 0x57,
            Instruction::PrintLn => 0x58,
            Instruction::Panic => 0xfe,
        }
    }

    /// Returns the operand of the instruction, if it has one.
    pub fn operand(self) -> Option<Operand> {
        match self {
            Instruction::Push(x) => Some(Operand::U64(x)),
            Instruction::PopN(x)
            | Instruction::LocA(x)
            | Instruction::ArgA(x)
            | Instruction::GlobA(x)
            | Instruction::StackAlloc(x)
            | Instruction::Call(x)
            | Instruction::CallName(x) => Some(Operand::U32(x)),
            Instruction::Br(x) | Instruction::BrFalse(x) | Instruction::BrTrue(x) => {
                Some(Operand::I32(x))
            }
            _ => None,
        }
    }

    /// The number of bytes the operand occupies when encoded; 0, 4 or 8.
    pub fn operand_width(self) -> u8 {
        self.operand().map(Operand::width).unwrap_or(0)
    }

    /// Rebuilds an instruction from its opcode byte and raw operand bits.
    ///
    /// The operand is ignored for instructions that do not take one. Returns
    /// `None` for an unknown opcode.
    pub fn from_parts(opcode: u8, operand: u64) -> Option<Instruction> {
        let x = operand as u32;
        let instruction = match opcode {
            0x01 => Instruction::Push(operand),
            0x03 => Instruction::PopN(x),
            0x0a => Instruction::LocA(x),
            0x0b => Instruction::ArgA(x),
            0x0c => Instruction::GlobA(x),
            0x1a => Instruction::StackAlloc(x),
            0x41 => Instruction::Br(x as i32),
            0x42 => Instruction::BrFalse(x as i32),
            0x43 => Instruction::BrTrue(x as i32),
            0x48 => Instruction::Call(x),
            0x4a => Instruction::CallName(x),
            _ => return NULLARY.iter().copied().find(|i| i.opcode() == opcode),
        };
        Some(instruction)
    }

    /// Returns `true` for the branch instructions whose operand is a relative
    /// offset.
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            Instruction::Br(_) | Instruction::BrFalse(_) | Instruction::BrTrue(_)
        )
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.operand() {
            Some(operand) => write!(f, "{} {operand}", self.mnemonic()),
            None => f.write_str(self.mnemonic()),
        }
    }
}
