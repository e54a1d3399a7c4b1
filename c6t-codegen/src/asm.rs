//! Intel 8080 Assembly Instruction Definitions
//!
//! The code generator computes into two 16-bit register pairs: HL (primary)
//! and DE (secondary). BC holds the frame pointer and SP the stack. Only the
//! subset of the instruction set the backend emits directly is modelled
//! here; templates carry everything else as recipe text.

use c6t_common::Word;
use std::fmt;

/// Compute register pairs available to expression evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reg {
    /// HL, the primary register; every expression result ends here
    Hl,
    /// DE, the secondary register
    De,
}

impl Reg {
    pub const ALL: [Reg; 2] = [Reg::Hl, Reg::De];

    /// Slot index of this register in per-node tables
    pub fn index(self) -> usize {
        match self {
            Reg::Hl => 0,
            Reg::De => 1,
        }
    }

    pub fn is_primary(self) -> bool {
        self == Reg::Hl
    }

    /// The 8080 register pair name used by `push`, `dad`, `inx` etc.
    pub fn pair(self) -> Pair {
        match self {
            Reg::Hl => Pair::H,
            Reg::De => Pair::D,
        }
    }

    /// High byte half of the pair
    pub fn high(self) -> Reg8 {
        match self {
            Reg::Hl => Reg8::H,
            Reg::De => Reg8::D,
        }
    }

    /// Low byte half of the pair
    pub fn low(self) -> Reg8 {
        match self {
            Reg::Hl => Reg8::L,
            Reg::De => Reg8::E,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Reg::Hl => "HL",
            Reg::De => "DE",
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 8-bit registers (M is the memory cell addressed by HL)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg8 {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
    M,
}

impl fmt::Display for Reg8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reg8::A => write!(f, "a"),
            Reg8::B => write!(f, "b"),
            Reg8::C => write!(f, "c"),
            Reg8::D => write!(f, "d"),
            Reg8::E => write!(f, "e"),
            Reg8::H => write!(f, "h"),
            Reg8::L => write!(f, "l"),
            Reg8::M => write!(f, "m"),
        }
    }
}

/// Register pair operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pair {
    B,
    D,
    H,
    Sp,
    Psw,
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pair::B => write!(f, "b"),
            Pair::D => write!(f, "d"),
            Pair::H => write!(f, "h"),
            Pair::Sp => write!(f, "sp"),
            Pair::Psw => write!(f, "psw"),
        }
    }
}

/// Assembler section and data directives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    Db,
    Dw,
    Ds,
    Export,
    Common,
    Code,
    Data,
    Bss,
    String,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Db => write!(f, ".db"),
            Directive::Dw => write!(f, ".dw"),
            Directive::Ds => write!(f, ".ds"),
            Directive::Export => write!(f, ".export"),
            Directive::Common => write!(f, ".common"),
            Directive::Code => write!(f, ".code"),
            Directive::Data => write!(f, ".data"),
            Directive::Bss => write!(f, ".bss"),
            Directive::String => write!(f, ".string"),
        }
    }
}

/// 8080 instructions emitted directly by the generator and dispatcher.
///
/// Operands that may be symbolic (`_x+2`, `LL4`, `-6`) are carried as text.
#[derive(Debug, Clone, PartialEq)]
pub enum AsmInst {
    // 16-bit moves and arithmetic
    Lxi(Pair, String),            // pair = imm16
    Dad(Pair),                    // HL += pair
    Inx(Pair),                    // pair += 1
    Xchg,                         // swap HL and DE
    Sphl,                         // SP = HL
    Pchl,                         // PC = HL

    // Stack
    Push(Pair),
    Pop(Pair),

    // 8-bit
    Mov(Reg8, Reg8),              // dst = src
    Ora(Reg8),                    // A |= r
    Sub(Reg8),                    // A -= r
    Sbb(Reg8),                    // A -= r + carry

    // Control flow
    Jmp(String),
    Jz(String),
    Jnz(String),
    Jnc(String),
    Call(String),

    // Assembly pseudo-instructions
    Label(String),
    Directive(Directive, Option<String>),
}

impl fmt::Display for AsmInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmInst::Lxi(rp, imm) => write!(f, "lxi {},{}", rp, imm),
            AsmInst::Dad(rp) => write!(f, "dad {}", rp),
            AsmInst::Inx(rp) => write!(f, "inx {}", rp),
            AsmInst::Xchg => write!(f, "xchg"),
            AsmInst::Sphl => write!(f, "sphl"),
            AsmInst::Pchl => write!(f, "pchl"),

            AsmInst::Push(rp) => write!(f, "push {}", rp),
            AsmInst::Pop(rp) => write!(f, "pop {}", rp),

            AsmInst::Mov(dst, src) => write!(f, "mov {},{}", dst, src),
            AsmInst::Ora(r) => write!(f, "ora {}", r),
            AsmInst::Sub(r) => write!(f, "sub {}", r),
            AsmInst::Sbb(r) => write!(f, "sbb {}", r),

            AsmInst::Jmp(target) => write!(f, "jmp {}", target),
            AsmInst::Jz(target) => write!(f, "jz {}", target),
            AsmInst::Jnz(target) => write!(f, "jnz {}", target),
            AsmInst::Jnc(target) => write!(f, "jnc {}", target),
            AsmInst::Call(target) => write!(f, "call {}", target),

            AsmInst::Label(name) => write!(f, "{}:", name),
            AsmInst::Directive(dir, None) => write!(f, "{}", dir),
            AsmInst::Directive(dir, Some(operands)) => write!(f, "{} {}", dir, operands),
        }
    }
}

/// The two instructions that set the zero flag from a register pair
pub fn truth_test(reg: Reg) -> [AsmInst; 2] {
    [AsmInst::Mov(Reg8::A, reg.high()), AsmInst::Ora(reg.low())]
}

/// Format a symbolic operand: `name`, `name+c`, `name-c` or a bare constant
pub fn format_operand(name: Option<&str>, constant: Word) -> String {
    match (name, constant) {
        (Some(name), 0) => name.to_string(),
        (Some(name), c) if c < 0 => format!("{}-{}", name, -(c as i32)),
        (Some(name), c) => format!("{}+{}", name, c),
        (None, c) => c.to_string(),
    }
}
