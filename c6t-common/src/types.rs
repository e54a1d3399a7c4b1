//! IR vocabulary shared by every stage of the backend
//!
//! The IR is a line-oriented postfix encoding of expression trees plus
//! commands. This module defines the node opcodes and commands together
//! with their keyword spellings and fixed arity tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 16-bit two's complement machine word
pub type Word = i16;

/// Label identifier for compiler-generated labels
pub type LabelId = u32;

/// Expression tree node opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Opcode {
    // Leaves
    Con,
    Auto,
    Reg,

    // Memory
    Load,
    CLoad,
    Assign,
    CAssign,

    // Control flow inside expressions
    Quest,
    Colon,
    LogOr,
    LogAnd,
    Comma,

    // Bitwise
    Or,
    Eor,
    And,
    Compl,
    RShift,
    LShift,

    // Relational
    Equ,
    NEqu,
    Less,
    Great,
    LEqu,
    GEqu,
    ULess,
    UGreat,
    ULEqu,
    UGEqu,

    // Arithmetic
    Add,
    Sub,
    Mult,
    Div,
    Mod,
    Neg,

    // Truth values
    LogNot,
    Log,

    // Increment and decrement, constant is the signed step
    Pre,
    Post,
    CPre,
    CPost,

    // Calls
    Call,
    Arg,

    // Compound assignment on words
    AsnAdd,
    AsnSub,
    AsnMult,
    AsnDiv,
    AsnMod,
    AsnRShift,
    AsnLShift,
    AsnAnd,
    AsnEor,
    AsnOr,

    // Compound assignment on bytes
    CAsnAdd,
    CAsnSub,
    CAsnMult,
    CAsnDiv,
    CAsnMod,
    CAsnRShift,
    CAsnLShift,
    CAsnAnd,
    CAsnEor,
    CAsnOr,
}

const OPCODE_KEYWORDS: &[(&str, Opcode)] = &[
    ("CON", Opcode::Con),
    ("LOAD", Opcode::Load),
    ("CLOAD", Opcode::CLoad),
    ("ASSIGN", Opcode::Assign),
    ("CASSIGN", Opcode::CAssign),
    ("QUEST", Opcode::Quest),
    ("COLON", Opcode::Colon),
    ("LOGOR", Opcode::LogOr),
    ("LOGAND", Opcode::LogAnd),
    ("OR", Opcode::Or),
    ("EOR", Opcode::Eor),
    ("AND", Opcode::And),
    ("EQU", Opcode::Equ),
    ("NEQU", Opcode::NEqu),
    ("LESS", Opcode::Less),
    ("GREAT", Opcode::Great),
    ("LEQU", Opcode::LEqu),
    ("GEQU", Opcode::GEqu),
    ("RSHIFT", Opcode::RShift),
    ("LSHIFT", Opcode::LShift),
    ("ADD", Opcode::Add),
    ("SUB", Opcode::Sub),
    ("MULT", Opcode::Mult),
    ("DIV", Opcode::Div),
    ("MOD", Opcode::Mod),
    ("NEG", Opcode::Neg),
    ("LOGNOT", Opcode::LogNot),
    ("LOG", Opcode::Log),
    ("COMPL", Opcode::Compl),
    ("REG", Opcode::Reg),
    ("PRE", Opcode::Pre),
    ("POST", Opcode::Post),
    ("CPRE", Opcode::CPre),
    ("CPOST", Opcode::CPost),
    ("CALL", Opcode::Call),
    ("ARG", Opcode::Arg),
    ("ULESS", Opcode::ULess),
    ("UGREAT", Opcode::UGreat),
    ("ULEQU", Opcode::ULEqu),
    ("UGEQU", Opcode::UGEqu),
    ("AUTO", Opcode::Auto),
    ("ASNADD", Opcode::AsnAdd),
    ("ASNSUB", Opcode::AsnSub),
    ("ASNMULT", Opcode::AsnMult),
    ("ASNDIV", Opcode::AsnDiv),
    ("ASNMOD", Opcode::AsnMod),
    ("ASNRSHIFT", Opcode::AsnRShift),
    ("ASNLSHIFT", Opcode::AsnLShift),
    ("ASNAND", Opcode::AsnAnd),
    ("ASNEOR", Opcode::AsnEor),
    ("ASNOR", Opcode::AsnOr),
    ("CASNADD", Opcode::CAsnAdd),
    ("CASNSUB", Opcode::CAsnSub),
    ("CASNMULT", Opcode::CAsnMult),
    ("CASNDIV", Opcode::CAsnDiv),
    ("CASNMOD", Opcode::CAsnMod),
    ("CASNRSHIFT", Opcode::CAsnRShift),
    ("CASNLSHIFT", Opcode::CAsnLShift),
    ("CASNAND", Opcode::CAsnAnd),
    ("CASNEOR", Opcode::CAsnEor),
    ("CASNOR", Opcode::CAsnOr),
    ("COMMA", Opcode::Comma),
];

/// Floating point keywords recognised only so they can be rejected
pub const FLOAT_KEYWORDS: &[&str] = &[
    "FCON", "FLOAD", "DLOAD", "FASSIGN", "DASSIGN", "TOFLT", "TOINT", "FLOAT", "DOUBLE", "FRET",
    "FBRZ",
];

/// Keyword pseudo-op that pushes an empty child slot
pub const NULL_KEYWORD: &str = "NULL";

impl Opcode {
    /// Look up an opcode by keyword, ignoring case
    pub fn from_keyword(word: &str) -> Option<Self> {
        OPCODE_KEYWORDS
            .iter()
            .find(|(kw, _)| kw.eq_ignore_ascii_case(word))
            .map(|&(_, op)| op)
    }

    /// The IR keyword for this opcode
    pub fn keyword(self) -> &'static str {
        OPCODE_KEYWORDS
            .iter()
            .find(|&&(_, op)| op == self)
            .map(|&(kw, _)| kw)
            .unwrap_or("?")
    }

    /// Number of children a node with this opcode has
    pub fn arity(self) -> usize {
        use Opcode::*;
        match self {
            Con | Auto | Reg => 0,
            Load | CLoad | Neg | LogNot | Log | Compl | Pre | Post | CPre | CPost => 1,
            _ => 2,
        }
    }

    pub fn is_leaf(self) -> bool {
        self.arity() == 0
    }

    /// Opcodes whose chains of constant operands may be merged
    pub fn is_associative(self) -> bool {
        matches!(
            self,
            Opcode::Add | Opcode::Mult | Opcode::And | Opcode::Or | Opcode::Eor
        )
    }

    /// Whether a child slot may legitimately be empty (`NULL` in the IR)
    pub fn allows_empty(self, side: Side) -> bool {
        matches!(
            (self, side),
            (Opcode::Call, Side::Left) | (Opcode::Arg, Side::Right)
        )
    }

    /// Relational operators producing 0 or 1
    pub fn is_relational(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Equ | NEqu | Less | Great | LEqu | GEqu | ULess | UGreat | ULEqu | UGEqu
        )
    }

    /// Opcodes the code generator handles with bespoke control flow
    pub fn has_special_form(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Comma | Quest | LogOr | LogAnd | Pre | Post | CPre | CPost | Arg | Call
        )
    }

    /// Every opcode, in keyword table order
    pub fn all() -> impl Iterator<Item = Opcode> {
        OPCODE_KEYWORDS.iter().map(|&(_, op)| op)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// Child side of a binary node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Number of arguments a command takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgCount {
    Fixed(usize),
    Variable,
}

/// IR commands; each consumes at most one tree from the node stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandKind {
    Byte,
    Word,
    Storage,
    Autos,
    UsedRegs,
    Ret,
    RetNull,
    Func,
    Export,
    EndFunc,
    Jmp,
    Brz,
    Eval,
    Switch,
    End,
    Code,
    Data,
    Bss,
    String,
    StkJmp,
    Common,
    SwEasy,
}

const COMMAND_KEYWORDS: &[(&str, CommandKind)] = &[
    ("BYTE", CommandKind::Byte),
    ("WORD", CommandKind::Word),
    ("STORAGE", CommandKind::Storage),
    ("AUTOS", CommandKind::Autos),
    ("USEDREGS", CommandKind::UsedRegs),
    ("RET", CommandKind::Ret),
    ("RETNULL", CommandKind::RetNull),
    ("FUNC", CommandKind::Func),
    ("EXPORT", CommandKind::Export),
    ("ENDFUNC", CommandKind::EndFunc),
    ("JMP", CommandKind::Jmp),
    ("BRZ", CommandKind::Brz),
    ("EVAL", CommandKind::Eval),
    ("SWITCH", CommandKind::Switch),
    ("END", CommandKind::End),
    ("CODE", CommandKind::Code),
    ("DATA", CommandKind::Data),
    ("BSS", CommandKind::Bss),
    ("STRING", CommandKind::String),
    ("STKJMP", CommandKind::StkJmp),
    ("COMMON", CommandKind::Common),
    ("SWEASY", CommandKind::SwEasy),
];

impl CommandKind {
    /// Look up a command by keyword, ignoring case
    pub fn from_keyword(word: &str) -> Option<Self> {
        COMMAND_KEYWORDS
            .iter()
            .find(|(kw, _)| kw.eq_ignore_ascii_case(word))
            .map(|&(_, cmd)| cmd)
    }

    pub fn keyword(self) -> &'static str {
        COMMAND_KEYWORDS
            .iter()
            .find(|&&(_, cmd)| cmd == self)
            .map(|&(kw, _)| kw)
            .unwrap_or("?")
    }

    pub fn arg_count(self) -> ArgCount {
        use CommandKind::*;
        match self {
            Byte | Word | Export => ArgCount::Variable,
            Storage | Autos | UsedRegs | Func | Jmp | Brz => ArgCount::Fixed(1),
            Common => ArgCount::Fixed(2),
            Switch => ArgCount::Fixed(3),
            SwEasy => ArgCount::Fixed(4),
            Ret | RetNull | EndFunc | Eval | End | Code | Data | Bss | String | StkJmp => {
                ArgCount::Fixed(0)
            }
        }
    }

    /// Whether the command pops an expression tree off the node stack
    pub fn carries_tree(self) -> bool {
        use CommandKind::*;
        matches!(self, Ret | Brz | Eval | Switch | StkJmp | SwEasy)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// Whether a word names one of the rejected floating point operations
pub fn is_float_keyword(word: &str) -> bool {
    FLOAT_KEYWORDS.iter().any(|kw| kw.eq_ignore_ascii_case(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(Opcode::from_keyword("add"), Some(Opcode::Add));
        assert_eq!(Opcode::from_keyword("CAsnOr"), Some(Opcode::CAsnOr));
        assert_eq!(CommandKind::from_keyword("SwEasy"), Some(CommandKind::SwEasy));
        assert_eq!(Opcode::from_keyword("_x"), None);
        assert_eq!(CommandKind::from_keyword("LOAD"), None);
    }

    #[test]
    fn test_keyword_table_round_trips() {
        for op in Opcode::all() {
            assert_eq!(Opcode::from_keyword(op.keyword()), Some(op));
        }
        assert_eq!(Opcode::all().count(), 62);
    }

    #[test]
    fn test_arity() {
        assert_eq!(Opcode::Con.arity(), 0);
        assert_eq!(Opcode::Auto.arity(), 0);
        assert_eq!(Opcode::Reg.arity(), 0);
        assert_eq!(Opcode::CPost.arity(), 1);
        assert_eq!(Opcode::Load.arity(), 1);
        assert_eq!(Opcode::Call.arity(), 2);
        assert_eq!(Opcode::CAsnLShift.arity(), 2);
        assert_eq!(Opcode::Comma.arity(), 2);
    }

    #[test]
    fn test_command_table() {
        assert_eq!(CommandKind::Byte.arg_count(), ArgCount::Variable);
        assert_eq!(CommandKind::Switch.arg_count(), ArgCount::Fixed(3));
        assert_eq!(CommandKind::SwEasy.arg_count(), ArgCount::Fixed(4));
        assert_eq!(CommandKind::Common.arg_count(), ArgCount::Fixed(2));
        assert!(CommandKind::StkJmp.carries_tree());
        assert!(!CommandKind::RetNull.carries_tree());
        assert!(!CommandKind::Jmp.carries_tree());
    }

    #[test]
    fn test_float_keywords() {
        assert!(is_float_keyword("fcon"));
        assert!(is_float_keyword("FBRZ"));
        assert!(!is_float_keyword("CON"));
    }
}
