//! Control-flow normalization ahead of instruction selection
//!
//! A post-order pass over a finished tree that leaves it in the shape the
//! template catalog expects:
//!
//! - short-circuit `LOGOR`/`LOGAND` are wrapped in a `LOG` truth test, and a
//!   `LOG` directly under one of them is unwrapped again
//! - `EQU`/`NEQU` against a non-zero operand become `LOGNOT`/`LOG` of the
//!   simplified difference
//! - `REG n` becomes the address of register cell `regn`

use crate::arena::{NameRef, NamePool, Node, NodeArena, NodeRef};
use crate::optimize::optimize;
use c6t_common::{CompileResult, CompilerError, Opcode};

/// Memory cells standing in for the machine's register variables
pub const REGISTER_CELLS: [&str; 3] = ["reg0", "reg1", "reg2"];

pub fn normalize(
    arena: &mut NodeArena,
    names: &mut NamePool,
    root: Option<NodeRef>,
) -> CompileResult<Option<NodeRef>> {
    let Some(n) = root else {
        return Ok(None);
    };

    let (left, right) = (arena[n].left, arena[n].right);
    let left = normalize(arena, names, left)?;
    let right = normalize(arena, names, right)?;
    arena[n].left = left;
    arena[n].right = right;

    let replacement = match arena[n].opcode {
        Opcode::LogOr | Opcode::LogAnd => {
            arena[n].left = unwrap_truth_test(arena, left);
            arena[n].right = unwrap_truth_test(arena, right);
            arena.alloc(Node::unary(Opcode::Log, n))?
        }
        Opcode::Equ | Opcode::NEqu => {
            let test = if arena[n].opcode == Opcode::Equ {
                Opcode::LogNot
            } else {
                Opcode::Log
            };
            arena[n].opcode = Opcode::Sub;
            let difference = optimize(arena, n)?;
            arena.alloc(Node::unary(test, difference))?
        }
        Opcode::Reg => {
            let cell = register_cell(names, arena[n].constant)?;
            arena[n] = Node::leaf(Opcode::Con, 0, Some(cell));
            n
        }
        _ => n,
    };
    Ok(Some(replacement))
}

fn unwrap_truth_test(arena: &NodeArena, child: Option<NodeRef>) -> Option<NodeRef> {
    match child {
        Some(c) if arena[c].opcode == Opcode::Log => arena[c].left,
        other => other,
    }
}

fn register_cell(names: &mut NamePool, number: i16) -> CompileResult<NameRef> {
    let cell = usize::try_from(number)
        .ok()
        .and_then(|i| REGISTER_CELLS.get(i))
        .ok_or(CompilerError::BadRegisterCell { number })?;
    names.intern(cell)
}
