//! Tree construction with algebraic simplification
//!
//! Every node built from the IR passes through [`optimize`] as it is created,
//! so its children are already in simplified form. Rewrites are applied
//! until none fires:
//!
//! - constant folding with 16-bit wrapping arithmetic
//! - `x-c` becomes `x+(-c)`; additive, multiplicative and division identities
//! - a plain constant added to a named constant or auto leaf is absorbed
//!   into the leaf's offset
//! - multiply, divide and modulus by powers of two become shifts and masks;
//!   shifts by zero disappear
//! - constant operands of associative chains are merged
//! - comparisons against zero become truth tests

use crate::arena::{Node, NodeArena, NodeRef};
use c6t_common::{CompileResult, CompilerError, Opcode, Word};
use log::trace;

/// Allocate a node and return its simplified form
pub fn build(arena: &mut NodeArena, node: Node) -> CompileResult<NodeRef> {
    let n = arena.alloc(node)?;
    optimize(arena, n)
}

/// Simplify `node` in place, returning the node that now represents it
pub fn optimize(arena: &mut NodeArena, node: NodeRef) -> CompileResult<NodeRef> {
    let mut n = node;
    while let Some(next) = rewrite(arena, n)? {
        n = next;
    }
    Ok(n)
}

/// Apply one rewrite; `Some` holds the node to examine next
fn rewrite(arena: &mut NodeArena, n: NodeRef) -> CompileResult<Option<NodeRef>> {
    if let Some(value) = fold(arena, n)? {
        trace!("fold {} -> {}", arena[n].opcode, value);
        arena[n] = Node::leaf(Opcode::Con, value, None);
        return Ok(None);
    }

    let node = arena[n].clone();
    let left = node.left.and_then(|l| arena[l].plain_constant());
    let right = node.right.and_then(|r| arena[r].plain_constant());

    let next = match node.opcode {
        Opcode::Sub => match (node.right, right) {
            (Some(r), Some(c)) => {
                arena[r].constant = c.wrapping_neg();
                arena[n].opcode = Opcode::Add;
                Some(n)
            }
            _ => None,
        },

        Opcode::Add => {
            if merge_chain(arena, n) {
                Some(n)
            } else if let Some(leaf) = absorb_offset(arena, &node, left, right) {
                Some(leaf)
            } else if left == Some(0) {
                node.right
            } else if right == Some(0) {
                node.left
            } else {
                None
            }
        }

        Opcode::Mult => {
            if merge_chain(arena, n) {
                Some(n)
            } else if left == Some(1) {
                node.right
            } else if right == Some(1) {
                node.left
            } else if let (Some(r), Some(k)) = (node.right, right.and_then(log2)) {
                arena[r].constant = k;
                arena[n].opcode = Opcode::LShift;
                Some(n)
            } else if let (Some(l), Some(k)) = (node.left, left.and_then(log2)) {
                arena[l].constant = k;
                let target = &mut arena[n];
                target.opcode = Opcode::LShift;
                std::mem::swap(&mut target.left, &mut target.right);
                Some(n)
            } else {
                None
            }
        }

        Opcode::Div => {
            if right == Some(1) {
                node.left
            } else if left == Some(0) {
                node.right
            } else if let (Some(r), Some(k)) = (node.right, right.and_then(log2)) {
                arena[r].constant = k;
                arena[n].opcode = Opcode::RShift;
                Some(n)
            } else {
                None
            }
        }

        Opcode::Mod => match (node.right, right.and_then(log2)) {
            (Some(r), Some(k)) => {
                arena[r].constant = (1i16 << k) - 1;
                arena[n].opcode = Opcode::And;
                Some(n)
            }
            _ => None,
        },

        Opcode::LShift | Opcode::RShift if right == Some(0) => node.left,

        Opcode::And | Opcode::Or | Opcode::Eor => merge_chain(arena, n).then_some(n),

        Opcode::Equ | Opcode::NEqu => {
            let test = if node.opcode == Opcode::Equ {
                Opcode::LogNot
            } else {
                Opcode::Log
            };
            if right == Some(0) {
                arena[n] = Node::new(test, node.left, None);
                Some(n)
            } else if left == Some(0) {
                arena[n] = Node::new(test, node.right, None);
                Some(n)
            } else {
                None
            }
        }

        _ => None,
    };

    if let Some(next) = next {
        trace!("rewrite {} -> {}", node.opcode, arena[next].opcode);
    }
    Ok(next)
}

/// Evaluate a node whose operands are all plain constants
fn fold(arena: &NodeArena, n: NodeRef) -> CompileResult<Option<Word>> {
    let node = &arena[n];
    let operand = |child: Option<NodeRef>| child.and_then(|c| arena[c].plain_constant());

    match node.opcode.arity() {
        1 => Ok(operand(node.left).and_then(|a| fold_unary(node.opcode, a))),
        2 => match (operand(node.left), operand(node.right)) {
            (Some(a), Some(b)) => fold_binary(node.opcode, a, b),
            _ => Ok(None),
        },
        _ => Ok(None),
    }
}

pub fn fold_unary(opcode: Opcode, a: Word) -> Option<Word> {
    match opcode {
        Opcode::Neg => Some(a.wrapping_neg()),
        Opcode::Compl => Some(!a),
        Opcode::LogNot => Some((a == 0) as Word),
        Opcode::Log => Some((a != 0) as Word),
        _ => None,
    }
}

pub fn fold_binary(opcode: Opcode, a: Word, b: Word) -> CompileResult<Option<Word>> {
    let (ua, ub) = (a as u16, b as u16);
    let value = match opcode {
        Opcode::Add => a.wrapping_add(b),
        Opcode::Sub => a.wrapping_sub(b),
        Opcode::Mult => a.wrapping_mul(b),
        Opcode::Div | Opcode::Mod if b == 0 => {
            return Err(CompilerError::DivideByZero { opcode })
        }
        Opcode::Div => a.wrapping_div(b),
        Opcode::Mod => a.wrapping_rem(b),
        Opcode::And => a & b,
        Opcode::Or => a | b,
        Opcode::Eor => a ^ b,
        Opcode::LShift => shift_left(a, b),
        Opcode::RShift => shift_right(a, b),
        Opcode::Equ => (a == b) as Word,
        Opcode::NEqu => (a != b) as Word,
        Opcode::Less => (a < b) as Word,
        Opcode::Great => (a > b) as Word,
        Opcode::LEqu => (a <= b) as Word,
        Opcode::GEqu => (a >= b) as Word,
        Opcode::ULess => (ua < ub) as Word,
        Opcode::UGreat => (ua > ub) as Word,
        Opcode::ULEqu => (ua <= ub) as Word,
        Opcode::UGEqu => (ua >= ub) as Word,
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// Left shift; counts outside 0..16 shift everything out
pub fn shift_left(a: Word, count: Word) -> Word {
    match count {
        0..=15 => a << count,
        _ => 0,
    }
}

/// Arithmetic right shift; counts outside 0..16 leave only the sign
pub fn shift_right(a: Word, count: Word) -> Word {
    match count {
        0..=15 => a >> count,
        _ if a < 0 => -1,
        _ => 0,
    }
}

/// `k` when `value == 2^k` for a positive word
fn log2(value: Word) -> Option<Word> {
    (value > 0 && value & (value - 1) == 0).then(|| value.trailing_zeros() as Word)
}

fn combine(opcode: Opcode, a: Word, b: Word) -> Word {
    match opcode {
        Opcode::Add => a.wrapping_add(b),
        Opcode::Mult => a.wrapping_mul(b),
        Opcode::And => a & b,
        Opcode::Or => a | b,
        Opcode::Eor => a ^ b,
        _ => a,
    }
}

/// Merge a constant operand of `n` with a constant found in a same-opcode
/// child (one level of nesting deep). Returns whether anything changed.
fn merge_chain(arena: &mut NodeArena, n: NodeRef) -> bool {
    let op = arena[n].opcode;
    let (Some(l), Some(r)) = (arena[n].left, arena[n].right) else {
        return false;
    };

    if let Some(c) = arena[l].plain_constant() {
        if arena[r].opcode == op {
            if let Some((inner, rest)) = extract_constant(arena, r, op, 1) {
                arena[l].constant = combine(op, c, inner);
                arena[n].right = Some(rest);
                return true;
            }
        }
    } else if let Some(c) = arena[r].plain_constant() {
        if arena[l].opcode == op {
            if let Some((inner, rest)) = extract_constant(arena, l, op, 1) {
                arena[r].constant = combine(op, c, inner);
                arena[n].left = Some(rest);
                return true;
            }
        }
    }
    false
}

/// Detach a plain constant operand from the `op` chain rooted at `sub`,
/// returning it with the remainder of the chain
fn extract_constant(
    arena: &mut NodeArena,
    sub: NodeRef,
    op: Opcode,
    depth: u32,
) -> Option<(Word, NodeRef)> {
    let (l, r) = (arena[sub].left?, arena[sub].right?);
    if let Some(c) = arena[l].plain_constant() {
        return Some((c, r));
    }
    if let Some(c) = arena[r].plain_constant() {
        return Some((c, l));
    }
    if depth == 0 {
        return None;
    }
    if arena[l].opcode == op {
        if let Some((c, rest)) = extract_constant(arena, l, op, depth - 1) {
            arena[sub].left = Some(rest);
            return Some((c, sub));
        }
    }
    if arena[r].opcode == op {
        if let Some((c, rest)) = extract_constant(arena, r, op, depth - 1) {
            arena[sub].right = Some(rest);
            return Some((c, sub));
        }
    }
    None
}

/// Fold a plain constant addend into a named constant or auto leaf
fn absorb_offset(
    arena: &mut NodeArena,
    node: &Node,
    left: Option<Word>,
    right: Option<Word>,
) -> Option<NodeRef> {
    let (addend, leaf) = match (left, right) {
        (Some(c), None) => (c, node.right?),
        (None, Some(c)) => (c, node.left?),
        _ => return None,
    };
    let target = &mut arena[leaf];
    if matches!(target.opcode, Opcode::Con | Opcode::Auto) {
        target.constant = target.constant.wrapping_add(addend);
        Some(leaf)
    } else {
        None
    }
}
