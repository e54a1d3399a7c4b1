//! Per-statement storage pools
//!
//! Every statement builds its trees, names and arguments into bounded pools
//! addressed by small index handles. The pools are cleared wholesale when a
//! command finishes (nodes, names) or a line ends (arguments), so a handle is
//! only meaningful inside the statement that produced it.

use c6t_common::{CompileResult, CompilerError, Opcode, Word};
use std::ops::{Index, IndexMut};

/// Longest name kept by the lexer; longer names are truncated
pub const NAME_MAX: usize = 16;

/// Capacities of the per-statement pools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaLimits {
    pub nodes: usize,
    pub node_stack: usize,
    /// Argument store capacity in words (a leaf costs 2, a pair 3)
    pub arg_words: usize,
    /// Name pool capacity in bytes, counting one terminator per name
    pub name_bytes: usize,
}

impl Default for ArenaLimits {
    fn default() -> Self {
        Self {
            nodes: 64,
            node_stack: 16,
            arg_words: 1024,
            name_bytes: 2304,
        }
    }
}

/// Handle to a node in the [`NodeArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(u32);

impl NodeRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to an interned name in the [`NamePool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameRef(u32);

/// Handle to an argument in the [`ArgStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgRef(u32);

/// An expression tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub opcode: Opcode,
    pub left: Option<NodeRef>,
    pub right: Option<NodeRef>,
    pub constant: Word,
    pub symbol: Option<NameRef>,
}

impl Node {
    pub fn new(opcode: Opcode, left: Option<NodeRef>, right: Option<NodeRef>) -> Self {
        Self {
            opcode,
            left,
            right,
            constant: 0,
            symbol: None,
        }
    }

    pub fn leaf(opcode: Opcode, constant: Word, symbol: Option<NameRef>) -> Self {
        Self {
            opcode,
            left: None,
            right: None,
            constant,
            symbol,
        }
    }

    pub fn unary(opcode: Opcode, child: NodeRef) -> Self {
        Self::new(opcode, Some(child), None)
    }

    /// An unnamed constant leaf: a plain number
    pub fn is_plain_constant(&self) -> bool {
        self.opcode == Opcode::Con && self.symbol.is_none()
    }

    pub fn plain_constant(&self) -> Option<Word> {
        self.is_plain_constant().then_some(self.constant)
    }
}

#[derive(Debug)]
pub struct NodeArena {
    nodes: Vec<Node>,
    capacity: usize,
}

impl NodeArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn alloc(&mut self, node: Node) -> CompileResult<NodeRef> {
        if self.nodes.len() >= self.capacity {
            return Err(CompilerError::ArenaExhausted {
                arena: "node",
                capacity: self.capacity,
            });
        }
        self.nodes.push(node);
        Ok(NodeRef((self.nodes.len() - 1) as u32))
    }

    pub fn live(&self) -> usize {
        self.nodes.len()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

impl Index<NodeRef> for NodeArena {
    type Output = Node;

    fn index(&self, node: NodeRef) -> &Node {
        &self.nodes[node.index()]
    }
}

impl IndexMut<NodeRef> for NodeArena {
    fn index_mut(&mut self, node: NodeRef) -> &mut Node {
        &mut self.nodes[node.index()]
    }
}

/// Interned symbol names
#[derive(Debug)]
pub struct NamePool {
    names: Vec<String>,
    used_bytes: usize,
    capacity: usize,
}

impl NamePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            names: Vec::new(),
            used_bytes: 0,
            capacity,
        }
    }

    /// Intern a name, returning the existing handle when already present
    pub fn intern(&mut self, name: &str) -> CompileResult<NameRef> {
        if let Some(i) = self.names.iter().position(|n| n == name) {
            return Ok(NameRef(i as u32));
        }
        let cost = name.len() + 1;
        if self.used_bytes + cost > self.capacity {
            return Err(CompilerError::ArenaExhausted {
                arena: "name",
                capacity: self.capacity,
            });
        }
        self.used_bytes += cost;
        self.names.push(name.to_string());
        Ok(NameRef((self.names.len() - 1) as u32))
    }

    pub fn resolve(&self, name: NameRef) -> &str {
        &self.names[name.0 as usize]
    }

    pub fn live(&self) -> usize {
        self.names.len()
    }

    pub fn clear(&mut self) {
        self.names.clear();
        self.used_bytes = 0;
    }
}

/// A statement argument: a leaf operand or a right-leaning list cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    Constant(Word),
    Name(NameRef),
    Offset(NameRef, Word),
    List(ArgRef, ArgRef),
}

impl Argument {
    fn words(&self) -> usize {
        match self {
            Argument::Constant(_) | Argument::Name(_) => 2,
            Argument::Offset(..) | Argument::List(..) => 3,
        }
    }

    /// The symbol and constant of a leaf argument
    pub fn operand(&self) -> Option<(Option<NameRef>, Word)> {
        match *self {
            Argument::Constant(c) => Some((None, c)),
            Argument::Name(name) => Some((Some(name), 0)),
            Argument::Offset(name, c) => Some((Some(name), c)),
            Argument::List(..) => None,
        }
    }
}

#[derive(Debug)]
pub struct ArgStore {
    args: Vec<Argument>,
    used_words: usize,
    capacity: usize,
}

impl ArgStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            args: Vec::new(),
            used_words: 0,
            capacity,
        }
    }

    pub fn push(&mut self, arg: Argument) -> CompileResult<ArgRef> {
        let cost = arg.words();
        if self.used_words + cost > self.capacity {
            return Err(CompilerError::ArenaExhausted {
                arena: "argument",
                capacity: self.capacity,
            });
        }
        self.used_words += cost;
        self.args.push(arg);
        Ok(ArgRef((self.args.len() - 1) as u32))
    }

    /// Build a right-leaning list from leaves in order; a single leaf is
    /// returned as itself
    pub fn push_list(&mut self, leaves: &[ArgRef]) -> CompileResult<Option<ArgRef>> {
        let Some((&last, rest)) = leaves.split_last() else {
            return Ok(None);
        };
        let mut tail = last;
        for &head in rest.iter().rev() {
            tail = self.push(Argument::List(head, tail))?;
        }
        Ok(Some(tail))
    }

    pub fn get(&self, arg: ArgRef) -> Argument {
        self.args[arg.0 as usize]
    }

    /// Number of leaf arguments in a list
    pub fn count(&self, arg: Option<ArgRef>) -> usize {
        match arg.map(|a| self.get(a)) {
            None => 0,
            Some(Argument::List(head, tail)) => self.count(Some(head)) + self.count(Some(tail)),
            Some(_) => 1,
        }
    }

    /// The leaf arguments of a list, left to right
    pub fn leaves(&self, arg: Option<ArgRef>) -> Vec<Argument> {
        let mut out = Vec::new();
        let mut stack: Vec<ArgRef> = arg.into_iter().collect();
        while let Some(a) = stack.pop() {
            match self.get(a) {
                Argument::List(head, tail) => {
                    stack.push(tail);
                    stack.push(head);
                }
                leaf => out.push(leaf),
            }
        }
        out
    }

    pub fn live(&self) -> usize {
        self.args.len()
    }

    pub fn clear(&mut self) {
        self.args.clear();
        self.used_words = 0;
    }
}

/// Bounded stack of pending subtrees; `None` is an explicit empty child
#[derive(Debug)]
pub struct NodeStack {
    slots: Vec<Option<NodeRef>>,
    capacity: usize,
}

impl NodeStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, node: Option<NodeRef>) -> CompileResult<()> {
        if self.slots.len() >= self.capacity {
            return Err(CompilerError::ArenaExhausted {
                arena: "node stack",
                capacity: self.capacity,
            });
        }
        self.slots.push(node);
        Ok(())
    }

    pub fn pop(&mut self) -> CompileResult<Option<NodeRef>> {
        self.slots.pop().ok_or(CompilerError::NodeStackUnderflow)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
