//! Per-statement state
//!
//! Nodes and names live until the command that consumes them finishes;
//! arguments live until the end of the line that declared them.

use crate::arena::{ArenaLimits, ArgRef, ArgStore, NamePool, Node, NodeArena, NodeRef, NodeStack};
use crate::optimize;
use crate::select::SelectionCache;
use c6t_common::{CompileResult, CompilerError, Opcode, Side};
use log::trace;

#[derive(Debug)]
pub struct StatementContext {
    pub nodes: NodeArena,
    pub names: NamePool,
    pub args: ArgStore,
    pub stack: NodeStack,
    pub cache: SelectionCache,
}

impl StatementContext {
    pub fn new(limits: ArenaLimits) -> Self {
        Self {
            nodes: NodeArena::new(limits.nodes),
            names: NamePool::new(limits.name_bytes),
            args: ArgStore::new(limits.arg_words),
            stack: NodeStack::new(limits.node_stack),
            cache: SelectionCache::new(),
        }
    }

    /// Handle an IR node line: pop the children, build and simplify the
    /// node, and push the result. `None` is the `NULL` placeholder.
    pub fn push_node(&mut self, opcode: Option<Opcode>, args: Option<ArgRef>) -> CompileResult<()> {
        let Some(opcode) = opcode else {
            return self.stack.push(None);
        };

        let mut node = Node::new(opcode, None, None);
        if let Some(arg) = args {
            let (symbol, constant) = self
                .args
                .get(arg)
                .operand()
                .ok_or(CompilerError::BadNodeArgs { opcode })?;
            node.symbol = symbol;
            node.constant = constant;
        }

        match opcode.arity() {
            0 => {}
            1 => node.left = self.pop_operand(opcode, Side::Left)?,
            _ => {
                node.right = self.pop_operand(opcode, Side::Right)?;
                node.left = self.pop_operand(opcode, Side::Left)?;
            }
        }

        let built = optimize::build(&mut self.nodes, node)?;
        trace!("built {} -> {}", opcode, self.nodes[built].opcode);
        self.stack.push(Some(built))
    }

    fn pop_operand(&mut self, opcode: Opcode, side: Side) -> CompileResult<Option<NodeRef>> {
        let child = self.stack.pop()?;
        if child.is_none() && !opcode.allows_empty(side) {
            return Err(CompilerError::MissingOperand { opcode, side });
        }
        Ok(child)
    }

    /// Forget the arguments of the line just processed
    pub fn end_line(&mut self) {
        self.args.clear();
    }

    /// Release everything a command consumed
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.names.clear();
        self.args.clear();
        self.stack.clear();
        self.cache.clear();
    }

    /// Whether no node, name, argument or selection result is live
    pub fn is_clear(&self) -> bool {
        self.nodes.live() == 0
            && self.names.live() == 0
            && self.args.live() == 0
            && self.stack.is_empty()
            && self.cache.resolved() == 0
    }
}
