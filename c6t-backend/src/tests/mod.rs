//! Tests spanning tree building, normalization, selection and emission


use crate::arena::{ArenaLimits, NodeRef};
use crate::context::StatementContext;
use crate::ir::{parse_line, IrStatement};
use c6t_common::SourceLocation;

pub(crate) fn context() -> StatementContext {
    StatementContext::new(ArenaLimits::default())
}

/// Run node lines through the tree builder and pop the finished tree
pub(crate) fn build(ctx: &mut StatementContext, lines: &str) -> Option<NodeRef> {
    let location = SourceLocation::new("test.ir", 1);
    for text in lines.lines() {
        let line = parse_line(text, &location, &mut ctx.args, &mut ctx.names).unwrap();
        match line.statement {
            Some(IrStatement::Node { opcode, args }) => ctx.push_node(opcode, args).unwrap(),
            other => panic!("not a node line: {other:?}"),
        }
        ctx.end_line();
    }
    let root = ctx.stack.pop().unwrap();
    assert!(ctx.stack.is_empty(), "more than one tree built");
    root
}
