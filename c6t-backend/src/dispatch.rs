//! Command execution
//!
//! A command consumes the tree on top of the node stack (when it takes one)
//! and its own arguments, emits its code, and releases the statement's
//! nodes and names.

use crate::arena::{ArgRef, Argument, NodeRef};
use crate::context::StatementContext;
use crate::generate::CodeGenerator;
use crate::normalize::normalize;
use c6t_codegen::{format_operand, AsmInst, AsmWriter, Directive, Pair, Reg, Reg8, TemplateCatalog};
use c6t_common::{ArgCount, CommandKind, CompileResult, CompilerError, Opcode};
use log::debug;

pub struct Dispatcher<'a> {
    ctx: &'a mut StatementContext,
    catalog: &'a TemplateCatalog,
    out: &'a mut AsmWriter,
}

impl<'a> Dispatcher<'a> {
    pub fn new(ctx: &'a mut StatementContext, catalog: &'a TemplateCatalog, out: &'a mut AsmWriter) -> Self {
        Self { ctx, catalog, out }
    }

    /// Execute a command; the statement context is reset whether or not it
    /// succeeds.
    pub fn run(mut self, command: CommandKind, args: Option<ArgRef>) -> CompileResult<()> {
        let result = self.execute(command, args);
        self.ctx.reset();
        result
    }

    fn execute(&mut self, command: CommandKind, args: Option<ArgRef>) -> CompileResult<()> {
        let found = self.ctx.args.count(args);
        if let ArgCount::Fixed(expected) = command.arg_count() {
            if found != expected {
                return Err(CompilerError::ArgCountMismatch {
                    command,
                    expected,
                    found,
                });
            }
        }

        let tree = if command.carries_tree() {
            let tree = self.ctx.stack.pop()?;
            if tree.is_none() {
                return Err(CompilerError::MissingTree { command });
            }
            tree
        } else {
            None
        };
        if !self.ctx.stack.is_empty() {
            return Err(CompilerError::UnbalancedNodeStack {
                remaining: self.ctx.stack.len(),
            });
        }
        debug!("{command} with {found} argument(s)");

        if command == CommandKind::Eval {
            self.discard_result(tree);
        }
        let tree = normalize(&mut self.ctx.nodes, &mut self.ctx.names, tree)?;

        let leaves = self.ctx.args.leaves(args);
        let operands = leaves
            .iter()
            .map(|a| self.operand(command, a))
            .collect::<CompileResult<Vec<_>>>()?;
        let list = (!operands.is_empty()).then(|| operands.join(","));

        match command {
            CommandKind::Byte => self.directive(Directive::Db, list),
            CommandKind::Word => self.directive(Directive::Dw, list),
            CommandKind::Storage => self.directive(Directive::Ds, list),
            CommandKind::Export => self.directive(Directive::Export, list),
            CommandKind::Common => self.directive(Directive::Common, list),
            CommandKind::Code => self.directive(Directive::Code, None),
            CommandKind::Data => self.directive(Directive::Data, None),
            CommandKind::Bss => self.directive(Directive::Bss, None),
            CommandKind::String => self.directive(Directive::String, None),
            CommandKind::UsedRegs | CommandKind::EndFunc | CommandKind::End => {}
            CommandKind::Autos => {
                if leaves[0] != Argument::Constant(0) {
                    let size = self.negated(command, &leaves[0])?;
                    self.out.emit_all([
                        AsmInst::Lxi(Pair::H, size),
                        AsmInst::Dad(Pair::Sp),
                        AsmInst::Sphl,
                    ]);
                }
            }
            CommandKind::Func => self.out.emit(AsmInst::Call("csave".to_string())),
            CommandKind::Ret => {
                self.generator().emit_expr(tree)?;
                self.out.emit(AsmInst::Jmp("cret".to_string()));
            }
            CommandKind::RetNull => self.out.emit(AsmInst::Jmp("cret".to_string())),
            CommandKind::Jmp => self.out.emit(AsmInst::Jmp(operands[0].clone())),
            CommandKind::Brz => self.branch_if_zero(tree, operands[0].clone())?,
            CommandKind::Eval => self.generator().emit_expr(tree)?,
            CommandKind::Switch => {
                for operand in operands {
                    self.out.emit_all([AsmInst::Lxi(Pair::H, operand), AsmInst::Push(Pair::H)]);
                }
                self.generator().emit_expr(tree)?;
                self.out.emit_all([AsmInst::Push(Pair::H), AsmInst::Jmp("cswitch".to_string())]);
            }
            CommandKind::SwEasy => {
                let base = (leaves[2] != Argument::Constant(0))
                    .then(|| self.negated(command, &leaves[2]))
                    .transpose()?;
                self.table_switch(tree, &operands, base)?;
            }
            CommandKind::StkJmp => self.stack_jump(tree)?,
        }
        Ok(())
    }

    fn generator(&mut self) -> CodeGenerator<'_> {
        CodeGenerator::new(
            self.catalog,
            &self.ctx.nodes,
            &self.ctx.names,
            &mut self.ctx.cache,
            &mut *self.out,
        )
    }

    fn directive(&mut self, directive: Directive, operands: Option<String>) {
        self.out.emit(AsmInst::Directive(directive, operands));
    }

    /// A discarded post-increment is a pre-increment
    fn discard_result(&mut self, tree: Option<NodeRef>) {
        if let Some(root) = tree {
            let node = &mut self.ctx.nodes[root];
            node.opcode = match node.opcode {
                Opcode::Post => Opcode::Pre,
                Opcode::CPost => Opcode::CPre,
                other => other,
            };
        }
    }

    fn branch_if_zero(&mut self, tree: Option<NodeRef>, target: String) -> CompileResult<()> {
        let (tested, inverted) = match tree.map(|t| &self.ctx.nodes[t]) {
            Some(node) if node.opcode == Opcode::Log => (node.left, false),
            Some(node) if node.opcode == Opcode::LogNot => (node.left, true),
            _ => (tree, false),
        };
        let mut gen = self.generator();
        gen.emit_expr(tested)?;
        gen.emit_test(Reg::Hl);
        gen.emit_inst(if inverted {
            AsmInst::Jnz(target)
        } else {
            AsmInst::Jz(target)
        });
        Ok(())
    }

    /// `SWEASY table,default,base,length`
    fn table_switch(&mut self, tree: Option<NodeRef>, operands: &[String], base: Option<String>) -> CompileResult<()> {
        let (table, default, length) = (&operands[0], &operands[1], &operands[3]);
        self.generator().emit_expr(tree)?;
        if let Some(base) = base {
            self.out.emit_all([AsmInst::Lxi(Pair::D, base), AsmInst::Dad(Pair::D)]);
        }
        self.out.emit_all([
            AsmInst::Lxi(Pair::D, length.clone()),
            AsmInst::Mov(Reg8::A, Reg8::L),
            AsmInst::Sub(Reg8::E),
            AsmInst::Mov(Reg8::A, Reg8::H),
            AsmInst::Sbb(Reg8::D),
            AsmInst::Jnc(default.clone()),
            AsmInst::Dad(Pair::H),
            AsmInst::Lxi(Pair::D, table.clone()),
            AsmInst::Dad(Pair::D),
            AsmInst::Mov(Reg8::A, Reg8::M),
            AsmInst::Inx(Pair::H),
            AsmInst::Mov(Reg8::H, Reg8::M),
            AsmInst::Mov(Reg8::L, Reg8::A),
            AsmInst::Pchl,
        ]);
        Ok(())
    }

    fn stack_jump(&mut self, tree: Option<NodeRef>) -> CompileResult<()> {
        let target = tree
            .map(|t| &self.ctx.nodes[t])
            .filter(|node| node.opcode == Opcode::Con)
            .map(|node| format_operand(node.symbol.map(|s| self.ctx.names.resolve(s)), node.constant));
        match target {
            Some(target) => self.out.emit(AsmInst::Jmp(target)),
            None => {
                self.generator().emit_expr(tree)?;
                self.out.emit(AsmInst::Pchl);
            }
        }
        Ok(())
    }

    fn operand(&self, command: CommandKind, arg: &Argument) -> CompileResult<String> {
        let (name, constant) = arg.operand().ok_or_else(|| CompilerError::BadArgument {
            command,
            message: "nested argument list".to_string(),
        })?;
        Ok(format_operand(name.map(|n| self.ctx.names.resolve(n)), constant))
    }

    /// The negation of an argument, for subtracting it with `dad`
    fn negated(&self, command: CommandKind, arg: &Argument) -> CompileResult<String> {
        match *arg {
            Argument::Constant(c) => Ok(c.wrapping_neg().to_string()),
            Argument::Name(name) => Ok(format!("-{}", self.ctx.names.resolve(name))),
            // -(name+c) is written -name-c
            Argument::Offset(name, c) => Ok(format!(
                "-{}",
                format_operand(Some(self.ctx.names.resolve(name)), c.wrapping_neg())
            )),
            Argument::List(..) => Err(CompilerError::BadArgument {
                command,
                message: "nested argument list".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaLimits;
    use pretty_assertions::assert_eq;

    fn run(ctx: &mut StatementContext, command: CommandKind, args: &[Argument]) -> CompileResult<String> {
        let catalog = TemplateCatalog::i8080()?;
        let mut out = AsmWriter::new();
        let leaves = args
            .iter()
            .map(|a| ctx.args.push(*a))
            .collect::<CompileResult<Vec<_>>>()?;
        let list = ctx.args.push_list(&leaves)?;
        Dispatcher::new(ctx, &catalog, &mut out).run(command, list)?;
        Ok(out.into_text())
    }

    #[test]
    fn test_data_directives() {
        let mut ctx = StatementContext::new(ArenaLimits::default());
        let x = ctx.names.intern("_x").unwrap();
        let asm = run(
            &mut ctx,
            CommandKind::Word,
            &[Argument::Constant(1), Argument::Offset(x, -2), Argument::Name(x)],
        )
        .unwrap();
        assert_eq!(asm, ".dw 1,_x-2,_x\n");
        assert_eq!(run(&mut ctx, CommandKind::Bss, &[]).unwrap(), ".bss\n");
    }

    #[test]
    fn test_autos() {
        let mut ctx = StatementContext::new(ArenaLimits::default());
        assert_eq!(run(&mut ctx, CommandKind::Autos, &[Argument::Constant(0)]).unwrap(), "");
        assert_eq!(
            run(&mut ctx, CommandKind::Autos, &[Argument::Constant(6)]).unwrap(),
            "lxi h,-6\ndad sp\nsphl\n"
        );
    }

    #[test]
    fn test_symbolic_sizes_are_negated_whole() {
        let mut ctx = StatementContext::new(ArenaLimits::default());
        let size = ctx.names.intern("_sz").unwrap();
        assert_eq!(
            run(&mut ctx, CommandKind::Autos, &[Argument::Offset(size, 2)]).unwrap(),
            "lxi h,-_sz-2\ndad sp\nsphl\n"
        );
        let size = ctx.names.intern("_sz").unwrap();
        assert_eq!(
            run(&mut ctx, CommandKind::Autos, &[Argument::Offset(size, -4)]).unwrap(),
            "lxi h,-_sz+4\ndad sp\nsphl\n"
        );
        let size = ctx.names.intern("_sz").unwrap();
        assert_eq!(
            run(&mut ctx, CommandKind::Autos, &[Argument::Name(size)]).unwrap(),
            "lxi h,-_sz\ndad sp\nsphl\n"
        );
    }

    #[test]
    fn test_arg_count_is_checked() {
        let mut ctx = StatementContext::new(ArenaLimits::default());
        let err = run(
            &mut ctx,
            CommandKind::Jmp,
            &[Argument::Constant(1), Argument::Constant(2)],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "bad arg count for JMP: expected 1, found 2");
        assert!(ctx.is_clear());
    }

    #[test]
    fn test_tree_commands_need_a_tree() {
        let mut ctx = StatementContext::new(ArenaLimits::default());
        ctx.stack.push(None).unwrap();
        let err = run(&mut ctx, CommandKind::Eval, &[]).unwrap_err();
        assert_eq!(err, CompilerError::MissingTree { command: CommandKind::Eval });
    }

    #[test]
    fn test_leftover_nodes_are_an_error() {
        let mut ctx = StatementContext::new(ArenaLimits::default());
        let c = ctx.args.push(Argument::Constant(1)).unwrap();
        ctx.push_node(Some(Opcode::Con), Some(c)).unwrap();
        let err = run(&mut ctx, CommandKind::RetNull, &[]).unwrap_err();
        assert_eq!(err, CompilerError::UnbalancedNodeStack { remaining: 1 });
        assert!(ctx.is_clear());
    }
}
