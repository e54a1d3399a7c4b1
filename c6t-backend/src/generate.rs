//! Tree-to-assembly emission
//!
//! The generator walks a normalized tree, selecting a template for each node
//! and emitting its children in the order the template's difficulty calls
//! for before instantiating its recipe.

use crate::arena::{NamePool, NodeArena, NodeRef};
use crate::regmgmt::{Placement, PlacementStep};
use crate::select::{SelectionCache, Selector};
use c6t_codegen::{
    format_operand, truth_test, AsmInst, AsmWriter, Difficulty, Pair, RecipeOp, Reg, Template,
    TemplateCatalog, TemplateId, LABEL_SLOTS,
};
use c6t_common::{CompileResult, CompilerError, Opcode, Side};
use log::trace;

/// Fresh labels of one recipe instantiation
#[derive(Debug, Default)]
pub struct LabelSlots([Option<String>; LABEL_SLOTS]);

impl LabelSlots {
    /// Slots with `T0` already bound to an existing label
    pub fn seeded(first: String) -> Self {
        Self([Some(first), None])
    }

    fn get_or_alloc(&mut self, slot: usize, out: &mut AsmWriter) -> String {
        self.0[slot].get_or_insert_with(|| out.fresh_label()).clone()
    }
}

pub struct CodeGenerator<'a> {
    selector: Selector<'a>,
    names: &'a NamePool,
    out: &'a mut AsmWriter,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(
        catalog: &'a TemplateCatalog,
        arena: &'a NodeArena,
        names: &'a NamePool,
        cache: &'a mut SelectionCache,
        out: &'a mut AsmWriter,
    ) -> Self {
        Self {
            selector: Selector::new(catalog, arena, cache),
            names,
            out,
        }
    }

    fn arena(&self) -> &'a NodeArena {
        self.selector.arena()
    }

    pub fn emit_inst(&mut self, inst: AsmInst) {
        self.out.emit(inst);
    }

    /// Compute a whole expression into HL
    pub fn emit_expr(&mut self, node: Option<NodeRef>) -> CompileResult<()> {
        self.emit(node, Reg::Hl)
    }

    /// Set the zero flag from a register
    pub fn emit_test(&mut self, reg: Reg) {
        self.out.emit_all(truth_test(reg));
    }

    /// Compute `node` into `reg`; an empty subtree emits nothing
    pub fn emit(&mut self, node: Option<NodeRef>, reg: Reg) -> CompileResult<()> {
        let Some(n) = node else {
            return Ok(());
        };
        let opcode = self.arena()[n].opcode;
        let id = self
            .selector
            .select(n, reg)
            .ok_or(CompilerError::NoTemplate {
                opcode,
                register: reg.name(),
            })?;
        let template = self.selector.template(id);
        trace!("emit {} into {} with {}", opcode, reg, template);

        match template.difficulty {
            Difficulty::DirectHl | Difficulty::EitherRegister => {
                let child = self.selector.left_descent(n, template);
                self.emit(child, reg)?;
                self.instantiate(n, id, reg, &mut LabelSlots::default())
            }
            Difficulty::BinaryBoth => self.emit_binary(n, id, reg),
            Difficulty::Special => self.emit_special(n, id, reg),
        }
    }

    fn emit_binary(&mut self, n: NodeRef, id: TemplateId, reg: Reg) -> CompileResult<()> {
        let arena = self.arena();
        let node = &arena[n];
        if !reg.is_primary() {
            return Err(CompilerError::BadRegister {
                opcode: node.opcode,
                register: reg.name(),
            });
        }

        let placement = Placement::choose(&mut self.selector, node.left, node.right);
        for step in placement.steps() {
            match step {
                PlacementStep::Compute(Side::Left, into) => self.emit(node.left, into)?,
                PlacementStep::Compute(Side::Right, into) => self.emit(node.right, into)?,
                PlacementStep::Exchange => self.out.emit(AsmInst::Xchg),
                PlacementStep::SpillPrimary => self.out.emit(AsmInst::Push(Pair::H)),
                PlacementStep::RestoreSecondary => self.out.emit(AsmInst::Pop(Pair::D)),
            }
        }
        if placement.swaps_operands() && !self.selector.template(id).flags.commutative {
            self.out.emit(AsmInst::Xchg);
        }
        self.instantiate(n, id, reg, &mut LabelSlots::default())
    }

    fn emit_special(&mut self, n: NodeRef, id: TemplateId, reg: Reg) -> CompileResult<()> {
        let arena = self.arena();
        let node = &arena[n];
        let template = self.selector.template(id);
        if !reg.is_primary() {
            return Err(CompilerError::BadRegister {
                opcode: node.opcode,
                register: reg.name(),
            });
        }

        match node.opcode {
            Opcode::Comma => {
                self.emit(node.left, Reg::Hl)?;
                self.emit(node.right, Reg::Hl)
            }
            Opcode::Quest => self.emit_conditional(node.left, node.right),
            Opcode::LogOr | Opcode::LogAnd => {
                self.emit(node.left, Reg::Hl)?;
                let end = self.out.fresh_label();
                self.instantiate(n, id, reg, &mut LabelSlots::seeded(end.clone()))?;
                self.emit(node.right, Reg::Hl)?;
                self.out.emit(AsmInst::Label(end));
                Ok(())
            }
            Opcode::Pre | Opcode::Post | Opcode::CPre | Opcode::CPost => {
                self.emit(node.left, Reg::Hl)?;
                self.instantiate(n, id, reg, &mut LabelSlots::default())
            }
            Opcode::Arg => {
                let (first, rest) = self.descents(n, template);
                self.emit(first, Reg::Hl)?;
                self.instantiate(n, id, reg, &mut LabelSlots::default())?;
                self.emit(rest, Reg::Hl)
            }
            Opcode::Call => {
                let (args, callee) = self.descents(n, template);
                self.emit(args, Reg::Hl)?;
                self.emit(callee, Reg::Hl)?;
                self.instantiate(n, id, reg, &mut LabelSlots::default())?;
                for _ in 0..count_args(arena, node.left) {
                    self.out.emit(AsmInst::Pop(Pair::D));
                }
                Ok(())
            }
            opcode => Err(CompilerError::internal(format!(
                "{opcode} has no special form"
            ))),
        }
    }

    fn descents(&self, n: NodeRef, template: &Template) -> (Option<NodeRef>, Option<NodeRef>) {
        (
            self.selector.left_descent(n, template),
            self.selector.right_descent(n, template),
        )
    }

    /// `cond ? a : b` where `branches` is the `COLON` node holding `a` and `b`
    fn emit_conditional(&mut self, cond: Option<NodeRef>, branches: Option<NodeRef>) -> CompileResult<()> {
        let arena = self.arena();
        let colon = branches
            .map(|b| &arena[b])
            .filter(|b| b.opcode == Opcode::Colon)
            .ok_or(CompilerError::MissingOperand {
                opcode: Opcode::Quest,
                side: Side::Right,
            })?;
        self.emit(cond, Reg::Hl)?;
        self.emit_test(Reg::Hl);
        let otherwise = self.out.fresh_label();
        let done = self.out.fresh_label();
        self.out.emit(AsmInst::Jz(otherwise.clone()));
        self.emit(colon.left, Reg::Hl)?;
        self.out.emit(AsmInst::Jmp(done.clone()));
        self.out.emit(AsmInst::Label(otherwise));
        self.emit(colon.right, Reg::Hl)?;
        self.out.emit(AsmInst::Label(done));
        Ok(())
    }

    /// Expand a template's recipe for `node` computed into `reg`
    pub fn instantiate(
        &mut self,
        node: NodeRef,
        id: TemplateId,
        reg: Reg,
        labels: &mut LabelSlots,
    ) -> CompileResult<()> {
        let template = self.selector.template(id);
        let mut focus = Some(node);
        self.run_recipe(template, template.recipe.ops(), node, &mut focus, reg, labels)
    }

    fn run_recipe(
        &mut self,
        template: &Template,
        ops: &[RecipeOp],
        node: NodeRef,
        focus: &mut Option<NodeRef>,
        reg: Reg,
        labels: &mut LabelSlots,
    ) -> CompileResult<()> {
        let arena = self.arena();
        for op in ops {
            match op {
                RecipeOp::Text(text) => self.out.raw(text),
                RecipeOp::DescendLeft => *focus = focus.and_then(|f| arena[f].left),
                RecipeOp::DescendRight => *focus = focus.and_then(|f| arena[f].right),
                RecipeOp::Value => {
                    let f = focus.ok_or_else(|| missing_focus(template))?;
                    let text = self.operand(f);
                    self.out.raw(&text);
                    *focus = Some(node);
                }
                RecipeOp::RegHigh => self.out.raw(&reg.high().to_string()),
                RecipeOp::RegLow => self.out.raw(&reg.low().to_string()),
                RecipeOp::Repeat(body) => {
                    let f = focus.ok_or_else(|| missing_focus(template))?;
                    let count = arena[f].constant.max(0);
                    *focus = Some(node);
                    for _ in 0..count {
                        self.run_recipe(template, body, node, focus, reg, labels)?;
                    }
                }
                RecipeOp::FreshLabel(slot) => {
                    let label = labels.get_or_alloc(*slot, self.out);
                    self.out.raw(&label);
                }
            }
        }
        Ok(())
    }

    /// A node's operand text: `name`, `name+c`, `name-c` or `c`
    fn operand(&self, node: NodeRef) -> String {
        let arena = self.arena();
        let n = &arena[node];
        format_operand(n.symbol.map(|s| self.names.resolve(s)), n.constant)
    }
}

fn missing_focus(template: &Template) -> CompilerError {
    CompilerError::BadRecipe {
        opcode: template.label,
        message: "recipe refers to a missing child".to_string(),
    }
}

/// Number of arguments in an `ARG` chain; an empty chain has none
pub fn count_args(arena: &NodeArena, node: Option<NodeRef>) -> usize {
    match node {
        None => 0,
        Some(n) if arena[n].opcode == Opcode::Arg => {
            count_args(arena, arena[n].left) + count_args(arena, arena[n].right)
        }
        Some(_) => 1,
    }
}
