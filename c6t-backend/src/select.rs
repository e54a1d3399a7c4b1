//! Instruction selection with per-node memoization
//!
//! Selection is a shallow match of a node (and its children's opcodes)
//! against the catalog in order. Results are cached per node and register,
//! because the placement cascade asks the same questions about the same
//! subtrees many times.

use crate::arena::{NodeArena, NodeRef};
use c6t_codegen::{Difficulty, Reg, Template, TemplateCatalog, TemplateId};
use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheSlot {
    #[default]
    Unresolved,
    NoMatch,
    Matched(TemplateId),
}

/// Selection results for the nodes of the current statement
#[derive(Debug, Default)]
pub struct SelectionCache {
    slots: Vec<[CacheSlot; 2]>,
    scans: usize,
}

impl SelectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, node: NodeRef, reg: Reg) -> CacheSlot {
        self.slots
            .get(node.index())
            .map_or(CacheSlot::Unresolved, |slot| slot[reg.index()])
    }

    fn store(&mut self, node: NodeRef, reg: Reg, slot: CacheSlot) {
        let i = node.index();
        if self.slots.len() <= i {
            self.slots.resize(i + 1, [CacheSlot::Unresolved; 2]);
        }
        self.slots[i][reg.index()] = slot;
    }

    /// Number of catalog scans performed since the last clear
    pub fn scans(&self) -> usize {
        self.scans
    }

    /// Number of resolved (node, register) entries
    pub fn resolved(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| **slot != CacheSlot::Unresolved)
            .count()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.scans = 0;
    }
}

/// Catalog queries about the nodes of one statement
pub struct Selector<'a> {
    catalog: &'a TemplateCatalog,
    arena: &'a NodeArena,
    cache: &'a mut SelectionCache,
}

impl<'a> Selector<'a> {
    pub fn new(catalog: &'a TemplateCatalog, arena: &'a NodeArena, cache: &'a mut SelectionCache) -> Self {
        Self {
            catalog,
            arena,
            cache,
        }
    }

    pub fn arena(&self) -> &'a NodeArena {
        self.arena
    }

    pub fn template(&self, id: TemplateId) -> &'a Template {
        self.catalog.get(id)
    }

    /// First catalog template able to compute `node` into `reg`
    pub fn select(&mut self, node: NodeRef, reg: Reg) -> Option<TemplateId> {
        match self.cache.lookup(node, reg) {
            CacheSlot::Matched(id) => return Some(id),
            CacheSlot::NoMatch => return None,
            CacheSlot::Unresolved => {}
        }

        let arena = self.arena;
        let n = &arena[node];
        let child = |c: Option<NodeRef>| c.map(|c| arena[c].opcode);
        let found = self.catalog.find(n.opcode, child(n.left), child(n.right), reg);
        self.cache.scans += 1;
        trace!("select {} into {}: {:?}", n.opcode, reg, found);

        self.cache.store(
            node,
            reg,
            found.map_or(CacheSlot::NoMatch, CacheSlot::Matched),
        );
        found
    }

    /// The child a single-register template computes before its recipe runs
    pub fn left_descent(&self, node: NodeRef, template: &Template) -> Option<NodeRef> {
        let n = &self.arena[node];
        match (template.flags.skip_left, template.flags.skip_right) {
            (true, true) => None,
            (true, false) => n.right,
            (false, _) => n.left,
        }
    }

    /// The second child a template computes, if it computes two
    pub fn right_descent(&self, node: NodeRef, template: &Template) -> Option<NodeRef> {
        if template.flags.skip_left || template.flags.skip_right {
            None
        } else {
            self.arena[node].right
        }
    }

    /// Whether `node` can be computed into `reg` using that register alone,
    /// without touching the other one. An empty subtree trivially can.
    pub fn computable_alone(&mut self, node: Option<NodeRef>, reg: Reg) -> bool {
        let Some(n) = node else {
            return true;
        };
        let Some(id) = self.select(n, reg) else {
            return false;
        };
        let template = self.template(id);
        match template.difficulty {
            Difficulty::DirectHl if !reg.is_primary() => false,
            Difficulty::DirectHl | Difficulty::EitherRegister => {
                let left = self.left_descent(n, template);
                let right = self.right_descent(n, template);
                self.computable_alone(left, reg) && self.computable_alone(right, reg)
            }
            Difficulty::BinaryBoth | Difficulty::Special => false,
        }
    }
}
