//! Operand placement for `binary_both` templates
//!
//! The template needs its left operand in HL and its right operand in DE.
//! Strategies are tried cheapest first; only the last one touches the
//! stack.

use crate::select::Selector;
use crate::arena::NodeRef;
use c6t_codegen::Reg;
use c6t_common::Side;
use log::debug;
use std::fmt;

/// One step of getting both operands into registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementStep {
    /// Compute an operand into a register
    Compute(Side, Reg),
    /// `xchg`
    Exchange,
    /// `push h`
    SpillPrimary,
    /// `pop d`
    RestoreSecondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Left into HL, then right into DE without disturbing HL
    RightIntoSecondary,
    /// Right into HL, then left into DE; operands end up swapped
    LeftIntoSecondary,
    /// Right into HL, exchange, then left into HL on its own
    LeftAloneInPrimary,
    /// Left into HL, exchange, then right into HL on its own; swapped
    RightAloneInPrimary,
    /// Right into HL, push, left into HL, pop into DE
    SpillRight,
}

impl Placement {
    /// Pick the cheapest strategy for the given operands
    pub fn choose(selector: &mut Selector<'_>, left: Option<NodeRef>, right: Option<NodeRef>) -> Self {
        let placement = if selector.computable_alone(right, Reg::De) {
            Placement::RightIntoSecondary
        } else if selector.computable_alone(left, Reg::De) {
            Placement::LeftIntoSecondary
        } else if selector.computable_alone(left, Reg::Hl) {
            Placement::LeftAloneInPrimary
        } else if selector.computable_alone(right, Reg::Hl) {
            Placement::RightAloneInPrimary
        } else {
            Placement::SpillRight
        };
        debug!("operand placement: {placement}");
        placement
    }

    /// Whether the operands end up in the opposite registers
    pub fn swaps_operands(self) -> bool {
        matches!(
            self,
            Placement::LeftIntoSecondary | Placement::RightAloneInPrimary
        )
    }

    /// The steps in emission order, excluding any final fix-up exchange
    pub fn steps(self) -> Vec<PlacementStep> {
        use PlacementStep::*;
        match self {
            Placement::RightIntoSecondary => {
                vec![Compute(Side::Left, Reg::Hl), Compute(Side::Right, Reg::De)]
            }
            Placement::LeftIntoSecondary => {
                vec![Compute(Side::Right, Reg::Hl), Compute(Side::Left, Reg::De)]
            }
            Placement::LeftAloneInPrimary => vec![
                Compute(Side::Right, Reg::Hl),
                Exchange,
                Compute(Side::Left, Reg::Hl),
            ],
            Placement::RightAloneInPrimary => vec![
                Compute(Side::Left, Reg::Hl),
                Exchange,
                Compute(Side::Right, Reg::Hl),
            ],
            Placement::SpillRight => vec![
                Compute(Side::Right, Reg::Hl),
                SpillPrimary,
                Compute(Side::Left, Reg::Hl),
                RestoreSecondary,
            ],
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::RightIntoSecondary => write!(f, "right into DE"),
            Placement::LeftIntoSecondary => write!(f, "left into DE (swapped)"),
            Placement::LeftAloneInPrimary => write!(f, "left alone in HL"),
            Placement::RightAloneInPrimary => write!(f, "right alone in HL (swapped)"),
            Placement::SpillRight => write!(f, "spill right operand"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_the_last_resort_spills() {
        let all = [
            Placement::RightIntoSecondary,
            Placement::LeftIntoSecondary,
            Placement::LeftAloneInPrimary,
            Placement::RightAloneInPrimary,
            Placement::SpillRight,
        ];
        for p in all {
            let touches_stack = p
                .steps()
                .iter()
                .any(|s| matches!(s, PlacementStep::SpillPrimary | PlacementStep::RestoreSecondary));
            assert_eq!(touches_stack, p == Placement::SpillRight, "{p}");
        }
    }

    #[test]
    fn test_swapped_strategies_leave_left_in_de() {
        for p in [Placement::LeftIntoSecondary, Placement::RightAloneInPrimary] {
            assert!(p.swaps_operands());
        }
        // Right computed first, exchanged into DE, left computed into HL.
        assert_eq!(
            Placement::LeftAloneInPrimary.steps(),
            vec![
                PlacementStep::Compute(Side::Right, Reg::Hl),
                PlacementStep::Exchange,
                PlacementStep::Compute(Side::Left, Reg::Hl),
            ]
        );
        assert!(!Placement::LeftAloneInPrimary.swaps_operands());
    }
}
