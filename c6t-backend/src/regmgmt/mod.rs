//! Register management for two-operand templates
//!
//! With only two compute registers there is no allocation to speak of; the
//! interesting decision is how to get both operands of a `binary_both`
//! template into HL and DE while spilling as little as possible.

mod placement;

pub use placement::{Placement, PlacementStep};
