//! C6T IR backend - Intel 8080 Target Model
//!
//! This crate describes the target side of code generation:
//!
//! - The 8080 register model and the instructions the backend emits itself
//! - The template catalog and its recipe language
//! - Assembly text output and label numbering
//!
//! The default catalog lives in `catalogs/i8080.json` and is compiled in.

pub mod asm;
pub mod catalog;
pub mod emit;
pub mod recipe;

pub use asm::{format_operand, truth_test, AsmInst, Directive, Pair, Reg, Reg8};
pub use catalog::{CatalogError, Difficulty, Template, TemplateCatalog, TemplateFlags, TemplateId};
pub use emit::AsmWriter;
pub use recipe::{Recipe, RecipeError, RecipeOp, LABEL_SLOTS};
