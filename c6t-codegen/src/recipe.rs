//! Template recipe language
//!
//! A recipe is assembly text with a handful of control characters:
//!
//! - `L` / `R` move the focus to the left / right child of the focus node
//! - `V` writes the focus node's operand, then refocuses on the template node
//! - `G` writes the high byte register letter, `GL` the low byte one
//! - `P...P` repeats the enclosed text; the count is the focus node's
//!   constant at the opening `P` and focus resets there
//! - `T0` / `T1` write a fresh label, allocated once per instantiation
//!
//! Everything else is copied to the output verbatim. Recipes are parsed once
//! when a catalog loads so instantiation never sees malformed text.

use std::fmt;

/// Number of fresh label slots a single instantiation can use
pub const LABEL_SLOTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeOp {
    Text(String),
    DescendLeft,
    DescendRight,
    Value,
    RegHigh,
    RegLow,
    Repeat(Vec<RecipeOp>),
    FreshLabel(usize),
}

/// Parse failure inside a recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeError {
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for RecipeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for RecipeError {}

/// A parsed recipe, keeping its source text for serialization
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Recipe {
    source: String,
    ops: Vec<RecipeOp>,
}

impl Recipe {
    pub fn parse(source: &str) -> Result<Self, RecipeError> {
        let mut current: Vec<RecipeOp> = Vec::new();
        let mut outer: Option<(usize, Vec<RecipeOp>)> = None;
        let mut text = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, ch)) = chars.next() {
            let op = match ch {
                'L' => RecipeOp::DescendLeft,
                'R' => RecipeOp::DescendRight,
                'V' => RecipeOp::Value,
                'G' => {
                    if chars.next_if(|&(_, c)| c == 'L').is_some() {
                        RecipeOp::RegLow
                    } else {
                        RecipeOp::RegHigh
                    }
                }
                'T' => match chars.next() {
                    Some((_, '0')) => RecipeOp::FreshLabel(0),
                    Some((_, '1')) => RecipeOp::FreshLabel(1),
                    _ => {
                        return Err(RecipeError {
                            offset,
                            message: "label slot must be T0 or T1".to_string(),
                        })
                    }
                },
                'P' => {
                    flush(&mut text, &mut current);
                    match outer.take() {
                        Some((_, mut enclosing)) => {
                            enclosing.push(RecipeOp::Repeat(std::mem::take(&mut current)));
                            current = enclosing;
                        }
                        None => outer = Some((offset, std::mem::take(&mut current))),
                    }
                    continue;
                }
                _ => {
                    text.push(ch);
                    continue;
                }
            };
            flush(&mut text, &mut current);
            current.push(op);
        }
        flush(&mut text, &mut current);

        if let Some((offset, _)) = outer {
            return Err(RecipeError {
                offset,
                message: "unterminated repeat block".to_string(),
            });
        }

        Ok(Self {
            source: source.to_string(),
            ops: current,
        })
    }

    pub fn ops(&self) -> &[RecipeOp] {
        &self.ops
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

fn flush(text: &mut String, ops: &mut Vec<RecipeOp>) {
    if !text.is_empty() {
        ops.push(RecipeOp::Text(std::mem::take(text)));
    }
}
