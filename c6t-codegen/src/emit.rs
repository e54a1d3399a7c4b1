//! Assembly text output
//!
//! Instructions are written one per line with no indentation, which is
//! what the companion assembler expects. Recipe text is appended verbatim.

use crate::asm::AsmInst;
use c6t_common::LabelId;

/// Accumulates assembly text for a whole run and hands out `LL<n>` labels
#[derive(Debug, Default)]
pub struct AsmWriter {
    text: String,
    last_label: LabelId,
}

impl AsmWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, inst: AsmInst) {
        self.text.push_str(&inst.to_string());
        self.text.push('\n');
    }

    pub fn emit_all(&mut self, insts: impl IntoIterator<Item = AsmInst>) {
        for inst in insts {
            self.emit(inst);
        }
    }

    /// Append text exactly as given
    pub fn raw(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Allocate the next compiler-generated label; numbering is run-wide
    pub fn fresh_label(&mut self) -> String {
        self.last_label += 1;
        format!("LL{}", self.last_label)
    }

    pub fn labels_allocated(&self) -> LabelId {
        self.last_label
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
