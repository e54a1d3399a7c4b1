//! C6T IR backend
//!
//! Reads the line-oriented C6T intermediate representation and lowers it
//! to Intel 8080 assembly. Node lines build expression trees on a stack,
//! simplifying them as they go; command lines consume a tree and emit code
//! for it by matching nodes against a template catalog.

pub mod arena;
pub mod context;
pub mod dispatch;
pub mod generate;
pub mod ir;
pub mod normalize;
pub mod optimize;
pub mod regmgmt;
pub mod select;
pub mod switch;

#[cfg(test)]
mod tests;

pub use arena::{ArenaLimits, NAME_MAX};
pub use context::StatementContext;
pub use switch::{plan_switch, SwitchCase, SwitchLowering, SwitchStrategy};

use c6t_codegen::{AsmInst, AsmWriter, TemplateCatalog};
use c6t_common::{CompileResult, CompilerError, SourceLocation};
use dispatch::Dispatcher;
use ir::IrStatement;
use log::{debug, info};

/// Configuration for a backend run
#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub catalog: TemplateCatalog,
    pub limits: ArenaLimits,
    /// Name used for the input in diagnostics
    pub filename: String,
}

impl BackendOptions {
    pub fn new(catalog: TemplateCatalog) -> Self {
        Self {
            catalog,
            limits: ArenaLimits::default(),
            filename: SourceLocation::stdin().filename,
        }
    }

    /// Options using the built-in 8080 catalog
    pub fn i8080() -> CompileResult<Self> {
        Ok(Self::new(TemplateCatalog::i8080()?))
    }

    pub fn with_limits(mut self, limits: ArenaLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }
}

/// Line-at-a-time IR to assembly translator
pub struct Backend {
    catalog: TemplateCatalog,
    ctx: StatementContext,
    out: AsmWriter,
    location: SourceLocation,
}

impl Backend {
    pub fn new(options: BackendOptions) -> Self {
        Self {
            catalog: options.catalog,
            ctx: StatementContext::new(options.limits),
            out: AsmWriter::new(),
            location: SourceLocation::new(&options.filename, 0),
        }
    }

    /// Process the next IR line. Errors carry the line's location.
    pub fn process_line(&mut self, text: &str) -> CompileResult<()> {
        self.location.advance();
        let result = self.line(text);
        self.ctx.end_line();
        result.map_err(|e| e.at(&self.location))
    }

    fn line(&mut self, text: &str) -> CompileResult<()> {
        let line = ir::parse_line(text, &self.location, &mut self.ctx.args, &mut self.ctx.names)?;
        for label in line.labels {
            self.out.emit(AsmInst::Label(label));
        }

        match line.statement {
            None => Ok(()),
            Some(IrStatement::Node { opcode, args }) => self.ctx.push_node(opcode, args),
            Some(IrStatement::Command { command, args }) => {
                debug!("{}: {}", self.location, command);
                Dispatcher::new(&mut self.ctx, &self.catalog, &mut self.out).run(command, args)
            }
        }
    }

    /// Check that no expression was left without a command to consume it
    pub fn finish(&self) -> CompileResult<()> {
        if self.ctx.stack.is_empty() {
            Ok(())
        } else {
            Err(CompilerError::UnbalancedNodeStack {
                remaining: self.ctx.stack.len(),
            }
            .at(&self.location))
        }
    }

    /// Assembly produced so far
    pub fn output(&self) -> &str {
        self.out.text()
    }

    pub fn into_output(self) -> String {
        self.out.into_text()
    }

    pub fn context(&self) -> &StatementContext {
        &self.ctx
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn labels_allocated(&self) -> u32 {
        self.out.labels_allocated()
    }
}

/// Translate a whole IR text
pub fn compile(source: &str, options: BackendOptions) -> CompileResult<String> {
    let mut backend = Backend::new(options);
    for line in source.lines() {
        backend.process_line(line)?;
    }
    backend.finish()?;
    info!(
        "{}: {} lines, {} generated labels",
        backend.location().filename,
        backend.location().line,
        backend.labels_allocated()
    );
    Ok(backend.into_output())
}
