//! Code generation template catalog
//!
//! The catalog is an ordered list of templates. Each one describes how to
//! compute a node with a given opcode (optionally constrained on the opcodes
//! of its children) into a register. The first template that matches wins,
//! so more specific templates must come before general ones.
//!
//! Catalogs are configuration data in JSON; the default Intel 8080 catalog is
//! compiled into the crate.

use crate::asm::Reg;
use crate::recipe::{Recipe, RecipeError};
use c6t_common::{CompilerError, Opcode};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const I8080_CATALOG: &str = include_str!("../catalogs/i8080.json");

/// How hard a template is to satisfy, which decides where it may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Computes into HL only, without disturbing DE
    DirectHl,
    /// Computes into either register without disturbing the other
    EitherRegister,
    /// Needs the left operand in HL and the right operand in DE
    BinaryBoth,
    /// Bespoke control flow handled by the generator
    Special,
}

impl Difficulty {
    /// Whether a template of this difficulty may compute into `reg`
    pub fn accepts(self, reg: Reg) -> bool {
        reg.is_primary() || self == Difficulty::EitherRegister
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::DirectHl => write!(f, "direct_hl"),
            Difficulty::EitherRegister => write!(f, "either_register"),
            Difficulty::BinaryBoth => write!(f, "binary_both"),
            Difficulty::Special => write!(f, "special"),
        }
    }
}

/// Descent and operand-order flags of a template
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TemplateFlags {
    /// The recipe consumes the left child itself (typically as `LV`)
    pub skip_left: bool,
    /// The recipe consumes the right child itself (typically as `RV`)
    pub skip_right: bool,
    /// Operands may be presented in either order
    pub commutative: bool,
}

/// Index of a template within its catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub usize);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TemplateSpec", into = "TemplateSpec")]
pub struct Template {
    pub label: Opcode,
    pub left: Option<Opcode>,
    pub right: Option<Opcode>,
    pub difficulty: Difficulty,
    pub flags: TemplateFlags,
    pub recipe: Recipe,
}

impl Template {
    pub fn new(label: Opcode, difficulty: Difficulty, recipe: &str) -> Result<Self, CatalogError> {
        let recipe = Recipe::parse(recipe).map_err(|source| CatalogError::BadRecipe {
            opcode: label,
            source,
        })?;
        let template = Self {
            label,
            left: None,
            right: None,
            difficulty,
            flags: TemplateFlags::default(),
            recipe,
        };
        template.validate()?;
        Ok(template)
    }

    pub fn with_left(mut self, opcode: Opcode) -> Self {
        self.left = Some(opcode);
        self
    }

    pub fn with_right(mut self, opcode: Opcode) -> Self {
        self.right = Some(opcode);
        self
    }

    pub fn with_flags(mut self, flags: TemplateFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Shallow match against a node's opcode and its children's opcodes
    pub fn matches(&self, opcode: Opcode, left: Option<Opcode>, right: Option<Opcode>, reg: Reg) -> bool {
        self.label == opcode
            && self.difficulty.accepts(reg)
            && self.left.map_or(true, |want| left == Some(want))
            && self.right.map_or(true, |want| right == Some(want))
    }

    fn validate(&self) -> Result<(), CatalogError> {
        match self.difficulty {
            Difficulty::Special if !self.label.has_special_form() => {
                Err(CatalogError::BadTemplate {
                    opcode: self.label,
                    message: "opcode has no special form".to_string(),
                })
            }
            Difficulty::BinaryBoth if self.label.arity() != 2 => Err(CatalogError::BadTemplate {
                opcode: self.label,
                message: "binary_both needs a binary opcode".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)?;
        if self.left.is_some() || self.right.is_some() {
            let side = |op: Option<Opcode>| op.map_or("*", |op| op.keyword());
            write!(f, "({}, {})", side(self.left), side(self.right))?;
        }
        write!(f, " [{}]", self.difficulty)
    }
}

/// On-disk shape of a template
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TemplateSpec {
    label: Opcode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    left: Option<Opcode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    right: Option<Opcode>,
    difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "is_false")]
    skip_left: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    skip_right: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    commutative: bool,
    #[serde(default)]
    recipe: String,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl TryFrom<TemplateSpec> for Template {
    type Error = CatalogError;

    fn try_from(spec: TemplateSpec) -> Result<Self, Self::Error> {
        let mut template = Template::new(spec.label, spec.difficulty, &spec.recipe)?;
        template.left = spec.left;
        template.right = spec.right;
        template.flags = TemplateFlags {
            skip_left: spec.skip_left,
            skip_right: spec.skip_right,
            commutative: spec.commutative,
        };
        Ok(template)
    }
}

impl From<Template> for TemplateSpec {
    fn from(template: Template) -> Self {
        TemplateSpec {
            label: template.label,
            left: template.left,
            right: template.right,
            difficulty: template.difficulty,
            skip_left: template.flags.skip_left,
            skip_right: template.flags.skip_right,
            commutative: template.flags.commutative,
            recipe: template.recipe.source().to_string(),
        }
    }
}

/// Errors raised while loading a catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("bad recipe for {opcode}: {source}")]
    BadRecipe { opcode: Opcode, source: RecipeError },

    #[error("bad template for {opcode}: {message}")]
    BadTemplate { opcode: Opcode, message: String },

    #[error("malformed catalog: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<CatalogError> for CompilerError {
    fn from(err: CatalogError) -> Self {
        CompilerError::CatalogError {
            message: err.to_string(),
        }
    }
}

/// An ordered, immutable set of templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateCatalog {
    pub name: String,
    templates: Vec<Template>,
}

impl TemplateCatalog {
    pub fn new(name: &str, templates: Vec<Template>) -> Self {
        Self {
            name: name.to_string(),
            templates,
        }
    }

    /// The built-in Intel 8080 catalog
    pub fn i8080() -> Result<Self, CatalogError> {
        Self::from_json(I8080_CATALOG)
    }

    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let catalog: TemplateCatalog = serde_json::from_str(text)?;
        info!(
            "loaded template catalog '{}' with {} templates",
            catalog.name,
            catalog.templates.len()
        );
        for (i, template) in catalog.templates.iter().enumerate() {
            debug!("  #{i}: {template}");
        }
        Ok(catalog)
    }

    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn get(&self, id: TemplateId) -> &Template {
        &self.templates[id.0]
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// First template matching the node shape for `reg`, scanning in order
    pub fn find(&self, opcode: Opcode, left: Option<Opcode>, right: Option<Opcode>, reg: Reg) -> Option<TemplateId> {
        self.templates
            .iter()
            .position(|t| t.matches(opcode, left, right, reg))
            .map(TemplateId)
    }
}
