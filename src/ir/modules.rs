//! Component B / §6 — the whole-program input/output shapes.

use crate::ir::functions::{Class, Function};
use crate::ir::types::QualifiedName;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single compilation unit's declarations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
}

/// Input to the core: a resolved, type-checked whole program (§6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub modules: Vec<Module>,
    pub functions: IndexMap<QualifiedName, Function>,
    pub classes: IndexMap<QualifiedName, Class>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Output to the backend: functions and classes keyed by the concrete
/// ownership signature they were monomorphized for (§6).
#[derive(Debug, Clone, Default)]
pub struct MonomorphizedOutput {
    pub classes: IndexMap<crate::ir::types::ClassInstantiationSignature, Class>,
    pub functions: IndexMap<crate::ir::types::FunctionOwnershipSignature, Function>,
}
