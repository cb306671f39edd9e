//! Component B — the closed instruction variant set.
//!
//! A tagged `enum` with exhaustive matching replaces the reference
//! implementation's `isinstance` dispatch across instruction classes — the
//! direct systems-language equivalent, and it removes a whole class of
//! unhandled-variant bugs (see design notes).

use crate::ids::TypeVariableInfo;
use crate::ir::blocks::BlockId;
use crate::ir::types::{
    ClassInstantiationSignature, LifetimeAnnotation, MemberInfo, Ownership, QualifiedName, TempVar,
};
use serde::{Deserialize, Serialize};

/// `(block_index, offset)` — an instruction's position within its `Body`.
/// Not a dense counter like the other IDs: it doubles as the lookup key into
/// `Body::blocks[block_index].instructions[offset]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstructionId {
    pub block_index: u32,
    pub offset: u32,
}

impl InstructionId {
    pub fn new(block_index: u32, offset: u32) -> Self {
        Self {
            block_index,
            offset,
        }
    }
}

impl std::fmt::Display for InstructionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "i{}:{}", self.block_index, self.offset)
    }
}

/// The operation an instruction performs. Closed by design: every engine in
/// the core matches on this exhaustively so adding a variant is a
/// compile-time-visible event everywhere it must be handled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InstructionKind {
    /// References another block's value (its `getLastReal()`); used to
    /// thread `If`/`Loop` arm results back into the enclosing block.
    BlockRef { block: BlockId },
    /// A (possibly constructor) call to a statically known function.
    NamedFunctionCall {
        name: QualifiedName,
        ctor: bool,
        args: Vec<TempVar>,
    },
    /// A call through a first-class function value.
    DynamicFunctionCall { callee: TempVar, args: Vec<TempVar> },
    /// A virtual dispatch; the pipeline asserts this has already been
    /// rewritten to `NamedFunctionCall` before it reaches profile building
    /// (see open-question resolution in the design notes).
    MethodCall {
        receiver: TempVar,
        name: QualifiedName,
        args: Vec<TempVar>,
    },
    /// Binds a name to the value produced by another instruction.
    Bind { name: TempVar, rhs: InstructionId },
    /// Projects a field out of a receiver by static index.
    MemberAccess {
        receiver: TempVar,
        name: String,
        index: u32,
    },
    /// A use of a variable, optionally through a chain of field indices.
    ValueRef {
        name: TempVar,
        bind_id: InstructionId,
        fields: Vec<String>,
        indices: Vec<u32>,
        borrow: bool,
        move_: bool,
        clone: bool,
    },
    /// A synthetic drop of a variable; `cancelled` is set by the
    /// borrow-path analyzer once it proves the value was already moved.
    DropVar { name: TempVar, cancelled: bool },
    /// No-op, including a cancelled drop rewritten before backend emission.
    Nop,
    If {
        cond: TempVar,
        true_branch: BlockId,
        false_branch: BlockId,
    },
    Loop {
        var: TempVar,
        init: TempVar,
        body: BlockId,
    },
    Break { arg: Option<TempVar> },
    Continue { arg: Option<TempVar> },
    Return { arg: Option<TempVar> },
    BoolLiteral { value: bool },
    Tuple { args: Vec<TempVar> },
}

impl InstructionKind {
    pub fn is_drop(&self) -> bool {
        matches!(self, InstructionKind::DropVar { .. })
    }

    pub fn is_nop(&self) -> bool {
        matches!(self, InstructionKind::Nop)
    }

    /// `true` for instructions §4.I pins to `Owner` via `CtorConstraint`
    /// without looking at their operands.
    pub fn is_ctor_constraint_source(&self) -> bool {
        matches!(
            self,
            InstructionKind::BoolLiteral { .. }
                | InstructionKind::Bind { .. }
                | InstructionKind::DropVar { .. }
                | InstructionKind::Nop
        ) || matches!(self, InstructionKind::NamedFunctionCall { ctor: true, .. })
            || matches!(self, InstructionKind::NamedFunctionCall { name, .. } if name.is_unit())
    }
}

/// Every instruction carries an identity, its own `TypeVariableInfo`, any
/// `MemberInfo`s it emits, the paths already consumed on the way to it
/// (`moves`), and the operation itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instruction {
    pub id: InstructionId,
    pub tv_info: TypeVariableInfo,
    pub members: Vec<MemberInfo>,
    pub moves: Vec<crate::ir::types::Path>,
    pub kind: InstructionKind,
    /// The concrete class this instruction's value is known to be an
    /// instance of, when Equality's Initialize/Merge passes could determine
    /// one (a ctor call names its own class directly; a `Bind`/whole-value
    /// `ValueRef` inherits its source's). `None` for anything the core
    /// can't attribute to a single class (a field access through a
    /// heterogeneous chain, a bool literal, a tuple).
    pub ty: Option<QualifiedName>,
    /// The monomorphizer's per-instruction instantiation signature for
    /// `ty` (§6 output contract), filled in by Component L once it resolves
    /// ownership and visits this instruction.
    pub type_signature: Option<ClassInstantiationSignature>,
    /// This instruction's own resolved ownership (§4.I), filled in once
    /// `OwnershipInferenceEngine::analyze` has run.
    pub ownership: Option<Ownership>,
    /// This instruction's lifetime tag, when `ownership` resolved to a
    /// borrow under a concrete monomorphization (§6's `lifetime`/
    /// `dep_lifetimes`).
    pub lifetimes: LifetimeAnnotation,
}

impl Instruction {
    pub fn new(id: InstructionId, tv_info: TypeVariableInfo, kind: InstructionKind) -> Self {
        Self {
            id,
            tv_info,
            members: Vec::new(),
            moves: Vec::new(),
            kind,
            ty: None,
            type_signature: None,
            ownership: None,
            lifetimes: LifetimeAnnotation::none(),
        }
    }

    pub fn is_drop(&self) -> bool {
        self.kind.is_drop()
    }

    pub fn is_nop(&self) -> bool {
        self.kind.is_nop()
    }

    /// If this is a `ValueRef`, the `Path` it observes (`Whole` if no field
    /// indices, `Partial` otherwise) — see §4.D CFG-lowering rule.
    pub fn value_ref_path(&self) -> Option<crate::ir::types::Path> {
        match &self.kind {
            InstructionKind::ValueRef { name, fields, .. } => {
                Some(crate::ir::types::Path::partial(name.clone(), fields.clone()))
            }
            InstructionKind::DropVar { name, .. } => {
                Some(crate::ir::types::Path::whole_drop(name.clone()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdAllocator;

    #[test]
    fn ctor_call_is_a_ctor_constraint_source() {
        let k = InstructionKind::NamedFunctionCall {
            name: QualifiedName::function("m", "C"),
            ctor: true,
            args: vec![],
        };
        assert!(k.is_ctor_constraint_source());
    }

    #[test]
    fn non_ctor_call_is_not_a_ctor_constraint_source() {
        let k = InstructionKind::NamedFunctionCall {
            name: QualifiedName::function("m", "f"),
            ctor: false,
            args: vec![],
        };
        assert!(!k.is_ctor_constraint_source());
    }

    #[test]
    fn value_ref_with_no_fields_yields_whole_path() {
        let alloc = IdAllocator::new();
        let tvi = alloc.next_tvi();
        let instr = Instruction::new(
            InstructionId::new(0, 0),
            tvi,
            InstructionKind::ValueRef {
                name: TempVar::local(0),
                bind_id: InstructionId::new(0, 0),
                fields: vec![],
                indices: vec![],
                borrow: false,
                move_: true,
                clone: false,
            },
        );
        assert!(matches!(
            instr.value_ref_path(),
            Some(crate::ir::types::Path::Whole { .. })
        ));
    }
}
