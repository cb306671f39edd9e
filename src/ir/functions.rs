//! Component B — `Function`/`Class`: the units the profile builder and
//! monomorphizer operate over.

use crate::ids::{IdAllocator, TypeVariableInfo};
use crate::ir::blocks::Body;
use crate::ir::types::{
    ClassInstantiationSignature, DataFlowProfile, ExternalBorrow, FunctionOwnershipSignature,
    Lifetime, LifetimeAnnotation, MemberInfo, QualifiedName,
};
use crate::semantic_graph::ownership_graph::ForbiddenBorrows;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A function as handed to the core: already resolved and type-checked,
/// with every `ValueRef.name` a `TempVar` and every call target a
/// `QualifiedName` (see external-interface contract).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: QualifiedName,
    pub args: Vec<TypeVariableInfo>,
    pub result: TypeVariableInfo,
    pub body: Body,
    /// External borrows inherited from the caller (populated when this is a
    /// per-monomorphization specialization).
    pub external_borrows: Vec<ExternalBorrow>,

    /// Populated by the borrow-path analyzer (§4.E).
    #[serde(skip)]
    pub borrows: IndexMap<crate::ir::instructions::InstructionId, ()>,
    /// Populated by the forbidden-borrow engine (§4.G).
    #[serde(skip)]
    pub forbidden_borrows: Option<ForbiddenBorrows>,

    /// Per-argument lifetime tag under this function's current
    /// monomorphization (§6 output contract), parallel to `args`.
    pub arg_lifetimes: Vec<LifetimeAnnotation>,
    /// The result's lifetime tag; `lifetime: None` for an owner-returning
    /// function.
    pub result_lifetime: LifetimeAnnotation,
    /// Outlives edges `'la : 'lb` the monomorphizer discovered between this
    /// instantiation's argument- and result-derived lifetimes (§6's
    /// `lifetime_dependencies`).
    pub lifetime_dependencies: Vec<(Lifetime, Lifetime)>,
}

impl Function {
    pub fn new(name: QualifiedName, arity: usize, alloc: &IdAllocator) -> Self {
        let args: Vec<TypeVariableInfo> = (0..arity).map(|_| alloc.next_tvi()).collect();
        let arg_lifetimes = args.iter().map(|_| LifetimeAnnotation::none()).collect();
        Self {
            name,
            args,
            result: alloc.next_tvi(),
            body: Body::new(),
            external_borrows: Vec::new(),
            borrows: IndexMap::new(),
            forbidden_borrows: None,
            arg_lifetimes,
            result_lifetime: LifetimeAnnotation::none(),
            lifetime_dependencies: Vec::new(),
        }
    }

    pub fn signature_skeleton(&self) -> FunctionOwnershipSignature {
        FunctionOwnershipSignature::new(self.name.clone(), self.args.clone(), self.result)
    }
}

/// A class definition: its fields in declaration order, each carrying the
/// `TypeVariableInfo` allocated for that field slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub name: QualifiedName,
    pub fields: Vec<ClassField>,
    /// Whether the type checker determined this class derives `Clone`.
    pub derives_clone: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassField {
    pub name: String,
    pub index: u32,
    pub tv_info: TypeVariableInfo,
    /// This field's lifetime tag under a concrete class instantiation.
    pub lifetimes: LifetimeAnnotation,
}

impl Class {
    pub fn root_members(&self, root: crate::tast::id_types::GroupVar) -> Vec<MemberInfo> {
        self.fields
            .iter()
            .map(|f| MemberInfo::new(root, f.index, f.tv_info))
            .collect()
    }

    pub fn instantiation_skeleton(
        &self,
        root: TypeVariableInfo,
    ) -> ClassInstantiationSignature {
        ClassInstantiationSignature {
            name: self.name.clone(),
            root,
            members: self.root_members(root.group_var),
            borrows: Vec::new(),
        }
    }
}

/// Per-function published artifact: the normalized signature plus its
/// data-flow paths, consumed by callers through `ProfileStore`.
pub type FunctionProfile = DataFlowProfile;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_function_allocates_one_tvi_per_arg_plus_result() {
        let alloc = IdAllocator::new();
        let f = Function::new(QualifiedName::function("m", "f"), 2, &alloc);
        assert_eq!(f.args.len(), 2);
        assert_eq!(alloc.ownership_count(), 3);
    }
}
