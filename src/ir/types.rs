//! Component B (data model) — the types shared by every IR node: variable
//! names, paths, members, usages, borrows, and the signatures published by
//! the profile store.

use crate::ids::TypeVariableInfo;
use crate::tast::id_types::{BorrowId, GroupVar, OwnershipVar};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A renamed local variable: the resolver's name plus whether it is an
/// argument slot and its position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TempVar {
    pub is_arg: bool,
    pub index: u32,
}

impl TempVar {
    pub fn local(index: u32) -> Self {
        Self {
            is_arg: false,
            index,
        }
    }

    pub fn arg(index: u32) -> Self {
        Self {
            is_arg: true,
            index,
        }
    }
}

impl fmt::Display for TempVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_arg {
            write!(f, "arg{}", self.index)
        } else {
            write!(f, "tmp{}", self.index)
        }
    }
}

/// `(module, class_name?, name)` — hashed and compared structurally as a
/// triple; interning was dropped (see design ledger) because signatures are
/// compared this rarely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub module: String,
    pub class_name: Option<String>,
    pub name: String,
}

impl QualifiedName {
    pub fn function(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            class_name: None,
            name: name.into(),
        }
    }

    pub fn method(
        module: impl Into<String>,
        class_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            class_name: Some(class_name.into()),
            name: name.into(),
        }
    }

    /// Sentinel used for `NamedFunctionCall`s to the synthetic unit
    /// constructor (never a profile-store dependency edge).
    pub fn unit() -> Self {
        Self {
            module: String::new(),
            class_name: None,
            name: "()".to_string(),
        }
    }

    pub fn is_unit(&self) -> bool {
        self.class_name.is_none() && self.module.is_empty() && self.name == "()"
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class_name {
            Some(c) => write!(f, "{}::{}::{}", self.module, c, self.name),
            None => write!(f, "{}::{}", self.module, self.name),
        }
    }
}

/// One field edge in the type graph: "the group `root` contains a child at
/// field `index` whose own slot is `info`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberInfo {
    pub root: GroupVar,
    pub field_index: u32,
    pub info: TypeVariableInfo,
}

impl MemberInfo {
    pub fn new(root: GroupVar, field_index: u32, info: TypeVariableInfo) -> Self {
        Self {
            root,
            field_index,
            info,
        }
    }

    /// The `(root, field_index)` key the member-merge fixed point buckets on.
    pub fn key(&self) -> (GroupVar, u32) {
        (self.root, self.field_index)
    }
}

/// Used by the borrow-path analyzer: either a whole-value use or a use of
/// one field-path prefix below a root variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Path {
    /// Consumes everything reachable from `var`. `is_drop` marks a
    /// synthetic `DropVar`'s own whole-path usage.
    Whole { var: TempVar, is_drop: bool },
    /// Consumes only values below `var.fields`.
    Partial { var: TempVar, fields: Vec<String> },
}

impl Path {
    pub fn whole(var: TempVar) -> Self {
        Path::Whole {
            var,
            is_drop: false,
        }
    }

    pub fn whole_drop(var: TempVar) -> Self {
        Path::Whole {
            var,
            is_drop: true,
        }
    }

    pub fn partial(var: TempVar, fields: Vec<String>) -> Self {
        if fields.is_empty() {
            Path::whole(var)
        } else {
            Path::Partial { var, fields }
        }
    }

    pub fn root(&self) -> &TempVar {
        match self {
            Path::Whole { var, .. } => var,
            Path::Partial { var, .. } => var,
        }
    }

    pub fn is_drop(&self) -> bool {
        matches!(self, Path::Whole { is_drop: true, .. })
    }

    fn fields(&self) -> &[String] {
        match self {
            Path::Whole { .. } => &[],
            Path::Partial { fields, .. } => fields,
        }
    }

    /// Two paths for the same root invalidate each other iff one's field
    /// sequence is a prefix of the other's (whole = empty prefix). Partial
    /// vs partial uses the common-prefix rule over `min(len(a), len(b))`
    /// fields (resolved Open Question: a shared prefix invalidates even if
    /// the full sequences differ past that point).
    pub fn invalidates(&self, other: &Path) -> bool {
        if self.root() != other.root() {
            return false;
        }
        let (a, b) = (self.fields(), other.fields());
        let n = a.len().min(b.len());
        a[..n] == b[..n]
    }
}

/// `(site, path)` — one observed use of a path at a CFG node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Usage<NodeKey: Eq + std::hash::Hash + Clone> {
    pub site: NodeKey,
    pub path: Path,
}

impl<NodeKey: Eq + std::hash::Hash + Clone> Usage<NodeKey> {
    pub fn new(site: NodeKey, path: Path) -> Self {
        Self { site, path }
    }
}

/// A set of usages, carried forward through the CFG by the borrow-path
/// dataflow. Backed by `IndexSet` so re-enqueue decisions (set-equality
/// checks) and any derived iteration stay insertion-ordered.
pub type UsageSet<NodeKey> = IndexSet<Usage<NodeKey>>;

/// A borrow whose origin is a parameter of the enclosing function's
/// signature, rather than an in-function path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalBorrow {
    pub ownership_var: OwnershipVar,
    pub borrow_id: BorrowId,
}

/// A borrow ID's constituent witnesses: either an in-function `Path` or a
/// forwarded `ExternalBorrow`. Merging two borrows produces a fresh ID whose
/// kind set is the union.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BorrowKind {
    Local(Path),
    External(ExternalBorrow),
}

/// `BorrowId -> {BorrowKind}` — maintained by ownership inference as fresh
/// borrow IDs are minted and merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BorrowMap {
    kinds: indexmap::IndexMap<BorrowId, IndexSet<BorrowKindRecord>>,
}

/// `BorrowKind` wrapped so it can live in an `IndexSet` (the raw enum holds
/// a `Path`, which is already `Hash + Eq`).
pub type BorrowKindRecord = BorrowKind;

impl std::hash::Hash for BorrowKind {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            BorrowKind::Local(p) => p.hash(state),
            BorrowKind::External(e) => e.hash(state),
        }
    }
}

impl BorrowMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: BorrowId, kind: BorrowKind) {
        self.kinds.entry(id).or_default().insert(kind);
    }

    pub fn kinds(&self, id: BorrowId) -> Option<&IndexSet<BorrowKindRecord>> {
        self.kinds.get(&id)
    }

    /// Merges `a` and `b` into a freshly allocated id whose set is the
    /// union of both.
    pub fn merge(&mut self, fresh: BorrowId, a: BorrowId, b: BorrowId) {
        let mut combined = IndexSet::new();
        if let Some(s) = self.kinds.get(&a) {
            combined.extend(s.iter().cloned());
        }
        if let Some(s) = self.kinds.get(&b) {
            combined.extend(s.iter().cloned());
        }
        self.kinds.insert(fresh, combined);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BorrowId, &IndexSet<BorrowKindRecord>)> {
        self.kinds.iter()
    }
}

/// Published per-function signature: args, result, the member graph for
/// every reachable field, the external borrows it depends on, the owners
/// pinned regardless of use, and the allocator state it was built under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionOwnershipSignature {
    pub name: QualifiedName,
    pub args: Vec<TypeVariableInfo>,
    pub result: TypeVariableInfo,
    pub members: Vec<MemberInfo>,
    pub borrows: Vec<ExternalBorrow>,
    pub owners: Vec<OwnershipVar>,
}

impl FunctionOwnershipSignature {
    pub fn new(name: QualifiedName, args: Vec<TypeVariableInfo>, result: TypeVariableInfo) -> Self {
        Self {
            name,
            args,
            result,
            members: Vec::new(),
            borrows: Vec::new(),
            owners: Vec::new(),
        }
    }
}

/// Published per-class signature: the root slot for `Self`, its member
/// graph, and any borrows it carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassInstantiationSignature {
    pub name: QualifiedName,
    pub root: TypeVariableInfo,
    pub members: Vec<MemberInfo>,
    pub borrows: Vec<ExternalBorrow>,
}

/// "A value reachable at `arg.src` flows to `result.dest`" — one minimal
/// argument-to-result shape discovered by the data-flow path engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFlowPath {
    pub arg: TypeVariableInfo,
    pub result: TypeVariableInfo,
    pub index: usize,
    pub src: Vec<MemberInfo>,
    pub dest: Vec<MemberInfo>,
}

impl PartialEq for DataFlowPath {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.arg == other.arg
            && self.result == other.result
            && self.src.len() == other.src.len()
            && self.dest.len() == other.dest.len()
    }
}
impl Eq for DataFlowPath {}

/// `(paths, signature)` — hashed/compared by both, per the data model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFlowProfile {
    pub paths: Vec<DataFlowPath>,
    pub signature: FunctionOwnershipSignature,
}

/// The closed lattice an ownership variable resolves to (§4.I). Lives here
/// rather than under `semantic_graph` so `ir::instructions::Instruction` can
/// carry one directly without `ir` depending upward on `semantic_graph`;
/// re-exported at its original path for every existing caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ownership {
    Owner,
    Borrow(BorrowId),
    Unknown,
}

impl Ownership {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Ownership::Unknown)
    }

    pub fn borrow_id(&self) -> Option<BorrowId> {
        match self {
            Ownership::Borrow(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ownership::Owner => write!(f, "owner"),
            Ownership::Borrow(id) => write!(f, "borrow({})", id),
            Ownership::Unknown => write!(f, "unknown"),
        }
    }
}

/// `'l{borrow_id}` — a monomorphized function's per-borrow lifetime tag
/// (§4.I's "Function instantiation" paragraph: "lift each into a lifetime
/// `'l{borrow_id}`"). Lives here for the same reason `Ownership` does;
/// re-exported at its original path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Lifetime(pub BorrowId);

impl Lifetime {
    pub fn of(borrow_id: BorrowId) -> Self {
        Self(borrow_id)
    }

    pub fn borrow_id(self) -> BorrowId {
        self.0
    }
}

impl crate::tast::id_types::IdType for Lifetime {
    fn from_raw(raw: u32) -> Self {
        Self(BorrowId::from_raw(raw))
    }

    fn as_raw(self) -> u32 {
        self.0.as_raw()
    }

    fn is_valid(self) -> bool {
        self.0.is_valid()
    }

    fn invalid() -> Self {
        Self(BorrowId::invalid())
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'l{}", self.0.as_raw())
    }
}

/// An instruction or signature slot's lifetime annotation: its own tag (when
/// it resolved to a borrow) plus any lifetimes a monomorphized instantiation
/// found it transitively depends on (§6's `lifetime`/`dep_lifetimes`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeAnnotation {
    pub lifetime: Option<Lifetime>,
    pub dep_lifetimes: Vec<Lifetime>,
}

impl LifetimeAnnotation {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn of(lifetime: Lifetime) -> Self {
        Self {
            lifetime: Some(lifetime),
            dep_lifetimes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_invalidates_any_partial_of_same_root() {
        let v = TempVar::local(0);
        let whole = Path::whole(v.clone());
        let partial = Path::partial(v, vec!["f".into()]);
        assert!(whole.invalidates(&partial));
        assert!(partial.invalidates(&whole));
    }

    #[test]
    fn partials_with_common_prefix_invalidate() {
        let v = TempVar::local(0);
        let a = Path::partial(v.clone(), vec!["f".into()]);
        let b = Path::partial(v, vec!["f".into(), "g".into()]);
        assert!(a.invalidates(&b));
        assert!(b.invalidates(&a));
    }

    #[test]
    fn partials_with_different_prefix_do_not_invalidate() {
        let v = TempVar::local(0);
        let a = Path::partial(v.clone(), vec!["f".into()]);
        let b = Path::partial(v, vec!["g".into()]);
        assert!(!a.invalidates(&b));
    }

    #[test]
    fn different_roots_never_invalidate() {
        let a = Path::whole(TempVar::local(0));
        let b = Path::whole(TempVar::local(1));
        assert!(!a.invalidates(&b));
    }

    #[test]
    fn borrow_map_merge_unions_kind_sets() {
        let mut map = BorrowMap::new();
        let v = TempVar::local(0);
        map.insert(BorrowId::from_raw(0), BorrowKind::Local(Path::whole(v.clone())));
        map.insert(
            BorrowId::from_raw(1),
            BorrowKind::Local(Path::partial(v, vec!["f".into()])),
        );
        map.merge(BorrowId::from_raw(2), BorrowId::from_raw(0), BorrowId::from_raw(1));
        assert_eq!(map.kinds(BorrowId::from_raw(2)).unwrap().len(), 2);
    }
}
