//! The code-fact database object model.
//!
//! This module only describes the slice of a CodeDB-style fact store this
//! crate consumes (types, functions, globals, dispatch-table instances).
//! The random-access fact-store engine itself is an external collaborator;
//! [`MemoryCodeDb`] is a minimal, JSON-backed stand-in that exists so this
//! crate is runnable and testable, not a reimplementation of the real thing.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Identifier of a type entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

/// Identifier of a function entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FuncId(pub u32);

/// The syntactic class of a type entry, mirroring the fact store's `class` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeClass {
    Record,
    RecordForward,
    Enum,
    EnumForward,
    Typedef,
    Pointer,
    ConstArray,
    IncompleteArray,
    Builtin,
}

impl TypeClass {
    pub fn is_forward(self) -> bool {
        matches!(self, TypeClass::RecordForward | TypeClass::EnumForward)
    }
}

/// One type entry in the fact store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeEntry {
    pub id: TypeId,
    /// Type name as it appears in source; empty for anonymous records.
    pub str: String,
    pub class: TypeClass,
    /// Size in bits.
    pub size: u64,
    /// Field types for records, element type for arrays, pointee for
    /// pointers, underlying type for typedefs.
    pub refs: Vec<TypeId>,
    /// Field names for records, parallel to `refs`.
    #[serde(default)]
    pub refnames: Vec<String>,
    /// Enumerator values, only meaningful for `Enum`.
    #[serde(default)]
    pub values: Vec<i64>,
    #[serde(default)]
    pub union: bool,
}

/// A single switch-case arm: `(value, condition text, label, expanded macro text)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaseInfo {
    pub value: i64,
    pub label: String,
    pub expanded: String,
}

/// One `switch` statement inside a function body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwitchInfo {
    /// Name of the local the switch discriminates on.
    pub condition: String,
    pub cases: Vec<CaseInfo>,
}

/// One positional argument marker inside a `callrefs` entry, e.g. `(parm, 1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallrefArg {
    pub kind: CallrefArgKind,
    pub id: i64,
    pub pos: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallrefArgKind {
    Parm,
    Other,
}

/// Arguments passed at one callsite, keyed by deref-id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallInfo {
    pub args: Vec<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerefKind {
    Member,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetRef {
    pub kind: DerefKind,
    pub id: u32,
}

/// One entry of a function's `derefs` array: a chain of field/offset accesses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DerefEntry {
    pub kind: DerefKind,
    #[serde(default)]
    pub offsetrefs: Vec<OffsetRef>,
    /// Chain of type ids leading to this deref; the parent record is the last one.
    #[serde(default)]
    pub r#type: Vec<TypeId>,
    /// Chain of field indices; the field within the parent record is the last one.
    #[serde(default)]
    pub member: Vec<u32>,
}

/// A local variable or parameter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalVar {
    pub name: String,
}

/// One function entry in the fact store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FuncEntry {
    pub id: FuncId,
    pub name: String,
    #[serde(default)]
    pub locals: Vec<LocalVar>,
    #[serde(default)]
    pub switches: Vec<SwitchInfo>,
    /// One argument-marker list per callsite, parallel to `calls`.
    #[serde(default)]
    pub callrefs: Vec<Vec<CallrefArg>>,
    #[serde(default)]
    pub calls: Vec<FuncId>,
    /// One call-info record per callsite, parallel to `calls`.
    #[serde(default)]
    pub call_info: Vec<CallInfo>,
    #[serde(default)]
    pub derefs: Vec<DerefEntry>,
}

/// A global symbol (used to name a dispatch-table instance).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GlobalEntry {
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceKind {
    Global,
    Local,
}

/// An instance of a dispatch-table-shaped record (e.g. a `struct file_operations`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FopsInstance {
    pub r#type: TypeId,
    /// Field index -> function ids assigned to that slot.
    pub members: FxHashMap<u32, Vec<FuncId>>,
    pub kind: InstanceKind,
    /// Id of the backing global symbol, resolved through `globals`.
    pub var: u32,
}

/// The read-only surface this crate consumes from a code-fact database.
///
/// A production implementation backs this with a random-access, on-disk
/// fact store; [`MemoryCodeDb`] is the only implementation shipped here.
pub trait CodeDb {
    fn types(&self) -> &[TypeEntry];
    fn type_by_id(&self, id: TypeId) -> Option<&TypeEntry>;
    fn fops_instances(&self) -> &[FopsInstance];
    fn func_by_id(&self, id: FuncId) -> Option<&FuncEntry>;
    fn funcs_by_name(&self, name: &str) -> Vec<&FuncEntry>;
    fn contains_func(&self, id: FuncId) -> bool;
    fn global(&self, var: u32) -> Option<&GlobalEntry>;
}

/// In-memory, JSON-deserializable `CodeDb` implementation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MemoryCodeDb {
    pub types: Vec<TypeEntry>,
    pub funcs: Vec<FuncEntry>,
    pub globals: Vec<GlobalEntry>,
    pub fops: Vec<FopsInstance>,

    #[serde(skip)]
    type_index: FxHashMap<TypeId, usize>,
    #[serde(skip)]
    func_index: FxHashMap<FuncId, usize>,
}

impl MemoryCodeDb {
    pub fn new(
        types: Vec<TypeEntry>,
        funcs: Vec<FuncEntry>,
        globals: Vec<GlobalEntry>,
        fops: Vec<FopsInstance>,
    ) -> Self {
        let mut db = MemoryCodeDb {
            types,
            funcs,
            globals,
            fops,
            type_index: FxHashMap::default(),
            func_index: FxHashMap::default(),
        };
        db.rebuild_indexes();
        db
    }

    /// Parses a JSON-serialized snapshot, matching the shape produced by
    /// serializing this struct.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let mut db: MemoryCodeDb = serde_json::from_str(text)?;
        db.rebuild_indexes();
        Ok(db)
    }

    fn rebuild_indexes(&mut self) {
        self.type_index = self
            .types
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id, i))
            .collect();
        self.func_index = self
            .funcs
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id, i))
            .collect();
    }
}

impl CodeDb for MemoryCodeDb {
    fn types(&self) -> &[TypeEntry] {
        &self.types
    }

    fn type_by_id(&self, id: TypeId) -> Option<&TypeEntry> {
        self.type_index.get(&id).map(|&i| &self.types[i])
    }

    fn fops_instances(&self) -> &[FopsInstance] {
        &self.fops
    }

    fn func_by_id(&self, id: FuncId) -> Option<&FuncEntry> {
        self.func_index.get(&id).map(|&i| &self.funcs[i])
    }

    fn funcs_by_name(&self, name: &str) -> Vec<&FuncEntry> {
        self.funcs.iter().filter(|f| f.name == name).collect()
    }

    fn contains_func(&self, id: FuncId) -> bool {
        self.func_index.contains_key(&id)
    }

    fn global(&self, var: u32) -> Option<&GlobalEntry> {
        self.globals.get(var as usize)
    }
}
