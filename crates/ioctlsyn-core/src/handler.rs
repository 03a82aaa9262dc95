//! The per-handler record that flows through the analysis pipeline.
//!
//! Rather than one mutable struct with fields threaded through by `&mut`
//! passes, each analyzer stage is modeled as returning its own payload
//! (see [`crate::pipeline::Pass`]); [`HandlerRecord`] is the read-only
//! (from the point of view of any pass but its own) view composed of the
//! stage payloads collected so far. A pass that needs an upstream payload
//! asks for it through a typed accessor that raises
//! [`PipelineError::PrerequisiteMissing`] rather than panicking, since the
//! driver invokes passes generically through a trait object and cannot
//! prove at compile time that the earlier stage already ran.

use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::codedb::{FuncId, TypeId};
use crate::error::PipelineError;

/// `(label, numeric value, root type id)`, as mined by the ioctl analyzer.
pub type Command = (String, i64, TypeId);

/// A record field whose pointer-deref loops back into an ancestor type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PointerCycle {
    pub target: TypeId,
    pub field_index: usize,
}

/// A `(size field, pointer field)` pair used together at a user-copy callsite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberBounds {
    pub binding_member: usize,
    pub bound_member: usize,
}

#[derive(Clone, Debug)]
pub struct HandlerRecord {
    pub name: String,
    pub syscall_id: FuncId,
    commands: Option<IndexSet<Command>>,
    deps: Option<FxHashSet<TypeId>>,
    pointer_cycles: FxHashMap<TypeId, Vec<PointerCycle>>,
    pointer_bounds: FxHashMap<TypeId, IndexSet<MemberBounds>>,
}

impl HandlerRecord {
    pub fn new(name: String, syscall_id: FuncId) -> Self {
        HandlerRecord {
            name,
            syscall_id,
            commands: None,
            deps: None,
            pointer_cycles: FxHashMap::default(),
            pointer_bounds: FxHashMap::default(),
        }
    }

    pub fn set_commands(&mut self, commands: IndexSet<Command>) {
        self.commands = Some(commands);
    }

    pub fn set_deps(&mut self, deps: FxHashSet<TypeId>) {
        self.deps = Some(deps);
    }

    pub fn set_pointer_cycles(&mut self, cycles: FxHashMap<TypeId, Vec<PointerCycle>>) {
        self.pointer_cycles = cycles;
    }

    pub fn set_pointer_bounds(&mut self, bounds: FxHashMap<TypeId, IndexSet<MemberBounds>>) {
        self.pointer_bounds = bounds;
    }

    pub fn commands(&self) -> Option<&IndexSet<Command>> {
        self.commands.as_ref()
    }

    pub fn deps(&self) -> Option<&FxHashSet<TypeId>> {
        self.deps.as_ref()
    }

    pub fn pointer_cycles(&self) -> &FxHashMap<TypeId, Vec<PointerCycle>> {
        &self.pointer_cycles
    }

    pub fn pointer_bounds(&self) -> &FxHashMap<TypeId, IndexSet<MemberBounds>> {
        &self.pointer_bounds
    }

    /// Typed accessor used by passes that require `commands` to already be
    /// filled in; raises [`PipelineError::PrerequisiteMissing`] instead of
    /// panicking, since the driver calls passes through a trait object.
    pub fn require_commands(&self, pass: &'static str) -> Result<&IndexSet<Command>, PipelineError> {
        self.commands
            .as_ref()
            .ok_or_else(|| PipelineError::PrerequisiteMissing {
                pass,
                handler: self.name.clone(),
            })
    }

    pub fn require_deps(&self, pass: &'static str) -> Result<&FxHashSet<TypeId>, PipelineError> {
        self.deps.as_ref().ok_or_else(|| PipelineError::PrerequisiteMissing {
            pass,
            handler: self.name.clone(),
        })
    }
}
