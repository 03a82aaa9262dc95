//! Type-graph extraction: typedef collapse, pointer dereference, and the
//! acyclic dependency closure over a command's root type.

use rustc_hash::FxHashSet;

use crate::codedb::{CodeDb, TypeClass, TypeId};
use crate::error::PipelineError;
use crate::handler::HandlerRecord;
use crate::pipeline::Pass;

/// Follows `typedef.refs[0]` until the head is not a typedef.
pub fn detypedef(db: &dyn CodeDb, id: TypeId) -> TypeId {
    let mut current = id;
    loop {
        let Some(t) = db.type_by_id(current) else {
            break;
        };
        if t.class != TypeClass::Typedef {
            break;
        }
        let Some(&next) = t.refs.first() else {
            break;
        };
        current = next;
    }
    current
}

/// Follows both typedef and pointer indirection until neither applies.
pub fn dereference(db: &dyn CodeDb, id: TypeId) -> TypeId {
    let mut current = id;
    loop {
        let Some(t) = db.type_by_id(current) else {
            break;
        };
        if t.class != TypeClass::Typedef && t.class != TypeClass::Pointer {
            break;
        }
        let Some(&next) = t.refs.first() else {
            break;
        };
        current = next;
    }
    current
}

/// Whether the detypedef'd head of `id` has any field/element/pointee refs.
pub fn has_fields(db: &dyn CodeDb, id: TypeId) -> bool {
    let head = detypedef(db, id);
    db.type_by_id(head).is_some_and(|t| !t.refs.is_empty())
}

/// DFS from `detypedef(id)`: recurses into every (detypedef'd) field ref of
/// a record node; stops at enum nodes. Returns the set of visited ids.
pub fn closure(db: &dyn CodeDb, id: TypeId) -> FxHashSet<TypeId> {
    let mut visited = FxHashSet::default();
    visit(db, id, &mut visited);
    visited
}

fn visit(db: &dyn CodeDb, id: TypeId, visited: &mut FxHashSet<TypeId>) {
    let head = detypedef(db, id);
    if visited.contains(&head) {
        return;
    }
    visited.insert(head);

    let Some(t) = db.type_by_id(head) else {
        return;
    };
    if t.class == TypeClass::Enum {
        return;
    }
    for &r in &t.refs {
        visit(db, r, visited);
    }
}

/// Computes the acyclic dependency set for each command root and unions them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeGraphAnalyzer;

impl TypeGraphAnalyzer {
    pub fn new() -> Self {
        TypeGraphAnalyzer
    }
}

impl Pass for TypeGraphAnalyzer {
    fn name(&self) -> &'static str {
        "TypeGraphAnalyzer"
    }

    fn process(&self, db: &dyn CodeDb, handler: &mut HandlerRecord) -> Result<bool, PipelineError> {
        let commands = handler.require_commands(self.name())?.clone();

        // deps holds only non-typedef, non-pointer concrete ids. `closure`
        // already detypedef's every visited id, so the one remaining class
        // to exclude here is Pointer: pointer types always have exactly one
        // ref (their pointee), so has_fields is trivially true for them and
        // would otherwise leak them into the set.
        let mut deps = FxHashSet::default();
        for (_, _, root) in &commands {
            for id in closure(db, *root) {
                if has_fields(db, id) && !db.type_by_id(id).is_some_and(|t| t.class == TypeClass::Pointer) {
                    deps.insert(id);
                }
            }
        }

        handler.set_deps(deps);
        // An empty dependency set is a legitimate outcome (every command
        // root is a plain builtin), not a failure; commands already
        // guarantees there is something to emit.
        Ok(true)
    }
}

#[cfg(test)]
#[path = "typegraph_tests.rs"]
mod tests;
