//! Pointer-cycle detection: which record fields, if followed, loop back to
//! an ancestor already on the current root's traversal path.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::codedb::{CodeDb, TypeClass, TypeId};
use crate::error::PipelineError;
use crate::handler::{HandlerRecord, PointerCycle};
use crate::pipeline::Pass;
use crate::typegraph::{detypedef, dereference};

/// Finds pointer fields whose target, once dereferenced, is already an
/// ancestor on the current DFS path from `type_id`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PointerCycleAnalyzer;

impl PointerCycleAnalyzer {
    pub fn new() -> Self {
        PointerCycleAnalyzer
    }
}

impl Pass for PointerCycleAnalyzer {
    fn name(&self) -> &'static str {
        "PointerCycleAnalyzer"
    }

    fn process(&self, db: &dyn CodeDb, handler: &mut HandlerRecord) -> Result<bool, PipelineError> {
        let commands = handler.require_commands(self.name())?.clone();

        let mut cycles: FxHashMap<TypeId, Vec<PointerCycle>> = FxHashMap::default();
        for (_, _, root) in &commands {
            let head = detypedef(db, *root);
            let mut traversed = FxHashSet::default();
            let mut local = FxHashMap::default();
            analyze_rec(db, head, &mut traversed, &mut local);
            // Matches a dict merge where the later root wins on key collision.
            cycles.extend(local);
        }

        handler.set_pointer_cycles(cycles);
        // This analyzer never fails the handler; an empty result is valid.
        Ok(true)
    }
}

fn analyze_rec(
    db: &dyn CodeDb,
    type_id: TypeId,
    traversed: &mut FxHashSet<TypeId>,
    cycles: &mut FxHashMap<TypeId, Vec<PointerCycle>>,
) {
    if traversed.contains(&type_id) {
        return;
    }
    let Some(t) = db.type_by_id(type_id) else {
        return;
    };
    if t.class != TypeClass::Record {
        return;
    }

    // A type is its own ancestor from the moment it is entered, so a direct
    // self-loop (a field pointing back at this very record) is caught by the
    // same rule as an indirect one; insert before scanning this type's own
    // fields, not after.
    traversed.insert(type_id);

    for (field_index, &ref_id) in t.refs.iter().enumerate() {
        let Some(ref_entry) = db.type_by_id(ref_id) else {
            continue;
        };
        if ref_entry.class != TypeClass::Pointer {
            continue;
        }
        let derefed = dereference(db, ref_id);
        if traversed.contains(&derefed) {
            cycles.entry(type_id).or_default().push(PointerCycle {
                target: derefed,
                field_index,
            });
        }
    }

    for &ref_id in &t.refs {
        let target = dereference(db, ref_id);
        if traversed.contains(&target) {
            continue;
        }
        analyze_rec(db, target, traversed, cycles);
    }
}

#[cfg(test)]
#[path = "cycles_tests.rs"]
mod tests;
