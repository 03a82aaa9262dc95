//! Pointer/length bounds detection: walks the static callgraph looking for
//! `copy_from_user`/`copy_to_user`-shaped calls and, from the deref chains of
//! their arguments, recovers which record member bounds which pointer member.

use indexmap::IndexSet;
use rustc_hash::FxHashMap;

use crate::codedb::{CodeDb, DerefEntry, DerefKind, FuncId, TypeClass, TypeId};
use crate::error::PipelineError;
use crate::handler::{HandlerRecord, MemberBounds};
use crate::pipeline::Pass;

/// How many calls deep from the ioctl entry point this analyzer will follow
/// the static callgraph before giving up on a branch.
const MAX_DEPTH: u32 = 4;

/// `(binding arg index, bound arg index)` pairs, keyed by the name of a
/// user-copy primitive. Both of kernel's canonical primitives bind their
/// size argument (index 2) to either the kernel or user pointer argument.
const BINDING_CALLS: &[(&str, &[(usize, usize)])] = &[
    ("copy_from_user", &[(2, 0), (2, 1)]),
    ("copy_to_user", &[(2, 0), (2, 1)]),
];

/// Recovers `(binding member, bound member)` pairs from user-copy callsites
/// reachable from a handler's entry point.
#[derive(Debug, Default, Clone, Copy)]
pub struct PointerBoundsAnalyzer;

impl PointerBoundsAnalyzer {
    pub fn new() -> Self {
        PointerBoundsAnalyzer
    }
}

impl Pass for PointerBoundsAnalyzer {
    fn name(&self) -> &'static str {
        "PointerBoundsAnalyzer"
    }

    fn process(&self, db: &dyn CodeDb, handler: &mut HandlerRecord) -> Result<bool, PipelineError> {
        let id_to_name = user_copy_function_names(db);
        let bounds = analyze_bounds(db, &id_to_name, handler.syscall_id, 1);
        handler.set_pointer_bounds(bounds);
        // This analyzer never fails the handler; an empty result is valid.
        Ok(true)
    }
}

fn user_copy_function_names(db: &dyn CodeDb) -> FxHashMap<FuncId, &'static str> {
    let mut map = FxHashMap::default();
    for &(name, _) in BINDING_CALLS {
        for func in db.funcs_by_name(name) {
            map.insert(func.id, name);
        }
    }
    map
}

fn analyze_bounds(
    db: &dyn CodeDb,
    id_to_name: &FxHashMap<FuncId, &'static str>,
    func_id: FuncId,
    depth: u32,
) -> FxHashMap<TypeId, IndexSet<MemberBounds>> {
    let mut result: FxHashMap<TypeId, IndexSet<MemberBounds>> = FxHashMap::default();

    if depth > MAX_DEPTH {
        return result;
    }
    let Some(func) = db.func_by_id(func_id) else {
        return result;
    };

    let call_indexes: Vec<usize> = func
        .calls
        .iter()
        .enumerate()
        .filter(|(_, callee)| id_to_name.contains_key(callee))
        .map(|(i, _)| i)
        .collect();

    for call_index in call_indexes {
        let callee = func.calls[call_index];
        let func_name = id_to_name[&callee];
        let Some(&(_, models)) = BINDING_CALLS.iter().find(|(name, _)| *name == func_name) else {
            continue;
        };
        let Some(call_info) = func.call_info.get(call_index) else {
            continue;
        };

        for &(binding_arg, bound_arg) in models {
            let Some(&binding_deref_id) = call_info.args.get(binding_arg) else {
                continue;
            };
            let Some(&bound_deref_id) = call_info.args.get(bound_arg) else {
                continue;
            };
            let Some(mut binding_deref) = func.derefs.get(binding_deref_id as usize) else {
                continue;
            };
            let Some(mut bound_deref) = func.derefs.get(bound_deref_id as usize) else {
                continue;
            };

            let starts_at_member = binding_deref
                .offsetrefs
                .first()
                .is_some_and(|o| o.kind == DerefKind::Member)
                && bound_deref
                    .offsetrefs
                    .first()
                    .is_some_and(|o| o.kind == DerefKind::Member);
            if !starts_at_member {
                continue;
            }

            if !walk_to_member(func, &mut binding_deref) || !walk_to_member(func, &mut bound_deref) {
                continue;
            }

            let (Some(&binding_parent), Some(&bound_parent)) =
                (binding_deref.r#type.last(), bound_deref.r#type.last())
            else {
                continue;
            };
            if binding_parent != bound_parent {
                continue;
            }

            let Some(parent_type) = db.type_by_id(bound_parent) else {
                continue;
            };
            if parent_type.class == TypeClass::Record && parent_type.union {
                continue;
            }

            let (Some(&binding_member), Some(&bound_member)) =
                (binding_deref.member.last(), bound_deref.member.last())
            else {
                continue;
            };

            result
                .entry(bound_parent)
                .or_default()
                .insert(MemberBounds {
                    binding_member: binding_member as usize,
                    bound_member: bound_member as usize,
                });
        }
    }

    for &callee in &func.calls {
        let nested = analyze_bounds(db, id_to_name, callee, depth + 1);
        // Matches a dict merge where the deeper call's result wins on collision.
        result.extend(nested);
    }

    result
}

/// Follows `offsetrefs[0]` until `deref` itself is a member access, or until
/// the chain runs out. Returns whether a member access was reached.
fn walk_to_member<'a>(func: &'a crate::codedb::FuncEntry, deref: &mut &'a DerefEntry) -> bool {
    while deref.kind != DerefKind::Member {
        let Some(next) = deref.offsetrefs.first() else {
            return false;
        };
        let Some(next_deref) = func.derefs.get(next.id as usize) else {
            return false;
        };
        *deref = next_deref;
    }
    true
}

#[cfg(test)]
#[path = "bounds_tests.rs"]
mod tests;
