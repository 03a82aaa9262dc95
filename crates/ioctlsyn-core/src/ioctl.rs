//! Recursive switch/case scan that mines `(label, value, root_type_id)`
//! command tuples out of an ioctl handler, following thin forwarding
//! wrappers up to a bounded depth.

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

use crate::codedb::{CallrefArgKind, CodeDb, FuncEntry, FuncId, TypeId};
use crate::error::PipelineError;
use crate::handler::HandlerRecord;
use crate::pipeline::Pass;

/// A function rarely forwards to more than a couple of candidate callees
/// that could own the real switch, so this stays inline almost always.
type Forwarders = SmallVec<[(FuncId, usize); 4]>;

/// How deep a chain of thin ioctl forwarders may go before we give up.
/// The entry call counts as depth 1.
const MAX_DEPTH: u32 = 3;

/// FTDB-style positional markers: `(parm, 1)` is the command argument,
/// `(parm, 2)` is the user-supplied argument pointer.
const COMMAND_ARG_MARKER: i64 = 1;
const ARGUMENT_ARG_MARKER: i64 = 2;

static SIZEOF_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sizeof\(([a-zA-Z0-9\s_\-$\[\]\*]+)\)").expect("valid regex"));

/// Mines command tuples from a handler function id.
#[derive(Debug, Default, Clone, Copy)]
pub struct IoctlAnalyzer;

impl IoctlAnalyzer {
    pub fn new() -> Self {
        IoctlAnalyzer
    }

    /// Recursively follows thin forwarding wrappers, collecting every
    /// `(function_id, command_arg_index)` pair that owns a switch on its
    /// command argument.
    fn recursively_pick_ioctl_with_switchcase(
        &self,
        db: &dyn CodeDb,
        fid: FuncId,
        argument_id: usize,
        depth: u32,
    ) -> Forwarders {
        let mut found = Forwarders::new();
        if depth > MAX_DEPTH {
            return found;
        }
        let Some(func) = db.func_by_id(fid) else {
            return found;
        };
        let Some(local) = func.locals.get(argument_id) else {
            return found;
        };

        if !pick_switchcases_by_argument_name(func, &local.name).is_empty() {
            found.push((fid, argument_id));
        }

        for (candidate_id, candidate_argument_id) in get_forwarded_ioctls(func) {
            found.extend(self.recursively_pick_ioctl_with_switchcase(
                db,
                candidate_id,
                candidate_argument_id,
                depth + 1,
            ));
        }

        found
    }

    /// Harvests `(label, value, root_type_id)` triples reachable from `fid`.
    pub fn analyze_ioctl_commands(
        &self,
        db: &dyn CodeDb,
        fid: FuncId,
    ) -> IndexSet<(String, i64, TypeId)> {
        let mut cases = IndexSet::new();

        let functions = self.recursively_pick_ioctl_with_switchcase(db, fid, 1, 1);
        if functions.is_empty() {
            return cases;
        }

        for (function_id, argument_id) in functions {
            let Some(func) = db.func_by_id(function_id) else {
                continue;
            };
            let Some(local) = func.locals.get(argument_id) else {
                continue;
            };
            let switches = pick_switchcases_by_argument_name(func, &local.name);

            for switch in switches {
                for case in &switch.cases {
                    let Some(captures) = SIZEOF_REGEX.captures(&case.expanded) else {
                        continue;
                    };
                    let type_name = captures.get(1).expect("group 1 always present on match").as_str();
                    let Some(type_id) = resolve_type_id(db, type_name) else {
                        continue;
                    };
                    cases.insert((case.label.clone(), case.value, type_id));
                }
            }
        }

        cases
    }
}

impl Pass for IoctlAnalyzer {
    fn name(&self) -> &'static str {
        "IoctlAnalyzer"
    }

    fn process(&self, db: &dyn CodeDb, handler: &mut HandlerRecord) -> Result<bool, PipelineError> {
        let commands = self.analyze_ioctl_commands(db, handler.syscall_id);
        let found_any = !commands.is_empty();
        handler.set_commands(commands);
        Ok(found_any)
    }
}

fn pick_switchcases_by_argument_name<'a>(
    func: &'a FuncEntry,
    condition: &str,
) -> Vec<&'a crate::codedb::SwitchInfo> {
    func.switches
        .iter()
        .filter(|s| s.condition == condition)
        .collect()
}

/// A callsite is a forwarder iff its materialized argument list contains
/// both the command marker and the argument marker; the command marker's
/// `pos` is the command argument's index in the callee.
fn get_forwarded_ioctls(func: &FuncEntry) -> Forwarders {
    let mut candidates = Forwarders::new();

    for (call_index, callref) in func.callrefs.iter().enumerate() {
        let command_marker = callref
            .iter()
            .find(|r| r.kind == CallrefArgKind::Parm && r.id == COMMAND_ARG_MARKER);
        let has_argument = callref
            .iter()
            .any(|r| r.kind == CallrefArgKind::Parm && r.id == ARGUMENT_ARG_MARKER);

        let (Some(command_marker), true) = (command_marker, has_argument) else {
            continue;
        };
        let Some(&callee) = func.calls.get(call_index) else {
            continue;
        };

        candidates.push((callee, command_marker.pos as usize));
    }

    candidates
}

/// Strips a leading `struct `/`union `/`enum ` keyword and a trailing
/// ` *`/` [...]` qualifier, returning the bare identifier to look up.
fn strip_type_qualifiers(type_name: &str) -> &str {
    let name = type_name
        .strip_prefix("struct ")
        .or_else(|| type_name.strip_prefix("union "))
        .or_else(|| type_name.strip_prefix("enum "))
        .unwrap_or(type_name);

    if let Some(stripped) = name.strip_suffix(" *") {
        return stripped;
    }
    if let Some(bracket) = name.find(" [") {
        return &name[..bracket];
    }
    name
}

/// Resolves a bare C type name to a CodeDB type id, skipping forward
/// declarations and picking the first remaining candidate deterministically.
fn resolve_type_id(db: &dyn CodeDb, type_name: &str) -> Option<TypeId> {
    let identifier = strip_type_qualifiers(type_name);
    db.types()
        .iter()
        .find(|t| t.str == identifier && !t.class.is_forward())
        .map(|t| t.id)
}

#[cfg(test)]
#[path = "ioctl_tests.rs"]
mod tests;
