//! Batch-wide name uniquification, shared by the Emitter across handlers.
//!
//! Three independent domains (command labels, path constants, type names)
//! each get their own arena of seen strings; a collision is resolved by
//! appending `_` until free. The append-`_` rule (not "name + integer
//! suffix") is load-bearing for bit-exact reproducibility against prior
//! output.

use rustc_hash::FxHashSet;

use crate::codedb::{FuncId, TypeId};

#[derive(Debug, Default)]
struct Arena {
    seen: FxHashSet<String>,
}

impl Arena {
    fn uniquify(&mut self, proposed: String) -> String {
        let mut name = proposed;
        while self.seen.contains(&name) {
            name.push('_');
        }
        self.seen.insert(name.clone());
        name
    }
}

/// Owns the three name spaces used while emitting a batch.
#[derive(Debug, Default)]
pub struct NameBook {
    labels: Arena,
    path_constants: Arena,
    type_names: Arena,
}

impl NameBook {
    pub fn new() -> Self {
        NameBook::default()
    }

    /// Uniquifies a command label (e.g. `FOO` -> `FOO`, then `FOO_`).
    pub fn label(&mut self, proposed: &str) -> String {
        self.labels.uniquify(proposed.to_string())
    }

    /// Reserves the per-handler path-constant placeholder name.
    pub fn path_constant(&mut self, syscall_id: FuncId) -> String {
        self.path_constants
            .uniquify(format!("SYZDESCRIPTOR_PATH_{}", syscall_id.0))
    }

    /// Assigns the emitted name for a type, seeded from its `refnames`-join
    /// or a synthetic `ANONTYPE_<id>` placeholder if it has no field names.
    pub fn type_name(&mut self, id: TypeId, seed: Option<&str>) -> String {
        let proposed = match seed {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => format!("ANONTYPE_{}", id.0),
        };
        self.type_names.uniquify(proposed)
    }
}

#[cfg(test)]
#[path = "namebook_tests.rs"]
mod tests;
