//! Description-language generator: turns a fully-analyzed [`HandlerRecord`]
//! into the two text artifacts a handler emits (a constants file and a
//! description file), consulting the batch-wide [`NameBook`] so labels, path
//! constants and type names stay unique across every handler in a run.

use std::fmt::Write as _;

use rustc_hash::FxHashMap;

use crate::codedb::{CodeDb, TypeClass, TypeEntry, TypeId};
use crate::error::PipelineError;
use crate::handler::HandlerRecord;
use crate::namebook::NameBook;
use crate::typegraph::detypedef;

/// The two files one handler contributes to a batch's output directory.
#[derive(Debug, Clone)]
pub struct EmittedHandler {
    /// Contents of `<handler_name>.txt`.
    pub description: String,
    /// Contents of `<handler_name>_<arch>.const`.
    pub constants: String,
}

/// Builds the declaration tree for every surviving handler and renders it.
///
/// Owns the two pieces of mutable state that span a whole batch: the
/// [`NameBook`] and the per-type name cache. Both are append-only, so the
/// same [`TypeId`] always renders to the same name no matter which handler
/// first forced its assignment.
#[derive(Debug, Default)]
pub struct Emitter {
    namebook: NameBook,
    type_names: FxHashMap<TypeId, String>,
}

impl Emitter {
    pub fn new() -> Self {
        Emitter::default()
    }

    /// Renders `handler`'s constants and description files. Uniquifies every
    /// command label against the whole batch first and writes the
    /// uniquified labels back into the handler's `commands`.
    pub fn emit(
        &mut self,
        db: &dyn CodeDb,
        handler: &mut HandlerRecord,
        today: &str,
    ) -> Result<EmittedHandler, PipelineError> {
        let commands = handler.require_commands(PASS_NAME)?.clone();
        let deps = handler.require_deps(PASS_NAME)?.clone();

        let mut constants = String::new();
        let mut uniquified = indexmap::IndexSet::new();
        for (label, value, type_id) in &commands {
            let label = self.namebook.label(label);
            writeln!(constants, "{label}_syzdescriptor = {value}").expect("String writes never fail");
            uniquified.insert((label, *value, *type_id));
        }
        handler.set_commands(uniquified.clone());

        let path_const = self.namebook.path_constant(handler.syscall_id);
        let mut desc = String::new();

        writeln!(desc, "# {today}").expect("String writes never fail");
        writeln!(desc, "# Path constant is: {path_const}").unwrap();
        writeln!(desc, "# Anchor function ID is: {}", handler.syscall_id.0).unwrap();
        writeln!(desc, "include <linux/ioctl.h>").unwrap();
        writeln!(desc, "include <linux/types.h>").unwrap();
        writeln!(desc, "resource fd_{}[fd]", handler.name).unwrap();
        writeln!(desc).unwrap();

        writeln!(
            desc,
            "openat${name}_syzdescriptor(fd const[AT_FDCWD], file ptr[in, string[{path_const}_syzdescriptor]], flags flags[open_flags], mode const[0]) fd_{name}",
            name = handler.name,
        )
        .unwrap();
        writeln!(desc).unwrap();

        for (label, _value, root) in &uniquified {
            let arg = self.render_arg(db, handler, *root);
            writeln!(
                desc,
                "ioctl${label}_syzdescriptor(fd fd_{name}, cmd const[{label}_syzdescriptor], arg {arg})",
                name = handler.name,
            )
            .unwrap();
        }
        writeln!(desc).unwrap();

        let mut sorted_deps: Vec<TypeId> = deps.iter().copied().collect();
        sorted_deps.sort();
        for id in sorted_deps {
            if let Some(def) = self.render_type_definition(db, handler, id) {
                writeln!(desc, "{def}").unwrap();
                writeln!(desc).unwrap();
            }
        }

        Ok(EmittedHandler {
            description: desc,
            constants,
        })
    }

    /// Renders the `arg` operand of an `ioctl$...` declaration: the root type
    /// wrapped in `ptr[inout, ...]` unless it already resolved to a pointer
    /// class, or to `intptr` if the type could not be rendered at all.
    fn render_arg(&mut self, db: &dyn CodeDb, handler: &HandlerRecord, root: TypeId) -> String {
        let rendered = self.render_type(db, handler, root, false);
        if rendered.is_empty() {
            return "intptr".to_string();
        }
        let head = detypedef(db, root);
        match db.type_by_id(head).map(|t| t.class) {
            Some(TypeClass::Pointer) => rendered,
            _ => format!("ptr[inout, {rendered}]"),
        }
    }

    fn render_type_definition(
        &mut self,
        db: &dyn CodeDb,
        handler: &HandlerRecord,
        id: TypeId,
    ) -> Option<String> {
        let t = db.type_by_id(id)?;
        match t.class {
            TypeClass::Record => Some(self.render_record_def(db, handler, id, t)),
            TypeClass::Enum => Some(self.render_enum_def(db, id, t)),
            // Arrays, pointers and builtins never get a standalone
            // declaration in the description language; they are always
            // rendered inline at their use site.
            _ => None,
        }
    }

    fn render_enum_def(&mut self, db: &dyn CodeDb, id: TypeId, t: &TypeEntry) -> String {
        let name = self.type_name(db, id);
        let values = if t.values.is_empty() {
            "0".to_string()
        } else {
            t.values
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!("{name} = {values}")
    }

    fn render_record_def(
        &mut self,
        db: &dyn CodeDb,
        handler: &HandlerRecord,
        type_id: TypeId,
        t: &TypeEntry,
    ) -> String {
        let name = self.type_name(db, type_id);
        let bounds = handler.pointer_bounds().get(&type_id);
        let cycles = handler.pointer_cycles().get(&type_id);

        let mut anon_counter = 0usize;
        let field_names: Vec<String> = t
            .refnames
            .iter()
            .map(|n| {
                if n == "__!anonrecord__" || n == "__!recorddecl__" {
                    let name = format!("anonymous{anon_counter}");
                    anon_counter += 1;
                    name
                } else {
                    n.clone()
                }
            })
            .collect();

        let mut lines = Vec::with_capacity(t.refs.len());
        for (i, &field_type) in t.refs.iter().enumerate() {
            let field_name = field_names
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("field{i}"));

            let binding = bounds.and_then(|b| b.iter().find(|mb| mb.binding_member == i));
            let decl = if let Some(mb) = binding {
                let bound_name = field_names
                    .get(mb.bound_member)
                    .cloned()
                    .unwrap_or_else(|| format!("field{}", mb.bound_member));
                let original = self.render_type(db, handler, field_type, false);
                format!("len[{bound_name}, {original}]")
            } else {
                let opt = cycles.is_some_and(|c| c.iter().any(|pc| pc.field_index == i));
                self.render_type(db, handler, field_type, opt)
            };
            lines.push(format!("\t{field_name}\t{decl}"));
        }

        let (open, close) = if t.union { ("[", "]") } else { ("{", "}") };
        format!("{name} {open}\n{}\n{close}", lines.join("\n"))
    }

    /// The type-declaration mapping, applied to a raw (possibly typedef'd)
    /// field/pointee/element type id.
    fn render_type(&mut self, db: &dyn CodeDb, handler: &HandlerRecord, id: TypeId, opt: bool) -> String {
        let head = detypedef(db, id);
        let Some(t) = db.type_by_id(head) else {
            return String::new();
        };
        match t.class {
            TypeClass::Record => self.type_name(db, head),
            TypeClass::Enum => format!("flags[{}, int32]", self.type_name(db, head)),
            TypeClass::Pointer => self.render_pointer(db, handler, t, opt),
            TypeClass::ConstArray | TypeClass::IncompleteArray => self.render_array(db, handler, t),
            TypeClass::Builtin => render_builtin(t),
            // detypedef already unwrapped every typedef; forward
            // declarations never carry enough information to render.
            TypeClass::Typedef | TypeClass::RecordForward | TypeClass::EnumForward => String::new(),
        }
    }

    fn render_pointer(&mut self, db: &dyn CodeDb, handler: &HandlerRecord, t: &TypeEntry, opt: bool) -> String {
        let Some(&pointee) = t.refs.first() else {
            return String::new();
        };
        let pointee_head = detypedef(db, pointee);
        let is_void = db
            .type_by_id(pointee_head)
            .is_some_and(|p| p.class == TypeClass::Builtin && p.str == "void");
        if is_void {
            return "buffer[inout]".to_string();
        }
        let inner = self.render_type(db, handler, pointee, false);
        if opt {
            format!("ptr[inout, {inner}, opt]")
        } else {
            format!("ptr[inout, {inner}]")
        }
    }

    fn render_array(&mut self, db: &dyn CodeDb, handler: &HandlerRecord, t: &TypeEntry) -> String {
        let Some(&elem) = t.refs.first() else {
            return String::new();
        };
        let elem_decl = self.render_type(db, handler, elem, false);
        let elem_head = detypedef(db, elem);
        let elem_size = db.type_by_id(elem_head).map(|e| e.size).unwrap_or(0);
        let count = if elem_size == 0 { 1 } else { (t.size / elem_size).max(1) };
        format!("array[{elem_decl}, {count}]")
    }

    /// Assigns (or recalls) the batch-wide name for a record/enum type id.
    fn type_name(&mut self, db: &dyn CodeDb, id: TypeId) -> String {
        if let Some(name) = self.type_names.get(&id) {
            return name.clone();
        }
        let seed = db.type_by_id(id).map(|t| t.str.as_str()).filter(|s| !s.is_empty());
        let name = self.namebook.type_name(id, seed);
        self.type_names.insert(id, name.clone());
        name
    }
}

fn render_builtin(t: &TypeEntry) -> String {
    if t.str == "void" {
        return "void".to_string();
    }
    if t.size <= 64 {
        format!("int{}", t.size)
    } else if t.size % 8 == 0 {
        format!("array[int8, {}]", t.size / 8)
    } else {
        String::new()
    }
}

const PASS_NAME: &str = "Emitter";

#[cfg(test)]
#[path = "emitter_tests.rs"]
mod tests;
