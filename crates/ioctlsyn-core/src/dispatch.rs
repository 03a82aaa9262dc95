//! Dispatch-table scan: finds the ioctl-like slot of every matching
//! dispatch-table instance (`file_operations`, `proc_ops`, `uart_ops`, ...).

use rustc_hash::FxHashSet;

use crate::codedb::{CodeDb, InstanceKind, TypeClass};
use crate::error::PipelineError;
use crate::handler::HandlerRecord;

/// One `(dispatch_type_name, slot_name)` pair from the supported-syscalls list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupportedSyscall {
    pub dispatch_type: String,
    pub slot_name: String,
}

impl SupportedSyscall {
    pub fn new(dispatch_type: impl Into<String>, slot_name: impl Into<String>) -> Self {
        SupportedSyscall {
            dispatch_type: dispatch_type.into(),
            slot_name: slot_name.into(),
        }
    }
}

/// The three dispatch-table kinds this crate knows how to scan, in the
/// slot names the kernel uses for the ioctl handler.
pub fn default_supported_syscalls() -> Vec<SupportedSyscall> {
    vec![
        SupportedSyscall::new("file_operations", "unlocked_ioctl"),
        SupportedSyscall::new("proc_ops", "proc_ioctl"),
        SupportedSyscall::new("uart_ops", "ioctl"),
    ]
}

/// Scans the CodeDB for dispatch-table instances matching `supported` and
/// returns one [`HandlerRecord`] per match, with `name` and `syscall_id`
/// filled in. Handler names that collide within this batch are
/// uniquified by appending `_` until free.
pub fn collect_handlers(
    db: &dyn CodeDb,
    supported: &[SupportedSyscall],
) -> Result<Vec<HandlerRecord>, PipelineError> {
    let dispatch_names: FxHashSet<&str> =
        supported.iter().map(|s| s.dispatch_type.as_str()).collect();

    let any_concrete = db
        .types()
        .iter()
        .any(|t| dispatch_names.contains(t.str.as_str()) && !t.class.is_forward());
    if !any_concrete {
        return Err(PipelineError::DispatchKindMissing);
    }

    let mut seen_names: FxHashSet<String> = FxHashSet::default();
    let mut handlers = Vec::new();

    for syscall in supported {
        for instance in db.fops_instances() {
            let Some(record_type) = db.type_by_id(instance.r#type) else {
                continue;
            };
            if record_type.class != TypeClass::Record || record_type.str != syscall.dispatch_type {
                continue;
            }
            let Some(slot_index) = record_type
                .refnames
                .iter()
                .position(|name| name == &syscall.slot_name)
            else {
                continue;
            };
            let Some(func_ids) = instance.members.get(&(slot_index as u32)) else {
                continue;
            };
            let Some(&func_id) = func_ids.first() else {
                continue;
            };
            if !db.contains_func(func_id) {
                continue;
            }
            // Non-global instances are a documented limitation: skip silently.
            if instance.kind != InstanceKind::Global {
                continue;
            }
            let Some(global) = db.global(instance.var) else {
                continue;
            };

            let mut name = global.name.clone();
            while seen_names.contains(&name) {
                name.push('_');
            }
            seen_names.insert(name.clone());

            handlers.push(HandlerRecord::new(name, func_id));
        }
    }

    Ok(handlers)
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
