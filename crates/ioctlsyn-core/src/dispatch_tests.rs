use super::*;
use crate::codedb::{
    FopsInstance, FuncEntry, FuncId, GlobalEntry, InstanceKind, MemoryCodeDb, TypeEntry, TypeId,
};
use rustc_hash::FxHashMap;

fn file_operations_type() -> TypeEntry {
    TypeEntry {
        id: TypeId(1),
        str: "file_operations".to_string(),
        class: TypeClass::Record,
        size: 0,
        refs: vec![],
        refnames: vec!["open".to_string(), "unlocked_ioctl".to_string()],
        values: vec![],
        union: false,
    }
}

fn db_with_one_handler() -> MemoryCodeDb {
    let func = FuncEntry {
        id: FuncId(42),
        name: "my_ioctl".to_string(),
        locals: vec![],
        switches: vec![],
        callrefs: vec![],
        calls: vec![],
        call_info: vec![],
        derefs: vec![],
    };
    let mut members = FxHashMap::default();
    members.insert(1, vec![FuncId(42)]);
    let instance = FopsInstance {
        r#type: TypeId(1),
        members,
        kind: InstanceKind::Global,
        var: 0,
    };
    MemoryCodeDb::new(
        vec![file_operations_type()],
        vec![func],
        vec![GlobalEntry {
            name: "my_fops".to_string(),
        }],
        vec![instance],
    )
}

#[test]
fn finds_the_ioctl_slot_of_a_global_instance() {
    let db = db_with_one_handler();
    let handlers = collect_handlers(&db, &default_supported_syscalls()).unwrap();
    assert_eq!(handlers.len(), 1);
    assert_eq!(handlers[0].name, "my_fops");
    assert_eq!(handlers[0].syscall_id, FuncId(42));
}

#[test]
fn fails_the_batch_when_no_dispatch_type_present() {
    let db = MemoryCodeDb::new(vec![], vec![], vec![], vec![]);
    let err = collect_handlers(&db, &default_supported_syscalls()).unwrap_err();
    assert_eq!(err, PipelineError::DispatchKindMissing);
}

#[test]
fn skips_non_global_instances_silently() {
    let mut db = db_with_one_handler();
    db.fops[0].kind = InstanceKind::Local;
    let handlers = collect_handlers(&db, &default_supported_syscalls()).unwrap();
    assert!(handlers.is_empty());
}

#[test]
fn uniquifies_colliding_names_with_trailing_underscores() {
    let mut db = db_with_one_handler();
    let second = db.fops[0].clone();
    db.fops.push(second);
    let handlers = collect_handlers(&db, &default_supported_syscalls()).unwrap();
    assert_eq!(handlers.len(), 2);
    assert_eq!(handlers[0].name, "my_fops");
    assert_eq!(handlers[1].name, "my_fops_");
}
