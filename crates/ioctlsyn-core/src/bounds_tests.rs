use super::*;
use crate::codedb::{CallInfo, DerefEntry, FuncEntry, FuncId, MemoryCodeDb, OffsetRef, TypeEntry};
use crate::handler::HandlerRecord;
use crate::pipeline::Pass;

const S: TypeId = TypeId(10);

fn s_type(union: bool) -> TypeEntry {
    TypeEntry {
        id: S,
        str: "s".to_string(),
        class: TypeClass::Record,
        size: 96,
        refs: vec![],
        refnames: vec!["buf".to_string(), "len".to_string()],
        values: vec![],
        union,
    }
}

/// `dst` deref (arg 0): not a member access at all.
/// `src` deref (arg 1): member chain down to `s.buf` (member index 0).
/// `n` deref (arg 2): member chain down to `s.len` (member index 1).
fn copy_from_user_derefs() -> Vec<DerefEntry> {
    vec![
        DerefEntry {
            kind: DerefKind::Other,
            offsetrefs: vec![],
            r#type: vec![],
            member: vec![],
        },
        DerefEntry {
            kind: DerefKind::Other,
            offsetrefs: vec![OffsetRef { kind: DerefKind::Member, id: 2 }],
            r#type: vec![],
            member: vec![],
        },
        DerefEntry {
            kind: DerefKind::Member,
            offsetrefs: vec![],
            r#type: vec![S],
            member: vec![0],
        },
        DerefEntry {
            kind: DerefKind::Other,
            offsetrefs: vec![OffsetRef { kind: DerefKind::Member, id: 4 }],
            r#type: vec![],
            member: vec![],
        },
        DerefEntry {
            kind: DerefKind::Member,
            offsetrefs: vec![],
            r#type: vec![S],
            member: vec![1],
        },
    ]
}

fn copy_from_user_func() -> FuncEntry {
    FuncEntry {
        id: FuncId(99),
        name: "copy_from_user".to_string(),
        locals: vec![],
        switches: vec![],
        callrefs: vec![],
        calls: vec![],
        call_info: vec![],
        derefs: vec![],
    }
}

#[test]
fn detects_the_size_and_pointer_field_pairing() {
    let entry = FuncEntry {
        id: FuncId(1),
        name: "ioctl_handler".to_string(),
        locals: vec![],
        switches: vec![],
        callrefs: vec![],
        calls: vec![FuncId(99)],
        call_info: vec![CallInfo { args: vec![0, 1, 3] }],
        derefs: copy_from_user_derefs(),
    };
    let db = MemoryCodeDb::new(vec![s_type(false)], vec![entry, copy_from_user_func()], vec![], vec![]);

    let mut handler = HandlerRecord::new("h".to_string(), FuncId(1));
    PointerBoundsAnalyzer::new().process(&db, &mut handler).unwrap();

    let bounds = handler.pointer_bounds().get(&S).expect("S has a recorded bound");
    assert_eq!(bounds.len(), 1);
    let only = bounds.iter().next().unwrap();
    assert_eq!(only.binding_member, 1);
    assert_eq!(only.bound_member, 0);
}

#[test]
fn skips_a_union_parent() {
    let entry = FuncEntry {
        id: FuncId(1),
        name: "ioctl_handler".to_string(),
        locals: vec![],
        switches: vec![],
        callrefs: vec![],
        calls: vec![FuncId(99)],
        call_info: vec![CallInfo { args: vec![0, 1, 3] }],
        derefs: copy_from_user_derefs(),
    };
    let db = MemoryCodeDb::new(vec![s_type(true)], vec![entry, copy_from_user_func()], vec![], vec![]);

    let mut handler = HandlerRecord::new("h".to_string(), FuncId(1));
    PointerBoundsAnalyzer::new().process(&db, &mut handler).unwrap();

    assert!(handler.pointer_bounds().is_empty());
}

#[test]
fn follows_the_callgraph_through_a_function_with_no_direct_binding_call() {
    let entry = FuncEntry {
        id: FuncId(1),
        name: "ioctl_handler".to_string(),
        locals: vec![],
        switches: vec![],
        callrefs: vec![],
        calls: vec![FuncId(2)],
        call_info: vec![],
        derefs: vec![],
    };
    let intermediate = FuncEntry {
        id: FuncId(2),
        name: "intermediate".to_string(),
        locals: vec![],
        switches: vec![],
        callrefs: vec![],
        calls: vec![FuncId(99)],
        call_info: vec![CallInfo { args: vec![0, 1, 3] }],
        derefs: copy_from_user_derefs(),
    };
    let db = MemoryCodeDb::new(
        vec![s_type(false)],
        vec![entry, intermediate, copy_from_user_func()],
        vec![],
        vec![],
    );

    let mut handler = HandlerRecord::new("h".to_string(), FuncId(1));
    PointerBoundsAnalyzer::new().process(&db, &mut handler).unwrap();

    assert!(
        handler.pointer_bounds().get(&S).is_some(),
        "bounds reachable only through a nested call must still be found"
    );
}
