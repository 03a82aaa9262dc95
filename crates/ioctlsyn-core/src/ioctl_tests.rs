use super::*;
use crate::codedb::{CallrefArgKind, CaseInfo, FuncEntry, FuncId, LocalVar, MemoryCodeDb, SwitchInfo, TypeClass, TypeEntry};

fn int_type() -> TypeEntry {
    TypeEntry {
        id: TypeId(5),
        str: "int".to_string(),
        class: TypeClass::Builtin,
        size: 32,
        refs: vec![],
        refnames: vec![],
        values: vec![],
        union: false,
    }
}

fn locals(names: &[&str]) -> Vec<LocalVar> {
    names
        .iter()
        .map(|n| LocalVar { name: n.to_string() })
        .collect()
}

#[test]
fn harvests_a_command_from_a_direct_switch() {
    let func = FuncEntry {
        id: FuncId(42),
        name: "my_ioctl".to_string(),
        locals: locals(&["file", "cmd", "arg"]),
        switches: vec![SwitchInfo {
            condition: "cmd".to_string(),
            cases: vec![CaseInfo {
                value: 1,
                label: "MY_CMD".to_string(),
                expanded: "_IOWR('a', 1, sizeof(int))".to_string(),
            }],
        }],
        callrefs: vec![],
        calls: vec![],
        call_info: vec![],
        derefs: vec![],
    };
    let db = MemoryCodeDb::new(vec![int_type()], vec![func], vec![], vec![]);

    let commands = IoctlAnalyzer::new().analyze_ioctl_commands(&db, FuncId(42));
    assert_eq!(commands.len(), 1);
    assert!(commands.contains(&("MY_CMD".to_string(), 1, TypeId(5))));
}

#[test]
fn follows_a_thin_forwarder_to_find_the_switch() {
    let forwarder = FuncEntry {
        id: FuncId(1),
        name: "thin_ioctl".to_string(),
        locals: locals(&["file", "cmd", "arg"]),
        switches: vec![],
        callrefs: vec![vec![
            crate::codedb::CallrefArg {
                kind: CallrefArgKind::Parm,
                id: COMMAND_ARG_MARKER,
                pos: 1,
            },
            crate::codedb::CallrefArg {
                kind: CallrefArgKind::Parm,
                id: ARGUMENT_ARG_MARKER,
                pos: 2,
            },
        ]],
        calls: vec![FuncId(2)],
        call_info: vec![],
        derefs: vec![],
    };
    let real = FuncEntry {
        id: FuncId(2),
        name: "real_ioctl".to_string(),
        locals: locals(&["file", "cmd", "arg"]),
        switches: vec![SwitchInfo {
            condition: "cmd".to_string(),
            cases: vec![CaseInfo {
                value: 7,
                label: "REAL_CMD".to_string(),
                expanded: "_IOWR('a', 7, sizeof(int))".to_string(),
            }],
        }],
        callrefs: vec![],
        calls: vec![],
        call_info: vec![],
        derefs: vec![],
    };
    let db = MemoryCodeDb::new(vec![int_type()], vec![forwarder, real], vec![], vec![]);

    let commands = IoctlAnalyzer::new().analyze_ioctl_commands(&db, FuncId(1));
    assert_eq!(commands.len(), 1);
    assert!(commands.contains(&("REAL_CMD".to_string(), 7, TypeId(5))));
}

#[test]
fn drops_cases_whose_expansion_has_no_sizeof() {
    let func = FuncEntry {
        id: FuncId(42),
        name: "my_ioctl".to_string(),
        locals: locals(&["file", "cmd", "arg"]),
        switches: vec![SwitchInfo {
            condition: "cmd".to_string(),
            cases: vec![CaseInfo {
                value: 1,
                label: "NO_TYPE".to_string(),
                expanded: "_IO('a', 1)".to_string(),
            }],
        }],
        callrefs: vec![],
        calls: vec![],
        call_info: vec![],
        derefs: vec![],
    };
    let db = MemoryCodeDb::new(vec![int_type()], vec![func], vec![], vec![]);
    assert!(IoctlAnalyzer::new().analyze_ioctl_commands(&db, FuncId(42)).is_empty());
}

#[test]
fn drops_cases_whose_type_does_not_resolve() {
    let func = FuncEntry {
        id: FuncId(42),
        name: "my_ioctl".to_string(),
        locals: locals(&["file", "cmd", "arg"]),
        switches: vec![SwitchInfo {
            condition: "cmd".to_string(),
            cases: vec![CaseInfo {
                value: 1,
                label: "UNKNOWN_CMD".to_string(),
                expanded: "_IOWR('a', 1, sizeof(struct does_not_exist))".to_string(),
            }],
        }],
        callrefs: vec![],
        calls: vec![],
        call_info: vec![],
        derefs: vec![],
    };
    let db = MemoryCodeDb::new(vec![int_type()], vec![func], vec![], vec![]);
    assert!(IoctlAnalyzer::new().analyze_ioctl_commands(&db, FuncId(42)).is_empty());
}

#[test]
fn gives_up_past_the_depth_bound_without_hanging() {
    // A chain of four thin forwarders; the switch only lives in the fourth,
    // one hop past MAX_DEPTH (3), so nothing should be harvested.
    fn thin_forwarder(id: u32, callee: u32) -> FuncEntry {
        FuncEntry {
            id: FuncId(id),
            name: format!("hop{id}"),
            locals: locals(&["file", "cmd", "arg"]),
            switches: vec![],
            callrefs: vec![vec![
                crate::codedb::CallrefArg {
                    kind: CallrefArgKind::Parm,
                    id: COMMAND_ARG_MARKER,
                    pos: 1,
                },
                crate::codedb::CallrefArg {
                    kind: CallrefArgKind::Parm,
                    id: ARGUMENT_ARG_MARKER,
                    pos: 2,
                },
            ]],
            calls: vec![FuncId(callee)],
            call_info: vec![],
            derefs: vec![],
        }
    }
    let deepest = FuncEntry {
        id: FuncId(4),
        name: "hop4".to_string(),
        locals: locals(&["file", "cmd", "arg"]),
        switches: vec![SwitchInfo {
            condition: "cmd".to_string(),
            cases: vec![CaseInfo {
                value: 9,
                label: "TOO_DEEP".to_string(),
                expanded: "_IOWR('a', 9, sizeof(int))".to_string(),
            }],
        }],
        callrefs: vec![],
        calls: vec![],
        call_info: vec![],
        derefs: vec![],
    };
    let db = MemoryCodeDb::new(
        vec![int_type()],
        vec![
            thin_forwarder(1, 2),
            thin_forwarder(2, 3),
            thin_forwarder(3, 4),
            deepest,
        ],
        vec![],
        vec![],
    );
    assert!(IoctlAnalyzer::new().analyze_ioctl_commands(&db, FuncId(1)).is_empty());
}
