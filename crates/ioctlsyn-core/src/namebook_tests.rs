use super::*;

#[test]
fn uniquifies_colliding_labels_with_trailing_underscores() {
    let mut book = NameBook::new();
    assert_eq!(book.label("FOO"), "FOO");
    assert_eq!(book.label("FOO"), "FOO_");
    assert_eq!(book.label("FOO"), "FOO__");
}

#[test]
fn path_constants_are_seeded_by_the_syscall_id() {
    let mut book = NameBook::new();
    assert_eq!(book.path_constant(FuncId(42)), "SYZDESCRIPTOR_PATH_42");
    // A second handler on the same syscall id still gets a unique constant.
    assert_eq!(book.path_constant(FuncId(42)), "SYZDESCRIPTOR_PATH_42_");
}

#[test]
fn type_names_fall_back_to_a_synthetic_placeholder_when_unnamed() {
    let mut book = NameBook::new();
    assert_eq!(book.type_name(TypeId(7), None), "ANONTYPE_7");
    assert_eq!(book.type_name(TypeId(8), Some("")), "ANONTYPE_8");
    assert_eq!(book.type_name(TypeId(9), Some("my_struct")), "my_struct");
}

#[test]
fn the_three_name_spaces_are_independent() {
    let mut book = NameBook::new();
    assert_eq!(book.label("shared"), "shared");
    // A path constant or type name called "shared" does not collide with
    // the label arena; each domain owns its own seen-set.
    assert_eq!(book.type_name(TypeId(1), Some("shared")), "shared");
}
