use crate::common::interpret_by_probe;
mod common;

#[test]
fn arithmetic_precedence() {
    let src = r"
        info 2 + 2 * 2;
    ";
    let probe = interpret_by_probe(src);
    assert!(probe.borrow().vm_error().is_none());
    probe.borrow().assert_output_match(&["6".to_string()]);
}

#[test]
fn modulo_and_power_bind_tighter_than_factor() {
    let src = r"
        info 2 ** 10 % 100;
    ";
    let probe = interpret_by_probe(src);
    assert!(probe.borrow().vm_error().is_none());
    probe.borrow().assert_output_match(&["24".to_string()]);
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let src = r"
        info 1 / 0;
    ";
    let probe = interpret_by_probe(src);
    assert!(probe.borrow().vm_error().is_some());
}

#[test]
fn string_concatenation_with_plus() {
    let src = r#"
        info "a" + "b" + "c";
    "#;
    let probe = interpret_by_probe(src);
    assert!(probe.borrow().vm_error().is_none());
    probe.borrow().assert_output_match(&["abc"]);
}
