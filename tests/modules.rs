use crate::common::interpret_using_probe;
mod common;

#[test]
fn using_statement_does_not_fail_compilation_or_execution() {
    let src = r#"
        using "math";
        info "after import";
    "#;
    let probe = interpret_using_probe(src);
    assert_eq!(None, probe.borrow().top_error_message());
    assert!(probe.borrow().vm_error().is_none());
    probe.borrow().assert_output_match(&["after import"]);
}

#[test]
fn using_non_string_module_name_is_a_compile_error() {
    let src = r"using 123;";
    let probe = interpret_using_probe(src);
    assert!(probe.borrow().top_error_message().is_some());
}

#[test]
fn using_statement_missing_semicolon_is_a_compile_error() {
    let src = r#"
        using "math"
        info "unreachable";
    "#;
    let probe = interpret_using_probe(src);
    assert!(probe.borrow().top_error_message().is_some());
}
