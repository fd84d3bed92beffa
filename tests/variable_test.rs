use crate::common::interpret_by_probe;

mod common;

#[test]
fn global_variables() {
    let src = r"
        have a := 1;
        info a;
        a := 2;
        info a;
        have b;
        b := 3;
        info b;
    ";
    let probe = interpret_by_probe(src);
    let output = &["1".to_string(), "2".to_string(), "3".to_string()];
    if let Some(err) = probe.borrow().vm_error() {
        panic!("Err: {err}");
    }
    probe.borrow().assert_output_match(output);
}

#[test]
fn local_variables_shadow_across_blocks() {
    let src = r"
        have a := 1;
        {
            have a := 2;
            info a;
        }
        info a;
    ";
    let probe = interpret_by_probe(src);
    if let Some(err) = probe.borrow().vm_error() {
        panic!("Err: {err}");
    }
    probe.borrow().assert_output_match(&["2", "1"]);
}

#[test]
fn undefined_global_is_a_runtime_error() {
    let src = r"
        info undeclared;
    ";
    let probe = interpret_by_probe(src);
    assert!(probe.borrow().vm_error().is_some());
}
