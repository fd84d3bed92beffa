use crate::common::interpret_using_probe;
mod common;

#[test]
fn if_statement_test() {
    let src = r#"
    if (4 > 3) {
        info "Inside if stmt";
        if (4 < 3) {
            info "Unreachable";
        }
        have a := "End block";
        info a;
    }
    info "Done";
    "#;
    let probe = interpret_using_probe(src);
    let output = &["Inside if stmt", "End block", "Done"];
    assert_eq!(None, probe.borrow().top_error_message());
    probe.borrow().assert_output_match(output);
}

#[test]
fn if_else_statement_test() {
    let src = r#"
    if (4 > 3) {
        info "True condition passed";
    } else {
        info "Unreachable";
    }
    info "Jmp1";
    if (4 < 3) {
        info "Unreachable";
    } else {
        info "Else condition passed";
    }
    info "Jmp2";
    "#;
    let probe = interpret_using_probe(src);
    let output = &[
        "True condition passed",
        "Jmp1",
        "Else condition passed",
        "Jmp2",
    ];
    assert_eq!(None, probe.borrow().top_error_message());
    probe.borrow().assert_output_match(output);
}

#[test]
fn and_or_short_circuit() {
    let src = r#"
    if (false and (1 / 0 > 0)) {
        info "Unreachable";
    } else {
        info "and short-circuited";
    }
    if (true or (1 / 0 > 0)) {
        info "or short-circuited";
    }
    "#;
    let probe = interpret_using_probe(src);
    assert_eq!(None, probe.borrow().top_error_message());
    probe
        .borrow()
        .assert_output_match(&["and short-circuited", "or short-circuited"]);
}
