use crate::common::interpret_using_probe;
mod common;

#[test]
fn while_loop_counts_up() {
    let src = r#"
        have i := 0;
        while (i < 3) {
            info i;
            i := i + 1;
        }
    "#;
    let probe = interpret_using_probe(src);
    assert_eq!(None, probe.borrow().top_error_message());
    probe.borrow().assert_output_match(&["0", "1", "2"]);
}

#[test]
fn for_loop_with_all_three_clauses() {
    let src = r#"
        for (have i := 0; i < 3; i := i + 1) {
            info i;
        }
    "#;
    let probe = interpret_using_probe(src);
    assert_eq!(None, probe.borrow().top_error_message());
    probe.borrow().assert_output_match(&["0", "1", "2"]);
}

#[test]
fn break_exits_the_loop_early() {
    let src = r#"
        have i := 0;
        while (true) {
            if (i == 3) {
                break;
            }
            info i;
            i := i + 1;
        }
        info "done";
    "#;
    let probe = interpret_using_probe(src);
    assert_eq!(None, probe.borrow().top_error_message());
    probe.borrow().assert_output_match(&["0", "1", "2", "done"]);
}

#[test]
fn continue_skips_to_the_next_iteration() {
    let src = r#"
        for (have i := 0; i < 5; i := i + 1) {
            if (i == 2) {
                continue;
            }
            info i;
        }
    "#;
    let probe = interpret_using_probe(src);
    assert_eq!(None, probe.borrow().top_error_message());
    probe.borrow().assert_output_match(&["0", "1", "3", "4"]);
}

#[test]
fn continue_unwinds_locals_declared_in_the_loop_body() {
    let src = r#"
        for (have i := 0; i < 3; i := i + 1) {
            have doubled := i * 2;
            if (doubled == 2) {
                continue;
            }
            info doubled;
        }
    "#;
    let probe = interpret_using_probe(src);
    assert_eq!(None, probe.borrow().top_error_message());
    probe.borrow().assert_output_match(&["0", "4"]);
}

#[test]
fn break_outside_loop_is_a_compile_error() {
    let src = r"break;";
    let probe = interpret_using_probe(src);
    assert!(probe.borrow().top_error_message().is_some());
}

#[test]
fn continue_outside_loop_is_a_compile_error() {
    let src = r"continue;";
    let probe = interpret_using_probe(src);
    assert!(probe.borrow().top_error_message().is_some());
}
