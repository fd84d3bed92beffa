use crate::common::interpret_using_probe;
mod common;

#[test]
fn func_declaration_test() {
    let src = r#"
        func areWeHavingItYet() {
          info "Yes we are!";
        }

        info areWeHavingItYet;
    "#;
    let probe = interpret_using_probe(src);
    let output = &["<fn areWeHavingItYet>"];
    assert_eq!(None, probe.borrow().top_error_message());
    probe.borrow().assert_output_match(output);
}

#[test]
fn func_call_with_arguments_and_return() {
    let src = r#"
        func add(a, b) {
          return a + b;
        }

        info add(2, 3);
    "#;
    let probe = interpret_using_probe(src);
    assert_eq!(None, probe.borrow().top_error_message());
    probe.borrow().assert_output_match(&["5"]);
}

#[test]
fn recursive_func_call() {
    let src = r#"
        func fact(n) {
          if (n <= 1) {
            return 1;
          }
          return n * fact(n - 1);
        }

        info fact(5);
    "#;
    let probe = interpret_using_probe(src);
    assert_eq!(None, probe.borrow().top_error_message());
    probe.borrow().assert_output_match(&["120"]);
}

#[test]
fn wrong_argument_count_is_a_runtime_error() {
    let src = r#"
        func add(a, b) {
          return a + b;
        }

        info add(1);
    "#;
    let probe = interpret_using_probe(src);
    assert!(probe.borrow().vm_error().is_some());
}
