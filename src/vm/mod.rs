use std::fmt::Display;

use crate::value::Value;

mod call_frame;
pub mod disasm;
mod machine;

pub use machine::Machine;

/// Pluggable collaborator the machine reports values and failures through.
/// Kept as a trait so the same dispatch loop drives both the console CLI
/// and the in-process test probe below.
pub trait BackendService {
    fn print_value(&mut self, value: Value);

    fn set_error(&mut self, error: MachineError);

    fn set_stack_trace(&mut self, stack_trace: Vec<StackTraceElement>);
}

pub struct VirtualMachineService;

impl BackendService for VirtualMachineService {
    fn print_value(&mut self, value: Value) {
        println!("{value}");
    }

    fn set_error(&mut self, error: MachineError) {
        eprintln!("Runtime error: {error}");
    }

    fn set_stack_trace(&mut self, stack_trace: Vec<StackTraceElement>) {
        eprintln!("Trace:");
        stack_trace.iter().for_each(|elem| eprintln!("> {elem}"));
    }
}

pub mod probe {
    use super::*;

    #[derive(Default)]
    pub struct ProbeBackendService {
        pub print_buffer: Vec<String>,
        pub error: Option<MachineError>,
        pub stack_trace: Option<Vec<StackTraceElement>>,
    }

    impl ProbeBackendService {
        pub fn assert_output_match<T: AsRef<str>>(&self, output: &[T]) {
            for (l, r) in self.print_buffer.iter().zip(output.iter()) {
                assert_eq!(l, r.as_ref());
            }
            assert_eq!(
                self.print_buffer.len(),
                output.len(),
                "Output buffer line count mismatch"
            );
        }
    }

    impl BackendService for ProbeBackendService {
        fn print_value(&mut self, value: Value) {
            self.print_buffer.push(value.to_string());
        }

        fn set_error(&mut self, error: MachineError) {
            self.error = Some(error);
        }

        fn set_stack_trace(&mut self, stack_trace: Vec<StackTraceElement>) {
            self.stack_trace = Some(stack_trace);
        }
    }
}

#[derive(Debug, Clone)]
pub struct MachineError {
    text: String,
    line_number: Option<usize>,
}

impl MachineError {
    pub fn with_str(msg: &str) -> Self {
        Self {
            text: msg.to_string(),
            line_number: None,
        }
    }

    pub fn message(&self) -> &str {
        self.text.as_str()
    }
}

impl Display for MachineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line_number {
            Some(num) => write!(f, "[line {num}] {}", self.text),
            None => write!(f, "[line ???] {}", self.text),
        }
    }
}

pub type MachineResult<T> = Result<T, MachineError>;

pub struct StackTraceElement {
    pub line: Option<usize>,
    pub func_name: Option<String>,
}

impl Display for StackTraceElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.func_name.as_deref().unwrap_or("script");
        match self.line {
            Some(line) => write!(f, "[line {line}] in {name}"),
            None => write!(f, "[line ???] in {name}"),
        }
    }
}
