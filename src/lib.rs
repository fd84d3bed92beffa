use std::rc::Rc;

pub mod chunk;
pub mod compiler;
pub mod errors;
pub mod func;
pub mod instruction;
pub mod module_loader;
pub mod scanner;
pub mod token;
pub mod utils;
pub mod value;
pub mod vm;

pub use compiler::{CompileConfig, Compiler};
pub use errors::ErrorInfo;
pub use func::Func;
pub use module_loader::{ModuleLoader, RecordingModuleLoader};
pub use scanner::Scanner;
pub use token::Token;
pub use utils::Shared;
pub use value::Value;
pub use vm::{BackendService, Machine, MachineError, MachineResult, VirtualMachineService};

/// Widest index a single-byte operand can address: local slots, global and
/// constant pool indices, and the hard ceiling on a function's own locals.
pub const UINT8_COUNT: usize = 256;

/// Compiles and runs source text end to end, the same sequence the CLI
/// drives by hand. Compile errors go to `interpreter_service` and the
/// machine never starts; runtime errors are reported through
/// `backend_service`, whichever channel the caller wired it to.
pub fn interpret(
    code_ref: Rc<Vec<char>>,
    interpreter_service: Shared<dyn InterpreterService>,
    backend_service: Shared<dyn BackendService>,
    module_loader: Box<dyn ModuleLoader>,
    config: CompileConfig,
) {
    let scanner = Box::new(Scanner::new(code_ref));
    let result = Compiler::new(scanner, config).compile();
    match result {
        Ok(func) => {
            let mut vm = Machine::with(func, backend_service.clone(), module_loader);
            let result = vm.run();

            if result.is_err() {
                backend_service
                    .borrow_mut()
                    .print_value(Value::text_from_str(
                        "Completed with errors. See messages above",
                    ));
            }
        }
        Err(arr) => {
            interpreter_service.borrow_mut().set_compile_errors(&arr);
        }
    }
}

pub trait InterpreterService {
    fn set_compile_errors(&mut self, errors: &[ErrorInfo]);
}
