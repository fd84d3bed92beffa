use std::env;
use std::process::ExitCode;
use std::rc::Rc;

use lumen_bytecode::errors::{ErrorFormatter, ErrorInfo};
use lumen_bytecode::utils::{file_to_chars, shared};
use lumen_bytecode::{CompileConfig, InterpreterService, RecordingModuleLoader, Shared, VirtualMachineService};

struct ConsoleInterpreterService {
    code: Rc<Vec<char>>,
    had_error: bool,
}

impl InterpreterService for ConsoleInterpreterService {
    fn set_compile_errors(&mut self, errors: &[ErrorInfo]) {
        self.had_error = true;
        let formatter = ErrorFormatter::with(self.code.clone());
        for error in errors {
            eprintln!("{}\n", formatter.format_error(error));
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("Usage: lumen <script>");
        return ExitCode::from(64);
    };

    let chars = match file_to_chars(path) {
        Ok(chars) => chars,
        Err(err) => {
            eprintln!("Can't read '{path}': {err}");
            return ExitCode::from(74);
        }
    };
    let code = Rc::new(chars);

    let service = shared(ConsoleInterpreterService {
        code: code.clone(),
        had_error: false,
    });
    let interpreter_service: Shared<dyn InterpreterService> = service.clone();
    let backend_service = shared(VirtualMachineService);
    let module_loader = Box::new(RecordingModuleLoader::default());

    lumen_bytecode::interpret(
        code,
        interpreter_service,
        backend_service,
        module_loader,
        CompileConfig::default(),
    );

    if service.borrow().had_error {
        return ExitCode::from(65);
    }
    ExitCode::SUCCESS
}
