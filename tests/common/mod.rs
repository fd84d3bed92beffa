extern crate lumen_bytecode;

mod probe;
pub use probe::*;

use std::rc::Rc;

use lumen_bytecode::module_loader::RecordingModuleLoader;
use lumen_bytecode::utils::shared;
use lumen_bytecode::{CompileConfig, Shared, interpret};

pub fn str_to_code_ref(input: &str) -> Rc<Vec<char>> {
    Rc::new(input.chars().collect())
}

pub fn interpret_using_probe(input: &str) -> Shared<Probe> {
    let code_ref = str_to_code_ref(input);
    let probe_shared = shared(Probe::default());
    interpret(
        code_ref,
        probe_shared.clone(),
        probe_shared.clone(),
        Box::new(RecordingModuleLoader::default()),
        CompileConfig::default(),
    );
    probe_shared
}

pub fn interpret_by_probe(input: &str) -> Shared<Probe> {
    interpret_using_probe(input)
}
