use crate::chunk::Chunk;
use crate::func::{Func, FuncType};
use crate::instruction::{FetchResult, Instruction};
use crate::token::Token;
use crate::value::Value;

pub const MAX_LOCALS: usize = crate::UINT8_COUNT;

/// Per-function compile-time state: the chunk being built, the function's
/// locals stack, and the current lexical scope depth. One `Frame` exists
/// per nested `func` body plus one for the top-level script; frames link
/// to their enclosing frame so a nested function's compiler can fall back
/// to resolving names in the function that contains it.
pub struct Frame {
    func: Box<Func>,
    func_type: FuncType,
    locals: Vec<Local>,
    depth: usize,
    pub enclosing: Option<Box<Frame>>,
}

impl Frame {
    pub fn new(func_type: FuncType, enclosing: Option<Box<Frame>>) -> Self {
        Self {
            func: Box::new(Func::new(None)),
            func_type,
            locals: vec![Local::reserved()],
            depth: 0,
            enclosing,
        }
    }

    pub fn assign_name(&mut self, name: &str) {
        self.func.name = Some(name.to_string());
    }

    pub fn func_type(&self) -> FuncType {
        self.func_type
    }

    pub fn chunk(&self) -> &Chunk {
        self.func.chunk()
    }

    pub fn chunk_mut(&mut self) -> &mut Chunk {
        self.func.chunk_mut()
    }

    pub fn function_consumed(self) -> Func {
        *self.func
    }

    pub fn function_mut(&mut self) -> &mut Func {
        self.func.as_mut()
    }

    pub fn arity(&self) -> usize {
        self.func.arity
    }

    pub fn chunk_position(&self) -> usize {
        self.func.chunk().size()
    }
}

/// Code generation
impl Frame {
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.chunk_mut().add_constant(value)
    }

    pub fn emit_instruction_at_line(&mut self, instruction: &Instruction, line: usize) -> usize {
        let start = self.chunk_position();
        for byte in instruction.as_vec() {
            self.chunk_mut().write_u8(byte, line);
        }
        start
    }

    pub fn patch_instruction(&mut self, instruction: &Instruction, offset: usize) {
        for (idx, byte) in instruction.as_vec().into_iter().enumerate() {
            self.chunk_mut().patch_u8(byte, offset + idx);
        }
    }

    pub fn fetch_instruction(&self, offset: usize) -> (FetchResult<Instruction>, usize) {
        let mut idx = offset;
        let res = self.chunk().fetch(&mut idx);
        (res, idx - offset)
    }
}

/// Scope management
impl Frame {
    pub fn begin_scope(&mut self) {
        self.depth += 1;
    }

    /// Pops locals leaving scope, emitting one `OP_POP` per local as it
    /// shrinks — matches the teacher's pattern of walking `locals` from
    /// the top rather than computing a bulk pop count.
    pub fn end_scope(&mut self, line: usize) {
        self.depth -= 1;
        while self.is_last_out_of_scope() {
            self.emit_instruction_at_line(&Instruction::Pop, line);
            self.locals.pop();
        }
    }

    pub fn is_global_scope(&self) -> bool {
        self.depth == 0
    }

    pub fn is_local_scope(&self) -> bool {
        self.depth > 0
    }

    pub fn scope_depth(&self) -> usize {
        self.depth
    }

    pub fn has_capacity(&self) -> bool {
        self.locals.len() < MAX_LOCALS
    }

    pub fn push_local(&mut self, local: Local) {
        self.locals.push(local);
    }

    pub fn has_declared_variable(&self, token: &Token) -> bool {
        for local in self.locals.iter().rev() {
            let Some(depth) = local.depth else {
                break;
            };
            if depth < self.depth {
                break;
            }
            if local.name == token.lexeme {
                return true;
            }
        }
        false
    }

    pub fn resolve_local(&self, token: &Token) -> Option<LocalData> {
        for (i, local) in self.locals.iter().enumerate().rev() {
            if local.name == token.lexeme {
                return Some(LocalData {
                    index: i as u8,
                    depth: local.depth,
                });
            }
        }
        None
    }

    /// Locals whose depth exceeds `scope_depth`: used by `continue`/`break`
    /// to know how many `OP_POP`s to emit when unwinding out of nested
    /// blocks without actually shrinking `locals` (the scope is still
    /// active — only control flow is leaving early).
    pub fn locals_deeper_than(&self, scope_depth: usize) -> usize {
        self.locals
            .iter()
            .rev()
            .take_while(|l| l.depth.is_some_and(|d| d > scope_depth))
            .count()
    }

    fn is_last_out_of_scope(&self) -> bool {
        self.locals
            .last()
            .and_then(|local| local.depth)
            .is_some_and(|depth| depth > self.depth)
    }

    pub fn mark_initialized(&mut self) {
        if self.depth == 0 {
            return;
        }
        let Some(local) = self.locals.last_mut() else {
            return;
        };
        local.depth = Some(self.depth);
    }
}

pub struct LocalData {
    pub index: u8,
    pub depth: Option<usize>,
}

pub struct Local {
    name: String,
    depth: Option<usize>,
}

impl Local {
    pub fn with_name(name: String) -> Self {
        Self { name, depth: None }
    }

    fn reserved() -> Self {
        Self {
            name: String::new(),
            depth: Some(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn patch_instruction_overwrites_operand_in_place() {
        let mut frame = Frame::new(FuncType::Script, None);
        frame.emit_instruction_at_line(&Instruction::Add, 0);
        let emit_addr = frame.emit_instruction_at_line(&Instruction::Constant(1), 0);
        frame.emit_instruction_at_line(&Instruction::Subtract, 0);
        frame.emit_instruction_at_line(&Instruction::Return, 0);
        frame.patch_instruction(&Instruction::Constant(2), emit_addr);

        let chunk = frame.chunk();
        let mut offset = 0;
        let expected = [
            Instruction::Add,
            Instruction::Constant(2),
            Instruction::Subtract,
            Instruction::Return,
        ];
        let mut exp_idx = 0;
        while let Ok(instr) = chunk.fetch(&mut offset) {
            assert_eq!(instr, expected[exp_idx]);
            exp_idx += 1;
        }
    }

    #[test]
    fn locals_deeper_than_counts_without_shrinking() {
        let mut frame = Frame::new(FuncType::Script, None);
        frame.begin_scope();
        frame.push_local(Local::with_name("a".to_string()));
        frame.mark_initialized();
        frame.begin_scope();
        frame.push_local(Local::with_name("b".to_string()));
        frame.mark_initialized();
        frame.push_local(Local::with_name("c".to_string()));
        frame.mark_initialized();

        assert_eq!(frame.locals_deeper_than(1), 2);
        assert_eq!(frame.locals.len(), 3);
    }
}
