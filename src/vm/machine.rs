use std::collections::HashMap;
use std::rc::Rc;

use crate::func::Func;
use crate::instruction::{FetchError, Instruction};
use crate::module_loader::ModuleLoader;
use crate::utils::{Shared, bytes_to_word};
use crate::value::{OperationError, Value, ValueOperation};
use crate::vm::call_frame::CallFrame;
use crate::vm::{BackendService, MachineError, MachineResult, StackTraceElement};

const FRAMES_MAX: usize = 64;
const STACK_MAX_SIZE: usize = FRAMES_MAX * crate::UINT8_COUNT;

/// Minimal stack machine executing exactly the opcode table the compiler
/// emits. Deliberately small: no profiling, no debugger hooks. Its only
/// job is to make the compiler's output observable end-to-end.
pub struct Machine {
    frames: Vec<CallFrame>,
    stack: Vec<Value>,
    globals: HashMap<Rc<String>, Value>,
    service: Shared<dyn BackendService>,
    module_loader: Box<dyn ModuleLoader>,
}

impl Machine {
    pub fn with(
        func: Func,
        service: Shared<dyn BackendService>,
        module_loader: Box<dyn ModuleLoader>,
    ) -> Self {
        let mut vm = Self::new(service, module_loader);
        let func_ref = Rc::new(func);
        _ = vm.stack_push(Value::Func(func_ref.clone()));
        vm.unchecked_call(func_ref, 0);
        vm
    }

    fn new(service: Shared<dyn BackendService>, module_loader: Box<dyn ModuleLoader>) -> Self {
        Self {
            frames: Vec::with_capacity(FRAMES_MAX),
            stack: Vec::with_capacity(STACK_MAX_SIZE),
            globals: HashMap::new(),
            service,
            module_loader,
        }
    }

    pub fn run(&mut self) -> MachineResult<()> {
        let result = self.perform();
        if let Err(err) = &result {
            self.service.borrow_mut().set_error(err.clone());
            self.flush_stack_trace();
            self.stack.clear();
            self.frames.clear();
        }
        result
    }

    fn perform(&mut self) -> MachineResult<()> {
        loop {
            let instr = match self.fetch_instruction() {
                Ok(instr) => instr,
                Err(FetchError::End) => break,
                Err(err) => return Err(self.runtime_error(format!("{err}"))),
            };
            match instr {
                Instruction::Constant(k) => self.op_constant(k)?,
                Instruction::Nil => self.stack_push(Value::Nil)?,
                Instruction::True => self.stack_push(Value::Bool(true))?,
                Instruction::False => self.stack_push(Value::Bool(false))?,
                Instruction::Pop => self.op_pop()?,
                Instruction::GetLocal(slot) => self.op_get_local(slot)?,
                Instruction::SetLocal(slot) => self.op_set_local(slot)?,
                Instruction::GetGlobal(k) => self.op_get_global(k)?,
                Instruction::SetGlobal(k) => self.op_set_global(k)?,
                Instruction::DefineGlobal(k) => self.op_define_global(k)?,
                Instruction::Equal => self.op_binary(Value::equals)?,
                Instruction::Greater => self.op_binary(Value::greater)?,
                Instruction::Less => self.op_binary(Value::less)?,
                Instruction::Add => self.op_binary(Value::add)?,
                Instruction::Subtract => self.op_binary(Value::subtract)?,
                Instruction::Multiply => self.op_binary(Value::multiply)?,
                Instruction::Divide => self.op_binary(Value::divide)?,
                Instruction::Modulo => self.op_binary(Value::modulo)?,
                Instruction::Power => self.op_binary(Value::power)?,
                Instruction::Not => self.op_not()?,
                Instruction::Negate => self.op_negate()?,
                Instruction::Info => self.op_info()?,
                Instruction::Jump(hi, lo) => self.op_jump(hi, lo)?,
                Instruction::JumpIfFalse(hi, lo) => self.op_jump_if_false(hi, lo)?,
                Instruction::Loop(hi, lo) => self.op_loop(hi, lo)?,
                Instruction::Call(argc) => self.op_call(argc)?,
                Instruction::Return => {
                    if self.op_return()? {
                        break;
                    }
                }
                Instruction::Import => self.op_import()?,
            }
        }
        Ok(())
    }
}

/// Jumps
impl Machine {
    fn op_return(&mut self) -> MachineResult<bool> {
        let result = self.stack_pop()?;
        let frame = self
            .frames
            .pop()
            .ok_or(MachineError::with_str("Bug: return on empty call frame"))?;

        if self.frames.is_empty() {
            self.stack_pop()?;
            return Ok(true);
        }

        self.stack.truncate(frame.frame_start());
        self.stack_push(result)?;
        Ok(false)
    }

    fn op_loop(&mut self, hi: u8, lo: u8) -> MachineResult<()> {
        let jump = bytes_to_word(hi, lo);
        self.frame_mut()?.ip_dec(jump);
        Ok(())
    }

    fn op_jump(&mut self, hi: u8, lo: u8) -> MachineResult<()> {
        let jump = bytes_to_word(hi, lo);
        self.frame_mut()?.ip_inc(jump);
        Ok(())
    }

    fn op_jump_if_false(&mut self, hi: u8, lo: u8) -> MachineResult<()> {
        let jump = bytes_to_word(hi, lo);
        let condition = self.stack_peek()?.as_bool();
        if !condition {
            self.frame_mut()?.ip_inc(jump);
        }
        Ok(())
    }
}

/// Math and logical ops
impl Machine {
    fn op_not(&mut self) -> MachineResult<()> {
        let value = self.stack_pop()?;
        self.stack_push(Value::Bool(!value.as_bool()))
    }

    fn op_negate(&mut self) -> MachineResult<()> {
        let value = self.stack_pop()?;
        let Some(value) = value.as_number() else {
            return Err(self.runtime_error("Operand must be a number"));
        };
        self.stack_push(Value::number(-value))
    }

    fn op_binary(&mut self, operation: ValueOperation) -> MachineResult<()> {
        let b = self.stack_pop()?;
        let a = self.stack_pop()?;
        match operation(&a, &b) {
            Ok(value) => {
                self.stack.push(value);
                Ok(())
            }
            Err(OperationError::TypeMismatch) => {
                Err(self.runtime_error("Invalid/incompatible operand types"))
            }
            Err(OperationError::DivisionByZero) => Err(self.runtime_error("Division by zero")),
        }
    }
}

/// Function calls
impl Machine {
    fn op_call(&mut self, arg_count: u8) -> MachineResult<()> {
        let arg_count = arg_count as usize;
        let value = self.stack_peek_at(arg_count)?;
        self.call_value(value, arg_count)
    }

    fn call_value(&mut self, value: Value, arg_count: usize) -> MachineResult<()> {
        match value {
            Value::Func(callee) => self.call_func(callee, arg_count),
            _ => Err(self.runtime_error("Can only call functions")),
        }
    }

    fn call_func(&mut self, callee: Rc<Func>, arg_count: usize) -> MachineResult<()> {
        let arity = callee.arity;
        if arg_count != arity {
            return Err(self.runtime_error(format!(
                "Expected {arity} arguments but got {arg_count}"
            )));
        }
        if self.frames.len() == FRAMES_MAX {
            return Err(self.runtime_error("Stack overflow"));
        }
        self.unchecked_call(callee, arg_count);
        Ok(())
    }

    fn unchecked_call(&mut self, func: Rc<Func>, arg_count: usize) {
        let frame_start = self.stack.len() - arg_count - 1;
        self.frames.push(CallFrame::new(func, frame_start));
    }
}

/// Variables
impl Machine {
    fn op_define_global(&mut self, index: u8) -> MachineResult<()> {
        let name = self.read_const_string(index)?;
        let value = self.stack_pop()?;
        self.globals.insert(name, value);
        Ok(())
    }

    fn op_get_global(&mut self, index: u8) -> MachineResult<()> {
        let name = self.read_const_string(index)?;
        let Some(value) = self.globals.get(&name).cloned() else {
            return Err(self.runtime_error(format!("Undefined variable {name}")));
        };
        self.stack_push(value)
    }

    fn op_set_global(&mut self, index: u8) -> MachineResult<()> {
        let name = self.read_const_string(index)?;
        if !self.globals.contains_key(&name) {
            return Err(self.runtime_error(format!("Undefined variable {name}")));
        }
        let value = self.stack_peek()?;
        self.globals.insert(name, value);
        Ok(())
    }

    fn op_get_local(&mut self, rel_slot: u8) -> MachineResult<()> {
        let slot = self.relative_to_absolute_slot(rel_slot)?;
        let Some(value) = self.stack.get(slot).cloned() else {
            return Err(self.runtime_error("Bug: failed to get local value"));
        };
        self.stack_push(value)
    }

    fn op_set_local(&mut self, rel_slot: u8) -> MachineResult<()> {
        let value = self.stack_peek()?;
        let slot = self.relative_to_absolute_slot(rel_slot)?;
        self.stack[slot] = value;
        Ok(())
    }

    fn relative_to_absolute_slot(&self, relative_slot: u8) -> MachineResult<usize> {
        Ok(self.frame()?.frame_start() + relative_slot as usize)
    }
}

/// Modules
impl Machine {
    fn op_import(&mut self) -> MachineResult<()> {
        let value = self.stack_pop()?;
        let Some(name) = value.as_text() else {
            return Err(self.runtime_error("Bug: import expects a string constant"));
        };
        self.module_loader.load(&name);
        Ok(())
    }
}

/// Access & fetch
impl Machine {
    fn op_constant(&mut self, index: u8) -> MachineResult<()> {
        let value = self.read_const(index)?;
        self.stack_push(value)
    }

    fn fetch_instruction(&mut self) -> crate::instruction::FetchResult<Instruction> {
        let frame = self
            .frame_mut()
            .map_err(|err| FetchError::Other(err.message().to_string()))?;
        frame.fetch_instruction()
    }

    fn frame(&self) -> MachineResult<&CallFrame> {
        self.frames
            .last()
            .ok_or_else(|| MachineError::with_str("Bug: empty call frame"))
    }

    fn frame_mut(&mut self) -> MachineResult<&mut CallFrame> {
        self.frames
            .last_mut()
            .ok_or_else(|| MachineError::with_str("Bug: empty call frame"))
    }

    fn read_const(&self, index: u8) -> MachineResult<Value> {
        let Some(value) = self.frame()?.chunk().read_const(index) else {
            return Err(self.runtime_error("Invalid constant index"));
        };
        Ok(value)
    }

    fn read_const_string(&self, index: u8) -> MachineResult<Rc<String>> {
        let name = self.read_const(index)?;
        let Some(name) = name.as_text() else {
            return Err(self.runtime_error("Bug: expected a string constant"));
        };
        Ok(name)
    }
}

/// Stack
impl Machine {
    fn op_pop(&mut self) -> MachineResult<()> {
        self.stack_pop()?;
        Ok(())
    }

    fn op_info(&mut self) -> MachineResult<()> {
        let value = self.stack_pop()?;
        self.service.borrow_mut().print_value(value);
        Ok(())
    }

    fn stack_push(&mut self, value: Value) -> MachineResult<()> {
        if self.stack.len() >= STACK_MAX_SIZE {
            return Err(self.runtime_error("Stack overflow"));
        }
        self.stack.push(value);
        Ok(())
    }

    fn stack_peek(&self) -> MachineResult<Value> {
        self.stack_peek_at(0)
    }

    fn stack_peek_at(&self, rev_index: usize) -> MachineResult<Value> {
        let len = self.stack.len();
        if rev_index >= len {
            return Err(MachineError::with_str(&format!(
                "Bug: trying to access stack with invalid index {rev_index}"
            )));
        }
        self.stack
            .get(len - rev_index - 1)
            .cloned()
            .ok_or_else(|| MachineError::with_str("Bug: invalid stack index"))
    }

    fn stack_pop(&mut self) -> MachineResult<Value> {
        self.stack
            .pop()
            .ok_or_else(|| self.runtime_error("Pop on empty stack"))
    }
}

/// Errors & diagnostics
impl Machine {
    fn runtime_error<T: AsRef<str>>(&self, message: T) -> MachineError {
        let mut line_number = None;
        if let Ok(frame) = self.frame() {
            let idx = frame.ip().saturating_sub(1);
            line_number = frame.chunk().line_number(idx);
        }
        MachineError {
            text: message.as_ref().to_string(),
            line_number,
        }
    }

    fn flush_stack_trace(&mut self) {
        let stack_trace = self
            .frames
            .iter()
            .rev()
            .map(|frame| StackTraceElement {
                line: frame.line_number(),
                func_name: frame.func_name().map(|s| s.to_string()),
            })
            .collect::<Vec<_>>();
        self.service.borrow_mut().set_stack_trace(stack_trace);
    }
}
