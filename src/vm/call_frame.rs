use std::rc::Rc;

use crate::chunk::Chunk;
use crate::func::Func;
use crate::instruction::{FetchResult, Instruction};

/// A function invocation's VM-side state: which function is running, the
/// instruction pointer into its chunk, and where its locals start on the
/// shared value stack. No upvalue/closure wrapper — functions are called
/// directly by `Rc<Func>`.
pub struct CallFrame {
    func: Rc<Func>,
    ip: usize,
    frame_start: usize,
}

impl CallFrame {
    pub fn new(func: Rc<Func>, frame_start: usize) -> Self {
        Self {
            func,
            ip: 0,
            frame_start,
        }
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn frame_start(&self) -> usize {
        self.frame_start
    }

    pub fn ip_inc(&mut self, val: usize) {
        self.ip += val;
    }

    pub fn ip_dec(&mut self, val: usize) {
        self.ip -= val;
    }

    pub fn func(&self) -> &Func {
        &self.func
    }

    pub fn chunk(&self) -> &Chunk {
        self.func.chunk()
    }

    pub fn line_number(&self) -> Option<usize> {
        self.chunk().line_number(self.ip)
    }

    pub fn fetch_instruction(&mut self) -> FetchResult<Instruction> {
        self.func.chunk().fetch(&mut self.ip)
    }

    pub fn func_name(&self) -> Option<&str> {
        self.func.name.as_deref()
    }
}
