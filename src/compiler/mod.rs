mod frame;
mod loop_ctx;
mod rule;

use std::rc::Rc;

use frame::{Frame, Local};
use loop_ctx::LoopContext;
use rule::{ParseRule, Precedence};

use crate::errors::{ErrorCollector, ErrorInfo, ErrorKind};
use crate::func::{Func, FuncType};
use crate::instruction::Instruction;
use crate::scanner::TokenSource;
use crate::token::{Token, TokenKind};
use crate::utils::word_to_bytes;
use crate::value::Value;
use crate::vm::disasm::disassemble;

const MAX_FUNCTION_ARGUMENTS: usize = 255;

/// Caller-controlled knobs for a single `compile` call. `dump_disassembly`
/// attaches a human-readable instruction trace to the compiled function
/// rather than gating it behind a build-time flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileConfig {
    pub dump_disassembly: bool,
}

type Rule = ParseRule<Compiler>;

/// Single-pass Pratt compiler: parses and emits bytecode in the same walk,
/// with no intermediate AST. `frame` is the active function's compile-time
/// state (locals, scope depth, chunk); nested `func` bodies push a new
/// frame and pop back to the enclosing one when their block ends.
pub struct Compiler {
    current: Token,
    previous: Token,
    frame: Option<Box<Frame>>,
    scanner: Box<dyn TokenSource>,
    errors: ErrorCollector,
    loop_stack: Vec<LoopContext>,
    config: CompileConfig,
}

impl Compiler {
    pub fn new(scanner: Box<dyn TokenSource>, config: CompileConfig) -> Self {
        Self {
            current: Token::undefined(),
            previous: Token::undefined(),
            frame: None,
            scanner,
            errors: ErrorCollector::new(),
            loop_stack: Vec::new(),
            config,
        }
    }

    pub fn compile(mut self) -> Result<Func, Vec<ErrorInfo>> {
        self.init_frame(FuncType::Script);
        self.advance();
        while !self.is_match(TokenKind::Eof) {
            self.declaration();
        }
        let mut func = self.end_frame().function_consumed();

        if self.errors.has_errors() {
            return Err(self.errors.into_errors());
        }

        if self.config.dump_disassembly {
            func.disassembly = Some(disassemble(&func, func.name.as_deref().unwrap_or("script")));
        }

        Ok(func)
    }

    fn advance(&mut self) {
        self.previous = self.current.clone();
        loop {
            let token = self.scanner.scan_token();
            let is_err = token.is_err();
            self.current = token;
            if is_err {
                self.error_at_current(ErrorKind::UnexpectedToken, "");
            } else {
                break;
            }
        }
    }

    fn is_match(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(ErrorKind::UnexpectedToken, message);
    }

    fn declaration(&mut self) {
        if self.is_match(TokenKind::Func) {
            self.func_declaration();
        } else if self.is_match(TokenKind::Have) {
            self.have_declaration();
        } else {
            self.statement();
        }
        if self.errors.is_panic() {
            self.synchronize();
        }
    }

    fn synchronize(&mut self) {
        self.errors.reset_panic();
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Func
                | TokenKind::Have
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Info
                | TokenKind::Return
                | TokenKind::Using
                | TokenKind::Break
                | TokenKind::Continue => return,
                _ => {}
            }
            self.advance();
        }
    }
}

/// Functions
impl Compiler {
    fn init_frame(&mut self, func_type: FuncType) {
        let mut frame = Frame::new(func_type, self.frame.take());
        if func_type != FuncType::Script {
            frame.assign_name(&self.previous.lexeme);
        }
        self.frame = Some(Box::new(frame));
    }

    fn end_frame(&mut self) -> Frame {
        self.emit_return();
        let mut frame = self.frame.take().expect("Bug: frame can't be None");
        self.frame = frame.enclosing.take();
        *frame
    }

    fn func_declaration(&mut self) {
        let global = self.parse_variable("Expect function name");
        self.frame_mut().mark_initialized();
        self.function(FuncType::Function);
        self.define_variable(global);
    }

    fn function(&mut self, func_type: FuncType) {
        self.init_frame(func_type);
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after function name");
        if !self.check(TokenKind::RightParen) {
            loop {
                self.frame_mut().function_mut().arity += 1;
                if self.frame().arity() > MAX_FUNCTION_ARGUMENTS {
                    self.error_at_current(ErrorKind::TooManyParams, "Can't have more than 255 parameters");
                }
                let constant = self.parse_variable("Expect parameter name");
                self.define_variable(constant);
                if !self.is_match(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters");
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body");
        self.block();

        let func = self.end_frame().function_consumed();
        let idx = self.make_constant(Value::func(Rc::new(func)));
        self.emit_instruction(&Instruction::Constant(idx));
    }
}

/// Expressions
impl Compiler {
    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix_rule) = self.get_rule(self.previous.kind).prefix else {
            self.error(ErrorKind::ExpectExpression, "Expect expression");
            return;
        };

        let can_assign = precedence.le(&Precedence::Assignment);
        prefix_rule(self, can_assign);

        while precedence.le(&self.get_rule(self.current.kind).precedence) {
            self.advance();
            let infix_rule = self
                .get_rule(self.previous.kind)
                .infix
                .expect("Bug: infix rule missing for token with a precedence");
            infix_rule(self, can_assign);
        }

        if can_assign && self.is_match(TokenKind::ColonEqual) {
            self.error(ErrorKind::InvalidAssignmentTarget, "Invalid assignment target");
        }
    }

    fn get_rule(&self, kind: TokenKind) -> Rule {
        use TokenKind::*;
        match kind {
            LeftParen => Rule::new(Some(Self::grouping), Some(Self::call), Precedence::Call),
            Minus => Rule::new(Some(Self::unary), Some(Self::binary), Precedence::Term),
            Plus => Rule::new(None, Some(Self::binary), Precedence::Term),
            Slash | Star | Percent => Rule::new(None, Some(Self::binary), Precedence::Factor),
            StarStar => Rule::new(None, Some(Self::binary), Precedence::Power),
            Number => Rule::new(Some(Self::number), None, Precedence::None),
            Nil | False | True => Rule::new(Some(Self::literal), None, Precedence::None),
            Bang => Rule::new(Some(Self::unary), None, Precedence::None),
            EqualEqual | BangEqual => Rule::new(None, Some(Self::binary), Precedence::Equality),
            Greater | GreaterEqual | Less | LessEqual => {
                Rule::new(None, Some(Self::binary), Precedence::Comparison)
            }
            TokenKind::String => Rule::new(Some(Self::string), None, Precedence::None),
            Identifier => Rule::new(Some(Self::variable), None, Precedence::None),
            And => Rule::new(None, Some(Self::and), Precedence::And),
            Or => Rule::new(None, Some(Self::or), Precedence::Or),
            _ => Rule::default(),
        }
    }

    fn and(&mut self, _can_assign: bool) {
        let end_jump = self.emit_instruction(&Instruction::stub_jump_if_false());
        self.emit_instruction(&Instruction::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or(&mut self, _can_assign: bool) {
        let else_jump = self.emit_instruction(&Instruction::stub_jump_if_false());
        let end_jump = self.emit_instruction(&Instruction::stub_jump());

        self.patch_jump(else_jump);
        self.emit_instruction(&Instruction::Pop);

        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn call(&mut self, _can_assign: bool) {
        let arg_count = self.argument_list() as u8;
        self.emit_instruction(&Instruction::Call(arg_count));
    }

    fn argument_list(&mut self) -> usize {
        let mut arg_count = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if arg_count == MAX_FUNCTION_ARGUMENTS {
                    self.error(ErrorKind::TooManyArguments, "Can't have more than 255 arguments");
                }
                arg_count += 1;
                if !self.is_match(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments");
        arg_count
    }

    fn binary(&mut self, _can_assign: bool) {
        let operator_kind = self.previous.kind;
        let rule = self.get_rule(operator_kind);
        self.parse_precedence(rule.precedence.increased());

        let instructions: &[Instruction] = match operator_kind {
            TokenKind::BangEqual => &[Instruction::Equal, Instruction::Not],
            TokenKind::EqualEqual => &[Instruction::Equal],
            TokenKind::Greater => &[Instruction::Greater],
            TokenKind::GreaterEqual => &[Instruction::Less, Instruction::Not],
            TokenKind::Less => &[Instruction::Less],
            TokenKind::LessEqual => &[Instruction::Greater, Instruction::Not],
            TokenKind::Plus => &[Instruction::Add],
            TokenKind::Minus => &[Instruction::Subtract],
            TokenKind::Star => &[Instruction::Multiply],
            TokenKind::Slash => &[Instruction::Divide],
            TokenKind::Percent => &[Instruction::Modulo],
            TokenKind::StarStar => &[Instruction::Power],
            other => unreachable!("Unexpected binary operator {other:?}"),
        };
        self.emit_instructions(instructions);
    }

    fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression");
    }

    fn literal(&mut self, _can_assign: bool) {
        match self.previous.kind {
            TokenKind::False => self.emit_instruction(&Instruction::False),
            TokenKind::True => self.emit_instruction(&Instruction::True),
            TokenKind::Nil => self.emit_instruction(&Instruction::Nil),
            _ => unreachable!("literal"),
        };
    }

    fn number(&mut self, _can_assign: bool) {
        // matches libc strtod fallback semantics: an unparseable lexeme never
        // reaches here (the scanner only emits digit runs), so this only
        // guards overflow to +/-inf.
        let value = Value::number_from(&self.previous.lexeme).unwrap_or(Value::Number(0.0));
        self.emit_constant(value);
    }

    fn string(&mut self, _can_assign: bool) {
        let s = &self.previous.lexeme;
        let text = &s[1..s.len() - 1];
        self.emit_constant(Value::text_from_str(text));
    }

    fn unary(&mut self, _can_assign: bool) {
        let operator_kind = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator_kind {
            TokenKind::Minus => self.emit_instruction(&Instruction::Negate),
            TokenKind::Bang => self.emit_instruction(&Instruction::Not),
            _ => unreachable!("unary"),
        };
    }

    fn variable(&mut self, can_assign: bool) {
        self.named_variable(self.previous.clone(), can_assign);
    }

    fn named_variable(&mut self, token: Token, can_assign: bool) {
        let (getter, setter) = if let Some(info) = self.frame().resolve_local(&token) {
            if info.depth.is_none() {
                self.error(
                    ErrorKind::ReadInOwnInitializer,
                    "Can't read local variable in its own initializer",
                );
            }
            (Instruction::GetLocal(info.index), Instruction::SetLocal(info.index))
        } else {
            let idx = self.identifier_constant(token);
            (Instruction::GetGlobal(idx), Instruction::SetGlobal(idx))
        };
        if can_assign && self.is_match(TokenKind::ColonEqual) {
            self.expression();
            self.emit_instruction(&setter);
        } else {
            self.emit_instruction(&getter);
        }
    }
}

/// Variables
impl Compiler {
    fn have_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name");

        if self.is_match(TokenKind::ColonEqual) {
            self.expression();
        } else {
            self.emit_instruction(&Instruction::Nil);
        }
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration");

        self.define_variable(global);
    }

    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable();
        if self.frame().is_local_scope() {
            return 0;
        }
        self.identifier_constant(self.previous.clone())
    }

    fn declare_variable(&mut self) {
        if self.frame().is_global_scope() {
            return;
        }
        let token = self.previous.clone();
        if self.frame().has_declared_variable(&token) {
            self.error(
                ErrorKind::DuplicateName,
                "Already a variable with this name in this scope",
            );
        }
        self.add_local(token);
    }

    fn add_local(&mut self, token: Token) {
        if !self.frame().has_capacity() {
            self.error(ErrorKind::TooManyLocals, "Too many local variables in function");
            return;
        }
        self.frame_mut().push_local(Local::with_name(token.lexeme));
    }

    fn define_variable(&mut self, global: u8) {
        if self.frame().is_local_scope() {
            self.frame_mut().mark_initialized();
            return;
        }
        self.emit_instruction(&Instruction::DefineGlobal(global));
    }

    fn identifier_constant(&mut self, token: Token) -> u8 {
        self.make_constant(Value::text_from_string(token.lexeme))
    }
}

/// Statements
impl Compiler {
    fn statement(&mut self) {
        if self.is_match(TokenKind::Info) {
            self.info_statement();
        } else if self.is_match(TokenKind::Break) {
            self.break_statement();
        } else if self.is_match(TokenKind::Continue) {
            self.continue_statement();
        } else if self.is_match(TokenKind::For) {
            self.for_statement();
        } else if self.is_match(TokenKind::If) {
            self.if_statement();
        } else if self.is_match(TokenKind::Return) {
            self.return_statement();
        } else if self.is_match(TokenKind::While) {
            self.while_statement();
        } else if self.is_match(TokenKind::Using) {
            self.using_statement();
        } else if self.is_match(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value");
        self.emit_instruction(&Instruction::Pop);
    }

    fn info_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value");
        self.emit_instruction(&Instruction::Info);
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition");

        let then_jump = self.emit_instruction(&Instruction::stub_jump_if_false());
        self.emit_instruction(&Instruction::Pop);
        self.statement();

        let else_jump = self.emit_instruction(&Instruction::stub_jump());

        self.patch_jump(then_jump);
        self.emit_instruction(&Instruction::Pop);

        if self.is_match(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.mark_start_loop();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition");

        let exit_jump = self.emit_instruction(&Instruction::stub_jump_if_false());
        self.emit_instruction(&Instruction::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_instruction(&Instruction::Pop);
        self.flush_loop();
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'");
        if self.is_match(TokenKind::Semicolon) {
            // no initializer
        } else if self.is_match(TokenKind::Have) {
            self.have_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.mark_start_loop();
        let mut exit_jump: Option<usize> = None;
        if !self.is_match(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition");
            exit_jump = Some(self.emit_instruction(&Instruction::stub_jump_if_false()));
            self.emit_instruction(&Instruction::Pop);
        }

        if !self.is_match(TokenKind::RightParen) {
            let body_jump = self.emit_instruction(&Instruction::stub_jump());
            let increment_start = self.chunk_position();
            self.expression();
            self.emit_instruction(&Instruction::Pop);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
            self.loop_stack.last_mut().expect("Bug: loop stack empty").start = loop_start;
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_instruction(&Instruction::Pop);
        }

        self.flush_loop();
        self.end_scope();
    }

    fn break_statement(&mut self) {
        self.consume(TokenKind::Semicolon, "Expect ';' after 'break'");
        let Some(loop_ctx) = self.loop_stack.last() else {
            self.error(ErrorKind::BreakOutsideLoop, "Can't use 'break' outside a loop");
            return;
        };
        let scope_depth = loop_ctx.scope_depth;
        self.unwind_loop_locals(scope_depth);
        let offset = self.emit_instruction(&Instruction::stub_jump());
        self.loop_stack
            .last_mut()
            .expect("Bug: loop stack became empty")
            .breaks
            .push(offset);
    }

    fn continue_statement(&mut self) {
        self.consume(TokenKind::Semicolon, "Expect ';' after 'continue'");
        let Some(loop_ctx) = self.loop_stack.last() else {
            self.error(ErrorKind::ContinueOutsideLoop, "Can't use 'continue' outside a loop");
            return;
        };
        let (start, scope_depth) = (loop_ctx.start, loop_ctx.scope_depth);
        self.unwind_loop_locals(scope_depth);
        self.emit_loop(start);
    }

    /// Pops locals declared inside the loop body without removing them
    /// from the frame's locals table: the scope is still lexically active,
    /// only control flow is leaving it early.
    fn unwind_loop_locals(&mut self, scope_depth: usize) {
        let count = self.frame().locals_deeper_than(scope_depth);
        for _ in 0..count {
            self.emit_instruction(&Instruction::Pop);
        }
    }

    fn mark_start_loop(&mut self) -> usize {
        let start = self.chunk_position();
        let scope_depth = self.frame().scope_depth();
        self.loop_stack.push(LoopContext::new(start, scope_depth));
        start
    }

    fn flush_loop(&mut self) {
        let Some(loop_ctx) = self.loop_stack.pop() else {
            return;
        };
        for exit_jump in loop_ctx.breaks {
            self.patch_jump(exit_jump);
        }
    }

    fn begin_scope(&mut self) {
        self.frame_mut().begin_scope();
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block");
    }

    fn end_scope(&mut self) {
        let line = self.line();
        self.frame_mut().end_scope(line);
    }

    fn return_statement(&mut self) {
        if self.frame().func_type() == FuncType::Script {
            self.error(ErrorKind::ReturnFromScript, "Can't return a value from script");
        }

        if self.is_match(TokenKind::Semicolon) {
            self.emit_return();
        } else {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after return value");
            self.emit_instruction(&Instruction::Return);
        }
    }

    fn using_statement(&mut self) {
        self.consume(TokenKind::String, "Expect module name");
        let s = &self.previous.lexeme;
        let text = &s[1..s.len() - 1];
        self.emit_constant(Value::text_from_str(text));
        self.emit_instruction(&Instruction::Import);
        self.consume(TokenKind::Semicolon, "Expect ';' after module name");
    }
}

/// Emit helpers
impl Compiler {
    fn make_constant(&mut self, value: Value) -> u8 {
        let idx = self.frame_mut().add_constant(value);
        if idx > u8::MAX as usize {
            self.error(ErrorKind::TooManyConstants, "Too many constants in one chunk");
            return 0;
        }
        idx as u8
    }

    fn emit_constant(&mut self, value: Value) {
        let idx = self.make_constant(value);
        self.emit_instruction(&Instruction::Constant(idx));
    }

    fn emit_return(&mut self) -> usize {
        self.emit_instruction(&Instruction::Nil);
        self.emit_instruction(&Instruction::Return)
    }

    fn emit_instruction(&mut self, instruction: &Instruction) -> usize {
        let line = self.line();
        self.frame_mut().emit_instruction_at_line(instruction, line)
    }

    fn emit_instructions(&mut self, instructions: &[Instruction]) {
        instructions.iter().for_each(|instr| _ = self.emit_instruction(instr));
    }

    fn emit_loop(&mut self, loop_start: usize) {
        let size = Instruction::Loop(0, 0).size();
        let offset = self.chunk_position() - loop_start + size;
        if offset > u16::MAX as usize {
            self.error(ErrorKind::LoopBodyTooLarge, "Loop body too large");
        }
        let (hi, lo) = word_to_bytes(offset);
        self.emit_instruction(&Instruction::Loop(hi, lo));
    }

    fn patch_jump(&mut self, offset: usize) {
        let (fetch_result, size) = self.frame().fetch_instruction(offset);

        let jump = self.chunk_position() - offset - size;
        if jump > u16::MAX as usize {
            self.error(ErrorKind::JumpTooFar, "Too much code to jump over");
        }
        let (hi, lo) = word_to_bytes(jump);
        let instr = match fetch_result {
            Ok(Instruction::JumpIfFalse(_, _)) => Instruction::JumpIfFalse(hi, lo),
            Ok(Instruction::Jump(_, _)) => Instruction::Jump(hi, lo),
            _ => {
                self.error(ErrorKind::UnexpectedToken, "Bug: attempt to patch a non-jump instruction");
                return;
            }
        };
        self.frame_mut().patch_instruction(&instr, offset);
    }

    fn chunk_position(&self) -> usize {
        self.frame().chunk_position()
    }
}

/// Errors
impl Compiler {
    fn error_at_current(&mut self, kind: ErrorKind, message: &str) {
        let token = self.current.clone();
        self.errors.push(kind, &token, message);
    }

    fn error(&mut self, kind: ErrorKind, message: &str) {
        let token = self.previous.clone();
        self.errors.push(kind, &token, message);
    }
}

/// Shorthands
impl Compiler {
    fn frame(&self) -> &Frame {
        self.frame.as_ref().expect("Bug: frame can't be None")
    }

    fn frame_mut(&mut self) -> &mut Box<Frame> {
        self.frame.as_mut().expect("Bug: frame can't be None")
    }

    fn line(&self) -> usize {
        self.previous.position.line
    }
}
