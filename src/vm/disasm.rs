use crate::func::Func;
use crate::instruction::Instruction;

/// Text dump of a function's chunk, one line per instruction. Used by the
/// `dump_disassembly` config flag and by a couple of compiler tests that
/// assert on human-readable opcode traces in addition to structural ones.
pub fn disassemble(func: &Func, name: &str) -> String {
    let chunk = func.chunk();
    let mut offset = 0;
    let mut lines = Vec::new();
    lines.push(format!("== {name} =="));
    while offset < chunk.size() {
        let start = offset;
        match chunk.fetch(&mut offset) {
            Ok(instr) => {
                let line = chunk.line_number(start).unwrap_or(0);
                lines.push(format!("{start:04} {line:4} {}", describe(&instr, chunk)));
            }
            Err(_) => break,
        }
    }
    lines.join("\n")
}

fn describe(instr: &Instruction, chunk: &crate::chunk::Chunk) -> String {
    match instr {
        Instruction::Constant(k) => {
            let value = chunk.read_const(*k).map(|v| v.to_string()).unwrap_or_default();
            format!("OP_CONSTANT {k} ({value})")
        }
        Instruction::Nil => "OP_NIL".to_string(),
        Instruction::True => "OP_TRUE".to_string(),
        Instruction::False => "OP_FALSE".to_string(),
        Instruction::Pop => "OP_POP".to_string(),
        Instruction::GetLocal(slot) => format!("OP_GET_LOCAL {slot}"),
        Instruction::SetLocal(slot) => format!("OP_SET_LOCAL {slot}"),
        Instruction::GetGlobal(k) => format!("OP_GET_GLOBAL {k}"),
        Instruction::SetGlobal(k) => format!("OP_SET_GLOBAL {k}"),
        Instruction::DefineGlobal(k) => format!("OP_DEFINE_GLOBAL {k}"),
        Instruction::Equal => "OP_EQUAL".to_string(),
        Instruction::Greater => "OP_GREATER".to_string(),
        Instruction::Less => "OP_LESS".to_string(),
        Instruction::Add => "OP_ADD".to_string(),
        Instruction::Subtract => "OP_SUBTRACT".to_string(),
        Instruction::Multiply => "OP_MULTIPLY".to_string(),
        Instruction::Divide => "OP_DIVIDE".to_string(),
        Instruction::Modulo => "OP_MODULO".to_string(),
        Instruction::Power => "OP_POWER".to_string(),
        Instruction::Not => "OP_NOT".to_string(),
        Instruction::Negate => "OP_NEGATE".to_string(),
        Instruction::Info => "OP_INFO".to_string(),
        Instruction::Jump(hi, lo) => format!("OP_JUMP -> {}", crate::utils::bytes_to_word(*hi, *lo)),
        Instruction::JumpIfFalse(hi, lo) => {
            format!("OP_JUMP_IF_FALSE -> {}", crate::utils::bytes_to_word(*hi, *lo))
        }
        Instruction::Loop(hi, lo) => format!("OP_LOOP -> {}", crate::utils::bytes_to_word(*hi, *lo)),
        Instruction::Call(argc) => format!("OP_CALL {argc}"),
        Instruction::Return => "OP_RETURN".to_string(),
        Instruction::Import => "OP_IMPORT".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::func::Func;
    use crate::value::Value;

    #[test]
    fn disassembly_lists_one_line_per_instruction() {
        let mut func = Func::new(Some("demo".to_string()));
        let idx = func.chunk_mut().add_constant(Value::number(1.0)) as u8;
        func.chunk_mut().write_u8(crate::instruction::OPCODE_CONSTANT, 1);
        func.chunk_mut().write_u8(idx, 1);
        func.chunk_mut().write_u8(crate::instruction::OPCODE_RETURN, 1);

        let output = disassemble(&func, "demo");
        assert!(output.starts_with("== demo =="));
        assert_eq!(output.lines().count(), 3);
        assert!(output.contains("OP_CONSTANT"));
        assert!(output.contains("OP_RETURN"));
    }
}
