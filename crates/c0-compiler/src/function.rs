use compact_str::CompactString;

use crate::{
    compiler::{
        error::{CompileError, ErrorKind},
        span::Span,
    },
    instruction::Instruction,
    val::ValueType,
};

#[derive(Clone, Debug, PartialEq)]
/// A declared function parameter.
pub struct Parameter {
    pub name: CompactString,
    pub is_const: bool,
    pub value_type: ValueType,
}

#[derive(Clone, Debug, PartialEq)]
/// Represents a compiled function.
pub struct FunctionRecord {
    /// The name of the function.
    pub name: CompactString,
    /// The Global Directory address of the function.
    pub address: u32,
    /// The parameters, in declaration order.
    pub params: Vec<Parameter>,
    /// The declared return type.
    pub return_type: ValueType,
    /// The number of local slots. Slots are never reused, so this only grows.
    pub locals: u32,
    /// The instructions of the function.
    pub instructions: Vec<Instruction>,
    /// Set once a `return` statement has been checked against `return_type`.
    pub returned: bool,
}

impl FunctionRecord {
    pub fn new(name: impl Into<CompactString>, address: u32) -> FunctionRecord {
        FunctionRecord {
            name: name.into(),
            address,
            params: Vec::new(),
            return_type: ValueType::Void,
            locals: 0,
            instructions: Vec::new(),
            returned: false,
        }
    }

    /// The number of slots reserved for the return value; 0 or 1.
    pub fn return_slots(&self) -> u32 {
        self.return_type.slots()
    }

    /// Appends an instruction.
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// The position the next instruction will be emitted at.
    pub fn next_position(&self) -> usize {
        self.instructions.len()
    }

    /// Adds a parameter, failing if a parameter with the same name exists.
    pub fn add_param(&mut self, param: Parameter, span: Span) -> Result<(), CompileError> {
        if self.param(&param.name).is_some() {
            return Err(CompileError::new(ErrorKind::DuplicateDeclaration, span));
        }
        self.params.push(param);
        Ok(())
    }

    /// Returns the index and declaration of the parameter called `name`.
    pub fn param(&self, name: &str) -> Option<(u32, &Parameter)> {
        self.params
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == name)
            .map(|(idx, p)| (idx as u32, p))
    }

    /// The `arga` offset of the parameter at `idx`. The return slot, if any,
    /// sits in front of the parameters.
    pub fn param_offset(&self, idx: u32) -> u32 {
        idx + self.return_slots()
    }

    /// Reserves a new local slot and returns its offset.
    pub fn allocate_local(&mut self) -> u32 {
        let slot = self.locals;
        self.locals += 1;
        slot
    }

    /// Emits an unconditional branch whose target is patched later and returns
    /// its position.
    pub fn emit_placeholder_branch(&mut self) -> usize {
        let site = self.next_position();
        self.push(Instruction::Br(0));
        site
    }

    /// Points the branch at `site` to the instruction at `target`.
    pub fn patch_branch(&mut self, site: usize, target: usize) {
        let offset = (target as i64 - site as i64 - 1) as i32;
        let instruction = &mut self.instructions[site];
        debug_assert!(
            instruction.is_branch(),
            "patching non-branch instruction {instruction}"
        );
        if let Instruction::Br(x) | Instruction::BrTrue(x) | Instruction::BrFalse(x) = instruction {
            *x = offset;
        }
    }

    /// Returns `true` if every path through the instructions ends in `ret`.
    ///
    /// Conditional branches have two successors, the next instruction and the
    /// branch target. A path that runs past the last instruction fails.
    pub fn all_routes_return(&self) -> bool {
        let len = self.instructions.len() as i64;
        let mut visited = vec![false; self.instructions.len()];
        let mut pending = vec![0i64];
        while let Some(idx) = pending.pop() {
            if idx < 0 || idx >= len {
                return false;
            }
            if std::mem::replace(&mut visited[idx as usize], true) {
                continue;
            }
            match self.instructions[idx as usize] {
                Instruction::Ret => {}
                Instruction::Br(x) => pending.push(idx + 1 + x as i64),
                Instruction::BrTrue(x) | Instruction::BrFalse(x) => {
                    pending.push(idx + 1);
                    pending.push(idx + 1 + x as i64);
                }
                _ => pending.push(idx + 1),
            }
        }
        true
    }
}

impl std::fmt::Display for FunctionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "fn [{address}] {locals} {params} -> {returns} {{",
            address = self.address,
            locals = self.locals,
            params = self.params.len(),
            returns = self.return_slots(),
        )?;
        for instruction in self.instructions.iter() {
            writeln!(f, "    {instruction}")?;
        }
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(instructions: &[Instruction]) -> FunctionRecord {
        let mut f = FunctionRecord::new("f", 0);
        f.return_type = ValueType::Int;
        f.instructions = instructions.to_vec();
        f
    }

    #[test]
    fn duplicate_param_is_rejected() {
        let mut f = FunctionRecord::new("f", 0);
        let param = Parameter {
            name: "a".into(),
            is_const: false,
            value_type: ValueType::Int,
        };
        f.add_param(param.clone(), Span::default()).unwrap();
        assert_eq!(
            f.add_param(param, Span { start: 4, end: 5 }),
            Err(CompileError::new(
                ErrorKind::DuplicateDeclaration,
                Span { start: 4, end: 5 }
            ))
        );
    }

    #[test]
    fn param_offset_skips_return_slot() {
        let mut f = FunctionRecord::new("f", 0);
        assert_eq!(f.param_offset(0), 0);
        f.return_type = ValueType::Double;
        assert_eq!(f.param_offset(0), 1);
    }

    #[test]
    fn local_slots_are_never_reused() {
        let mut f = FunctionRecord::new("f", 0);
        assert_eq!(f.allocate_local(), 0);
        assert_eq!(f.allocate_local(), 1);
        assert_eq!(f.locals, 2);
    }

    #[test]
    fn patch_branch_uses_offset_from_next_instruction() {
        let mut f = FunctionRecord::new("f", 0);
        let site = f.emit_placeholder_branch();
        f.push(Instruction::Nop);
        f.push(Instruction::Nop);
        f.patch_branch(site, f.next_position());
        assert_eq!(f.instructions[site], Instruction::Br(2));

        let back = f.emit_placeholder_branch();
        f.patch_branch(back, 0);
        assert_eq!(f.instructions[back], Instruction::Br(-4));
    }

    #[test]
    fn straight_line_return_passes() {
        assert!(record_with(&[Instruction::ArgA(0), Instruction::Ret]).all_routes_return());
    }

    #[test]
    fn falling_off_the_end_fails() {
        assert!(!record_with(&[Instruction::Nop]).all_routes_return());
        assert!(!record_with(&[]).all_routes_return());
    }

    #[test]
    fn both_sides_of_a_condition_must_return() {
        // br_true 1; br 1; ret; ret
        let both = record_with(&[
            Instruction::BrTrue(1),
            Instruction::Br(1),
            Instruction::Ret,
            Instruction::Ret,
        ]);
        assert!(both.all_routes_return());

        // br_true 1; br 1; ret; nop
        let one = record_with(&[
            Instruction::BrTrue(1),
            Instruction::Br(1),
            Instruction::Ret,
            Instruction::Nop,
        ]);
        assert!(!one.all_routes_return());
    }

    #[test]
    fn loops_terminate_the_search() {
        // br 0; nop; br -2 never leaves the loop.
        let f = record_with(&[Instruction::Br(0), Instruction::Nop, Instruction::Br(-2)]);
        assert!(f.all_routes_return());
    }

    #[test]
    fn display_lists_header_and_instructions() {
        let mut f = record_with(&[Instruction::push_int(1), Instruction::Ret]);
        f.address = 3;
        f.locals = 2;
        assert_eq!(
            f.to_string(),
            "fn [3] 2 0 -> 1 {\n    push 1\n    ret\n}\n"
        );
    }
}
