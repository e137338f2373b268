use zylisp_core::{Op, Sexp};

/// Builder for instruction sequences.
pub struct Emitter {
    code: Vec<Op>,
}

impl Emitter {
    pub fn new() -> Self {
        Emitter { code: Vec::new() }
    }

    pub fn emit(&mut self, op: Op) {
        self.code.push(op);
    }

    pub fn emit_const(&mut self, val: Sexp) {
        self.code.push(Op::Push(val));
    }

    /// Index of the next instruction.
    pub fn current_pc(&self) -> usize {
        self.code.len()
    }

    /// Emit a jump-family instruction with a zero offset.
    /// Returns its position for later backpatching.
    pub fn emit_jump(&mut self, make: fn(isize) -> Op) -> usize {
        let at = self.current_pc();
        self.code.push(make(0));
        at
    }

    /// Backpatch the jump at `at` to land on the current PC. Offsets are
    /// relative to the instruction after the jump.
    pub fn patch_jump(&mut self, at: usize) {
        let offset = self.current_pc() as isize - (at as isize + 1);
        self.code[at] = match self.code[at] {
            Op::Jump(_) => Op::Jump(offset),
            Op::BranchIfFalse(_) => Op::BranchIfFalse(offset),
            Op::BranchIfTrue(_) => Op::BranchIfTrue(offset),
            ref other => panic!("patch_jump on non-jump instruction {}", other.mnemonic()),
        };
    }

    pub fn into_code(self) -> Vec<Op> {
        self.code
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_const() {
        let mut e = Emitter::new();
        e.emit_const(Sexp::Int(42));
        e.emit(Op::Return);
        let code = e.into_code();
        assert!(matches!(code[0], Op::Push(Sexp::Int(42))));
        assert!(matches!(code[1], Op::Return));
    }

    #[test]
    fn test_emit_jump_and_patch() {
        let mut e = Emitter::new();
        e.emit_const(Sexp::Null); // 0
        let patch = e.emit_jump(Op::BranchIfFalse); // 1
        e.emit_const(Sexp::Bool(true)); // 2
        e.emit(Op::Return); // 3
        e.patch_jump(patch); // target 4, offset 4 - 2 = 2
        e.emit_const(Sexp::Bool(false)); // 4
        let code = e.into_code();
        assert!(matches!(code[1], Op::BranchIfFalse(2)));
    }

    #[test]
    fn test_current_pc() {
        let mut e = Emitter::new();
        assert_eq!(e.current_pc(), 0);
        e.emit(Op::Pop);
        e.emit(Op::Dup);
        assert_eq!(e.current_pc(), 2);
    }

    #[test]
    #[should_panic(expected = "patch_jump on non-jump")]
    fn patching_a_non_jump_panics() {
        let mut e = Emitter::new();
        e.emit(Op::Pop);
        e.patch_jump(0);
    }
}
