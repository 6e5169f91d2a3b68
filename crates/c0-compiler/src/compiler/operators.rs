use crate::{instruction::Instruction, val::ValueType};

use super::{span::Span, tokenizer::TokenType};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// An operator waiting on the operator stack.
pub enum Operator {
    /// Bottom of the stack. Never reduced.
    Sentinel,
    Negate,
    Mul,
    Div,
    Add,
    Sub,
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Operator {
    /// Returns the binary operator for a token type.
    pub fn binary(token_type: TokenType) -> Option<Operator> {
        let op = match token_type {
            TokenType::Mul => Operator::Mul,
            TokenType::Div => Operator::Div,
            TokenType::Plus => Operator::Add,
            TokenType::Minus => Operator::Sub,
            TokenType::Eq => Operator::Eq,
            TokenType::Neq => Operator::Neq,
            TokenType::Lt => Operator::Lt,
            TokenType::Gt => Operator::Gt,
            TokenType::Le => Operator::Le,
            TokenType::Ge => Operator::Ge,
            _ => return None,
        };
        Some(op)
    }

    /// Higher binds tighter.
    pub fn priority(self) -> u8 {
        match self {
            Operator::Sentinel => 0,
            Operator::Eq
            | Operator::Neq
            | Operator::Lt
            | Operator::Gt
            | Operator::Le
            | Operator::Ge => 1,
            Operator::Add | Operator::Sub => 2,
            Operator::Mul | Operator::Div => 3,
            Operator::Negate => 4,
        }
    }

    pub fn is_unary(self) -> bool {
        self == Operator::Negate
    }

    pub fn is_comparison(self) -> bool {
        self.priority() == 1
    }

    /// The type produced by applying the operator to operands of `operand`.
    pub fn result_type(self, operand: ValueType) -> ValueType {
        if self.is_comparison() {
            ValueType::Int
        } else {
            operand
        }
    }

    /// The instructions implementing the operator on operands of type
    /// `operand`, or `None` if the operator does not apply to that type.
    ///
    /// Comparisons build on `cmp`, which leaves -1, 0 or 1.
    pub fn instructions(self, operand: ValueType) -> Option<&'static [Instruction]> {
        use Instruction::*;
        let int = match operand {
            ValueType::Int => true,
            ValueType::Double => false,
            ValueType::Void => return None,
        };
        let instructions: &'static [Instruction] = match (self, int) {
            (Operator::Sentinel, _) => return None,
            (Operator::Negate, true) => &[NegI],
            (Operator::Negate, false) => &[NegF],
            (Operator::Mul, true) => &[MulI],
            (Operator::Mul, false) => &[MulF],
            (Operator::Div, true) => &[DivI],
            (Operator::Div, false) => &[DivF],
            (Operator::Add, true) => &[AddI],
            (Operator::Add, false) => &[AddF],
            (Operator::Sub, true) => &[SubI],
            (Operator::Sub, false) => &[SubF],
            (Operator::Eq, true) => &[CmpI, Not],
            (Operator::Eq, false) => &[CmpF, Not],
            (Operator::Neq, true) => &[CmpI],
            (Operator::Neq, false) => &[CmpF],
            (Operator::Lt, true) => &[CmpI, SetLt],
            (Operator::Lt, false) => &[CmpF, SetLt],
            (Operator::Gt, true) => &[CmpI, SetGt],
            (Operator::Gt, false) => &[CmpF, SetGt],
            (Operator::Le, true) => &[CmpI, SetGt, Not],
            (Operator::Le, false) => &[CmpF, SetGt, Not],
            (Operator::Ge, true) => &[CmpI, SetLt, Not],
            (Operator::Ge, false) => &[CmpF, SetLt, Not],
        };
        Some(instructions)
    }
}

/// Pending operators of one expression, bottomed by a sentinel.
#[derive(Debug)]
pub struct OperatorStack {
    operators: Vec<(Operator, Span)>,
}

impl Default for OperatorStack {
    fn default() -> Self {
        OperatorStack::new()
    }
}

impl OperatorStack {
    pub fn new() -> OperatorStack {
        OperatorStack {
            operators: vec![(Operator::Sentinel, Span::default())],
        }
    }

    pub fn push(&mut self, op: Operator, span: Span) {
        self.operators.push((op, span));
    }

    /// Returns the topmost operator if it must be applied before `incoming`
    /// is pushed. The sentinel is never returned.
    pub fn pop_for(&mut self, incoming: Operator) -> Option<(Operator, Span)> {
        let (top, _) = *self.operators.last()?;
        if top == Operator::Sentinel || top.priority() < incoming.priority() {
            return None;
        }
        self.operators.pop()
    }

    /// Pops the topmost operator, stopping at the sentinel.
    pub fn pop(&mut self) -> Option<(Operator, Span)> {
        match self.operators.last() {
            Some((Operator::Sentinel, _)) | None => None,
            Some(_) => self.operators.pop(),
        }
    }

    /// Returns `true` if only the sentinel is left.
    pub fn is_empty(&self) -> bool {
        self.operators.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_follow_precedence_table() {
        assert!(Operator::Negate.priority() > Operator::Mul.priority());
        assert!(Operator::Mul.priority() > Operator::Add.priority());
        assert!(Operator::Add.priority() > Operator::Lt.priority());
        assert!(Operator::Lt.priority() > Operator::Sentinel.priority());
        assert_eq!(Operator::Div.priority(), Operator::Mul.priority());
        assert_eq!(Operator::Ge.priority(), Operator::Eq.priority());
    }

    #[test]
    fn equal_priority_pops_for_left_associativity() {
        let mut stack = OperatorStack::new();
        stack.push(Operator::Sub, Span::default());
        assert_eq!(
            stack.pop_for(Operator::Add).map(|(op, _)| op),
            Some(Operator::Sub)
        );
        assert!(stack.is_empty());
    }

    #[test]
    fn lower_priority_on_top_stays() {
        let mut stack = OperatorStack::new();
        stack.push(Operator::Add, Span::default());
        assert_eq!(stack.pop_for(Operator::Mul), None);
        assert!(!stack.is_empty());
    }

    #[test]
    fn sentinel_is_never_popped() {
        let mut stack = OperatorStack::new();
        assert_eq!(stack.pop_for(Operator::Eq), None);
        assert_eq!(stack.pop(), None);
        assert!(stack.is_empty());
    }

    #[test]
    fn comparisons_emit_cmp_then_set_and_not() {
        assert_eq!(
            Operator::Eq.instructions(ValueType::Int),
            Some(&[Instruction::CmpI, Instruction::Not][..])
        );
        assert_eq!(
            Operator::Neq.instructions(ValueType::Double),
            Some(&[Instruction::CmpF][..])
        );
        assert_eq!(
            Operator::Le.instructions(ValueType::Int),
            Some(&[Instruction::CmpI, Instruction::SetGt, Instruction::Not][..])
        );
        assert_eq!(
            Operator::Ge.instructions(ValueType::Double),
            Some(&[Instruction::CmpF, Instruction::SetLt, Instruction::Not][..])
        );
        assert_eq!(Operator::Lt.result_type(ValueType::Double), ValueType::Int);
    }

    #[test]
    fn void_operands_have_no_instructions() {
        assert_eq!(Operator::Add.instructions(ValueType::Void), None);
        assert_eq!(Operator::Negate.instructions(ValueType::Void), None);
    }
}
