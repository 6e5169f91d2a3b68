use crate::{
    builtins::{LibraryArgument, LibraryFunction},
    function::FunctionRecord,
    instruction::Instruction,
    program::GlobalEntry,
    val::ValueType,
};

use super::{
    compiler_context::{CompilerContext, ENTRY_FUNCTION},
    error::{CompileError, ErrorKind},
    operators::{Operator, OperatorStack},
    span::Span,
    tokenizer::{Token, TokenType},
};

impl CompilerContext<'_> {
    /// Compiles an expression into `dst` and returns the type of the value it
    /// leaves on the stack.
    ///
    /// Operands are emitted as they are read. Operators wait on an
    /// [`OperatorStack`] until an operator of lower or equal priority arrives.
    pub(super) fn compile_expression(
        &mut self,
        dst: &mut FunctionRecord,
        rank: u32,
    ) -> Result<ValueType, CompileError> {
        let mut operators = OperatorStack::new();
        let mut types = Vec::new();
        loop {
            while let Some(minus) = self.eat(TokenType::Minus)? {
                operators.push(Operator::Negate, minus.span);
            }
            types.push(self.compile_operand(dst, rank)?);
            let token = self.peek()?;
            let Some(op) = Operator::binary(token.token_type) else {
                break;
            };
            self.next()?;
            while let Some((top, span)) = operators.pop_for(op) {
                reduce(dst, &mut types, top, span)?;
            }
            operators.push(op, token.span);
        }
        while let Some((top, span)) = operators.pop() {
            reduce(dst, &mut types, top, span)?;
        }
        debug_assert_eq!(types.len(), 1);
        Ok(types.pop().unwrap_or(ValueType::Void))
    }

    /// Compiles a primary expression followed by any number of `as` casts.
    fn compile_operand(
        &mut self,
        dst: &mut FunctionRecord,
        rank: u32,
    ) -> Result<ValueType, CompileError> {
        let mut value_type = self.compile_primary(dst, rank)?;
        while let Some(as_token) = self.eat(TokenType::As)? {
            let (_, target) = self.expect_type()?;
            if value_type.is_void() || target.is_void() {
                return Err(CompileError::new(ErrorKind::TypeMismatch, as_token.span));
            }
            match (value_type, target) {
                (ValueType::Int, ValueType::Double) => dst.push(Instruction::IToF),
                (ValueType::Double, ValueType::Int) => dst.push(Instruction::FToI),
                _ => {}
            }
            value_type = target;
        }
        Ok(value_type)
    }

    fn compile_primary(
        &mut self,
        dst: &mut FunctionRecord,
        rank: u32,
    ) -> Result<ValueType, CompileError> {
        let token = self.next()?;
        match token.token_type {
            TokenType::Identifier => match self.peek()?.token_type {
                TokenType::Assign => self.compile_assignment(dst, rank, token),
                TokenType::OpenParen => self.compile_call(dst, rank, token),
                _ => {
                    let var = self.resolve(dst, rank, token)?;
                    Self::emit_address(dst, var.location);
                    dst.push(Instruction::Load64);
                    Ok(var.value_type)
                }
            },
            TokenType::UintLiteral(x) => {
                dst.push(Instruction::Push(x));
                Ok(ValueType::Int)
            }
            TokenType::DoubleLiteral(x) => {
                dst.push(Instruction::push_double(x));
                Ok(ValueType::Double)
            }
            TokenType::CharLiteral(ch) => {
                dst.push(Instruction::push_int(ch as i64));
                Ok(ValueType::Int)
            }
            TokenType::OpenParen => {
                self.enter(token.span)?;
                let value_type = self.compile_expression(dst, rank)?;
                self.expect(TokenType::CloseParen)?;
                self.leave();
                Ok(value_type)
            }
            _ => Err(CompileError::new(ErrorKind::UnexpectedToken, token.span)),
        }
    }

    /// Compiles `ident = expr`. The assignment itself has type `void`.
    fn compile_assignment(
        &mut self,
        dst: &mut FunctionRecord,
        rank: u32,
        ident: Token,
    ) -> Result<ValueType, CompileError> {
        let var = self.resolve(dst, rank, ident)?;
        if var.is_const {
            return Err(CompileError::new(ErrorKind::ChangeConst, ident.span));
        }
        let assign = self.expect(TokenType::Assign)?;
        Self::emit_address(dst, var.location);
        self.enter(assign.span)?;
        let value_type = self.compile_expression(dst, rank)?;
        self.leave();
        if value_type != var.value_type {
            return Err(CompileError::new(ErrorKind::TypeMismatch, assign.span));
        }
        dst.push(Instruction::Store64);
        if let Some(rank) = var.rank {
            self.symbols.mark_initialized(ident.text(self.source()), rank);
        }
        Ok(ValueType::Void)
    }

    fn compile_call(
        &mut self,
        dst: &mut FunctionRecord,
        rank: u32,
        ident: Token,
    ) -> Result<ValueType, CompileError> {
        let name = ident.text(self.source());
        if let Some(library_function) = LibraryFunction::with_name(name) {
            return self.compile_library_call(dst, rank, library_function);
        }
        // The function being compiled is not in the program yet.
        let callee = if dst.name == name && name != ENTRY_FUNCTION {
            Some(&*dst)
        } else {
            self.program.function(name)
        };
        let Some(callee) = callee else {
            return Err(CompileError::new(ErrorKind::NotDeclared, ident.span));
        };
        let address = callee.address;
        let return_type = callee.return_type;
        let param_types: Vec<ValueType> = callee.params.iter().map(|p| p.value_type).collect();

        dst.push(Instruction::StackAlloc(return_type.slots()));
        let args = self.compile_arguments(dst, rank)?;
        if args.len() != param_types.len() {
            return Err(CompileError::new(
                ErrorKind::FuncParamSizeMismatch,
                ident.span,
            ));
        }
        for ((arg_type, span), param_type) in args.into_iter().zip(param_types) {
            if arg_type != param_type {
                return Err(CompileError::new(ErrorKind::TypeMismatch, span));
            }
        }
        dst.push(Instruction::Call(address));
        Ok(return_type)
    }

    /// Compiles a parenthesized, comma separated argument list and returns the
    /// type and starting span of each argument.
    fn compile_arguments(
        &mut self,
        dst: &mut FunctionRecord,
        rank: u32,
    ) -> Result<Vec<(ValueType, Span)>, CompileError> {
        let open = self.expect(TokenType::OpenParen)?;
        self.enter(open.span)?;
        let mut args = Vec::new();
        if !self.check(TokenType::CloseParen)? {
            loop {
                let start = self.peek()?.span;
                args.push((self.compile_expression(dst, rank)?, start));
                if self.eat(TokenType::Comma)?.is_none() {
                    break;
                }
            }
        }
        self.expect(TokenType::CloseParen)?;
        self.leave();
        Ok(args)
    }

    fn compile_library_call(
        &mut self,
        dst: &mut FunctionRecord,
        rank: u32,
        library_function: LibraryFunction,
    ) -> Result<ValueType, CompileError> {
        let address = self
            .program
            .globals
            .register(GlobalEntry::Library(library_function));
        let return_type = library_function.return_type();
        dst.push(Instruction::StackAlloc(return_type.slots()));
        let open = self.expect(TokenType::OpenParen)?;
        match library_function.argument() {
            LibraryArgument::None => {}
            LibraryArgument::Value(expected) => {
                let start = self.peek()?;
                if start.token_type == TokenType::CloseParen {
                    return Err(CompileError::new(ErrorKind::TypeMismatch, start.span));
                }
                self.enter(open.span)?;
                let value_type = self.compile_expression(dst, rank)?;
                self.leave();
                if value_type != expected {
                    return Err(CompileError::new(ErrorKind::TypeMismatch, start.span));
                }
            }
            LibraryArgument::StringLiteral => {
                let token = self.next()?;
                if token.token_type != TokenType::StringLiteral {
                    return Err(CompileError::new(ErrorKind::TypeMismatch, token.span));
                }
                let value = token.string_value(self.source());
                let literal = self
                    .program
                    .globals
                    .register(GlobalEntry::StringLiteral(value));
                dst.push(Instruction::Push(literal as u64));
            }
        }
        self.expect(TokenType::CloseParen)?;
        dst.push(Instruction::CallName(address));
        Ok(return_type)
    }
}

/// Applies `op` to the topmost operand types and emits its instructions.
fn reduce(
    dst: &mut FunctionRecord,
    types: &mut Vec<ValueType>,
    op: Operator,
    span: Span,
) -> Result<(), CompileError> {
    let mismatch = || CompileError::new(ErrorKind::TypeMismatch, span);
    let operand = if op.is_unary() {
        types.pop().ok_or_else(mismatch)?
    } else {
        let rhs = types.pop().ok_or_else(mismatch)?;
        let lhs = types.pop().ok_or_else(mismatch)?;
        if lhs != rhs {
            return Err(mismatch());
        }
        lhs
    };
    let instructions = op.instructions(operand).ok_or_else(mismatch)?;
    dst.instructions.extend_from_slice(instructions);
    types.push(op.result_type(operand));
    Ok(())
}
