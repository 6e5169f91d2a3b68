use crate::{
    function::FunctionRecord,
    instruction::Instruction,
    program::{GlobalEntry, GlobalVariable},
    val::ValueType,
};

use super::{
    compiler_context::{CompilerContext, ENTRY_FUNCTION, LoopSites, VariableLocation},
    error::{CompileError, ErrorKind},
    symbols::SymbolEntry,
    tokenizer::{Token, TokenType},
};

impl CompilerContext<'_> {
    /// Compiles `{ statement* }` at `rank` and returns the closing brace.
    ///
    /// Every symbol declared at `rank` is dropped when the block ends.
    pub(super) fn compile_block(
        &mut self,
        dst: &mut FunctionRecord,
        rank: u32,
    ) -> Result<Token, CompileError> {
        let open = self.expect(TokenType::OpenBrace)?;
        self.enter(open.span)?;
        while !self.check(TokenType::CloseBrace)? {
            self.compile_statement(dst, rank)?;
        }
        let close = self.expect(TokenType::CloseBrace)?;
        self.symbols.drop_rank(rank);
        self.leave();
        Ok(close)
    }

    fn compile_statement(&mut self, dst: &mut FunctionRecord, rank: u32) -> Result<(), CompileError> {
        let token = self.peek()?;
        match token.token_type {
            TokenType::Let | TokenType::Const => self.compile_declaration(dst, rank),
            TokenType::If => self.compile_if(dst, rank),
            TokenType::While => self.compile_while(dst, rank),
            TokenType::Return => self.compile_return(dst, rank),
            TokenType::Break | TokenType::Continue => self.compile_loop_jump(dst),
            TokenType::OpenBrace => self.compile_block(dst, rank + 1).map(|_| ()),
            TokenType::Semicolon => self.next().map(|_| ()),
            _ => {
                let value_type = self.compile_expression(dst, rank)?;
                if !value_type.is_void() {
                    dst.push(Instruction::PopN(1));
                }
                self.expect(TokenType::Semicolon)?;
                Ok(())
            }
        }
    }

    /// Compiles a `let` or `const` declaration. Rank 0 declares a global whose
    /// initializer, if any, is emitted into `dst`.
    pub(super) fn compile_declaration(
        &mut self,
        dst: &mut FunctionRecord,
        rank: u32,
    ) -> Result<(), CompileError> {
        let keyword = self.next()?;
        let is_const = match keyword.token_type {
            TokenType::Let => false,
            TokenType::Const => true,
            _ => return Err(CompileError::new(ErrorKind::UnexpectedToken, keyword.span)),
        };
        let ident = self.expect(TokenType::Identifier)?;
        let name = ident.text(self.source());
        let collides = if rank == 0 {
            name == ENTRY_FUNCTION || self.program.globals.contains_name(name)
        } else {
            dst.param(name).is_some()
        };
        if collides {
            return Err(CompileError::new(
                ErrorKind::DuplicateDeclaration,
                ident.span,
            ));
        }
        self.expect(TokenType::Colon)?;
        let value_type = self.expect_value_type()?;
        let (slot, location) = if rank == 0 {
            let slot = self.symbols.global_count();
            (slot, VariableLocation::Global(slot))
        } else {
            let slot = dst.allocate_local();
            (slot, VariableLocation::Local(slot))
        };
        self.symbols.declare(
            SymbolEntry {
                name: name.into(),
                value_type,
                is_const,
                is_initialized: false,
                slot,
                rank,
            },
            ident.span,
        )?;
        if rank == 0 {
            self.program.globals.register(GlobalEntry::Variable(name.into()));
            self.program.global_variables.push(GlobalVariable {
                name: name.into(),
                is_const,
            });
        }

        let assign = if is_const {
            Some(self.expect(TokenType::Assign)?)
        } else {
            self.eat(TokenType::Assign)?
        };
        if let Some(assign) = assign {
            Self::emit_address(dst, location);
            let init_type = self.compile_expression(dst, rank)?;
            if init_type != value_type {
                return Err(CompileError::new(ErrorKind::TypeMismatch, assign.span));
            }
            dst.push(Instruction::Store64);
            self.symbols.mark_initialized(name, rank);
        }
        self.expect(TokenType::Semicolon)?;
        Ok(())
    }

    /// Compiles `if cond { ... } [else if ... | else { ... }]`.
    ///
    /// Emits `cond; br_true 1; br <skip true>; <true>; br <skip else>; <else>`.
    fn compile_if(&mut self, dst: &mut FunctionRecord, rank: u32) -> Result<(), CompileError> {
        let if_token = self.expect(TokenType::If)?;
        self.enter(if_token.span)?;
        let condition = self.compile_expression(dst, rank)?;
        if condition.is_void() {
            return Err(CompileError::new(ErrorKind::TypeMismatch, if_token.span));
        }
        dst.push(Instruction::BrTrue(1));
        let skip_true = dst.emit_placeholder_branch();
        self.compile_block(dst, rank + 1)?;
        let skip_else = dst.emit_placeholder_branch();
        dst.patch_branch(skip_true, dst.next_position());
        if self.eat(TokenType::Else)?.is_some() {
            if self.check(TokenType::If)? {
                self.compile_if(dst, rank)?;
            } else {
                self.compile_block(dst, rank + 1)?;
            }
        }
        dst.patch_branch(skip_else, dst.next_position());
        self.leave();
        Ok(())
    }

    /// Compiles `while cond { ... }`.
    ///
    /// Emits `br 0; cond; br_true 1; br <exit>; <body>; br <cond>`. `break`
    /// lands after the back edge and `continue` on the condition.
    fn compile_while(&mut self, dst: &mut FunctionRecord, rank: u32) -> Result<(), CompileError> {
        let while_token = self.expect(TokenType::While)?;
        self.enter(while_token.span)?;
        let start = dst.emit_placeholder_branch();
        let recheck = dst.next_position();
        dst.patch_branch(start, recheck);
        let condition = self.compile_expression(dst, rank)?;
        if condition.is_void() {
            return Err(CompileError::new(ErrorKind::TypeMismatch, while_token.span));
        }
        dst.push(Instruction::BrTrue(1));
        let exit = dst.emit_placeholder_branch();

        self.loops.push(LoopSites::default());
        let body = self.compile_block(dst, rank + 1);
        let sites = self.loops.pop().unwrap_or_default();
        body?;

        let back_edge = dst.emit_placeholder_branch();
        dst.patch_branch(back_edge, recheck);
        let after = dst.next_position();
        dst.patch_branch(exit, after);
        for site in sites.breaks {
            dst.patch_branch(site, after);
        }
        for site in sites.continues {
            dst.patch_branch(site, recheck);
        }
        self.leave();
        Ok(())
    }

    /// Compiles `break;` or `continue;` as a branch patched by the enclosing
    /// loop.
    fn compile_loop_jump(&mut self, dst: &mut FunctionRecord) -> Result<(), CompileError> {
        let token = self.next()?;
        let Some(sites) = self.loops.last_mut() else {
            return Err(CompileError::new(ErrorKind::InvalidIdentifier, token.span));
        };
        let site = dst.emit_placeholder_branch();
        match token.token_type {
            TokenType::Break => sites.breaks.push(site),
            _ => sites.continues.push(site),
        }
        self.expect(TokenType::Semicolon)?;
        Ok(())
    }

    /// Compiles `return [expr];`.
    fn compile_return(&mut self, dst: &mut FunctionRecord, rank: u32) -> Result<(), CompileError> {
        let return_token = self.expect(TokenType::Return)?;
        dst.push(Instruction::ArgA(0));
        let value_type = if self.check(TokenType::Semicolon)? {
            ValueType::Void
        } else {
            let value_type = self.compile_expression(dst, rank)?;
            if value_type.is_void() {
                return Err(CompileError::new(ErrorKind::TypeMismatch, return_token.span));
            }
            dst.push(Instruction::Store64);
            value_type
        };
        if value_type != dst.return_type {
            return Err(CompileError::new(ErrorKind::TypeMismatch, return_token.span));
        }
        dst.returned = true;
        dst.push(Instruction::Ret);
        self.expect(TokenType::Semicolon)?;
        Ok(())
    }
}
