use crate::{
    builtins::LibraryFunction,
    function::{FunctionRecord, Parameter},
    instruction::Instruction,
    program::{GlobalEntry, Program},
    val::ValueType,
};

use super::{
    CompileOptions,
    error::{CompileError, ErrorKind},
    span::Span,
    symbols::SymbolTable,
    tokenizer::{Token, TokenType, Tokenizer},
};

/// The name of the synthesized function that runs global initializers and
/// calls `main`.
pub const ENTRY_FUNCTION: &str = "_start";

/// Compiles one program in a single pass over its tokens.
///
/// The function being compiled is not owned by the context. It is passed to
/// each `compile_*` method as `dst` and instructions are appended to it.
pub struct CompilerContext<'a> {
    pub(super) tokenizer: Tokenizer<'a>,
    pub(super) program: Program,
    pub(super) symbols: SymbolTable,
    options: CompileOptions,
    /// The current block, condition and sub-expression nesting.
    depth: u32,
    /// Pending `break` and `continue` sites, one entry per enclosing loop.
    pub(super) loops: Vec<LoopSites>,
}

#[derive(Debug, Default)]
pub(super) struct LoopSites {
    pub breaks: Vec<usize>,
    pub continues: Vec<usize>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(super) enum VariableLocation {
    /// A slot in the current frame, addressed with `loca`.
    Local(u32),
    /// A parameter offset, addressed with `arga`.
    Argument(u32),
    /// A global slot, addressed with `globa`.
    Global(u32),
}

#[derive(Copy, Clone, Debug)]
pub(super) struct ResolvedVariable {
    pub location: VariableLocation,
    pub value_type: ValueType,
    pub is_const: bool,
    /// The rank of the symbol table entry. `None` for parameters.
    pub rank: Option<u32>,
}

impl<'a> CompilerContext<'a> {
    pub fn new(source: &'a str, options: CompileOptions) -> CompilerContext<'a> {
        CompilerContext {
            tokenizer: Tokenizer::new(source),
            program: Program::default(),
            symbols: SymbolTable::default(),
            options,
            depth: 0,
            loops: Vec::new(),
        }
    }

    pub(super) fn source(&self) -> &'a str {
        self.tokenizer.source()
    }

    pub(super) fn peek(&mut self) -> Result<Token, CompileError> {
        self.tokenizer.peek()
    }

    pub(super) fn next(&mut self) -> Result<Token, CompileError> {
        self.tokenizer.next_token()
    }

    /// Returns `true` if the next token is of type `token_type`.
    pub(super) fn check(&mut self, token_type: TokenType) -> Result<bool, CompileError> {
        Ok(self.peek()?.token_type == token_type)
    }

    /// Consumes the next token if it is of type `token_type`.
    pub(super) fn eat(&mut self, token_type: TokenType) -> Result<Option<Token>, CompileError> {
        if self.check(token_type)? {
            self.next().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Consumes the next token, failing if it is not of type `token_type`.
    pub(super) fn expect(&mut self, token_type: TokenType) -> Result<Token, CompileError> {
        let token = self.next()?;
        if token.token_type == token_type {
            Ok(token)
        } else {
            Err(CompileError::new(ErrorKind::UnexpectedToken, token.span))
        }
    }

    /// Consumes a type name.
    pub(super) fn expect_type(&mut self) -> Result<(Token, ValueType), CompileError> {
        let token = self.next()?;
        match token.token_type {
            TokenType::Ty(value_type) => Ok((token, value_type)),
            _ => Err(CompileError::new(ErrorKind::UnexpectedToken, token.span)),
        }
    }

    /// Consumes a type name that may not be `void`.
    pub(super) fn expect_value_type(&mut self) -> Result<ValueType, CompileError> {
        let (token, value_type) = self.expect_type()?;
        if value_type.is_void() {
            return Err(CompileError::new(ErrorKind::TypeMismatch, token.span));
        }
        Ok(value_type)
    }

    /// Goes one nesting level deeper. Must be paired with [`Self::leave`].
    pub(super) fn enter(&mut self, span: Span) -> Result<(), CompileError> {
        if self.depth >= self.options.max_nesting_depth {
            return Err(CompileError::new(ErrorKind::NestingTooDeep, span));
        }
        self.depth += 1;
        Ok(())
    }

    pub(super) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Compiles the whole input and returns the program.
    pub fn compile_program(mut self) -> Result<Program, CompileError> {
        let mut entry = FunctionRecord::new(ENTRY_FUNCTION, 0);
        loop {
            let token = self.peek()?;
            match token.token_type {
                TokenType::Fn => self.compile_function()?,
                TokenType::Let | TokenType::Const => self.compile_declaration(&mut entry, 0)?,
                TokenType::Eof => break,
                _ => return Err(CompileError::new(ErrorKind::UnexpectedToken, token.span)),
            }
        }
        let eof = self.expect(TokenType::Eof)?;
        let main = self
            .program
            .function("main")
            .ok_or_else(|| CompileError::new(ErrorKind::NotDeclared, eof.span))?;
        entry.push(Instruction::StackAlloc(main.return_slots()));
        entry.push(Instruction::Call(main.address));
        entry.address = self
            .program
            .globals
            .register(GlobalEntry::Function(ENTRY_FUNCTION.into()));
        log::debug!(
            "synthesized {ENTRY_FUNCTION} [{address}] with {count} instructions",
            address = entry.address,
            count = entry.instructions.len(),
        );
        self.program.functions.push(entry);
        Ok(self.program)
    }

    fn compile_function(&mut self) -> Result<(), CompileError> {
        self.expect(TokenType::Fn)?;
        let ident = self.expect(TokenType::Identifier)?;
        let name = ident.text(self.source());
        if name == ENTRY_FUNCTION
            || LibraryFunction::with_name(name).is_some()
            || self.program.globals.contains_name(name)
        {
            return Err(CompileError::new(
                ErrorKind::DuplicateDeclaration,
                ident.span,
            ));
        }
        let address = self
            .program
            .globals
            .register(GlobalEntry::Function(name.into()));
        let mut function = FunctionRecord::new(name, address);

        self.expect(TokenType::OpenParen)?;
        if !self.check(TokenType::CloseParen)? {
            loop {
                let is_const = self.eat(TokenType::Const)?.is_some();
                let param = self.expect(TokenType::Identifier)?;
                self.expect(TokenType::Colon)?;
                let value_type = self.expect_value_type()?;
                function.add_param(
                    Parameter {
                        name: param.text(self.source()).into(),
                        is_const,
                        value_type,
                    },
                    param.span,
                )?;
                if self.eat(TokenType::Comma)?.is_none() {
                    break;
                }
            }
        }
        self.expect(TokenType::CloseParen)?;
        self.expect(TokenType::Arrow)?;
        let (_, return_type) = self.expect_type()?;
        function.return_type = return_type;

        let close = self.compile_block(&mut function, 1)?;
        if !function.returned || !function.all_routes_return() {
            if !function.return_type.is_void() {
                return Err(CompileError::new(
                    ErrorKind::NotAllRoutesReturn,
                    close.span,
                ));
            }
            function.push(Instruction::Ret);
        }
        log::debug!(
            "compiled fn {name} [{address}]: {locals} locals, {params} params, {count} instructions",
            locals = function.locals,
            params = function.params.len(),
            count = function.instructions.len(),
        );
        self.program.functions.push(function);
        Ok(())
    }

    /// Resolves `ident` by searching block locals, then the parameters of
    /// `dst`, then globals.
    pub(super) fn resolve(
        &self,
        dst: &FunctionRecord,
        rank: u32,
        ident: Token,
    ) -> Result<ResolvedVariable, CompileError> {
        let name = ident.text(self.source());
        if let Some(entry) = self.symbols.lookup_local(name, rank) {
            return Ok(ResolvedVariable {
                location: VariableLocation::Local(entry.slot),
                value_type: entry.value_type,
                is_const: entry.is_const,
                rank: Some(entry.rank),
            });
        }
        if let Some((idx, param)) = dst.param(name) {
            return Ok(ResolvedVariable {
                location: VariableLocation::Argument(dst.param_offset(idx)),
                value_type: param.value_type,
                is_const: param.is_const,
                rank: None,
            });
        }
        if let Some(entry) = self.symbols.lookup_global(name) {
            return Ok(ResolvedVariable {
                location: VariableLocation::Global(entry.slot),
                value_type: entry.value_type,
                is_const: entry.is_const,
                rank: Some(0),
            });
        }
        Err(CompileError::new(ErrorKind::NotDeclared, ident.span))
    }

    pub(super) fn emit_address(dst: &mut FunctionRecord, location: VariableLocation) {
        dst.push(match location {
            VariableLocation::Local(slot) => Instruction::LocA(slot),
            VariableLocation::Argument(offset) => Instruction::ArgA(offset),
            VariableLocation::Global(slot) => Instruction::GlobA(slot),
        });
    }
}
