use compact_str::CompactString;

use crate::val::ValueType;

use super::{
    error::{CompileError, ErrorKind},
    span::Span,
};

#[derive(Clone, Debug, PartialEq)]
/// A declared variable or constant.
pub struct SymbolEntry {
    pub name: CompactString,
    pub value_type: ValueType,
    pub is_const: bool,
    pub is_initialized: bool,
    /// The storage slot. A global index at rank 0, a local frame slot otherwise.
    pub slot: u32,
    /// The scope nesting depth. 0 is global, 1 is a function body.
    pub rank: u32,
}

#[derive(Debug, Default)]
/// Declared variables in declaration order.
///
/// Names are unique within a rank. An entry may shadow one of a lower rank.
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
}

impl SymbolTable {
    /// Adds `entry`, failing if its name is already declared at its rank.
    pub fn declare(&mut self, entry: SymbolEntry, span: Span) -> Result<(), CompileError> {
        if self.is_declared_at(&entry.name, entry.rank) {
            return Err(CompileError::new(ErrorKind::DuplicateDeclaration, span));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Returns `true` if `name` is declared at exactly `rank`.
    pub fn is_declared_at(&self, name: &str, rank: u32) -> bool {
        self.entries.iter().any(|e| e.rank == rank && e.name == name)
    }

    /// The number of rank 0 entries, which is also the next global slot.
    pub fn global_count(&self) -> u32 {
        self.entries.iter().filter(|e| e.rank == 0).count() as u32
    }

    /// Finds the innermost visible non-global entry called `name`.
    pub fn lookup_local(&self, name: &str, rank: u32) -> Option<&SymbolEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.rank != 0 && e.rank <= rank && e.name == name)
    }

    /// Finds the global entry called `name`.
    pub fn lookup_global(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.rank == 0 && e.name == name)
    }

    /// Marks the entry called `name` at exactly `rank` as assigned.
    pub fn mark_initialized(&mut self, name: &str, rank: u32) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.rank == rank && e.name == name)
        {
            entry.is_initialized = true;
        }
    }

    /// Removes every entry declared at `rank`.
    pub fn drop_rank(&mut self, rank: u32) {
        self.entries.retain(|e| e.rank != rank);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
