use std::collections::HashMap;

use compact_str::CompactString;

use crate::{builtins::LibraryFunction, function::FunctionRecord};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// Something that owns an address in the Global Directory.
pub enum GlobalEntry {
    /// A user function, including the synthesized entry function.
    Function(CompactString),
    /// A global variable or constant.
    Variable(CompactString),
    /// A library function called by name.
    Library(LibraryFunction),
    /// A string literal constant.
    StringLiteral(CompactString),
}

#[derive(Clone, Debug, Default, PartialEq)]
/// Append-only registry assigning every global entry a stable address.
pub struct GlobalDirectory {
    entries: Vec<GlobalEntry>,
    addresses: HashMap<GlobalEntry, u32>,
}

impl GlobalDirectory {
    /// Registers `entry` and returns its address. Registering an entry that is
    /// already present returns the existing address.
    pub fn register(&mut self, entry: GlobalEntry) -> u32 {
        if let Some(address) = self.addresses.get(&entry) {
            return *address;
        }
        let address = self.entries.len() as u32;
        log::trace!("registered global [{address}] {entry:?}");
        self.entries.push(entry.clone());
        self.addresses.insert(entry, address);
        address
    }

    /// Returns the address of `entry` or `None` if it is not registered.
    pub fn address(&self, entry: &GlobalEntry) -> Option<u32> {
        self.addresses.get(entry).copied()
    }

    /// Returns `true` if a user function or global variable is called `name`.
    pub fn contains_name(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| match entry {
            GlobalEntry::Function(n) | GlobalEntry::Variable(n) => n == name,
            GlobalEntry::Library(_) | GlobalEntry::StringLiteral(_) => false,
        })
    }

    /// Iterates over all entries in address order.
    pub fn iter(&self) -> impl '_ + Iterator<Item = &GlobalEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A global variable in declaration order. The index in
/// [`Program::global_variables`] is the operand of its `globa` instruction.
pub struct GlobalVariable {
    pub name: CompactString,
    pub is_const: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
/// The output of one compilation run.
pub struct Program {
    /// Addresses of functions, globals, library imports and string literals.
    pub globals: GlobalDirectory,
    /// Global variables and constants, in declaration order.
    pub global_variables: Vec<GlobalVariable>,
    /// Compiled functions, in compilation order. The entry function is last.
    pub functions: Vec<FunctionRecord>,
}

impl Program {
    /// Returns the compiled function called `name`.
    pub fn function(&self, name: &str) -> Option<&FunctionRecord> {
        self.functions.iter().find(|f| f.name == name)
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (address, entry) in self.globals.iter().enumerate() {
            match entry {
                GlobalEntry::Function(name) => writeln!(f, "static [{address}] fn {name}")?,
                GlobalEntry::Variable(name) => {
                    let is_const = self
                        .global_variables
                        .iter()
                        .any(|v| v.name == *name && v.is_const);
                    let kind = if is_const { "const" } else { "var" };
                    writeln!(f, "static [{address}] {kind} {name}")?
                }
                GlobalEntry::Library(lib) => {
                    writeln!(f, "static [{address}] lib {name}", name = lib.name())?
                }
                GlobalEntry::StringLiteral(s) => writeln!(f, "static [{address}] str {s:?}")?,
            }
        }
        for function in self.functions.iter() {
            writeln!(f)?;
            write!(f, "{function}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_are_sequential() {
        let mut globals = GlobalDirectory::default();
        assert_eq!(globals.register(GlobalEntry::Function("main".into())), 0);
        assert_eq!(globals.register(GlobalEntry::Variable("x".into())), 1);
        assert_eq!(globals.register(GlobalEntry::Library(LibraryFunction::PutInt)), 2);
        assert_eq!(globals.len(), 3);
    }

    #[test]
    fn reregistering_returns_existing_address() {
        let mut globals = GlobalDirectory::default();
        globals.register(GlobalEntry::StringLiteral("hi".into()));
        globals.register(GlobalEntry::Library(LibraryFunction::PutStr));
        assert_eq!(globals.register(GlobalEntry::StringLiteral("hi".into())), 0);
        assert_eq!(globals.register(GlobalEntry::Library(LibraryFunction::PutStr)), 1);
        assert_eq!(globals.len(), 2);
    }

    #[test]
    fn string_literal_does_not_collide_with_function_name() {
        let mut globals = GlobalDirectory::default();
        globals.register(GlobalEntry::Function("main".into()));
        assert_eq!(globals.register(GlobalEntry::StringLiteral("main".into())), 1);
        assert!(globals.contains_name("main"));
        assert!(!globals.contains_name("putint"));
    }

    #[test]
    fn display_lists_globals_then_functions() {
        let mut program = Program::default();
        let address = program.globals.register(GlobalEntry::Function("main".into()));
        program.globals.register(GlobalEntry::Variable("c".into()));
        program.global_variables.push(GlobalVariable {
            name: "c".into(),
            is_const: true,
        });
        program.globals.register(GlobalEntry::StringLiteral("a\n".into()));
        program.functions.push(FunctionRecord::new("main", address));
        assert_eq!(
            program.to_string(),
            "static [0] fn main\nstatic [1] const c\nstatic [2] str \"a\\n\"\n\nfn [0] 0 0 -> 0 {\n}\n"
        );
    }
}
