use crate::val::ValueType;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// A function provided by the runtime library.
///
/// Library functions are called by name through the Global Directory and can
/// not be declared by user code.
pub enum LibraryFunction {
    GetInt,
    GetDouble,
    GetChar,
    PutInt,
    PutDouble,
    PutChar,
    PutStr,
    PutLn,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// What a library function expects between its parentheses.
pub enum LibraryArgument {
    /// No argument.
    None,
    /// A single expression of the given type.
    Value(ValueType),
    /// A single string literal token.
    StringLiteral,
}

impl LibraryFunction {
    /// All library functions.
    pub const ALL: [LibraryFunction; 8] = [
        LibraryFunction::GetInt,
        LibraryFunction::GetDouble,
        LibraryFunction::GetChar,
        LibraryFunction::PutInt,
        LibraryFunction::PutDouble,
        LibraryFunction::PutChar,
        LibraryFunction::PutStr,
        LibraryFunction::PutLn,
    ];

    /// Returns the library function called `name`.
    pub fn with_name(name: &str) -> Option<LibraryFunction> {
        LibraryFunction::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            LibraryFunction::GetInt => "getint",
            LibraryFunction::GetDouble => "getdouble",
            LibraryFunction::GetChar => "getchar",
            LibraryFunction::PutInt => "putint",
            LibraryFunction::PutDouble => "putdouble",
            LibraryFunction::PutChar => "putchar",
            LibraryFunction::PutStr => "putstr",
            LibraryFunction::PutLn => "putln",
        }
    }

    pub fn return_type(self) -> ValueType {
        match self {
            LibraryFunction::GetInt | LibraryFunction::GetChar => ValueType::Int,
            LibraryFunction::GetDouble => ValueType::Double,
            LibraryFunction::PutInt
            | LibraryFunction::PutDouble
            | LibraryFunction::PutChar
            | LibraryFunction::PutStr
            | LibraryFunction::PutLn => ValueType::Void,
        }
    }

    pub fn argument(self) -> LibraryArgument {
        match self {
            LibraryFunction::GetInt
            | LibraryFunction::GetDouble
            | LibraryFunction::GetChar
            | LibraryFunction::PutLn => LibraryArgument::None,
            LibraryFunction::PutInt | LibraryFunction::PutChar => {
                LibraryArgument::Value(ValueType::Int)
            }
            LibraryFunction::PutDouble => LibraryArgument::Value(ValueType::Double),
            LibraryFunction::PutStr => LibraryArgument::StringLiteral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for f in LibraryFunction::ALL {
            assert_eq!(LibraryFunction::with_name(f.name()), Some(f));
        }
        assert_eq!(LibraryFunction::with_name("main"), None);
    }

    #[test]
    fn readers_return_values_and_writers_take_them() {
        assert_eq!(LibraryFunction::GetDouble.return_type(), ValueType::Double);
        assert_eq!(LibraryFunction::GetChar.return_type(), ValueType::Int);
        assert_eq!(
            LibraryFunction::PutChar.argument(),
            LibraryArgument::Value(ValueType::Int)
        );
        assert_eq!(LibraryFunction::PutStr.argument(), LibraryArgument::StringLiteral);
        assert_eq!(LibraryFunction::PutLn.argument(), LibraryArgument::None);
    }
}
