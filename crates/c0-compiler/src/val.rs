#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// The type of a value flowing through the compiler.
pub enum ValueType {
    /// Signed 64 bit integer.
    Int,
    /// IEEE 754 double.
    Double,
    /// The absence of a value. Only valid as a return type or as the type of
    /// an expression that leaves nothing on the stack.
    Void,
}

impl ValueType {
    /// Returns `true` if the type is `void`.
    pub fn is_void(self) -> bool {
        self == ValueType::Void
    }

    /// The number of stack slots a value of this type occupies.
    pub fn slots(self) -> u32 {
        match self {
            ValueType::Void => 0,
            ValueType::Int | ValueType::Double => 1,
        }
    }

    /// The keyword naming the type.
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Double => "double",
            ValueType::Void => "void",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
