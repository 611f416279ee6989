//! Expression and variable types as seen by the core.

/// Type of a declared symbol or a checked expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolType {
    Boolean,
    /// Symbolic enumeration (constants only).
    Enum,
    /// Unbounded integer; rejected when booleanizing.
    Integer,
    /// Real-valued; rejected when booleanizing.
    Real,
    UnsignedWord(u32),
    SignedWord(u32),
    /// Set-typed expression (unions, ranges); only `CASE` branches may
    /// carry these.
    Set,
    /// Not derivable from the available declarations.
    Unknown,
}

impl SymbolType {
    pub fn is_boolean(self) -> bool {
        self == SymbolType::Boolean
    }

    pub fn is_word(self) -> bool {
        matches!(self, SymbolType::UnsignedWord(_) | SymbolType::SignedWord(_))
    }

    pub fn is_unsigned_word(self) -> bool {
        matches!(self, SymbolType::UnsignedWord(_))
    }

    pub fn is_signed_word(self) -> bool {
        matches!(self, SymbolType::SignedWord(_))
    }

    pub fn is_set(self) -> bool {
        self == SymbolType::Set
    }

    /// Width of a word type.
    pub fn word_width(self) -> Option<u32> {
        match self {
            SymbolType::UnsignedWord(w) | SymbolType::SignedWord(w) => Some(w),
            _ => None,
        }
    }

    /// True for types that have no finite boolean encoding.
    pub fn is_infinite_precision(self) -> bool {
        matches!(self, SymbolType::Integer | SymbolType::Real)
    }
}
